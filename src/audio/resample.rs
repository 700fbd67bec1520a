/// Resample `input` from `native_rate` to `target_rate` by block averaging.
///
/// With `r = native / target`, output sample `i` is the mean of the input
/// window `[round(i*r), round((i+1)*r))`, or 0.0 when that window is empty
/// (upsampling). The output holds `round(len / r)` samples. Equal rates pass
/// the buffer through unchanged.
pub fn resample_block_average(input: &[f32], native_rate: u32, target_rate: u32) -> Vec<f32> {
    // Guard rails
    if native_rate == target_rate || native_rate == 0 || target_rate == 0 {
        return input.to_vec();
    }
    if input.is_empty() {
        return Vec::new();
    }

    let ratio = f64::from(native_rate) / f64::from(target_rate);
    let output_len = (input.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    let mut window_start = 0usize;
    for i in 0..output_len {
        let window_end = (((i + 1) as f64) * ratio).round() as usize;
        let start = window_start.min(input.len());
        let end = window_end.min(input.len());
        let sample = if end > start {
            let window = &input[start..end];
            window.iter().sum::<f32>() / window.len() as f32
        } else {
            0.0
        };
        output.push(sample);
        window_start = window_end;
    }

    output
}

/// Samples per output buffer for a native frame of `native_frame` samples.
pub fn resampled_len(native_frame: usize, native_rate: u32, target_rate: u32) -> usize {
    if native_rate == target_rate || native_rate == 0 || target_rate == 0 {
        return native_frame;
    }
    let ratio = f64::from(native_rate) / f64::from(target_rate);
    (native_frame as f64 / ratio).round() as usize
}
