use super::resample::resample_block_average;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Receives each resampled buffer, in capture order.
pub type FrameSink = Box<dyn FnMut(Vec<f32>) -> bool + Send + 'static>;

/// Downmix multi-channel input to mono while applying the provided converter so
/// the side channel always receives a single channel regardless of the microphone layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Cuts the device callback stream into fixed-size native frames, resamples
/// each full frame and hands it to the sink. Holds at most one partial frame.
pub(super) struct FrameDispatcher {
    frame_samples: usize,
    native_rate: u32,
    target_rate: u32,
    pending: Vec<f32>,
    scratch: Vec<f32>,
    sink: FrameSink,
    dropped: Arc<AtomicUsize>,
    emitted: usize,
}

impl FrameDispatcher {
    pub(super) fn new(
        frame_samples: usize,
        native_rate: u32,
        target_rate: u32,
        sink: FrameSink,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            native_rate,
            target_rate,
            pending: Vec::with_capacity(frame_samples),
            scratch: Vec::new(),
            sink,
            dropped,
            emitted: 0,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, channels, convert);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            let resampled = resample_block_average(&frame, self.native_rate, self.target_rate);
            if (self.sink)(resampled) {
                self.emitted += 1;
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(super) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn emitted(&self) -> usize {
        self.emitted
    }
}
