use crate::channel::UploadChunkMessage;

/// Largest raw slice sent per chunk regardless of budget, so a big budget
/// does not let one file starve keystrokes on the shared channel.
pub const PREFERRED_CHUNK_SIZE: usize = 8 * 1024;

/// Smallest base64 payload that still carries data (one 4-byte quantum).
const MIN_PAYLOAD_BYTES: usize = 4;

/// Maximum raw bytes per chunk so every framed chunk fits in `budget` bytes.
///
/// Overhead is measured on the worst-case message for this file: the last
/// chunk of the largest possible chunk count, which has the widest
/// `chunk`/`totalChunks` numbers. Returns 0 when even that overhead does not
/// leave room for one base64 quantum.
pub fn negotiate_chunk_size(budget: usize, name: &str, size: u64, preferred: usize) -> usize {
    let max_count = size.max(1);
    let worst_case = UploadChunkMessage {
        name: name.to_string(),
        size,
        chunk: max_count - 1,
        total_chunks: max_count,
        data: String::new(),
    };
    let Ok(overhead) = worst_case.framed_len() else {
        return 0;
    };
    let available = budget.saturating_sub(overhead);
    if available < MIN_PAYLOAD_BYTES {
        return 0;
    }
    let max_raw = (available / 4) * 3;
    preferred.min(max_raw)
}

/// Number of chunks a file of `size` bytes splits into.
pub fn chunk_count(size: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size as u64)
}
