//! Text helpers

/// Truncate to at most `max_bytes` bytes without splitting a UTF-8 character
pub fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Lossy-decode bytes and truncate the result
pub fn truncate_lossy(bytes: &[u8], max_bytes: usize) -> String {
    truncate_utf8(&String::from_utf8_lossy(bytes), max_bytes)
}
