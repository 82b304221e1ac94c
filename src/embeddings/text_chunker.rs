// Text chunking for the vector index

/// Split `text` into windows of at most `chunk_size` characters where
/// consecutive windows share up to `overlap` characters.
///
/// Window edges snap to whitespace when the window contains any, so words
/// are not cut in half. Blank chunks are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end < chars.len() {
            chars[start..hard_end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .map(|pos| start + pos)
                .filter(|&pos| pos > start + overlap)
                .unwrap_or(hard_end)
        } else {
            hard_end
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Step back by the overlap, then forward to the next word start
        let mut next = end - overlap;
        if !chars[next - 1].is_whitespace() {
            next = chars[next..end]
                .iter()
                .position(|c| c.is_whitespace())
                .map(|pos| next + pos + 1)
                .unwrap_or(end);
        }
        start = next;
    }

    chunks
}
