//! Line-aligned chunking.

/// Split `content` into chunks of at most `max_chunk_size` characters.
///
/// Lines are never split: when appending the next line would push the
/// running size past the limit, the current chunk is closed and the line
/// starts a new one. A single line longer than the limit therefore forms an
/// oversized chunk of its own. Line breaks are not counted toward the size.
///
/// Joining the result with `"\n"` reproduces `content` exactly.
pub fn chunk_content(content: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0;

    for line in content.split('\n') {
        let line_size = line.chars().count();

        if current_size + line_size > max_chunk_size && !current.is_empty() {
            chunks.push(current.join("\n"));
            current = vec![line];
            current_size = line_size;
        } else {
            current.push(line);
            current_size += line_size;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    chunks
}
