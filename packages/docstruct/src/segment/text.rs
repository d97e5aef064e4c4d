//! Generic-mode segmentation: accumulate delimiter-separated fragments
//! into bounded-size chunks.

/// Split `content` at `delimiter` and pack fragments into chunks of at
/// most `max_length` bytes.
///
/// Fragments are accumulated (delimiter-rejoined) into the current chunk
/// until adding the next fragment would exceed `max_length`; the chunk is
/// then flushed and a new one started. A single fragment longer than
/// `max_length` is emitted whole.
///
/// Guarantee: `chunks.join(delimiter) == content`.
pub fn split_content(content: &str, delimiter: &str, max_length: usize) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Option<String> = None;

    for fragment in content.split(delimiter) {
        match current.as_mut() {
            None => current = Some(fragment.to_string()),
            Some(chunk) => {
                if chunk.len() + delimiter.len() + fragment.len() <= max_length {
                    chunk.push_str(delimiter);
                    chunk.push_str(fragment);
                } else {
                    chunks.push(current.take().expect("chunk in progress"));
                    current = Some(fragment.to_string());
                }
            }
        }
    }

    if let Some(chunk) = current {
        chunks.push(chunk);
    }

    chunks
}
