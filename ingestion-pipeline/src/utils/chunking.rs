use common::error::AppError;

/// Split `text` into contiguous slices of at most `max_chars` characters.
///
/// Lengths are counted in `char`s so a multi-byte code point is never split.
/// The slices concatenate back to `text` exactly; empty input yields no slices.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<&str>, AppError> {
    if max_chars == 0 {
        return Err(AppError::Chunking(
            "maximum chunk size must be greater than zero".into(),
        ));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count: usize = 0;

    for (offset, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(text.get(start..offset).unwrap_or_default());
            start = offset;
            count = 0;
        }
        count = count.saturating_add(1);
    }

    if start < text.len() {
        chunks.push(text.get(start..).unwrap_or_default());
    }

    Ok(chunks)
}
