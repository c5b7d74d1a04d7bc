/// Remove a markdown code fence wrapped around a model response.
///
/// Handles a leading fence with an optional language tag (```` ```html ````,
/// ```` ```json ````) and a trailing fence. Unfenced text is only trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let body = trimmed.strip_prefix("```").map_or(trimmed, strip_language_tag);
    let body = body.strip_suffix("```").unwrap_or(body);

    body.trim()
}

/// Drop the language tag line after an opening fence. Text on the fence line
/// that is not a lone tag is kept.
fn strip_language_tag(rest: &str) -> &str {
    let is_tag = |line: &str| {
        line.trim_end()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };

    match rest.split_once('\n') {
        Some((line, body)) if is_tag(line) => body,
        None if is_tag(rest) => "",
        _ => rest,
    }
}
