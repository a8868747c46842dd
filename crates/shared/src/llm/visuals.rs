const OPEN_TAG: &str = "<VISUAL_PROMPT>";
const CLOSE_TAG: &str = "</VISUAL_PROMPT>";

/// Splits raw model output into displayable text and the visual-prompt
/// directives embedded in it.
///
/// Single forward pass: directive = open tag, inner text, close tag.
/// Directives do not nest, so the first close tag after an open tag ends the
/// match. An open tag with no close tag is ordinary text. Prompts come back
/// trimmed, in document order; the cleaned text is the input minus the
/// matched directives, with one final trim.
pub fn extract_visual_prompts(raw: &str) -> (String, Vec<String>) {
    let mut prompts = Vec::new();
    let mut cleaned = String::with_capacity(raw.len());
    let mut cursor = 0;

    while let Some(open_offset) = raw[cursor..].find(OPEN_TAG) {
        let open_at = cursor + open_offset;
        let inner_start = open_at + OPEN_TAG.len();

        let Some(close_offset) = raw[inner_start..].find(CLOSE_TAG) else {
            break;
        };
        let close_at = inner_start + close_offset;

        cleaned.push_str(&raw[cursor..open_at]);
        prompts.push(raw[inner_start..close_at].trim().to_string());
        cursor = close_at + CLOSE_TAG.len();
    }

    cleaned.push_str(&raw[cursor..]);
    (cleaned.trim().to_string(), prompts)
}
