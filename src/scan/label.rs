/// Connective words kept lowercase in display labels when not first.
const MINOR_WORDS: &[&str] = &[
    "and", "or", "with", "of", "the", "a", "an", "in", "on", "to", "for",
];

/// Canonical lowercase form of a classifier label: `-`/`_` runs become one
/// space, whitespace collapses, ends trimmed. Idempotent, never fails.
pub fn normalize(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;
    for c in label.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !out.is_empty() {
                pending_space = true;
            }
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Human-facing label: each token title-cased except connective words after
/// the first position. Empty input maps to a fixed fallback.
pub fn to_display(label: &str) -> String {
    let normalized = normalize(label);
    if normalized.is_empty() {
        return "Unknown food".to_string();
    }
    normalized
        .split(' ')
        .enumerate()
        .map(|(idx, word)| {
            if idx > 0 && MINOR_WORDS.contains(&word) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
