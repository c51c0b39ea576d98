//! CSS serialization helpers used when building selector text.

/// Escapes `value` so it can be used as a CSS identifier (`#id`, `.class`, tag names).
pub fn escape_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    // Writing into a String cannot fail.
    let _ = cssparser::serialize_identifier(value, &mut out);
    out
}

/// Serializes `value` as a double-quoted CSS string, quotes included.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let _ = cssparser::serialize_string(value, &mut out);
    out
}
