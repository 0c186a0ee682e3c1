//! Field-name case conversion between the UI (camelCase) and the
//! upstream API (snake_case).

/// Convert `camelCase` to `snake_case`.
///
/// Already-snake identifiers pass through unchanged, so applying the
/// conversion twice is safe. Uppercase runs collapse to one word
/// (`imageURL` becomes `image_url`).
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = false;
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !prev_upper && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_upper = true;
        } else {
            out.push(ch);
            prev_upper = false;
        }
    }
    out
}

/// Convert `snake_case` to `camelCase`. Already-camel identifiers pass
/// through unchanged.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
