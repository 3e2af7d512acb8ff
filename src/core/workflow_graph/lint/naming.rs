use regex::Regex;
use std::sync::OnceLock;

fn snake_case() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static pattern compiles"))
}

pub fn is_snake_case(name: &str) -> bool {
    snake_case().is_match(name)
}

/// Lowercase `name`, splitting camelCase words and collapsing every run of
/// whitespace or separators into a single underscore. Letters outside ASCII
/// are lowercased and kept.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            let camel_boundary = c.is_uppercase()
                && matches!(previous, Some(p) if p.is_lowercase() || p.is_numeric());
            if (pending_separator || camel_boundary) && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.extend(c.to_lowercase().filter(|l| l.is_alphanumeric()));
            previous = Some(c);
        } else {
            pending_separator = true;
            previous = None;
        }
    }
    out
}

/// A name needs fixing only when it is not snake_case and normalization
/// would change it into something non-empty.
pub fn needs_rename(name: &str) -> Option<String> {
    if is_snake_case(name) {
        return None;
    }
    let normalized = normalize_name(name);
    if normalized.is_empty() || normalized == name {
        None
    } else {
        Some(normalized)
    }
}
