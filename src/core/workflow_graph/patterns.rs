//! Text patterns shared by the validation rules, the expression analyzer and
//! the auto-fix transforms.
//!
//! Detection is pattern based, not a parse of the embedded expression
//! language. Brace or parenthesis characters inside string literals of an
//! expression can produce false positives.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        pub fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static pattern compiles"))
        }
    };
}

static_regex!(implicit_json_token, r"\$json\b");
static_regex!(execution_input_token, r"\$input\b");
static_regex!(explicit_reference, r#"\$\(\s*['"]([^'"]+)['"]\s*\)"#);
static_regex!(deprecated_node_accessor, r#"\$node\[\s*['"]([^'"]+)['"]\s*\]"#);
static_regex!(
    deep_json_chain,
    r"\.json\.[A-Za-z_$][\w$]*\.[A-Za-z_$][\w$]*"
);
static_regex!(template_marker, r"\{\{[\s\S]*?\}\}");
static_regex!(
    hardcoded_identifier,
    r#""(\d{17,19}|[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}|[0-9a-fA-F]{24})""#
);
static_regex!(
    secret_assignment,
    r#"(?i)"([\w-]*(?:api[_-]?key|secret|password|passwd|token)[\w-]*)"\s*:\s*"([^"\\]{8,})""#
);

/// Byte offsets of `$json` tokens that are not qualified by a preceding
/// identifier, member access or call.
pub fn implicit_json_offsets(text: &str) -> Vec<usize> {
    implicit_json_token()
        .find_iter(text)
        .filter(|found| {
            let preceding = text[..found.start()].chars().next_back();
            !matches!(preceding, Some(c) if c.is_alphanumeric() || c == '_' || c == '.' || c == ')')
        })
        .map(|found| found.start())
        .collect()
}

pub fn has_implicit_json(text: &str) -> bool {
    !implicit_json_offsets(text).is_empty()
}

/// Replace every implicit `$json` with an explicit reference bound to `upstream`.
pub fn bind_implicit_json(text: &str, upstream: &str) -> String {
    let offsets = implicit_json_offsets(text);
    if offsets.is_empty() {
        return text.to_string();
    }
    let replacement = format!("{}.item.json", explicit_call(upstream));
    let mut out = String::with_capacity(text.len() + offsets.len() * replacement.len());
    let mut cursor = 0;
    for offset in offsets {
        out.push_str(&text[cursor..offset]);
        out.push_str(&replacement);
        cursor = offset + "$json".len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// `$('name')` with single quotes in the name escaped.
pub fn explicit_call(name: &str) -> String {
    format!("$('{}')", name.replace('\'', "\\'"))
}

/// Node names referenced via `$('name')` calls, in order of appearance.
pub fn explicit_reference_names(text: &str) -> Vec<String> {
    explicit_reference()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Rewrite explicit and deprecated references from `old` to `new`. Matching
/// uses the same patterns as detection, so padded forms such as
/// `$( 'Old' )` are rewritten too; only the quoted name changes.
pub fn rename_references(text: &str, old: &str, new: &str) -> String {
    if !text.contains(old) {
        return text.to_string();
    }
    let renamed = rename_in_matches(explicit_reference(), text, old, new);
    rename_in_matches(deprecated_node_accessor(), &renamed, old, new)
}

fn rename_in_matches(pattern: &Regex, text: &str, old: &str, new: &str) -> String {
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                return String::new();
            };
            if name.as_str() != old {
                return whole.as_str().to_string();
            }
            let start = name.start() - whole.start();
            let end = name.end() - whole.start();
            format!("{}{}{}", &whole.as_str()[..start], new, &whole.as_str()[end..])
        })
        .into_owned()
}

/// Apply `rewrite` to every string leaf of `value` (object values and array
/// elements). Returns true when any string changed.
pub fn rewrite_strings<F>(value: &mut Value, rewrite: &mut F) -> bool
where
    F: FnMut(&str) -> String,
{
    match value {
        Value::String(text) => {
            let rewritten = rewrite(text);
            if rewritten != *text {
                *text = rewritten;
                true
            } else {
                false
            }
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= rewrite_strings(item, rewrite);
            }
            changed
        }
        Value::Object(map) => {
            let mut changed = false;
            for item in map.values_mut() {
                changed |= rewrite_strings(item, rewrite);
            }
            changed
        }
        _ => false,
    }
}
