// PHP array literal reading
//
// Property defaults and `return [...]` bodies are kept as raw text; these
// helpers pull strings, string maps and `Foo::class` references out of them.

use crate::parser::lexer::{find_top_level, matching_delimiter, split_top_level, unquote};

/// One `key => value` (or bare `value`) entry of an array literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayEntry {
    /// Unquoted key when it is a string literal, raw text otherwise
    pub key: Option<String>,
    /// Raw value text
    pub value: String,
}

impl ArrayEntry {
    /// Value as an unquoted string literal
    pub fn string_value(&self) -> Option<String> {
        unquote(&self.value)
    }

    /// Value as a `Foo::class` reference
    pub fn class_value(&self) -> Option<String> {
        class_ref(&self.value)
    }
}

/// Parse `[ ... ]` or `array( ... )` into entries
pub fn parse_array(raw: &str) -> Option<Vec<ArrayEntry>> {
    let raw = raw.trim().trim_end_matches(';').trim();
    let open = if raw.starts_with('[') {
        0
    } else if raw.len() >= 5 && raw[..5].eq_ignore_ascii_case("array") {
        raw.find('(')?
    } else {
        return None;
    };
    let close = matching_delimiter(raw, open)?;
    let inner = &raw[open + 1..close];

    let entries = split_top_level(inner, b',')
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match find_top_level(item, "=>") {
            Some(idx) => {
                let key = item[..idx].trim();
                ArrayEntry {
                    key: Some(unquote(key).unwrap_or_else(|| key.to_string())),
                    value: item[idx + 2..].trim().to_string(),
                }
            }
            None => ArrayEntry {
                key: None,
                value: item.to_string(),
            },
        })
        .collect();

    Some(entries)
}

/// String literal values of a list-style array
pub fn string_list(raw: &str) -> Vec<String> {
    parse_array(raw)
        .unwrap_or_default()
        .iter()
        .filter_map(ArrayEntry::string_value)
        .collect()
}

/// Keyed entries whose value is a string literal or a nested list of them
/// (joined with `|`), falling back to the raw text
pub fn string_map(raw: &str) -> Vec<(String, String)> {
    parse_array(raw)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let key = entry.key.clone()?;
            let value = entry.string_value().unwrap_or_else(|| {
                let nested = string_list(&entry.value);
                if nested.is_empty() {
                    entry.value.clone()
                } else {
                    nested.join("|")
                }
            });
            Some((key, value))
        })
        .collect()
}

/// Keys of an array literal
pub fn keys(raw: &str) -> Vec<String> {
    parse_array(raw)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| entry.key)
        .collect()
}

/// `Foo::class` -> `Foo` (as written)
pub fn class_ref(raw: &str) -> Option<String> {
    let name = raw.trim().strip_suffix("::class")?.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\\');
    valid.then(|| name.to_string())
}

/// Every `Foo::class` reference among the values, recursing into nested arrays
pub fn class_refs(raw: &str) -> Vec<String> {
    if let Some(single) = class_ref(raw) {
        return vec![single];
    }
    parse_array(raw)
        .unwrap_or_default()
        .iter()
        .flat_map(|entry| class_refs(&entry.value))
        .collect()
}
