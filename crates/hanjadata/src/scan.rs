//! Scans parsed JSON for U+FFFD replacement characters, which indicate the
//! source file was saved with a broken encoding somewhere upstream.

use serde_json::Value;

const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// One corrupted string value and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
    /// Dotted path to the value, e.g. `data[3].meanings.ko`.
    pub path: String,
    pub value: String,
    /// Character offsets of the replacement characters within the value.
    pub positions: Vec<usize>,
}

/// Walks the whole document and collects every string containing U+FFFD.
pub fn find_replacement_chars(document: &Value) -> Vec<Corruption> {
    let mut corruptions = Vec::new();
    walk(document, String::new(), &mut corruptions);
    corruptions
}

fn walk(value: &Value, path: String, corruptions: &mut Vec<Corruption>) {
    match value {
        Value::String(text) => {
            let positions = text
                .chars()
                .enumerate()
                .filter(|(_, c)| *c == REPLACEMENT_CHAR)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            if !positions.is_empty() {
                corruptions.push(Corruption {
                    path,
                    value: text.clone(),
                    positions,
                });
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, format!("{path}[{index}]"), corruptions);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(item, child, corruptions);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
