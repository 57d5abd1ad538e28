//! JSON encoding for every stored record kind.
//!
//! Documents are UTF-8 JSON with 2-space indentation. Key order follows struct
//! field order and ordered maps, so encoding the same value twice yields the
//! same bytes.

use crate::errors::{AppResult, DecodeError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;

pub fn encode<T: Serialize>(record: &T) -> AppResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(record)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Truncated("document is empty".to_string()));
    }
    serde_json::from_slice(bytes).map_err(classify)
}

/// Overlays `update` onto `target`, recursing into objects. Anything else in
/// `update` (arrays included) replaces the target value.
pub fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(
                    target_map.entry(key).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

fn classify(error: serde_json::Error) -> DecodeError {
    let line = error.line();
    let column = error.column();
    match error.classify() {
        Category::Eof => DecodeError::Truncated(error.to_string()),
        Category::Data => DecodeError::SchemaMismatch {
            line,
            column,
            message: error.to_string(),
        },
        Category::Syntax | Category::Io => DecodeError::Malformed {
            line,
            column,
            message: error.to_string(),
        },
    }
}
