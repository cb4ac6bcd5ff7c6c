use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::model::Fields;

pub const TITLE: &str = "title";
pub const BODY: &str = "body";

const KNOWN: &[&str] = &[TITLE, BODY];

/// Checks a note about to be created. Unknown keys are dropped.
pub fn for_create(fields: Fields) -> Result<Fields> {
    let note = strict(fields)?;
    require_body(note.get(BODY))?;
    Ok(note)
}

/// Checks a partial update. Only the keys present are validated; unknown
/// keys are dropped.
pub fn for_update(fields: Fields) -> Result<Fields> {
    let note = strict(fields)?;
    if let Some(body) = note.get(BODY) {
        require_body(Some(body))?;
    }
    Ok(note)
}

fn require_body(body: Option<&Value>) -> Result<()> {
    match body {
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        _ => Err(StoreError::Validation("Note must have body".to_string())),
    }
}

/// Keeps only schema keys, casting scalars to strings.
fn strict(fields: Fields) -> Result<Fields> {
    let mut note = Fields::new();
    for (key, value) in fields {
        if !KNOWN.contains(&key.as_str()) {
            continue;
        }
        let value = cast_to_string(&key, value)?;
        note.insert(key, value);
    }
    Ok(note)
}

fn cast_to_string(key: &str, value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::String(_) => Ok(value),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(StoreError::Validation(format!(
            "Cast to string failed for path \"{}\"",
            key
        ))),
    }
}
