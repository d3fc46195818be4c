//! Best-effort recovery of a JSON payload embedded in free-form model output.
//!
//! The payload is assumed to run from the first opening delimiter to the last
//! closing delimiter of the requested kind. Replies containing more than one
//! JSON block can therefore slice across blocks and fail to parse.

use serde_json::{Map, Value};

use crate::error::ContentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiters {
  Object,
  Array,
}

impl Delimiters {
  fn pair(self) -> (char, char) {
    match self {
      Delimiters::Object => ('{', '}'),
      Delimiters::Array => ('[', ']'),
    }
  }
}

/// Slice `text` between the outermost delimiters of `kind` and parse it.
pub fn extract_json(text: &str, kind: Delimiters) -> Result<Value, ContentError> {
  let (open, close) = kind.pair();
  let start = text
    .find(open)
    .ok_or_else(|| ContentError::Parse(format!("no '{open}' in completion")))?;
  let end = text
    .rfind(close)
    .filter(|&end| end > start)
    .ok_or_else(|| ContentError::Parse(format!("no '{close}' after the first '{open}'")))?;

  serde_json::from_str(&text[start..=end]).map_err(|e| ContentError::Parse(e.to_string()))
}

/// A non-empty top-level array.
pub fn extract_array(text: &str) -> Result<Vec<Value>, ContentError> {
  match extract_json(text, Delimiters::Array)? {
    Value::Array(items) if !items.is_empty() => Ok(items),
    Value::Array(_) => Err(ContentError::Shape("expected a non-empty array".into())),
    other => Err(ContentError::Shape(format!("expected an array, got {}", kind_of(&other)))),
  }
}

/// A non-empty top-level object.
pub fn extract_object(text: &str) -> Result<Map<String, Value>, ContentError> {
  match extract_json(text, Delimiters::Object)? {
    Value::Object(map) if !map.is_empty() => Ok(map),
    Value::Object(_) => Err(ContentError::Shape("expected a non-empty object".into())),
    other => Err(ContentError::Shape(format!("expected an object, got {}", kind_of(&other)))),
  }
}

fn kind_of(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
