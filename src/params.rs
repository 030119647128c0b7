use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Request parameters, already rendered to text and kept in ascending key
/// order.
pub type Params = BTreeMap<String, String>;

/// Serializes `params` into a text-only [`Params`].
///
/// `params` must serialize into a mapping (a struct, a map, or a
/// `serde_json::json!({..})` object). Text values are taken verbatim; any
/// other value is replaced by its compact JSON text, so `1` becomes `"1"`,
/// `true` becomes `"true"` and `[1,2]` becomes `"[1,2]"`.
pub fn to_params<T>(params: &T) -> Result<Params>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, stringify(value)))
            .collect()),
        other => Err(Error::InvalidParams(kind_of(&other).to_string())),
    }
}

pub(crate) fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
