use serde_json::Value;

use crate::{ApiError, ApiResult, Result, ERROR_KEY, RESPONSE_KEY};

/// Checks a decoded API answer.
///
/// An answer carrying an `error` member becomes an [`ApiError`]. Otherwise
/// the value under `response` is returned, or the whole answer when there
/// is no envelope. A `null` member counts as absent. Values that are not
/// mappings are returned unchanged.
pub fn validate(result: Value) -> ApiResult<Value> {
    match result {
        Value::Object(mut map) => {
            if let Some(error) = map.get_mut(ERROR_KEY).filter(|e| !e.is_null()) {
                return Err(ApiError::from_value(error.take()));
            }
            match map.get_mut(RESPONSE_KEY).filter(|r| !r.is_null()) {
                Some(payload) => Ok(payload.take()),
                None => Ok(Value::Object(map)),
            }
        }
        other => Ok(other),
    }
}

/// Parses a raw response body and [`validate`]s it.
pub fn decode(body: &[u8]) -> Result<Value> {
    let result: Value = serde_json::from_slice(body)?;
    Ok(validate(result)?)
}
