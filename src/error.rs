use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ERROR_CODE_KEY, ERROR_MSG_KEY, ERROR_TYPE_KEY};

pub type Result<T> = std::result::Result<T, Error>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;
pub type TransportResult<T> = std::result::Result<T, TransportError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Fallback for `error_code`.
pub const DEFAULT_ERROR_CODE: i64 = 1;
/// Fallback for `error_msg`.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error occurred.";
/// Fallback for `error_type`.
pub const DEFAULT_ERROR_TYPE: &str = "Exception";
/// Type marker carried by every [`TransportError`].
pub const TRANSPORT_ERROR_TYPE: &str = "TransportException";

#[derive(Error, Debug)]
pub enum Error {
    #[error("api call failed : {0}")]
    Api(#[from] ApiError),
    #[error("request failed : {0}")]
    Transport(#[from] TransportError),
    #[error("invalid configuration : {0}")]
    Config(#[from] ConfigError),
    #[error("response is not valid JSON : {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request parameters must serialize into a key-value mapping, but got {0}")]
    InvalidParams(String),
}

/// Error reported by the API server in the `error` member of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    code: i64,
    message: String,
    error_type: String,
    raw: Value,
}

impl ApiError {
    /// Builds the error from the value found under the `error` key.
    ///
    /// Missing members fall back to [`DEFAULT_ERROR_CODE`],
    /// [`DEFAULT_ERROR_MESSAGE`] and [`DEFAULT_ERROR_TYPE`]. A value that is
    /// not a mapping is treated as an empty one, but is still kept as
    /// [`raw`](ApiError::raw).
    pub fn from_value(raw: Value) -> Self {
        let empty = Map::new();
        let fields = raw.as_object().unwrap_or(&empty);
        let code = fields
            .get(ERROR_CODE_KEY)
            .and_then(read_code)
            .unwrap_or(DEFAULT_ERROR_CODE);
        let message = fields
            .get(ERROR_MSG_KEY)
            .and_then(read_text)
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        let error_type = fields
            .get(ERROR_TYPE_KEY)
            .and_then(read_text)
            .unwrap_or_else(|| DEFAULT_ERROR_TYPE.to_string());
        ApiError {
            code,
            message,
            error_type,
            raw,
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `error_type` reported by the server.
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    /// The error mapping exactly as the server sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.error_type)?;
        if self.code != 0 {
            write!(f, "{}: ", self.code)?;
        }
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

fn read_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Local or network failure while talking to the API endpoint.
///
/// `code` is the HTTP status for non-2xx answers, `0` for failures that
/// never produced a status (connect, timeout, body read).
#[derive(Error, Debug)]
#[error("{}: {}: {}", TRANSPORT_ERROR_TYPE, .code, .message)]
pub struct TransportError {
    code: u16,
    message: String,
    #[source]
    source: Option<reqwest::Error>,
}

impl TransportError {
    pub fn new<T>(code: u16, message: T) -> Self
    where
        T: Into<String>,
    {
        TransportError {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Always [`TRANSPORT_ERROR_TYPE`].
    pub fn error_type(&self) -> &'static str {
        TRANSPORT_ERROR_TYPE
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let code = err.status().map(|s| s.as_u16()).unwrap_or(0);
        TransportError {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("malformed launch parameters : {0}")]
    Malformed(String),
    #[error("required option {0} is not set")]
    Missing(&'static str),
}

impl From<serde_urlencoded::de::Error> for ConfigError {
    fn from(err: serde_urlencoded::de::Error) -> Self {
        ConfigError::Malformed(err.to_string())
    }
}
