use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::{validate, ConfigError, ConfigResult, Result};

/// Endpoint used when no `api_url` is configured.
pub const DEFAULT_API_URL: &str = "http://api.vk.com/api.php";

/// Application options, named after the launch parameters VKontakte passes
/// to an embedded application.
///
/// Build one with the setters, with a struct literal over
/// `Options::default()`, or from the launch query with
/// [`Options::from_query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// API endpoint. [`DEFAULT_API_URL`] when unset.
    #[serde(deserialize_with = "deserialize_url")]
    pub api_url: Option<Url>,
    #[serde(deserialize_with = "deserialize_number")]
    pub api_id: Option<u64>,
    /// Permission bit mask granted by the viewer.
    #[serde(deserialize_with = "deserialize_number")]
    pub api_settings: Option<u64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub viewer_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub viewer_type: Option<u8>,
    pub sid: Option<String>,
    pub secret: Option<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub user_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub group_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_flag_option")]
    pub is_app_user: Option<bool>,
    pub auth_key: Option<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub language: Option<u32>,
    #[serde(deserialize_with = "deserialize_number")]
    pub parent_language: Option<u32>,
    /// Raw JSON answer of the call described by the launch parameters.
    pub api_result: Option<String>,
    pub lc_name: Option<String>,
    pub hash: Option<String>,
    pub referrer: Option<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub poster_id: Option<u64>,
    pub post_id: Option<String>,
    /// Sends `test_mode=1` with every call.
    #[serde(deserialize_with = "deserialize_flag")]
    pub test_mode: bool,
    /// Sends calls as `multipart/form-data` instead of an URL-encoded body.
    #[serde(deserialize_with = "deserialize_flag")]
    pub file_upload: bool,
}

impl Options {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads the options from a launch query string such as
    /// `api_id=1&viewer_id=2&sid=...`. A leading `?` is ignored, as are
    /// unknown keys.
    pub fn from_query(query: &str) -> ConfigResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Ok(serde_urlencoded::from_str(query)?)
    }

    /// Reads the options from already parsed launch parameters.
    pub fn from_pairs<I, K, V>(pairs: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::from_query(&query)
    }

    /// set the api endpoint
    pub fn api_url(self, api_url: Url) -> Self {
        Options {
            api_url: Some(api_url),
            ..self
        }
    }

    /// set the application id
    pub fn api_id<T>(self, api_id: T) -> Self
    where
        T: Into<u64>,
    {
        Options {
            api_id: Some(api_id.into()),
            ..self
        }
    }

    /// set the id of the user viewing the application
    pub fn viewer_id<T>(self, viewer_id: T) -> Self
    where
        T: Into<u64>,
    {
        Options {
            viewer_id: Some(viewer_id.into()),
            ..self
        }
    }

    /// set the session id
    pub fn sid<T>(self, sid: T) -> Self
    where
        T: Into<String>,
    {
        Options {
            sid: Some(sid.into()),
            ..self
        }
    }

    /// set the application secret used for signing
    pub fn secret<T>(self, secret: T) -> Self
    where
        T: Into<String>,
    {
        Options {
            secret: Some(secret.into()),
            ..self
        }
    }

    pub fn test_mode<T>(self, test_mode: T) -> Self
    where
        T: Into<bool>,
    {
        Options {
            test_mode: test_mode.into(),
            ..self
        }
    }

    pub fn file_upload<T>(self, file_upload: T) -> Self
    where
        T: Into<bool>,
    {
        Options {
            file_upload: file_upload.into(),
            ..self
        }
    }

    /// The configured endpoint, or [`DEFAULT_API_URL`].
    pub fn endpoint(&self) -> ConfigResult<Url> {
        match self.api_url {
            Some(ref url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_API_URL).map_err(|e| ConfigError::Malformed(e.to_string())),
        }
    }

    /// Decodes and validates the `api_result` launch parameter.
    ///
    /// Returns `Ok(None)` when the parameter is absent.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Decode`](crate::Error::Decode) when the text is
    /// not JSON, and with [`Error::Api`](crate::Error::Api) when it holds
    /// an `error` answer.
    pub fn api_result(&self) -> Result<Option<Value>> {
        match self.api_result {
            Some(ref raw) => {
                let result: Value = serde_json::from_str(raw)?;
                Ok(Some(validate(result)?))
            }
            None => Ok(None),
        }
    }
}

fn deserialize_url<'de, D>(deserializer: D) -> std::result::Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Url::parse(s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber<T> {
    Number(T),
    Text(String),
}

// launch parameters may carry ids as empty text
fn deserialize_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<RawNumber<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Number(n)) => Ok(Some(n)),
        Some(RawNumber::Text(s)) => match s.trim() {
            "" => Ok(None),
            text => text.parse().map(Some).map_err(serde::de::Error::custom),
        },
    }
}

// launch parameters carry flags as "1"/"0"
fn parse_flag<E>(raw: &str) -> std::result::Result<Option<bool>, E>
where
    E: serde::de::Error,
{
    match raw.trim() {
        "" => Ok(None),
        "1" | "true" => Ok(Some(true)),
        "0" | "false" => Ok(Some(false)),
        other => Err(E::custom(format!("invalid flag {:?}, expected 1 or 0", other))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(u8),
    Text(String),
}

fn deserialize_flag_option<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawFlag::Bool(b)) => Ok(Some(b)),
        Some(RawFlag::Int(i)) => parse_flag(&i.to_string()),
        Some(RawFlag::Text(s)) => parse_flag(&s),
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_flag_option(deserializer)?.unwrap_or(false))
}
