use reqwest::blocking::Client as ReqwestClient;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::response::decode;
use crate::{
    build_http_client, to_params, ConfigError, FormEncoding, Options, Params, PostRequest, Result,
    Signer, Transport, API_ID_KEY, API_VERSION, FORMAT, FORMAT_KEY, METHOD_KEY, SID_KEY, SIG_KEY,
    TEST_MODE_KEY, TEST_MODE_ON, VERSION_KEY,
};

/// VKontakte API client.
///
/// Every call is independent: parameters are prepared, signed and sent in
/// one blocking POST through `T`, and the answer is validated before it is
/// returned. Nothing is retried.
#[derive(Debug)]
pub struct Client<T = ReqwestClient> {
    transport: T,
    options: Options,
    endpoint: Url,
    api_id: u64,
}

impl Client<ReqwestClient> {
    /// Constructs a new `Client` on top of a blocking `reqwest` client
    /// configured by [`build_http_client`].
    ///
    /// # Errors
    ///
    /// This method fails when `api_id` is not set, or when the HTTP client
    /// cannot be initialized.
    pub fn new(options: Options) -> Result<Self> {
        Client::with_transport(build_http_client()?, options)
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Constructs a new `Client` sending its requests through `transport`.
    ///
    /// # Note
    /// A `reqwest` client passed here keeps its own connect timeout. Build it
    /// with [`build_http_client`] to get the 10 second one.
    pub fn with_transport(transport: T, options: Options) -> Result<Self> {
        let api_id = options.api_id.ok_or(ConfigError::Missing(API_ID_KEY))?;
        let endpoint = options.endpoint()?;
        Ok(Client {
            transport,
            options,
            endpoint,
            api_id,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls `method` with `params`.
    ///
    /// `params` must serialize into a mapping; a `method` entry in it is
    /// overridden.
    ///
    /// # Errors
    ///
    /// [`Error::Api`](crate::Error::Api) when the server answers with an
    /// error, [`Error::Transport`](crate::Error::Transport) when the
    /// request itself fails.
    pub fn call<P>(&self, method: &str, params: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let mut params = to_params(params)?;
        params.insert(METHOD_KEY.to_string(), method.to_string());
        self.execute(params)
    }

    /// Calls the method named by the `method` entry of `params`.
    pub fn call_raw<P>(&self, params: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        self.execute(to_params(params)?)
    }

    /// Calls `<namespace>.<name>`, e.g. `call_in("friends", "get", ..)`.
    pub fn call_in<P>(&self, namespace: &str, name: &str, params: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        self.call(&format!("{}.{}", namespace, name), params)
    }

    /// Calls `name` inside the namespace given by the `method` entry of
    /// `params`: `{"method": "friends"}` with `"get"` calls `friends.get`.
    /// Without a `method` entry, `name` is called as is.
    pub fn call_member<P>(&self, name: &str, params: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let mut params = to_params(params)?;
        let method = match params.remove(METHOD_KEY) {
            Some(namespace) => format!("{}.{}", namespace, name),
            None => name.to_string(),
        };
        params.insert(METHOD_KEY.to_string(), method);
        self.execute(params)
    }

    /// Adds the protocol parameters and the signature to `params`.
    pub fn prepare(&self, mut params: Params) -> Params {
        params.insert(API_ID_KEY.to_string(), self.api_id.to_string());
        params.insert(FORMAT_KEY.to_string(), FORMAT.to_string());
        params.insert(VERSION_KEY.to_string(), API_VERSION.to_string());
        params.insert(
            SID_KEY.to_string(),
            self.options.sid.clone().unwrap_or_default(),
        );
        if self.options.test_mode {
            params.insert(TEST_MODE_KEY.to_string(), TEST_MODE_ON.to_string());
        }
        params.remove(SIG_KEY);

        let signature = self.signer().generate_signature(&params);
        params.insert(SIG_KEY.to_string(), signature);
        params
    }

    fn signer(&self) -> Signer<'_> {
        let viewer_id = self
            .options
            .viewer_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let secret = self.options.secret.as_deref().unwrap_or_default();
        Signer::new(viewer_id, secret)
    }

    fn execute(&self, params: Params) -> Result<Value> {
        let params = self.prepare(params);
        let encoding = FormEncoding::from_file_upload(self.options.file_upload);
        log::debug!(
            "calling {} at {} ({:?})",
            params.get(METHOD_KEY).map(String::as_str).unwrap_or("<no method>"),
            self.endpoint,
            encoding
        );

        let body = self
            .transport
            .post(PostRequest::new(&self.endpoint, &params, encoding))
            .map_err(|err| {
                log::warn!("request to {} failed: {}", self.endpoint, err);
                err
            })?;
        log::trace!("received {} bytes", body.len());

        decode(&body).map_err(|err| {
            log::warn!("api call failed: {}", err);
            err
        })
    }
}
