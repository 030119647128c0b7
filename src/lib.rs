/*!
reqwest-vkontakte: signed VKontakte API calls over reqwest.

# Overview

This library issues calls to the VKontakte application API
(`api.php`) from a server-side application. Each call is merged with the
protocol parameters (`api_id`, `format`, `v`, `sid`, optional `test_mode`),
signed with the application secret and POSTed with a blocking
[reqwest](https://crates.io/crates/reqwest) client. The JSON answer is
unwrapped from its `response` envelope, or turned into an [`ApiError`] when
the server reports an `error`.

# How to use

## Basic usecase 1 - calling a method

```rust,no_run
use reqwest_vkontakte::{Client, Options};
use serde_json::json;

# fn main() -> reqwest_vkontakte::Result<()> {
let options = Options::new()
    .api_id(1_234_567u64)
    .viewer_id(42u64)
    .sid("[SESSION_ID]")
    .secret("[APP_SECRET]")
    .test_mode(true);

let client = Client::new(options)?;
let profiles = client.call("getProfiles", &json!({ "uids": 42, "fields": "photo,sex" }))?;
println!("{:#?}", profiles);

// method selector embedded in the parameters
let friends = client.call_raw(&json!({ "method": "friends.get", "fields": "photo" }))?;

// namespace + name
let friends = client.call_in("friends", "get", &json!({ "fields": "photo" }))?;

// namespace embedded in the parameters
let friends = client.call_member("get", &json!({ "method": "friends", "fields": "photo" }))?;
# Ok(())
# }
```

## Basic usecase 2 - configuring from the launch URL

VKontakte opens an embedded application with its launch parameters in the
query string. Pass that query string (or the already parsed pairs) explicitly:

```rust,no_run
use reqwest_vkontakte::{Client, Options};

# fn main() -> reqwest_vkontakte::Result<()> {
let query = "api_url=http://api.vk.com/api.php&api_id=1234567&viewer_id=42&sid=abc&secret=def&api_result=%7B%22response%22%3A%7B%22uid%22%3A42%7D%7D";
let options = Options::from_query(query)?;

// the first API answer is already embedded in the launch parameters
let first = options.api_result()?;

let client = Client::new(options.test_mode(true))?;
# Ok(())
# }
```

## Handling errors

```rust,no_run
use reqwest_vkontakte::{Client, Error, Options};
use serde_json::json;

# fn main() -> reqwest_vkontakte::Result<()> {
# let client = Client::new(Options::new().api_id(1u64))?;
match client.call("getProfiles", &json!({ "uids": 1 })) {
    Ok(payload) => println!("{}", payload),
    Err(Error::Api(err)) => eprintln!("server said {} ({})", err.message(), err.code()),
    Err(Error::Transport(err)) => eprintln!("network: {}", err),
    Err(err) => eprintln!("{}", err),
}
# Ok(())
# }
```
*/
mod client;
mod error;
mod options;
mod params;
mod response;
mod signer;
mod transport;

// exposed to external program
pub use client::Client;
pub use error::{
    ApiError, ApiResult, ConfigError, ConfigResult, Error, Result, TransportError,
    TransportResult, DEFAULT_ERROR_CODE, DEFAULT_ERROR_MESSAGE, DEFAULT_ERROR_TYPE,
    TRANSPORT_ERROR_TYPE,
};
pub use options::{Options, DEFAULT_API_URL};
pub use params::{to_params, Params};
pub use response::{decode, validate};
pub use signer::{sign, Signer};
pub use transport::{
    build_http_client, FormEncoding, PostRequest, Transport, CONNECT_TIMEOUT, TIMEOUT, USER_AGENT,
};

// exposed constant variables
/// Represents `api_id`.
pub const API_ID_KEY: &str = "api_id";
/// Represents `format`.
pub const FORMAT_KEY: &str = "format";
/// Represents `method`.
pub const METHOD_KEY: &str = "method";
/// Represents `sid`. Transmitted, but never signed.
pub const SID_KEY: &str = "sid";
/// Represents `sig`.
pub const SIG_KEY: &str = "sig";
/// Represents `test_mode`.
pub const TEST_MODE_KEY: &str = "test_mode";
/// Represents `v`.
pub const VERSION_KEY: &str = "v";

/// Value sent as `format`.
pub const FORMAT: &str = "JSON";
/// Value sent as `v`.
pub const API_VERSION: &str = "3.0";

// crate-private constant variables
pub(crate) const TEST_MODE_ON: &str = "1";
pub(crate) const RESPONSE_KEY: &str = "response";
pub(crate) const ERROR_KEY: &str = "error";
pub(crate) const ERROR_CODE_KEY: &str = "error_code";
pub(crate) const ERROR_MSG_KEY: &str = "error_msg";
pub(crate) const ERROR_TYPE_KEY: &str = "error_type";
