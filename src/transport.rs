use std::time::Duration;

use http::header::{CONTENT_TYPE, EXPECT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::blocking::{Client as ReqwestClient, RequestBuilder as ReqwestRequestBuilder};
use url::Url;

use crate::{Params, TransportError, TransportResult};

/// Time allowed for establishing the connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for the whole exchange.
pub const TIMEOUT: Duration = Duration::from_secs(60);
/// Client identifier sent as `User-Agent`.
pub const USER_AGENT: &str = concat!("reqwest-vkontakte-", env!("CARGO_PKG_VERSION"));

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// How the parameters are put into the POST body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEncoding {
    /// One `application/x-www-form-urlencoded` string.
    UrlEncoded,
    /// One `multipart/form-data` part per parameter.
    Multipart,
}

impl FormEncoding {
    pub fn from_file_upload(file_upload: bool) -> Self {
        if file_upload {
            FormEncoding::Multipart
        } else {
            FormEncoding::UrlEncoded
        }
    }
}

/// A single form POST to the API endpoint.
#[derive(Debug, Clone)]
pub struct PostRequest<'a> {
    pub url: &'a Url,
    pub fields: &'a Params,
    pub encoding: FormEncoding,
    /// Not applied by the `reqwest` transport, which fixes the connect
    /// timeout when the client is built; see [`build_http_client`].
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: &'a str,
}

impl<'a> PostRequest<'a> {
    /// Request with the fixed timeouts and [`USER_AGENT`].
    pub fn new(url: &'a Url, fields: &'a Params, encoding: FormEncoding) -> Self {
        PostRequest {
            url,
            fields,
            encoding,
            connect_timeout: CONNECT_TIMEOUT,
            timeout: TIMEOUT,
            user_agent: USER_AGENT,
        }
    }

    /// The body used for [`FormEncoding::UrlEncoded`].
    pub fn url_encoded_body(&self) -> TransportResult<String> {
        serde_urlencoded::to_string(self.fields).map_err(|e| TransportError::new(0, e.to_string()))
    }
}

/// Sends a form POST and hands back the raw response body.
///
/// Any failure to obtain a successful (2xx) answer is a [`TransportError`].
pub trait Transport {
    fn post(&self, request: PostRequest<'_>) -> TransportResult<Vec<u8>>;
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    fn post(&self, request: PostRequest<'_>) -> TransportResult<Vec<u8>> {
        (**self).post(request)
    }
}

/// Builds the blocking `reqwest` client used by default, configured with
/// [`CONNECT_TIMEOUT`], [`TIMEOUT`] and [`USER_AGENT`].
pub fn build_http_client() -> TransportResult<ReqwestClient> {
    Ok(ReqwestClient::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

// reqwest applies the connect timeout per client: `connect_timeout` is only
// honored through `build_http_client`.
impl Transport for ReqwestClient {
    fn post(&self, request: PostRequest<'_>) -> TransportResult<Vec<u8>> {
        let builder = self
            .post(request.url.clone())
            .timeout(request.timeout)
            .header(USER_AGENT_HEADER, request.user_agent);
        let builder = match request.encoding {
            FormEncoding::UrlEncoded => url_encoded(builder, &request)?,
            FormEncoding::Multipart => multipart(builder, &request)?,
        };

        let mut req = builder.build()?;
        // never wait for `100 Continue`
        req.headers_mut().remove(EXPECT);

        let resp = self.execute(req)?.error_for_status()?;
        Ok(resp.bytes()?.to_vec())
    }
}

fn url_encoded(
    builder: ReqwestRequestBuilder,
    request: &PostRequest<'_>,
) -> TransportResult<ReqwestRequestBuilder> {
    let body = request.url_encoded_body()?;
    Ok(builder.header(CONTENT_TYPE, FORM_URLENCODED).body(body))
}

#[cfg(feature = "multipart")]
fn multipart(
    builder: ReqwestRequestBuilder,
    request: &PostRequest<'_>,
) -> TransportResult<ReqwestRequestBuilder> {
    let form = request
        .fields
        .iter()
        .fold(reqwest::blocking::multipart::Form::new(), |form, (k, v)| {
            form.text(k.clone(), v.clone())
        });
    Ok(builder.multipart(form))
}

#[cfg(not(feature = "multipart"))]
fn multipart(
    builder: ReqwestRequestBuilder,
    request: &PostRequest<'_>,
) -> TransportResult<ReqwestRequestBuilder> {
    log::warn!("multipart feature is disabled, sending the form url-encoded");
    url_encoded(builder, request)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use super::*;

    struct Captured {
        head: String,
        body: String,
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn read_request(stream: &mut TcpStream) -> Captured {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let mut end = None;
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if end.is_none() {
                end = find(&buf, b"\r\n\r\n");
            }
            if let Some(end) = end {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        let end = end.unwrap();
        Captured {
            head: String::from_utf8_lossy(&buf[..end]).to_lowercase(),
            body: String::from_utf8_lossy(&buf[end + 4..]).into_owned(),
        }
    }

    fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let captured = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            captured
        });
        let url = Url::parse(&format!("http://{}/api.php", addr)).unwrap();
        (url, handle)
    }

    fn fields() -> Params {
        vec![
            ("method".to_string(), "getProfiles".to_string()),
            ("fields".to_string(), "photo,sex".to_string()),
            ("sig".to_string(), "0123abcd".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn encoding_follows_file_upload() {
        assert_eq!(FormEncoding::from_file_upload(false), FormEncoding::UrlEncoded);
        assert_eq!(FormEncoding::from_file_upload(true), FormEncoding::Multipart);
    }

    #[test]
    fn url_encoded_body_is_sorted() {
        let url = Url::parse("http://localhost/api.php").unwrap();
        let fields = fields();
        let request = PostRequest::new(&url, &fields, FormEncoding::UrlEncoded);
        assert_eq!(
            request.url_encoded_body().unwrap(),
            "fields=photo%2Csex&method=getProfiles&sig=0123abcd"
        );
        assert_eq!(request.connect_timeout, Duration::from_secs(10));
        assert_eq!(request.timeout, Duration::from_secs(60));
        assert!(request.user_agent.starts_with("reqwest-vkontakte-"));
    }

    #[test]
    fn posts_url_encoded_form() {
        let (url, server) = serve_once("200 OK", r#"{"response":[]}"#);
        let fields = fields();
        let client = build_http_client().unwrap();

        let body =
            Transport::post(&client, PostRequest::new(&url, &fields, FormEncoding::UrlEncoded))
                .unwrap();
        assert_eq!(body, br#"{"response":[]}"#.to_vec());

        let captured = server.join().unwrap();
        assert!(captured.head.starts_with("post /api.php http/1.1"));
        assert!(captured.head.contains("content-type: application/x-www-form-urlencoded"));
        assert!(captured.head.contains(&format!("user-agent: {}", USER_AGENT)));
        assert!(!captured.head.contains("expect:"));
        let decoded = percent_encoding::percent_decode_str(&captured.body)
            .decode_utf8_lossy()
            .into_owned();
        assert_eq!(decoded, "fields=photo,sex&method=getProfiles&sig=0123abcd");
    }

    #[cfg(feature = "multipart")]
    #[test]
    fn posts_multipart_form() {
        let (url, server) = serve_once("200 OK", r#"{"response":1}"#);
        let mut fields = fields();
        fields.insert("method".to_string(), "photos.save".to_string());
        let client = build_http_client().unwrap();

        let body =
            Transport::post(&client, PostRequest::new(&url, &fields, FormEncoding::Multipart))
                .unwrap();
        assert_eq!(body, br#"{"response":1}"#.to_vec());

        let captured = server.join().unwrap();
        assert!(captured.head.contains("content-type: multipart/form-data; boundary="));
        assert!(captured.head.contains(&format!("user-agent: {}", USER_AGENT)));
        assert!(!captured.head.contains("expect:"));
        let parts = captured.body.to_lowercase();
        assert_eq!(parts.matches("content-disposition: form-data; name=").count(), 3);
        for (key, value) in &fields {
            let part = format!("name=\"{}\"\r\n\r\n{}\r\n", key, value);
            assert!(captured.body.contains(&part), "missing part {}", key);
        }
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let (url, server) = serve_once("502 Bad Gateway", "{}");
        let fields = fields();
        let client = build_http_client().unwrap();

        let err =
            Transport::post(&client, PostRequest::new(&url, &fields, FormEncoding::UrlEncoded))
                .unwrap_err();
        assert_eq!(err.code(), 502);
        assert_eq!(err.error_type(), "TransportException");
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let url = Url::parse(&format!("http://{}/api.php", addr)).unwrap();
        let fields = fields();
        let client = build_http_client().unwrap();

        let err =
            Transport::post(&client, PostRequest::new(&url, &fields, FormEncoding::UrlEncoded))
                .unwrap_err();
        assert_eq!(err.code(), 0);
        assert!(!err.message().is_empty());
    }
}
