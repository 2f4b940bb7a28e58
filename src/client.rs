//! Outbound HTTP client.
//!
//! A thin layer over `reqwest` that resolves URLs against an optional base,
//! merges default headers, applies a timeout, buffers the whole response and
//! decodes it by content type.
//!
//! Connections are not pooled: every request opens its own.
//!
//! ```rust,no_run
//! # async fn run() -> wick::Result<()> {
//! use wick::client::{self, Client, Data};
//!
//! let res = client::get("https://example.com/health").await?;
//! assert!(res.status.is_success());
//!
//! let mut api = Client::with_base_url("https://api.example.com/v1/")?;
//! api.set_header("authorization", "Bearer token")?;
//! let created = api.post("users", serde_json::json!({ "name": "ada" })).await?;
//! if let Data::Json(user) = &created.data {
//!     println!("created {}", user["id"]);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::method::Method;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ── Request ──────────────────────────────────────────────────────────────────

/// A request body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Text(String),
    /// Sent with `content-type: application/json`.
    Json(Value),
    Bytes(Bytes),
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for RequestBody {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b.into())
    }
}

/// Per-request settings for [`Client::request`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    /// Added on top of the client's default headers, replacing same-named ones.
    pub headers: Vec<(String, String)>,
    /// Ignored for `GET` and `HEAD`.
    pub body: Option<RequestBody>,
    /// Overrides the client's timeout.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::Get, headers: Vec::new(), body: None, timeout: None }
    }
}

impl RequestOptions {
    pub fn method(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A response body decoded by content type.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// `application/json` that parsed.
    Json(Value),
    /// `text/*` that was valid UTF-8.
    Text(String),
    /// Everything else, and anything that failed to decode.
    Bytes(Bytes),
}

impl Data {
    fn decode(content_type: &str, bytes: Bytes) -> Self {
        if content_type.contains("application/json") {
            if let Ok(value) = serde_json::from_slice(&bytes) {
                return Self::Json(value);
            }
        } else if content_type.contains("text/") {
            if let Ok(text) = std::str::from_utf8(&bytes) {
                return Self::Text(text.to_owned());
            }
        }
        Self::Bytes(bytes)
    }
}

/// A fully buffered response.
#[derive(Clone, Debug)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub data: Data,
}

impl ClientResponse {
    /// Deserializes the body into `T`, whatever `data` variant it landed in.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(match &self.data {
            Data::Json(value) => T::deserialize(value)?,
            Data::Text(text) => serde_json::from_str(text)?,
            Data::Bytes(bytes) => serde_json::from_slice(bytes)?,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// An outbound HTTP client with a base URL, default headers and a timeout.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl Client {
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self {
            inner,
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// A client that resolves relative URLs against `base`.
    pub fn with_base_url(base: &str) -> Result<Self> {
        let mut client = Self::new()?;
        client.base_url = Some(Url::parse(base)?);
        Ok(client)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        self.default_headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn set_headers<'h, I>(&mut self, headers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (&'h str, &'h str)>,
    {
        for (name, value) in headers {
            self.set_header(name, value)?;
        }
        Ok(self)
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URLs are used as is; anything else is joined onto the base.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Url::parse(url)?);
        }
        match &self.base_url {
            Some(base) => Ok(base.join(url)?),
            None => Ok(Url::parse(url)?),
        }
    }

    fn headers_for(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = self.default_headers.clone();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            headers.insert(name, HeaderValue::from_str(value)?);
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        Ok(headers)
    }

    pub async fn request(&self, url: &str, options: RequestOptions) -> Result<ClientResponse> {
        let url = self.resolve_url(url)?;
        let headers = self.headers_for(&options)?;
        let method = options.method;

        let mut req = self
            .inner
            .request(method.into(), url.clone())
            .headers(headers)
            .timeout(options.timeout.unwrap_or(self.timeout));

        if !method.is_bodyless() {
            req = match options.body {
                Some(RequestBody::Text(text)) => req.body(text),
                Some(RequestBody::Json(value)) => req.json(&value),
                Some(RequestBody::Bytes(bytes)) => req.body(bytes),
                None => req,
            };
        }

        let res = req.send().await.map_err(transport)?;
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map_err(transport)?;

        debug!(%method, %url, status = status.as_u16(), bytes = bytes.len(), "outbound request finished");

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let data = Data::decode(content_type, bytes);

        Ok(ClientResponse {
            status,
            status_text: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            headers,
            data,
        })
    }

    pub async fn get(&self, url: &str) -> Result<ClientResponse> {
        self.request(url, RequestOptions::method(Method::Get)).await
    }

    pub async fn post(&self, url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
        self.request(url, RequestOptions::method(Method::Post).body(body)).await
    }

    pub async fn put(&self, url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
        self.request(url, RequestOptions::method(Method::Put).body(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<ClientResponse> {
        self.request(url, RequestOptions::method(Method::Delete)).await
    }

    pub async fn patch(&self, url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
        self.request(url, RequestOptions::method(Method::Patch).body(body)).await
    }
}

fn transport(e: reqwest::Error) -> Error {
    if e.is_timeout() { Error::Timeout } else { Error::Client(e) }
}

// ── Process-wide client ──────────────────────────────────────────────────────

static GLOBAL: OnceLock<Client> = OnceLock::new();

fn global() -> Result<&'static Client> {
    if let Some(client) = GLOBAL.get() {
        return Ok(client);
    }
    let client = Client::new()?;
    Ok(GLOBAL.get_or_init(|| client))
}

/// A new client resolving relative URLs against `base`.
pub fn create_client(base: &str) -> Result<Client> {
    Client::with_base_url(base)
}

/// Sends a request through the process-wide client.
pub async fn fetch(url: &str, options: RequestOptions) -> Result<ClientResponse> {
    global()?.request(url, options).await
}

pub async fn get(url: &str) -> Result<ClientResponse> {
    global()?.get(url).await
}

pub async fn post(url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
    global()?.post(url, body).await
}

pub async fn put(url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
    global()?.put(url, body).await
}

/// `DELETE` through the process-wide client.
pub async fn del(url: &str) -> Result<ClientResponse> {
    global()?.delete(url).await
}

pub async fn patch(url: &str, body: impl Into<RequestBody>) -> Result<ClientResponse> {
    global()?.patch(url, body).await
}
