//! Per-request context: what came in, what the router found, what goes out.
//!
//! One [`Context`] is created for every inbound request and dropped once the
//! response has been sent. The router fills in the path parameters; the
//! rest is for middleware and handlers:
//!
//! ```rust
//! use http::StatusCode;
//! use wick::{Context, Method};
//!
//! let mut ctx = Context::builder(Method::Get, "/users/42?fields=name").build();
//! assert_eq!(ctx.path(), "/users/42");
//! assert_eq!(ctx.query("fields"), Some("name"));
//!
//! ctx.status(StatusCode::ACCEPTED).text("queued");
//! assert_eq!(ctx.response().status(), StatusCode::ACCEPTED);
//! assert!(ctx.response().is_finished());
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use http::{Extensions, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BoxError, Error, Result};
use crate::method::Method;
use crate::path::{Params, WILDCARD};
use crate::response::{ContentType, Response};

/// A request body that has not been read yet.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

enum BodyState {
    Unread(Body),
    Read(Bytes),
}

/// Everything one request's chain can see and write.
pub struct Context {
    method: Method,
    url: String,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    params: Params,
    state: Extensions,
    remote_addr: Option<SocketAddr>,
    body: BodyState,
    response: Response,
}

impl Context {
    /// Builds a context from an `http` request, e.g. one handed over by hyper.
    ///
    /// Fails with [`Error::UnsupportedMethod`] for methods no route can be
    /// registered under.
    pub fn from_request<B>(req: http::Request<B>) -> Result<Self>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;
        let body = body.map_err(Into::into).boxed_unsync();

        let mut ctx = Self::assemble(method, parts.uri.path(), parts.uri.query(), body);
        ctx.headers = parts.headers;
        Ok(ctx)
    }

    /// Starts a context that is not tied to a connection.
    ///
    /// `target` is a path with an optional query string, e.g. `/search?q=rust`.
    pub fn builder(method: Method, target: &str) -> ContextBuilder {
        ContextBuilder {
            method,
            target: target.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    fn assemble(method: Method, path: &str, query: Option<&str>, body: Body) -> Self {
        let url = match query {
            Some(q) => format!("{path}?{q}"),
            None => path.to_owned(),
        };
        let query = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            method,
            url,
            path: path.to_owned(),
            query,
            headers: HeaderMap::new(),
            params: Params::new(),
            state: Extensions::new(),
            remote_addr: None,
            body: BodyState::Unread(body),
            response: Response::default(),
        }
    }

    // ── Request ──────────────────────────────────────────────────────────────

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request target as received: path plus raw query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// All query pairs in the order they appeared.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup; `None` for missing or non-UTF-8 values.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The request's `content-type`, or `""`.
    pub fn content_type(&self) -> &str {
        self.header_value("content-type").unwrap_or_default()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub(crate) fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    // ── Routing results ──────────────────────────────────────────────────────

    /// Parameters captured by the matched route.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The remainder captured by a `*` in the matched route.
    pub fn wildcard(&self) -> Option<&str> {
        self.param(WILDCARD)
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    // ── State bag ────────────────────────────────────────────────────────────

    /// Typed values left by earlier middleware.
    pub fn state(&self) -> &Extensions {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut Extensions {
        &mut self.state
    }

    // ── Body ─────────────────────────────────────────────────────────────────

    /// Reads the whole request body, once.
    ///
    /// The first call drains the stream and later calls return the same
    /// bytes. `GET` and `HEAD` bodies are never read and come back empty. If
    /// reading fails the error is returned and later calls see an empty body.
    pub async fn body(&mut self) -> Result<Bytes> {
        let state = std::mem::replace(&mut self.body, BodyState::Read(Bytes::new()));
        let body = match state {
            BodyState::Read(bytes) => bytes,
            BodyState::Unread(_) if self.method.is_bodyless() => Bytes::new(),
            BodyState::Unread(stream) => stream.collect().await.map_err(Error::Body)?.to_bytes(),
        };
        self.body = BodyState::Read(body.clone());
        Ok(body)
    }

    /// Reads the body and decodes it as JSON.
    pub async fn body_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.body().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads the body and decodes it as `application/x-www-form-urlencoded`.
    pub async fn body_form<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.body().await?;
        Ok(serde_urlencoded::from_bytes(&bytes)?)
    }

    // ── Response ─────────────────────────────────────────────────────────────

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.set_status(status);
        self
    }

    /// Sets (replaces) a response header.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.response.headers_mut().insert(name, value);
        Ok(self)
    }

    pub fn set_headers<'h, I>(&mut self, headers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (&'h str, &'h str)>,
    {
        for (name, value) in headers {
            self.header(name, value)?;
        }
        Ok(self)
    }

    /// Finishes the response with a JSON body.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.response.finish(ContentType::Json, body.into());
        Ok(())
    }

    /// Finishes the response with a `text/plain` body.
    pub fn text(&mut self, body: impl Into<String>) {
        self.response.finish(ContentType::Text, body.into().into());
    }

    /// Finishes the response with whatever `value` serializes to: strings go
    /// out as `text/plain`, objects, arrays and `null` as JSON, and numbers
    /// and booleans as their text form.
    pub fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        match serde_json::to_value(value)? {
            Value::String(text) => self.text(text),
            scalar @ (Value::Number(_) | Value::Bool(_)) => self.text(scalar.to_string()),
            other => return self.json(&other),
        }
        Ok(())
    }

    /// Finishes the response with a `text/html` body.
    pub fn html(&mut self, body: impl Into<String>) {
        self.response.finish(ContentType::Html, body.into().into());
    }

    /// Finishes the response with an arbitrary typed body.
    pub fn bytes(&mut self, content_type: ContentType, body: impl Into<Bytes>) {
        self.response.finish(content_type, body.into());
    }

    /// Finishes the response as a redirect to `location`.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Result<()> {
        let value = HeaderValue::from_str(location)?;
        self.response.set_status(status);
        self.response.headers_mut().insert(LOCATION, value);
        self.response.end();
        Ok(())
    }

    /// Finishes the response without a body, keeping status and headers.
    pub fn end(&mut self) {
        self.response.end();
    }

    /// Discards the status and body written so far. Used when an error
    /// replaces a half-built response; headers unrelated to the body stay.
    pub(crate) fn reset_response(&mut self) {
        self.response.reset();
    }

    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        self.response.into_http()
    }
}

/// Builder for a [`Context`] that does not come from a socket.
pub struct ContextBuilder {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl ContextBuilder {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Context {
        let (path, query) = match self.target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.target.as_str(), None),
        };
        let body: Body = if self.body.is_empty() {
            Empty::new().map_err(|never| match never {}).boxed_unsync()
        } else {
            Full::new(self.body).map_err(|never| match never {}).boxed_unsync()
        };

        let mut ctx = Context::assemble(self.method, path, query, body);
        ctx.headers = self.headers;
        ctx.remote_addr = self.remote_addr;
        ctx
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use http::header::CONTENT_TYPE;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
    }

    #[test]
    fn splits_path_and_decodes_query() {
        let ctx = Context::builder(Method::Get, "/search?q=rust%20lang&page=2&q=again").build();
        assert_eq!(ctx.path(), "/search");
        assert_eq!(ctx.query("q"), Some("rust lang"));
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.query_pairs().len(), 3);
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn url_keeps_the_raw_target() {
        let ctx = Context::builder(Method::Get, "/search?q=rust%20lang").build();
        assert_eq!(ctx.url(), "/search?q=rust%20lang");
        assert_eq!(Context::builder(Method::Get, "/plain").build().url(), "/plain");
    }

    #[test]
    fn send_picks_text_or_json() {
        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.send("hello").unwrap();
        assert_eq!(ctx.response().body().unwrap(), "hello");
        assert_eq!(ctx.response().header("content-type"), Some("text/plain; charset=utf-8"));

        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.send(&serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(ctx.response().body().unwrap(), r#"{"ok":true}"#);
        assert_eq!(ctx.response().header("content-type"), Some("application/json; charset=utf-8"));

        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.send(&42).unwrap();
        assert_eq!(ctx.response().body().unwrap(), "42");
        assert_eq!(ctx.response().header("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn from_request_copies_head() {
        let req = http::Request::builder()
            .method("POST")
            .uri("http://localhost/users?x=1")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        let ctx = Context::from_request(req).unwrap();
        assert_eq!(ctx.method(), Method::Post);
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.query("x"), Some("1"));
        assert_eq!(ctx.content_type(), "application/json");
    }

    #[test]
    fn from_request_rejects_unroutable_method() {
        let req = http::Request::builder()
            .method("TRACE")
            .uri("/")
            .body(Empty::<Bytes>::new())
            .unwrap();
        assert!(matches!(Context::from_request(req), Err(Error::UnsupportedMethod(_))));
    }

    #[tokio::test]
    async fn body_is_read_once_and_memoized() {
        let mut ctx = Context::builder(Method::Post, "/").body("payload").build();
        assert_eq!(ctx.body().await.unwrap(), "payload");
        assert_eq!(ctx.body().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn get_body_is_never_read() {
        let mut ctx = Context::builder(Method::Get, "/").body("ignored").build();
        assert!(ctx.body().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn typed_body_helpers() {
        let mut ctx = Context::builder(Method::Post, "/").body(r#"{"name":"ada"}"#).build();
        assert_eq!(ctx.body_json::<NewUser>().await.unwrap(), NewUser { name: "ada".into() });

        let mut ctx = Context::builder(Method::Put, "/").body("name=grace&team=core").build();
        let form: HashMap<String, String> = ctx.body_form().await.unwrap();
        assert_eq!(form["name"], "grace");

        let mut ctx = Context::builder(Method::Post, "/").body("{not json").build();
        assert!(matches!(ctx.body_json::<NewUser>().await, Err(Error::Json(_))));
    }

    #[test]
    fn json_sets_content_type_and_finishes() {
        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.status(StatusCode::CREATED)
            .json(&serde_json::json!({ "id": 7 }))
            .unwrap();
        let res = ctx.response();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(res.body().unwrap(), r#"{"id":7}"#);
    }

    #[test]
    fn redirect_sets_location() {
        let mut ctx = Context::builder(Method::Get, "/old").build();
        ctx.redirect("/new", StatusCode::FOUND).unwrap();
        assert_eq!(ctx.response().status(), StatusCode::FOUND);
        assert_eq!(ctx.response().header("location"), Some("/new"));
        assert!(ctx.response().is_finished());
    }

    #[test]
    fn invalid_header_is_an_error() {
        let mut ctx = Context::builder(Method::Get, "/").build();
        assert!(matches!(ctx.header("bad header", "x"), Err(Error::InvalidHeaderName(_))));
        assert!(matches!(ctx.header("x-ok", "line\nbreak"), Err(Error::InvalidHeaderValue(_))));
        ctx.set_headers([("x-a", "1"), ("x-b", "2")]).unwrap();
        assert_eq!(ctx.response().header("x-b"), Some("2"));
    }

    #[test]
    fn state_bag_carries_typed_values() {
        #[derive(Clone, Debug, PartialEq)]
        struct UserId(u64);

        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.state_mut().insert(UserId(9));
        assert_eq!(ctx.state().get::<UserId>(), Some(&UserId(9)));
    }
}
