//! The response a request's chain is building.
//!
//! Handlers never construct this type. They write through [`Context`]
//! (`ctx.json(..)`, `ctx.text(..)`, `ctx.status(..)`), and the server turns
//! whatever has been written into the wire response once the chain unwinds.
//! Because nothing is sent before that point, middleware can still change
//! the status or add headers after `next` returns.
//!
//! [`Context`]: crate::Context

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Context::bytes`](crate::Context::bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Gif,          // image/gif
    Html,         // text/html; charset=utf-8
    Icon,         // image/x-icon
    JavaScript,   // application/javascript
    Jpeg,         // image/jpeg
    Json,         // application/json; charset=utf-8
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html; charset=utf-8",
            Self::Icon        => "image/x-icon",
            Self::JavaScript  => "application/javascript",
            Self::Jpeg        => "image/jpeg",
            Self::Json        => "application/json; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }

    /// Guesses a content type from a file extension (without the dot).
    ///
    /// Unknown extensions map to [`ContentType::OctetStream`].
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css"          => Self::Css,
            "csv"          => Self::Csv,
            "gif"          => Self::Gif,
            "htm" | "html" => Self::Html,
            "ico"          => Self::Icon,
            "js" | "mjs"   => Self::JavaScript,
            "jpg" | "jpeg" => Self::Jpeg,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }

    fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// The status, headers and body written so far for one request.
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The finished body, or `None` while nothing has finalized the response.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether a body writer, a redirect or an explicit `end` has run.
    pub fn is_finished(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn finish(&mut self, content_type: ContentType, body: Bytes) {
        self.headers.insert(CONTENT_TYPE, content_type.header_value());
        self.body = Some(body);
    }

    pub(crate) fn end(&mut self) {
        if self.body.is_none() {
            self.body = Some(Bytes::new());
        }
    }

    /// Drops the status and body written so far, along with the headers that
    /// describe that body. Other headers (request ids, CORS) survive.
    pub(crate) fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.body = None;
        for name in [CONTENT_TYPE, CONTENT_LENGTH, LOCATION] {
            self.headers.remove(name);
        }
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.unwrap_or_default()));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}
