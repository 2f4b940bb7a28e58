//! Built-in middleware.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. Each constructor returns a value implementing
//! [`Middleware`](crate::Middleware), ready for
//! [`Router::use_middleware`](crate::Router::use_middleware) or, via
//! [`Middleware::boxed`](crate::Middleware::boxed), for a single route.
//!
//! | Middleware | Does |
//! |---|---|
//! | [`json`] / [`urlencoded`] | parse the request body into [`ParsedBody`] |
//! | [`static_files`] | serve files from a directory, fall through otherwise |
//! | [`timeout`] | answer `504` when the rest of the chain takes too long |
//! | [`trace`] | per-request span with method, path, status, latency |

mod body;
mod static_files;
mod timeout;
mod trace;

pub use body::{json, urlencoded, BodyParser, ParsedBody};
pub use static_files::{static_files, StaticFiles, StaticOptions};
pub use timeout::{timeout, Timeout};
pub use trace::{trace, Trace};
