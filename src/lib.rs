//! # wick
//!
//! A minimal HTTP application framework: an ordered router, onion-style
//! middleware, a per-request [`Context`], and a small outbound [`client`].
//!
//! ## How a request flows
//!
//! 1. The [`Server`] accepts a connection and builds a [`Context`].
//! 2. The [`Router`] walks its routes in registration order; the first whose
//!    method and path template fit the request wins.
//! 3. The winning [`Route`] runs its middleware in order, then its handler.
//!    Each middleware decides whether to call [`Next::run`]; code after that
//!    call runs once everything nested inside has finished.
//! 4. No match means a `404`. A failure anywhere in the chain means the
//!    server's error hook (by default a `500`).
//!
//! ## Path templates
//!
//! | Template piece | Matches | Captured as |
//! |---|---|---|
//! | `users` | exactly `users` | |
//! | `:id` | one non-empty segment | `id` |
//! | `*` | anything, `/` included, possibly nothing | `*` ([`WILDCARD`]) |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use wick::{middleware, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> wick::Result<()> {
//!     let app = Router::new()
//!         .use_middleware(middleware::trace())
//!         .use_middleware(middleware::json())
//!         .get("/users/:id", |ctx| Box::pin(async move {
//!             let id = ctx.param("id").unwrap_or_default().to_owned();
//!             ctx.json(&serde_json::json!({ "id": id }))
//!         }))
//!         .post("/users", |ctx| Box::pin(async move {
//!             ctx.status(StatusCode::CREATED).header("location", "/users/99")?;
//!             ctx.json(&serde_json::json!({ "id": "99" }))
//!         }));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod config;
mod context;
mod error;
mod handler;
mod method;
mod path;
mod response;
mod route;
mod router;
mod server;

pub mod client;
pub mod middleware;

pub use client::Client;
pub use config::ServerConfig;
pub use context::{Body, Context, ContextBuilder};
pub use error::{BoxError, Error, Result};
pub use handler::{
    from_fn, handler_fn, BoxFuture, BoxedHandler, BoxedMiddleware, Handler, HandlerFn, Middleware,
    MiddlewareFn, Next,
};
pub use method::Method;
pub use path::{Params, PathPattern, WILDCARD};
pub use response::{ContentType, Response};
pub use route::Route;
pub use router::Router;
pub use server::{default_error_response, ErrorHook, Server};
