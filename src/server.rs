//! HTTP server and graceful shutdown.
//!
//! The server owns everything the router does not: the listener, connection
//! handling, turning a [`Context`] into bytes on the wire, and deciding what
//! the client sees when no route matches or a chain fails.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C (or when the future given to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Asks every open connection to finish its in-flight request and close.
//! 3. Returns once every connection task has ended.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::router::Router;

/// Turns a chain failure into a response. See [`Server::on_error`].
pub type ErrorHook = Arc<dyn Fn(&Error, &mut Context) + Send + Sync + 'static>;

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    on_error: Option<ErrorHook>,
}

/// What every connection task shares.
struct Shared {
    router: Router,
    on_error: ErrorHook,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config, on_error: None }
    }

    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called, with every other setting at its default.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use wick::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self::new(ServerConfig { addr, ..ServerConfig::default() }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Replaces the default failure translation.
    ///
    /// The hook runs after the failure has been logged. Whatever it leaves in
    /// the context is sent; if it finishes nothing, the client gets an empty
    /// `500`.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error, &mut Context) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<()> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr).await?;
        self.serve_on(listener, router, signal).await
    }

    /// Serves on an already bound listener. `config.addr` is ignored.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let expose_errors = self.config.expose_errors;
        let on_error: ErrorHook = match self.on_error {
            Some(hook) => hook,
            None => Arc::new(move |err: &Error, ctx: &mut Context| {
                default_error_response(err, ctx, expose_errors)
            }),
        };
        let shared = Arc::new(Shared { router, on_error });

        let mut builder = ConnBuilder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.header_read_timeout())
            .keep_alive(self.config.keep_alive);
        let builder = Arc::new(builder);

        info!(addr = %local_addr, "wick listening");

        // Flipped once on shutdown; every connection task watches it.
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut tasks = tokio::task::JoinSet::new();

        let signal = signal;
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let shared = Arc::clone(&shared);
                    let builder = Arc::clone(&builder);
                    let mut drain = drain_rx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let shared = Arc::clone(&shared);
                            async move { dispatch(shared, req, remote_addr).await }
                        });

                        let conn = builder.serve_connection(io, svc);
                        tokio::pin!(conn);
                        let mut draining = false;

                        loop {
                            tokio::select! {
                                res = conn.as_mut() => {
                                    if let Err(e) = res {
                                        error!(peer = %remote_addr, "connection error: {e}");
                                    }
                                    break;
                                }
                                _ = drain.changed(), if !draining => {
                                    draining = true;
                                    conn.as_mut().graceful_shutdown();
                                }
                            }
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        let _ = drain_tx.send(true);
        while tasks.join_next().await.is_some() {}

        info!("wick stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// The error type is [`Infallible`]: every failure is turned into a response
/// here, so hyper never sees an error.
async fn dispatch(
    shared: Arc<Shared>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let mut ctx = match Context::from_request(req) {
        Ok(ctx) => ctx,
        Err(e) => {
            debug!(peer = %remote_addr, "rejecting request: {e}");
            let mut res = http::Response::new(Full::new(Bytes::new()));
            *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            return Ok(res);
        }
    };
    ctx.set_remote_addr(remote_addr);

    match shared.router.handle(&mut ctx).await {
        Ok(true) => {
            if !ctx.response().is_finished() {
                warn!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    "chain completed without finishing a response"
                );
                ctx.reset_response();
                ctx.status(StatusCode::INTERNAL_SERVER_ERROR).end();
            }
        }
        Ok(false) => not_found(&mut ctx),
        Err(e) => {
            error!(method = %ctx.method(), path = ctx.path(), error = %e, "request failed");
            (shared.on_error)(&e, &mut ctx);
            if !ctx.response().is_finished() {
                ctx.status(StatusCode::INTERNAL_SERVER_ERROR).end();
            }
        }
    }

    Ok(ctx.into_response())
}

fn not_found(ctx: &mut Context) {
    let message = format!("Cannot {} {}", ctx.method(), ctx.path());
    let body = json!({ "error": "Not Found", "message": message });
    if let Err(e) = ctx.status(StatusCode::NOT_FOUND).json(&body) {
        error!("failed to encode 404 body: {e}");
    }
}

/// The default [`ErrorHook`]: a `500` JSON body, unless the chain already
/// finished a response before failing, in which case that response stands.
pub fn default_error_response(err: &Error, ctx: &mut Context, expose_errors: bool) {
    if ctx.response().is_finished() {
        return;
    }
    let message = if expose_errors { err.to_string() } else { "Something went wrong".to_owned() };
    let body = json!({ "error": "Internal Server Error", "message": message });

    ctx.reset_response();
    if let Err(e) = ctx.status(StatusCode::INTERNAL_SERVER_ERROR).json(&body) {
        error!("failed to encode 500 body: {e}");
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// failure is logged and that signal is never reported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // No SIGTERM off Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    #[test]
    fn bind_rejects_garbage() {
        assert!(matches!(Server::bind("not an addr"), Err(Error::InvalidAddress(_))));
        assert_eq!(Server::bind("127.0.0.1:9000").unwrap().config().addr.port(), 9000);
    }

    #[test]
    fn not_found_names_method_and_path() {
        let mut ctx = Context::builder(Method::Delete, "/missing").build();
        not_found(&mut ctx);
        assert_eq!(ctx.response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ctx.response().body().unwrap(),
            r#"{"error":"Not Found","message":"Cannot DELETE /missing"}"#
        );
    }

    #[test]
    fn default_error_response_hides_details_unless_exposed() {
        let err = Error::handler("db down");

        let mut ctx = Context::builder(Method::Get, "/").build();
        default_error_response(&err, &mut ctx, false);
        assert_eq!(
            ctx.response().body().unwrap(),
            r#"{"error":"Internal Server Error","message":"Something went wrong"}"#
        );

        let mut ctx = Context::builder(Method::Get, "/").build();
        default_error_response(&err, &mut ctx, true);
        assert_eq!(
            ctx.response().body().unwrap(),
            r#"{"error":"Internal Server Error","message":"db down"}"#
        );
    }

    #[test]
    fn default_error_response_keeps_headers_set_before_the_failure() {
        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.header("access-control-allow-origin", "*").unwrap();
        ctx.status(StatusCode::CREATED);
        default_error_response(&Error::handler("boom"), &mut ctx, false);

        let res = ctx.response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert_eq!(res.header("content-type"), Some("application/json; charset=utf-8"));
    }

    #[test]
    fn default_error_response_keeps_finished_response() {
        let mut ctx = Context::builder(Method::Get, "/").build();
        ctx.status(StatusCode::ACCEPTED).text("already sent");
        default_error_response(&Error::handler("late"), &mut ctx, true);
        assert_eq!(ctx.response().status(), StatusCode::ACCEPTED);
        assert_eq!(ctx.response().body().unwrap(), "already sent");
    }
}
