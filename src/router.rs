//! Ordered request router.
//!
//! Routes are tried in the order they were registered and the first one
//! whose method and template both fit the request wins. There is no ranking
//! by specificity: register `/users/me` before `/users/:id` if both exist.
//!
//! Global middleware added with [`Router::use_middleware`] is copied into
//! every route registered *after* it. Routes registered earlier keep the
//! chain they were built with.
//!
//! The router is built once during setup and then shared read-only by every
//! request. Registering routes while requests are being served is not
//! supported; the builder API (every method takes `self`) makes that hard to
//! do by accident.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::Context;
use crate::error::Result;
use crate::handler::{handler_fn, BoxFuture, BoxedMiddleware, Handler, Middleware};
use crate::method::Method;
use crate::path::{Params, PathPattern};
use crate::route::Route;

/// The application router.
///
/// Each registration call returns `self` so registrations chain naturally:
///
/// ```rust
/// use wick::{from_fn, Router};
///
/// let app = Router::new()
///     .use_middleware(from_fn(|ctx, next| Box::pin(async move {
///         ctx.header("x-served-by", "wick")?;
///         next.run(ctx).await
///     })))
///     .get("/users/:id", |ctx| Box::pin(async move {
///         let id = ctx.param("id").unwrap_or_default().to_owned();
///         ctx.json(&serde_json::json!({ "id": id }))
///     }))
///     .post("/users", |ctx| Box::pin(async move {
///         ctx.status(http::StatusCode::CREATED).end();
///         Ok(())
///     }));
///
/// assert_eq!(app.routes().count(), 2);
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends middleware that wraps every route registered from now on.
    pub fn use_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers a route with its own middleware in front of `handler`.
    ///
    /// The route's chain is the global middleware registered so far followed
    /// by `middleware`, in order.
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be compiled into a matcher.
    pub fn register<I>(mut self, method: Method, path: &str, middleware: I, handler: impl Handler) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        let pattern = PathPattern::compile(path).unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));

        let mut chain = self.middleware.clone();
        chain.extend(middleware);

        debug!(%method, path, middleware = chain.len(), "route registered");
        self.routes.push(Route::new(method, pattern, chain, Arc::new(handler)));
        self
    }

    /// Registers a closure or function as the handler for `method` + `path`.
    pub fn on<F>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.register(method, path, Vec::new(), handler_fn(handler))
    }

    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Get, path, handler)
    }

    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Post, path, handler)
    }

    pub fn put<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Delete, path, handler)
    }

    pub fn patch<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Patch, path, handler)
    }

    pub fn head<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Head, path, handler)
    }

    pub fn options<F>(self, path: &str, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.on(Method::Options, path, handler)
    }

    /// Registered routes in match-priority order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Finds the first route matching `method` + `path`. Pure: calling it
    /// repeatedly with the same input gives the same answer.
    pub fn lookup(&self, method: Method, path: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(method, path).map(|params| (route, params)))
    }

    /// Dispatches one request.
    ///
    /// Returns `Ok(true)` when a route matched and its chain ran (to the
    /// handler or up to a middleware that answered early), `Ok(false)` when
    /// nothing matched (the context is left untouched), and the chain's error
    /// unchanged when a step failed.
    pub async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        let Some((route, params)) = self.lookup(ctx.method(), ctx.path()) else {
            trace!(method = %ctx.method(), path = ctx.path(), "no route matched");
            return Ok(false);
        };

        trace!(method = %route.method(), route = route.path(), "route matched");
        ctx.set_params(params);
        route.execute(ctx).await?;
        Ok(true)
    }
}
