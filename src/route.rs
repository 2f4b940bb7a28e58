//! A single method + template binding and its middleware chain.

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxedHandler, BoxedMiddleware, Next};
use crate::method::Method;
use crate::path::{Params, PathPattern};

/// One registered route. Built by [`Router`](crate::Router) and never
/// changed afterwards.
pub struct Route {
    method: Method,
    pattern: PathPattern,
    middleware: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: PathPattern,
        middleware: Vec<BoxedMiddleware>,
        handler: BoxedHandler,
    ) -> Self {
        Self { method, pattern, middleware, handler }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The template the route was registered with.
    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Length of the middleware chain, global middleware included.
    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    /// Checks method first, then path. `None` means "not this route".
    pub fn matches(&self, method: Method, path: &str) -> Option<Params> {
        if method != self.method {
            return None;
        }
        self.pattern.matches(path)
    }

    /// Runs the middleware chain and, unless something short-circuits, the
    /// terminal handler.
    pub async fn execute(&self, ctx: &mut Context) -> Result<()> {
        Next::new(&self.middleware, &*self.handler).run(ctx).await
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
