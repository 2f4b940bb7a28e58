//! Terminal handlers, middleware, and the continuation that links them.
//!
//! # Two kinds of step
//!
//! Every route runs an ordered chain: zero or more [`Middleware`] followed by
//! exactly one [`Handler`].
//!
//! ```text
//! Handler::call(ctx)                  ← terminal, produces the response
//! Middleware::handle(ctx, next)       ← may delegate by calling next.run(ctx)
//! ```
//!
//! A middleware can do three things:
//!
//! 1. call `next.run(ctx).await` to run the rest of the chain, then continue
//!    with its own post-processing once everything nested inside has finished;
//! 2. write a response and return without calling `next`, which stops the
//!    chain: no later middleware runs and neither does the handler;
//! 3. return an `Err`, which aborts the chain and travels unchanged up to the
//!    caller of [`Router::handle`](crate::Router::handle).
//!
//! # The continuation
//!
//! [`Next`] is a cursor into the route's middleware list plus a reference to
//! its terminal handler. A fresh one is made for every request, so no cursor
//! is ever shared between requests. `Next::run` takes `self` by value and
//! `Next` is neither `Clone` nor `Copy`, so running the rest of the chain
//! twice from one middleware does not compile:
//!
//! ```rust,compile_fail
//! use wick::{from_fn, Context, Next};
//!
//! from_fn(|ctx: &mut Context, next: Next<'_>| Box::pin(async move {
//!     next.run(ctx).await?;
//!     next.run(ctx).await // error[E0382]: use of moved value: `next`
//! }));
//! ```
//!
//! # Writing steps as closures
//!
//! Both traits use an explicit boxed future so that a step can borrow the
//! context across `.await` points. Closures are adapted with [`handler_fn`]
//! and [`from_fn`]:
//!
//! ```rust
//! use wick::{from_fn, handler_fn, Middleware};
//!
//! let greet = handler_fn(|ctx| Box::pin(async move {
//!     ctx.text("hello");
//!     Ok(())
//! }));
//!
//! let powered_by = from_fn(|ctx, next| Box::pin(async move {
//!     next.run(ctx).await?;
//!     ctx.header("x-powered-by", "wick")?;
//!     Ok(())
//! }));
//! # let _ = (greet, powered_by.boxed());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::trace;

use crate::context::Context;
use crate::error::Result;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future borrowing for `'a`.
///
/// `Send` lets tokio move a request's future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A terminal handler shared by every request that hits its route.
pub type BoxedHandler = Arc<dyn Handler>;

/// A middleware shared by every route it was attached to.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ── Traits ───────────────────────────────────────────────────────────────────

/// The last step of a route's chain.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>>;
}

/// An intermediate step that receives the rest of the chain as [`Next`].
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>>;

    /// Moves this middleware behind an `Arc` for use in a route's list.
    fn boxed(self) -> BoxedMiddleware
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        (**self).handle(ctx, next)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        (**self).call(ctx)
    }
}

// ── Continuation ─────────────────────────────────────────────────────────────

/// The rest of a route's chain, as seen from one middleware.
///
/// Obtained only as the argument of [`Middleware::handle`].
pub struct Next<'a> {
    chain: &'a [BoxedMiddleware],
    index: usize,
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// A continuation positioned at the first step of `chain`.
    pub(crate) fn new(chain: &'a [BoxedMiddleware], handler: &'a dyn Handler) -> Self {
        Self { chain, index: 0, handler }
    }

    /// Runs the remaining middleware, then the terminal handler.
    ///
    /// Consumes the continuation: each middleware invocation can delegate at
    /// most once.
    pub fn run<'c>(self, ctx: &'c mut Context) -> BoxFuture<'c, Result<()>>
    where
        'a: 'c,
    {
        match self.chain.get(self.index) {
            Some(middleware) => {
                trace!(index = self.index, "entering middleware");
                let next = Next { chain: self.chain, index: self.index + 1, handler: self.handler };
                middleware.handle(ctx, next)
            }
            None => {
                trace!("entering handler");
                self.handler.call(ctx)
            }
        }
    }

    /// Number of middleware still ahead of the terminal handler.
    pub fn remaining(&self) -> usize {
        self.chain.len() - self.index
    }
}

// ── Closure adapters ─────────────────────────────────────────────────────────

/// A [`Handler`] built from a closure or function. See [`handler_fn`].
pub struct HandlerFn<F>(F);

/// Adapts `f` into a [`Handler`].
///
/// Works for closures and for plain functions with the signature
/// `fn(&mut Context) -> BoxFuture<'_, Result<()>>`.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        (self.0)(ctx)
    }
}

/// A [`Middleware`] built from a closure or function. See [`from_fn`].
pub struct MiddlewareFn<F>(F);

/// Adapts `f` into a [`Middleware`].
pub fn from_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    MiddlewareFn(f)
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        (self.0)(ctx, next)
    }
}
