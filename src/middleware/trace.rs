//! Per-request tracing span.

use std::time::Instant;

use tracing::{error, info, info_span, Instrument};

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, Middleware, Next};

/// See [`trace`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

/// Wraps the rest of the chain in a `request` span carrying method and path,
/// and logs status and latency once it unwinds.
pub fn trace() -> Trace {
    Trace
}

impl Middleware for Trace {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        let span = info_span!("request", method = %ctx.method(), path = ctx.path());
        Box::pin(
            async move {
                let started = Instant::now();
                let result = next.run(ctx).await;
                let latency_us = started.elapsed().as_micros() as u64;
                match &result {
                    Ok(()) => info!(status = ctx.response().status().as_u16(), latency_us, "request finished"),
                    Err(e) => error!(error = %e, latency_us, "request failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}
