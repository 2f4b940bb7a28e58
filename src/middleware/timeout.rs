//! Deadline for the rest of the chain.

use std::time::Duration;

use http::StatusCode;
use serde_json::json;
use tracing::warn;

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, Middleware, Next};

/// See [`timeout`].
#[derive(Clone, Copy, Debug)]
pub struct Timeout {
    duration: Duration,
}

/// Races the rest of the chain against a timer.
///
/// When the timer wins, the inner steps are dropped where they stand (the
/// status and body they wrote are discarded, headers set so far are kept)
/// and the request is answered with
/// `504 Gateway Timeout`. Steps that already started side effects are not
/// rolled back.
pub fn timeout(duration: Duration) -> Timeout {
    Timeout { duration }
}

impl Middleware for Timeout {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let outcome = tokio::time::timeout(self.duration, next.run(ctx)).await;
            match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        method = %ctx.method(),
                        path = ctx.path(),
                        timeout_ms = self.duration.as_millis() as u64,
                        "request timed out"
                    );
                    ctx.reset_response();
                    ctx.status(StatusCode::GATEWAY_TIMEOUT)
                        .json(&json!({ "error": "Gateway Timeout" }))
                }
            }
        })
    }
}
