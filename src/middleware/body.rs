//! Body-parsing middleware.
//!
//! Both parsers only act when the request's content type matches and the
//! method can carry a body (`GET` and `HEAD` pass straight through). On success
//! the decoded body is stored in the state bag as a [`ParsedBody`]; on a
//! malformed body they answer `400` and stop the chain.

use std::collections::HashMap;

use http::StatusCode;
use serde_json::{json as json_value, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, Middleware, Next};

/// A request body decoded by [`json`] or [`urlencoded`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(HashMap<String, String>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Form,
}

impl Format {
    fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }

    fn rejection(self) -> &'static str {
        match self {
            Self::Json => "Invalid JSON",
            Self::Form => "Invalid form data",
        }
    }
}

/// See [`json`] and [`urlencoded`].
#[derive(Clone, Debug)]
pub struct BodyParser {
    format: Format,
}

/// Parses `application/json` bodies into [`ParsedBody::Json`].
pub fn json() -> BodyParser {
    BodyParser { format: Format::Json }
}

/// Parses `application/x-www-form-urlencoded` bodies into [`ParsedBody::Form`].
pub fn urlencoded() -> BodyParser {
    BodyParser { format: Format::Form }
}

impl BodyParser {
    async fn parse(&self, ctx: &mut Context) -> Result<ParsedBody> {
        Ok(match self.format {
            Format::Json => ParsedBody::Json(ctx.body_json().await?),
            Format::Form => ParsedBody::Form(ctx.body_form().await?),
        })
    }
}

impl Middleware for BodyParser {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let wants_body = !ctx.method().is_bodyless();
            if wants_body && ctx.content_type().contains(self.format.content_type()) {
                match self.parse(ctx).await {
                    Ok(parsed) => {
                        ctx.state_mut().insert(parsed);
                    }
                    Err(e) => {
                        debug!(error = %e, "rejecting request body");
                        ctx.status(StatusCode::BAD_REQUEST)
                            .json(&json_value!({ "error": self.format.rejection() }))?;
                        return Ok(());
                    }
                }
            }
            next.run(ctx).await
        })
    }
}
