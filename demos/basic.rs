//! Minimal wick example: JSON endpoints, per-route middleware, static files.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:5000/users/42
//!   curl -X POST http://localhost:5000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:5000/users/42 -H 'x-api-key: secret'
//!   curl http://localhost:5000/Cargo.toml
//!   curl http://localhost:5000/slow

use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;
use wick::middleware::{self, ParsedBody, StaticOptions};
use wick::{from_fn, handler_fn, BoxFuture, Context, Method, Middleware, Router, Server, ServerConfig};

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

#[tokio::main]
async fn main() -> wick::Result<()> {
    tracing_subscriber::fmt::init();

    // WICK_ADDR, WICK_ENV=development, ... override the defaults.
    let config = ServerConfig::from_env()?;

    let require_key = from_fn(|ctx, next| {
        Box::pin(async move {
            if ctx.header_value("x-api-key") != Some("secret") {
                return ctx.status(StatusCode::UNAUTHORIZED).json(&serde_json::json!({ "error": "Unauthorized" }));
            }
            next.run(ctx).await
        })
    })
    .boxed();

    let app = Router::new()
        .use_middleware(middleware::trace())
        .use_middleware(middleware::json())
        .get("/users/:id", get_user)
        .post("/users", create_user)
        .register(Method::Delete, "/users/:id", [require_key], handler_fn(delete_user))
        .register(
            Method::Get,
            "/slow",
            [middleware::timeout(Duration::from_millis(200)).boxed()],
            handler_fn(|ctx| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    ctx.text("too late");
                    Ok(())
                })
            }),
        )
        // Anything else under GET is looked up in the working directory.
        .register(
            Method::Get,
            "/*",
            [middleware::static_files(StaticOptions::new(".").max_age(60)).boxed()],
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.status(StatusCode::NOT_FOUND).text("no such file");
                    Ok(())
                })
            }),
        );

    Server::new(config).serve(app).await
}

// GET /users/:id
fn get_user(ctx: &mut Context) -> BoxFuture<'_, wick::Result<()>> {
    Box::pin(async move {
        let id = ctx.param("id").unwrap_or("unknown").to_owned();
        ctx.json(&serde_json::json!({ "id": id, "name": "alice" }))
    })
}

// POST /users
//
// The json() middleware has already parsed the body into ParsedBody.
fn create_user(ctx: &mut Context) -> BoxFuture<'_, wick::Result<()>> {
    Box::pin(async move {
        let Some(ParsedBody::Json(value)) = ctx.state().get::<ParsedBody>().cloned() else {
            return ctx.status(StatusCode::BAD_REQUEST).json(&serde_json::json!({ "error": "expected JSON" }));
        };
        let input: CreateUser = serde_json::from_value(value)?;

        ctx.status(StatusCode::CREATED).header("location", "/users/99")?;
        ctx.json(&serde_json::json!({ "id": "99", "name": input.name }))
    })
}

// DELETE /users/:id → 204 No Content
fn delete_user(ctx: &mut Context) -> BoxFuture<'_, wick::Result<()>> {
    Box::pin(async move {
        ctx.status(StatusCode::NO_CONTENT).end();
        Ok(())
    })
}
