use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use wick::{
    from_fn, handler_fn, BoxFuture, BoxedMiddleware, Context, Error, Handler, Method, Middleware,
    Router, WILDCARD,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Middleware that records entering and leaving around `next`.
fn record(log: &Log, name: &'static str) -> BoxedMiddleware {
    let log = Arc::clone(log);
    from_fn(move |ctx, next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(format!("{name}:in"));
            let result = next.run(ctx).await;
            log.lock().unwrap().push(format!("{name}:out"));
            result
        })
    })
    .boxed()
}

/// Middleware that answers `401` without calling `next`.
fn deny(log: &Log) -> BoxedMiddleware {
    let log = Arc::clone(log);
    from_fn(move |ctx, _next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push("deny".to_owned());
            ctx.status(StatusCode::UNAUTHORIZED).text("denied");
            Ok(())
        })
    })
    .boxed()
}

/// Middleware that fails without calling `next`.
fn fail(log: &Log, message: &'static str) -> BoxedMiddleware {
    let log = Arc::clone(log);
    from_fn(move |_ctx, _next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push("fail".to_owned());
            Err(Error::handler(message))
        })
    })
    .boxed()
}

fn handler(log: &Log, body: &'static str) -> impl Handler {
    let log = Arc::clone(log);
    handler_fn(move |ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push("handler".to_owned());
            ctx.text(body);
            Ok(())
        })
    })
}

fn echo_params(ctx: &mut Context) -> BoxFuture<'_, wick::Result<()>> {
    Box::pin(async move {
        let mut params: Vec<_> = ctx.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
        params.sort();
        ctx.text(params.join("&"));
        Ok(())
    })
}

async fn dispatch(router: &Router, method: Method, path: &str) -> (bool, Context) {
    let mut ctx = Context::builder(method, path).build();
    let matched = router.handle(&mut ctx).await.unwrap();
    (matched, ctx)
}

fn body(ctx: &Context) -> &str {
    std::str::from_utf8(ctx.response().body().unwrap()).unwrap()
}

#[tokio::test]
async fn first_registered_route_wins() {
    let log = new_log();
    let router = Router::new()
        .register(Method::Get, "/users/:id", [], handler(&log, "by id"))
        .register(Method::Get, "/users/me", [], handler(&log, "me"));

    let (matched, ctx) = dispatch(&router, Method::Get, "/users/me").await;
    assert!(matched);
    assert_eq!(body(&ctx), "by id");
    assert_eq!(ctx.param("id"), Some("me"));
}

#[tokio::test]
async fn named_params_bind_single_segments() {
    let router = Router::new().get("/users/:id/posts/:post", echo_params);

    let (matched, ctx) = dispatch(&router, Method::Get, "/users/7/posts/hello-world").await;
    assert!(matched);
    assert_eq!(body(&ctx), "id=7&post=hello-world");

    for path in ["/users/7/posts/", "/users/7/posts/a/b", "/users//posts/x"] {
        let (matched, _) = dispatch(&router, Method::Get, path).await;
        assert!(!matched, "{path} should not match");
    }
}

#[tokio::test]
async fn wildcard_captures_the_rest() {
    let router = Router::new().get("/files/*", |ctx| {
        Box::pin(async move {
            let rest = ctx.wildcard().unwrap_or_default().to_owned();
            ctx.text(rest);
            Ok(())
        })
    });

    let (_, ctx) = dispatch(&router, Method::Get, "/files/a/b/c.txt").await;
    assert_eq!(body(&ctx), "a/b/c.txt");
    assert_eq!(ctx.params()[WILDCARD], "a/b/c.txt");

    let (matched, ctx) = dispatch(&router, Method::Get, "/files/").await;
    assert!(matched);
    assert_eq!(body(&ctx), "");
}

#[tokio::test]
async fn method_must_match() {
    let log = new_log();
    let router = Router::new().register(Method::Post, "/items", [], handler(&log, "created"));

    let (matched, ctx) = dispatch(&router, Method::Get, "/items").await;
    assert!(!matched);
    assert!(!ctx.response().is_finished());
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn middleware_runs_as_an_onion() {
    let log = new_log();
    let router = Router::new()
        .use_middleware(record(&log, "global"))
        .register(
            Method::Get,
            "/",
            [record(&log, "first"), record(&log, "second")],
            handler(&log, "done"),
        );

    let (_, ctx) = dispatch(&router, Method::Get, "/").await;
    assert_eq!(body(&ctx), "done");
    assert_eq!(
        entries(&log),
        [
            "global:in",
            "first:in",
            "second:in",
            "handler",
            "second:out",
            "first:out",
            "global:out"
        ]
    );
}

#[tokio::test]
async fn global_middleware_only_wraps_later_routes() {
    let log = new_log();
    let router = Router::new()
        .register(Method::Get, "/before", [], handler(&log, "before"))
        .use_middleware(record(&log, "global"))
        .register(Method::Get, "/after", [], handler(&log, "after"));

    dispatch(&router, Method::Get, "/before").await;
    assert_eq!(entries(&log), ["handler"]);

    log.lock().unwrap().clear();
    dispatch(&router, Method::Get, "/after").await;
    assert_eq!(entries(&log), ["global:in", "handler", "global:out"]);
}

#[tokio::test]
async fn middleware_can_answer_early() {
    let log = new_log();
    let router = Router::new().register(
        Method::Get,
        "/admin",
        [record(&log, "outer"), deny(&log), record(&log, "inner")],
        handler(&log, "secret"),
    );

    let (matched, ctx) = dispatch(&router, Method::Get, "/admin").await;
    assert!(matched);
    assert_eq!(ctx.response().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&ctx), "denied");
    assert_eq!(entries(&log), ["outer:in", "deny", "outer:out"]);
}

#[tokio::test]
async fn failing_middleware_aborts_the_chain() {
    let log = new_log();
    let router = Router::new().register(
        Method::Get,
        "/",
        [record(&log, "first"), record(&log, "second"), fail(&log, "third broke"), record(&log, "fourth")],
        handler(&log, "unreachable"),
    );

    let mut ctx = Context::builder(Method::Get, "/").build();
    let err = router.handle(&mut ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "third broke");
    assert!(!ctx.response().is_finished());
    assert_eq!(entries(&log), ["first:in", "second:in", "fail", "second:out", "first:out"]);
}

#[tokio::test]
async fn handler_errors_propagate_unchanged() {
    let router = Router::new().get("/", |_ctx| Box::pin(async { Err(Error::Timeout) }));

    let mut ctx = Context::builder(Method::Get, "/").build();
    let err = router.handle(&mut ctx).await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
}

#[tokio::test]
async fn empty_router_matches_nothing() {
    let router = Router::new();
    let mut ctx = Context::builder(Method::Get, "/anything").build();

    assert!(!router.handle(&mut ctx).await.unwrap());
    assert!(ctx.params().is_empty());
    assert!(!ctx.response().is_finished());
    assert_eq!(ctx.response().status(), StatusCode::OK);
}

#[tokio::test]
async fn lookup_is_repeatable() {
    let router = Router::new().get("/a/:x", echo_params).get("/a/b", echo_params);

    for _ in 0..3 {
        let (route, params) = router.lookup(Method::Get, "/a/b").unwrap();
        assert_eq!(route.path(), "/a/:x");
        assert_eq!(params["x"], "b");
    }
    assert!(router.lookup(Method::Delete, "/a/b").is_none());
}

#[tokio::test]
async fn concurrent_requests_do_not_share_state() {
    let router = Arc::new(Router::new().get("/n/:n", |ctx| {
        Box::pin(async move {
            let n: u64 = ctx.param("n").unwrap_or("0").parse().unwrap_or(0);
            tokio::time::sleep(std::time::Duration::from_millis(20 - n)).await;
            let echoed = ctx.param("n").unwrap_or_default().to_owned();
            ctx.text(echoed);
            Ok(())
        })
    }));

    let tasks: Vec<_> = (0..10u64)
        .map(|n| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let mut ctx = Context::builder(Method::Get, &format!("/n/{n}")).build();
                router.handle(&mut ctx).await.unwrap();
                (n, ctx.response().body().cloned())
            })
        })
        .collect();

    for task in tasks {
        let (n, body) = task.await.unwrap();
        assert_eq!(body.unwrap(), n.to_string());
    }
}

#[tokio::test]
async fn global_middleware_runs_only_for_matched_requests() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = {
        let hits = Arc::clone(&hits);
        from_fn(move |ctx, next| {
            hits.fetch_add(1, Ordering::SeqCst);
            next.run(ctx)
        })
    };
    let router = Router::new()
        .use_middleware(counter)
        .get("/a", echo_params)
        .get("/b/:x", echo_params);

    for path in ["/a", "/b/1", "/c", "/b/"] {
        dispatch(&router, Method::Get, path).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
