//! Static file serving.

use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, Middleware, Next};
use crate::method::Method;
use crate::response::ContentType;

/// Options for [`static_files`].
#[derive(Clone, Debug)]
pub struct StaticOptions {
    /// Directory files are served from.
    pub root: PathBuf,
    /// `max-age` in seconds; `0` sends no `cache-control` header.
    pub max_age: u64,
    /// File names tried, in order, when the path names a directory.
    pub index: Vec<String>,
}

impl StaticOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), max_age: 0, index: vec!["index.html".to_owned()] }
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn index(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.index = names.into_iter().map(Into::into).collect();
        self
    }
}

/// See [`static_files`].
#[derive(Clone, Debug)]
pub struct StaticFiles {
    options: StaticOptions,
}

/// Serves `GET`/`HEAD` requests from `options.root`.
///
/// Anything that cannot be served (other methods, missing files, paths that
/// try to leave the root) falls through to the rest of the chain.
pub fn static_files(options: StaticOptions) -> StaticFiles {
    StaticFiles { options }
}

impl StaticFiles {
    /// Maps a request path onto the filesystem, refusing `..` and prefixes.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut path = self.options.root.clone();
        for component in Path::new(request_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }

    async fn locate(&self, request_path: &str) -> Option<PathBuf> {
        let path = self.resolve(request_path)?;
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if meta.is_file() {
            return Some(path);
        }
        if !meta.is_dir() {
            return None;
        }
        for name in &self.options.index {
            let candidate = path.join(name);
            if tokio::fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return Some(candidate);
            }
        }
        None
    }

    async fn serve(&self, ctx: &mut Context) -> Result<bool> {
        let Some(file) = self.locate(ctx.path()).await else {
            return Ok(false);
        };
        let Ok(contents) = tokio::fs::read(&file).await else {
            return Ok(false);
        };

        let content_type = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(ContentType::OctetStream, ContentType::from_extension);

        trace!(file = %file.display(), "serving static file");
        if self.options.max_age > 0 {
            ctx.header("cache-control", &format!("public, max-age={}", self.options.max_age))?;
        }
        ctx.bytes(content_type, contents);
        Ok(true)
    }
}

impl Middleware for StaticFiles {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !matches!(ctx.method(), Method::Get | Method::Head) {
                return next.run(ctx).await;
            }
            let served = self.serve(ctx).await;
            if let Ok(true) = served {
                return Ok(());
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, Middleware};
    use crate::Router;

    fn fallback(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            ctx.status(http::StatusCode::NOT_FOUND).text("fallback");
            Ok(())
        })
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.css"), "body{}").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        dir
    }

    fn app(options: StaticOptions) -> Router {
        let files = static_files(options).boxed();
        Router::new()
            .register(Method::Get, "/*", [files.clone()], handler_fn(fallback))
            .register(Method::Post, "/*", [files], handler_fn(fallback))
    }

    async fn get(router: &Router, method: Method, path: &str) -> Context {
        let mut ctx = Context::builder(method, path).build();
        router.handle(&mut ctx).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn serves_file_with_mime_and_cache_header() {
        let dir = site();
        let router = app(StaticOptions::new(dir.path()).max_age(60));

        let ctx = get(&router, Method::Get, "/app.css").await;
        let res = ctx.response();
        assert_eq!(res.body().unwrap(), "body{}");
        assert_eq!(res.header("content-type"), Some("text/css"));
        assert_eq!(res.header("cache-control"), Some("public, max-age=60"));
    }

    #[tokio::test]
    async fn directory_uses_index_file() {
        let dir = site();
        let router = app(StaticOptions::new(dir.path()));

        let ctx = get(&router, Method::Get, "/docs").await;
        assert_eq!(ctx.response().body().unwrap(), "<h1>docs</h1>");
        assert_eq!(ctx.response().header("cache-control"), None);
    }

    #[tokio::test]
    async fn missing_files_and_traversal_fall_through() {
        let dir = site();
        let router = app(StaticOptions::new(dir.path().join("docs")));

        for path in ["/nope.txt", "/../app.css"] {
            let ctx = get(&router, Method::Get, path).await;
            assert_eq!(ctx.response().body().unwrap(), "fallback", "{path}");
        }
    }

    #[tokio::test]
    async fn other_methods_fall_through() {
        let dir = site();
        let router = app(StaticOptions::new(dir.path()));
        let ctx = get(&router, Method::Post, "/app.css").await;
        assert_eq!(ctx.response().body().unwrap(), "fallback");
    }
}
