//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A route points at a
//! [`Handler`]: a plain async function or a middleware [`Pipeline`](crate::Pipeline).

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::trace;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax. Inside a pipeline,
    /// [`RequiredParam`](crate::middleware::extract::RequiredParam) extracts them:
    ///
    /// ```rust
    /// # use http::Method;
    /// # use sieve::{compose, Request, Response, Router};
    /// # use sieve::middleware::extract::RequiredParam;
    /// # async fn list_users(_: Request) -> Response { Response::text("") }
    /// async fn get_user(id: String) -> Response {
    ///     Response::text(id)
    /// }
    ///
    /// Router::new()
    ///     .on(Method::GET, "/users",      list_users)
    ///     .on(Method::GET, "/users/{id}", compose((RequiredParam::new("id"),)).wrap(get_user));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for the same method. Routes are wired at startup, so this
    /// surfaces on the first run.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Routes one request and produces one response.
    ///
    /// Unmatched paths get `404 Not Found`; paths registered under another
    /// method get `405 Method Not Allowed`.
    pub async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => handler.call(req.with_params(params)).await,
            None if self.matches_any_method(req.path()) => {
                trace!(method = %req.method(), path = req.path(), "method not allowed");
                Response::status(StatusCode::METHOD_NOT_ALLOWED)
            }
            None => {
                trace!(method = %req.method(), path = req.path(), "no route");
                Response::status(StatusCode::NOT_FOUND)
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn matches_any_method(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
