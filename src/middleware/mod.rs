//! Middleware: one step of a request pipeline.
//!
//! A middleware inspects a [`Request`] and either extracts a value from it or
//! fails with an error that renders as a [`Response`](crate::Response). It
//! never mutates the request and never calls the next step itself; the
//! [`pipeline`](crate::pipeline) decides what runs next.
//!
//! ```rust
//! use std::convert::Infallible;
//! use sieve::{Rejection, Request};
//! use sieve::middleware::{from_fn, MiddlewareExt};
//! use sieve::outcome::{failure, success, Outcome};
//!
//! // Any async closure returning an Outcome is a middleware.
//! let tenant = from_fn(|req: Request| async move {
//!     match req.header("x-tenant") {
//!         Some(t) => success(t.to_owned()),
//!         None => failure(Rejection::validation("Missing tenant", "x-tenant header is required")),
//!     }
//! });
//!
//! // Combinators reshape the success or the error side.
//! let tenant_len = tenant.map(|t: String| t.len());
//! # let _ = tenant_len;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::outcome::Outcome;
use crate::request::Request;
use crate::response::IntoResponse;

pub mod extract;

/// A boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One extraction/validation step.
///
/// `Output` is what the step hands to the wrapped handler on success.
/// `Error` is what it fails with; it must know how to become a response.
/// Use [`Infallible`](std::convert::Infallible) for steps that cannot fail.
pub trait Middleware: Send + Sync + 'static {
    type Output: Send + 'static;
    type Error: IntoResponse + Send + 'static;

    /// Evaluates this step against the request.
    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Self::Error, Self::Output>>;

    /// Name used in log fields when this step rejects a request.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A type-erased middleware, shareable across pipelines.
///
/// Useful to put differently-typed steps with the same `Output` and `Error`
/// into one `Vec`.
pub type BoxMiddleware<E, A> = Arc<dyn Middleware<Output = A, Error = E>>;

impl<M> Middleware for Arc<M>
where
    M: Middleware + ?Sized,
{
    type Output = M::Output;
    type Error = M::Error;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Self::Error, Self::Output>> {
        (**self).call(req)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Turns an async function of the request into a [`Middleware`].
///
/// The function receives its own handle to the request; handles share the
/// same underlying data, so this costs one reference-count increment.
pub fn from_fn<F, Fut, E, A>(f: F) -> FromFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<E, A>> + Send + 'static,
    E: IntoResponse + Send + 'static,
    A: Send + 'static,
{
    FromFn { f, name: std::any::type_name::<F>() }
}

/// Middleware built by [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
    name: &'static str,
}

impl<F> FromFn<F> {
    /// Overrides the name reported in logs.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F, Fut, E, A> Middleware for FromFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<E, A>> + Send + 'static,
    E: IntoResponse + Send + 'static,
    A: Send + 'static,
{
    type Output = A;
    type Error = E;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<E, A>> {
        Box::pin((self.f)(req.clone()))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

// ── Combinators ───────────────────────────────────────────────────────────────

/// Combinators available on every [`Middleware`].
pub trait MiddlewareExt: Middleware + Sized {
    /// Transforms the extracted value.
    fn map<F, B>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        Map { inner: self, f }
    }

    /// Transforms the error before it is rendered.
    fn map_err<F, E>(self, f: F) -> MapErr<Self, F>
    where
        F: Fn(Self::Error) -> E + Send + Sync + 'static,
        E: IntoResponse + Send + 'static,
    {
        MapErr { inner: self, f }
    }

    /// Erases the concrete type.
    fn boxed(self) -> BoxMiddleware<Self::Error, Self::Output> {
        Arc::new(self)
    }
}

impl<M: Middleware> MiddlewareExt for M {}

/// Middleware returned by [`MiddlewareExt::map`].
#[derive(Clone)]
pub struct Map<M, F> {
    inner: M,
    f: F,
}

impl<M, F, B> Middleware for Map<M, F>
where
    M: Middleware,
    F: Fn(M::Output) -> B + Send + Sync + 'static,
    B: Send + 'static,
{
    type Output = B;
    type Error = M::Error;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<M::Error, B>> {
        Box::pin(async move { self.inner.call(req).await.map(&self.f) })
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Middleware returned by [`MiddlewareExt::map_err`].
#[derive(Clone)]
pub struct MapErr<M, F> {
    inner: M,
    f: F,
}

impl<M, F, E> Middleware for MapErr<M, F>
where
    M: Middleware,
    F: Fn(M::Error) -> E + Send + Sync + 'static,
    E: IntoResponse + Send + 'static,
{
    type Output = M::Output;
    type Error = E;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<E, M::Output>> {
        Box::pin(async move { self.inner.call(req).await.map_err(&self.f) })
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::outcome::{failure, success};
    use crate::reject::{Rejection, RejectionKind};

    fn request() -> Request {
        http::Request::builder()
            .uri("/items/7")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn from_fn_sees_the_request() {
        let mw = from_fn(|req: Request| async move { success::<Infallible, _>(req.path().to_owned()) });
        assert_eq!(mw.call(&request()).await, Outcome::Success("/items/7".to_owned()));
    }

    #[tokio::test]
    async fn map_transforms_success_only() {
        let mw = from_fn(|_req: Request| async { success::<Infallible, _>(21_u32) }).map(|n| n * 2);
        assert_eq!(mw.call(&request()).await, Outcome::Success(42));
    }

    #[tokio::test]
    async fn map_err_changes_the_rendered_error() {
        let mw = from_fn(|_req: Request| async { failure::<_, ()>(StatusCode::IM_A_TEAPOT) })
            .map_err(|_| Rejection::forbidden("no tea"));

        let err = mw.call(&request()).await.failure().unwrap();
        assert_eq!(err.kind(), RejectionKind::Forbidden);
    }

    #[tokio::test]
    async fn boxed_middlewares_share_a_vec() {
        let ok = from_fn(|_req: Request| async { success::<Rejection, _>(1_u8) }).boxed();
        let bad = from_fn(|_req: Request| async { failure::<_, u8>(Rejection::conflict("taken")) }).boxed();
        let steps: Vec<BoxMiddleware<Rejection, u8>> = vec![ok, bad];

        let req = request();
        assert!(steps[0].call(&req).await.is_success());
        assert!(steps[1].call(&req).await.is_failure());
    }

    #[test]
    fn names_default_to_the_type_and_can_be_overridden() {
        let mw = from_fn(|_req: Request| async { success::<Infallible, _>(()) });
        assert!(mw.name().contains("closure"));
        assert_eq!(mw.named("tenant").name(), "tenant");
    }
}
