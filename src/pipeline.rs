//! Middleware pipelines.
//!
//! [`compose`] takes an ordered chain of middlewares, [`Compose::wrap`] binds
//! it to a handler, and the resulting [`Pipeline`] answers requests:
//!
//! 1. Each middleware runs, in order, against the same request.
//! 2. The first failure stops the pipeline. Its error becomes the response;
//!    later middlewares and the handler are never called.
//! 3. If every middleware succeeds, the handler is called with the extracted
//!    values as positional arguments, in middleware order.
//!
//! ```rust
//! use sieve::{compose, Request, Response};
//! use sieve::middleware::extract::{BearerToken, ParsedParam};
//!
//! async fn get_invoice(token: String, id: u64) -> Response {
//!     Response::text(format!("invoice {id} for {token}"))
//! }
//!
//! let pipeline = compose((BearerToken, ParsedParam::<u64>::new("id"))).wrap(get_invoice);
//! # let _ = pipeline;
//! ```
//!
//! # The chain
//!
//! A chain is either a tuple of up to 16 middlewares of any types, or a `Vec`
//! of one middleware type (often [`BoxMiddleware`](crate::middleware::BoxMiddleware))
//! of any length. A tuple chain hands the handler one argument per
//! middleware; a `Vec` chain hands it a single `Vec` of values.
//!
//! # Compile-time contract
//!
//! The handler must take exactly the values the chain produces, in order.
//! Anything else does not compile:
//!
//! ```rust,compile_fail
//! use std::convert::Infallible;
//! use sieve::{compose, Request, Response};
//! use sieve::middleware::from_fn;
//! use sieve::outcome::success;
//!
//! let name = from_fn(|_req: Request| async { success::<Infallible, _>(String::from("ada")) });
//! let age = from_fn(|_req: Request| async { success::<Infallible, _>(36_u32) });
//!
//! // The second parameter should be a u32.
//! compose((name, age)).wrap(|a: String, b: String| async move { Response::text(a + &b) });
//! ```
//!
//! ```rust,compile_fail
//! use std::convert::Infallible;
//! use sieve::{compose, Request, Response};
//! use sieve::middleware::from_fn;
//! use sieve::outcome::success;
//!
//! let name = from_fn(|_req: Request| async { success::<Infallible, _>(String::from("ada")) });
//!
//! // One middleware, two parameters.
//! compose((name,)).wrap(|a: String, b: u32| async move { Response::text(format!("{a}{b}")) });
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::handler::ErasedHandler;
use crate::middleware::{BoxFuture, Middleware};
use crate::outcome::Outcome;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Middleware chains ─────────────────────────────────────────────────────────

/// An ordered chain of middlewares that can be evaluated as a unit.
///
/// Implemented for tuples of up to 16 [`Middleware`]s and for `Vec<M>`.
pub trait Middlewares: Send + Sync + 'static {
    /// The values handed to the handler when every step succeeds.
    type Values: Send + 'static;

    /// Runs the chain. `Err` holds the response of the first failing step.
    fn extract<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Self::Values, Response>>;

    /// Number of middlewares in the chain.
    fn stage_count(&self) -> usize;
}

/// Renders the error of the middleware that stopped the pipeline.
fn short_circuit<E: IntoResponse>(middleware: &'static str, index: usize, error: E) -> Response {
    let response = error.into_response();
    debug!(
        middleware,
        index,
        status = response.status_code().as_u16(),
        "pipeline short-circuited",
    );
    response
}

impl Middlewares for () {
    type Values = ();

    fn extract<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Result<(), Response>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn stage_count(&self) -> usize { 0 }
}

// Tuple elements are evaluated left to right, so every step below awaits in
// declaration order and the `return` skips everything after a failure.
macro_rules! impl_middlewares_for_tuple {
    ($count:literal; $($M:ident $idx:tt),+) => {
        impl<$($M: Middleware),+> Middlewares for ($($M,)+) {
            type Values = ($($M::Output,)+);

            fn extract<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Self::Values, Response>> {
                Box::pin(async move {
                    Ok(($(
                        match self.$idx.call(req).await {
                            Outcome::Success(value) => value,
                            Outcome::Failure(error) => {
                                return Err(short_circuit(self.$idx.name(), $idx, error));
                            }
                        },
                    )+))
                })
            }

            fn stage_count(&self) -> usize { $count }
        }
    };
}

impl_middlewares_for_tuple!(1; M1 0);
impl_middlewares_for_tuple!(2; M1 0, M2 1);
impl_middlewares_for_tuple!(3; M1 0, M2 1, M3 2);
impl_middlewares_for_tuple!(4; M1 0, M2 1, M3 2, M4 3);
impl_middlewares_for_tuple!(5; M1 0, M2 1, M3 2, M4 3, M5 4);
impl_middlewares_for_tuple!(6; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5);
impl_middlewares_for_tuple!(7; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6);
impl_middlewares_for_tuple!(8; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7);
impl_middlewares_for_tuple!(9; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8);
impl_middlewares_for_tuple!(10; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9);
impl_middlewares_for_tuple!(11; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10);
impl_middlewares_for_tuple!(12; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10, M12 11);
impl_middlewares_for_tuple!(13; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10, M12 11, M13 12);
impl_middlewares_for_tuple!(14; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10, M12 11, M13 12, M14 13);
impl_middlewares_for_tuple!(15; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10, M12 11, M13 12, M14 13, M15 14);
impl_middlewares_for_tuple!(16; M1 0, M2 1, M3 2, M4 3, M5 4, M6 5, M7 6, M8 7, M9 8, M10 9, M11 10, M12 11, M13 12, M14 13, M15 14, M16 15);

impl<M: Middleware> Middlewares for Vec<M> {
    type Values = Vec<M::Output>;

    fn extract<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Vec<M::Output>, Response>> {
        Box::pin(async move {
            let mut values = Vec::with_capacity(self.len());
            for (index, middleware) in self.iter().enumerate() {
                match middleware.call(req).await {
                    Outcome::Success(value) => values.push(value),
                    Outcome::Failure(error) => {
                        return Err(short_circuit(middleware.name(), index, error));
                    }
                }
            }
            Ok(values)
        })
    }

    fn stage_count(&self) -> usize { self.len() }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// A handler that accepts the values produced by a middleware chain.
///
/// Implemented for every `Fn(A1, …, An) -> impl Future<Output = impl IntoResponse>`
/// with `Args = (A1, …, An)` (n ≤ 16), and for `Fn(Vec<A>)` with
/// `Args = Vec<A>`.
pub trait PipelineHandler<Args>: Send + Sync + 'static {
    fn call(&self, args: Args) -> BoxFuture<'static, Response>;
}

macro_rules! impl_pipeline_handler {
    ($($A:ident),*) => {
        impl<F, Fut, R, $($A,)*> PipelineHandler<($($A,)*)> for F
        where
            F: Fn($($A),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoResponse,
        {
            #[allow(non_snake_case)]
            fn call(&self, ($($A,)*): ($($A,)*)) -> BoxFuture<'static, Response> {
                let fut = self($($A),*);
                Box::pin(async move { fut.await.into_response() })
            }
        }
    };
}

impl_pipeline_handler!();
impl_pipeline_handler!(A1);
impl_pipeline_handler!(A1, A2);
impl_pipeline_handler!(A1, A2, A3);
impl_pipeline_handler!(A1, A2, A3, A4);
impl_pipeline_handler!(A1, A2, A3, A4, A5);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14, A15);
impl_pipeline_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14, A15, A16);

impl<F, Fut, R, A> PipelineHandler<Vec<A>> for F
where
    F: Fn(Vec<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, values: Vec<A>) -> BoxFuture<'static, Response> {
        let fut = self(values);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── compose / Pipeline ────────────────────────────────────────────────────────

/// Starts a pipeline from an ordered middleware chain.
///
/// Pass `()` for no middlewares, `(m,)` for one, `(m1, m2, …)` for several,
/// or a `Vec` for a homogeneous chain of any length.
pub fn compose<M: Middlewares>(middlewares: M) -> Compose<M> {
    Compose { middlewares }
}

/// A middleware chain waiting for its handler. See [`compose`].
#[derive(Clone, Debug)]
pub struct Compose<M> {
    middlewares: M,
}

impl<M: Middlewares> Compose<M> {
    /// Binds the chain to `handler`, producing a request handler.
    pub fn wrap<H>(self, handler: H) -> Pipeline<M, H>
    where
        H: PipelineHandler<M::Values>,
    {
        Pipeline {
            inner: Arc::new(Inner { middlewares: self.middlewares, handler }),
        }
    }
}

/// A middleware chain bound to a handler.
///
/// Immutable and cheap to clone; every clone shares the same chain. Mount it
/// on a [`Router`](crate::Router) like any other handler, or drive it
/// directly with [`Pipeline::call`].
pub struct Pipeline<M, H> {
    inner: Arc<Inner<M, H>>,
}

struct Inner<M, H> {
    middlewares: M,
    handler: H,
}

impl<M, H> Clone for Pipeline<M, H> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<M, H> Pipeline<M, H>
where
    M: Middlewares,
    H: PipelineHandler<M::Values>,
{
    /// Answers one request.
    ///
    /// Always resolves to a response: the handler's, or the rendered error
    /// of the first failing middleware.
    pub async fn call(&self, req: Request) -> Response {
        match self.inner.middlewares.extract(&req).await {
            Ok(values) => {
                trace!(stages = self.stage_count(), "pipeline passed, invoking handler");
                self.inner.handler.call(values).await
            }
            Err(response) => response,
        }
    }

    /// Number of middlewares in front of the handler.
    pub fn stage_count(&self) -> usize {
        self.inner.middlewares.stage_count()
    }
}

impl<M, H> ErasedHandler for Pipeline<M, H>
where
    M: Middlewares,
    H: PipelineHandler<M::Values>,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let pipeline = self.clone();
        Box::pin(async move { pipeline.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::middleware::{from_fn, MiddlewareExt};
    use crate::outcome::{failure, success};
    use crate::reject::{Rejection, RejectionKind};

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn empty_chain_calls_the_handler_directly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let pipeline = compose(()).wrap(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            async { "ok" }
        });

        let res = pipeline.call(request()).await;
        assert_eq!(res.body().as_ref(), b"ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[tokio::test]
    async fn middlewares_run_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let step = |label: &'static str| {
            let log = Arc::clone(&log);
            from_fn(move |_req: Request| {
                log.lock().unwrap().push(label);
                async move { success::<Infallible, _>(label) }
            })
        };

        let pipeline = compose((step("a"), step("b"), step("c")))
            .wrap(|a: &'static str, b: &'static str, c: &'static str| async move {
                format!("{a}{b}{c}")
            });

        let res = pipeline.call(request()).await;
        assert_eq!(res.body().as_ref(), b"abc");
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failure_in_the_middle_skips_the_rest() {
        let tail_calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&tail_calls);

        let head = from_fn(|_req: Request| async { success::<Infallible, _>(1_u8) });
        let reject = from_fn(|_req: Request| async { failure::<_, u8>(Rejection::forbidden("nope")) });
        let tail = from_fn(move |_req: Request| {
            seen.fetch_add(1, Ordering::SeqCst);
            async { success::<Infallible, _>(3_u8) }
        });

        let pipeline = compose((head, reject, tail)).wrap(|_: u8, _: u8, _: u8| async { "unreachable" });
        let res = pipeline.call(request()).await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(res.rejection_kind(), Some(RejectionKind::Forbidden));
        assert_eq!(tail_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn vec_chain_reports_the_failing_index_in_order() {
        let chain: Vec<_> = (0..4_u8)
            .map(|i| {
                from_fn(move |_req: Request| async move {
                    if i == 2 {
                        failure(Rejection::conflict(format!("step {i}")))
                    } else {
                        success(i)
                    }
                })
                .boxed()
            })
            .collect();

        let pipeline = compose(chain).wrap(|values: Vec<u8>| async move { format!("{values:?}") });
        let res = pipeline.call(request()).await;

        assert_eq!(res.status_code(), StatusCode::CONFLICT);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["detail"], "step 2");
    }

    #[tokio::test]
    async fn handler_output_goes_through_into_response() {
        let pipeline = compose(()).wrap(|| async { StatusCode::ACCEPTED });
        assert_eq!(pipeline.call(request()).await.status_code(), StatusCode::ACCEPTED);

        let pipeline = compose(()).wrap(|| async { Err::<&'static str, _>(Rejection::internal("down")) });
        assert_eq!(
            pipeline.call(request()).await.rejection_kind(),
            Some(RejectionKind::Internal),
        );
    }

    #[tokio::test]
    async fn clones_share_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let counter = from_fn(move |_req: Request| {
            seen.fetch_add(1, Ordering::SeqCst);
            async { success::<Infallible, _>(()) }
        });

        let pipeline = compose((counter,)).wrap(|(): ()| async { "ok" });
        let other = pipeline.clone();
        pipeline.call(request()).await;
        other.call(request()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
