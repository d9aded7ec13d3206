//! Handler trait and type erasure.
//!
//! # What can be mounted
//!
//! Two shapes of request handler exist:
//!
//! - a plain `async fn(Request) -> impl IntoResponse`, which reads whatever
//!   it needs from the request itself;
//! - a [`Pipeline`], whose handler only ever sees values that its
//!   middlewares already extracted and validated.
//!
//! The router stores both behind one trait object:
//!
//! ```text
//! router.get("/users/{id}", pipeline)
//!        ↓
//! pipeline.into_boxed_handler()          ← Handler impl
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time     ← one vtable dispatch
//!        ↓
//! Box::pin(async { pipeline.call(req).await })
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::middleware::BoxFuture;
use crate::pipeline::{Middlewares, Pipeline, PipelineHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for everything that can be mounted on a [`Router`](crate::Router).
///
/// You never implement this yourself. It is satisfied by:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// compose((m1, m2, …)).wrap(handler)
/// ```
///
/// The trait is sealed: only the impls in this module can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Plain functions ───────────────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete function to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Pipelines ─────────────────────────────────────────────────────────────────

impl<M, H> private::Sealed for Pipeline<M, H>
where
    M: Middlewares,
    H: PipelineHandler<M::Values>,
{
}

impl<M, H> Handler for Pipeline<M, H>
where
    M: Middlewares,
    H: PipelineHandler<M::Values>,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}
