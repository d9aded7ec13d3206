//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! ```rust
//! use sieve::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! # let _ = app;
//! ```
//!
//! Gate readiness on a dependency by putting the check in a pipeline:
//!
//! ```rust
//! use sieve::{compose, Rejection, Request, Router};
//! use sieve::middleware::from_fn;
//! use sieve::outcome::{failure, success};
//!
//! let database_up = from_fn(|_req: Request| async {
//!     if ping_database().await { success(()) } else { failure(Rejection::new(
//!         sieve::RejectionKind::ServiceUnavailable, "Not ready", "database unreachable",
//!     )) }
//! });
//!
//! let app = Router::new().get("/readyz", compose((database_up,)).wrap(|(): ()| async { "ready" }));
//! # let _ = app;
//! async fn ping_database() -> bool { true }
//! ```

use crate::{Request, Response};

/// Liveness probe handler. Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe handler (default implementation). Always `200 OK` with
/// body `"ready"`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
