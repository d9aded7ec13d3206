//! # sieve
//!
//! Typed, short-circuiting middleware pipelines for async HTTP handlers.
//!
//! A handler rarely wants the raw request. It wants a validated token, a
//! parsed id, a deserialised body. sieve lets each of those be its own
//! [`Middleware`], composes them in order in front of the handler, and hands
//! the handler only what they extracted:
//!
//! - every middleware reads the same request, one after another;
//! - the first one to fail ends the request with its error response;
//! - otherwise the handler runs with one argument per middleware, in order.
//!
//! Whether the handler's parameters match the chain is checked by the
//! compiler, not at request time.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use serde::Deserialize;
//! use serde_json::json;
//! use sieve::{compose, Response, Router, Server, ServerConfig};
//! use sieve::middleware::extract::{BearerToken, JsonBody, ParsedParam};
//!
//! #[derive(Deserialize)]
//! struct Rename { name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sieve::Error> {
//!     let rename = compose((
//!         BearerToken,
//!         ParsedParam::<u64>::new("id"),
//!         JsonBody::<Rename>::new(),
//!     ))
//!     .wrap(rename_project);
//!
//!     let app = Router::new().put("/projects/{id}", rename);
//!
//!     Server::with_config(ServerConfig::from_env()?).serve(app).await
//! }
//!
//! async fn rename_project(_token: String, id: u64, body: Rename) -> Response {
//!     Response::builder()
//!         .status(StatusCode::OK)
//!         .json(json!({ "id": id, "name": body.name }).to_string())
//! }
//! ```

mod config;
mod error;
mod handler;
mod reject;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;
pub mod outcome;
pub mod pipeline;

pub use config::ServerConfig;
pub use error::Error;
pub use handler::Handler;
pub use middleware::{BoxMiddleware, Middleware, MiddlewareExt, from_fn};
pub use outcome::Outcome;
pub use pipeline::{Compose, Pipeline, compose};
pub use reject::{Rejection, RejectionKind};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
