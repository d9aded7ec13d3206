//! Minimal sieve example — guarded JSON endpoints and health checks.
//!
//! Run with:
//!   RUST_LOG=sieve=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42 -H 'authorization: Bearer demo'
//!   curl http://localhost:3000/users/42                          # 401
//!   curl http://localhost:3000/users/abc -H 'authorization: Bearer demo'   # 400
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: Bearer demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/healthz

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use sieve::middleware::extract::{BearerToken, JsonBody, ParsedParam};
use sieve::middleware::from_fn;
use sieve::outcome::{failure, success};
use sieve::{Rejection, Request, Response, Router, Server, ServerConfig, compose, health};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), sieve::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Only the "demo" token is known. A real service would look it up.
    let caller = from_fn(|req: Request| async move {
        match req.header("authorization") {
            Some("Bearer demo") => success("demo-user".to_owned()),
            _ => failure(Rejection::unauthorized("unknown token")),
        }
    })
    .named("caller");

    let app = Router::new()
        .get("/users/{id}", compose((caller, ParsedParam::<u64>::new("id"))).wrap(get_user))
        .post("/users", compose((BearerToken, JsonBody::<NewUser>::new())).wrap(create_user))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::with_config(ServerConfig::from_env()?).serve(app).await
}

// GET /users/{id}
async fn get_user(caller: String, id: u64) -> Response {
    Response::json(json!({ "id": id, "name": "alice", "requested_by": caller }).to_string())
}

// POST /users
async fn create_user(_token: String, user: NewUser) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(json!({ "id": 99, "name": user.name }).to_string())
}
