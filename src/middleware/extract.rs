//! Ready-made extraction middlewares.
//!
//! Each one pulls a single value out of the request and rejects with a
//! [`Rejection`] when it cannot.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::ready;
use std::marker::PhantomData;
use std::str::FromStr;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use super::{BoxFuture, Middleware};
use crate::outcome::Outcome;
use crate::reject::Rejection;
use crate::request::Request;

/// A path parameter that must be present.
#[derive(Clone, Debug)]
pub struct RequiredParam {
    name: String,
}

impl RequiredParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Middleware for RequiredParam {
    type Output = String;
    type Error = Rejection;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Rejection, String>> {
        let outcome = match req.param(&self.name) {
            Some(value) => Outcome::Success(value.to_owned()),
            None => Outcome::Failure(Rejection::validation(
                "Invalid request",
                format!("missing path parameter '{}'", self.name),
            )),
        };
        Box::pin(ready(outcome))
    }

    fn name(&self) -> &'static str { "required_param" }
}

/// A path parameter that may be absent.
#[derive(Clone, Debug)]
pub struct OptionalParam {
    name: String,
}

impl OptionalParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Middleware for OptionalParam {
    type Output = Option<String>;
    type Error = Infallible;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Infallible, Option<String>>> {
        Box::pin(ready(Outcome::Success(req.param(&self.name).map(str::to_owned))))
    }

    fn name(&self) -> &'static str { "optional_param" }
}

/// A path parameter parsed with [`FromStr`].
pub struct ParsedParam<T> {
    name: String,
    _target: PhantomData<fn() -> T>,
}

impl<T> ParsedParam<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), _target: PhantomData }
    }
}

impl<T> Clone for ParsedParam<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> Middleware for ParsedParam<T>
where
    T: FromStr + Send + 'static,
    T::Err: Display,
{
    type Output = T;
    type Error = Rejection;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Rejection, T>> {
        let outcome: Outcome<Rejection, T> = match req.param(&self.name) {
            None => Outcome::Failure(Rejection::validation(
                "Invalid request",
                format!("missing path parameter '{}'", self.name),
            )),
            Some(raw) => raw.parse::<T>()
                .map_err(|e| Rejection::validation(
                    "Invalid request",
                    format!("path parameter '{}' is malformed: {e}", self.name),
                ))
                .into(),
        };
        Box::pin(ready(outcome))
    }

    fn name(&self) -> &'static str { "parsed_param" }
}

/// A query-string value, percent-decoded and optional.
#[derive(Clone, Debug)]
pub struct QueryParam {
    name: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Middleware for QueryParam {
    type Output = Option<String>;
    type Error = Infallible;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Infallible, Option<String>>> {
        Box::pin(ready(Outcome::Success(req.query_param(&self.name))))
    }

    fn name(&self) -> &'static str { "query_param" }
}

/// A header that must be present and valid UTF-8.
#[derive(Clone, Debug)]
pub struct RequiredHeader {
    name: String,
}

impl RequiredHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Middleware for RequiredHeader {
    type Output = String;
    type Error = Rejection;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Rejection, String>> {
        let outcome = match req.header(&self.name) {
            Some(value) => Outcome::Success(value.to_owned()),
            None => Outcome::Failure(Rejection::validation(
                "Invalid request",
                format!("missing or unreadable header '{}'", self.name),
            )),
        };
        Box::pin(ready(outcome))
    }

    fn name(&self) -> &'static str { "required_header" }
}

/// The token of an `Authorization: Bearer <token>` header.
///
/// Only checks the shape; validating the token is up to a middleware that
/// knows the issuer.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerToken;

impl Middleware for BearerToken {
    type Output = String;
    type Error = Rejection;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Rejection, String>> {
        let token = req.header(AUTHORIZATION.as_str())
            .and_then(|v| v.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty());

        let outcome = match token {
            Some(token) => Outcome::Success(token.to_owned()),
            None => Outcome::Failure(Rejection::unauthorized("a bearer token is required")),
        };
        Box::pin(ready(outcome))
    }

    fn name(&self) -> &'static str { "bearer_token" }
}

/// A JSON request body deserialised into `T`.
///
/// Requires an `application/json` (or `+json`) content type.
pub struct JsonBody<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonBody<T> {
    pub fn new() -> Self {
        Self { _target: PhantomData }
    }
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Clone for JsonBody<T> {
    fn clone(&self) -> Self { Self::new() }
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}

impl<T> Middleware for JsonBody<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;
    type Error = Rejection;

    fn call<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Outcome<Rejection, T>> {
        let outcome: Outcome<Rejection, T> = if !req.header(CONTENT_TYPE.as_str()).is_some_and(is_json) {
            Outcome::Failure(Rejection::validation(
                "Invalid body",
                "expected an application/json content type",
            ))
        } else {
            serde_json::from_slice::<T>(req.body())
                .map_err(|e| Rejection::validation("Invalid body", e.to_string()))
                .into()
        };
        Box::pin(ready(outcome))
    }

    fn name(&self) -> &'static str { "json_body" }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;
    use crate::reject::RejectionKind;

    fn request(headers: &[(&str, &str)], body: &'static [u8]) -> Request {
        let mut builder = http::Request::builder().uri("/orders/17?verbose=yes");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        Request::from(builder.body(Bytes::from_static(body)).unwrap())
            .with_param("order", "17")
            .with_param("slug", "not-a-number")
    }

    fn rejection<A: std::fmt::Debug>(outcome: Outcome<Rejection, A>) -> RejectionKind {
        outcome.failure().expect("expected a rejection").kind()
    }

    #[tokio::test]
    async fn required_param() {
        let req = request(&[], b"");
        assert_eq!(RequiredParam::new("order").call(&req).await, Outcome::Success("17".to_owned()));
        assert_eq!(rejection(RequiredParam::new("user").call(&req).await), RejectionKind::Validation);
    }

    #[tokio::test]
    async fn optional_and_query_params_never_fail() {
        let req = request(&[], b"");
        assert_eq!(OptionalParam::new("user").call(&req).await, Outcome::Success(None));
        assert_eq!(QueryParam::new("verbose").call(&req).await, Outcome::Success(Some("yes".to_owned())));
        assert_eq!(QueryParam::new("page").call(&req).await, Outcome::Success(None));
    }

    #[tokio::test]
    async fn query_param_decodes_the_value() {
        let req = Request::from(
            http::Request::builder()
                .uri("/search?q=rust%20lang&tag=a+b")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(QueryParam::new("q").call(&req).await, Outcome::Success(Some("rust lang".to_owned())));
        assert_eq!(QueryParam::new("tag").call(&req).await, Outcome::Success(Some("a b".to_owned())));
    }

    #[tokio::test]
    async fn parsed_param() {
        let req = request(&[], b"");
        assert_eq!(ParsedParam::<u64>::new("order").call(&req).await, Outcome::Success(17));
        assert_eq!(rejection(ParsedParam::<u64>::new("slug").call(&req).await), RejectionKind::Validation);
        assert_eq!(rejection(ParsedParam::<u64>::new("none").call(&req).await), RejectionKind::Validation);
    }

    #[tokio::test]
    async fn required_header() {
        let req = request(&[("X-Request-Id", "r-1")], b"");
        assert_eq!(RequiredHeader::new("x-request-id").call(&req).await, Outcome::Success("r-1".to_owned()));
        assert_eq!(rejection(RequiredHeader::new("x-other").call(&req).await), RejectionKind::Validation);
    }

    #[tokio::test]
    async fn bearer_token() {
        let ok = request(&[("authorization", "Bearer abc.def")], b"");
        assert_eq!(BearerToken.call(&ok).await, Outcome::Success("abc.def".to_owned()));

        for header in ["Basic abc", "Bearer ", "token"] {
            let req = request(&[("authorization", header)], b"");
            assert_eq!(rejection(BearerToken.call(&req).await), RejectionKind::Unauthorized, "{header}");
        }
        assert_eq!(rejection(BearerToken.call(&request(&[], b"")).await), RejectionKind::Unauthorized);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewOrder {
        sku: String,
        qty: u32,
    }

    #[tokio::test]
    async fn json_body() {
        let req = request(&[("content-type", "application/json; charset=utf-8")], br#"{"sku":"a1","qty":2}"#);
        assert_eq!(
            JsonBody::<NewOrder>::new().call(&req).await,
            Outcome::Success(NewOrder { sku: "a1".to_owned(), qty: 2 }),
        );

        let malformed = request(&[("content-type", "application/json")], br#"{"sku":1}"#);
        assert_eq!(rejection(JsonBody::<NewOrder>::new().call(&malformed).await), RejectionKind::Validation);

        let wrong_type = request(&[("content-type", "text/plain")], br#"{"sku":"a1","qty":2}"#);
        assert_eq!(rejection(JsonBody::<NewOrder>::new().call(&wrong_type).await), RejectionKind::Validation);
    }

    #[test]
    fn json_content_types() {
        assert!(is_json("application/json"));
        assert!(is_json("application/problem+json"));
        assert!(is_json("Application/JSON; charset=utf-8"));
        assert!(!is_json("text/json-ish"));
    }
}
