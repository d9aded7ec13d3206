//! Typed error responses for failing middlewares.
//!
//! A [`Rejection`] is the error half of most middleware outcomes. It renders
//! as an RFC 7807 problem-details document and records its [`RejectionKind`]
//! in the response extensions so callers can branch on it without parsing
//! the body.

use std::fmt;

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::response::{ContentType, IntoResponse, Response};

/// The class of a rejection. Determines the status code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RejectionKind {
    Validation,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    Conflict,            // 409
    PreconditionFailed,  // 412
    TooManyRequests,     // 429
    Internal,            // 500
    ServiceUnavailable,  // 503
}

impl RejectionKind {
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Validation         => StatusCode::BAD_REQUEST,
            Self::Unauthorized       => StatusCode::UNAUTHORIZED,
            Self::Forbidden          => StatusCode::FORBIDDEN,
            Self::NotFound           => StatusCode::NOT_FOUND,
            Self::Conflict           => StatusCode::CONFLICT,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::TooManyRequests    => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal           => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Human-readable label, also used as the `kind` member of the body.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation         => "validation error",
            Self::Unauthorized       => "unauthorized",
            Self::Forbidden          => "forbidden",
            Self::NotFound           => "not found",
            Self::Conflict           => "conflict",
            Self::PreconditionFailed => "precondition failed",
            Self::TooManyRequests    => "too many requests",
            Self::Internal           => "internal error",
            Self::ServiceUnavailable => "service unavailable",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal error response produced by a middleware.
///
/// ```rust
/// use http::StatusCode;
/// use sieve::{IntoResponse, Rejection, RejectionKind};
///
/// let res = Rejection::validation("Invalid id", "id must be numeric").into_response();
/// assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(res.rejection_kind(), Some(RejectionKind::Validation));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    kind: RejectionKind,
    title: String,
    detail: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { kind, title: title.into(), detail: detail.into() }
    }

    pub fn validation(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::Validation, title, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::Unauthorized, "Unauthorized", detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::Forbidden, "Forbidden", detail)
    }

    pub fn not_found(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::NotFound, title, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::Conflict, "Conflict", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(RejectionKind::Internal, "Internal server error", detail)
    }

    pub fn kind(&self) -> RejectionKind { self.kind }
    pub fn title(&self) -> &str { &self.title }
    pub fn detail(&self) -> &str { &self.detail }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.title, self.detail)
    }
}

impl std::error::Error for Rejection {}

#[derive(Serialize)]
struct ProblemDetails<'a> {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'a str,
    status: u16,
    detail: &'a str,
    kind: &'static str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let problem = ProblemDetails {
            problem_type: "about:blank",
            title: &self.title,
            status: status.as_u16(),
            detail: &self.detail,
            kind: self.kind.as_str(),
        };

        let mut res = match serde_json::to_vec(&problem) {
            Ok(body) => Response::builder()
                .status(status)
                .bytes(ContentType::ProblemJson, body),
            Err(e) => {
                error!(kind = %self.kind, "failed to serialise problem details: {e}");
                Response::status(status)
            }
        };
        res.extensions_mut().insert(self.kind);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_problem_details() {
        let res = Rejection::validation("Invalid body", "name is required").into_response();

        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(res.header("content-type"), Some("application/problem+json"));

        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["type"], "about:blank");
        assert_eq!(body["title"], "Invalid body");
        assert_eq!(body["status"], 400);
        assert_eq!(body["detail"], "name is required");
        assert_eq!(body["kind"], "validation error");
    }

    #[test]
    fn kind_is_readable_from_the_response() {
        let res = Rejection::unauthorized("missing token").into_response();
        assert_eq!(res.rejection_kind(), Some(RejectionKind::Unauthorized));
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn plain_responses_have_no_kind() {
        assert_eq!(Response::text("ok").rejection_kind(), None);
    }

    #[test]
    fn every_kind_maps_to_an_error_status() {
        let kinds = [
            RejectionKind::Validation,
            RejectionKind::Unauthorized,
            RejectionKind::Forbidden,
            RejectionKind::NotFound,
            RejectionKind::Conflict,
            RejectionKind::PreconditionFailed,
            RejectionKind::TooManyRequests,
            RejectionKind::Internal,
            RejectionKind::ServiceUnavailable,
        ];
        for kind in kinds {
            let status = kind.status_code();
            assert!(status.is_client_error() || status.is_server_error(), "{kind}");
        }
    }
}
