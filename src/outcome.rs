//! The two-variant result every middleware step produces.
//!
//! `Failure` stops a pipeline, `Success` feeds the next step. Conversions to
//! and from `Result` let `?`-heavy middleware bodies stay in `Result` until
//! the last line.

/// Result of evaluating one middleware against a request.
///
/// Exactly one variant is populated and the tag never changes after
/// construction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[must_use = "an Outcome may be a Failure that must reach the client"]
pub enum Outcome<E, A> {
    /// Terminal. Carries a value that knows how to render an error response.
    Failure(E),
    /// The extracted value, handed to the next pipeline step.
    Success(A),
}

/// Shorthand for `Outcome::Success(value)`.
pub fn success<E, A>(value: A) -> Outcome<E, A> {
    Outcome::Success(value)
}

/// Shorthand for `Outcome::Failure(error)`.
pub fn failure<E, A>(error: E) -> Outcome<E, A> {
    Outcome::Failure(error)
}

impl<E, A> Outcome<E, A> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Transforms the success value, leaving a failure untouched.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Outcome<E, B> {
        match self {
            Self::Failure(e) => Outcome::Failure(e),
            Self::Success(a) => Outcome::Success(f(a)),
        }
    }

    /// Transforms the failure value, leaving a success untouched.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<F, A> {
        match self {
            Self::Failure(e) => Outcome::Failure(f(e)),
            Self::Success(a) => Outcome::Success(a),
        }
    }

    /// Chains a fallible step onto a success.
    pub fn and_then<B>(self, f: impl FnOnce(A) -> Outcome<E, B>) -> Outcome<E, B> {
        match self {
            Self::Failure(e) => Outcome::Failure(e),
            Self::Success(a) => f(a),
        }
    }

    /// Returns the success value, if any.
    pub fn success(self) -> Option<A> {
        match self {
            Self::Failure(_) => None,
            Self::Success(a) => Some(a),
        }
    }

    /// Returns the failure value, if any.
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Failure(e) => Some(e),
            Self::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<A, E> {
        self.into()
    }
}

impl<E, A> From<Result<A, E>> for Outcome<E, A> {
    fn from(res: Result<A, E>) -> Self {
        match res {
            Ok(a) => Self::Success(a),
            Err(e) => Self::Failure(e),
        }
    }
}

impl<E, A> From<Outcome<E, A>> for Result<A, E> {
    fn from(outcome: Outcome<E, A>) -> Self {
        match outcome {
            Outcome::Failure(e) => Err(e),
            Outcome::Success(a) => Ok(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_exclusive() {
        let ok: Outcome<&str, u8> = success(1);
        let err: Outcome<&str, u8> = failure("nope");

        assert!(ok.is_success() && !ok.is_failure());
        assert!(err.is_failure() && !err.is_success());
    }

    #[test]
    fn map_only_touches_success() {
        assert_eq!(success::<&str, _>(2).map(|n| n * 10), Outcome::Success(20));
        assert_eq!(failure::<_, u8>("bad").map(|n| n * 10), Outcome::Failure("bad"));
    }

    #[test]
    fn map_err_only_touches_failure() {
        assert_eq!(failure::<_, u8>("bad").map_err(str::len), Outcome::Failure(3));
        assert_eq!(success::<&str, _>(7).map_err(str::len), Outcome::Success(7));
    }

    #[test]
    fn and_then_stops_at_first_failure() {
        let chained = success::<&str, _>(1)
            .and_then(|_| failure::<_, u8>("first"))
            .and_then(|_| failure::<_, u8>("second"));
        assert_eq!(chained, Outcome::Failure("first"));
    }

    #[test]
    fn converts_from_and_into_result() {
        let from_ok: Outcome<String, i32> = Ok(5).into();
        assert_eq!(from_ok.into_result(), Ok(5));

        let from_err: Outcome<&str, i32> = Err("boom").into();
        assert_eq!(from_err.failure(), Some("boom"));
    }
}
