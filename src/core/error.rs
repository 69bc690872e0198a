use axum::http::StatusCode;
use thiserror::Error;

/// Caller-visible outcome of a failed lookup.
///
/// `Clone` because one failure is shared by every caller coalesced onto the
/// same in-flight lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Malformed caller input (bad date text, blank identifiers).
    #[error("bad input: {0}")]
    BadInput(String),
    /// The page never became ready, was blocked, or yielded nothing.
    #[error("flight data not found: {0}")]
    NotFound(String),
    /// Browser launch, navigation or deadline failure.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl LookupError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LookupError::BadInput(_) => StatusCode::BAD_REQUEST,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            LookupError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_not_client_errors() {
        assert_eq!(
            LookupError::BadInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LookupError::UpstreamUnavailable("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            LookupError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
