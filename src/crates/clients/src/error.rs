//! Error types for external client adapters.

use thiserror::Error;

/// Convenience result type using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error type covering all external client failures.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered but reported an error.
    #[error("Service reported failure: {0}")]
    Api(String),

    /// The remote service answered with a payload the client cannot use.
    #[error("Invalid response payload: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api("upstream down".to_string());
        assert_eq!(format!("{}", err), "Service reported failure: upstream down");
    }
}
