use reqwest::StatusCode;
use thiserror::Error;

/// Failure of one adapter call.
///
/// `Auth` disables the adapter for the rest of the process, `RateLimited`
/// skips it for the current run, `Network` is retried by the collector,
/// `Rejected` fails the query without retry and `Malformed` drops a single
/// item or undecodable page. `Cancelled` ends a stream whose token fired
/// before it finished.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    /// The upstream refused the request itself (a 4xx other than 401/403/429).
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("cancelled")]
    Cancelled,
}

impl AdapterError {
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, AdapterError::Network(_))
    }

    /// Generic mapping of a non-success HTTP status.
    ///
    /// 401/403 are credential problems, 429 is a rate limit, 5xx is transient.
    /// Any other 4xx means the request itself was rejected.
    #[must_use]
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let message = format!("{context} returned HTTP {status}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => AdapterError::RateLimited(message),
            s if s.is_client_error() => AdapterError::Rejected(message),
            _ => AdapterError::Network(message),
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::from_status(status, "upstream")
        } else {
            AdapterError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retriable() {
        assert!(AdapterError::Network("reset".into()).is_retriable());
        assert!(!AdapterError::Auth("bad key".into()).is_retriable());
        assert!(!AdapterError::RateLimited("quota".into()).is_retriable());
        assert!(!AdapterError::Malformed("json".into()).is_retriable());
        assert!(!AdapterError::Rejected("bad request".into()).is_retriable());
        assert!(!AdapterError::Cancelled.is_retriable());
    }

    #[test]
    fn status_mapping_follows_http_semantics() {
        assert!(matches!(
            AdapterError::from_status(StatusCode::UNAUTHORIZED, "x"),
            AdapterError::Auth(_)
        ));
        assert!(matches!(
            AdapterError::from_status(StatusCode::FORBIDDEN, "x"),
            AdapterError::Auth(_)
        ));
        assert!(matches!(
            AdapterError::from_status(StatusCode::TOO_MANY_REQUESTS, "x"),
            AdapterError::RateLimited(_)
        ));
        assert!(matches!(
            AdapterError::from_status(StatusCode::BAD_GATEWAY, "x"),
            AdapterError::Network(_)
        ));
        assert!(matches!(
            AdapterError::from_status(StatusCode::BAD_REQUEST, "x"),
            AdapterError::Rejected(_)
        ));
        assert!(matches!(
            AdapterError::from_status(StatusCode::NOT_FOUND, "x"),
            AdapterError::Rejected(_)
        ));
    }
}
