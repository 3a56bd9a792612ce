use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("offline")]
    Offline,
}

impl FetchError {
    /// Whether this failure means the origin was unreachable, as opposed to a
    /// malformed request the caller built.
    pub fn is_unreachable(&self) -> bool {
        match self {
            FetchError::Offline => true,
            FetchError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_is_unreachable() {
        assert!(FetchError::Offline.is_unreachable());
    }

    #[test]
    fn test_caller_errors_are_not_unreachable() {
        assert!(!FetchError::InvalidUrl("not a url".to_string()).is_unreachable());
        assert!(!FetchError::InvalidHeader {
            name: "x-token".to_string(),
            reason: "contains newline".to_string(),
        }
        .is_unreachable());
    }
}
