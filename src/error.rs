use thiserror::Error;

/// Failures raised by a catalog collaborator. The matching core never
/// catches these; they abort the mapping call that triggered them.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("rate limit exceeded for '{identifier}'")]
    RateLimited { identifier: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog responded with HTTP {0}")]
    Status(u16),
    #[error("catalog API error: {0}")]
    Upstream(String),
    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether the collaborator may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CatalogError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(CatalogError::Status(429).is_retryable());
        assert!(CatalogError::Status(503).is_retryable());
        assert!(!CatalogError::Status(404).is_retryable());
        assert!(!CatalogError::Upstream("bad query".into()).is_retryable());
        assert!(!CatalogError::RateLimited { identifier: "anilist".into() }.is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = CatalogError::RateLimited { identifier: "anilist".into() };
        assert_eq!(err.to_string(), "rate limit exceeded for 'anilist'");
        assert_eq!(CatalogError::Status(500).to_string(), "catalog responded with HTTP 500");
    }
}
