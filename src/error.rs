// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub API returned {status} for {url}")]
    GithubStatus { status: u16, url: String },

    #[error("GitHub API rate limit exhausted: {0}")]
    RateLimited(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ingestion failed for {user}: {message}")]
    Ingestion { user: String, message: String },
}

impl InsightError {
    /// True when the error is worth retrying on a later ingestion run
    /// rather than a permanent misconfiguration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::RateLimited(_) | Self::GithubStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = InsightError::RateLimited("api.github.com".to_string());
        assert!(rate_limited.is_transient());

        let status = InsightError::GithubStatus {
            status: 502,
            url: "https://api.github.com/users/alice/repos".to_string(),
        };
        assert!(status.is_transient());

        let config = InsightError::Config("bad page size".to_string());
        assert!(!config.is_transient());
    }
}
