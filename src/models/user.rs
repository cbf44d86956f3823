// file: src/models/user.rs
// description: per-user ingestion bookkeeping record and status machine
// reference: internal data structures

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Lifecycle of an ingestion run: pending -> in_progress -> completed | failed.
/// No automatic retry; a new run restarts the machine from in_progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored column value; unknown text maps to Pending so a damaged
    /// row never poisons a status query.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `users` table, keyed by username. Observability only —
/// callers poll this record instead of blocking on a background run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatus {
    pub username: String,
    pub last_ingested_at: String,
    pub status: IngestionStatus,
    pub repo_count: i64,
    pub error: Option<String>,
}

impl UserStatus {
    pub fn new(username: &str, status: IngestionStatus) -> Self {
        Self {
            username: username.to_string(),
            last_ingested_at: Utc::now().to_rfc3339(),
            status,
            repo_count: 0,
            error: None,
        }
    }

    pub fn completed(username: &str, repo_count: i64) -> Self {
        Self {
            repo_count,
            ..Self::new(username, IngestionStatus::Completed)
        }
    }

    pub fn failed(username: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(username, IngestionStatus::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            IngestionStatus::Pending,
            IngestionStatus::InProgress,
            IngestionStatus::Completed,
            IngestionStatus::Failed,
        ] {
            assert_eq!(IngestionStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_maps_to_pending() {
        assert_eq!(IngestionStatus::parse("exploded"), IngestionStatus::Pending);
    }

    #[test]
    fn test_failed_constructor_carries_error() {
        let status = UserStatus::failed("alice", "boom".to_string());
        assert_eq!(status.status, IngestionStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert_eq!(status.repo_count, 0);
    }
}
