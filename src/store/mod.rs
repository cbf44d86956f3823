// file: src/store/mod.rs
// description: storage abstraction over the embedded and networked backends
// reference: internal module structure

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{InsightError, Result};
use crate::models::{CommitRecord, RepoRecord, RepoSignals, UserStatus};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Optional predicates for `query_signals`. `None` fields are not filtered on;
/// `tech_stack` is a substring match against the detected label string.
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub tech_stack: Option<String>,
    pub has_ci_config: Option<bool>,
    pub has_tests: Option<bool>,
    pub has_dockerfile: Option<bool>,
    pub has_precommit: Option<bool>,
    pub detected_ci: Option<String>,
    pub detected_test_framework: Option<String>,
}

/// Cross-repository counters for one username.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepoMetrics {
    pub total_repos: i64,
    pub ci_cd_repos: i64,
    pub github_actions_repos: i64,
    pub test_repos: i64,
    pub lint_repos: i64,
    pub precommit_repos: i64,
    pub docker_repos: i64,
    pub python_repos: i64,
    pub sql_hint_repos: i64,
}

/// README/description text-search hit.
#[derive(Debug, Clone, Serialize)]
pub struct ReadmeHit {
    pub repo: String,
    pub html_url: String,
    pub description: String,
}

/// Commit-count ranking entry.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub repo: String,
    pub commit_count: i64,
}

/// Idempotent persistence keyed by natural keys. Upserts are last-write-wins
/// and each statement commits on its own; reads are pure projections. Callers
/// never branch on which backend is behind the trait.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_repository(&self, record: &RepoRecord) -> Result<()>;

    async fn upsert_signals(&self, record: &RepoSignals) -> Result<()>;

    async fn upsert_commit(&self, record: &CommitRecord) -> Result<()>;

    async fn upsert_user_status(&self, status: &UserStatus) -> Result<()>;

    async fn get_user_status(&self, username: &str) -> Result<Option<UserStatus>>;

    async fn get_repository(&self, username: &str, repo: &str) -> Result<Option<RepoRecord>>;

    /// Most recently pushed first.
    async fn list_repositories(&self, username: &str) -> Result<Vec<RepoRecord>>;

    async fn get_signals(&self, username: &str, repo: &str) -> Result<Option<RepoSignals>>;

    /// Filtered listing ordered by CI, tests, then scores descending.
    async fn query_signals(
        &self,
        username: &str,
        filter: &SignalFilter,
        limit: usize,
    ) -> Result<Vec<RepoSignals>>;

    /// Most recent first.
    async fn list_commits(
        &self,
        username: &str,
        repo: &str,
        limit: usize,
    ) -> Result<Vec<CommitRecord>>;

    async fn count_commits(&self, username: &str, repo: &str) -> Result<i64>;

    async fn search_readmes(
        &self,
        username: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ReadmeHit>>;

    async fn aggregate_metrics(&self, username: &str) -> Result<RepoMetrics>;

    async fn rank_by_activity(&self, username: &str, limit: usize)
        -> Result<Vec<ActivityEntry>>;
}

/// Open the configured backend. This is the only place the toggle is visible.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::new(config.data_dir.clone()))),
        StorageBackend::Postgres => {
            let url = config.postgres_url.as_ref().ok_or_else(|| {
                InsightError::Config("storage.postgres_url is required for postgres".to_string())
            })?;
            Ok(Arc::new(PostgresStore::connect(url).await?))
        }
    }
}
