// file: src/ingest/orchestrator.rs
// description: drives source fetch, signal detection, and persistence per user
// reference: orchestrates asynchronous ingestion workflow

use crate::config::IngestionConfig;
use crate::error::{InsightError, Result};
use crate::github::RepoSource;
use crate::ingest::progress::{IngestStats, ProgressTracker};
use crate::models::{CommitRecord, IngestionStatus, RepoRecord, RepoSignals, UserStatus};
use crate::signals::detect_signals;
use crate::store::Store;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct IngestionOrchestrator {
    source: Arc<dyn RepoSource>,
    store: Arc<dyn Store>,
    config: IngestionConfig,
}

impl IngestionOrchestrator {
    pub fn new(source: Arc<dyn RepoSource>, store: Arc<dyn Store>, config: IngestionConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Run one ingestion pass for `username`. A failure to enumerate the
    /// repository list is fatal for the run; every per-repository failure is
    /// logged and skipped so the remaining repositories still land.
    pub async fn run(&self, username: &str, progress: &ProgressTracker) -> Result<IngestStats> {
        info!("Starting ingestion for user={username}");
        self.mark_status(UserStatus::new(username, IngestionStatus::InProgress))
            .await;

        let repos = match self.source.list_repositories(username).await {
            Ok(repos) => repos,
            Err(e) => {
                let message = e.to_string();
                error!("Repository listing failed for {username}: {message}");
                self.mark_status(UserStatus::failed(username, message.clone()))
                    .await;
                return Err(InsightError::Ingestion {
                    user: username.to_string(),
                    message,
                });
            }
        };

        info!("Found {} repos for user={username}", repos.len());
        progress.set_total(repos.len());
        let repo_count = repos.len() as i64;

        for meta in &repos {
            let repo = meta.name.as_str();
            progress.set_message(format!("Ingesting {username}/{repo}"));

            let default_branch = meta.default_branch.as_deref().unwrap_or("main").to_string();

            // README failure degrades to an empty string; the repo row is
            // still written from list metadata.
            let readme_text = match self.source.fetch_readme(username, repo, &default_branch).await
            {
                Ok(text) => text,
                Err(e) => {
                    warn!("README fetch failed for {username}/{repo}: {e}");
                    String::new()
                }
            };

            let record = RepoRecord::from_meta(username, meta, readme_text);
            if let Err(e) = self.store.upsert_repository(&record).await {
                warn!("Repository upsert failed for {username}/{repo}: {e}");
                progress.inc_repos_failed();
                continue;
            }

            match self.ingest_signals(username, repo, &default_branch).await {
                Ok(_) => progress.add_signals(),
                Err(e) => warn!("Signals scan failed for {username}/{repo}: {e}"),
            }

            match self.ingest_commits(username, repo).await {
                Ok(count) => progress.add_commits(count),
                Err(e) => warn!("Commit ingestion failed for {username}/{repo}: {e}"),
            }

            progress.inc_repos_processed();
        }

        self.mark_status(UserStatus::completed(username, repo_count))
            .await;

        let stats = progress.get_stats();
        self.log_final_stats(username, &stats);
        Ok(stats)
    }

    /// Fire-and-forget variant: callers observe the run through the user
    /// status record only.
    pub fn spawn(self: Arc<Self>, username: String) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let progress = ProgressTracker::hidden();
            if let Err(e) = self.run(&username, &progress).await {
                error!("Background ingestion failed for {username}: {e}");
            }
        })
    }

    async fn ingest_signals(&self, username: &str, repo: &str, branch: &str) -> Result<RepoSignals> {
        let paths = self.source.fetch_tree(username, repo, branch).await?;
        let signals = detect_signals(username, repo, &paths);
        self.store.upsert_signals(&signals).await?;
        Ok(signals)
    }

    async fn ingest_commits(&self, username: &str, repo: &str) -> Result<usize> {
        let summaries = self
            .source
            .list_commits(username, repo, self.config.max_commits_per_repo)
            .await?;

        let mut ingested = 0;
        for summary in summaries {
            let detail = self
                .source
                .fetch_commit_detail(username, repo, &summary.sha)
                .await?;
            let record = CommitRecord::from_detail(username, repo, &detail);
            self.store.upsert_commit(&record).await?;
            ingested += 1;
        }
        Ok(ingested)
    }

    /// Status bookkeeping is observability only; its own failure must not
    /// derail the run.
    async fn mark_status(&self, status: UserStatus) {
        if let Err(e) = self.store.upsert_user_status(&status).await {
            warn!(
                "User status upsert failed for {} ({}): {e}",
                status.username, status.status
            );
        }
    }

    fn log_final_stats(&self, username: &str, stats: &IngestStats) {
        info!("=== Ingestion Summary for {username} ===");
        info!("Duration: {} seconds", stats.duration_secs);
        info!("Repos processed: {}", stats.repos_processed);
        info!("Repos failed: {}", stats.repos_failed);
        info!("Signal rows written: {}", stats.signals_computed);
        info!("Commits ingested: {}", stats.commits_ingested);
        info!("Success rate: {:.2}%", stats.success_rate());
        info!("=======================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::{CommitDetail, CommitSummary, RepoMeta};
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted source: per-repo trees and commits, with optional failures.
    #[derive(Default)]
    struct FakeSource {
        repos: Vec<RepoMeta>,
        trees: Mutex<HashMap<String, Vec<String>>>,
        commits: HashMap<String, Vec<CommitDetail>>,
        fail_listing: bool,
        fail_tree_for: Option<String>,
    }

    impl FakeSource {
        fn meta(name: &str) -> RepoMeta {
            serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
        }

        fn set_tree(&self, repo: &str, paths: &[&str]) {
            self.trees.lock().unwrap().insert(
                repo.to_string(),
                paths.iter().map(|s| s.to_string()).collect(),
            );
        }
    }

    #[async_trait]
    impl RepoSource for FakeSource {
        async fn list_repositories(&self, _user: &str) -> Result<Vec<RepoMeta>> {
            if self.fail_listing {
                return Err(InsightError::Storage("listing unavailable".to_string()));
            }
            Ok(self.repos.clone())
        }

        async fn fetch_readme(&self, _user: &str, _repo: &str, _branch: &str) -> Result<String> {
            Ok("# readme".to_string())
        }

        async fn fetch_tree(&self, _user: &str, repo: &str, _branch: &str) -> Result<Vec<String>> {
            if self.fail_tree_for.as_deref() == Some(repo) {
                return Err(InsightError::Storage("tree unavailable".to_string()));
            }
            Ok(self
                .trees
                .lock()
                .unwrap()
                .get(repo)
                .cloned()
                .unwrap_or_default())
        }

        async fn list_commits(
            &self,
            _user: &str,
            repo: &str,
            max_commits: usize,
        ) -> Result<Vec<CommitSummary>> {
            let details = self.commits.get(repo).cloned().unwrap_or_default();
            Ok(details
                .into_iter()
                .take(max_commits)
                .map(|d| CommitSummary { sha: d.sha })
                .collect())
        }

        async fn fetch_commit_detail(
            &self,
            _user: &str,
            repo: &str,
            sha: &str,
        ) -> Result<CommitDetail> {
            self.commits
                .get(repo)
                .and_then(|list| list.iter().find(|d| d.sha == sha))
                .cloned()
                .ok_or_else(|| InsightError::Storage(format!("unknown sha {sha}")))
        }
    }

    fn commit(sha: &str) -> CommitDetail {
        serde_json::from_value(serde_json::json!({
            "sha": sha,
            "commit": {"message": "m", "author": {"name": "A", "date": "2024-01-01T00:00:00Z"}},
            "stats": {"additions": 1, "deletions": 0}
        }))
        .unwrap()
    }

    fn harness(source: FakeSource) -> (TempDir, Arc<SqliteStore>, IngestionOrchestrator) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path()));
        let orchestrator = IngestionOrchestrator::new(
            Arc::new(source),
            store.clone(),
            IngestionConfig {
                max_commits_per_repo: 200,
                page_size: 100,
            },
        );
        (dir, store, orchestrator)
    }

    #[tokio::test]
    async fn test_successful_run_writes_all_record_types() {
        let source = FakeSource {
            repos: vec![FakeSource::meta("widget")],
            commits: HashMap::from([("widget".to_string(), vec![commit("a1"), commit("a2")])]),
            ..Default::default()
        };
        source.set_tree("widget", &["tests/test_a.py", "README.md"]);

        let (_dir, store, orchestrator) = harness(source);
        let stats = orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .unwrap();

        assert_eq!(stats.repos_processed, 1);
        assert_eq!(stats.commits_ingested, 2);

        let repo = store.get_repository("alice", "widget").await.unwrap().unwrap();
        assert_eq!(repo.readme_text, "# readme");

        let signals = store.get_signals("alice", "widget").await.unwrap().unwrap();
        assert!(signals.has_tests);

        assert_eq!(store.count_commits("alice", "widget").await.unwrap(), 2);

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Completed);
        assert_eq!(status.repo_count, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let source = FakeSource {
            fail_listing: true,
            ..Default::default()
        };
        let (_dir, store, orchestrator) = harness(source);

        let result = orchestrator.run("alice", &ProgressTracker::hidden()).await;
        assert!(result.is_err());

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Failed);
        assert!(status.error.unwrap().contains("listing unavailable"));
        assert!(store.list_repositories("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tree_failure_skips_signals_but_keeps_repo() {
        let source = FakeSource {
            repos: vec![FakeSource::meta("widget"), FakeSource::meta("gadget")],
            fail_tree_for: Some("widget".to_string()),
            ..Default::default()
        };
        source.set_tree("gadget", &["src/main.go", "go.mod"]);

        let (_dir, store, orchestrator) = harness(source);
        let stats = orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .unwrap();

        // both repos processed; only one produced signals
        assert_eq!(stats.repos_processed, 2);
        assert_eq!(stats.signals_computed, 1);

        assert!(store.get_repository("alice", "widget").await.unwrap().is_some());
        assert!(store.get_signals("alice", "widget").await.unwrap().is_none());
        let signals = store.get_signals("alice", "gadget").await.unwrap().unwrap();
        assert_eq!(signals.tech_stack, "Go");

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Completed);
    }

    #[tokio::test]
    async fn test_rerun_after_failure_replaces_stale_signals() {
        // first run: a tree rich in signals
        let source = FakeSource {
            repos: vec![FakeSource::meta("widget")],
            ..Default::default()
        };
        source.set_tree("widget", &["tests/test_a.py", ".github/workflows/ci.yml"]);
        let (dir, store, orchestrator) = harness(source);
        orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .unwrap();
        let signals = store.get_signals("alice", "widget").await.unwrap().unwrap();
        assert!(signals.has_tests);

        // a failed run in between
        let failing = FakeSource {
            fail_listing: true,
            ..Default::default()
        };
        let orchestrator = IngestionOrchestrator::new(
            Arc::new(failing),
            store.clone(),
            IngestionConfig {
                max_commits_per_repo: 200,
                page_size: 100,
            },
        );
        assert!(orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .is_err());
        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Failed);

        // retry with a tree that no longer matches the old booleans
        let retry = FakeSource {
            repos: vec![FakeSource::meta("widget")],
            ..Default::default()
        };
        retry.set_tree("widget", &["src/main.go"]);
        let orchestrator = IngestionOrchestrator::new(
            Arc::new(retry),
            store.clone(),
            IngestionConfig {
                max_commits_per_repo: 200,
                page_size: 100,
            },
        );
        orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .unwrap();

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Completed);
        let signals = store.get_signals("alice", "widget").await.unwrap().unwrap();
        assert!(!signals.has_tests);
        assert!(!signals.has_github_actions);
        assert_eq!(signals.tech_stack, "Go");

        drop(dir);
    }

    #[tokio::test]
    async fn test_commit_cap_is_respected() {
        let source = FakeSource {
            repos: vec![FakeSource::meta("widget")],
            commits: HashMap::from([(
                "widget".to_string(),
                (0..10).map(|i| commit(&format!("sha{i}"))).collect(),
            )]),
            ..Default::default()
        };
        source.set_tree("widget", &[]);

        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path()));
        let orchestrator = IngestionOrchestrator::new(
            Arc::new(source),
            store.clone(),
            IngestionConfig {
                max_commits_per_repo: 3,
                page_size: 100,
            },
        );

        orchestrator
            .run("alice", &ProgressTracker::hidden())
            .await
            .unwrap();
        assert_eq!(store.count_commits("alice", "widget").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_background_spawn_observable_via_status() {
        let source = FakeSource {
            repos: vec![FakeSource::meta("widget")],
            ..Default::default()
        };
        source.set_tree("widget", &["README.md"]);

        let (_dir, store, orchestrator) = harness(source);
        let handle = Arc::new(orchestrator).spawn("alice".to_string());
        handle.await.unwrap();

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Completed);
    }
}
