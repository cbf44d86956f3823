// file: src/github/mod.rs
// description: source-control API client module exports
// reference: internal module structure

pub mod client;
pub mod types;

pub use client::GithubClient;

use crate::error::Result;
use async_trait::async_trait;
use types::{CommitDetail, CommitSummary, RepoMeta};

/// The narrow collaborator interface the orchestrator depends on. Implemented
/// by [`GithubClient`] against the real API and by scripted fakes in tests.
#[async_trait]
pub trait RepoSource: Send + Sync {
    async fn list_repositories(&self, user: &str) -> Result<Vec<RepoMeta>>;

    async fn fetch_readme(&self, user: &str, repo: &str, branch: &str) -> Result<String>;

    async fn fetch_tree(&self, user: &str, repo: &str, branch: &str) -> Result<Vec<String>>;

    async fn list_commits(
        &self,
        user: &str,
        repo: &str,
        max_commits: usize,
    ) -> Result<Vec<CommitSummary>>;

    async fn fetch_commit_detail(&self, user: &str, repo: &str, sha: &str) -> Result<CommitDetail>;
}
