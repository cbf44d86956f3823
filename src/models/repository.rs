// file: src/models/repository.rs
// description: repository metadata record keyed by (username, repo)
// reference: internal data structures

use crate::github::types::RepoMeta;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One row of the `repos` table. Natural key (username, repo); every other
/// column is overwritten on each ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub username: String,
    pub repo: String,
    pub default_branch: String,
    pub description: String,
    pub language: String,
    pub html_url: String,
    pub readme_text: String,
    pub last_ingested_at: String,
    pub pushed_at: String,
    pub created_at: String,
    pub updated_at: String,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub watchers_count: i64,
    pub open_issues_count: i64,
    pub size: i64,
    pub topics: Vec<String>,
    pub license_name: String,
    pub is_archived: bool,
    pub is_fork: bool,
}

impl RepoRecord {
    /// Build a record from GitHub list metadata plus the fetched README text.
    /// `last_ingested_at` is stamped with the current UTC time.
    pub fn from_meta(username: &str, meta: &RepoMeta, readme_text: String) -> Self {
        Self {
            username: username.to_string(),
            repo: meta.name.clone(),
            default_branch: meta
                .default_branch
                .clone()
                .unwrap_or_else(|| "main".to_string()),
            description: meta.description.clone().unwrap_or_default(),
            language: meta.language.clone().unwrap_or_default(),
            html_url: meta.html_url.clone().unwrap_or_default(),
            readme_text,
            last_ingested_at: Utc::now().to_rfc3339(),
            pushed_at: meta.pushed_at.clone().unwrap_or_default(),
            created_at: meta.created_at.clone().unwrap_or_default(),
            updated_at: meta.updated_at.clone().unwrap_or_default(),
            stargazers_count: meta.stargazers_count,
            forks_count: meta.forks_count,
            watchers_count: meta.watchers_count,
            open_issues_count: meta.open_issues_count,
            size: meta.size,
            topics: meta.topics.clone(),
            license_name: meta
                .license
                .as_ref()
                .and_then(|l| l.name.clone())
                .unwrap_or_default(),
            is_archived: meta.archived,
            is_fork: meta.fork,
        }
    }

    /// Topics serialized the way both backends store them (JSON array text).
    pub fn topics_json(&self) -> String {
        serde_json::to_string(&self.topics).unwrap_or_else(|_| "[]".to_string())
    }
}
