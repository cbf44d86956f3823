// file: src/models/commit.rs
// description: commit history record keyed by (username, repo, sha)
// reference: internal data structures

use crate::github::types::CommitDetail;
use serde::{Deserialize, Serialize};

/// One row of the `commits` table. The sha is content-addressed; upserting the
/// same key updates the metadata columns in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitRecord {
    pub username: String,
    pub repo: String,
    pub sha: String,
    pub authored_at: String,
    pub message: String,
    pub author_name: String,
    pub author_login: String,
    pub files_changed: i64,
    pub additions: i64,
    pub deletions: i64,
}

impl CommitRecord {
    pub fn from_detail(username: &str, repo: &str, detail: &CommitDetail) -> Self {
        let commit = &detail.commit;
        let (author_name, authored_at) = match &commit.author {
            Some(author) => (
                author.name.clone().unwrap_or_default(),
                author.date.clone().unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        Self {
            username: username.to_string(),
            repo: repo.to_string(),
            sha: detail.sha.clone(),
            authored_at,
            message: commit.message.clone().unwrap_or_default(),
            author_name,
            author_login: detail
                .author
                .as_ref()
                .and_then(|a| a.login.clone())
                .unwrap_or_default(),
            files_changed: detail.files.as_ref().map_or(0, |f| f.len() as i64),
            additions: detail.stats.as_ref().map_or(0, |s| s.additions),
            deletions: detail.stats.as_ref().map_or(0, |s| s.deletions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_detail_handles_missing_fields() {
        let detail: CommitDetail = serde_json::from_str(r#"{"sha": "abc123"}"#).unwrap();
        let record = CommitRecord::from_detail("alice", "widget", &detail);

        assert_eq!(record.sha, "abc123");
        assert_eq!(record.author_name, "");
        assert_eq!(record.files_changed, 0);
        assert_eq!(record.additions, 0);
    }

    #[test]
    fn test_from_detail_counts_files() {
        let raw = r#"{
            "sha": "def456",
            "commit": {
                "message": "fix parser",
                "author": {"name": "Alice", "date": "2024-05-01T10:00:00Z"}
            },
            "author": {"login": "alice"},
            "files": [{"filename": "a.rs"}, {"filename": "b.rs"}],
            "stats": {"additions": 10, "deletions": 3}
        }"#;
        let detail: CommitDetail = serde_json::from_str(raw).unwrap();
        let record = CommitRecord::from_detail("alice", "widget", &detail);

        assert_eq!(record.message, "fix parser");
        assert_eq!(record.author_login, "alice");
        assert_eq!(record.files_changed, 2);
        assert_eq!(record.additions, 10);
        assert_eq!(record.deletions, 3);
    }
}
