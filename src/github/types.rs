// file: src/github/types.rs
// description: serde models for the GitHub REST v3 payloads we consume
// reference: https://docs.github.com/en/rest

use serde::Deserialize;

/// Repository list entry from `GET /users/{user}/repos`. Only the fields the
/// ingestion pipeline persists; everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMeta {
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub watchers_count: i64,
    #[serde(default)]
    pub open_issues_count: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<LicenseMeta>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseMeta {
    #[serde(default)]
    pub name: Option<String>,
}

/// `GET /repos/{user}/{repo}/readme` — content is base64 with embedded newlines.
#[derive(Debug, Deserialize)]
pub struct ReadmePayload {
    #[serde(default)]
    pub content: String,
}

/// `GET /repos/{user}/{repo}/git/refs/heads/{branch}`.
#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

/// `GET /repos/{user}/{repo}/git/commits/{sha}` — only the tree pointer.
#[derive(Debug, Deserialize)]
pub struct GitCommit {
    pub tree: GitObject,
}

/// `GET /repos/{user}/{repo}/git/trees/{sha}?recursive=1`.
#[derive(Debug, Deserialize)]
pub struct GitTree {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    #[serde(default)]
    pub path: Option<String>,
}

/// Commit list entry from `GET /repos/{user}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
}

/// `GET /repos/{user}/{repo}/commits/{sha}` with per-commit stats.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub commit: CommitInfo,
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub files: Option<Vec<CommitFile>>,
    #[serde(default)]
    pub stats: Option<CommitStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<GitActor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitFile {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_meta_tolerates_nulls() {
        let raw = r#"{
            "name": "widget",
            "description": null,
            "language": null,
            "license": null,
            "topics": ["rust"]
        }"#;
        let meta: RepoMeta = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.name, "widget");
        assert!(meta.description.is_none());
        assert_eq!(meta.topics, vec!["rust"]);
        assert_eq!(meta.stargazers_count, 0);
        assert!(!meta.archived);
    }

    #[test]
    fn test_tree_entries_without_path_are_kept_as_none() {
        let raw = r#"{"tree": [{"path": "src/lib.rs"}, {"mode": "040000"}]}"#;
        let tree: GitTree = serde_json::from_str(raw).unwrap();
        assert_eq!(tree.tree.len(), 2);
        assert_eq!(tree.tree[0].path.as_deref(), Some("src/lib.rs"));
        assert!(tree.tree[1].path.is_none());
    }

    #[test]
    fn test_git_ref_chain() {
        let raw = r#"{"ref": "refs/heads/main", "object": {"sha": "abc", "type": "commit"}}"#;
        let git_ref: GitRef = serde_json::from_str(raw).unwrap();
        assert_eq!(git_ref.object.sha, "abc");
    }
}
