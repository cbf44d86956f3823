// file: src/tools/queries.rs
// description: read-only query operations exposed to the tool layer
// reference: plain functions over the store, JSON-serializable results

use crate::error::Result;
use crate::models::RepoRecord;
use crate::store::{SignalFilter, Store};
use serde_json::{json, Value};

fn repo_row(record: &RepoRecord) -> Value {
    json!({
        "repo": record.repo,
        "name": record.repo,
        "description": record.description,
        "language": record.language,
        "html_url": record.html_url,
        "pushed_at": record.pushed_at,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
        "stargazers_count": record.stargazers_count,
        "forks_count": record.forks_count,
        "watchers_count": record.watchers_count,
        "open_issues_count": record.open_issues_count,
        "size": record.size,
        "topics": record.topics,
        "license_name": record.license_name,
        "is_archived": record.is_archived,
        "is_fork": record.is_fork,
    })
}

fn not_found(message: String) -> Value {
    json!({ "error": message })
}

/// Repositories ingested for a user, most recently pushed first. A user with
/// no ingestion record at all gets an explicit error object so the caller can
/// distinguish "not ingested yet" from "ingested, zero repos".
pub async fn list_repos(store: &dyn Store, username: &str) -> Result<Value> {
    let repos = store.list_repositories(username).await?;
    if repos.is_empty() && store.get_user_status(username).await?.is_none() {
        return Ok(not_found(format!(
            "No data ingested for user: {username}. Run ingestion first."
        )));
    }
    Ok(Value::Array(repos.iter().map(repo_row).collect()))
}

/// Full repository card: metadata, popularity counters, and the grouped
/// engineering signals.
pub async fn get_repo_overview(store: &dyn Store, username: &str, repo: &str) -> Result<Value> {
    let Some(record) = store.get_repository(username, repo).await? else {
        return Ok(not_found(format!(
            "Repo not found in store: {username}/{repo}. Run ingestion first."
        )));
    };

    let signals = store.get_signals(username, repo).await?.unwrap_or_default();
    let commit_count = store.count_commits(username, repo).await?;

    Ok(json!({
        "repo": record.repo,
        "description": record.description,
        "language": record.language,
        "html_url": record.html_url,
        "default_branch": record.default_branch,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
        "pushed_at": record.pushed_at,
        "last_ingested_at": record.last_ingested_at,
        "readme_text": record.readme_text,
        "achievements": {
            "stars": record.stargazers_count,
            "forks": record.forks_count,
            "watchers": record.watchers_count,
            "open_issues": record.open_issues_count,
            "commits": commit_count,
        },
        "metadata": {
            "size": record.size,
            "topics": record.topics,
            "license": if record.license_name.is_empty() { Value::Null } else { json!(record.license_name) },
            "is_archived": record.is_archived,
            "is_fork": record.is_fork,
        },
        "automation": {
            "has_github_actions": signals.has_github_actions,
            "has_ci_config": signals.has_ci_config,
            "has_precommit": signals.has_precommit,
            "has_dockerfile": signals.has_dockerfile,
            "has_docker_compose": signals.has_docker_compose,
            "has_makefile": signals.has_makefile,
            "detected_ci": optional(&signals.detected_ci),
            "automation_score": signals.automation_score,
        },
        "coding_standards": {
            "has_tests": signals.has_tests,
            "has_lint_config": signals.has_lint_config,
            "has_precommit": signals.has_precommit,
            "has_ci_config": signals.has_ci_config,
            "detected_test_framework": optional(&signals.detected_test_framework),
            "coding_standards_score": signals.coding_standards_score,
        },
        "organization": {
            "has_code_of_conduct": signals.has_code_of_conduct,
            "has_contributing": signals.has_contributing,
            "has_license": signals.has_license,
            "has_security_policy": signals.has_security_policy,
            "has_issue_templates": signals.has_issue_templates,
            "has_pr_templates": signals.has_pr_templates,
            "has_changelog": signals.has_changelog,
            "has_docs": signals.has_docs,
            "organization_score": signals.organization_score,
        },
        "signals": {
            "tech_stack": signals.tech_stack,
            "has_ci_config": signals.has_ci_config,
            "has_tests": signals.has_tests,
            "has_dockerfile": signals.has_dockerfile,
            "has_precommit": signals.has_precommit,
            "detected_ci": optional(&signals.detected_ci),
            "detected_test_framework": optional(&signals.detected_test_framework),
        },
    }))
}

fn optional(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        json!(value)
    }
}

/// Commit timeline, most recent first.
pub async fn get_commit_timeline(
    store: &dyn Store,
    username: &str,
    repo: &str,
    limit: usize,
) -> Result<Value> {
    let commits = store.list_commits(username, repo, limit).await?;
    Ok(Value::Array(
        commits
            .iter()
            .map(|c| {
                json!({
                    "sha": c.sha,
                    "authored_at": c.authored_at,
                    "message": c.message,
                    "author_name": c.author_name,
                    "author_login": c.author_login,
                    "files_changed": c.files_changed,
                    "additions": c.additions,
                    "deletions": c.deletions,
                })
            })
            .collect(),
    ))
}

/// Simple LIKE search over README text and descriptions.
pub async fn search_readmes(
    store: &dyn Store,
    username: &str,
    query: &str,
    limit: usize,
) -> Result<Value> {
    let hits = store.search_readmes(username, query, limit).await?;
    Ok(Value::Array(
        hits.iter()
            .map(|h| {
                json!({
                    "repo": h.repo,
                    "name": h.repo,
                    "html_url": h.html_url,
                    "description": h.description,
                })
            })
            .collect(),
    ))
}

/// Query repositories by engineering signals and/or tech stack.
pub async fn query_repos_by_signals(
    store: &dyn Store,
    username: &str,
    filter: &SignalFilter,
    limit: usize,
) -> Result<Value> {
    let rows = store.query_signals(username, filter, limit).await?;
    Ok(Value::Array(
        rows.iter()
            .map(|s| {
                json!({
                    "repo": s.repo,
                    "name": s.repo,
                    "tech_stack": s.tech_stack,
                    "has_ci_config": s.has_ci_config,
                    "has_tests": s.has_tests,
                    "has_dockerfile": s.has_dockerfile,
                    "has_precommit": s.has_precommit,
                    "detected_ci": s.detected_ci,
                    "detected_test_framework": s.detected_test_framework,
                    "automation_score": s.automation_score,
                    "coding_standards_score": s.coding_standards_score,
                    "organization_score": s.organization_score,
                })
            })
            .collect(),
    ))
}

/// High-level engineering metrics across all of a user's repos.
pub async fn aggregate_repo_metrics(store: &dyn Store, username: &str) -> Result<Value> {
    let metrics = store.aggregate_metrics(username).await?;
    Ok(serde_json::to_value(metrics)?)
}

/// Repositories ranked by ingested commit count.
pub async fn rank_repos_by_activity(
    store: &dyn Store,
    username: &str,
    limit: usize,
) -> Result<Value> {
    let ranking = store.rank_by_activity(username, limit).await?;
    Ok(Value::Array(
        ranking
            .iter()
            .map(|entry| {
                json!({
                    "repo": entry.repo,
                    "name": entry.repo,
                    "commit_count": entry.commit_count,
                })
            })
            .collect(),
    ))
}

/// Current state of the asynchronous ingestion job for a user.
pub async fn ingestion_status(store: &dyn Store, username: &str) -> Result<Value> {
    match store.get_user_status(username).await? {
        Some(status) => Ok(json!({
            "username": status.username,
            "status": status.status.as_str(),
            "last_ingested_at": status.last_ingested_at,
            "repo_count": status.repo_count,
            "error": status.error,
        })),
        None => Ok(not_found(format!(
            "No ingestion recorded for user: {username}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitRecord, IngestionStatus, UserStatus};
    use crate::signals::detect_signals;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    async fn seeded_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path());

        let meta = serde_json::from_value(serde_json::json!({
            "name": "widget",
            "description": "a CLI widget",
            "html_url": "https://github.com/alice/widget",
            "pushed_at": "2024-06-01T00:00:00Z"
        }))
        .unwrap();
        let record = RepoRecord::from_meta("alice", &meta, "# widget docs".to_string());
        store.upsert_repository(&record).await.unwrap();

        let paths: Vec<String> = ["tests/test_a.py", ".github/workflows/ci.yml", "README.md"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        store
            .upsert_signals(&detect_signals("alice", "widget", &paths))
            .await
            .unwrap();

        store
            .upsert_commit(&CommitRecord {
                username: "alice".to_string(),
                repo: "widget".to_string(),
                sha: "abc".to_string(),
                authored_at: "2024-06-01T00:00:00Z".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .upsert_user_status(&UserStatus::new("alice", IngestionStatus::Completed))
            .await
            .unwrap();

        (dir, store)
    }

    #[tokio::test]
    async fn test_overview_includes_grouped_signals() {
        let (_dir, store) = seeded_store().await;
        let overview = get_repo_overview(&store, "alice", "widget").await.unwrap();

        assert_eq!(overview["repo"], "widget");
        assert_eq!(overview["achievements"]["commits"], 1);
        assert_eq!(overview["coding_standards"]["has_tests"], true);
        assert_eq!(overview["automation"]["detected_ci"], "github_actions");
        assert_eq!(overview["coding_standards"]["detected_test_framework"], Value::Null);
    }

    #[tokio::test]
    async fn test_overview_missing_repo_is_error_object() {
        let (_dir, store) = seeded_store().await;
        let overview = get_repo_overview(&store, "alice", "nope").await.unwrap();
        assert!(overview["error"].as_str().unwrap().contains("alice/nope"));
    }

    #[tokio::test]
    async fn test_list_repos_distinguishes_never_ingested() {
        let (_dir, store) = seeded_store().await;

        let known = list_repos(&store, "alice").await.unwrap();
        assert_eq!(known.as_array().unwrap().len(), 1);

        let unknown = list_repos(&store, "nobody").await.unwrap();
        assert!(unknown["error"].as_str().unwrap().contains("nobody"));
    }

    #[tokio::test]
    async fn test_signal_query_rows_have_aliases() {
        let (_dir, store) = seeded_store().await;
        let rows = query_repos_by_signals(&store, "alice", &SignalFilter::default(), 10)
            .await
            .unwrap();

        let row = &rows.as_array().unwrap()[0];
        assert_eq!(row["repo"], row["name"]);
        assert_eq!(row["has_ci_config"], true);
    }

    #[tokio::test]
    async fn test_ingestion_status_round_trip() {
        let (_dir, store) = seeded_store().await;

        let known = ingestion_status(&store, "alice").await.unwrap();
        assert_eq!(known["status"], "completed");

        let unknown = ingestion_status(&store, "nobody").await.unwrap();
        assert!(unknown["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_metrics_and_ranking_are_json_objects() {
        let (_dir, store) = seeded_store().await;

        let metrics = aggregate_repo_metrics(&store, "alice").await.unwrap();
        assert_eq!(metrics["total_repos"], 1);
        assert_eq!(metrics["test_repos"], 1);

        let ranking = rank_repos_by_activity(&store, "alice", 5).await.unwrap();
        assert_eq!(ranking[0]["commit_count"], 1);

        let hits = search_readmes(&store, "alice", "widget docs", 5).await.unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 1);

        let timeline = get_commit_timeline(&store, "alice", "widget", 10).await.unwrap();
        assert_eq!(timeline[0]["sha"], "abc");
    }
}
