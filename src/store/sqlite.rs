// file: src/store/sqlite.rs
// description: embedded per-user SQLite backend for the Store trait
// reference: https://docs.rs/rusqlite

use crate::error::{InsightError, Result};
use crate::models::{CommitRecord, IngestionStatus, RepoRecord, RepoSignals, UserStatus};
use crate::store::{ActivityEntry, ReadmeHit, RepoMetrics, SignalFilter, Store};
use async_trait::async_trait;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::PathBuf;
use tracing::debug;

/// All DDL, idempotent (IF NOT EXISTS); run on every connection open so a
/// fresh per-user database file is usable immediately.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repos (
    username TEXT NOT NULL,
    repo TEXT NOT NULL,
    default_branch TEXT,
    description TEXT,
    language TEXT,
    html_url TEXT,
    readme_text TEXT,
    last_ingested_at TEXT,
    pushed_at TEXT,
    created_at TEXT,
    updated_at TEXT,
    stargazers_count INTEGER DEFAULT 0,
    forks_count INTEGER DEFAULT 0,
    watchers_count INTEGER DEFAULT 0,
    open_issues_count INTEGER DEFAULT 0,
    size INTEGER DEFAULT 0,
    topics TEXT,
    license_name TEXT,
    is_archived INTEGER DEFAULT 0,
    is_fork INTEGER DEFAULT 0,
    PRIMARY KEY (username, repo)
);

CREATE TABLE IF NOT EXISTS commits (
    username TEXT NOT NULL,
    repo TEXT NOT NULL,
    sha TEXT NOT NULL,
    authored_at TEXT,
    message TEXT,
    author_name TEXT,
    author_login TEXT,
    files_changed INTEGER,
    additions INTEGER,
    deletions INTEGER,
    diff_summary TEXT,
    PRIMARY KEY (username, repo, sha)
);

CREATE TABLE IF NOT EXISTS repo_signals (
    username TEXT NOT NULL,
    repo TEXT NOT NULL,
    has_tests INTEGER,
    has_github_actions INTEGER,
    has_ci_config INTEGER,
    has_lint_config INTEGER,
    has_precommit INTEGER,
    has_dockerfile INTEGER,
    has_docker_compose INTEGER DEFAULT 0,
    has_makefile INTEGER,
    has_code_of_conduct INTEGER DEFAULT 0,
    has_contributing INTEGER DEFAULT 0,
    has_license INTEGER DEFAULT 0,
    has_security_policy INTEGER DEFAULT 0,
    has_issue_templates INTEGER DEFAULT 0,
    has_pr_templates INTEGER DEFAULT 0,
    has_changelog INTEGER DEFAULT 0,
    has_docs INTEGER DEFAULT 0,
    detected_test_framework TEXT,
    detected_ci TEXT,
    organization_score REAL DEFAULT 0.0,
    coding_standards_score REAL DEFAULT 0.0,
    automation_score REAL DEFAULT 0.0,
    tech_stack TEXT,
    signals_json TEXT,
    PRIMARY KEY (username, repo)
);

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    last_ingested_at TEXT,
    status TEXT,
    repo_count INTEGER DEFAULT 0,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_commits_repo_time
ON commits(username, repo, authored_at);

CREATE INDEX IF NOT EXISTS idx_repos_pushed_at
ON repos(username, pushed_at DESC);
"#;

const REPO_COLUMNS: &str = "username, repo, default_branch, description, language, html_url, \
    readme_text, last_ingested_at, pushed_at, created_at, updated_at, stargazers_count, \
    forks_count, watchers_count, open_issues_count, size, topics, license_name, \
    is_archived, is_fork";

const SIGNAL_COLUMNS: &str = "username, repo, has_tests, has_github_actions, has_ci_config, \
    has_lint_config, has_precommit, has_dockerfile, has_docker_compose, has_makefile, \
    has_code_of_conduct, has_contributing, has_license, has_security_policy, \
    has_issue_templates, has_pr_templates, has_changelog, has_docs, \
    detected_test_framework, detected_ci, organization_score, coding_standards_score, \
    automation_score, tech_stack, signals_json";

/// Owned parameter for dynamically assembled WHERE clauses.
enum SqlParam {
    Text(String),
    Int(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Int(i) => i.to_sql(),
        }
    }
}

/// One database file per username under the data directory, so MCP instances
/// for different users stay physically separated.
pub struct SqliteStore {
    data_dir: PathBuf,
}

impl SqliteStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn db_path(&self, username: &str) -> PathBuf {
        let safe = username.trim().replace('/', "_");
        self.data_dir.join(format!("{safe}.db"))
    }

    /// rusqlite is blocking; every operation opens the per-user file on the
    /// blocking pool, applies the idempotent schema, and runs the closure.
    async fn with_conn<T, F>(&self, username: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path(username);
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            debug!("Opening SQLite database {}", path.display());
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA_SQL)?;
            f(&conn)
        })
        .await
        .map_err(|e| InsightError::Storage(format!("storage task failed: {e}")))?
    }
}

fn row_to_repo(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoRecord> {
    let topics_raw: Option<String> = row.get(16)?;
    let topics = topics_raw
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    Ok(RepoRecord {
        username: row.get(0)?,
        repo: row.get(1)?,
        default_branch: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        language: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        html_url: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        readme_text: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        last_ingested_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        pushed_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        created_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        stargazers_count: row.get(11)?,
        forks_count: row.get(12)?,
        watchers_count: row.get(13)?,
        open_issues_count: row.get(14)?,
        size: row.get(15)?,
        topics,
        license_name: row.get::<_, Option<String>>(17)?.unwrap_or_default(),
        is_archived: row.get::<_, i64>(18)? != 0,
        is_fork: row.get::<_, i64>(19)? != 0,
    })
}

fn row_to_signals(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoSignals> {
    let flag = |idx: usize| -> rusqlite::Result<bool> {
        Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0) != 0)
    };
    let diagnostics_raw: Option<String> = row.get(24)?;

    Ok(RepoSignals {
        username: row.get(0)?,
        repo: row.get(1)?,
        has_tests: flag(2)?,
        has_github_actions: flag(3)?,
        has_ci_config: flag(4)?,
        has_lint_config: flag(5)?,
        has_precommit: flag(6)?,
        has_dockerfile: flag(7)?,
        has_docker_compose: flag(8)?,
        has_makefile: flag(9)?,
        has_code_of_conduct: flag(10)?,
        has_contributing: flag(11)?,
        has_license: flag(12)?,
        has_security_policy: flag(13)?,
        has_issue_templates: flag(14)?,
        has_pr_templates: flag(15)?,
        has_changelog: flag(16)?,
        has_docs: flag(17)?,
        detected_test_framework: row.get::<_, Option<String>>(18)?.unwrap_or_default(),
        detected_ci: row.get::<_, Option<String>>(19)?.unwrap_or_default(),
        organization_score: row.get::<_, Option<f64>>(20)?.unwrap_or(0.0),
        coding_standards_score: row.get::<_, Option<f64>>(21)?.unwrap_or(0.0),
        automation_score: row.get::<_, Option<f64>>(22)?.unwrap_or(0.0),
        tech_stack: row.get::<_, Option<String>>(23)?.unwrap_or_default(),
        diagnostics: RepoSignals::parse_diagnostics(&diagnostics_raw.unwrap_or_default()),
    })
}

fn row_to_commit(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommitRecord> {
    Ok(CommitRecord {
        username: row.get(0)?,
        repo: row.get(1)?,
        sha: row.get(2)?,
        authored_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        message: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        author_name: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        author_login: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        files_changed: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        additions: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
        deletions: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserStatus> {
    let status_raw: Option<String> = row.get(2)?;
    Ok(UserStatus {
        username: row.get(0)?,
        last_ingested_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        status: IngestionStatus::parse(&status_raw.unwrap_or_default()),
        repo_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        error: row.get(4)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_repository(&self, record: &RepoRecord) -> Result<()> {
        let record = record.clone();
        let user = record.username.clone();
        self.with_conn(&user, move |conn| {
            conn.execute(
                "INSERT INTO repos(username, repo, default_branch, description, language, \
                     html_url, readme_text, last_ingested_at, pushed_at, created_at, updated_at, \
                     stargazers_count, forks_count, watchers_count, open_issues_count, size, \
                     topics, license_name, is_archived, is_fork)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(username, repo) DO UPDATE SET
                   default_branch=excluded.default_branch,
                   description=excluded.description,
                   language=excluded.language,
                   html_url=excluded.html_url,
                   readme_text=excluded.readme_text,
                   last_ingested_at=excluded.last_ingested_at,
                   pushed_at=excluded.pushed_at,
                   created_at=excluded.created_at,
                   updated_at=excluded.updated_at,
                   stargazers_count=excluded.stargazers_count,
                   forks_count=excluded.forks_count,
                   watchers_count=excluded.watchers_count,
                   open_issues_count=excluded.open_issues_count,
                   size=excluded.size,
                   topics=excluded.topics,
                   license_name=excluded.license_name,
                   is_archived=excluded.is_archived,
                   is_fork=excluded.is_fork",
                params![
                    record.username,
                    record.repo,
                    record.default_branch,
                    record.description,
                    record.language,
                    record.html_url,
                    record.readme_text,
                    record.last_ingested_at,
                    record.pushed_at,
                    record.created_at,
                    record.updated_at,
                    record.stargazers_count,
                    record.forks_count,
                    record.watchers_count,
                    record.open_issues_count,
                    record.size,
                    record.topics_json(),
                    record.license_name,
                    record.is_archived as i64,
                    record.is_fork as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert_signals(&self, record: &RepoSignals) -> Result<()> {
        let record = record.clone();
        let user = record.username.clone();
        self.with_conn(&user, move |conn| {
            conn.execute(
                "INSERT INTO repo_signals(username, repo, has_tests, has_github_actions, \
                     has_ci_config, has_lint_config, has_precommit, has_dockerfile, \
                     has_docker_compose, has_makefile, has_code_of_conduct, has_contributing, \
                     has_license, has_security_policy, has_issue_templates, has_pr_templates, \
                     has_changelog, has_docs, detected_test_framework, detected_ci, \
                     organization_score, coding_standards_score, automation_score, tech_stack, \
                     signals_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(username, repo) DO UPDATE SET
                   has_tests=excluded.has_tests,
                   has_github_actions=excluded.has_github_actions,
                   has_ci_config=excluded.has_ci_config,
                   has_lint_config=excluded.has_lint_config,
                   has_precommit=excluded.has_precommit,
                   has_dockerfile=excluded.has_dockerfile,
                   has_docker_compose=excluded.has_docker_compose,
                   has_makefile=excluded.has_makefile,
                   has_code_of_conduct=excluded.has_code_of_conduct,
                   has_contributing=excluded.has_contributing,
                   has_license=excluded.has_license,
                   has_security_policy=excluded.has_security_policy,
                   has_issue_templates=excluded.has_issue_templates,
                   has_pr_templates=excluded.has_pr_templates,
                   has_changelog=excluded.has_changelog,
                   has_docs=excluded.has_docs,
                   detected_test_framework=excluded.detected_test_framework,
                   detected_ci=excluded.detected_ci,
                   organization_score=excluded.organization_score,
                   coding_standards_score=excluded.coding_standards_score,
                   automation_score=excluded.automation_score,
                   tech_stack=excluded.tech_stack,
                   signals_json=excluded.signals_json",
                params![
                    record.username,
                    record.repo,
                    record.has_tests as i64,
                    record.has_github_actions as i64,
                    record.has_ci_config as i64,
                    record.has_lint_config as i64,
                    record.has_precommit as i64,
                    record.has_dockerfile as i64,
                    record.has_docker_compose as i64,
                    record.has_makefile as i64,
                    record.has_code_of_conduct as i64,
                    record.has_contributing as i64,
                    record.has_license as i64,
                    record.has_security_policy as i64,
                    record.has_issue_templates as i64,
                    record.has_pr_templates as i64,
                    record.has_changelog as i64,
                    record.has_docs as i64,
                    record.detected_test_framework,
                    record.detected_ci,
                    record.organization_score,
                    record.coding_standards_score,
                    record.automation_score,
                    record.tech_stack,
                    record.diagnostics_json(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert_commit(&self, record: &CommitRecord) -> Result<()> {
        let record = record.clone();
        let user = record.username.clone();
        self.with_conn(&user, move |conn| {
            conn.execute(
                "INSERT INTO commits(username, repo, sha, authored_at, message, author_name, \
                     author_login, files_changed, additions, deletions, diff_summary)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(username, repo, sha) DO UPDATE SET
                   authored_at=excluded.authored_at,
                   message=excluded.message,
                   author_name=excluded.author_name,
                   author_login=excluded.author_login,
                   files_changed=excluded.files_changed,
                   additions=excluded.additions,
                   deletions=excluded.deletions",
                params![
                    record.username,
                    record.repo,
                    record.sha,
                    record.authored_at,
                    record.message,
                    record.author_name,
                    record.author_login,
                    record.files_changed,
                    record.additions,
                    record.deletions,
                    "",
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert_user_status(&self, status: &UserStatus) -> Result<()> {
        let status = status.clone();
        let user = status.username.clone();
        self.with_conn(&user, move |conn| {
            conn.execute(
                "INSERT INTO users(username, last_ingested_at, status, repo_count, error)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(username) DO UPDATE SET
                   last_ingested_at=excluded.last_ingested_at,
                   status=excluded.status,
                   repo_count=excluded.repo_count,
                   error=excluded.error",
                params![
                    status.username,
                    status.last_ingested_at,
                    status.status.as_str(),
                    status.repo_count,
                    status.error,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_user_status(&self, username: &str) -> Result<Option<UserStatus>> {
        let user = username.to_string();
        self.with_conn(username, move |conn| {
            let row = conn
                .query_row(
                    "SELECT username, last_ingested_at, status, repo_count, error
                     FROM users WHERE username = ?1",
                    params![user],
                    row_to_user,
                )
                .optional()?;
            Ok(row)
        })
        .await
    }

    async fn get_repository(&self, username: &str, repo: &str) -> Result<Option<RepoRecord>> {
        let (user, repo) = (username.to_string(), repo.to_string());
        self.with_conn(username, move |conn| {
            let sql = format!("SELECT {REPO_COLUMNS} FROM repos WHERE username = ?1 AND repo = ?2");
            let row = conn
                .query_row(&sql, params![user, repo], row_to_repo)
                .optional()?;
            Ok(row)
        })
        .await
    }

    async fn list_repositories(&self, username: &str) -> Result<Vec<RepoRecord>> {
        let user = username.to_string();
        self.with_conn(username, move |conn| {
            let sql = format!(
                "SELECT {REPO_COLUMNS} FROM repos WHERE username = ?1
                 ORDER BY pushed_at DESC, repo"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows: rusqlite::Result<Vec<RepoRecord>> =
                stmt.query_map(params![user], row_to_repo)?.collect();
            Ok(rows?)
        })
        .await
    }

    async fn get_signals(&self, username: &str, repo: &str) -> Result<Option<RepoSignals>> {
        let (user, repo) = (username.to_string(), repo.to_string());
        self.with_conn(username, move |conn| {
            let sql = format!(
                "SELECT {SIGNAL_COLUMNS} FROM repo_signals WHERE username = ?1 AND repo = ?2"
            );
            let row = conn
                .query_row(&sql, params![user, repo], row_to_signals)
                .optional()?;
            Ok(row)
        })
        .await
    }

    async fn query_signals(
        &self,
        username: &str,
        filter: &SignalFilter,
        limit: usize,
    ) -> Result<Vec<RepoSignals>> {
        let user = username.to_string();
        let filter = filter.clone();
        self.with_conn(username, move |conn| {
            let mut conditions = vec!["username = ?".to_string()];
            let mut values = vec![SqlParam::Text(user)];

            if let Some(stack) = &filter.tech_stack {
                conditions.push("tech_stack LIKE ?".to_string());
                values.push(SqlParam::Text(format!("%{stack}%")));
            }
            for (column, flag) in [
                ("has_ci_config", filter.has_ci_config),
                ("has_tests", filter.has_tests),
                ("has_dockerfile", filter.has_dockerfile),
                ("has_precommit", filter.has_precommit),
            ] {
                if let Some(flag) = flag {
                    conditions.push(format!("{column} = ?"));
                    values.push(SqlParam::Int(flag as i64));
                }
            }
            if let Some(ci) = &filter.detected_ci {
                conditions.push("detected_ci = ?".to_string());
                values.push(SqlParam::Text(ci.clone()));
            }
            if let Some(framework) = &filter.detected_test_framework {
                conditions.push("detected_test_framework = ?".to_string());
                values.push(SqlParam::Text(framework.clone()));
            }
            values.push(SqlParam::Int(limit as i64));

            let sql = format!(
                "SELECT {SIGNAL_COLUMNS} FROM repo_signals
                 WHERE {}
                 ORDER BY has_ci_config DESC, has_tests DESC, automation_score DESC,
                          coding_standards_score DESC, repo ASC
                 LIMIT ?",
                conditions.join(" AND ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows: rusqlite::Result<Vec<RepoSignals>> = stmt
                .query_map(rusqlite::params_from_iter(values.iter()), row_to_signals)?
                .collect();
            Ok(rows?)
        })
        .await
    }

    async fn list_commits(
        &self,
        username: &str,
        repo: &str,
        limit: usize,
    ) -> Result<Vec<CommitRecord>> {
        let (user, repo) = (username.to_string(), repo.to_string());
        self.with_conn(username, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT username, repo, sha, authored_at, message, author_name, author_login, \
                     files_changed, additions, deletions
                 FROM commits
                 WHERE username = ?1 AND repo = ?2
                 ORDER BY authored_at DESC
                 LIMIT ?3",
            )?;
            let rows: rusqlite::Result<Vec<CommitRecord>> = stmt
                .query_map(params![user, repo, limit as i64], row_to_commit)?
                .collect();
            Ok(rows?)
        })
        .await
    }

    async fn count_commits(&self, username: &str, repo: &str) -> Result<i64> {
        let (user, repo) = (username.to_string(), repo.to_string());
        self.with_conn(username, move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM commits WHERE username = ?1 AND repo = ?2",
                params![user, repo],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    async fn search_readmes(
        &self,
        username: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ReadmeHit>> {
        let user = username.to_string();
        let pattern = format!("%{query}%");
        self.with_conn(username, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT repo, html_url, description
                 FROM repos
                 WHERE username = ?1 AND (readme_text LIKE ?2 OR description LIKE ?2)
                 ORDER BY repo
                 LIMIT ?3",
            )?;
            let rows: rusqlite::Result<Vec<ReadmeHit>> = stmt
                .query_map(params![user, pattern, limit as i64], |row| {
                    Ok(ReadmeHit {
                        repo: row.get(0)?,
                        html_url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })?
                .collect();
            Ok(rows?)
        })
        .await
    }

    async fn aggregate_metrics(&self, username: &str) -> Result<RepoMetrics> {
        let user = username.to_string();
        self.with_conn(username, move |conn| {
            let count = |sql: &str| -> rusqlite::Result<i64> {
                conn.query_row(sql, params![user], |row| row.get(0))
            };

            Ok(RepoMetrics {
                total_repos: count("SELECT COUNT(*) FROM repos WHERE username = ?1")?,
                ci_cd_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_ci_config = 1",
                )?,
                github_actions_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_github_actions = 1",
                )?,
                test_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_tests = 1",
                )?,
                lint_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_lint_config = 1",
                )?,
                precommit_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_precommit = 1",
                )?,
                docker_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND has_dockerfile = 1",
                )?,
                python_repos: count(
                    "SELECT COUNT(*) FROM repo_signals WHERE username = ?1 AND tech_stack LIKE '%Python%'",
                )?,
                sql_hint_repos: count(
                    "SELECT COUNT(*) FROM repos WHERE username = ?1 AND (description LIKE '%SQL%' OR readme_text LIKE '%SQL%')",
                )?,
            })
        })
        .await
    }

    async fn rank_by_activity(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>> {
        let user = username.to_string();
        self.with_conn(username, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT repo, COUNT(*) as commit_count
                 FROM commits
                 WHERE username = ?1
                 GROUP BY repo
                 ORDER BY commit_count DESC, repo ASC
                 LIMIT ?2",
            )?;
            let rows: rusqlite::Result<Vec<ActivityEntry>> = stmt
                .query_map(params![user, limit as i64], |row| {
                    Ok(ActivityEntry {
                        repo: row.get(0)?,
                        commit_count: row.get(1)?,
                    })
                })?
                .collect();
            Ok(rows?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngestionStatus;
    use crate::signals::detect_signals;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path());
        (dir, store)
    }

    fn repo_record(username: &str, repo: &str, description: &str) -> RepoRecord {
        RepoRecord {
            username: username.to_string(),
            repo: repo.to_string(),
            default_branch: "main".to_string(),
            description: description.to_string(),
            language: "Rust".to_string(),
            html_url: format!("https://github.com/{username}/{repo}"),
            readme_text: String::new(),
            last_ingested_at: "2024-01-01T00:00:00Z".to_string(),
            pushed_at: "2024-01-01T00:00:00Z".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
            stargazers_count: 0,
            forks_count: 0,
            watchers_count: 0,
            open_issues_count: 0,
            size: 0,
            topics: vec![],
            license_name: String::new(),
            is_archived: false,
            is_fork: false,
        }
    }

    #[tokio::test]
    async fn test_repository_upsert_is_idempotent() {
        let (_dir, store) = store();

        store
            .upsert_repository(&repo_record("alice", "widget", "first"))
            .await
            .unwrap();
        store
            .upsert_repository(&repo_record("alice", "widget", "second"))
            .await
            .unwrap();

        let repos = store.list_repositories("alice").await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].description, "second");
    }

    #[tokio::test]
    async fn test_commit_key_stability() {
        let (_dir, store) = store();

        let mut commit = CommitRecord {
            username: "alice".to_string(),
            repo: "widget".to_string(),
            sha: "abc123".to_string(),
            message: "wip".to_string(),
            additions: 1,
            ..Default::default()
        };
        store.upsert_commit(&commit).await.unwrap();

        commit.message = "final message".to_string();
        commit.additions = 42;
        store.upsert_commit(&commit).await.unwrap();

        assert_eq!(store.count_commits("alice", "widget").await.unwrap(), 1);
        let commits = store.list_commits("alice", "widget", 10).await.unwrap();
        assert_eq!(commits[0].message, "final message");
        assert_eq!(commits[0].additions, 42);
    }

    #[tokio::test]
    async fn test_signals_are_fully_replaced() {
        let (_dir, store) = store();

        let rich: Vec<String> = ["tests/test_a.py", ".github/workflows/ci.yml", "Dockerfile"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        store
            .upsert_signals(&detect_signals("alice", "widget", &rich))
            .await
            .unwrap();

        let bare: Vec<String> = vec!["src/main.go".to_string()];
        store
            .upsert_signals(&detect_signals("alice", "widget", &bare))
            .await
            .unwrap();

        let signals = store.get_signals("alice", "widget").await.unwrap().unwrap();
        assert!(!signals.has_tests);
        assert!(!signals.has_github_actions);
        assert!(!signals.has_dockerfile);
        assert_eq!(signals.detected_ci, "");
        assert_eq!(signals.tech_stack, "Go");
        assert_eq!(signals.diagnostics.total_paths, 1);
    }

    #[tokio::test]
    async fn test_missing_signals_are_none() {
        let (_dir, store) = store();
        assert!(store
            .get_signals("alice", "never-ingested")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_user_status_transitions() {
        let (_dir, store) = store();

        store
            .upsert_user_status(&UserStatus::failed("alice", "tree fetch exploded".to_string()))
            .await
            .unwrap();
        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("tree fetch exploded"));

        store
            .upsert_user_status(&UserStatus::new("alice", IngestionStatus::InProgress))
            .await
            .unwrap();
        store
            .upsert_user_status(&UserStatus::completed("alice", 3))
            .await
            .unwrap();

        let status = store.get_user_status("alice").await.unwrap().unwrap();
        assert_eq!(status.status, IngestionStatus::Completed);
        assert_eq!(status.repo_count, 3);
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_query_signals_filters_and_orders() {
        let (_dir, store) = store();

        let ci_paths: Vec<String> = [".github/workflows/ci.yml", "tests/test_a.py", "a.py"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plain_paths: Vec<String> = vec!["main.py".to_string()];

        store
            .upsert_signals(&detect_signals("alice", "with-ci", &ci_paths))
            .await
            .unwrap();
        store
            .upsert_signals(&detect_signals("alice", "plain", &plain_paths))
            .await
            .unwrap();

        let all = store
            .query_signals("alice", &SignalFilter::default(), 20)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].repo, "with-ci");

        let filtered = store
            .query_signals(
                "alice",
                &SignalFilter {
                    has_ci_config: Some(true),
                    ..Default::default()
                },
                20,
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].repo, "with-ci");

        let by_stack = store
            .query_signals(
                "alice",
                &SignalFilter {
                    tech_stack: Some("Python".to_string()),
                    ..Default::default()
                },
                20,
            )
            .await
            .unwrap();
        assert_eq!(by_stack.len(), 2);
    }

    #[tokio::test]
    async fn test_search_readmes_matches_description() {
        let (_dir, store) = store();

        let mut record = repo_record("alice", "etl", "a SQL data pipeline");
        record.readme_text = "runs nightly".to_string();
        store.upsert_repository(&record).await.unwrap();
        store
            .upsert_repository(&repo_record("alice", "game", "a roguelike"))
            .await
            .unwrap();

        let hits = store.search_readmes("alice", "SQL", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].repo, "etl");

        let hits = store.search_readmes("alice", "nightly", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_metrics_counts() {
        let (_dir, store) = store();

        store
            .upsert_repository(&repo_record("alice", "widget", "SQL widget"))
            .await
            .unwrap();
        let paths: Vec<String> = ["tests/test_a.py", ".github/workflows/ci.yml", "main.py"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        store
            .upsert_signals(&detect_signals("alice", "widget", &paths))
            .await
            .unwrap();

        let metrics = store.aggregate_metrics("alice").await.unwrap();
        assert_eq!(metrics.total_repos, 1);
        assert_eq!(metrics.ci_cd_repos, 1);
        assert_eq!(metrics.github_actions_repos, 1);
        assert_eq!(metrics.test_repos, 1);
        assert_eq!(metrics.python_repos, 1);
        assert_eq!(metrics.sql_hint_repos, 1);
        assert_eq!(metrics.docker_repos, 0);
    }

    #[tokio::test]
    async fn test_rank_by_activity_orders_by_count() {
        let (_dir, store) = store();

        for (repo, shas) in [("busy", vec!["a", "b", "c"]), ("quiet", vec!["d"])] {
            for sha in shas {
                store
                    .upsert_commit(&CommitRecord {
                        username: "alice".to_string(),
                        repo: repo.to_string(),
                        sha: sha.to_string(),
                        ..Default::default()
                    })
                    .await
                    .unwrap();
            }
        }

        let ranking = store.rank_by_activity("alice", 10).await.unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].repo, "busy");
        assert_eq!(ranking[0].commit_count, 3);
    }

    #[tokio::test]
    async fn test_users_are_physically_isolated() {
        let (dir, store) = store();

        store
            .upsert_repository(&repo_record("alice", "widget", ""))
            .await
            .unwrap();
        store
            .upsert_repository(&repo_record("bob", "gadget", ""))
            .await
            .unwrap();

        assert!(dir.path().join("alice.db").exists());
        assert!(dir.path().join("bob.db").exists());
        assert_eq!(store.list_repositories("alice").await.unwrap().len(), 1);
        assert_eq!(
            store.list_repositories("alice").await.unwrap()[0].repo,
            "widget"
        );
    }
}
