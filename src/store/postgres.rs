// file: src/store/postgres.rs
// description: shared networked Postgres backend for the Store trait
// reference: https://docs.rs/tokio-postgres

use crate::error::{InsightError, Result};
use crate::models::{CommitRecord, IngestionStatus, RepoRecord, RepoSignals, UserStatus};
use crate::store::{ActivityEntry, ReadmeHit, RepoMetrics, SignalFilter, Store};
use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

/// One logical schema serving all usernames; username is the partition key.
/// Boolean columns are 0/1 BIGINTs so both backends store the same shapes.
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
    stargazers_count BIGINT DEFAULT 0,
    forks_count BIGINT DEFAULT 0,
    watchers_count BIGINT DEFAULT 0,
    open_issues_count BIGINT DEFAULT 0,
    size BIGINT DEFAULT 0,
    topics TEXT,
    license_name TEXT,
    is_archived BIGINT DEFAULT 0,
    is_fork BIGINT DEFAULT 0,
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
    files_changed BIGINT,
    additions BIGINT,
    deletions BIGINT,
    diff_summary TEXT,
    PRIMARY KEY (username, repo, sha)
);

CREATE TABLE IF NOT EXISTS repo_signals (
    username TEXT NOT NULL,
    repo TEXT NOT NULL,
    has_tests BIGINT,
    has_github_actions BIGINT,
    has_ci_config BIGINT,
    has_lint_config BIGINT,
    has_precommit BIGINT,
    has_dockerfile BIGINT,
    has_docker_compose BIGINT DEFAULT 0,
    has_makefile BIGINT,
    has_code_of_conduct BIGINT DEFAULT 0,
    has_contributing BIGINT DEFAULT 0,
    has_license BIGINT DEFAULT 0,
    has_security_policy BIGINT DEFAULT 0,
    has_issue_templates BIGINT DEFAULT 0,
    has_pr_templates BIGINT DEFAULT 0,
    has_changelog BIGINT DEFAULT 0,
    has_docs BIGINT DEFAULT 0,
    detected_test_framework TEXT,
    detected_ci TEXT,
    organization_score DOUBLE PRECISION DEFAULT 0.0,
    coding_standards_score DOUBLE PRECISION DEFAULT 0.0,
    automation_score DOUBLE PRECISION DEFAULT 0.0,
    tech_stack TEXT,
    signals_json TEXT,
    PRIMARY KEY (username, repo)
);

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    last_ingested_at TEXT,
    status TEXT,
    repo_count BIGINT DEFAULT 0,
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

pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect, drive the connection on its own task, and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Postgres");
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection terminated: {e}");
            }
        });

        client.batch_execute(SCHEMA_SQL).await?;
        Ok(Self { client })
    }
}

fn text(row: &Row, idx: usize) -> Result<String> {
    Ok(row.try_get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn int(row: &Row, idx: usize) -> Result<i64> {
    Ok(row.try_get::<_, Option<i64>>(idx)?.unwrap_or(0))
}

fn flag(row: &Row, idx: usize) -> Result<bool> {
    Ok(int(row, idx)? != 0)
}

fn real(row: &Row, idx: usize) -> Result<f64> {
    Ok(row.try_get::<_, Option<f64>>(idx)?.unwrap_or(0.0))
}

fn row_to_repo(row: &Row) -> Result<RepoRecord> {
    let topics: Vec<String> = serde_json::from_str(&text(row, 16)?).unwrap_or_default();
    Ok(RepoRecord {
        username: row.try_get(0)?,
        repo: row.try_get(1)?,
        default_branch: text(row, 2)?,
        description: text(row, 3)?,
        language: text(row, 4)?,
        html_url: text(row, 5)?,
        readme_text: text(row, 6)?,
        last_ingested_at: text(row, 7)?,
        pushed_at: text(row, 8)?,
        created_at: text(row, 9)?,
        updated_at: text(row, 10)?,
        stargazers_count: int(row, 11)?,
        forks_count: int(row, 12)?,
        watchers_count: int(row, 13)?,
        open_issues_count: int(row, 14)?,
        size: int(row, 15)?,
        topics,
        license_name: text(row, 17)?,
        is_archived: flag(row, 18)?,
        is_fork: flag(row, 19)?,
    })
}

fn row_to_signals(row: &Row) -> Result<RepoSignals> {
    Ok(RepoSignals {
        username: row.try_get(0)?,
        repo: row.try_get(1)?,
        has_tests: flag(row, 2)?,
        has_github_actions: flag(row, 3)?,
        has_ci_config: flag(row, 4)?,
        has_lint_config: flag(row, 5)?,
        has_precommit: flag(row, 6)?,
        has_dockerfile: flag(row, 7)?,
        has_docker_compose: flag(row, 8)?,
        has_makefile: flag(row, 9)?,
        has_code_of_conduct: flag(row, 10)?,
        has_contributing: flag(row, 11)?,
        has_license: flag(row, 12)?,
        has_security_policy: flag(row, 13)?,
        has_issue_templates: flag(row, 14)?,
        has_pr_templates: flag(row, 15)?,
        has_changelog: flag(row, 16)?,
        has_docs: flag(row, 17)?,
        detected_test_framework: text(row, 18)?,
        detected_ci: text(row, 19)?,
        organization_score: real(row, 20)?,
        coding_standards_score: real(row, 21)?,
        automation_score: real(row, 22)?,
        tech_stack: text(row, 23)?,
        diagnostics: RepoSignals::parse_diagnostics(&text(row, 24)?),
    })
}

fn row_to_commit(row: &Row) -> Result<CommitRecord> {
    Ok(CommitRecord {
        username: row.try_get(0)?,
        repo: row.try_get(1)?,
        sha: row.try_get(2)?,
        authored_at: text(row, 3)?,
        message: text(row, 4)?,
        author_name: text(row, 5)?,
        author_login: text(row, 6)?,
        files_changed: int(row, 7)?,
        additions: int(row, 8)?,
        deletions: int(row, 9)?,
    })
}

/// Build the WHERE tail for `query_signals`: extra conditions after the
/// `username = $1` anchor, numbering placeholders from `$2`.
fn filter_conditions(filter: &SignalFilter) -> (Vec<String>, Vec<Box<dyn ToSql + Sync + Send>>) {
    let mut conditions = Vec::new();
    let mut values: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
    let mut next = 2usize;

    if let Some(stack) = &filter.tech_stack {
        conditions.push(format!("tech_stack LIKE ${next}"));
        values.push(Box::new(format!("%{stack}%")));
        next += 1;
    }
    for (column, value) in [
        ("has_ci_config", filter.has_ci_config),
        ("has_tests", filter.has_tests),
        ("has_dockerfile", filter.has_dockerfile),
        ("has_precommit", filter.has_precommit),
    ] {
        if let Some(value) = value {
            conditions.push(format!("{column} = ${next}"));
            values.push(Box::new(value as i64));
            next += 1;
        }
    }
    if let Some(ci) = &filter.detected_ci {
        conditions.push(format!("detected_ci = ${next}"));
        values.push(Box::new(ci.clone()));
        next += 1;
    }
    if let Some(framework) = &filter.detected_test_framework {
        conditions.push(format!("detected_test_framework = ${next}"));
        values.push(Box::new(framework.clone()));
    }

    (conditions, values)
}

#[async_trait]
impl Store for PostgresStore {
    async fn upsert_repository(&self, record: &RepoRecord) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO repos(username, repo, default_branch, description, language, \
                     html_url, readme_text, last_ingested_at, pushed_at, created_at, updated_at, \
                     stargazers_count, forks_count, watchers_count, open_issues_count, size, \
                     topics, license_name, is_archived, is_fork)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20)
                 ON CONFLICT (username, repo) DO UPDATE SET
                   default_branch=EXCLUDED.default_branch,
                   description=EXCLUDED.description,
                   language=EXCLUDED.language,
                   html_url=EXCLUDED.html_url,
                   readme_text=EXCLUDED.readme_text,
                   last_ingested_at=EXCLUDED.last_ingested_at,
                   pushed_at=EXCLUDED.pushed_at,
                   created_at=EXCLUDED.created_at,
                   updated_at=EXCLUDED.updated_at,
                   stargazers_count=EXCLUDED.stargazers_count,
                   forks_count=EXCLUDED.forks_count,
                   watchers_count=EXCLUDED.watchers_count,
                   open_issues_count=EXCLUDED.open_issues_count,
                   size=EXCLUDED.size,
                   topics=EXCLUDED.topics,
                   license_name=EXCLUDED.license_name,
                   is_archived=EXCLUDED.is_archived,
                   is_fork=EXCLUDED.is_fork",
                &[
                    &record.username,
                    &record.repo,
                    &record.default_branch,
                    &record.description,
                    &record.language,
                    &record.html_url,
                    &record.readme_text,
                    &record.last_ingested_at,
                    &record.pushed_at,
                    &record.created_at,
                    &record.updated_at,
                    &record.stargazers_count,
                    &record.forks_count,
                    &record.watchers_count,
                    &record.open_issues_count,
                    &record.size,
                    &record.topics_json(),
                    &record.license_name,
                    &(record.is_archived as i64),
                    &(record.is_fork as i64),
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_signals(&self, record: &RepoSignals) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO repo_signals(username, repo, has_tests, has_github_actions, \
                     has_ci_config, has_lint_config, has_precommit, has_dockerfile, \
                     has_docker_compose, has_makefile, has_code_of_conduct, has_contributing, \
                     has_license, has_security_policy, has_issue_templates, has_pr_templates, \
                     has_changelog, has_docs, detected_test_framework, detected_ci, \
                     organization_score, coding_standards_score, automation_score, tech_stack, \
                     signals_json)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $23, $24, $25)
                 ON CONFLICT (username, repo) DO UPDATE SET
                   has_tests=EXCLUDED.has_tests,
                   has_github_actions=EXCLUDED.has_github_actions,
                   has_ci_config=EXCLUDED.has_ci_config,
                   has_lint_config=EXCLUDED.has_lint_config,
                   has_precommit=EXCLUDED.has_precommit,
                   has_dockerfile=EXCLUDED.has_dockerfile,
                   has_docker_compose=EXCLUDED.has_docker_compose,
                   has_makefile=EXCLUDED.has_makefile,
                   has_code_of_conduct=EXCLUDED.has_code_of_conduct,
                   has_contributing=EXCLUDED.has_contributing,
                   has_license=EXCLUDED.has_license,
                   has_security_policy=EXCLUDED.has_security_policy,
                   has_issue_templates=EXCLUDED.has_issue_templates,
                   has_pr_templates=EXCLUDED.has_pr_templates,
                   has_changelog=EXCLUDED.has_changelog,
                   has_docs=EXCLUDED.has_docs,
                   detected_test_framework=EXCLUDED.detected_test_framework,
                   detected_ci=EXCLUDED.detected_ci,
                   organization_score=EXCLUDED.organization_score,
                   coding_standards_score=EXCLUDED.coding_standards_score,
                   automation_score=EXCLUDED.automation_score,
                   tech_stack=EXCLUDED.tech_stack,
                   signals_json=EXCLUDED.signals_json",
                &[
                    &record.username,
                    &record.repo,
                    &(record.has_tests as i64),
                    &(record.has_github_actions as i64),
                    &(record.has_ci_config as i64),
                    &(record.has_lint_config as i64),
                    &(record.has_precommit as i64),
                    &(record.has_dockerfile as i64),
                    &(record.has_docker_compose as i64),
                    &(record.has_makefile as i64),
                    &(record.has_code_of_conduct as i64),
                    &(record.has_contributing as i64),
                    &(record.has_license as i64),
                    &(record.has_security_policy as i64),
                    &(record.has_issue_templates as i64),
                    &(record.has_pr_templates as i64),
                    &(record.has_changelog as i64),
                    &(record.has_docs as i64),
                    &record.detected_test_framework,
                    &record.detected_ci,
                    &record.organization_score,
                    &record.coding_standards_score,
                    &record.automation_score,
                    &record.tech_stack,
                    &record.diagnostics_json(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_commit(&self, record: &CommitRecord) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO commits(username, repo, sha, authored_at, message, author_name, \
                     author_login, files_changed, additions, deletions, diff_summary)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (username, repo, sha) DO UPDATE SET
                   authored_at=EXCLUDED.authored_at,
                   message=EXCLUDED.message,
                   author_name=EXCLUDED.author_name,
                   author_login=EXCLUDED.author_login,
                   files_changed=EXCLUDED.files_changed,
                   additions=EXCLUDED.additions,
                   deletions=EXCLUDED.deletions",
                &[
                    &record.username,
                    &record.repo,
                    &record.sha,
                    &record.authored_at,
                    &record.message,
                    &record.author_name,
                    &record.author_login,
                    &record.files_changed,
                    &record.additions,
                    &record.deletions,
                    &"",
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_user_status(&self, status: &UserStatus) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO users(username, last_ingested_at, status, repo_count, error)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (username) DO UPDATE SET
                   last_ingested_at=EXCLUDED.last_ingested_at,
                   status=EXCLUDED.status,
                   repo_count=EXCLUDED.repo_count,
                   error=EXCLUDED.error",
                &[
                    &status.username,
                    &status.last_ingested_at,
                    &status.status.as_str(),
                    &status.repo_count,
                    &status.error,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_user_status(&self, username: &str) -> Result<Option<UserStatus>> {
        let row = self
            .client
            .query_opt(
                "SELECT username, last_ingested_at, status, repo_count, error
                 FROM users WHERE username = $1",
                &[&username],
            )
            .await?;

        row.map(|row| {
            Ok(UserStatus {
                username: row.try_get(0)?,
                last_ingested_at: text(&row, 1)?,
                status: IngestionStatus::parse(&text(&row, 2)?),
                repo_count: int(&row, 3)?,
                error: row.try_get(4)?,
            })
        })
        .transpose()
    }

    async fn get_repository(&self, username: &str, repo: &str) -> Result<Option<RepoRecord>> {
        let sql = format!("SELECT {REPO_COLUMNS} FROM repos WHERE username = $1 AND repo = $2");
        let row = self.client.query_opt(&sql, &[&username, &repo]).await?;
        row.map(|row| row_to_repo(&row)).transpose()
    }

    async fn list_repositories(&self, username: &str) -> Result<Vec<RepoRecord>> {
        let sql = format!(
            "SELECT {REPO_COLUMNS} FROM repos WHERE username = $1 ORDER BY pushed_at DESC, repo"
        );
        let rows = self.client.query(&sql, &[&username]).await?;
        rows.iter().map(row_to_repo).collect()
    }

    async fn get_signals(&self, username: &str, repo: &str) -> Result<Option<RepoSignals>> {
        let sql =
            format!("SELECT {SIGNAL_COLUMNS} FROM repo_signals WHERE username = $1 AND repo = $2");
        let row = self.client.query_opt(&sql, &[&username, &repo]).await?;
        row.map(|row| row_to_signals(&row)).transpose()
    }

    async fn query_signals(
        &self,
        username: &str,
        filter: &SignalFilter,
        limit: usize,
    ) -> Result<Vec<RepoSignals>> {
        let (conditions, values) = filter_conditions(filter);
        let limit_placeholder = values.len() + 2;

        let mut where_clause = "username = $1".to_string();
        for condition in &conditions {
            where_clause.push_str(" AND ");
            where_clause.push_str(condition);
        }

        let sql = format!(
            "SELECT {SIGNAL_COLUMNS} FROM repo_signals
             WHERE {where_clause}
             ORDER BY has_ci_config DESC, has_tests DESC, automation_score DESC,
                      coding_standards_score DESC, repo ASC
             LIMIT ${limit_placeholder}"
        );

        let limit = limit as i64;
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&username];
        params.extend(values.iter().map(|v| v.as_ref() as &(dyn ToSql + Sync)));
        params.push(&limit);

        let rows = self.client.query(&sql, &params).await?;
        rows.iter().map(row_to_signals).collect()
    }

    async fn list_commits(
        &self,
        username: &str,
        repo: &str,
        limit: usize,
    ) -> Result<Vec<CommitRecord>> {
        let rows = self
            .client
            .query(
                "SELECT username, repo, sha, authored_at, message, author_name, author_login, \
                     files_changed, additions, deletions
                 FROM commits
                 WHERE username = $1 AND repo = $2
                 ORDER BY authored_at DESC
                 LIMIT $3",
                &[&username, &repo, &(limit as i64)],
            )
            .await?;
        rows.iter().map(row_to_commit).collect()
    }

    async fn count_commits(&self, username: &str, repo: &str) -> Result<i64> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) FROM commits WHERE username = $1 AND repo = $2",
                &[&username, &repo],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn search_readmes(
        &self,
        username: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ReadmeHit>> {
        let pattern = format!("%{query}%");
        let rows = self
            .client
            .query(
                "SELECT repo, html_url, description
                 FROM repos
                 WHERE username = $1 AND (readme_text LIKE $2 OR description LIKE $2)
                 ORDER BY repo
                 LIMIT $3",
                &[&username, &pattern, &(limit as i64)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ReadmeHit {
                    repo: row.try_get(0)?,
                    html_url: text(row, 1)?,
                    description: text(row, 2)?,
                })
            })
            .collect()
    }

    async fn aggregate_metrics(&self, username: &str) -> Result<RepoMetrics> {
        let count = |sql: &'static str| async move {
            let row = self.client.query_one(sql, &[&username]).await?;
            Ok::<i64, InsightError>(row.try_get(0)?)
        };

        Ok(RepoMetrics {
            total_repos: count("SELECT COUNT(*) FROM repos WHERE username = $1").await?,
            ci_cd_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_ci_config = 1",
            )
            .await?,
            github_actions_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_github_actions = 1",
            )
            .await?,
            test_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_tests = 1",
            )
            .await?,
            lint_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_lint_config = 1",
            )
            .await?,
            precommit_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_precommit = 1",
            )
            .await?,
            docker_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND has_dockerfile = 1",
            )
            .await?,
            python_repos: count(
                "SELECT COUNT(*) FROM repo_signals WHERE username = $1 AND tech_stack LIKE '%Python%'",
            )
            .await?,
            sql_hint_repos: count(
                "SELECT COUNT(*) FROM repos WHERE username = $1 AND (description LIKE '%SQL%' OR readme_text LIKE '%SQL%')",
            )
            .await?,
        })
    }

    async fn rank_by_activity(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>> {
        let rows = self
            .client
            .query(
                "SELECT repo, COUNT(*) as commit_count
                 FROM commits
                 WHERE username = $1
                 GROUP BY repo
                 ORDER BY commit_count DESC, repo ASC
                 LIMIT $2",
                &[&username, &(limit as i64)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ActivityEntry {
                    repo: row.try_get(0)?,
                    commit_count: row.try_get(1)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conditions_number_placeholders() {
        let filter = SignalFilter {
            tech_stack: Some("Python".to_string()),
            has_tests: Some(true),
            detected_ci: Some("github_actions".to_string()),
            ..Default::default()
        };

        let (conditions, values) = filter_conditions(&filter);
        assert_eq!(
            conditions,
            vec![
                "tech_stack LIKE $2".to_string(),
                "has_tests = $3".to_string(),
                "detected_ci = $4".to_string(),
            ]
        );
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_empty_filter_has_no_conditions() {
        let (conditions, values) = filter_conditions(&SignalFilter::default());
        assert!(conditions.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_schema_covers_all_tables() {
        for table in ["repos", "commits", "repo_signals", "users"] {
            assert!(SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }
}
