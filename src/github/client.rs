// file: src/github/client.rs
// description: GitHub REST API client used by the ingestion orchestrator
// reference: https://docs.rs/reqwest

use crate::config::{GithubConfig, IngestionConfig};
use crate::error::{InsightError, Result};
use crate::github::types::{
    CommitDetail, CommitSummary, GitCommit, GitRef, GitTree, ReadmePayload, RepoMeta,
};
use crate::github::RepoSource;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    page_size: usize,
}

impl GithubClient {
    pub fn new(github: &GithubConfig, ingestion: &IngestionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&github.user_agent)
                .map_err(|e| InsightError::Config(format!("invalid user agent: {e}")))?,
        );

        if let Some(token) = &github.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| InsightError::Config(format!("invalid token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            warn!("No GitHub token configured; unauthenticated rate limits apply");
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(github.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: github.api_url.trim_end_matches('/').to_string(),
            page_size: ingestion.page_size,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {url}");
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let remaining = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            if remaining == "0" || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(InsightError::RateLimited(format!(
                    "{url} (remaining={remaining})"
                )));
            }
        }

        if !status.is_success() {
            return Err(InsightError::GithubStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// GitHub serves README content as base64 with embedded newlines; invalid
    /// payloads decode to an empty string rather than failing the repository.
    fn decode_readme(payload: &ReadmePayload) -> String {
        let compact: String = payload
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if compact.is_empty() {
            return String::new();
        }
        match BASE64.decode(compact.as_bytes()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

#[async_trait]
impl RepoSource for GithubClient {
    async fn list_repositories(&self, user: &str) -> Result<Vec<RepoMeta>> {
        let url = format!("{}/users/{}/repos", self.api_url, user);
        let mut repos = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: Vec<RepoMeta> = self
                .get_json(
                    &url,
                    &[
                        ("per_page", self.page_size.to_string()),
                        ("page", page.to_string()),
                        ("sort", "updated".to_string()),
                    ],
                )
                .await?;

            if batch.is_empty() {
                break;
            }
            repos.extend(batch);
            page += 1;
        }

        Ok(repos)
    }

    async fn fetch_readme(&self, user: &str, repo: &str, _branch: &str) -> Result<String> {
        let url = format!("{}/repos/{}/{}/readme", self.api_url, user, repo);
        let payload: ReadmePayload = self.get_json(&url, &[]).await?;
        Ok(Self::decode_readme(&payload))
    }

    async fn fetch_tree(&self, user: &str, repo: &str, branch: &str) -> Result<Vec<String>> {
        let ref_url = format!(
            "{}/repos/{}/{}/git/refs/heads/{}",
            self.api_url, user, repo, branch
        );
        let git_ref: GitRef = self.get_json(&ref_url, &[]).await?;

        let commit_url = format!(
            "{}/repos/{}/{}/git/commits/{}",
            self.api_url, user, repo, git_ref.object.sha
        );
        let commit: GitCommit = self.get_json(&commit_url, &[]).await?;

        let tree_url = format!(
            "{}/repos/{}/{}/git/trees/{}",
            self.api_url, user, repo, commit.tree.sha
        );
        let tree: GitTree = self
            .get_json(&tree_url, &[("recursive", "1".to_string())])
            .await?;

        Ok(tree.tree.into_iter().filter_map(|e| e.path).collect())
    }

    async fn list_commits(
        &self,
        user: &str,
        repo: &str,
        max_commits: usize,
    ) -> Result<Vec<CommitSummary>> {
        let url = format!("{}/repos/{}/{}/commits", self.api_url, user, repo);
        let mut commits: Vec<CommitSummary> = Vec::new();
        let mut page = 1usize;

        while commits.len() < max_commits {
            let batch: Vec<CommitSummary> = self
                .get_json(
                    &url,
                    &[
                        ("per_page", self.page_size.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            if batch.is_empty() {
                break;
            }
            let short_page = batch.len() < self.page_size;
            commits.extend(batch);
            page += 1;
            if short_page {
                break;
            }
        }

        commits.truncate(max_commits);
        Ok(commits)
    }

    async fn fetch_commit_detail(&self, user: &str, repo: &str, sha: &str) -> Result<CommitDetail> {
        let url = format!("{}/repos/{}/{}/commits/{}", self.api_url, user, repo, sha);
        self.get_json(&url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn client() -> GithubClient {
        let config = Config::default_config();
        GithubClient::new(&config.github, &config.ingestion).unwrap()
    }

    #[test]
    fn test_client_builds_without_token() {
        let client = client();
        assert_eq!(client.api_url, "https://api.github.com");
        assert_eq!(client.page_size, 100);
    }

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let mut config = Config::default_config();
        config.github.api_url = "https://api.github.com/".to_string();
        let client = GithubClient::new(&config.github, &config.ingestion).unwrap();
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[test]
    fn test_decode_readme_with_newlines() {
        // "# Hello\n" split across base64 lines, the way the API serves it
        let payload = ReadmePayload {
            content: "IyBIZWxs\nbwo=\n".to_string(),
        };
        assert_eq!(GithubClient::decode_readme(&payload), "# Hello\n");
    }

    #[test]
    fn test_decode_readme_garbage_yields_empty() {
        let payload = ReadmePayload {
            content: "!!!not-base64!!!".to_string(),
        };
        assert_eq!(GithubClient::decode_readme(&payload), "");
    }

    #[test]
    fn test_decode_readme_empty_payload() {
        let payload = ReadmePayload {
            content: String::new(),
        };
        assert_eq!(GithubClient::decode_readme(&payload), "");
    }
}
