// file: src/mcp/params.rs
// description: MCP tool parameter types with schemars-derived input schemas
// reference: https://docs.rs/schemars

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UserParams {
    /// GitHub username whose ingested data to query
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RepoParams {
    /// GitHub username
    pub user: String,
    /// Repository name
    pub repo: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TimelineParams {
    /// GitHub username
    pub user: String,
    /// Repository name
    pub repo: String,
    /// Maximum commits to return (default: 50)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// GitHub username
    pub user: String,
    /// Search string matched against README text and descriptions
    pub query: String,
    /// Maximum results to return (default: 10)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SignalQueryParams {
    /// GitHub username
    pub user: String,
    /// Substring match against the detected tech stack (e.g. "Python")
    pub tech_stack: Option<String>,
    /// Require a CI configuration
    pub has_ci_config: Option<bool>,
    /// Require detected tests
    pub has_tests: Option<bool>,
    /// Require a Dockerfile
    pub has_dockerfile: Option<bool>,
    /// Require a pre-commit config
    pub has_precommit: Option<bool>,
    /// Exact CI system label (e.g. "github_actions")
    pub detected_ci: Option<String>,
    /// Exact test framework label (e.g. "pytest")
    pub detected_test_framework: Option<String>,
    /// Maximum results to return (default: 20)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RankParams {
    /// GitHub username
    pub user: String,
    /// Maximum repositories to return (default: 10)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestParams {
    /// GitHub username whose public repositories to ingest
    pub user: String,
}

impl SignalQueryParams {
    pub fn to_filter(&self) -> crate::store::SignalFilter {
        crate::store::SignalFilter {
            tech_stack: self.tech_stack.clone(),
            has_ci_config: self.has_ci_config,
            has_tests: self.has_tests,
            has_dockerfile: self.has_dockerfile,
            has_precommit: self.has_precommit,
            detected_ci: self.detected_ci.clone(),
            detected_test_framework: self.detected_test_framework.clone(),
        }
    }
}
