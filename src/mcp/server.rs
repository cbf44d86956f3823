// file: src/mcp/server.rs
// description: MCP server exposing the repository intelligence query tools
// reference: https://docs.rs/rmcp

use crate::config::IngestionConfig;
use crate::github::RepoSource;
use crate::ingest::IngestionOrchestrator;
use crate::mcp::params::*;
use crate::store::Store;
use crate::tools;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct RepoInsightMcp {
    store: Arc<dyn Store>,
    source: Arc<dyn RepoSource>,
    ingestion: IngestionConfig,
    tool_router: ToolRouter<Self>,
}

fn value_to_result(value: serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
    )])
}

fn internal(e: impl std::fmt::Display) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

#[tool_router]
impl RepoInsightMcp {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn RepoSource>,
        ingestion: IngestionConfig,
    ) -> Self {
        Self {
            store,
            source,
            ingestion,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "list_repos",
        description = "List repositories ingested for a GitHub user, most recently pushed first."
    )]
    async fn list_repos(
        &self,
        Parameters(params): Parameters<UserParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = tools::list_repos(self.store.as_ref(), &params.user)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "get_repo_overview",
        description = "Get repository metadata plus grouped engineering signals (automation, coding standards, organization) and composite scores."
    )]
    async fn get_repo_overview(
        &self,
        Parameters(params): Parameters<RepoParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = tools::get_repo_overview(self.store.as_ref(), &params.user, &params.repo)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "get_commit_timeline",
        description = "Return the ingested commit timeline for a repository, most recent first."
    )]
    async fn get_commit_timeline(
        &self,
        Parameters(params): Parameters<TimelineParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(50) as usize;
        let value =
            tools::get_commit_timeline(self.store.as_ref(), &params.user, &params.repo, limit)
                .await
                .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "search_readmes",
        description = "Search README text and descriptions across all of a user's repositories."
    )]
    async fn search_readmes(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(10) as usize;
        let value = tools::search_readmes(self.store.as_ref(), &params.user, &params.query, limit)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "query_repos_by_signals",
        description = "Query repositories by engineering signals and/or tech stack. Boolean flags filter on detected indicators; tech_stack is a substring match."
    )]
    async fn query_repos_by_signals(
        &self,
        Parameters(params): Parameters<SignalQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(20) as usize;
        let filter = params.to_filter();
        let value =
            tools::query_repos_by_signals(self.store.as_ref(), &params.user, &filter, limit)
                .await
                .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "aggregate_repo_metrics",
        description = "Return high-level engineering metrics across all repos for a user (CI adoption, test coverage presence, Docker usage, ...)."
    )]
    async fn aggregate_repo_metrics(
        &self,
        Parameters(params): Parameters<UserParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = tools::aggregate_repo_metrics(self.store.as_ref(), &params.user)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "rank_repos_by_activity",
        description = "Rank repositories by commit activity within the ingested history window."
    )]
    async fn rank_repos_by_activity(
        &self,
        Parameters(params): Parameters<RankParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(10) as usize;
        let value = tools::rank_repos_by_activity(self.store.as_ref(), &params.user, limit)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }

    #[tool(
        name = "ingest_user",
        description = "Start background ingestion of a GitHub user's public repositories. Returns immediately; poll get_ingestion_status for progress."
    )]
    async fn ingest_user(
        &self,
        Parameters(params): Parameters<IngestParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: starting background ingestion for {}", params.user);

        let orchestrator = Arc::new(IngestionOrchestrator::new(
            self.source.clone(),
            self.store.clone(),
            self.ingestion.clone(),
        ));
        orchestrator.spawn(params.user.clone());

        Ok(value_to_result(json!({
            "status": "started",
            "username": params.user,
            "detail": "Ingestion is running in the background; poll get_ingestion_status.",
        })))
    }

    #[tool(
        name = "get_ingestion_status",
        description = "Report the state of the most recent ingestion run for a user: pending, in_progress, completed, or failed."
    )]
    async fn get_ingestion_status(
        &self,
        Parameters(params): Parameters<UserParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = tools::ingestion_status(self.store.as_ref(), &params.user)
            .await
            .map_err(internal)?;
        Ok(value_to_result(value))
    }
}

#[tool_handler]
impl ServerHandler for RepoInsightMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Repository intelligence over a GitHub user's ingested repos. \
                 Run ingest_user first, poll get_ingestion_status, then query \
                 with the read-only tools."
                    .into(),
            ),
        }
    }
}
