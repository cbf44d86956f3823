// file: src/tools/mod.rs
// description: query tool operations module exports
// reference: internal module structure

pub mod queries;

pub use queries::{
    aggregate_repo_metrics, get_commit_timeline, get_repo_overview, ingestion_status, list_repos,
    query_repos_by_signals, rank_repos_by_activity, search_readmes,
};
