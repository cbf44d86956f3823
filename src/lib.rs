// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod github;
pub mod ingest;
pub mod mcp;
pub mod models;
pub mod signals;
pub mod store;
pub mod tools;
pub mod utils;

pub use config::{Config, GithubConfig, IngestionConfig, StorageBackend, StorageConfig};
pub use error::{InsightError, Result};
pub use github::{GithubClient, RepoSource};
pub use ingest::{IngestStats, IngestionOrchestrator, ProgressTracker};
pub use models::{CommitRecord, IngestionStatus, RepoRecord, RepoSignals, UserStatus};
pub use signals::{classify_paths, detect_signals, PathIndicators};
pub use store::{open_store, PostgresStore, SignalFilter, SqliteStore, Store};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _config = Config::default_config();
        let _filter = SignalFilter::default();
    }
}
