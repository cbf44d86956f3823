// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{InsightError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GithubConfig,
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub postgres_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    pub max_commits_per_repo: usize,
    pub page_size: usize,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("REPO_INSIGHT")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| InsightError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| InsightError::Config(e.to_string()))?;

        // GITHUB_TOKEN is the conventional variable; the prefixed override still wins.
        if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            github: GithubConfig {
                api_url: "https://api.github.com".to_string(),
                token: None,
                user_agent: "repo_insight/0.1.0".to_string(),
                request_timeout_secs: 60,
            },
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                data_dir: PathBuf::from("./data"),
                postgres_url: None,
            },
            ingestion: IngestionConfig {
                max_commits_per_repo: 200,
                page_size: 100,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.github.api_url.is_empty() {
            return Err(InsightError::Config(
                "github.api_url must not be empty".to_string(),
            ));
        }

        if self.github.request_timeout_secs == 0 {
            return Err(InsightError::Config(
                "github.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.ingestion.page_size == 0 || self.ingestion.page_size > 100 {
            return Err(InsightError::Config(
                "ingestion.page_size must be in 1..=100".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Postgres && self.storage.postgres_url.is_none() {
            return Err(InsightError::Config(
                "storage.postgres_url is required when backend is postgres".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.ingestion.max_commits_per_repo, 200);
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut config = Config::default_config();
        config.storage.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());

        config.storage.postgres_url = Some("postgres://localhost/insight".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut config = Config::default_config();
        config.ingestion.page_size = 0;
        assert!(config.validate().is_err());

        config.ingestion.page_size = 101;
        assert!(config.validate().is_err());
    }
}
