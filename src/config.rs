//! Runtime configuration
//!
//! Resolves connection settings and the storage backend from parsed CLI
//! arguments. Credentials are read once at startup and reused for every
//! request.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::cache::{FileStore, KeyValueStore, MemoryStore};
use crate::cli::Cli;
use crate::data::{ContentClient, RetryPolicy};

/// Errors raised while resolving configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No content URL configured; pass --base-url or set GOSPELWAY_BASE_URL")]
    MissingBaseUrl,

    #[error("No API key configured; pass --api-key or set GOSPELWAY_API_KEY")]
    MissingApiKey,
}

/// Settings for one run
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Use an in-memory store instead of the filesystem
    pub no_cache: bool,
    pub retry: RetryPolicy,
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// Blank values count as unset.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            base_url: non_blank(cli.base_url.as_deref()),
            api_key: non_blank(cli.api_key.as_deref()),
            cache_dir: cli.cache_dir.clone(),
            no_cache: cli.no_cache,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the content client from the configured URL and key
    pub fn content_client(&self) -> Result<ContentClient, ConfigError> {
        let base_url = self.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)?;
        let api_key = self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)?;
        Ok(ContentClient::new(base_url, api_key).with_policy(self.retry.clone()))
    }

    /// Opens the storage backend for cache entries and highlights
    ///
    /// Falls back to an in-memory store when no cache directory can be
    /// determined.
    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        if self.no_cache {
            return Arc::new(MemoryStore::new());
        }
        if let Some(dir) = &self.cache_dir {
            return Arc::new(FileStore::with_dir(dir.clone()));
        }
        match FileStore::new() {
            Some(store) => Arc::new(store),
            None => {
                warn!("no cache directory available, caching in memory only");
                Arc::new(MemoryStore::new())
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
