//! Configuration management for archivist
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use archivist::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Store timeout: {}", config.store.timeout);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `ARCHIVIST__<section>__<key>`
//!
//! Examples:
//! - `ARCHIVIST__STORE__BACKEND=memory`
//! - `ARCHIVIST__STORE__TIMEOUT=5s`
//! - `ARCHIVIST__INVALIDATION__LOG_RETENTION=180d`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/archivist.toml`.
//! This can be overridden using the `ARCHIVIST_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    Config, FiltersConfig, InvalidationConfig, SegmentConfig, SitesConfig, StoreBackend,
    StoreConfig, TelemetryConfig,
};
pub use validation::ValidationError;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{MemorySegmentCatalog, MemorySiteRegistry, SegmentDefinition};
use crate::filters::{FilterDefaults, FilterRegistry};
use crate::store::{self, ArchiveStore, BoundedStore, FjallArchiveStore, MemoryArchiveStore};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`ARCHIVIST__*`)
    /// 2. TOML file (default: `config/archivist.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn log_retention(&self) -> Option<Duration> {
        self.invalidation.log_retention.map(Duration::from)
    }

    pub fn site_registry(&self) -> MemorySiteRegistry {
        MemorySiteRegistry::new(self.sites.ids.iter().copied())
    }

    pub fn segment_catalog(&self) -> MemorySegmentCatalog {
        MemorySegmentCatalog::new(self.segments.iter().map(SegmentDefinition::from))
    }

    pub fn filter_registry(&self) -> FilterRegistry {
        FilterRegistry::with_settings(&FilterDefaults::from(&self.filters))
    }

    /// Open the configured backend, bounded by the store timeout
    pub fn open_store(&self) -> store::Result<Arc<dyn ArchiveStore>> {
        let backend: Arc<dyn ArchiveStore> = match (self.store.backend, &self.store.fjall_path) {
            (StoreBackend::Fjall, Some(path)) => Arc::new(FjallArchiveStore::open(path)?),
            (StoreBackend::Fjall, None) => {
                return Err(store::StoreError::Unavailable(
                    "fjall backend has no path".to_string(),
                ));
            }
            (StoreBackend::Memory, _) => Arc::new(MemoryArchiveStore::new()),
        };
        Ok(Arc::new(BoundedStore::new(
            backend,
            self.store.timeout.into(),
        )?))
    }
}
