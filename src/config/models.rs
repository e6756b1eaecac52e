use crate::catalog::SegmentDefinition;
use crate::filters::FilterDefaults;
use crate::humanize::HumanDuration;
use crate::store::SiteId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub invalidation: InvalidationConfig,
    #[serde(default)]
    pub sites: SitesConfig,
    #[serde(default)]
    pub segments: Vec<SegmentConfig>,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Archive store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fjall,
    Memory,
}

/// Archive store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(
        default = "default_fjall_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub fjall_path: Option<PathBuf>,
    /// Upper bound on a single store call
    #[serde(default = "default_store_timeout")]
    pub timeout: HumanDuration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            fjall_path: default_fjall_path(),
            timeout: default_store_timeout(),
        }
    }
}

fn default_fjall_path() -> Option<PathBuf> {
    Some(PathBuf::from("data/archive"))
}

fn default_store_timeout() -> HumanDuration {
    HumanDuration::from_secs(2)
}

/// Invalidation defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvalidationConfig {
    /// How long raw logs are kept; absent means forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_retention: Option<HumanDuration>,
    #[serde(default)]
    pub default_cascade: bool,
}

/// Sites known to the in-process registry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SitesConfig {
    #[serde(default)]
    pub ids: Vec<SiteId>,
}

/// A stored segment seeded into the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentConfig {
    pub name: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,
}

impl From<&SegmentConfig> for SegmentDefinition {
    fn from(config: &SegmentConfig) -> Self {
        let segment = SegmentDefinition::new(&config.name, &config.definition);
        match config.site_id {
            Some(site) => segment.for_site(site),
            None => segment,
        }
    }
}

/// Built-in filter settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FiltersConfig {
    #[serde(default = "default_summary_row_label")]
    pub summary_row_label: String,
    #[serde(default = "default_low_population_percentage")]
    pub low_population_percentage: f64,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            summary_row_label: default_summary_row_label(),
            low_population_percentage: default_low_population_percentage(),
        }
    }
}

impl From<&FiltersConfig> for FilterDefaults {
    fn from(config: &FiltersConfig) -> Self {
        FilterDefaults {
            summary_row_label: config.summary_row_label.clone(),
            low_population_percentage: config.low_population_percentage,
        }
    }
}

fn default_summary_row_label() -> String {
    FilterDefaults::default().summary_row_label
}

fn default_low_population_percentage() -> f64 {
    FilterDefaults::default().low_population_percentage
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
