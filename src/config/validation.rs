use super::models::{Config, StoreBackend};
use crate::humanize::HumanDuration;
use crate::store::SiteId;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Store backend is fjall but no fjall_path is configured")]
    MissingFjallPath,

    #[error("Store timeout must be positive")]
    ZeroStoreTimeout,

    #[error("Log retention must be positive when set")]
    ZeroLogRetention,

    #[error("Log retention must be a whole number of days, got {0}")]
    PartialDayLogRetention(HumanDuration),

    #[error("Site id {0} is listed more than once")]
    DuplicateSiteId(SiteId),

    #[error("Segment '{name}' has an empty definition")]
    EmptySegmentDefinition { name: String },

    #[error("low_population_percentage must be within [0, 1], got {0}")]
    InvalidPercentage(f64),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_store(config)?;
    validate_invalidation(config)?;
    validate_sites(config)?;
    validate_segments(config)?;
    validate_filters(config)?;
    Ok(())
}

fn validate_store(config: &Config) -> Result<(), ValidationError> {
    if config.store.backend == StoreBackend::Fjall && config.store.fjall_path.is_none() {
        return Err(ValidationError::MissingFjallPath);
    }
    if config.store.timeout.is_zero() {
        return Err(ValidationError::ZeroStoreTimeout);
    }
    Ok(())
}

fn validate_invalidation(config: &Config) -> Result<(), ValidationError> {
    let Some(retention) = config.invalidation.log_retention else {
        return Ok(());
    };
    if retention.is_zero() {
        return Err(ValidationError::ZeroLogRetention);
    }
    // Raw logs are deleted by the day
    if retention.as_duration().as_millis() % 86_400_000 != 0 {
        return Err(ValidationError::PartialDayLogRetention(retention));
    }
    Ok(())
}

fn validate_sites(config: &Config) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in &config.sites.ids {
        if !seen.insert(*id) {
            return Err(ValidationError::DuplicateSiteId(*id));
        }
    }
    Ok(())
}

fn validate_segments(config: &Config) -> Result<(), ValidationError> {
    if let Some(segment) = config
        .segments
        .iter()
        .find(|s| s.definition.trim().is_empty())
    {
        return Err(ValidationError::EmptySegmentDefinition {
            name: segment.name.clone(),
        });
    }
    Ok(())
}

fn validate_filters(config: &Config) -> Result<(), ValidationError> {
    let pct = config.filters.low_population_percentage;
    if !(0.0..=1.0).contains(&pct) {
        return Err(ValidationError::InvalidPercentage(pct));
    }
    Ok(())
}
