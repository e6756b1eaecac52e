use std::collections::BTreeMap;
use std::sync::Arc;

use super::add_segment_value::AddSegmentValue;
use super::column_delete::ColumnDelete;
use super::exclude_low_population::ExcludeLowPopulation;
use super::limit::Limit;
use super::pattern::Pattern;
use super::replace_column_names::ReplaceColumnNames;
use super::replace_summary_row_label::ReplaceSummaryRowLabel;
use super::sort::Sort;
use super::traits::{Filter, FilterError};
use super::truncate::Truncate;

/// Defaults the built-in filters fall back to when an argument is omitted
#[derive(Clone, Debug, PartialEq)]
pub struct FilterDefaults {
    pub summary_row_label: String,
    pub low_population_percentage: f64,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            summary_row_label: "Others".to_string(),
            low_population_percentage: 0.02,
        }
    }
}

/// Registry mapping filter names to filter instances
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Filter>, FilterError> {
        self.filters
            .get(name)
            .cloned()
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Registry with every built-in filter and stock defaults
    pub fn with_defaults() -> Self {
        Self::with_settings(&FilterDefaults::default())
    }

    pub fn with_settings(defaults: &FilterDefaults) -> Self {
        let mut registry = Self::new();
        registry.register(
            Truncate::NAME,
            Arc::new(Truncate::new(defaults.summary_row_label.clone())),
        );
        registry.register(
            ExcludeLowPopulation::NAME,
            Arc::new(ExcludeLowPopulation::new(defaults.low_population_percentage)),
        );
        registry.register(AddSegmentValue::NAME, Arc::new(AddSegmentValue));
        registry.register(
            ReplaceSummaryRowLabel::NAME,
            Arc::new(ReplaceSummaryRowLabel::new(defaults.summary_row_label.clone())),
        );
        registry.register(Sort::NAME, Arc::new(Sort));
        registry.register(Limit::NAME, Arc::new(Limit));
        registry.register(ColumnDelete::NAME, Arc::new(ColumnDelete));
        registry.register(Pattern::NAME, Arc::new(Pattern));
        registry.register(ReplaceColumnNames::NAME, Arc::new(ReplaceColumnNames));
        registry
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.filters.keys()).finish()
    }
}
