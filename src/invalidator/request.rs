use bon::Builder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::error::{InvalidationError, Result};
use super::plan;
use crate::catalog::{SegmentCatalog, SiteRegistry};
use crate::period::{DateRange, Period, PeriodKind};
use crate::store::SiteId;

/// Which sites a request covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteSelection {
    /// Every site the registry knows
    All,
    Ids(Vec<SiteId>),
}

impl FromStr for SiteSelection {
    type Err = InvalidationError;

    /// `all` or a comma-separated list of ids
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SiteSelection::All);
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<SiteId>().map_err(|_| {
                    InvalidationError::invalid("sites", format!("'{}' is not a site id", part))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(SiteSelection::Ids)
    }
}

impl From<Vec<SiteId>> for SiteSelection {
    fn from(ids: Vec<SiteId>) -> Self {
        SiteSelection::Ids(ids)
    }
}

impl fmt::Display for SiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteSelection::All => f.write_str("all"),
            SiteSelection::Ids(ids) => {
                let ids: Vec<String> = ids.iter().map(SiteId::to_string).collect();
                f.write_str(&ids.join(","))
            }
        }
    }
}

/// An invalidation request as a caller states it.
///
/// Fields hold raw user input; nothing is checked until the invalidator
/// resolves the request.
///
/// ```rust,ignore
/// let request = InvalidationRequest::builder()
///     .sites(SiteSelection::Ids(vec![1, 2]))
///     .dates(vec!["2024-03-01".into()])
///     .periods(vec!["all".into()])
///     .build();
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct InvalidationRequest {
    #[builder(into)]
    pub sites: SiteSelection,
    /// Date or date range specifications
    #[builder(default)]
    pub dates: Vec<String>,
    /// Period kinds or `all`; empty means `all`
    #[builder(default)]
    pub periods: Vec<String>,
    /// Segment names or definitions; empty means "no segment"
    #[builder(default)]
    pub segments: Vec<String>,
    #[builder(default)]
    pub cascade: bool,
    #[builder(default)]
    pub dry_run: bool,
    /// `Plugin` or `Plugin.report`
    #[builder(into)]
    pub plugin: Option<String>,
    #[builder(default)]
    pub ignore_log_deletion_limit: bool,
}

/// A request after validation, ready to expand
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRequest {
    pub sites: Vec<SiteId>,
    /// Calendar kinds, in hierarchy order
    pub kinds: Vec<PeriodKind>,
    pub include_ranges: bool,
    pub dates: Vec<DateRange>,
    pub segments: Vec<Option<String>>,
    pub plugin: Option<String>,
    pub cascade: bool,
    pub dry_run: bool,
    pub ignore_log_deletion_limit: bool,
    pub warnings: Vec<String>,
}

impl InvalidationRequest {
    pub(crate) fn resolve(
        &self,
        sites: &dyn SiteRegistry,
        segments: &dyn SegmentCatalog,
        today: NaiveDate,
    ) -> Result<ResolvedRequest> {
        let site_ids = resolve_sites(&self.sites, sites)?;
        let (kinds, include_ranges) = resolve_periods(&self.periods)?;
        let dates = resolve_dates(&self.dates, today)?;
        check_calendar(&dates, &kinds, self.cascade)?;
        let plugin = resolve_plugin(self.plugin.as_deref())?;

        let mut warnings = Vec::new();
        let segments = resolve_segments(&self.segments, segments, &site_ids, &mut warnings)?;

        Ok(ResolvedRequest {
            sites: site_ids,
            kinds,
            include_ranges,
            dates,
            segments,
            plugin,
            cascade: self.cascade,
            dry_run: self.dry_run,
            ignore_log_deletion_limit: self.ignore_log_deletion_limit,
            warnings,
        })
    }
}

fn resolve_sites(selection: &SiteSelection, registry: &dyn SiteRegistry) -> Result<Vec<SiteId>> {
    let ids: BTreeSet<SiteId> = match selection {
        SiteSelection::All => registry.list_site_ids(),
        SiteSelection::Ids(ids) => {
            if let Some(unknown) = ids.iter().find(|id| !registry.is_valid_site_id(**id)) {
                return Err(InvalidationError::invalid(
                    "sites",
                    format!("unknown site id {}", unknown),
                ));
            }
            ids.iter().copied().collect()
        }
    };
    if ids.is_empty() {
        return Err(InvalidationError::invalid("sites", "at least one site is required"));
    }
    Ok(ids.into_iter().collect())
}

fn resolve_periods(periods: &[String]) -> Result<(Vec<PeriodKind>, bool)> {
    let mut kinds = BTreeSet::new();
    let mut include_ranges = false;

    let requested: Vec<&str> = if periods.is_empty() {
        vec!["all"]
    } else {
        periods.iter().map(|p| p.trim()).collect()
    };

    for token in requested {
        if token.eq_ignore_ascii_case("all") {
            kinds.extend(PeriodKind::CALENDAR);
            continue;
        }
        match token.to_ascii_lowercase().parse::<PeriodKind>() {
            Ok(PeriodKind::Range) => include_ranges = true,
            Ok(kind) => {
                kinds.insert(kind);
            }
            Err(e) => return Err(InvalidationError::invalid("periods", e.to_string())),
        }
    }
    Ok((kinds.into_iter().collect(), include_ranges))
}

fn resolve_dates(dates: &[String], today: NaiveDate) -> Result<Vec<DateRange>> {
    if dates.is_empty() {
        return Err(InvalidationError::invalid("dates", "at least one date is required"));
    }
    let mut ranges = Vec::with_capacity(dates.len());
    for spec in dates {
        let range = DateRange::parse(spec, today)
            .map_err(|e| InvalidationError::invalid("dates", e.to_string()))?;
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }
    Ok(ranges)
}

/// Periods at the edges of each date range, and everything a cascade
/// reaches from them, must fit the supported calendar
fn check_calendar(dates: &[DateRange], kinds: &[PeriodKind], cascade: bool) -> Result<()> {
    let invalid = |e: crate::period::PeriodError| InvalidationError::invalid("dates", e.to_string());
    for range in dates {
        for kind in kinds {
            for edge in [range.start, range.end] {
                let period = Period::new(*kind, edge).map_err(invalid)?;
                if cascade {
                    plan::descendants(&period).map_err(invalid)?;
                }
            }
        }
    }
    Ok(())
}

/// `Plugin` or `Plugin.report`: identifiers starting with a letter
fn is_plugin_name(name: &str) -> bool {
    let is_ident = |part: &str| {
        part.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match name.split_once('.') {
        None => is_ident(name),
        Some((plugin, report)) => is_ident(plugin) && is_ident(report),
    }
}

fn resolve_plugin(plugin: Option<&str>) -> Result<Option<String>> {
    match plugin.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) if is_plugin_name(name) => Ok(Some(name.to_string())),
        Some(name) => Err(InvalidationError::invalid(
            "plugin",
            format!("'{}' is not of the form Plugin or Plugin.report", name),
        )),
    }
}

fn resolve_segments(
    tokens: &[String],
    catalog: &dyn SegmentCatalog,
    site_ids: &[SiteId],
    warnings: &mut Vec<String>,
) -> Result<Vec<Option<String>>> {
    if tokens.is_empty() {
        return Ok(vec![None]);
    }

    let mut resolved = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            return Err(InvalidationError::invalid("segment", "segment must not be empty"));
        }
        let definition = match catalog.find_by_definition_or_name(token, site_ids) {
            Some(stored) => stored.definition,
            None => {
                let message = format!(
                    "Segment '{}' is not a stored segment; invalidating it as a raw definition.",
                    token
                );
                warn!(segment = token, "Segment not found in catalog, using raw definition");
                warnings.push(message);
                token.to_string()
            }
        };
        if !resolved.contains(&Some(definition.clone())) {
            resolved.push(Some(definition));
        }
    }
    Ok(resolved)
}
