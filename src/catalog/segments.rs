use serde::{Deserialize, Serialize};

use crate::store::SiteId;

/// A stored segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub name: String,
    pub definition: String,
    /// Site the segment belongs to; `None` makes it available everywhere
    #[serde(default)]
    pub site_id: Option<SiteId>,
}

impl SegmentDefinition {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            site_id: None,
        }
    }

    pub fn for_site(mut self, site_id: SiteId) -> Self {
        self.site_id = Some(site_id);
        self
    }

    fn applies_to(&self, site_ids: &[SiteId]) -> bool {
        match self.site_id {
            None => true,
            Some(id) => site_ids.is_empty() || site_ids.contains(&id),
        }
    }

    /// Does `token` name this segment or spell out its definition?
    ///
    /// Definitions are compared both as given and URL-decoded.
    fn matches(&self, token: &str) -> bool {
        if self.name == token || self.definition == token {
            return true;
        }
        let decoded = |s: &str| urlencoding::decode(s).map(|d| d.into_owned()).ok();
        decoded(token).is_some_and(|t| t == self.definition)
            || decoded(&self.definition).is_some_and(|d| d == token)
    }
}

/// Lookup of stored segments
pub trait SegmentCatalog: Send + Sync {
    /// The segment whose name or definition is `token`, visible to at least
    /// one of `site_ids`
    fn find_by_definition_or_name(&self, token: &str, site_ids: &[SiteId])
    -> Option<SegmentDefinition>;
}

/// Segment catalog backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct MemorySegmentCatalog {
    segments: Vec<SegmentDefinition>,
}

impl MemorySegmentCatalog {
    pub fn new(segments: impl IntoIterator<Item = SegmentDefinition>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl SegmentCatalog for MemorySegmentCatalog {
    fn find_by_definition_or_name(
        &self,
        token: &str,
        site_ids: &[SiteId],
    ) -> Option<SegmentDefinition> {
        self.segments
            .iter()
            .find(|s| s.matches(token) && s.applies_to(site_ids))
            .cloned()
    }
}
