use std::collections::BTreeSet;

use crate::store::SiteId;

/// The set of sites archives exist for
pub trait SiteRegistry: Send + Sync {
    fn list_site_ids(&self) -> BTreeSet<SiteId>;

    fn is_valid_site_id(&self, id: SiteId) -> bool {
        self.list_site_ids().contains(&id)
    }
}

/// Site registry backed by a fixed set of ids
#[derive(Debug, Clone, Default)]
pub struct MemorySiteRegistry {
    ids: BTreeSet<SiteId>,
}

impl MemorySiteRegistry {
    pub fn new(ids: impl IntoIterator<Item = SiteId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl SiteRegistry for MemorySiteRegistry {
    fn list_site_ids(&self) -> BTreeSet<SiteId> {
        self.ids.clone()
    }

    fn is_valid_site_id(&self, id: SiteId) -> bool {
        self.ids.contains(&id)
    }
}
