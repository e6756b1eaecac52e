//! Collaborators the invalidator consults: which sites exist and which
//! segments are stored.

mod segments;
mod sites;

pub use segments::{MemorySegmentCatalog, SegmentCatalog, SegmentDefinition};
pub use sites::{MemorySiteRegistry, SiteRegistry};
