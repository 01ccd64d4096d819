use stashheap_core::{
    Compactor, Feed, HeapId, PropertyId, PropertyRegistry, Store, StringHeap, encode,
};
use tracing::info;

use crate::error::ToolError;

/// Outcome of a compaction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactReport {
    pub stashes: usize,
    pub items: usize,
    /// Encoded size of all compact items.
    pub item_bytes: usize,
    pub heap_strings: u32,
}

/// Catalogs the feed's property names, returning the catalog size.
pub fn add_names<S: Store>(store: &S, feed: &Feed) -> Result<u32, ToolError> {
    let registry = PropertyRegistry::new(store);
    registry.add_names_from_feed(feed)?;
    Ok(registry.count()?)
}

pub fn lookup_property<S: Store>(store: &S, name: &str) -> Result<PropertyId, ToolError> {
    Ok(PropertyRegistry::new(store).lookup(name)?)
}

pub fn resolve<S: Store>(store: &S, id: u32) -> Result<String, ToolError> {
    Ok(StringHeap::new(store).resolve(HeapId::new(id))?)
}

/// Compacts the feed. With `persist`, compact records are also written to
/// the store; strings are interned either way.
pub fn try_compact<S: Store>(store: &S, feed: &Feed, persist: bool) -> Result<CompactReport, ToolError> {
    let compactor = Compactor::new(store);
    let snapshot = if persist {
        compactor.store_snapshot(&feed.stashes)?
    } else {
        compactor.compact_stashes(&feed.stashes)?
    };

    let mut item_bytes = 0;
    for item in &snapshot.items {
        item_bytes += encode(item)?.len();
    }

    let report = CompactReport {
        stashes: snapshot.stashes.len(),
        items: snapshot.items.len(),
        item_bytes,
        heap_strings: compactor.heap().count()?,
    };
    info!(?report, "compaction finished");
    Ok(report)
}
