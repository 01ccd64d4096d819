use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Error;
use crate::feed::Feed;
use crate::intern::InternTable;
use crate::store::{Bucket, Store};

/// Sequential identifier of a property name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(u32);

impl PropertyId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const TABLE: InternTable = InternTable {
    forward: Bucket::PropertiesForward,
    reverse: None,
    counter: Bucket::PropertiesCounter,
};

/// Catalog of every property name seen in the feed.
///
/// Kept apart from the [`StringHeap`](crate::StringHeap) so the small,
/// slow-growing property vocabulary gets its own dense id range.
pub struct PropertyRegistry<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> PropertyRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        PropertyRegistry { store }
    }

    /// Adds names not yet in the catalog.
    #[instrument(skip_all, fields(names = names.len()))]
    pub fn add_names<T: AsRef<str>>(&self, names: &[T]) -> Result<(), Error> {
        TABLE.intern_many(self.store, names)?;
        Ok(())
    }

    /// Catalogs the property names of every item in a feed snapshot.
    pub fn add_names_from_feed(&self, feed: &Feed) -> Result<(), Error> {
        let names: Vec<&str> = feed.property_names().collect();
        debug!(
            stashes = feed.stashes.len(),
            names = names.len(),
            "cataloguing feed properties"
        );
        self.add_names(&names)
    }

    pub fn lookup(&self, name: &str) -> Result<PropertyId, Error> {
        TABLE
            .lookup(self.store, name)?
            .map(PropertyId)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }

    /// Number of distinct property names catalogued.
    pub fn count(&self) -> Result<u32, Error> {
        TABLE.count(self.store)
    }
}
