use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Error;
use crate::intern::InternTable;
use crate::store::{Bucket, Store};

/// Identifier of a string on the [`StringHeap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeapId(u32);

impl HeapId {
    pub fn new(raw: u32) -> Self {
        HeapId(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const TABLE: InternTable = InternTable {
    forward: Bucket::HeapForward,
    reverse: Some(Bucket::HeapReverse),
    counter: Bucket::HeapCounter,
};

/// Deduplicating, append-only string storage.
///
/// Each distinct string is stored once and referenced by a [`HeapId`].
/// The forward (string → id) and reverse (id → string) mappings are always
/// written in the same transaction, and ids are never reassigned.
pub struct StringHeap<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> StringHeap<'a, S> {
    pub fn new(store: &'a S) -> Self {
        StringHeap { store }
    }

    /// Interns every string, returning ids in input order.
    ///
    /// Strings already on the heap keep their id. Duplicates within the
    /// batch resolve to the same id.
    #[instrument(skip_all, fields(strings = strings.len()))]
    pub fn intern_many<T: AsRef<str>>(&self, strings: &[T]) -> Result<Vec<HeapId>, Error> {
        let ids = TABLE.intern_many(self.store, strings)?;
        Ok(ids.into_iter().map(HeapId).collect())
    }

    /// Interns a single string.
    pub fn intern(&self, s: &str) -> Result<HeapId, Error> {
        let ids = self.intern_many(&[s])?;
        Ok(ids[0])
    }

    /// Returns the id of a string without inserting it.
    pub fn get(&self, s: &str) -> Result<Option<HeapId>, Error> {
        Ok(TABLE.lookup(self.store, s)?.map(HeapId))
    }

    /// Returns the string an id was assigned to.
    pub fn resolve(&self, id: HeapId) -> Result<String, Error> {
        TABLE
            .reverse_lookup(self.store, id.0)?
            .ok_or(Error::HeapIdNotFound(id))
    }

    pub fn resolve_many(&self, ids: &[HeapId]) -> Result<Vec<String>, Error> {
        ids.iter().map(|&id| self.resolve(id)).collect()
    }

    /// Number of distinct strings on the heap.
    pub fn count(&self) -> Result<u32, Error> {
        TABLE.count(self.store)
    }
}
