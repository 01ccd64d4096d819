use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::Error;

/// A namespace within the key-value store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// String bytes → heap id.
    HeapForward,
    /// Heap id → string bytes.
    HeapReverse,
    /// Next unassigned heap id.
    HeapCounter,
    /// Property name → property id.
    PropertiesForward,
    /// Next unassigned property id.
    PropertiesCounter,
    /// Stash id → compact stash record.
    Stashes,
    /// Item id → compact item record.
    Items,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Bucket::HeapForward,
        Bucket::HeapReverse,
        Bucket::HeapCounter,
        Bucket::PropertiesForward,
        Bucket::PropertiesCounter,
        Bucket::Stashes,
        Bucket::Items,
    ];

    /// The persistent name of the namespace.
    pub fn name(self) -> &'static str {
        match self {
            Bucket::HeapForward => "stringheap:forward",
            Bucket::HeapReverse => "stringheap:reverse",
            Bucket::HeapCounter => "stringheap:counter",
            Bucket::PropertiesForward => "properties:forward",
            Bucket::PropertiesCounter => "properties:counter",
            Bucket::Stashes => "stashes",
            Bucket::Items => "items",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of puts applied to a store as one unit.
#[derive(Debug, Default)]
pub struct Batch {
    puts: Vec<(Bucket, Vec<u8>, Vec<u8>)>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bucket: Bucket, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.puts.push((bucket, key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[u8], &[u8])> {
        self.puts
            .iter()
            .map(|(bucket, key, value)| (*bucket, key.as_slice(), value.as_slice()))
    }
}

/// A bucketed key-value store.
///
/// Stores operate on raw bytes. Encoding of ids, counters and records is
/// handled by the heap, registry and compactor layers.
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait Store: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Held for the duration of a writer section.
    type Writer<'a>
    where
        Self: 'a;

    /// Retrieves the bytes stored under `key` in `bucket`, or None if not present.
    fn get(&self, bucket: Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Checks whether a key exists in a bucket.
    fn has(&self, bucket: Bucket, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.get(bucket, key)?.is_some())
    }

    /// Applies every put in the batch atomically: readers observe either
    /// none or all of them.
    fn apply(&self, batch: Batch) -> Result<(), Self::Error>;

    /// Acquires the store's writer section.
    ///
    /// At most one guard is alive per store at a time.
    fn writer(&self) -> Self::Writer<'_>;

    /// Runs `f` inside the writer section and applies its staged writes if
    /// it succeeds.
    ///
    /// Reads inside the transaction observe the transaction's own staged
    /// writes. If `f` fails nothing is written.
    fn transact<T, F>(&self, f: F) -> Result<T, Error>
    where
        Self: Sized,
        F: FnOnce(&mut Transaction<'_, Self>) -> Result<T, Error>,
    {
        let _writer = self.writer();
        let mut txn = Transaction::new(self);
        let out = f(&mut txn)?;
        let batch = txn.into_batch();
        if !batch.is_empty() {
            self.apply(batch).map_err(Error::storage)?;
        }
        Ok(out)
    }
}

/// Staged writes over a store, created by [`Store::transact`].
pub struct Transaction<'a, S: Store> {
    store: &'a S,
    staged: HashMap<Bucket, HashMap<Vec<u8>, Vec<u8>>>,
}

impl<'a, S: Store> Transaction<'a, S> {
    fn new(store: &'a S) -> Self {
        Transaction {
            store,
            staged: HashMap::new(),
        }
    }

    pub fn get(&self, bucket: Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if let Some(value) = self.staged.get(&bucket).and_then(|b| b.get(key)) {
            return Ok(Some(value.clone()));
        }
        self.store.get(bucket, key).map_err(Error::storage)
    }

    pub fn put(&mut self, bucket: Bucket, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.staged
            .entry(bucket)
            .or_default()
            .insert(key.into(), value.into());
    }

    fn into_batch(self) -> Batch {
        let mut batch = Batch::new();
        for (bucket, entries) in self.staged {
            for (key, value) in entries {
                batch.put(bucket, key, value);
            }
        }
        batch
    }
}

/// An in-memory store backed by a HashMap per bucket.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<Bucket, HashMap<Vec<u8>, Vec<u8>>>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in a bucket.
    pub fn len(&self, bucket: Bucket) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&bucket)
            .map_or(0, HashMap::len)
    }
}

impl Store for MemoryStore {
    type Error = Infallible;
    type Writer<'a> = MutexGuard<'a, ()>;

    fn get(&self, bucket: Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(&bucket).and_then(|b| b.get(key)).cloned())
    }

    fn apply(&self, batch: Batch) -> Result<(), Self::Error> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        for (bucket, key, value) in batch.puts {
            data.entry(bucket).or_default().insert(key, value);
        }
        Ok(())
    }

    fn writer(&self) -> Self::Writer<'_> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
