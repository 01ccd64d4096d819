//! RocksDB-backed store for Stashheap.
//!
//! Each [`Bucket`] lives in its own column family named after the bucket.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rocksdb::{ColumnFamily, DB, Options, WriteBatch};
use stashheap_core::{Batch, Bucket, Store};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RocksError {
    #[error("RocksDB error: {0}")]
    Rocks(#[from] rocksdb::Error),
    #[error("column family {0} is missing")]
    MissingColumnFamily(&'static str),
}

/// A persistent store backed by RocksDB.
pub struct RocksStore {
    db: DB,
    writer: Mutex<()>,
}

impl RocksStore {
    /// Opens a RocksDB store at the given path.
    ///
    /// Creates the database and any missing column families.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let path = path.as_ref();
        tracing::info!("Opening store at {}", path.display());

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let db = DB::open_cf(&opts, path, Bucket::ALL.iter().map(|b| b.name()))?;
        Ok(Self {
            db,
            writer: Mutex::new(()),
        })
    }

    fn cf(&self, bucket: Bucket) -> Result<&ColumnFamily, RocksError> {
        self.db
            .cf_handle(bucket.name())
            .ok_or(RocksError::MissingColumnFamily(bucket.name()))
    }
}

impl Store for RocksStore {
    type Error = RocksError;
    type Writer<'a> = MutexGuard<'a, ()>;

    fn get(&self, bucket: Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.db.get_cf(self.cf(bucket)?, key)?)
    }

    fn has(&self, bucket: Bucket, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.db.get_pinned_cf(self.cf(bucket)?, key)?.is_some())
    }

    fn apply(&self, batch: Batch) -> Result<(), Self::Error> {
        let mut write = WriteBatch::default();
        for (bucket, key, value) in batch.iter() {
            write.put_cf(self.cf(bucket)?, key, value);
        }
        self.db.write(write)?;
        Ok(())
    }

    fn writer(&self) -> Self::Writer<'_> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
