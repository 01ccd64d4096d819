use std::collections::HashMap;

use tracing::debug;

use crate::error::Error;
use crate::store::{Bucket, Store, Transaction};

/// Key of the singleton entry in a counter bucket.
const COUNTER_KEY: &[u8] = b"next";

/// Append-only string → dense `u32` table over three buckets.
///
/// Ids are handed out sequentially from zero, so the counter always equals
/// the number of distinct strings in the table. Allocation happens inside
/// the store's writer section: the lookup, the forward/reverse puts and the
/// counter bump for a batch commit together or not at all.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InternTable {
    pub(crate) forward: Bucket,
    pub(crate) reverse: Option<Bucket>,
    pub(crate) counter: Bucket,
}

impl InternTable {
    pub(crate) fn intern_many<S, T>(&self, store: &S, strings: &[T]) -> Result<Vec<u32>, Error>
    where
        S: Store,
        T: AsRef<str>,
    {
        if strings.is_empty() {
            return Ok(Vec::new());
        }

        store.transact(|txn| {
            let first = self.read_counter(txn)?;
            let mut next = first;
            let mut seen: HashMap<&str, u32> = HashMap::new();
            let mut ids = Vec::with_capacity(strings.len());

            for s in strings {
                let s = s.as_ref();
                if let Some(&id) = seen.get(s) {
                    ids.push(id);
                    continue;
                }

                let id = match txn.get(self.forward, s.as_bytes())? {
                    Some(bytes) => decode_id(self.forward, &bytes)?,
                    None => {
                        let id = next;
                        next = next
                            .checked_add(1)
                            .ok_or(Error::IdSpaceExhausted(self.forward))?;
                        txn.put(self.forward, s.as_bytes(), id.to_be_bytes());
                        if let Some(reverse) = self.reverse {
                            txn.put(reverse, id.to_be_bytes(), s.as_bytes());
                        }
                        id
                    }
                };
                seen.insert(s, id);
                ids.push(id);
            }

            if next != first {
                txn.put(self.counter, COUNTER_KEY, next.to_be_bytes());
            }
            debug!(
                table = %self.forward,
                strings = strings.len(),
                distinct = seen.len(),
                added = next - first,
                "interned batch"
            );
            Ok(ids)
        })
    }

    pub(crate) fn lookup<S: Store>(&self, store: &S, s: &str) -> Result<Option<u32>, Error> {
        store
            .get(self.forward, s.as_bytes())
            .map_err(Error::storage)?
            .map(|bytes| decode_id(self.forward, &bytes))
            .transpose()
    }

    /// Reverse lookup; `None` for tables without a reverse bucket.
    pub(crate) fn reverse_lookup<S: Store>(&self, store: &S, id: u32) -> Result<Option<String>, Error> {
        let Some(reverse) = self.reverse else {
            return Ok(None);
        };
        let Some(bytes) = store
            .get(reverse, &id.to_be_bytes())
            .map_err(Error::storage)?
        else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::corrupt(reverse, e.to_string()))
    }

    pub(crate) fn count<S: Store>(&self, store: &S) -> Result<u32, Error> {
        store
            .get(self.counter, COUNTER_KEY)
            .map_err(Error::storage)?
            .map_or(Ok(0), |bytes| decode_id(self.counter, &bytes))
    }

    fn read_counter<S: Store>(&self, txn: &Transaction<'_, S>) -> Result<u32, Error> {
        txn.get(self.counter, COUNTER_KEY)?
            .map_or(Ok(0), |bytes| decode_id(self.counter, &bytes))
    }
}

fn decode_id(bucket: Bucket, bytes: &[u8]) -> Result<u32, Error> {
    let bytes: [u8; 4] = bytes
        .try_into()
        .map_err(|_| Error::corrupt(bucket, format!("expected 4-byte id, got {} bytes", bytes.len())))?;
    Ok(u32::from_be_bytes(bytes))
}
