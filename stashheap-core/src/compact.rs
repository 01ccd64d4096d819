use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Error;
use crate::feed;
use crate::heap::{HeapId, StringHeap};
use crate::id::Id;
use crate::store::{Bucket, Store};

/// Compact record of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Id,
    /// Owning stash, for access to its metadata.
    pub stash: Id,
    pub name: HeapId,
    pub type_line: HeapId,
    pub note: HeapId,
    pub corrupted: bool,
    pub identified: bool,
}

/// Compact record of a stash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub id: Id,
    /// Account-wide name, all that is needed to contact the owner.
    pub account_name: String,
}

/// The compact form of one feed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactSnapshot {
    pub stashes: Vec<Stash>,
    pub items: Vec<Item>,
}

/// Turns fat feed records into compact ones.
///
/// Every string field an item carries ends up on the [`StringHeap`]; the
/// compact records only hold heap ids and derived [`Id`]s.
pub struct Compactor<'a, S: Store> {
    store: &'a S,
    heap: StringHeap<'a, S>,
}

impl<'a, S: Store> Compactor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Compactor {
            store,
            heap: StringHeap::new(store),
        }
    }

    pub fn heap(&self) -> &StringHeap<'a, S> {
        &self.heap
    }

    /// Compacts items, taking each item's owner from its `stash_id`.
    pub fn compact_items(&self, items: &[feed::Item]) -> Result<Vec<Item>, Error> {
        let owned: Vec<(&feed::Item, &str)> = items
            .iter()
            .map(|item| (item, item.stash_id.as_str()))
            .collect();
        self.compact_owned(&owned)
    }

    /// Compacts stashes and flattens their items into one sequence.
    ///
    /// Items keep feed order: all of the first stash's items, then the
    /// second's, and so on. All items are interned in a single pass so
    /// duplicate strings are shared across stash boundaries.
    #[instrument(skip_all, fields(stashes = stashes.len()))]
    pub fn compact_stashes(&self, stashes: &[feed::Stash]) -> Result<CompactSnapshot, Error> {
        let mut compact = Vec::with_capacity(stashes.len());
        let mut flat = Vec::new();
        for stash in stashes {
            compact.push(Stash {
                id: Id::derive(&stash.id),
                account_name: stash.account_name.clone(),
            });
            flat.extend(stash.items.iter().map(|item| (item, stash.id.as_str())));
        }

        let items = self
            .compact_owned(&flat)
            .map_err(Error::during("compact stash items"))?;

        Ok(CompactSnapshot {
            stashes: compact,
            items,
        })
    }

    /// Compacts stashes and writes every resulting record in one transaction.
    pub fn store_snapshot(&self, stashes: &[feed::Stash]) -> Result<CompactSnapshot, Error> {
        let snapshot = self.compact_stashes(stashes)?;

        self.store
            .transact(|txn| {
                for stash in &snapshot.stashes {
                    txn.put(Bucket::Stashes, stash.id.as_bytes().as_slice(), encode(stash)?);
                }
                for item in &snapshot.items {
                    txn.put(Bucket::Items, item.id.as_bytes().as_slice(), encode(item)?);
                }
                Ok(())
            })
            .map_err(Error::during("store compact records"))?;

        debug!(
            stashes = snapshot.stashes.len(),
            items = snapshot.items.len(),
            "stored compact snapshot"
        );
        Ok(snapshot)
    }

    pub fn load_stash(&self, id: &Id) -> Result<Option<Stash>, Error> {
        self.load(Bucket::Stashes, id)
    }

    pub fn load_item(&self, id: &Id) -> Result<Option<Item>, Error> {
        self.load(Bucket::Items, id)
    }

    fn compact_owned(&self, items: &[(&feed::Item, &str)]) -> Result<Vec<Item>, Error> {
        let mut names = Vec::with_capacity(items.len());
        let mut type_lines = Vec::with_capacity(items.len());
        let mut notes = Vec::with_capacity(items.len());
        for (item, _) in items {
            names.push(item.name.as_str());
            type_lines.push(item.type_line.as_str());
            notes.push(item.note.as_str());
        }

        let name_ids = self
            .heap
            .intern_many(&names)
            .map_err(Error::during("add names to string heap"))?;
        let type_line_ids = self
            .heap
            .intern_many(&type_lines)
            .map_err(Error::during("add type lines to string heap"))?;
        let note_ids = self
            .heap
            .intern_many(&notes)
            .map_err(Error::during("add notes to string heap"))?;

        let compact = items
            .iter()
            .enumerate()
            .map(|(i, (item, stash_id))| Item {
                id: Id::derive(&item.id),
                stash: Id::derive(stash_id),
                name: name_ids[i],
                type_line: type_line_ids[i],
                note: note_ids[i],
                corrupted: item.corrupted,
                identified: item.identified,
            })
            .collect();
        Ok(compact)
    }

    fn load<T>(&self, bucket: Bucket, id: &Id) -> Result<Option<T>, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(bytes) = self
            .store
            .get(bucket, id.as_bytes())
            .map_err(Error::storage)?
        else {
            return Ok(None);
        };
        ciborium::from_reader(bytes.as_slice())
            .map(Some)
            .map_err(|e| Error::corrupt(bucket, e.to_string()))
    }
}

/// CBOR encoding of a compact record.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn fat_item(id: &str, name: &str, type_line: &str, note: &str) -> feed::Item {
        feed::Item {
            id: id.to_string(),
            name: name.to_string(),
            type_line: type_line.to_string(),
            note: note.to_string(),
            ..Default::default()
        }
    }

    fn fat_stash(id: &str, account: &str, items: Vec<feed::Item>) -> feed::Stash {
        feed::Stash {
            id: id.to_string(),
            account_name: account.to_string(),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn fields_map_to_their_own_strings() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        let mut item = fat_item("item-1", "Sword of Foo", "One Handed Sword", "nice item");
        item.stash_id = "stash-1".to_string();
        item.corrupted = true;

        let compact = compactor.compact_items(&[item]).unwrap();
        let heap = compactor.heap();

        assert_eq!(compact.len(), 1);
        assert_eq!(heap.resolve(compact[0].name).unwrap(), "Sword of Foo");
        assert_eq!(heap.resolve(compact[0].type_line).unwrap(), "One Handed Sword");
        assert_eq!(heap.resolve(compact[0].note).unwrap(), "nice item");
        assert_eq!(compact[0].id, Id::derive("item-1"));
        assert_eq!(compact[0].stash, Id::derive("stash-1"));
        assert!(compact[0].corrupted);
        assert!(!compact[0].identified);
    }

    #[test]
    fn empty_inputs() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        assert!(compactor.compact_items(&[]).unwrap().is_empty());
        let snapshot = compactor.compact_stashes(&[]).unwrap();
        assert_eq!(snapshot, CompactSnapshot::default());
        assert_eq!(compactor.heap().count().unwrap(), 0);
    }

    #[test]
    fn flattening_preserves_order_and_owner() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        let stashes = vec![
            fat_stash(
                "s1",
                "alice",
                vec![fat_item("A", "a", "t", ""), fat_item("B", "b", "t", "")],
            ),
            fat_stash("s2", "bob", vec![fat_item("C", "c", "t", "")]),
        ];

        let snapshot = compactor.compact_stashes(&stashes).unwrap();

        assert_eq!(snapshot.stashes.len(), 2);
        assert_eq!(snapshot.stashes[0].id, Id::derive("s1"));
        assert_eq!(snapshot.stashes[0].account_name, "alice");
        assert_eq!(snapshot.stashes[1].account_name, "bob");

        let ids: Vec<Id> = snapshot.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![Id::derive("A"), Id::derive("B"), Id::derive("C")]);
        assert_eq!(snapshot.items[0].stash, Id::derive("s1"));
        assert_eq!(snapshot.items[1].stash, Id::derive("s1"));
        assert_eq!(snapshot.items[2].stash, Id::derive("s2"));
    }

    #[test]
    fn stash_owner_wins_over_item_field() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        let mut item = fat_item("A", "a", "t", "");
        item.stash_id = "stale".to_string();
        let snapshot = compactor
            .compact_stashes(&[fat_stash("s1", "alice", vec![item])])
            .unwrap();

        assert_eq!(snapshot.items[0].stash, Id::derive("s1"));
    }

    #[test]
    fn duplicate_names_across_stashes_share_one_id() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        let stashes = vec![
            fat_stash("s1", "alice", vec![fat_item("A", "Doomfletch", "Royal Bow", "")]),
            fat_stash("s2", "bob", vec![fat_item("B", "Doomfletch", "Royal Bow", "")]),
        ];

        let snapshot = compactor.compact_stashes(&stashes).unwrap();

        assert_eq!(snapshot.items[0].name, snapshot.items[1].name);
        // "Doomfletch", "Royal Bow", ""
        assert_eq!(compactor.heap().count().unwrap(), 3);
    }

    #[test]
    fn store_and_load_snapshot() {
        let store = MemoryStore::new();
        let compactor = Compactor::new(&store);

        let stashes = vec![fat_stash(
            "s1",
            "alice",
            vec![fat_item("A", "a", "t", "~b/o 1 chaos")],
        )];
        let snapshot = compactor.store_snapshot(&stashes).unwrap();

        assert_eq!(store.len(Bucket::Stashes), 1);
        assert_eq!(store.len(Bucket::Items), 1);

        let stash = compactor.load_stash(&Id::derive("s1")).unwrap().unwrap();
        assert_eq!(stash, snapshot.stashes[0]);
        let item = compactor.load_item(&Id::derive("A")).unwrap().unwrap();
        assert_eq!(item, snapshot.items[0]);

        assert_eq!(compactor.load_item(&Id::derive("missing")).unwrap(), None);
    }

    /// Seeds the heap with an undecodable id for `s`.
    fn corrupt_heap_entry(store: &MemoryStore, s: &str) {
        let mut batch = crate::store::Batch::new();
        batch.put(Bucket::HeapForward, s.as_bytes(), vec![1, 2]);
        store.apply(batch).unwrap();
    }

    #[test]
    fn compact_stashes_propagates_interning_failure() {
        let store = MemoryStore::new();
        corrupt_heap_entry(&store, "bad");
        let compactor = Compactor::new(&store);

        let stashes = vec![fat_stash("s1", "alice", vec![fat_item("A", "a", "bad", "")])];
        let err = compactor.compact_stashes(&stashes).unwrap_err();

        let Error::Compaction { step, source } = err else {
            panic!("expected compaction error, got {err:?}");
        };
        assert_eq!(step, "compact stash items");
        assert!(matches!(
            *source,
            Error::Compaction { step: "add type lines to string heap", .. }
        ));
        assert!(!source.is_not_found());
    }

    #[test]
    fn compact_items_propagates_interning_failure() {
        let store = MemoryStore::new();
        corrupt_heap_entry(&store, "bad");
        let compactor = Compactor::new(&store);

        let err = compactor
            .compact_items(&[fat_item("A", "a", "t", "bad")])
            .unwrap_err();

        assert!(matches!(err, Error::Compaction { step: "add notes to string heap", .. }));
    }

    #[test]
    fn failed_store_snapshot_writes_no_records() {
        let store = MemoryStore::new();
        corrupt_heap_entry(&store, "bad");
        let compactor = Compactor::new(&store);

        let stashes = vec![
            fat_stash("s1", "alice", vec![fat_item("A", "a", "t", "")]),
            fat_stash("s2", "bob", vec![fat_item("B", "bad", "t", "")]),
        ];
        let err = compactor.store_snapshot(&stashes).unwrap_err();

        assert!(matches!(err, Error::Compaction { step: "compact stash items", .. }));
        assert_eq!(store.len(Bucket::Items), 0);
        assert_eq!(store.len(Bucket::Stashes), 0);
        assert_eq!(compactor.load_item(&Id::derive("A")).unwrap(), None);
    }

    #[test]
    fn undecodable_record_is_corrupt() {
        let store = MemoryStore::new();
        let mut batch = crate::store::Batch::new();
        batch.put(Bucket::Items, Id::derive("A").as_bytes().to_vec(), vec![0xff, 0x00]);
        store.apply(batch).unwrap();

        let err = Compactor::new(&store).load_item(&Id::derive("A")).unwrap_err();
        assert!(matches!(err, Error::Corrupt { bucket: Bucket::Items, .. }));
    }
}
