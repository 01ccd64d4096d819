//! Stashheap stores a stash tab feed in compact, deduplicated form.
//!
//! Core concepts:
//! - **Id**: A 96-bit identifier derived by hashing a feed-native unique string
//! - **Store**: A bucketed key-value store with a serialized writer section
//! - **StringHeap**: Append-only interning of strings to small [`HeapId`]s
//! - **PropertyRegistry**: A dense catalog of property names seen in the feed
//! - **Compactor**: Converts fat feed records into compact, id-referencing ones
//!
//! # Example
//!
//! ```
//! use stashheap_core::{feed, Compactor, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let compactor = Compactor::new(&store);
//!
//! let stash = feed::Stash {
//!     id: "stash-1".to_string(),
//!     account_name: "someone".to_string(),
//!     items: vec![feed::Item {
//!         id: "item-1".to_string(),
//!         name: "Sword of Foo".to_string(),
//!         type_line: "One Handed Sword".to_string(),
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let snapshot = compactor.compact_stashes(&[stash]).unwrap();
//! let name = compactor.heap().resolve(snapshot.items[0].name).unwrap();
//! assert_eq!(name, "Sword of Foo");
//! ```

mod compact;
mod error;
pub mod feed;
mod heap;
mod id;
mod intern;
mod property;
mod store;

pub use compact::{CompactSnapshot, Compactor, Item, Stash, encode};
pub use error::Error;
pub use feed::Feed;
pub use heap::{HeapId, StringHeap};
pub use id::{ID_SIZE, Id};
pub use property::{PropertyId, PropertyRegistry};
pub use store::{Batch, Bucket, MemoryStore, Store, Transaction};
