use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width in bytes of a derived [`Id`].
pub const ID_SIZE: usize = 12;

/// A 96-bit identifier derived from a feed-native unique string.
///
/// The id is the leading 12 bytes of the Blake3 hash of the source string.
/// 96 bits keeps the birthday bound around 2^48 records, far above what a
/// single stash feed produces, while being a fraction of the size of the
/// feed's own hex identifiers.
///
/// Ids are serialized as CBOR byte strings (major type 2), not as arrays.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id([u8; ID_SIZE]);

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = Id;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("12-byte id")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Id::from_slice(v).ok_or_else(|| E::invalid_length(v.len(), &"12 bytes"))
            }
        }

        deserializer.deserialize_bytes(IdVisitor)
    }
}

impl Id {
    /// Derives the id for a feed-native unique string.
    ///
    /// Pure and total: every string, including the empty one, has an id.
    pub fn derive(uid: &str) -> Self {
        let hash = blake3::hash(uid.as_bytes());
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&hash.as_bytes()[..ID_SIZE]);
        Id(id)
    }

    /// Creates an id from raw bytes (e.g., a storage key).
    pub fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Id(bytes)
    }

    /// Creates an id from a slice, or `None` if it is not exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ID_SIZE] = bytes.try_into().ok()?;
        Some(Id(bytes))
    }

    /// Returns the id as a byte slice.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
