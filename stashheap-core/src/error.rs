use crate::heap::HeapId;
use crate::store::Bucket;

/// Error type for heap, registry and compaction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("string heap id {0} was never assigned")]
    HeapIdNotFound(HeapId),

    #[error("property name {0:?} was never catalogued")]
    PropertyNotFound(String),

    #[error("corrupt entry in {bucket}: {reason}")]
    Corrupt { bucket: Bucket, reason: String },

    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("id space of {0} is exhausted")]
    IdSpaceExhausted(Bucket),

    #[error("failed to {step}: {source}")]
    Compaction {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps a backend error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Storage(Box::new(err))
    }

    pub(crate) fn corrupt(bucket: Bucket, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            bucket,
            reason: reason.into(),
        }
    }

    pub(crate) fn during(step: &'static str) -> impl FnOnce(Error) -> Error {
        move |source| Error::Compaction {
            step,
            source: Box::new(source),
        }
    }

    /// True if the lookup target was never interned, as opposed to the
    /// store failing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::HeapIdNotFound(_) | Error::PropertyNotFound(_) => true,
            Error::Compaction { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
