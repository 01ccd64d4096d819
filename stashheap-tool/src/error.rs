use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to fetch stash update: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to read cached stash update: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write cached stash update: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to decode stash update: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to open store at {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: stashheap_rocks::RocksError,
    },

    #[error(transparent)]
    Core(#[from] stashheap_core::Error),
}
