use std::path::{Path, PathBuf};

use stashheap_core::Feed;
use tracing::{debug, instrument};

use crate::error::ToolError;

const USER_AGENT: &str = concat!("stashheap/", env!("CARGO_PKG_VERSION"));

/// The latest stash update, fetched over HTTP and cached as raw JSON.
pub struct FeedCache {
    http: reqwest::Client,
    url: String,
    path: PathBuf,
}

impl FeedCache {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            url: url.into(),
            path: path.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetches the update following `change_id` (or the first one) and
    /// replaces the cached copy.
    ///
    /// The body must decode before it is written, so a bad response never
    /// clobbers a good cache.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_and_update(&self, change_id: Option<&str>) -> Result<Feed, ToolError> {
        let mut request = self.http.get(&self.url);
        if let Some(id) = change_id {
            request = request.query(&[("id", id)]);
        }

        debug!("Requesting stash update");
        let body = request.send().await?.error_for_status()?.bytes().await?;
        debug!(bytes = body.len(), "Received stash update");

        self.store_body(&body)
    }

    /// Validates and caches a raw response body.
    pub fn store_body(&self, body: &[u8]) -> Result<Feed, ToolError> {
        let feed = decode(body)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ToolError::Write)?;
        }
        std::fs::write(&self.path, body).map_err(ToolError::Write)?;
        Ok(feed)
    }

    /// Returns the cached stash update.
    pub fn get_stored(&self) -> Result<Feed, ToolError> {
        let body = std::fs::read(&self.path).map_err(ToolError::Read)?;
        decode(&body)
    }
}

fn decode(body: &[u8]) -> Result<Feed, ToolError> {
    let mut feed: Feed = serde_json::from_slice(body)?;
    feed.link_items();
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BODY: &[u8] = br#"{"next_change_id":"1-2","stashes":[
        {"id":"s1","accountName":"alice","items":[{"id":"A","typeLine":"Chaos Orb"}]}
    ]}"#;

    fn cache(dir: &TempDir) -> FeedCache {
        FeedCache::new("http://localhost/unused", dir.path().join("nested").join("latest.json"))
            .unwrap()
    }

    #[test]
    fn store_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        let stored = cache.store_body(BODY).unwrap();
        let read = cache.get_stored().unwrap();

        assert_eq!(stored, read);
        assert_eq!(read.next_change_id, "1-2");
        assert_eq!(read.stashes[0].items[0].stash_id, "s1");
    }

    #[test]
    fn missing_cache_is_read_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(cache(&dir).get_stored(), Err(ToolError::Read(_))));
    }

    #[test]
    fn invalid_body_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.store_body(BODY).unwrap();

        let err = cache.store_body(b"<html>rate limited</html>").unwrap_err();

        assert!(matches!(err, ToolError::Decode(_)));
        assert_eq!(cache.get_stored().unwrap().next_change_id, "1-2");
    }

    #[test]
    fn corrupt_cache_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), b"{\"stashes\": [").unwrap();

        assert!(matches!(cache.get_stored(), Err(ToolError::Decode(_))));
    }
}
