use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::error::ToolError;

pub const DEFAULT_FEED_URL: &str = "https://www.pathofexile.com/api/public-stash-tabs";

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    pub feed_url: Option<String>,
    #[serde(default)]
    pub store: PathConfig,
    #[serde(default)]
    pub cache: PathConfig,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct PathConfig {
    pub path: Option<PathBuf>,
}

/// Effective settings after merging flags, environment and config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub feed_url: String,
    pub store_path: PathBuf,
    pub cache_path: PathBuf,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stashheap").join("config.toml"))
}

pub fn parse_config(content: &str) -> Result<Config, ToolError> {
    Ok(toml::from_str(content)?)
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    let Ok(content) = std::fs::read_to_string(&path) else {
        return Config::default();
    };

    parse_config(&content).unwrap_or_else(|err| {
        warn!("ignoring {}: {}", path.display(), err);
        Config::default()
    })
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stashheap")
}

pub fn resolve_settings(
    config: Config,
    cli_store: Option<PathBuf>,
    cli_cache: Option<PathBuf>,
) -> Settings {
    let feed_url = std::env::var("STASHHEAP_FEED_URL")
        .ok()
        .filter(|url| !url.is_empty())
        .or(config.feed_url)
        .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

    let store_path = cli_store
        .or(config.store.path)
        .unwrap_or_else(|| data_dir().join("store"));
    let cache_path = cli_cache
        .or(config.cache.path)
        .unwrap_or_else(|| data_dir().join("latest.json"));

    Settings {
        feed_url,
        store_path,
        cache_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
            feed_url = "http://localhost:8080/stashes"

            [store]
            path = "/var/lib/stashheap/store"

            [cache]
            path = "/tmp/latest.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.feed_url.as_deref(), Some("http://localhost:8080/stashes"));
        assert_eq!(config.store.path, Some(PathBuf::from("/var/lib/stashheap/store")));
        assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/latest.json")));
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(parse_config("store = 3"), Err(ToolError::Config(_))));
    }

    #[test]
    fn flags_override_file() {
        let config = Config {
            feed_url: None,
            store: PathConfig {
                path: Some(PathBuf::from("/from/file")),
            },
            cache: PathConfig {
                path: Some(PathBuf::from("/from/file.json")),
            },
        };

        let settings = resolve_settings(config, Some(PathBuf::from("/from/flag")), None);

        assert_eq!(settings.store_path, PathBuf::from("/from/flag"));
        assert_eq!(settings.cache_path, PathBuf::from("/from/file.json"));
    }

    #[test]
    fn defaults_live_in_data_dir() {
        let settings = resolve_settings(Config::default(), None, None);
        assert!(settings.store_path.ends_with("stashheap/store"));
        assert!(settings.cache_path.ends_with("stashheap/latest.json"));
    }
}
