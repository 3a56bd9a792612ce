//! Worker configuration.
//!
//! Everything here is fixed at build/deploy time: partition names derive from
//! the version token, and invalidating previously cached content is done by
//! bumping the token in a new deploy, never by mutating a running worker.
//!
//! Configuration is stored at `~/.config/skycache/config.json` when driven
//! from the CLI; embedded deployments construct it directly.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "skycache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version token embedded in partition names. Bumping it on deploy is the
    /// sole invalidation mechanism for previously cached content.
    pub version: String,
    /// The application's own origin; cross-origin requests pass through.
    pub origin: String,
    /// Root-relative paths pre-cached at install. Must include the
    /// offline-fallback document.
    pub asset_manifest: Vec<String>,
    /// Requests under this path prefix are dynamic/sensitive-aware.
    pub api_prefix: String,
    /// Path substrings that mark an API request as never-cache. Matching is a
    /// literal substring check on the path, preserved from the original
    /// deployment (so an unrelated segment containing "user" also matches).
    pub sensitive_segments: Vec<String>,
    /// Document served to navigations when both cache and network fail.
    pub fallback_path: String,
    /// Background sync tag that selects the game-data synchronization task.
    pub sync_tag: String,
    /// Route opened (or focused) when a notification is tapped.
    pub primary_route: String,
    pub notification_icon: String,
    pub notification_badge: String,
    pub vibration_pattern: Vec<u32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "v2".to_string(),
            origin: "http://localhost:3000".to_string(),
            asset_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/favicon.ico".to_string(),
                "/icons/icon-192.png".to_string(),
                "/icons/icon-512.png".to_string(),
            ],
            api_prefix: "/api/".to_string(),
            sensitive_segments: vec![
                "user".to_string(),
                "admin".to_string(),
                "auth".to_string(),
            ],
            fallback_path: "/".to_string(),
            sync_tag: "sync-game-data".to_string(),
            primary_route: "/game".to_string(),
            notification_icon: "/icons/icon-192.png".to_string(),
            notification_badge: "/icons/badge-72.png".to_string(),
            vibration_pattern: vec![200, 100, 200],
        }
    }
}

impl WorkerConfig {
    /// Name of the pre-populated partition for this deploy.
    pub fn static_partition(&self) -> String {
        format!("static-{}", self.version)
    }

    /// Name of the lazily populated partition for this deploy.
    pub fn dynamic_partition(&self) -> String {
        format!("dynamic-{}", self.version)
    }

    /// Absolute URL for a root-relative path on the configured origin.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_embed_version() {
        let mut config = WorkerConfig::default();
        config.version = "v7".to_string();
        assert_eq!(config.static_partition(), "static-v7");
        assert_eq!(config.dynamic_partition(), "dynamic-v7");
    }

    #[test]
    fn test_manifest_includes_fallback_document() {
        let config = WorkerConfig::default();
        assert!(config.asset_manifest.contains(&config.fallback_path));
        assert!(config.asset_manifest.contains(&"/manifest.json".to_string()));
    }

    #[test]
    fn test_url_for_joins_origin_and_path() {
        let config = WorkerConfig::default();
        assert_eq!(config.url_for("/game"), "http://localhost:3000/game");
    }

    #[test]
    fn test_load_from_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = WorkerConfig::load_from(&path).unwrap();
        assert_eq!(config.api_prefix, "/api/");
    }

    #[test]
    fn test_load_from_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = WorkerConfig::default();
        config.version = "v9".to_string();
        config.origin = "https://play.example".to_string();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = WorkerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.version, "v9");
        assert_eq!(loaded.origin, "https://play.example");
    }
}
