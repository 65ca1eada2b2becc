//! # Configuration Management Module
//!
//! Friendlist is configured from a single TOML file. Every field has a
//! default, so a missing section or key simply falls back to the values
//! documented below.
//!
//! ## Configuration Structure
//!
//! - [`FriendsConfig`] - list capacity, notification toggles, friend chat
//! - [`PolicyConfig`] - host hooks (friendly fire, shared locks and turrets)
//! - [`StorageConfig`] - snapshot backend and location
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use friendlist::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("friendlist.toml").await?;
//!     println!("Max friends: {}", config.friends.max_friends);
//!
//!     Config::create_default("friendlist.example.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [friends]
//! max_friends = 30
//! send_online_notification = true
//! send_offline_notification = true
//! send_added_notification = true
//! send_removed_notification = false
//! enable_friend_chat = true
//! limit_friend_chat_to_mutual_friends = true
//!
//! [policy]
//! disable_friendly_fire = false
//! share_code_locks = false
//! share_auto_turrets = false
//!
//! [storage]
//! data_dir = "./data"
//! backend = "sled"        # or "json"
//! blob_name = "Friends"
//!
//! [logging]
//! level = "info"
//! file = "friendlist.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub friends: FriendsConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendsConfig {
    /// Maximum list size per owner. Values below 1 make every list permanently full.
    #[serde(default = "default_max_friends")]
    pub max_friends: i32,
    #[serde(default = "default_true")]
    pub send_online_notification: bool,
    #[serde(default = "default_true")]
    pub send_offline_notification: bool,
    #[serde(default = "default_true")]
    pub send_added_notification: bool,
    #[serde(default)]
    pub send_removed_notification: bool,
    #[serde(default = "default_true")]
    pub enable_friend_chat: bool,
    /// Only deliver friend chat to friends who list the sender back.
    #[serde(default = "default_true")]
    pub limit_friend_chat_to_mutual_friends: bool,
}

fn default_max_friends() -> i32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for FriendsConfig {
    fn default() -> Self {
        Self {
            max_friends: default_max_friends(),
            send_online_notification: true,
            send_offline_notification: true,
            send_added_notification: true,
            send_removed_notification: false,
            enable_friend_chat: true,
            limit_friend_chat_to_mutual_friends: true,
        }
    }
}

impl FriendsConfig {
    /// Usable list capacity; `None` means no new friend can ever be added.
    pub fn capacity(&self) -> Option<usize> {
        if self.max_friends < 1 {
            None
        } else {
            Some(self.max_friends as usize)
        }
    }
}

/// Toggles for the host-side policy hooks. All off by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub disable_friendly_fire: bool,
    #[serde(default)]
    pub share_code_locks: bool,
    #[serde(default)]
    pub share_auto_turrets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sled,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub backend: StorageBackend,
    /// Stable key the snapshot is stored under (file stem for the JSON backend).
    #[serde(default = "default_blob_name")]
    pub blob_name: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/friends.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sled_path: Option<String>,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_blob_name() -> String {
    "Friends".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::default(),
            blob_name: default_blob_name(),
            sled_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("friendlist.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Parse `level`; unknown values fall back to `info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.level.to_ascii_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" | "warning" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
