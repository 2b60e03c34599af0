//! User settings that steer feed policy
//!
//! Loaded from (in order of priority):
//! 1. `settings.json` in the feed config directory
//! 2. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename in the feed config directory
const SETTINGS_FILE: &str = "settings.json";

/// The view shown when the user opens the app or presses "home"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeView {
    Inbox,
    RecentTopics,
    #[default]
    AllMessages,
}

/// When scrolling through a view marks messages as read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkReadOnScrollPolicy {
    #[default]
    Always,
    /// Only in views showing a single topic or DM conversation
    ConversationOnly,
    Never,
}

/// Snapshot of the user settings consulted by message lists
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub web_home_view: HomeView,
    pub web_mark_read_on_scroll_policy: MarkReadOnScrollPolicy,
    /// Logged-out visitor browsing web-public channels
    pub is_spectator: bool,
}

impl UserSettings {
    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        config::load_json_or_default(SETTINGS_FILE)
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Persist settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }

    /// Persist settings to a specific JSON file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)
    }

    /// Get the default settings file path (~/.config/feed/settings.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }
}
