//! Client configuration management.
//!
//! This module handles loading and saving the client configuration,
//! which includes the API base URL, the auth entry route used for
//! forced-logout redirects, and the last used sign-in email.
//!
//! Configuration is stored at `~/.config/skillbridge/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "skillbridge";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API base URL
const DEFAULT_BASE_URL: &str = "https://api.skillbridge.io";

/// Environment variable overriding the API base URL
const BASE_URL_ENV: &str = "SKILLBRIDGE_BASE_URL";

/// Default auth entry route for forced-logout redirects
const DEFAULT_AUTH_ENTRY: &str = "/login";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub auth_entry: Option<String>,
    pub last_email: Option<String>,
    #[serde(default)]
    pub remember_by_default: bool,
}

impl ClientConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
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

    /// Resolve the API base URL: environment override, then config,
    /// then the built-in default. Trailing slashes are trimmed so path
    /// joining stays predictable.
    pub fn base_url(&self) -> String {
        let url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    /// The route the client redirects to when a session is unrecoverable.
    pub fn auth_entry(&self) -> String {
        self.auth_entry
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTH_ENTRY.to_string())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable session store.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
