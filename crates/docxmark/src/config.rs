//! Configuration settings
//!
//! Settings can be loaded from TOML:
//!
//! ```toml
//! [images]
//! max_concurrent_fetches = 16
//! fetch_timeout_secs = 10
//! user_agent = "docxmark"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Image resolution settings
    pub images: ImageSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Image resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Upper bound on remote fetches in flight during one pass
    pub max_concurrent_fetches: usize,
    /// Request timeout applied by the HTTP fetcher
    pub fetch_timeout_secs: u64,
    /// User agent sent with remote image requests
    pub user_agent: Option<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 64,
            fetch_timeout_secs: 30,
            user_agent: None,
        }
    }
}
