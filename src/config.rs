//! Static relay configuration
//!
//! Everything here is fixed once the relay is constructed. The defaults match
//! the configuration the relay was first deployed with; a JSON file can
//! override any subset of fields.

use crate::applist::{AllowList, Application};
use crate::types::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Configuration for the relay core and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum number of non-call records held at once
    pub store_capacity: usize,

    /// Max length requested for the title attribute
    pub title_max_len: u16,

    /// Max length requested for the message attribute
    pub message_max_len: u16,

    /// Identifiers that may wait for an attribute fetch before new ones are dropped
    pub pending_capacity: usize,

    /// How long the display keeps a freshly completed notification on screen
    pub display_hold_ms: u64,

    /// Redraw interval while a call is active
    pub call_refresh_ms: u64,

    /// Application identifier to category. Replaces the built-in table when present.
    pub allow_list: HashMap<String, Application>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            store_capacity: 8,
            title_max_len: 16,
            message_max_len: 16,
            pending_capacity: 64,
            display_hold_ms: 15_000,
            call_refresh_ms: 1_000,
            allow_list: AllowList::default()
                .iter()
                .map(|(app_id, app)| (app_id.to_string(), app))
                .collect(),
        }
    }
}

impl RelayConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RelayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "store_capacity must be at least 1".to_string(),
            ));
        }
        if self.pending_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "pending_capacity must be at least 1".to_string(),
            ));
        }
        if self.title_max_len == 0 || self.message_max_len == 0 {
            return Err(RelayError::InvalidConfig(
                "attribute max lengths must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::from_entries(
            self.allow_list
                .iter()
                .map(|(app_id, app)| (app_id.clone(), *app)),
        )
    }

    pub fn display_hold(&self) -> Duration {
        Duration::from_millis(self.display_hold_ms)
    }

    pub fn call_refresh(&self) -> Duration {
        Duration::from_millis(self.call_refresh_ms)
    }
}
