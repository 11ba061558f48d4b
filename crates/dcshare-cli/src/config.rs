//! dcshare CLI Configuration Management
//!
//! The CLI reads one TOML file holding the core settings and the local
//! identity. Every table is optional; missing values fall back to defaults.
//!
//! ```toml
//! [identity]
//! nick = "sharer"
//! slots = 4
//! free_slots = 2
//!
//! [core.timer]
//! tick_interval_ms = 1000
//!
//! [core.legacy]
//! charset = "windows-1252"
//! hub_address = "10.0.0.1:411"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use dcshare_core::{Cid, DcConfig, HintedUser, LocalShare, User};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the dcshare CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Protocol and runtime settings
    pub core: DcConfig,

    /// Who we are and how many upload slots we offer
    pub identity: IdentityConfig,
}

/// Local identity and slot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Nick announced on hubs
    pub nick: String,

    /// Client id; legacy-only clients may leave it unset
    pub cid: Option<Cid>,

    /// Hub the results are announced through
    pub hub_url: String,

    /// Configured upload slots
    pub slots: u32,

    /// Upload slots currently free
    pub free_slots: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: "dcshare".to_string(),
            cid: None,
            hub_url: String::new(),
            slots: 3,
            free_slots: 3,
        }
    }
}

impl LocalShare for IdentityConfig {
    fn me(&self) -> HintedUser {
        let user = User::new(self.cid.unwrap_or_default(), self.nick.clone());
        HintedUser::new(user, self.hub_url.clone())
    }

    fn slots(&self) -> u32 {
        self.slots
    }

    fn free_slots(&self) -> u32 {
        self.free_slots
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let config: AppConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.core.validate()?;

        let nick = &self.identity.nick;
        if nick.is_empty() {
            return Err(CliError::Config("Nick must not be empty".to_string()));
        }
        if nick.chars().any(|c| c == ' ' || c == '$' || c == '|' || c.is_control()) {
            return Err(CliError::Config(format!("Nick {nick:?} contains reserved characters")));
        }
        if self.identity.free_slots > self.identity.slots {
            return Err(CliError::Config(format!(
                "free_slots ({}) exceeds slots ({})",
                self.identity.free_slots, self.identity.slots
            )));
        }

        Ok(())
    }
}
