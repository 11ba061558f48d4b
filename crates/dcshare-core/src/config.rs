//! Centralized Configuration Management
//!
//! Configuration structures for the core and runtime, gathered in one place so
//! the CLI can load them from a single file.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::Charset;
use crate::errors::{DcError, Result};

// ----------------------------------------------------------------------------
// Timer Configuration
// ----------------------------------------------------------------------------

/// Configuration for the periodic timer service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Period of the Second channel in milliseconds
    pub tick_interval_ms: u64,
    /// Number of Second events per Minute event
    pub minute_every: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            minute_every: 60,
        }
    }
}

impl TimerConfig {
    /// Fast clock for tests: 20 ms "seconds", 60 per "minute"
    pub fn testing() -> Self {
        Self {
            tick_interval_ms: 20,
            minute_every: 60,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(DcError::config_error("tick_interval_ms must be greater than 0"));
        }
        if self.minute_every == 0 {
            return Err(DcError::config_error("minute_every must be greater than 0"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Search Configuration
// ----------------------------------------------------------------------------

/// Configuration for outstanding-search bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Seconds after which results for a search are no longer accepted
    pub expiry_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { expiry_secs: 60 }
    }
}

impl SearchConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

// ----------------------------------------------------------------------------
// Legacy Protocol Configuration
// ----------------------------------------------------------------------------

/// Settings for legacy (`$SR`) hub connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Character set the hub expects
    pub charset: Charset,
    /// Address reported in the trailing `(ip:port)` of a `$SR` line
    pub hub_address: String,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            charset: Charset::default(),
            hub_address: "127.0.0.1:411".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Configuration
// ----------------------------------------------------------------------------

/// Complete core configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcConfig {
    pub timer: TimerConfig,
    pub search: SearchConfig,
    pub legacy: LegacyConfig,
}

impl DcConfig {
    /// Configuration with a fast timer, for tests
    pub fn testing() -> Self {
        Self {
            timer: TimerConfig::testing(),
            search: SearchConfig { expiry_secs: 1 },
            legacy: LegacyConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.timer.validate()?;
        if self.search.expiry_secs == 0 {
            return Err(DcError::config_error("search expiry must be greater than 0"));
        }
        if self.legacy.hub_address.trim().is_empty() {
            return Err(DcError::config_error("legacy hub_address must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = DcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timer.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.timer.minute_every, 60);
        assert!(DcConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = DcConfig::default();
        config.timer.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(DcError::Configuration { .. })));

        let mut config = DcConfig::default();
        config.timer.minute_every = 0;
        assert!(config.validate().is_err());

        let mut config = DcConfig::default();
        config.legacy.hub_address = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DcConfig =
            serde_json::from_str(r#"{"legacy": {"charset": "cp1251"}}"#).unwrap();
        assert_eq!(config.legacy.charset.name(), "windows-1251");
        assert_eq!(config.legacy.hub_address, "127.0.0.1:411");
        assert_eq!(config.timer, TimerConfig::default());
    }
}
