//! Panel configuration.
//!
//! Every value has a built-in default. An optional `config.toml` under the
//! user's config directory can override single fields; the panel never writes it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mqtt::config::MqttConfig;

const CONFIG_DIR: &str = "ledpanel";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between a lost connection and the next attempt
    pub reconnect_delay_ms: u64,
    /// How long the indicator glows after a recognized color
    pub glow_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 2000,
            glow_ms: 900,
        }
    }
}

impl TimingConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn glow(&self) -> Duration {
        Duration::from_millis(self.glow_ms)
    }
}

/// Initial contents of the config form.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UIConfig {
    pub default_interval: String,
    pub default_colors: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        // Boot defaults of the device firmware
        Self {
            default_interval: "3".to_string(),
            default_colors: "red,green,blue".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub mqtt: MqttConfig,
    pub timing: TimingConfig,
    pub ui: UIConfig,
}

impl PanelConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads the override file if there is one. Any problem falls back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            debug!("No config directory on this platform, using defaults");
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(Some(config)) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
