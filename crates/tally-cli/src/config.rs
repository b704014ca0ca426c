//! Persistent CLI device configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_core::util::normalize_text_option;
use tally_core::PeerId;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    /// Peer id this device presents during sync.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Default author for new transactions.
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            device_id: None,
            author_name: None,
            db_path: None,
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("tally").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

impl CliConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let payload = serde_json::to_string_pretty(self)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, payload)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Device id as a sync peer id, if one is configured.
    pub fn peer_id(&self) -> Result<Option<PeerId>, String> {
        normalize_text_option(self.device_id.clone())
            .map(|id| PeerId::new(id).map_err(|error| error.to_string()))
            .transpose()
    }

    pub fn author_name(&self) -> Option<String> {
        normalize_text_option(self.author_name.clone())
    }

    fn normalize(&mut self) {
        self.device_id = normalize_text_option(self.device_id.clone());
        self.author_name = normalize_text_option(self.author_name.clone());
        self.db_path = self
            .db_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

/// Generate a fresh device id.
pub fn generate_device_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
