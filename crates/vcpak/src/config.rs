use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "vcpak.toml";
pub const DEFAULT_SAVES_DIR: &str = "cpak_saves";
pub const DEFAULT_STATE_FILE: &str = "menu/vcpak_state.dat";

/// Effective settings for one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Catalog base directory, relative to the storage root.
    pub saves_dir: String,
    /// Session journal file, relative to the storage root.
    pub state_file: String,
    /// Controller port the physical pak sits in.
    pub port: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            saves_dir: DEFAULT_SAVES_DIR.to_string(),
            state_file: DEFAULT_STATE_FILE.to_string(),
            port: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    device: DeviceSection,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct StorageSection {
    saves_dir: String,
    state_file: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            saves_dir: DEFAULT_SAVES_DIR.to_string(),
            state_file: DEFAULT_STATE_FILE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct DeviceSection {
    port: u8,
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        let ConfigFile { storage, device } = file;
        Self {
            saves_dir: storage.saves_dir,
            state_file: storage.state_file,
            port: device.port,
        }
    }
}

impl Config {
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        let config_file = ConfigFile {
            storage: StorageSection {
                saves_dir: self.saves_dir.clone(),
                state_file: self.state_file.clone(),
            },
            device: DeviceSection { port: self.port },
        };

        toml::to_string_pretty(&config_file)
    }

    pub fn saves_path(&self, root: &Path) -> PathBuf {
        root.join(&self.saves_dir)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }
}

/// Reads `vcpak.toml` from `root`, falling back to defaults when it is absent.
pub fn load_config(root: &Path) -> Result<Config> {
    let config_file = root.join(CONFIG_FILE_NAME);
    if !config_file.is_file() {
        return Ok(Config::default());
    }

    let str = std::fs::read_to_string(&config_file)?;
    let config_file =
        toml::from_str::<ConfigFile>(&str).map_err(|e| Error::Config(e.to_string()))?;
    Ok(config_file.into())
}
