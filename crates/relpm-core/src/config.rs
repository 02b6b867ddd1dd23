//! Application configuration management.
//!
//! Settings are stored as JSON in `<config dir>/relpm/config.json` and turned
//! into explicit [`ReadOptions`] / [`WriteOptions`] values for each session.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encoding::TextEncoding;
use crate::error::{Error, FileSystemError, Result};
use crate::reader::ReadOptions;
use crate::writer::WriteOptions;

/// Settings that affect reading playlists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSettings {
    /// Use `#EXTINF` lines for metadata instead of the audio files' tags.
    #[serde(default = "default_true")]
    pub parse_extinf_tags: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            parse_extinf_tags: true,
        }
    }
}

/// Settings that affect writing playlists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportSettings {
    /// Also write `<name>_last100.<ext>` with the final 100 tracks.
    #[serde(default)]
    pub write_last100: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Import settings.
    #[serde(default)]
    pub import: ImportSettings,
    /// Export settings.
    #[serde(default)]
    pub export: ExportSettings,
    /// Encoding label that answers the encoding question without asking.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Playlist most recently opened or saved.
    #[serde(default)]
    pub last_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from disk, or create default if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();
        if !config_path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read config file: {e}"),
            })
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write config file: {e}"),
            })
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// The preset encoding, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the label is unknown.
    pub fn preset_encoding(&self) -> Result<Option<TextEncoding>> {
        self.encoding
            .as_deref()
            .map(|label| {
                TextEncoding::for_label(label)
                    .map_err(|e| Error::Configuration(format!("Invalid encoding setting: {e}")))
            })
            .transpose()
    }

    /// Options for a read session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the preset encoding is unknown.
    pub fn read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            parse_extinf_tags: self.import.parse_extinf_tags,
            encoding: self.preset_encoding()?,
        })
    }

    /// Options for a write session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the preset encoding is unknown.
    pub fn write_options(&self) -> Result<WriteOptions> {
        Ok(WriteOptions {
            write_last100: self.export.write_last100,
            encoding: self.preset_encoding()?,
        })
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("relpm")
        .join("config.json")
}
