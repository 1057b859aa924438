use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cross_xdg::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::theme::Palette;

/// Environment variable that points at an explicit preferences file.
pub const CONFIG_ENV: &str = "BF_CONFIG";

const CONFIG_FILE: &str = "bf.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine the config directory")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse preferences: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
}

/// User preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    /// Number of cells shown by the memory view.
    pub memory_window: usize,
    pub limits: Limits,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            memory_window: 30,
            limits: Limits::default(),
        }
    }
}

impl Preferences {
    pub fn palette(&self) -> Palette {
        Palette::for_mode(self.dark_mode)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load preferences from [`config_path`], falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            debug!("no config directory; using default preferences");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(prefs)) => {
                debug!(path = %path.display(), "loaded preferences");
                prefs
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), "ignoring preferences: {e}");
                Self::default()
            }
        }
    }

    /// Returns `Ok(None)` when `path` does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = toml::to_string(self)?;
        fs::write(path, text).map_err(io_err)?;
        debug!(path = %path.display(), "saved preferences");
        Ok(())
    }
}

/// `$BF_CONFIG` if set, otherwise `bf.toml` in the XDG config home.
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE);
    Some(path)
}
