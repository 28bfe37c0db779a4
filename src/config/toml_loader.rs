//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load a TOML file into `T`.
///
/// A missing file deserializes from empty TOML, so every field falls back to
/// its serde default.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, and
/// [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = || path.display().to_string();
    if !path.exists() {
        return toml::from_str("").map_err(|e| ConfigError::Parse {
            path: display(),
            message: e.message().to_string(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: display(),
        message: e.to_string().trim().to_string(),
    })
}
