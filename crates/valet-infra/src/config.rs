//! Configuration loading.
//!
//! `AppConfig` is read from TOML. The data directory defaults to
//! `~/.valet`, overridable with `VALET_DATA_DIR`; the config file lives at
//! `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::Context;

use valet_types::config::AppConfig;

/// The data directory: `VALET_DATA_DIR` or `~/.valet`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VALET_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".valet")
}

/// Load configuration from the given TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let config: AppConfig = toml::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `<data_dir>/config.toml`.
pub fn load_default_config() -> anyhow::Result<AppConfig> {
    load_config(&default_data_dir().join("config.toml"))
}
