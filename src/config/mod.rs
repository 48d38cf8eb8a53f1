mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in validate_config(&config) {
        tracing::warn!(path = %path.display(), "{warning}");
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./timeshift.toml", "~/.config/timeshift/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!(path = %path.display(), "using config file");
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Non-fatal problems with a loaded configuration.
pub fn validate_config(config: &Config) -> Vec<String> {
    config
        .buffer
        .validate()
        .into_iter()
        .map(|w| format!("buffer: {w}"))
        .collect()
}
