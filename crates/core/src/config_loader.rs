use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Prefix for environment overrides, e.g. `FEDSPEAK_ANALYSIS__MAX_LAG=8`.
pub const ENV_PREFIX: &str = "FEDSPEAK_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from defaults, `config/Config.toml` and `FEDSPEAK_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged configuration is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration with an explicit TOML path. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged configuration is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}
