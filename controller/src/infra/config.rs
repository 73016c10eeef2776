//! Infrastructure loader for `ControllerConfig`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::ControllerConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "FLEET_CONFIG";

/// Loads the controller config from a YAML file on disk.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Resolve the config path: explicit path, then `FLEET_CONFIG`, then
    /// `~/.fleet/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no explicit path is given and the home directory
    /// cannot be determined.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::with_path(path.to_path_buf()));
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(Self::with_path(PathBuf::from(val)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".fleet").join("config.yaml")))
    }

    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load(&self) -> Result<ControllerConfig> {
        let config = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .with_context(|| format!("cannot read {}", self.path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", self.path.display()))?
        } else {
            ControllerConfig::default()
        };
        config
            .validate()
            .with_context(|| format!("invalid config {}", self.path.display()))?;
        Ok(config)
    }
}
