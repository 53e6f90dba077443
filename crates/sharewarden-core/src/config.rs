use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/sharewarden/config.toml";
pub const DEFAULT_DB_PATH: &str = "/etc/sharewarden/policy.db";
pub const DEFAULT_POLICY_DIR: &str = "/etc/sharewarden/policy.d";
pub const DEFAULT_POLICY_FILE_PREFIX: &str = "warden.ConnectToFolder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
}

/// Resolved filesystem locations the store operates on.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub policy_dir: PathBuf,
    pub policy_file_prefix: String,
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            store: StoreConfig {
                db_path: PathBuf::from(DEFAULT_DB_PATH),
            },
            policy: PolicyConfig {
                dir: PathBuf::from(DEFAULT_POLICY_DIR),
                file_prefix: DEFAULT_POLICY_FILE_PREFIX.to_string(),
            },
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("parse config TOML")?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let output = toml::to_string_pretty(self).context("render config TOML")?;
        Ok(output)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config at {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let contents = self.to_toml_string()?;
        fs::write(path, contents).with_context(|| format!("write config at {}", path.display()))?;
        Ok(())
    }
}

impl StorePaths {
    /// Resolves effective paths: built-in defaults, overlaid by the config
    /// file when present, overlaid by environment variables.
    pub fn resolve() -> Result<Self> {
        Self::resolve_from(None)
    }

    /// Like [`StorePaths::resolve`], with an explicit config file taking
    /// precedence over `SHAREWARDEN_CONFIG` and the default location.
    pub fn resolve_from(explicit_config: Option<PathBuf>) -> Result<Self> {
        let config_path = match explicit_config {
            Some(path) => path,
            None => match std::env::var("SHAREWARDEN_CONFIG") {
                Ok(value) => PathBuf::from(value),
                Err(_) => PathBuf::from(DEFAULT_CONFIG_PATH),
            },
        };
        let config = if config_path.is_file() {
            Config::load(&config_path)?
        } else {
            Config::default_config()
        };
        Ok(Self::from_config(config_path, &config))
    }

    pub fn from_config(config_path: PathBuf, config: &Config) -> Self {
        let db_path = match std::env::var("SHAREWARDEN_POLICY_DB") {
            Ok(value) => PathBuf::from(value),
            Err(_) => config.store.db_path.clone(),
        };
        let policy_dir = match std::env::var("SHAREWARDEN_POLICY_DIR") {
            Ok(value) => PathBuf::from(value),
            Err(_) => config.policy.dir.clone(),
        };
        Self {
            config_path,
            db_path,
            policy_dir,
            policy_file_prefix: config.policy.file_prefix.clone(),
        }
    }
}
