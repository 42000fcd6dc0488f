use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::Deserialize;

use crate::store::DEFAULT_STORAGE_KEY;

const APP_DIR: &str = "pure-outline";

/// Settings read from `config.toml`. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the persisted outline.
    pub data_dir: PathBuf,
    /// Name of the key the outline is stored under.
    pub storage_key: String,
    /// Persist after every edit that changed the outline.
    pub autosave: bool,
    pub log_file: PathBuf,
    pub log_level: String,
    /// Show the JSON panel on startup.
    pub show_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            autosave: true,
            log_file: default_log_file(),
            log_level: "warn".to_string(),
            show_json: false,
        }
    }
}

impl Config {
    /// Loads `path`, or the default config file when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_file);
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.storage_key.trim().is_empty() {
            anyhow::bail!("storage_key must not be empty");
        }
        Ok(config)
    }
}

#[derive(Clone, Copy)]
enum BaseDir {
    Config,
    Data,
    Cache,
}

pub fn config_dir() -> PathBuf {
    base_dir(BaseDir::Config)
}

pub fn data_dir() -> PathBuf {
    base_dir(BaseDir::Data)
}

pub fn cache_dir() -> PathBuf {
    base_dir(BaseDir::Cache)
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn default_log_file() -> PathBuf {
    cache_dir().join(format!("{APP_DIR}.log"))
}

/// `<base>/pure-outline`, or `./pure-outline` when the platform has no home
/// directory.
fn base_dir(kind: BaseDir) -> PathBuf {
    match choose_base_strategy() {
        Ok(strategy) => {
            let base = match kind {
                BaseDir::Config => strategy.config_dir(),
                BaseDir::Data => strategy.data_dir(),
                BaseDir::Cache => strategy.cache_dir(),
            };
            base.join(APP_DIR)
        }
        Err(err) => {
            log::warn!("no platform directories available: {err}");
            PathBuf::from(".").join(APP_DIR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "outline");
        assert!(config.autosave);
        assert!(!config.show_json);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::parse(
            r#"
data_dir = "/tmp/outlines"
storage_key = "work"
autosave = false
show_json = true
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/outlines"));
        assert_eq!(config.storage_key, "work");
        assert!(!config.autosave);
        assert!(config.show_json);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, Config::default().log_file);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("colour = \"blue\"").is_err());
    }

    #[test]
    fn blank_storage_key_is_rejected() {
        assert!(Config::parse("storage_key = \"  \"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "storage_key = \"notes\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.storage_key, "notes");
    }

    #[test]
    fn default_paths_live_under_app_dir() {
        assert!(config_file().ends_with("pure-outline/config.toml"));
        assert!(data_dir().ends_with("pure-outline"));
    }
}
