use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = ".blade/blade.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BladeConfig {
    /// SQLite file holding the preparation ledger.
    pub db_path: PathBuf,
    /// Directory containing the fault binaries (`chaos_burncpu`, ...).
    pub script_path: PathBuf,
    pub log_level: String,
}

impl Default for BladeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            script_path: default_script_path(),
            log_level: "info".to_string(),
        }
    }
}

impl BladeConfig {
    /// Defaults, then the optional YAML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => load_config(p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("BLADE_DB") {
            if !v.is_empty() {
                self.db_path = PathBuf::from(v);
            }
        }
        if let Ok(v) = env::var("BLADE_SCRIPT_PATH") {
            if !v.is_empty() {
                self.script_path = PathBuf::from(v);
            }
        }
        if let Ok(v) = env::var("BLADE_LOG") {
            self.log_level = v;
        }
    }
}

pub fn load_config(path: &Path) -> Result<BladeConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let cfg: BladeConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.push(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML {}: {}", path.display(), e)))?;

    if !ignored_keys.is_empty() {
        tracing::warn!(
            event = "config.unknown_keys",
            keys = ?ignored_keys,
            path = %path.display(),
            "ignored unknown config fields"
        );
    }

    if cfg.script_path.as_os_str().is_empty() {
        return Err(ConfigError(format!(
            "script_path must not be empty (file: {})",
            path.display()
        )));
    }

    Ok(cfg)
}

/// `<dir of the running executable>/bin`, falling back to `./bin`.
fn default_script_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("bin")))
        .unwrap_or_else(|| PathBuf::from("bin"))
}
