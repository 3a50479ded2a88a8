// SPDX-License-Identifier: MIT

//! Configuration loading: a TOML config file plus a companion TOML
//! secrets file, the latter keyed by hostname so one secrets file can
//! serve every machine in a fleet without each host's config carrying
//! every other host's credentials.

use crate::model::RetentionPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found (checked {0})")]
    NotFound(String),
    #[error("no secrets file found (checked {0})")]
    SecretsNotFound(String),
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("no syncthing api key configured for host '{0}' in the secrets file")]
    ApiKeyMissing(String),
    #[error("server.folder is required")]
    MissingServerFolder,
    #[error("backup.folder is required")]
    MissingBackupFolder,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub folder: PathBuf,
    #[serde(default = "default_jar_name")]
    pub jar_name: String,
    #[serde(default = "default_java_path")]
    pub java_path: String,
    #[serde(default = "default_min_memory")]
    pub min_memory: String,
    #[serde(default = "default_max_memory")]
    pub max_memory: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_jar_name() -> String {
    "server.jar".to_string()
}
fn default_java_path() -> String {
    "java".to_string()
}
fn default_min_memory() -> String {
    "2G".to_string()
}
fn default_max_memory() -> String {
    "4G".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    pub folder: PathBuf,
    #[serde(default = "default_true")]
    pub auto_prune: bool,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_url")]
    pub url: String,
    pub folder_id: String,
}

fn default_sync_url() -> String {
    "http://127.0.0.1:8384".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,
    #[serde(default = "default_race_wait")]
    pub race_wait_secs: u64,
    #[serde(default = "default_sync_wait_timeout")]
    pub sync_wait_timeout_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    30
}
fn default_stale_threshold() -> u64 {
    60
}
fn default_race_wait() -> u64 {
    10
}
fn default_sync_wait_timeout() -> u64 {
    300
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            stale_threshold_secs: default_stale_threshold(),
            race_wait_secs: default_race_wait(),
            sync_wait_timeout_secs: default_sync_wait_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> String {
    "holdfast.log".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: default_log_file(), level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backup: BackupConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Co-located with the working directory in its parent, per the
    /// replicated-folder layout shared with the sync daemon.
    pub fn lock_file(&self) -> PathBuf {
        match self.server.folder.parent() {
            Some(parent) => parent.join("server.lock"),
            None => self.server.folder.join("server.lock"),
        }
    }

    pub fn world_folder(&self) -> PathBuf {
        self.server.folder.join("world")
    }

    pub fn server_jar(&self) -> PathBuf {
        self.server.folder.join(&self.server.jar_name)
    }

    pub fn log_file(&self) -> PathBuf {
        self.server.folder.join(&self.logging.file)
    }

    /// Warnings an operator should see, but that don't prevent startup.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.server_jar().exists() {
            warnings.push(format!("server jar not found at {}", self.server_jar().display()));
        }
        if !self.world_folder().exists() {
            warnings.push(format!(
                "world folder not found at {} (expected on first run)",
                self.world_folder().display()
            ));
        }
        for (label, value) in [("min_memory", &self.server.min_memory), ("max_memory", &self.server.max_memory)] {
            if !has_memory_suffix(value) {
                warnings.push(format!("{label} '{value}' has no G/M suffix; java may reject it"));
            }
        }
        warnings
    }

    /// Create any configured directories that don't exist yet (backup
    /// folder, server folder's parent), tilde-expanded first.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.server.folder, &self.backup.folder] {
            let expanded = expand_tilde(dir);
            if !expanded.exists() {
                std::fs::create_dir_all(&expanded)?;
            }
        }
        Ok(())
    }
}

fn has_memory_suffix(value: &str) -> bool {
    value.ends_with('G') || value.ends_with('M') || value.ends_with('g') || value.ends_with('m')
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

/// Per-machine secret material, looked up by hostname so the same
/// secrets file can be shared across a fleet.
#[derive(Debug, Clone, Default, Deserialize)]
struct MachineSecrets {
    syncthing_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Secrets {
    #[serde(default)]
    machines: HashMap<String, MachineSecrets>,
}

fn candidate_paths(env_override: &str, filename: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(p) = std::env::var(env_override) {
        out.push(PathBuf::from(p));
    }
    out.push(PathBuf::from(".").join(filename));
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        out.push(PathBuf::from(xdg).join("holdfast").join(filename));
    } else if let Ok(home) = std::env::var("HOME") {
        out.push(PathBuf::from(home).join(".config").join("holdfast").join(filename));
    }
    out
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// Load `Config` and resolve the Syncthing API key for `hostname`.
///
/// Looking up a config file and a secrets file are both required steps;
/// a missing API key for the current host is a fatal `ConfigError`
/// raised here, before any side effect, rather than discovered lazily
/// the first time the sync client tries to authenticate.
pub fn load_config(hostname: &str) -> Result<(Config, String), ConfigError> {
    let config_candidates = candidate_paths("HOLDFAST_CONFIG", "config.toml");
    let config_path = config_candidates
        .iter()
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::NotFound(describe(&config_candidates)))?;
    let config: Config = read_toml(config_path)?;
    config.ensure_directories().map_err(|source| ConfigError::Io { path: config.server.folder.clone(), source })?;

    let secrets_candidates = candidate_paths("HOLDFAST_SECRETS", "secrets.toml");
    let secrets_path = secrets_candidates
        .iter()
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::SecretsNotFound(describe(&secrets_candidates)))?;
    let secrets: Secrets = read_toml(secrets_path)?;

    if config.server.folder.as_os_str().is_empty() {
        return Err(ConfigError::MissingServerFolder);
    }
    if config.backup.folder.as_os_str().is_empty() {
        return Err(ConfigError::MissingBackupFolder);
    }

    let api_key = secrets
        .machines
        .get(hostname)
        .and_then(|m| m.syncthing_api_key.clone())
        .ok_or_else(|| ConfigError::ApiKeyMissing(hostname.to_string()))?;

    Ok((config, api_key))
}

fn describe(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
