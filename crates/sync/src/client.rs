// SPDX-License-Identifier: MIT

//! Blocking HTTP/JSON client for the sync daemon's REST API
//! (`X-API-Key` header auth, the same wire shape Syncthing exposes).

use holdfast_core::FolderStatus;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy distinguishing a network-level failure (the daemon
/// might just be down or slow to answer — advisory, overridable) from
/// an application-level fault (bad response, missing folder — a hard
/// fault the caller should not paper over).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync daemon unavailable: {0}")]
    Unavailable(String),
    #[error("sync daemon error: {0}")]
    Error(String),
    #[error("folder '{0}' not found in sync daemon configuration")]
    NotFound(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SyncError::Unavailable(err.to_string())
        } else {
            SyncError::Error(err.to_string())
        }
    }
}

pub struct SyncClient {
    http: reqwest::blocking::Client,
    url: String,
    api_key: String,
    folder_id: String,
}

impl SyncClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            url: url.into(),
            api_key: api_key.into(),
            folder_id: folder_id.into(),
        }
    }

    /// Whether this client has credentials at all. A client built with
    /// an empty API key is treated as disabled: every mutating call
    /// becomes a safe no-op so `holdfast` still runs on a single,
    /// unreplicated host with no sync daemon present.
    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn get(&self, path: &str) -> Result<Value, SyncError> {
        let resp = self
            .http
            .get(format!("{}{}", self.url, path))
            .header("X-API-Key", &self.api_key)
            .send()?;
        if !resp.status().is_success() {
            return Err(SyncError::Error(format!("{} returned {}", path, resp.status())));
        }
        resp.json::<Value>().map_err(|e| SyncError::Error(format!("bad JSON from {path}: {e}")))
    }

    fn put(&self, path: &str, body: &Value) -> Result<(), SyncError> {
        let resp = self
            .http
            .put(format!("{}{}", self.url, path))
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()?;
        if !resp.status().is_success() {
            return Err(SyncError::Error(format!("{} returned {}", path, resp.status())));
        }
        Ok(())
    }

    fn post(&self, path: &str) -> Result<(), SyncError> {
        let resp = self
            .http
            .post(format!("{}{}", self.url, path))
            .header("X-API-Key", &self.api_key)
            .send()?;
        if !resp.status().is_success() {
            return Err(SyncError::Error(format!("{} returned {}", path, resp.status())));
        }
        Ok(())
    }

    pub fn check_connection(&self) -> bool {
        self.get("/rest/system/status").is_ok()
    }

    pub fn get_folder_status(&self) -> Result<FolderStatus, SyncError> {
        let body = self.get(&format!("/rest/db/status?folder={}", self.folder_id))?;
        serde_json::from_value(body).map_err(|e| SyncError::Error(format!("malformed folder status: {e}")))
    }

    fn get_folder_config(&self) -> Result<Value, SyncError> {
        let folders = self.get("/rest/config/folders")?;
        folders
            .as_array()
            .into_iter()
            .flatten()
            .find(|f| f.get("id").and_then(Value::as_str) == Some(self.folder_id.as_str()))
            .cloned()
            .ok_or_else(|| SyncError::NotFound(self.folder_id.clone()))
    }

    pub fn is_folder_paused(&self) -> Result<bool, SyncError> {
        let cfg = self.get_folder_config()?;
        Ok(cfg.get("paused").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Idempotent: only issues a PUT when the folder isn't already
    /// paused, so repeated calls from a retried startup step don't
    /// generate needless config churn.
    pub fn pause_folder(&self) -> Result<bool, SyncError> {
        if !self.enabled() {
            return Ok(true);
        }
        let mut cfg = self.get_folder_config()?;
        if cfg.get("paused").and_then(Value::as_bool) == Some(true) {
            return Ok(true);
        }
        cfg["paused"] = Value::Bool(true);
        self.put(&format!("/rest/config/folders/{}", self.folder_id), &cfg)?;
        Ok(true)
    }

    pub fn resume_folder(&self) -> Result<bool, SyncError> {
        if !self.enabled() {
            return Ok(true);
        }
        let mut cfg = self.get_folder_config()?;
        if cfg.get("paused").and_then(Value::as_bool) == Some(false) {
            return Ok(true);
        }
        cfg["paused"] = Value::Bool(false);
        self.put(&format!("/rest/config/folders/{}", self.folder_id), &cfg)?;
        Ok(true)
    }

    /// Polls until synced, aborts early on error state, gives up after
    /// `timeout`. Returns false (not an `Err`) on either abort path,
    /// since "sync didn't finish in time" is an ordinary outcome the
    /// orchestrator prompts the operator about rather than a fault.
    pub fn wait_for_sync(&self, timeout: Duration, poll_interval: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.get_folder_status() {
                Ok(status) if status.is_synced() => return true,
                Ok(status) if status.has_errors() => return false,
                Ok(_) => {}
                Err(_) => return false,
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(poll_interval);
        }
    }

    pub fn trigger_scan(&self) -> Result<(), SyncError> {
        if !self.enabled() {
            return Ok(());
        }
        self.post(&format!("/rest/db/scan?folder={}", self.folder_id))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
