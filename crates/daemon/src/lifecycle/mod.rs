// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod startup;

pub use startup::{startup, startup_with, StartupResult};

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::env;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/nabd).
    pub state_dir: PathBuf,
    /// Client protocol port on loopback.
    pub port: u16,
    /// Root of installed app asset bundles.
    pub media_root: PathBuf,
    /// Active locale for resource resolution.
    pub locale: String,
    /// Seed for wildcard resource choice (virtual backend determinism).
    pub seed: u64,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
}

/// On-disk `nabd.toml`; every field optional, defaults fill the rest.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    media_root: Option<PathBuf>,
    locale: Option<String>,
    seed: Option<u64>,
}

/// Errors during startup and shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory")]
    NoStateDir,

    #[error("another daemon holds the lock at {0}")]
    AlreadyRunning(PathBuf),

    #[error("bad config {path}: {message}")]
    BadConfig { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Config {
    /// Load configuration: defaults, then `nabd.toml`, then env overrides.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Self::load_from(state_dir)
    }

    pub fn load_from(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let file = read_config_file(&state_dir)?.unwrap_or_default();
        let port = env::port().or(file.port).unwrap_or(env::DEFAULT_PORT);
        let media_root = env::media_root()
            .or(file.media_root)
            .unwrap_or_else(|| state_dir.join("media"));
        Ok(Self {
            port,
            media_root,
            locale: file.locale.unwrap_or_else(|| "en_US".to_string()),
            seed: file.seed.unwrap_or(0),
            log_path: state_dir.join("nabd.log"),
            lock_path: state_dir.join("nabd.pid"),
            state_dir,
        })
    }

    /// Port the virtual backend renders on.
    pub fn virtual_port(&self) -> u16 {
        self.port.wrapping_add(1)
    }
}

fn read_config_file(state_dir: &Path) -> Result<Option<ConfigFile>, LifecycleError> {
    let path = state_dir.join("nabd.toml");
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| LifecycleError::BadConfig { path, message: e.to_string() })
}

/// Re-read the configured locale, for `config-update` packets.
pub fn read_locale(state_dir: &Path) -> Option<String> {
    match read_config_file(state_dir) {
        Ok(file) => file.and_then(|f| f.locale),
        Err(e) => {
            warn!(error = %e, "locale reload failed");
            None
        }
    }
}

/// Exclusive PID lock held for the daemon lifetime.
pub struct PidLock {
    // NOTE(lifetime): held to maintain the exclusive file lock; released on drop
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PidLock {
    pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        use fs2::FileExt;
        use std::io::Write;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| LifecycleError::AlreadyRunning(path.to_path_buf()))?;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { file, path: path.to_path_buf() })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(error = %e, "failed to remove pid file");
        }
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests.rs"]
mod tests;
