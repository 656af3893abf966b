// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Default client protocol port; the virtual backend renders on port + 1.
pub const DEFAULT_PORT: u16 = 10543;

/// Resolve state directory: NABD_STATE_DIR > XDG_STATE_HOME/nabd > ~/.local/state/nabd
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("NABD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("nabd"));
    }
    match dirs::home_dir() {
        Some(home) => Ok(home.join(".local/state/nabd")),
        None => Err(LifecycleError::NoStateDir),
    }
}

/// Client port override.
pub fn port() -> Option<u16> {
    std::env::var("NABD_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// Media root override.
pub fn media_root() -> Option<PathBuf> {
    std::env::var("NABD_MEDIA_DIR").ok().map(PathBuf::from)
}

/// Log filter (tracing `EnvFilter` syntax), e.g. `nab_daemon=debug`.
pub fn log_filter() -> String {
    std::env::var("NABD_LOG").unwrap_or_else(|_| "info".to_string())
}
