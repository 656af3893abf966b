// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource resolution: relative references to preloaded assets.
//!
//! Resolution order per fallback: wildcard expansion across app bundles
//! (uniform random pick, seeded), otherwise locale-first probing. Assets
//! are read into memory at resolve time and cached by path so playback
//! never touches the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nab_core::ResourceRef;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::engine::Program;

/// Byte rate assumed when a WAV header cannot be read (16 kHz, 16-bit mono).
const FALLBACK_BYTE_RATE: u32 = 32_000;

/// A preloaded sound asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    /// Root-relative path, used for logs and test assertions.
    pub name: String,
    pub data: Vec<u8>,
    /// Nominal playback time from the RIFF header.
    pub duration: Duration,
}

/// Errors from resource resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no fallback of {0:?} matched")]
    NotFound(String),

    #[error("unreadable asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad choreography {path}: {source}")]
    BadChoreography {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

enum Cached {
    Sound(Arc<Sound>),
    Choreography(Arc<Program>),
}

/// Maps relative references onto preloaded assets.
pub struct Resolver {
    media_root: PathBuf,
    locale: Mutex<String>,
    rng: Mutex<StdRng>,
    cache: Mutex<HashMap<PathBuf, Cached>>,
}

impl Resolver {
    pub fn new(media_root: impl Into<PathBuf>, locale: impl Into<String>, seed: u64) -> Self {
        Self {
            media_root: media_root.into(),
            locale: Mutex::new(locale.into()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn locale(&self) -> String {
        self.locale.lock().clone()
    }

    /// Swap the active locale; existing cache entries stay valid because
    /// they are keyed by concrete path.
    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.lock() = locale.into();
    }

    pub fn resolve_sound(&self, reference: &ResourceRef) -> Result<Arc<Sound>, ResolveError> {
        let path = self.resolve_path(reference, "sounds")?;
        if let Some(Cached::Sound(sound)) = self.cache.lock().get(&path) {
            return Ok(Arc::clone(sound));
        }
        let data = std::fs::read(&path).map_err(|source| ResolveError::Io {
            path: path.clone(),
            source,
        })?;
        let duration = wav_duration(&data);
        let name = self.relative_name(&path);
        debug!(name = %name, bytes = data.len(), ?duration, "preloaded sound");
        let sound = Arc::new(Sound { name, data, duration });
        self.cache.lock().insert(path, Cached::Sound(Arc::clone(&sound)));
        Ok(sound)
    }

    pub fn resolve_choreography(
        &self,
        reference: &ResourceRef,
    ) -> Result<Arc<Program>, ResolveError> {
        let path = self.resolve_path(reference, "choreographies")?;
        if let Some(Cached::Choreography(program)) = self.cache.lock().get(&path) {
            return Ok(Arc::clone(program));
        }
        let data = std::fs::read(&path).map_err(|source| ResolveError::Io {
            path: path.clone(),
            source,
        })?;
        let program = Program::parse(&data).map_err(|source| ResolveError::BadChoreography {
            path: path.clone(),
            source,
        })?;
        let program = Arc::new(program);
        self.cache.lock().insert(path, Cached::Choreography(Arc::clone(&program)));
        Ok(program)
    }

    /// Walk the fallback list and return the first concrete match.
    fn resolve_path(&self, reference: &ResourceRef, kind: &str) -> Result<PathBuf, ResolveError> {
        for fallback in reference.fallbacks() {
            let found = match fallback.strip_prefix('*') {
                Some(pattern) => self.pick_wildcard(pattern),
                None => self.probe(fallback, kind),
            };
            if let Some(path) = found {
                return Ok(path);
            }
        }
        Err(ResolveError::NotFound(reference.as_str().to_string()))
    }

    /// Locale-first probe. A scoped reference (`app/type/file.wav`) probes
    /// its own directory; a bare filename probes every installed app.
    fn probe(&self, fallback: &str, kind: &str) -> Option<PathBuf> {
        let locale = self.locale();
        let rel = Path::new(fallback);
        if fallback.contains('/') {
            let dir = rel.parent()?;
            let file = rel.file_name()?;
            let localized = self.media_root.join(dir).join(&locale).join(file);
            if localized.is_file() {
                return Some(localized);
            }
            let plain = self.media_root.join(rel);
            return plain.is_file().then_some(plain);
        }
        for app in self.app_dirs() {
            let localized = app.join(kind).join(&locale).join(fallback);
            if localized.is_file() {
                return Some(localized);
            }
            let plain = app.join(kind).join(fallback);
            if plain.is_file() {
                return Some(plain);
            }
        }
        None
    }

    /// Expand a wildcard pattern across all app bundles and pick one match
    /// uniformly at random.
    fn pick_wildcard(&self, pattern: &str) -> Option<PathBuf> {
        let pattern = pattern.trim_start_matches('/');
        let mut matches = Vec::new();
        for app in self.app_dirs() {
            collect_matches(&app, Path::new(pattern), &mut matches);
        }
        matches.sort();
        if matches.is_empty() {
            return None;
        }
        let idx = self.rng.lock().gen_range(0..matches.len());
        matches.into_iter().nth(idx)
    }

    /// Installed app bundles, in stable order.
    fn app_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.media_root)
            .into_iter()
            .flatten()
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.media_root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// Component-wise wildcard match, `*` matching any run within one name.
fn collect_matches(dir: &Path, pattern: &Path, out: &mut Vec<PathBuf>) {
    let mut components = pattern.components();
    let Some(head) = components.next() else {
        return;
    };
    let head = head.as_os_str().to_string_lossy();
    let rest: PathBuf = components.collect();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name_matches(&head, &name) {
            continue;
        }
        let path = entry.path();
        if rest.as_os_str().is_empty() {
            if path.is_file() {
                out.push(path);
            }
        } else if path.is_dir() {
            collect_matches(&path, &rest, out);
        }
    }
}

/// Glob a single name against a single pattern component.
fn name_matches(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, rest)) => {
            let Some(stripped) = name.strip_prefix(prefix) else {
                return false;
            };
            if rest.is_empty() {
                return true;
            }
            // Try the remaining pattern at every suffix position.
            (0..=stripped.len())
                .filter(|i| stripped.is_char_boundary(*i))
                .any(|i| name_matches(rest, &stripped[i..]))
        }
    }
}

/// Nominal duration from a RIFF header: data chunk length over byte rate.
fn wav_duration(data: &[u8]) -> Duration {
    parse_wav(data).unwrap_or_else(|| {
        Duration::from_secs_f64(data.len() as f64 / FALLBACK_BYTE_RATE as f64)
    })
}

fn parse_wav(data: &[u8]) -> Option<Duration> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }
    let mut pos = 12;
    let mut byte_rate = None;
    let mut data_len = None;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        let body = pos + 8;
        if id == b"fmt " && body + 12 <= data.len() {
            byte_rate = Some(u32::from_le_bytes([
                data[body + 8],
                data[body + 9],
                data[body + 10],
                data[body + 11],
            ]));
        }
        if id == b"data" {
            data_len = Some(size);
        }
        // Chunks are word-aligned.
        pos = body + size as usize + (size as usize & 1);
    }
    let rate = byte_rate.filter(|r| *r > 0)?;
    Some(Duration::from_secs_f64(data_len? as f64 / rate as f64))
}

#[cfg(any(test, feature = "test-support"))]
/// Minimal mono 16-bit WAV bytes with the given duration at 16 kHz.
pub fn wav_fixture(duration: Duration) -> Vec<u8> {
    let byte_rate: u32 = FALLBACK_BYTE_RATE;
    let data_len = (duration.as_secs_f64() * byte_rate as f64) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&16_000u32.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(44 + data_len as usize, 0);
    out
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
