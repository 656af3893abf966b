// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle LED animations published by writers via `info` packets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Color;

/// One animation frame. An absent color means "hold previous".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Color>,
}

/// A short LED loop keyed by `info_id`, rotated through while idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleAnimation {
    /// Seconds per frame. Must be positive.
    pub tempo: f64,

    /// Frame sequence. Must be non-empty.
    pub colors: Vec<AnimationFrame>,
}

/// Error for an unplayable animation.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidAnimation {
    #[error("animation tempo must be positive, got {0}")]
    BadTempo(f64),

    #[error("animation has no frames")]
    NoFrames,
}

impl IdleAnimation {
    pub fn validate(&self) -> Result<(), InvalidAnimation> {
        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return Err(InvalidAnimation::BadTempo(self.tempo));
        }
        if self.colors.is_empty() {
            return Err(InvalidAnimation::NoFrames);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "animation_tests.rs"]
mod tests;
