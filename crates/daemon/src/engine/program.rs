// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed choreography programs.
//!
//! A program is a JSON document of time-quantized frames on a 10 ms base
//! tick. A frame's `tempo` is a tick multiplier that applies to it and
//! every later frame until overridden.

use std::time::Duration;

use nab_core::{Color, EarPos, ResourceRef, LED_COUNT};
use serde::{Deserialize, Serialize};

/// Base quantum of the choreography timeline.
pub const TICK: Duration = Duration::from_millis(10);

/// Ear targets named by side; an absent side keeps its last target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EarTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<EarPos>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<EarPos>,
}

/// One frame. Every field is optional; an empty frame just spends time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Tick multiplier (>= 1) for this and subsequent frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,

    /// Five LED entries; `null` holds the previous color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leds: Option<[Option<Color>; LED_COUNT]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ears: Option<EarTargets>,

    /// Inline audio cue; enqueued without blocking the timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<ResourceRef>,
}

/// A parsed choreography.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub frames: Vec<Frame>,
}

impl Program {
    /// Parse and validate a choreography document.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let program: Program = serde_json::from_slice(bytes)?;
        for frame in &program.frames {
            if frame.tempo == Some(0) {
                return Err(serde::de::Error::custom("frame tempo must be >= 1"));
            }
        }
        Ok(program)
    }

    /// Total timeline length with tempo overrides applied.
    pub fn duration(&self) -> Duration {
        let mut tempo: u32 = 1;
        let mut total = Duration::ZERO;
        for frame in &self.frames {
            if let Some(t) = frame.tempo {
                tempo = t;
            }
            total += TICK * tempo;
        }
        total
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
