// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ear identifiers and stepper target positions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Valid ear target positions, inclusive.
pub const EAR_RANGE: std::ops::RangeInclusive<i16> = -17..=17;

/// Which ear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Left,
    Right,
}

impl std::fmt::Display for Ear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ear::Left => write!(f, "left"),
            Ear::Right => write!(f, "right"),
        }
    }
}

/// A stepper target position in `[-17, +17]`.
///
/// The wire layer validates; the ear controller additionally clamps, so a
/// position that reaches hardware is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EarPos(i16);

/// Error for an out-of-range ear position.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("ear position {0} out of range [-17, +17]")]
pub struct EarPosOutOfRange(pub i16);

impl EarPos {
    pub const ZERO: EarPos = EarPos(0);

    pub fn try_new(pos: i16) -> Result<Self, EarPosOutOfRange> {
        if EAR_RANGE.contains(&pos) {
            Ok(Self(pos))
        } else {
            Err(EarPosOutOfRange(pos))
        }
    }

    /// Clamp into range, the ear controller's behavior for raw targets.
    pub fn clamped(pos: i16) -> Self {
        Self(pos.clamp(*EAR_RANGE.start(), *EAR_RANGE.end()))
    }

    pub fn get(&self) -> i16 {
        self.0
    }
}

impl std::fmt::Display for EarPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EarPos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.0)
    }
}

impl<'de> Deserialize<'de> for EarPos {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i16::deserialize(deserializer)?;
        Self::try_new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "ear_tests.rs"]
mod tests;
