// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's high-level states.

use serde::{Deserialize, Serialize};

/// High-level daemon state, broadcast to every writer on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Idle,
    Playing,
    Interactive,
    Recording,
    Asleep,
}

impl State {
    pub fn is_asleep(&self) -> bool {
        matches!(self, State::Asleep)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Idle => "idle",
            State::Playing => "playing",
            State::Interactive => "interactive",
            State::Recording => "recording",
            State::Asleep => "asleep",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
