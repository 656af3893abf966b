// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-to-writer messages: the state broadcast, sensor events, and
//! responses.

use nab_core::{ButtonKind, Ear, EarPos, Nlu, RfidEventKind, RfidTag, State};
use serde::{Deserialize, Serialize};

use crate::response::Response;

/// A message sent to a writer, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    /// Current state; sent on accept and on every transition.
    State { state: State },

    ButtonEvent {
        event: ButtonKind,
        time: f64,
    },

    EarEvent {
        ear: Ear,
        position: EarPos,
        time: f64,
    },

    RfidEvent {
        #[serde(flatten)]
        tag: RfidTag,
        event: RfidEventKind,
        time: f64,
    },

    AsrEvent {
        nlu: Nlu,
        time: f64,
    },

    Response(Response),
}

impl Msg {
    /// The synthetic event name subscriptions are matched against.
    ///
    /// `None` for responses, which are never filtered. State events have a
    /// name but are broadcast to every writer regardless of subscriptions.
    pub fn event_name(&self) -> Option<String> {
        match self {
            Msg::State { .. } => Some("state".to_string()),
            Msg::ButtonEvent { .. } => Some("button".to_string()),
            Msg::EarEvent { .. } => Some("ears".to_string()),
            Msg::RfidEvent { tag, .. } => Some(match &tag.app {
                Some(app) => format!("rfid/{}", app),
                None => "rfid".to_string(),
            }),
            Msg::AsrEvent { nlu, .. } => Some(match &nlu.intent {
                Some(intent) => format!("asr/{}", intent),
                None => "asr".to_string(),
            }),
            Msg::Response(_) => None,
        }
    }

    /// Whether this message bypasses subscription filtering.
    pub fn is_universal(&self) -> bool {
        matches!(self, Msg::State { .. } | Msg::Response(_))
    }
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
