// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware events as pushed by the drivers, before timestamping and
//! broadcast by the sensor dispatcher.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Ear, EarPos};

/// Button gesture as classified by the button driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    Down,
    Up,
    Click,
    DoubleClick,
    TripleClick,
    Hold,
}

/// RFID tag detection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfidEventKind {
    Detected,
    Removed,
}

/// What the reader made of the tag's data area.
///
/// The taxonomy is open: values outside the known set round-trip as opaque
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfidSupport {
    Formatted,
    ForeignData,
    Locked,
    Empty,
    Unknown,
    Other(String),
}

impl RfidSupport {
    pub fn as_str(&self) -> &str {
        match self {
            RfidSupport::Formatted => "formatted",
            RfidSupport::ForeignData => "foreign-data",
            RfidSupport::Locked => "locked",
            RfidSupport::Empty => "empty",
            RfidSupport::Unknown => "unknown",
            RfidSupport::Other(s) => s,
        }
    }
}

impl From<&str> for RfidSupport {
    fn from(s: &str) -> Self {
        match s {
            "formatted" => RfidSupport::Formatted,
            "foreign-data" => RfidSupport::ForeignData,
            "locked" => RfidSupport::Locked,
            "empty" => RfidSupport::Empty,
            "unknown" => RfidSupport::Unknown,
            other => RfidSupport::Other(other.to_string()),
        }
    }
}

impl Serialize for RfidSupport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RfidSupport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RfidSupport::from(s.as_str()))
    }
}

/// A detected RFID tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfidTag {
    pub tech: String,

    /// Colon-separated lowercase hex bytes.
    pub uid: String,

    pub support: RfidSupport,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// NLU decode of a captured utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nlu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(default)]
    pub slots: serde_json::Value,
}

/// An event pushed by a hardware driver into the dispatcher channel.
#[derive(Debug, Clone, PartialEq)]
pub enum HwEvent {
    Button(ButtonKind),
    Ear { ear: Ear, position: EarPos },
    Rfid { event: RfidEventKind, tag: RfidTag },
    Asr { nlu: Nlu },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
