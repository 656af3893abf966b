// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-to-daemon packets.

use chrono::{DateTime, Utc};
use nab_core::{CommandItem, IdleAnimation};
use serde::{Deserialize, Serialize};

use crate::response::ErrorClass;

/// Default `rfid_write` timeout when the packet carries none.
pub const DEFAULT_RFID_WRITE_TIMEOUT_SECS: f64 = 20.0;

/// Requested mode in a `mode` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Idle,
    Interactive,
}

/// Diagnostic selector in a `test` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Ears,
    Leds,
}

/// Shutdown flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    Halt,
    Reboot,
}

/// A packet received from a writer.
///
/// Schema validation happens once, at parse + [`Packet::validate`] time;
/// everything downstream is total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    /// Publish/revoke an idle animation, or query daemon info.
    Info {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        info_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        animation: Option<IdleAnimation>,
    },

    /// Enqueue a playback sequence.
    Command {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        sequence: Vec<CommandItem>,
        #[serde(default)]
        cancelable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        expiration: Option<DateTime<Utc>>,
    },

    /// Enqueue a signature-body-signature message.
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<CommandItem>,
        body: Vec<CommandItem>,
        #[serde(default)]
        cancelable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        expiration: Option<DateTime<Utc>>,
    },

    /// Update event subscriptions and request/release interactive mode.
    Mode {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        mode: ModeKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        events: Option<Vec<String>>,
    },

    /// Queue-draining sleep barrier.
    Sleep {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Immediate wake from sleep.
    Wakeup {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Cancel the work item submitted with this `request_id`.
    Cancel { request_id: String },

    /// Hardware diagnostic.
    Test {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        test: TestKind,
    },

    /// Daemon status query, answered inline.
    Gestalt {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Write a tag through the RFID reader.
    RfidWrite {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        tech: String,
        uid: String,
        #[serde(default)]
        picture: u8,
        app: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        /// Seconds; defaults to [`DEFAULT_RFID_WRITE_TIMEOUT_SECS`].
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
    },

    /// Service configuration changed on disk.
    #[serde(rename = "config-update")]
    ConfigUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        service: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        slot: Option<String>,
    },

    /// Halt or reboot the daemon host.
    Shutdown {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mode: Option<ShutdownMode>,
    },
}

/// A field-level validation failure, carrying the response error class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalid {
    pub class: ErrorClass,
    pub message: String,
}

impl Invalid {
    fn parameter(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::InvalidParameter, message: message.into() }
    }

    fn packet(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::InvalidPacket, message: message.into() }
    }
}

impl Packet {
    /// The correlation id this packet's response will carry, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Packet::Info { request_id, .. }
            | Packet::Command { request_id, .. }
            | Packet::Message { request_id, .. }
            | Packet::Mode { request_id, .. }
            | Packet::Sleep { request_id }
            | Packet::Wakeup { request_id }
            | Packet::Test { request_id, .. }
            | Packet::Gestalt { request_id }
            | Packet::RfidWrite { request_id, .. }
            | Packet::ConfigUpdate { request_id, .. }
            | Packet::Shutdown { request_id, .. } => request_id.as_deref(),
            Packet::Cancel { request_id } => Some(request_id),
        }
    }

    /// Field-level checks beyond the serde schema.
    pub fn validate(&self) -> Result<(), Invalid> {
        match self {
            Packet::Command { sequence, .. } => {
                if sequence.is_empty() {
                    return Err(Invalid::packet("command sequence is empty"));
                }
                for item in sequence {
                    item.validate().map_err(|e| Invalid::packet(e.to_string()))?;
                }
                Ok(())
            }
            Packet::Message { signature, body, .. } => {
                if body.is_empty() {
                    return Err(Invalid::packet("message body is empty"));
                }
                for item in signature.iter().chain(body) {
                    item.validate().map_err(|e| Invalid::packet(e.to_string()))?;
                }
                Ok(())
            }
            Packet::Info { info_id, animation, .. } => {
                if let (Some(_), Some(anim)) = (info_id, animation) {
                    anim.validate().map_err(|e| Invalid::parameter(e.to_string()))?;
                }
                Ok(())
            }
            Packet::RfidWrite { uid, timeout, .. } => {
                if !is_wire_uid(uid) {
                    return Err(Invalid::parameter(format!("malformed uid {:?}", uid)));
                }
                if let Some(t) = timeout {
                    if !(t.is_finite() && *t > 0.0) {
                        return Err(Invalid::parameter(format!("bad timeout {}", t)));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// UIDs are colon-separated lowercase hex byte pairs.
fn is_wire_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.split(':').all(|b| {
            b.len() == 2 && b.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
        })
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
