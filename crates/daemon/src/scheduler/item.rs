// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work items: the scheduler's unit of queued activity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nab_core::{CommandItem, WriterId};
use nab_wire::{ShutdownMode, TestKind};

/// What a work item does once it reaches the head of the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkKind {
    Command {
        sequence: Vec<CommandItem>,
        cancelable: bool,
        expiration: Option<DateTime<Utc>>,
    },

    /// Signature-body-signature playback.
    Message {
        signature: Option<CommandItem>,
        body: Vec<CommandItem>,
        cancelable: bool,
        expiration: Option<DateTime<Utc>>,
    },

    /// Delayed barrier: drains the rest of the queue first.
    Sleep,

    /// Grant of the interactive slot to the submitting writer.
    Interactive,

    Test {
        which: TestKind,
    },

    RfidWrite {
        tech: String,
        uid: String,
        picture: u8,
        app: String,
        data: Option<String>,
        timeout: Duration,
    },

    ConfigUpdate {
        service: String,
        slot: Option<String>,
    },

    Shutdown {
        mode: ShutdownMode,
    },
}

/// A queued unit of work, tagged with its origin for response delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub origin: WriterId,
    pub request_id: Option<String>,
    pub kind: WorkKind,
}

impl WorkItem {
    pub fn cancelable(&self) -> bool {
        match &self.kind {
            WorkKind::Command { cancelable, .. } | WorkKind::Message { cancelable, .. } => {
                *cancelable
            }
            _ => false,
        }
    }

    /// Expiration as epoch milliseconds, if any.
    pub fn expiration_ms(&self) -> Option<u64> {
        match &self.kind {
            WorkKind::Command { expiration, .. } | WorkKind::Message { expiration, .. } => {
                expiration.map(|e| e.timestamp_millis().max(0) as u64)
            }
            _ => None,
        }
    }

    pub fn expired_at(&self, now_ms: u64) -> bool {
        self.expiration_ms().is_some_and(|e| e <= now_ms)
    }

    /// Whether this item drives actuators. Sleep barriers only yield to
    /// hardware work.
    pub fn is_hardware(&self) -> bool {
        matches!(
            self.kind,
            WorkKind::Command { .. }
                | WorkKind::Message { .. }
                | WorkKind::Test { .. }
                | WorkKind::RfidWrite { .. }
        )
    }

    /// Items the scheduler still dequeues while asleep.
    pub fn runs_while_asleep(&self) -> bool {
        matches!(
            self.kind,
            WorkKind::Sleep
                | WorkKind::Test { .. }
                | WorkKind::ConfigUpdate { .. }
                | WorkKind::Shutdown { .. }
        )
    }

    /// The playback list: a command's sequence, or a message's body
    /// bracketed by its signature.
    pub fn playlist(&self) -> Vec<CommandItem> {
        match &self.kind {
            WorkKind::Command { sequence, .. } => sequence.clone(),
            WorkKind::Message { signature, body, .. } => {
                let mut items = Vec::with_capacity(body.len() + 2);
                if let Some(signature) = signature {
                    items.push(signature.clone());
                }
                items.extend(body.iter().cloned());
                if let Some(signature) = signature {
                    items.push(signature.clone());
                }
                items
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
