// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses correlated to client packets by `request_id`.

use nab_core::State;
use serde::{Deserialize, Serialize};

/// Final status of a packet or work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failure,
    Error,
    Expired,
    Timeout,
    Canceled,
}

/// Named error class carried by `status=error` / `status=failure` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    ProtocolError,
    InvalidPacket,
    MissingField,
    InvalidParameter,
    InvalidResource,
    HardwareError,
    #[serde(rename = "NFCException")]
    NfcException,
    StateError,
    QueueOverflow,
}

/// Inline payload of a `gestalt` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gestalt {
    pub state: State,
    /// Seconds since daemon start.
    pub uptime: u64,
    /// Connected writer count.
    pub connections: usize,
    /// Per-capability summary from the active backend.
    pub hardware: serde_json::Value,
}

/// A `response` message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// UID of the written tag, for `rfid_write`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub gestalt: Option<Box<Gestalt>>,
}

impl Response {
    pub fn status(status: Status, request_id: Option<String>) -> Self {
        Self { status, request_id, class: None, message: None, uid: None, gestalt: None }
    }

    pub fn ok(request_id: Option<String>) -> Self {
        Self::status(Status::Ok, request_id)
    }

    pub fn error(class: ErrorClass, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            class: Some(class),
            message: Some(message.into()),
            ..Self::status(Status::Error, request_id)
        }
    }

    pub fn failure(
        class: ErrorClass,
        message: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            class: Some(class),
            message: Some(message.into()),
            ..Self::status(Status::Failure, request_id)
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_gestalt(mut self, gestalt: Gestalt) -> Self {
        self.gestalt = Some(Box::new(gestalt));
        self
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
