// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actuator and sensor capabilities.
//!
//! The real drivers, the virtual backend, and the test fakes each
//! implement these traits; everything above them (engine, scheduler,
//! dispatcher) is backend-agnostic. Sensors are not traits: drivers push
//! [`nab_core::HwEvent`]s into the dispatcher channel they are given at
//! construction.

pub mod virt;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nab_core::{Color, Ear, EarPos, Nlu, LED_COUNT};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::resolver::Sound;

/// Upper bound on any single actuator call.
pub const HW_CALL_DEADLINE: Duration = Duration::from_millis(500);

/// Upper bound on waiting for an ear to reach its target.
pub const EAR_TRAVEL_DEADLINE: Duration = Duration::from_secs(5);

/// Errors surfaced by capability calls.
#[derive(Debug, Clone, Error)]
pub enum HardwareError {
    #[error("hardware call timed out after {0:?}")]
    Timeout(Duration),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("no RFID reader present")]
    NoRfid,

    #[error("tag incompatible: {0}")]
    TagIncompatible(String),
}

/// The five-LED strip. Writes are idempotent full snapshots.
#[async_trait]
pub trait Leds: Send + Sync {
    async fn set(&self, colors: [Color; LED_COUNT]) -> Result<(), HardwareError>;

    async fn clear(&self) -> Result<(), HardwareError> {
        self.set([Color::BLACK; LED_COUNT]).await
    }

    fn describe(&self) -> String;
}

/// The two stepper-driven ears. Targets are absolute positions; movement
/// is asynchronous at the controller's own rate.
#[async_trait]
pub trait Ears: Send + Sync {
    /// Issue a new target. Returns as soon as the controller accepts it.
    async fn go(&self, ear: Ear, position: EarPos) -> Result<(), HardwareError>;

    /// Wait until the ear stops moving.
    async fn wait_settled(&self, ear: Ear) -> Result<(), HardwareError>;

    /// Stop both ears where they are.
    async fn halt(&self) -> Result<(), HardwareError>;

    fn describe(&self) -> String;
}

/// The single audio output. Sounds play in enqueue order.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn enqueue(&self, sound: Arc<Sound>) -> Result<(), HardwareError>;

    /// Wait until everything enqueued so far has finished playing.
    async fn wait_drained(&self) -> Result<(), HardwareError>;

    /// Stop playback and drop the queue.
    async fn flush(&self) -> Result<(), HardwareError>;

    fn describe(&self) -> String;
}

/// The microphone plus utterance decoding.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Capture until `stop` fires, then decode the utterance.
    async fn capture(&self, stop: CancellationToken) -> Result<Nlu, HardwareError>;

    fn describe(&self) -> String;
}

/// Parameters for writing an RFID tag.
#[derive(Debug, Clone)]
pub struct RfidWriteRequest {
    pub tech: String,
    pub uid: String,
    pub picture: u8,
    pub app: String,
    pub data: Option<String>,
}

/// The RFID writer half. Detection events arrive through the sensor channel.
#[async_trait]
pub trait Rfid: Send + Sync {
    /// Write the tag currently on the reader; returns the written uid.
    async fn write(&self, request: RfidWriteRequest) -> Result<String, HardwareError>;

    fn describe(&self) -> String;
}

/// The full capability bundle handed to the engine and scheduler.
#[derive(Clone)]
pub struct Hardware {
    pub leds: Arc<dyn Leds>,
    pub ears: Arc<dyn Ears>,
    pub sink: Arc<dyn AudioSink>,
    pub source: Option<Arc<dyn AudioSource>>,
    pub rfid: Option<Arc<dyn Rfid>>,
}

impl Hardware {
    /// Per-capability summary for `gestalt` responses.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "leds": self.leds.describe(),
            "ears": self.ears.describe(),
            "sound": self.sink.describe(),
            "sound_input": self.source.as_ref().map(|s| s.describe()),
            "rfid": self.rfid.as_ref().map(|r| r.describe()),
        })
    }
}

/// Bound an actuator call so a wedged driver cannot stall the scheduler.
pub async fn deadline<T, F>(fut: F) -> Result<T, HardwareError>
where
    F: Future<Output = Result<T, HardwareError>>,
{
    bounded(HW_CALL_DEADLINE, fut).await
}

/// [`deadline`] with a caller-chosen bound.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, HardwareError>
where
    F: Future<Output = Result<T, HardwareError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(HardwareError::Timeout(limit)),
    }
}
