// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted fake hardware for tests.
//!
//! Every capability call is recorded in order, the sink "plays" sounds for
//! their nominal duration under tokio's (possibly paused) clock, and
//! failures/latency can be injected per capability.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nab_core::{Color, Ear, EarPos, Nlu, LED_COUNT};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{AudioSink, AudioSource, Ears, Hardware, HardwareError, Leds, Rfid, RfidWriteRequest};
use crate::resolver::Sound;

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    LedsSet([Color; LED_COUNT]),
    EarGo(Ear, i16),
    EarWait(Ear),
    EarsHalt,
    SinkEnqueue(String),
    SinkFlush,
    RfidWrite(String),
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<HwCall>>,
    played: Mutex<Vec<String>>,
    queue: Mutex<VecDeque<Arc<Sound>>>,
    flush_gen: AtomicU64,
    ears: Mutex<[i16; 2]>,
    fail_leds: AtomicBool,
    led_delay: Mutex<Duration>,
    rfid_delay: Mutex<Duration>,
    utterance: Mutex<Option<Nlu>>,
}

/// Shared scripted backend; clone freely, all clones observe one state.
#[derive(Clone, Default)]
pub struct FakeHw {
    inner: Arc<Inner>,
}

impl FakeHw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle with every capability present.
    pub fn hardware(&self) -> Hardware {
        self.hardware_with(true, true)
    }

    pub fn hardware_with(&self, source: bool, rfid: bool) -> Hardware {
        Hardware {
            leds: Arc::new(self.clone()),
            ears: Arc::new(self.clone()),
            sink: Arc::new(self.clone()),
            source: source.then(|| Arc::new(self.clone()) as Arc<dyn AudioSource>),
            rfid: rfid.then(|| Arc::new(self.clone()) as Arc<dyn Rfid>),
        }
    }

    pub fn calls(&self) -> Vec<HwCall> {
        self.inner.calls.lock().clone()
    }

    /// Names of sounds that played to completion, in order.
    pub fn played(&self) -> Vec<String> {
        self.inner.played.lock().clone()
    }

    pub fn ear_positions(&self) -> [i16; 2] {
        *self.inner.ears.lock()
    }

    pub fn led_snapshots(&self) -> Vec<[Color; LED_COUNT]> {
        self.inner
            .calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HwCall::LedsSet(colors) => Some(*colors),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
        self.inner.played.lock().clear();
    }

    pub fn fail_leds(&self, fail: bool) {
        self.inner.fail_leds.store(fail, Ordering::SeqCst);
    }

    pub fn set_led_delay(&self, delay: Duration) {
        *self.inner.led_delay.lock() = delay;
    }

    pub fn set_rfid_delay(&self, delay: Duration) {
        *self.inner.rfid_delay.lock() = delay;
    }

    pub fn set_utterance(&self, nlu: Nlu) {
        *self.inner.utterance.lock() = Some(nlu);
    }

    fn record(&self, call: HwCall) {
        self.inner.calls.lock().push(call);
    }
}

#[async_trait]
impl Leds for FakeHw {
    async fn set(&self, colors: [Color; LED_COUNT]) -> Result<(), HardwareError> {
        let delay = *self.inner.led_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_leds.load(Ordering::SeqCst) {
            return Err(HardwareError::Driver("injected led failure".to_string()));
        }
        self.record(HwCall::LedsSet(colors));
        Ok(())
    }

    fn describe(&self) -> String {
        "fake 5-led strip".to_string()
    }
}

#[async_trait]
impl Ears for FakeHw {
    async fn go(&self, ear: Ear, position: EarPos) -> Result<(), HardwareError> {
        self.inner.ears.lock()[ear_index(ear)] = position.get();
        self.record(HwCall::EarGo(ear, position.get()));
        Ok(())
    }

    async fn wait_settled(&self, ear: Ear) -> Result<(), HardwareError> {
        self.record(HwCall::EarWait(ear));
        Ok(())
    }

    async fn halt(&self) -> Result<(), HardwareError> {
        self.record(HwCall::EarsHalt);
        Ok(())
    }

    fn describe(&self) -> String {
        "fake steppers".to_string()
    }
}

#[async_trait]
impl AudioSink for FakeHw {
    async fn enqueue(&self, sound: Arc<Sound>) -> Result<(), HardwareError> {
        self.record(HwCall::SinkEnqueue(sound.name.clone()));
        self.inner.queue.lock().push_back(sound);
        Ok(())
    }

    async fn wait_drained(&self) -> Result<(), HardwareError> {
        loop {
            let gen = self.inner.flush_gen.load(Ordering::SeqCst);
            let next = self.inner.queue.lock().pop_front();
            let Some(sound) = next else { return Ok(()) };
            tokio::time::sleep(sound.duration).await;
            if self.inner.flush_gen.load(Ordering::SeqCst) == gen {
                self.inner.played.lock().push(sound.name.clone());
            }
        }
    }

    async fn flush(&self) -> Result<(), HardwareError> {
        self.inner.flush_gen.fetch_add(1, Ordering::SeqCst);
        self.inner.queue.lock().clear();
        self.record(HwCall::SinkFlush);
        Ok(())
    }

    fn describe(&self) -> String {
        "fake sink".to_string()
    }
}

#[async_trait]
impl AudioSource for FakeHw {
    async fn capture(&self, stop: CancellationToken) -> Result<Nlu, HardwareError> {
        stop.cancelled().await;
        Ok(self
            .inner
            .utterance
            .lock()
            .take()
            .unwrap_or(Nlu { intent: None, slots: serde_json::Value::Null }))
    }

    fn describe(&self) -> String {
        "fake microphone".to_string()
    }
}

#[async_trait]
impl Rfid for FakeHw {
    async fn write(&self, request: RfidWriteRequest) -> Result<String, HardwareError> {
        let delay = *self.inner.rfid_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(HwCall::RfidWrite(request.uid.clone()));
        Ok(request.uid)
    }

    fn describe(&self) -> String {
        "fake rfid".to_string()
    }
}

fn ear_index(ear: Ear) -> usize {
    match ear {
        Ear::Left => 0,
        Ear::Right => 1,
    }
}
