// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sensor dispatcher.
//!
//! Hardware drivers push events into one channel; the dispatcher stamps
//! them, applies side effects (click-cancel, hold-to-record, RFID picture
//! annotation), and broadcasts filtered copies to subscribed writers.
//! Sensor events never touch the work queue.

use std::collections::HashMap;
use std::sync::Arc;

use nab_core::{ButtonKind, Clock, HwEvent, RfidSupport};
use nab_wire::Msg;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::hw::AudioSource;
use crate::registry::Registry;
use crate::scheduler::SchedulerMsg;
use crate::status::SharedStatus;

/// Sensor channel depth.
pub const SENSOR_CHANNEL_BOUND: usize = 64;

pub struct Dispatcher<C: Clock> {
    rx: mpsc::Receiver<HwEvent>,
    registry: Registry,
    sched_tx: mpsc::Sender<SchedulerMsg>,
    clock: C,
    status: SharedStatus,
    source: Option<Arc<dyn AudioSource>>,
    rfid_pictures: Arc<Mutex<HashMap<String, u8>>>,
    capture: Option<CancellationToken>,
}

/// Build the sensor fan-in channel.
pub fn channel() -> (mpsc::Sender<HwEvent>, mpsc::Receiver<HwEvent>) {
    mpsc::channel(SENSOR_CHANNEL_BOUND)
}

impl<C: Clock> Dispatcher<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rx: mpsc::Receiver<HwEvent>,
        registry: Registry,
        sched_tx: mpsc::Sender<SchedulerMsg>,
        clock: C,
        status: SharedStatus,
        source: Option<Arc<dyn AudioSource>>,
        rfid_pictures: Arc<Mutex<HashMap<String, u8>>>,
    ) -> Self {
        Self { rx, registry, sched_tx, clock, status, source, rfid_pictures, capture: None }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            let time = self.clock.epoch_secs_f64();
            self.handle(event, time).await;
        }
    }

    async fn handle(&mut self, event: HwEvent, time: f64) {
        match event {
            HwEvent::Button(kind) => {
                match kind {
                    ButtonKind::Click => {
                        // Cancels the running item iff it is cancelable;
                        // the scheduler decides, the click is broadcast
                        // either way.
                        if self.sched_tx.send(SchedulerMsg::ButtonClick).await.is_err() {
                            warn!("scheduler gone, dropping click side effect");
                        }
                    }
                    ButtonKind::Hold => self.start_capture().await,
                    ButtonKind::Up => self.stop_capture(),
                    _ => {}
                }
                self.registry.broadcast(&Msg::ButtonEvent { event: kind, time });
            }
            HwEvent::Ear { ear, position } => {
                self.registry.broadcast(&Msg::EarEvent { ear, position, time });
            }
            HwEvent::Rfid { event, mut tag } => {
                if tag.support == RfidSupport::Formatted {
                    if let Some(app) = &tag.app {
                        if let Some(picture) = self.rfid_pictures.lock().get(app) {
                            tag.picture = Some(*picture);
                        }
                    }
                }
                self.registry.broadcast(&Msg::RfidEvent { tag, event, time });
            }
            HwEvent::Asr { nlu } => {
                self.registry.broadcast(&Msg::AsrEvent { nlu, time });
            }
        }
    }

    /// Button hold while awake starts audio capture and the transient
    /// `recording` state. Asleep daemons ignore holds.
    async fn start_capture(&mut self) {
        if self.status.state().is_asleep() || self.capture.is_some() {
            return;
        }
        let Some(source) = self.source.clone() else {
            debug!("no audio source, ignoring hold");
            return;
        };
        let stop = CancellationToken::new();
        self.capture = Some(stop.clone());
        let _ = self.sched_tx.send(SchedulerMsg::SetRecording(true)).await;

        let registry = self.registry.clone();
        let sched_tx = self.sched_tx.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            match source.capture(stop).await {
                Ok(nlu) => {
                    let time = clock.epoch_secs_f64();
                    registry.broadcast(&Msg::AsrEvent { nlu, time });
                }
                // Sensor-path errors are logged and the event dropped.
                Err(e) => warn!(error = %e, "audio capture failed"),
            }
            let _ = sched_tx.send(SchedulerMsg::SetRecording(false)).await;
        });
    }

    fn stop_capture(&mut self) {
        if let Some(stop) = self.capture.take() {
            stop.cancel();
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
