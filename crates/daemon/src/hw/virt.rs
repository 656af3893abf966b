// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The virtual backend.
//!
//! Implements the full capability set without hardware: actuator state is
//! rendered as one ANSI line per change on an auxiliary TCP socket
//! (daemon port + 1), and scripted sensor input is accepted on the same
//! socket, one command per line:
//!
//! ```text
//! button down|up|click|double_click|triple_click|hold
//! ear left|right <position>
//! rfid detected|removed <tech> <uid> [support] [app]
//! asr <intent>
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nab_core::{
    ButtonKind, Color, Ear, EarPos, HwEvent, Nlu, RfidEventKind, RfidSupport, RfidTag, LED_COUNT,
};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AudioSink, AudioSource, Ears, Hardware, HardwareError, Leds, Rfid, RfidWriteRequest};
use crate::resolver::Sound;

/// Rendered-frame fanout depth; lagging viewers skip frames.
const FRAME_FANOUT: usize = 64;

struct RenderState {
    leds: [Color; LED_COUNT],
    ears: [i16; 2],
    playing: Option<String>,
}

struct Inner {
    sensor_tx: mpsc::Sender<HwEvent>,
    render: Mutex<RenderState>,
    frames: broadcast::Sender<String>,
    queue: Mutex<VecDeque<Arc<Sound>>>,
    flush_gen: AtomicU64,
    utterance: Mutex<Option<Nlu>>,
}

/// The virtual rabbit. Clones share one rendered state.
#[derive(Clone)]
pub struct VirtualHw {
    inner: Arc<Inner>,
}

impl VirtualHw {
    pub fn new(sensor_tx: mpsc::Sender<HwEvent>) -> Self {
        let (frames, _) = broadcast::channel(FRAME_FANOUT);
        Self {
            inner: Arc::new(Inner {
                sensor_tx,
                render: Mutex::new(RenderState {
                    leds: [Color::BLACK; LED_COUNT],
                    ears: [0; 2],
                    playing: None,
                }),
                frames,
                queue: Mutex::new(VecDeque::new()),
                flush_gen: AtomicU64::new(0),
                utterance: Mutex::new(None),
            }),
        }
    }

    pub fn hardware(&self) -> Hardware {
        Hardware {
            leds: Arc::new(self.clone()),
            ears: Arc::new(self.clone()),
            sink: Arc::new(self.clone()),
            source: Some(Arc::new(self.clone())),
            rfid: Some(Arc::new(self.clone())),
        }
    }

    /// Accept viewer/scripting connections on the auxiliary socket.
    pub async fn serve(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "virtual backend client connected");
                    let hw = self.clone();
                    tokio::spawn(async move { hw.handle_client(stream).await });
                }
                Err(e) => {
                    warn!(error = %e, "virtual backend accept error");
                    return;
                }
            }
        }
    }

    async fn handle_client(self, stream: tokio::net::TcpStream) {
        let (read_half, mut write_half) = stream.into_split();
        let mut frames = self.inner.frames.subscribe();
        // Current state first so a fresh viewer has a picture.
        let snapshot = self.render_line();
        let writer = tokio::spawn(async move {
            if write_half.write_all(snapshot.as_bytes()).await.is_err() {
                return;
            }
            loop {
                match frames.recv().await {
                    Ok(frame) => {
                        if write_half.write_all(frame.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if let Some(event) = parse_input(line.trim()) {
                        if let HwEvent::Asr { nlu } = &event {
                            // Also script the next captured utterance.
                            *self.inner.utterance.lock() = Some(nlu.clone());
                        }
                        if self.inner.sensor_tx.send(event).await.is_err() {
                            break;
                        }
                    } else if !line.trim().is_empty() {
                        debug!(input = %line.trim(), "unrecognized virtual input");
                    }
                }
            }
        }
        writer.abort();
    }

    fn publish(&self) {
        let _ = self.inner.frames.send(self.render_line());
    }

    fn render_line(&self) -> String {
        let state = self.inner.render.lock();
        let mut out = String::from("\x1b[2K\r");
        for color in &state.leds {
            out.push_str(&format!("\x1b[48;2;{};{};{}m  ", color.r, color.g, color.b));
        }
        out.push_str("\x1b[0m");
        out.push_str(&format!(" L{:+03} R{:+03}", state.ears[0], state.ears[1]));
        if let Some(playing) = &state.playing {
            out.push_str(&format!(" [{}]", playing));
        }
        out.push('\n');
        out
    }
}

fn parse_input(line: &str) -> Option<HwEvent> {
    let mut words = line.split_whitespace();
    match words.next()? {
        "button" => {
            let kind = match words.next()? {
                "down" => ButtonKind::Down,
                "up" => ButtonKind::Up,
                "click" => ButtonKind::Click,
                "double_click" => ButtonKind::DoubleClick,
                "triple_click" => ButtonKind::TripleClick,
                "hold" => ButtonKind::Hold,
                _ => return None,
            };
            Some(HwEvent::Button(kind))
        }
        "ear" => {
            let ear = match words.next()? {
                "left" => Ear::Left,
                "right" => Ear::Right,
                _ => return None,
            };
            let position = EarPos::clamped(words.next()?.parse().ok()?);
            Some(HwEvent::Ear { ear, position })
        }
        "rfid" => {
            let event = match words.next()? {
                "detected" => RfidEventKind::Detected,
                "removed" => RfidEventKind::Removed,
                _ => return None,
            };
            let tech = words.next()?.to_string();
            let uid = words.next()?.to_string();
            let support = words.next().map(RfidSupport::from).unwrap_or(RfidSupport::Unknown);
            let app = words.next().map(str::to_string);
            Some(HwEvent::Rfid {
                event,
                tag: RfidTag { tech, uid, support, picture: None, app, data: None },
            })
        }
        "asr" => {
            let intent = words.next().map(str::to_string);
            Some(HwEvent::Asr {
                nlu: Nlu { intent, slots: serde_json::Value::Null },
            })
        }
        _ => None,
    }
}

#[async_trait]
impl Leds for VirtualHw {
    async fn set(&self, colors: [Color; LED_COUNT]) -> Result<(), HardwareError> {
        self.inner.render.lock().leds = colors;
        self.publish();
        Ok(())
    }

    fn describe(&self) -> String {
        "virtual 5-led strip".to_string()
    }
}

#[async_trait]
impl Ears for VirtualHw {
    async fn go(&self, ear: Ear, position: EarPos) -> Result<(), HardwareError> {
        let idx = match ear {
            Ear::Left => 0,
            Ear::Right => 1,
        };
        self.inner.render.lock().ears[idx] = position.get();
        self.publish();
        Ok(())
    }

    async fn wait_settled(&self, _ear: Ear) -> Result<(), HardwareError> {
        // Virtual ears arrive instantly.
        Ok(())
    }

    async fn halt(&self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "virtual steppers".to_string()
    }
}

#[async_trait]
impl AudioSink for VirtualHw {
    async fn enqueue(&self, sound: Arc<Sound>) -> Result<(), HardwareError> {
        self.inner.queue.lock().push_back(sound);
        Ok(())
    }

    async fn wait_drained(&self) -> Result<(), HardwareError> {
        loop {
            let gen = self.inner.flush_gen.load(Ordering::SeqCst);
            let next = self.inner.queue.lock().pop_front();
            let Some(sound) = next else {
                self.inner.render.lock().playing = None;
                self.publish();
                return Ok(());
            };
            self.inner.render.lock().playing = Some(sound.name.clone());
            self.publish();
            tokio::time::sleep(sound.duration).await;
            if self.inner.flush_gen.load(Ordering::SeqCst) != gen {
                return Ok(());
            }
        }
    }

    async fn flush(&self) -> Result<(), HardwareError> {
        self.inner.flush_gen.fetch_add(1, Ordering::SeqCst);
        self.inner.queue.lock().clear();
        self.inner.render.lock().playing = None;
        self.publish();
        Ok(())
    }

    fn describe(&self) -> String {
        "virtual sink".to_string()
    }
}

#[async_trait]
impl AudioSource for VirtualHw {
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
        "virtual microphone".to_string()
    }
}

#[async_trait]
impl Rfid for VirtualHw {
    async fn write(&self, request: RfidWriteRequest) -> Result<String, HardwareError> {
        debug!(uid = %request.uid, app = %request.app, "virtual rfid write");
        Ok(request.uid)
    }

    fn describe(&self) -> String {
        "virtual rfid".to_string()
    }
}

#[cfg(test)]
#[path = "virt_tests.rs"]
mod tests;
