// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process daemon harness for integration tests.
//!
//! Spawns the full actor wiring (scheduler, dispatcher, listener) against
//! the scripted fake hardware on an ephemeral loopback port, plus a small
//! line-protocol client with read timeouts.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use nab_core::{HwEvent, SystemClock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::dispatcher;
use crate::hw::fake::FakeHw;
use crate::lifecycle::{startup_with, Config, LifecycleError, StartupResult};
use crate::resolver::wav_fixture;

/// Read timeout for client expectations.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A daemon running inside the test process.
pub struct TestDaemon {
    pub addr: SocketAddr,
    pub hw: FakeHw,
    sensors: mpsc::Sender<HwEvent>,
    daemon: StartupResult,
}

impl TestDaemon {
    /// Spawn against `base` (state dir; media under `base/media`).
    pub async fn spawn(base: &Path) -> Result<Self, LifecycleError> {
        let config = Config {
            state_dir: base.to_path_buf(),
            port: 0,
            media_root: base.join("media"),
            locale: "en_US".to_string(),
            seed: 7,
            log_path: base.join("nabd.log"),
            lock_path: base.join("nabd.pid"),
        };
        std::fs::create_dir_all(&config.media_root)?;
        let (sensor_tx, sensor_rx) = dispatcher::channel();
        let hw = FakeHw::new();
        let daemon =
            startup_with(&config, hw.hardware(), sensor_rx, SystemClock, None).await?;
        Ok(Self { addr: daemon.local_addr, hw, sensors: sensor_tx, daemon })
    }

    /// Inject a scripted sensor event.
    pub async fn push_event(&self, event: HwEvent) -> bool {
        self.sensors.send(event).await.is_ok()
    }

    pub fn stop(&self) {
        self.daemon.abort();
    }
}

/// Write the standard media fixtures under `base/media/test/`.
pub fn write_media_fixtures(base: &Path) -> std::io::Result<()> {
    let sounds = base.join("media/test/sounds");
    std::fs::create_dir_all(&sounds)?;
    std::fs::write(sounds.join("ping.wav"), wav_fixture(Duration::from_millis(100)))?;
    std::fs::write(sounds.join("beep.wav"), wav_fixture(Duration::from_millis(50)))?;
    std::fs::write(sounds.join("long.wav"), wav_fixture(Duration::from_secs(10)))?;

    let chors = base.join("media/test/choreographies");
    std::fs::create_dir_all(&chors)?;
    let blink = serde_json::json!({
        "frames": [
            { "leds": ["ff0000", null, null, null, null] },
            { "leds": ["000000", null, null, null, null] },
        ]
    });
    std::fs::write(chors.join("blink.chor"), serde_json::to_vec(&blink)?)?;
    Ok(())
}

/// A line-protocol client speaking one JSON object per line.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect; the daemon's handshake `state` message is left unread for
    /// the caller to assert on.
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self { reader: BufReader::new(read_half), writer })
    }

    pub async fn send(&mut self, packet: &serde_json::Value) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(packet)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await
    }

    pub async fn send_raw(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Read one message, bounded by the harness timeout.
    pub async fn read_msg(&mut self) -> std::io::Result<serde_json::Value> {
        let mut line = String::new();
        let n = tokio::time::timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no message"))??;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            ));
        }
        serde_json::from_str(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Skip messages until one of the given `type` arrives.
    pub async fn read_until_type(&mut self, ty: &str) -> std::io::Result<serde_json::Value> {
        loop {
            let msg = self.read_msg().await?;
            if msg["type"] == ty {
                return Ok(msg);
            }
        }
    }

    /// Skip messages until the response correlated to `request_id`.
    pub async fn wait_response(&mut self, request_id: &str) -> std::io::Result<serde_json::Value> {
        loop {
            let msg = self.read_msg().await?;
            if msg["type"] == "response" && msg["request_id"] == request_id {
                return Ok(msg);
            }
        }
    }

    /// Skip messages until a `state` event with the given value arrives.
    pub async fn wait_state(&mut self, state: &str) -> std::io::Result<serde_json::Value> {
        loop {
            let msg = self.read_msg().await?;
            if msg["type"] == "state" && msg["state"] == state {
                return Ok(msg);
            }
        }
    }
}
