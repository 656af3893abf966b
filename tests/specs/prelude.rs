// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared setup for daemon scenario tests.

use nab_daemon::testkit::{write_media_fixtures, Client, TestDaemon};
use tempfile::TempDir;

pub use serde_json::json;

/// 300 ms sound for "runs long enough to observe" cases.
pub const MEDIUM_WAV: &str = "test/sounds/medium.wav";

pub struct Scene {
    pub daemon: TestDaemon,
    _tmp: TempDir,
}

impl Scene {
    pub async fn start() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_media_fixtures(tmp.path()).expect("fixtures");
        let sounds = tmp.path().join("media/test/sounds");
        std::fs::write(
            sounds.join("medium.wav"),
            nab_daemon::resolver::wav_fixture(std::time::Duration::from_millis(300)),
        )
        .expect("medium fixture");
        let daemon = TestDaemon::spawn(tmp.path()).await.expect("daemon");
        Self { daemon, _tmp: tmp }
    }

    /// Connect and consume the handshake state message.
    pub async fn client(&self) -> Client {
        let mut client = Client::connect(self.daemon.addr).await.expect("connect");
        let first = client.read_msg().await.expect("handshake");
        assert_eq!(first["type"], "state", "daemon must speak first with its state");
        client
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.daemon.stop();
    }
}
