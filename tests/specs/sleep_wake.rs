// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sleep barrier and wake scenarios.

use super::prelude::*;

/// S5: a sleep waits for everything queued before it, then any writer's
/// wakeup returns the daemon to idle.
#[tokio::test]
async fn sleep_queues_behind_pending_work() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "x",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();
    a.send(&json!({
        "type": "command", "request_id": "y",
        "sequence": [{"audio": ["test/sounds/beep.wav"]}]
    }))
    .await
    .unwrap();
    a.send(&json!({"type": "sleep", "request_id": "z"})).await.unwrap();

    assert_eq!(a.wait_response("x").await.unwrap()["status"], "ok");
    assert_eq!(a.wait_response("y").await.unwrap()["status"], "ok");
    assert_eq!(a.wait_response("z").await.unwrap()["status"], "ok");
    a.wait_state("asleep").await.unwrap();
    assert_eq!(
        scene.daemon.hw.played(),
        vec!["test/sounds/ping.wav".to_string(), "test/sounds/beep.wav".to_string()]
    );

    // Any writer may wake the daemon.
    let mut b = scene.client().await;
    b.send(&json!({"type": "wakeup", "request_id": "w"})).await.unwrap();
    assert_eq!(b.wait_response("w").await.unwrap()["status"], "ok");
    a.wait_state("idle").await.unwrap();
}

/// A new connection during sleep handshakes with `asleep`.
#[tokio::test]
async fn handshake_reports_asleep() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    a.send(&json!({"type": "sleep", "request_id": "s"})).await.unwrap();
    a.wait_response("s").await.unwrap();

    let mut b = nab_daemon::testkit::Client::connect(scene.daemon.addr).await.unwrap();
    let handshake = b.read_msg().await.unwrap();
    assert_eq!(handshake["type"], "state");
    assert_eq!(handshake["state"], "asleep");
}

/// Commands sent to a sleeping rabbit wait for the wake.
#[tokio::test]
async fn asleep_daemon_defers_playback() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    a.send(&json!({"type": "sleep", "request_id": "s"})).await.unwrap();
    a.wait_response("s").await.unwrap();

    a.send(&json!({
        "type": "command", "request_id": "c1",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();
    // Give the daemon a moment; nothing must play while asleep.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(scene.daemon.hw.played().is_empty());

    a.send(&json!({"type": "wakeup"})).await.unwrap();
    assert_eq!(a.wait_response("c1").await.unwrap()["status"], "ok");
    assert_eq!(scene.daemon.hw.played(), vec!["test/sounds/ping.wav".to_string()]);
}

/// `test` diagnostics run immediately even while asleep.
#[tokio::test]
async fn diagnostics_run_while_asleep() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    a.send(&json!({"type": "sleep", "request_id": "s"})).await.unwrap();
    a.wait_response("s").await.unwrap();

    a.send(&json!({"type": "test", "test": "ears", "request_id": "t"})).await.unwrap();
    assert_eq!(a.wait_response("t").await.unwrap()["status"], "ok");

    // Still asleep afterwards.
    let mut b = scene.client().await;
    b.send(&json!({"type": "gestalt", "request_id": "g"})).await.unwrap();
    assert_eq!(b.wait_response("g").await.unwrap()["state"], "asleep");
}
