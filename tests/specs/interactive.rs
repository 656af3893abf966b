// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive slot scenarios.

use super::prelude::*;

/// S4: an interactive grant waits for the running item; the owner's
/// commands then bypass the queue until release.
#[tokio::test]
async fn interactive_grant_waits_then_bypasses() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    let mut b = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "a4",
        "sequence": [{"audio": [MEDIUM_WAV]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();

    b.send(&json!({"type": "mode", "mode": "interactive", "request_id": "m1"})).await.unwrap();
    b.send(&json!({
        "type": "command", "request_id": "b1",
        "sequence": [{"audio": ["test/sounds/beep.wav"]}]
    }))
    .await
    .unwrap();

    // b1 must not start until a4 completes.
    assert_eq!(a.wait_response("a4").await.unwrap()["status"], "ok");
    assert_eq!(b.wait_response("m1").await.unwrap()["status"], "ok");
    b.wait_state("interactive").await.unwrap();
    assert_eq!(b.wait_response("b1").await.unwrap()["status"], "ok");

    let played = scene.daemon.hw.played();
    assert_eq!(
        played,
        vec![
            "test/sounds/medium.wav".to_string(),
            "test/sounds/beep.wav".to_string(),
        ]
    );

    b.send(&json!({"type": "mode", "mode": "idle", "request_id": "m2"})).await.unwrap();
    assert_eq!(b.wait_response("m2").await.unwrap()["status"], "ok");
    b.wait_state("idle").await.unwrap();
}

/// P6: while a writer owns the slot, other writers' commands wait for the
/// release.
#[tokio::test]
async fn other_writers_wait_for_release() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    let mut b = scene.client().await;

    b.send(&json!({"type": "mode", "mode": "interactive", "request_id": "m1"})).await.unwrap();
    assert_eq!(b.wait_response("m1").await.unwrap()["status"], "ok");

    a.send(&json!({
        "type": "command", "request_id": "a1",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(scene.daemon.hw.played().is_empty(), "a1 must wait for the release");

    b.send(&json!({"type": "mode", "mode": "idle"})).await.unwrap();
    assert_eq!(a.wait_response("a1").await.unwrap()["status"], "ok");
    assert_eq!(scene.daemon.hw.played(), vec!["test/sounds/ping.wav".to_string()]);
}

/// An owner disconnect releases the slot for queued work.
#[tokio::test]
async fn owner_disconnect_releases_slot() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    let b = {
        let mut b = scene.client().await;
        b.send(&json!({"type": "mode", "mode": "interactive", "request_id": "m1"}))
            .await
            .unwrap();
        assert_eq!(b.wait_response("m1").await.unwrap()["status"], "ok");
        b
    };

    a.send(&json!({
        "type": "command", "request_id": "a1",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();

    drop(b);
    assert_eq!(a.wait_response("a1").await.unwrap()["status"], "ok");
}
