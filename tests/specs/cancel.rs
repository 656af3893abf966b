// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation scenarios.

use super::prelude::*;

/// S2: cancel mid-play flushes audio, clears LEDs, returns to idle.
#[tokio::test]
async fn cancel_mid_play_cleans_up() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "a2", "cancelable": true,
        "sequence": [{"audio": ["test/sounds/long.wav"]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();

    a.send(&json!({"type": "cancel", "request_id": "a2"})).await.unwrap();
    let response = a.wait_response("a2").await.unwrap();
    assert_eq!(response["status"], "canceled");
    a.wait_state("idle").await.unwrap();

    let calls = scene.daemon.hw.calls();
    use nab_daemon::hw::fake::HwCall;
    assert!(calls.contains(&HwCall::SinkFlush), "audio must be flushed");
    assert!(
        calls.iter().any(|c| matches!(c, HwCall::LedsSet(s) if s.iter().all(|c| c.is_black()))),
        "LEDs must be cleared to black"
    );
    assert!(scene.daemon.hw.played().is_empty());
}

/// P4: a second cancel with the same request id is an error.
#[tokio::test]
async fn cancel_is_not_idempotent_by_design() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "a2", "cancelable": true,
        "sequence": [{"audio": ["test/sounds/long.wav"]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();

    a.send(&json!({"type": "cancel", "request_id": "a2"})).await.unwrap();
    assert_eq!(a.wait_response("a2").await.unwrap()["status"], "canceled");

    a.send(&json!({"type": "cancel", "request_id": "a2"})).await.unwrap();
    let second = a.wait_response("a2").await.unwrap();
    assert_eq!(second["status"], "error");
    assert_eq!(second["class"], "StateError");
}

/// Cancel of a non-cancelable running item is refused.
#[tokio::test]
async fn noncancelable_item_refuses_cancel() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "c1",
        "sequence": [{"audio": [MEDIUM_WAV]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();

    a.send(&json!({"type": "cancel", "request_id": "c1"})).await.unwrap();
    let refused = a.wait_response("c1").await.unwrap();
    assert_eq!(refused["status"], "error");
    assert_eq!(refused["class"], "StateError");

    // The item still completes.
    let done = a.wait_response("c1").await.unwrap();
    assert_eq!(done["status"], "ok");
}

/// I7: a short click cancels cancelable playback; the click is broadcast
/// either way.
#[tokio::test]
async fn click_cancels_cancelable_playback() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    a.send(&json!({"type": "mode", "mode": "idle", "events": ["button"], "request_id": "m"}))
        .await
        .unwrap();
    a.wait_response("m").await.unwrap();

    a.send(&json!({
        "type": "command", "request_id": "c1", "cancelable": true,
        "sequence": [{"audio": ["test/sounds/long.wav"]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();

    scene.daemon.push_event(nab_core::HwEvent::Button(nab_core::ButtonKind::Click)).await;

    // Both the broadcast click and the canceled response arrive, in
    // whichever order the daemon observed them.
    let mut saw_click = false;
    let mut canceled = false;
    while !(saw_click && canceled) {
        let msg = a.read_msg().await.unwrap();
        match msg["type"].as_str() {
            Some("button_event") => {
                assert_eq!(msg["event"], "click");
                saw_click = true;
            }
            Some("response") if msg["request_id"] == "c1" => {
                assert_eq!(msg["status"], "canceled");
                canceled = true;
            }
            _ => {}
        }
    }
}
