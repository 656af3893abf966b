// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic playback and expiration scenarios.

use super::prelude::*;

/// S1: a single audio command cycles idle → playing → idle and plays once.
#[tokio::test]
async fn basic_playback_round_trip() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "a1",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();

    a.wait_state("playing").await.unwrap();
    let response = a.wait_response("a1").await.unwrap();
    assert_eq!(response["status"], "ok");
    a.wait_state("idle").await.unwrap();

    assert_eq!(scene.daemon.hw.played(), vec!["test/sounds/ping.wav".to_string()]);
}

/// S3: a command expired before start issues no hardware calls.
#[tokio::test]
async fn expired_command_has_no_side_effects() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "command", "request_id": "a3",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}],
        "expiration": "2000-01-01T00:00:00Z"
    }))
    .await
    .unwrap();

    let response = a.wait_response("a3").await.unwrap();
    assert_eq!(response["status"], "expired");
    assert!(scene.daemon.hw.calls().is_empty());
}

/// A message brackets its body with the signature on the actual sink.
#[tokio::test]
async fn message_playback_brackets_body() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    a.send(&json!({
        "type": "message", "request_id": "m1",
        "signature": {"audio": ["test/sounds/beep.wav"]},
        "body": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();

    assert_eq!(a.wait_response("m1").await.unwrap()["status"], "ok");
    assert_eq!(
        scene.daemon.hw.played(),
        vec![
            "test/sounds/beep.wav".to_string(),
            "test/sounds/ping.wav".to_string(),
            "test/sounds/beep.wav".to_string(),
        ]
    );
}

/// Responses to one writer come back in submission order.
#[tokio::test]
async fn per_writer_response_order_is_fifo() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;

    for (rid, sound) in [("c1", "ping"), ("c2", "beep"), ("c3", "ping")] {
        a.send(&json!({
            "type": "command", "request_id": rid,
            "sequence": [{"audio": [format!("test/sounds/{}.wav", sound)]}]
        }))
        .await
        .unwrap();
    }

    let mut order = Vec::new();
    while order.len() < 3 {
        let msg = a.read_until_type("response").await.unwrap();
        order.push(msg["request_id"].as_str().unwrap().to_string());
        assert_eq!(msg["status"], "ok");
    }
    assert_eq!(order, vec!["c1", "c2", "c3"]);
}
