// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event fanout and subscription filter scenarios.

use super::prelude::*;
use nab_core::{HwEvent, RfidEventKind, RfidSupport, RfidTag};

fn rfid(app: &str, uid: &str) -> HwEvent {
    HwEvent::Rfid {
        event: RfidEventKind::Detected,
        tag: RfidTag {
            tech: "st25".to_string(),
            uid: uid.to_string(),
            support: RfidSupport::Empty,
            picture: None,
            app: Some(app.to_string()),
            data: None,
        },
    }
}

/// S6: `rfid/weather` sees only weather tags; `rfid/*` sees every tag.
#[tokio::test]
async fn subscription_filter_fans_out_selectively() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    let mut b = scene.client().await;

    a.send(&json!({"type": "mode", "mode": "idle", "events": ["rfid/weather"], "request_id": "ma"}))
        .await
        .unwrap();
    a.wait_response("ma").await.unwrap();
    b.send(&json!({"type": "mode", "mode": "idle", "events": ["rfid/*"], "request_id": "mb"}))
        .await
        .unwrap();
    b.wait_response("mb").await.unwrap();

    scene.daemon.push_event(rfid("weather", "d0:01")).await;
    assert_eq!(a.read_until_type("rfid_event").await.unwrap()["uid"], "d0:01");
    assert_eq!(b.read_until_type("rfid_event").await.unwrap()["uid"], "d0:01");

    scene.daemon.push_event(rfid("clock", "d0:02")).await;
    assert_eq!(b.read_until_type("rfid_event").await.unwrap()["uid"], "d0:02");

    // A never sees the clock tag: the next thing A receives after a fence
    // query is the fence response.
    a.send(&json!({"type": "gestalt", "request_id": "fence"})).await.unwrap();
    let next = a.read_msg().await.unwrap();
    assert_eq!(next["type"], "response");
    assert_eq!(next["request_id"], "fence");
}

/// A writer with no subscriptions receives no events, but state is
/// universal.
#[tokio::test]
async fn unsubscribed_writers_still_get_state() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    let mut b = scene.client().await;
    b.send(&json!({"type": "mode", "mode": "idle", "events": ["button"], "request_id": "mb"}))
        .await
        .unwrap();
    b.wait_response("mb").await.unwrap();

    scene.daemon.push_event(HwEvent::Button(nab_core::ButtonKind::Down)).await;
    assert_eq!(b.read_until_type("button_event").await.unwrap()["event"], "down");

    // A (unsubscribed) still sees state transitions from playback.
    a.send(&json!({
        "type": "command", "request_id": "c1",
        "sequence": [{"audio": ["test/sounds/ping.wav"]}]
    }))
    .await
    .unwrap();
    a.wait_state("playing").await.unwrap();
    a.wait_state("idle").await.unwrap();
}

/// Formatted tags for an app with a written picture are annotated.
#[tokio::test]
async fn rfid_picture_annotation_round_trip() {
    let scene = Scene::start().await;
    let mut a = scene.client().await;
    a.send(&json!({"type": "mode", "mode": "idle", "events": ["rfid/*"], "request_id": "m"}))
        .await
        .unwrap();
    a.wait_response("m").await.unwrap();

    a.send(&json!({
        "type": "rfid_write", "request_id": "w1",
        "tech": "st25", "uid": "d0:02:1a:03", "picture": 6, "app": "weather"
    }))
    .await
    .unwrap();
    let written = a.wait_response("w1").await.unwrap();
    assert_eq!(written["status"], "ok");
    assert_eq!(written["uid"], "d0:02:1a:03");

    scene
        .daemon
        .push_event(HwEvent::Rfid {
            event: RfidEventKind::Detected,
            tag: RfidTag {
                tech: "st25".to_string(),
                uid: "d0:02:1a:03".to_string(),
                support: RfidSupport::Formatted,
                picture: None,
                app: Some("weather".to_string()),
                data: None,
            },
        })
        .await;
    let event = a.read_until_type("rfid_event").await.unwrap();
    assert_eq!(event["picture"], 6);
    assert_eq!(event["support"], "formatted");
}

/// Hold-to-record broadcasts the decoded utterance and the transient
/// recording state.
#[tokio::test]
async fn hold_records_and_broadcasts_asr() {
    let scene = Scene::start().await;
    scene.daemon.hw.set_utterance(nab_core::Nlu {
        intent: Some("weather_forecast".to_string()),
        slots: serde_json::Value::Null,
    });
    let mut a = scene.client().await;
    a.send(&json!({"type": "mode", "mode": "idle", "events": ["asr/*"], "request_id": "m"}))
        .await
        .unwrap();
    a.wait_response("m").await.unwrap();

    scene.daemon.push_event(HwEvent::Button(nab_core::ButtonKind::Hold)).await;
    a.wait_state("recording").await.unwrap();
    scene.daemon.push_event(HwEvent::Button(nab_core::ButtonKind::Up)).await;

    let asr = a.read_until_type("asr_event").await.unwrap();
    assert_eq!(asr["nlu"]["intent"], "weather_forecast");
    a.wait_state("idle").await.unwrap();
}
