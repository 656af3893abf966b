// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nab_core::{RfidSupport, RfidTag};

fn rfid_tag(app: Option<&str>) -> RfidTag {
    RfidTag {
        tech: "st25".to_string(),
        uid: "d0:02:1a:03".to_string(),
        support: RfidSupport::Formatted,
        picture: Some(2),
        app: app.map(str::to_string),
        data: None,
    }
}

#[test]
fn state_message_wire_form() {
    let json = serde_json::to_value(Msg::State { state: State::Playing }).unwrap();
    assert_eq!(json, serde_json::json!({"type": "state", "state": "playing"}));
}

#[test]
fn response_fields_are_inlined() {
    let msg = Msg::Response(crate::Response::ok(Some("a1".to_string())));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "response");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["request_id"], "a1");
    let back: Msg = serde_json::from_value(json).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn rfid_event_flattens_tag() {
    let msg = Msg::RfidEvent { tag: rfid_tag(Some("weather")), event: RfidEventKind::Detected, time: 12.5 };
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "rfid_event");
    assert_eq!(json["uid"], "d0:02:1a:03");
    assert_eq!(json["event"], "detected");
    assert_eq!(json["app"], "weather");
    let back: Msg = serde_json::from_value(json).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn event_names_follow_packet_content() {
    assert_eq!(Msg::State { state: State::Idle }.event_name().unwrap(), "state");
    assert_eq!(
        Msg::ButtonEvent { event: ButtonKind::Click, time: 0.0 }.event_name().unwrap(),
        "button"
    );
    assert_eq!(
        Msg::EarEvent { ear: Ear::Left, position: EarPos::ZERO, time: 0.0 }
            .event_name()
            .unwrap(),
        "ears"
    );
    assert_eq!(
        Msg::RfidEvent { tag: rfid_tag(Some("weather")), event: RfidEventKind::Detected, time: 0.0 }
            .event_name()
            .unwrap(),
        "rfid/weather"
    );
    assert_eq!(
        Msg::RfidEvent { tag: rfid_tag(None), event: RfidEventKind::Removed, time: 0.0 }
            .event_name()
            .unwrap(),
        "rfid"
    );
    assert_eq!(
        Msg::AsrEvent {
            nlu: Nlu { intent: Some("weather_forecast".to_string()), slots: serde_json::Value::Null },
            time: 0.0
        }
        .event_name()
        .unwrap(),
        "asr/weather_forecast"
    );
    assert_eq!(
        Msg::AsrEvent { nlu: Nlu { intent: None, slots: serde_json::Value::Null }, time: 0.0 }
            .event_name()
            .unwrap(),
        "asr"
    );
}

#[test]
fn responses_and_state_are_universal() {
    assert!(Msg::State { state: State::Idle }.is_universal());
    assert!(Msg::Response(crate::Response::ok(None)).is_universal());
    assert!(!Msg::ButtonEvent { event: ButtonKind::Click, time: 0.0 }.is_universal());
}
