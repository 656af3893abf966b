// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ok = { Status::Ok, "ok" },
    failure = { Status::Failure, "failure" },
    error = { Status::Error, "error" },
    expired = { Status::Expired, "expired" },
    timeout = { Status::Timeout, "timeout" },
    canceled = { Status::Canceled, "canceled" },
)]
fn status_tags_are_lowercase(status: Status, tag: &str) {
    assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{}\"", tag));
}

#[test]
fn nfc_exception_keeps_upper_acronym() {
    assert_eq!(serde_json::to_string(&ErrorClass::NfcException).unwrap(), "\"NFCException\"");
    assert_eq!(
        serde_json::from_str::<ErrorClass>("\"NFCException\"").unwrap(),
        ErrorClass::NfcException
    );
}

#[test]
fn ok_response_is_minimal() {
    let json = serde_json::to_value(Response::ok(Some("a1".to_string()))).unwrap();
    assert_eq!(json, serde_json::json!({"status": "ok", "request_id": "a1"}));
}

#[test]
fn error_response_carries_class_and_message() {
    let resp = Response::error(ErrorClass::StateError, "not cancelable", Some("a2".to_string()));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["class"], "StateError");
    assert_eq!(json["message"], "not cancelable");
    assert_eq!(json["status"], "error");
}

#[test]
fn gestalt_payload_is_flattened() {
    let resp = Response::ok(Some("g1".to_string())).with_gestalt(Gestalt {
        state: nab_core::State::Idle,
        uptime: 42,
        connections: 2,
        hardware: serde_json::json!({"leds": "virtual"}),
    });
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["state"], "idle");
    assert_eq!(json["uptime"], 42);
    assert_eq!(json["connections"], 2);

    let back: Response = serde_json::from_value(json).unwrap();
    assert_eq!(back, resp);
}

#[test]
fn uid_round_trips() {
    let resp = Response::ok(Some("w1".to_string())).with_uid("d0:02:1a:03");
    let json = serde_json::to_string(&resp).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back.uid.as_deref(), Some("d0:02:1a:03"));
}
