// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nab_core::{CommandItem, ResourceRef};

fn item(audio: &str) -> CommandItem {
    CommandItem { audio: Some(vec![ResourceRef::new(audio).unwrap()]), choreography: None }
}

#[test]
fn command_packet_parses() {
    let line = r#"{"type":"command","request_id":"a1","sequence":[{"audio":["test/sounds/ping.wav"]}]}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    match &packet {
        Packet::Command { request_id, sequence, cancelable, expiration } => {
            assert_eq!(request_id.as_deref(), Some("a1"));
            assert_eq!(sequence.len(), 1);
            assert!(!*cancelable);
            assert!(expiration.is_none());
        }
        other => panic!("wrong packet: {:?}", other),
    }
    assert!(packet.validate().is_ok());
    assert_eq!(packet.request_id(), Some("a1"));
}

#[test]
fn command_expiration_is_iso8601() {
    let line = r#"{"type":"command","sequence":[{"audio":["a.wav"]}],"expiration":"2026-08-01T12:00:00Z"}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    match packet {
        Packet::Command { expiration, .. } => {
            let exp = expiration.unwrap();
            assert_eq!(exp.timestamp(), 1_785_585_600);
        }
        other => panic!("wrong packet: {:?}", other),
    }
}

#[test]
fn message_packet_parses_with_signature() {
    let line = r#"{"type":"message","request_id":"m1","signature":{"audio":["sig.wav"]},"body":[{"audio":["b.wav"]}],"cancelable":true}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    match packet {
        Packet::Message { signature, body, cancelable, .. } => {
            assert!(signature.is_some());
            assert_eq!(body.len(), 1);
            assert!(cancelable);
        }
        other => panic!("wrong packet: {:?}", other),
    }
}

#[test]
fn config_update_uses_hyphenated_tag() {
    let line = r#"{"type":"config-update","service":"nabd","slot":"locale"}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    assert_eq!(
        packet,
        Packet::ConfigUpdate {
            request_id: None,
            service: "nabd".to_string(),
            slot: Some("locale".to_string()),
        }
    );
    let round = serde_json::to_string(&packet).unwrap();
    assert!(round.contains("\"config-update\""));
}

#[test]
fn empty_command_sequence_is_invalid_packet() {
    let packet = Packet::Command {
        request_id: None,
        sequence: vec![],
        cancelable: false,
        expiration: None,
    };
    let err = packet.validate().unwrap_err();
    assert_eq!(err.class, ErrorClass::InvalidPacket);
}

#[test]
fn empty_message_body_is_invalid_packet() {
    let packet = Packet::Message {
        request_id: None,
        signature: Some(item("sig.wav")),
        body: vec![],
        cancelable: false,
        expiration: None,
    };
    assert_eq!(packet.validate().unwrap_err().class, ErrorClass::InvalidPacket);
}

#[test]
fn empty_command_item_is_invalid() {
    let packet = Packet::Command {
        request_id: None,
        sequence: vec![CommandItem { audio: None, choreography: None }],
        cancelable: false,
        expiration: None,
    };
    assert!(packet.validate().is_err());
}

#[test]
fn rfid_write_validates_uid() {
    let good = Packet::RfidWrite {
        request_id: None,
        tech: "st25".to_string(),
        uid: "d0:02:1a:03".to_string(),
        picture: 3,
        app: "weather".to_string(),
        data: None,
        timeout: Some(5.0),
    };
    assert!(good.validate().is_ok());

    for uid in ["D0:02", "d0:2", "", "d0:02:"] {
        let bad = Packet::RfidWrite {
            request_id: None,
            tech: "st25".to_string(),
            uid: uid.to_string(),
            picture: 0,
            app: "weather".to_string(),
            data: None,
            timeout: None,
        };
        assert_eq!(bad.validate().unwrap_err().class, ErrorClass::InvalidParameter, "uid {:?}", uid);
    }
}

#[test]
fn rfid_write_rejects_nonpositive_timeout() {
    let packet = Packet::RfidWrite {
        request_id: None,
        tech: "st25".to_string(),
        uid: "aa:bb".to_string(),
        picture: 0,
        app: "clock".to_string(),
        data: None,
        timeout: Some(0.0),
    };
    assert_eq!(packet.validate().unwrap_err().class, ErrorClass::InvalidParameter);
}

#[test]
fn cancel_request_id_is_the_target() {
    let packet: Packet = serde_json::from_str(r#"{"type":"cancel","request_id":"a2"}"#).unwrap();
    assert_eq!(packet, Packet::Cancel { request_id: "a2".to_string() });
    assert_eq!(packet.request_id(), Some("a2"));
}

#[test]
fn mode_packet_parses_events() {
    let line = r#"{"type":"mode","mode":"interactive","events":["button","rfid/*"]}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    match packet {
        Packet::Mode { mode, events, .. } => {
            assert_eq!(mode, ModeKind::Interactive);
            assert_eq!(events.unwrap(), vec!["button".to_string(), "rfid/*".to_string()]);
        }
        other => panic!("wrong packet: {:?}", other),
    }
}

#[test]
fn info_publish_validates_animation() {
    let line = r#"{"type":"info","info_id":"weather","animation":{"tempo":0.0,"colors":[{"left":"ff0000"}]}}"#;
    let packet: Packet = serde_json::from_str(line).unwrap();
    assert_eq!(packet.validate().unwrap_err().class, ErrorClass::InvalidParameter);
}
