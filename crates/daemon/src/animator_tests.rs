// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::hw::fake::FakeHw;
use nab_core::IdleAnimation;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn anim(color: &str) -> IdleAnimation {
    IdleAnimation {
        tempo: 0.1,
        colors: vec![AnimationFrame {
            center: Some(Color::parse(color).unwrap()),
            ..Default::default()
        }],
    }
}

#[tokio::test(start_paused = true)]
async fn rotates_round_robin_from_shared_index() {
    let hw = FakeHw::new();
    let rotation = Arc::new(AtomicUsize::new(0));
    let handle = spawn(
        Arc::new(hw.clone()),
        vec![anim("ff0000"), anim("00ff00")],
        Arc::clone(&rotation),
    );

    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshots = hw.led_snapshots();
    // Alternating animations, one frame each, then the shutdown clear.
    assert!(snapshots.len() >= 3);
    assert_eq!(snapshots[0][Led::Center as usize], Color::parse("ff0000").unwrap());
    assert_eq!(snapshots[1][Led::Center as usize], Color::parse("00ff00").unwrap());
    assert_eq!(snapshots[2][Led::Center as usize], Color::parse("ff0000").unwrap());
    assert!(rotation.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn stop_clears_the_leds() {
    let hw = FakeHw::new();
    let handle = spawn(Arc::new(hw.clone()), vec![anim("ff0000")], Arc::new(AtomicUsize::new(0)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshots = hw.led_snapshots();
    assert_eq!(*snapshots.last().unwrap(), [Color::BLACK; LED_COUNT]);
}

#[tokio::test(start_paused = true)]
async fn hold_frames_keep_previous_colors() {
    let hw = FakeHw::new();
    let animation = IdleAnimation {
        tempo: 0.05,
        colors: vec![
            AnimationFrame {
                left: Some(Color::parse("0000ff").unwrap()),
                ..Default::default()
            },
            AnimationFrame::default(),
        ],
    };
    let handle = spawn(Arc::new(hw.clone()), vec![animation], Arc::new(AtomicUsize::new(0)));
    tokio::time::sleep(Duration::from_millis(80)).await;
    handle.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshots = hw.led_snapshots();
    assert!(snapshots.len() >= 2);
    assert_eq!(snapshots[0][Led::Left as usize], Color::parse("0000ff").unwrap());
    // The hold frame still shows blue.
    assert_eq!(snapshots[1][Led::Left as usize], Color::parse("0000ff").unwrap());
}
