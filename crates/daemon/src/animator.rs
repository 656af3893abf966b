// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The idle animator.
//!
//! Rotates through registered animations round-robin while the daemon is
//! idle with an empty queue, playing each once before advancing. Halting
//! clears the LEDs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nab_core::{AnimationFrame, Color, IdleAnimation, Led, LED_COUNT};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::hw::Leds;

/// Handle to a running animator task.
pub struct AnimatorHandle {
    token: CancellationToken,
}

impl AnimatorHandle {
    /// Halt the rotation; the task clears the LEDs on its way out.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Start the rotation from the shared index; the index survives restarts
/// so publishing a new animation does not reset the rotation.
pub fn spawn(
    leds: Arc<dyn Leds>,
    animations: Vec<IdleAnimation>,
    rotation: Arc<AtomicUsize>,
) -> AnimatorHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();
    tokio::spawn(async move {
        run(leds, animations, rotation, task_token).await;
    });
    AnimatorHandle { token }
}

async fn run(
    leds: Arc<dyn Leds>,
    animations: Vec<IdleAnimation>,
    rotation: Arc<AtomicUsize>,
    token: CancellationToken,
) {
    if animations.is_empty() {
        return;
    }
    'rotation: loop {
        let idx = rotation.fetch_add(1, Ordering::SeqCst) % animations.len();
        let animation = &animations[idx];
        let mut current = [Color::BLACK; LED_COUNT];
        for frame in &animation.colors {
            apply(&mut current, frame);
            if let Err(e) = leds.set(current).await {
                warn!(error = %e, "idle animation stopped on led failure");
                break 'rotation;
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(animation.tempo)) => {}
                _ = token.cancelled() => break 'rotation,
            }
        }
    }
    if let Err(e) = leds.clear().await {
        warn!(error = %e, "led clear failed after idle animation");
    }
}

/// Animations address the three face LEDs; absent entries hold.
fn apply(current: &mut [Color; LED_COUNT], frame: &AnimationFrame) {
    for (led, color) in [
        (Led::Left, frame.left),
        (Led::Center, frame.center),
        (Led::Right, frame.right),
    ] {
        if let Some(color) = color {
            current[led as usize] = color;
        }
    }
}

#[cfg(test)]
#[path = "animator_tests.rs"]
mod tests;
