// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The choreography engine.
//!
//! Executes one command item at a time against the actuator capabilities:
//! the LED/ear timeline runs on absolute 10 ms-tick deadlines while audio
//! plays through the sink, and the item completes when all sub-timelines
//! drain. Cancellation is a token polled at every frame boundary and
//! actuator call site.

mod program;

pub use program::{EarTargets, Frame, Program, TICK};

use std::sync::Arc;
use std::time::Duration;

use nab_core::{Color, CommandItem, Ear, LED_COUNT};
use nab_wire::TestKind;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::hw::{bounded, deadline, Hardware, HardwareError, EAR_TRAVEL_DEADLINE};
use crate::resolver::{ResolveError, Resolver, Sound};

/// Frame pacing for diagnostic patterns.
const TEST_STEP: Duration = Duration::from_millis(200);

/// Errors from executing a command item.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("canceled")]
    Canceled,

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Plays command items against the hardware bundle.
pub struct Engine {
    hw: Hardware,
    resolver: Arc<Resolver>,
}

impl Engine {
    pub fn new(hw: Hardware, resolver: Arc<Resolver>) -> Self {
        Self { hw, resolver }
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hw
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Play a sequence of items in order. On cancellation or failure the
    /// hardware is settled: audio flushed, LEDs black, ears halted.
    pub async fn run_sequence(
        &self,
        items: &[CommandItem],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        debug!(items = items.len(), "engine begin");
        let result = self.run_sequence_inner(items, cancel).await;
        if let Err(e) = &result {
            debug!(error = %e, "engine end");
            self.settle().await;
        } else {
            debug!("engine end");
        }
        result
    }

    async fn run_sequence_inner(
        &self,
        items: &[CommandItem],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        for item in items {
            if cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            self.run_item(item, cancel).await?;
        }
        Ok(())
    }

    /// One item: resolve everything up front, then run the audio queue and
    /// the choreography timeline in parallel and wait for the audio tail.
    async fn run_item(
        &self,
        item: &CommandItem,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let mut sounds = Vec::new();
        for reference in item.audio.iter().flatten() {
            sounds.push(self.resolver.resolve_sound(reference)?);
        }
        let program = match &item.choreography {
            Some(reference) => Some(self.resolver.resolve_choreography(reference)?),
            None => None,
        };

        let audio = self.queue_sounds(&sounds, cancel);
        let timeline = async {
            match &program {
                Some(program) => self.play_program(program, cancel).await,
                None => Ok(()),
            }
        };
        tokio::try_join!(audio, timeline)?;

        tokio::select! {
            result = self.hw.sink.wait_drained() => result.map_err(EngineError::from),
            _ = cancel.cancelled() => Err(EngineError::Canceled),
        }
    }

    async fn queue_sounds(
        &self,
        sounds: &[Arc<Sound>],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        for sound in sounds {
            if cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            deadline(self.hw.sink.enqueue(Arc::clone(sound))).await?;
        }
        Ok(())
    }

    /// Dispatch frames on absolute deadlines so rounding never accumulates.
    async fn play_program(
        &self,
        program: &Program,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let start = tokio::time::Instant::now();
        let mut elapsed = Duration::ZERO;
        let mut tempo: u32 = 1;
        let mut current = [Color::BLACK; LED_COUNT];
        let mut moving = [false; 2];

        for frame in &program.frames {
            if cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            if let Some(t) = frame.tempo {
                tempo = t;
            }
            if let Some(leds) = &frame.leds {
                for (slot, color) in current.iter_mut().zip(leds) {
                    if let Some(color) = color {
                        *slot = *color;
                    }
                }
                deadline(self.hw.leds.set(current)).await?;
            }
            if let Some(ears) = &frame.ears {
                for (idx, (ear, target)) in
                    [(Ear::Left, ears.left), (Ear::Right, ears.right)].into_iter().enumerate()
                {
                    let Some(position) = target else { continue };
                    // Retargeting an ear in flight waits for it to settle;
                    // otherwise movement overlaps the timeline freely.
                    if moving[idx] {
                        bounded(EAR_TRAVEL_DEADLINE, self.hw.ears.wait_settled(ear)).await?;
                    }
                    deadline(self.hw.ears.go(ear, position)).await?;
                    moving[idx] = true;
                }
            }
            if let Some(cue) = &frame.audio {
                let sound = self.resolver.resolve_sound(cue)?;
                deadline(self.hw.sink.enqueue(sound)).await?;
            }
            elapsed += TICK * tempo;
            tokio::select! {
                _ = tokio::time::sleep_until(start + elapsed) => {}
                _ = cancel.cancelled() => return Err(EngineError::Canceled),
            }
        }
        Ok(())
    }

    /// Diagnostic patterns for `test` work items.
    pub async fn run_test(
        &self,
        which: TestKind,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let result = match which {
            TestKind::Leds => self.test_leds(cancel).await,
            TestKind::Ears => self.test_ears(cancel).await,
        };
        if result.is_err() {
            self.settle().await;
        }
        result
    }

    async fn test_leds(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        const SWEEP: [Color; 6] = [
            Color::new(0xff, 0x00, 0x00),
            Color::new(0xff, 0xff, 0x00),
            Color::new(0x00, 0xff, 0x00),
            Color::new(0x00, 0xff, 0xff),
            Color::new(0x00, 0x00, 0xff),
            Color::new(0xff, 0x00, 0xff),
        ];
        for color in SWEEP {
            if cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            deadline(self.hw.leds.set([color; LED_COUNT])).await?;
            tokio::select! {
                _ = tokio::time::sleep(TEST_STEP) => {}
                _ = cancel.cancelled() => return Err(EngineError::Canceled),
            }
        }
        deadline(self.hw.leds.clear()).await?;
        Ok(())
    }

    async fn test_ears(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        for position in [-17i16, 17, 0] {
            if cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            let position = nab_core::EarPos::clamped(position);
            for ear in [Ear::Left, Ear::Right] {
                deadline(self.hw.ears.go(ear, position)).await?;
            }
            for ear in [Ear::Left, Ear::Right] {
                bounded(EAR_TRAVEL_DEADLINE, self.hw.ears.wait_settled(ear)).await?;
            }
        }
        Ok(())
    }

    /// Bring the hardware back to rest. Errors are logged, not propagated;
    /// settling is already the failure path.
    pub async fn settle(&self) {
        if let Err(e) = deadline(self.hw.sink.flush()).await {
            warn!(error = %e, "settle: flush failed");
        }
        if let Err(e) = deadline(self.hw.leds.clear()).await {
            warn!(error = %e, "settle: led clear failed");
        }
        if let Err(e) = deadline(self.hw.ears.halt()).await {
            warn!(error = %e, "settle: ear halt failed");
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
