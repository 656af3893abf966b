// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon status snapshot.
//!
//! The scheduler is the single writer; the listener reads it to answer
//! `gestalt` queries and to send the handshake state without a round trip
//! through the scheduler mailbox.

use std::sync::Arc;

use nab_core::State;
use parking_lot::Mutex;

#[derive(Clone)]
pub struct SharedStatus {
    inner: Arc<Mutex<State>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(State::Idle)) }
    }

    pub fn state(&self) -> State {
        *self.inner.lock()
    }

    pub fn set_state(&self, state: State) {
        *self.inner.lock() = state;
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}
