// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writer registry and event subscription filter.
//!
//! Tracks connected writers and their outbound queues. A slow writer never
//! blocks the daemon: queues are bounded and an overflowing writer is
//! dropped, which closes its connection.

use std::collections::HashMap;

use nab_core::WriterId;
use nab_wire::Msg;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outbound queue bound per writer.
pub const OUTBOUND_QUEUE_LIMIT: usize = 1000;

struct WriterEntry {
    tx: mpsc::Sender<Msg>,
    subscriptions: Vec<String>,
}

#[derive(Default)]
struct Inner {
    writers: HashMap<WriterId, WriterEntry>,
    next_id: u64,
}

/// Cloneable handle to the writer table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a writer; the receiver feeds its connection's write loop.
    /// Dropping the registry entry closes the receiver and thereby the
    /// connection.
    pub fn register(&self) -> (WriterId, mpsc::Receiver<Msg>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_LIMIT);
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = WriterId(inner.next_id);
        inner.writers.insert(id, WriterEntry { tx, subscriptions: Vec::new() });
        debug!(writer = %id, "writer registered");
        (id, rx)
    }

    pub fn deregister(&self, id: WriterId) {
        if self.inner.lock().writers.remove(&id).is_some() {
            debug!(writer = %id, "writer deregistered");
        }
    }

    pub fn set_subscriptions(&self, id: WriterId, patterns: Vec<String>) {
        if let Some(entry) = self.inner.lock().writers.get_mut(&id) {
            entry.subscriptions = patterns;
        }
    }

    pub fn connections(&self) -> usize {
        self.inner.lock().writers.len()
    }

    /// Queue a message for one writer. Overflow drops the writer.
    pub fn send(&self, id: WriterId, msg: Msg) {
        let mut inner = self.inner.lock();
        let overflowed = match inner.writers.get(&id) {
            Some(entry) => match entry.tx.try_send(msg) {
                Ok(()) => false,
                Err(mpsc::error::TrySendError::Full(_)) => true,
                // Receiver gone: connection already tearing down.
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
            None => false,
        };
        if overflowed {
            warn!(writer = %id, "QueueOverflow: outbound queue full, dropping writer");
            inner.writers.remove(&id);
        }
    }

    /// Fan an event out. State messages go to every writer; everything
    /// else is filtered by subscription patterns.
    pub fn broadcast(&self, msg: &Msg) {
        let name = msg.event_name();
        let universal = msg.is_universal();
        let targets: Vec<WriterId> = {
            let inner = self.inner.lock();
            inner
                .writers
                .iter()
                .filter(|(_, entry)| {
                    universal
                        || name.as_deref().is_some_and(|n| {
                            entry.subscriptions.iter().any(|p| subscription_matches(p, n))
                        })
                })
                .map(|(id, _)| *id)
                .collect()
        };
        for id in targets {
            self.send(id, msg.clone());
        }
    }
}

/// Pattern match for event subscriptions.
///
/// `a/b` matches exactly; `a*` matches any name with that prefix; `a/*`
/// matches `a` itself and any child of `a`.
pub fn subscription_matches(pattern: &str, name: &str) -> bool {
    if let Some(base) = pattern.strip_suffix("/*") {
        return name == base || name.strip_prefix(base).is_some_and(|r| r.starts_with('/'));
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    pattern == name
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
