// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler: single owner of the queue, the state machine, and the
//! interactive slot.
//!
//! All mutation flows through its mailbox, so at most one work item runs
//! at any instant and every externally observable transition happens in
//! mailbox order. The scheduler suspends only while waiting for mail or
//! for the running item's task to finish.

mod item;
mod queue;

pub use item::{WorkItem, WorkKind};
pub use queue::{SleepAction, WorkQueue};

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use nab_core::{Clock, IdleAnimation, State, WriterId};
use nab_wire::{ErrorClass, Msg, Response, ShutdownMode, Status};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::animator::AnimatorHandle;
use crate::engine::{Engine, EngineError};
use crate::hw::{HardwareError, RfidWriteRequest};
use crate::registry::Registry;
use crate::status::SharedStatus;

/// Mailbox depth; submissions beyond this apply backpressure to readers.
pub const MAILBOX_BOUND: usize = 256;

/// Messages into the scheduler actor.
#[derive(Debug)]
pub enum SchedulerMsg {
    Submit(WorkItem),

    /// Cancel the item submitted under `target`.
    Cancel { origin: WriterId, target: String },

    /// Immediate wake; never queued.
    Wakeup { origin: WriterId, request_id: Option<String> },

    /// `mode=idle`: release the interactive slot out-of-band.
    ReleaseInteractive { origin: WriterId, request_id: Option<String> },

    /// Publish (`Some`) or revoke (`None`) an idle animation.
    PublishInfo {
        origin: WriterId,
        request_id: Option<String>,
        info_id: String,
        animation: Option<IdleAnimation>,
    },

    /// Short click observed; cancels a cancelable running item.
    ButtonClick,

    /// Audio capture started/stopped (transient `recording` state).
    SetRecording(bool),

    /// Connection closed: drop queued work, release the slot.
    WriterGone(WriterId),
}

/// Terminal outcome of a spawned work-item task.
#[derive(Debug)]
enum RunOutcome {
    Done,
    Canceled,
    /// Hardware-attributable: `status=failure`.
    Failed { class: ErrorClass, message: String },
    /// Logical: `status=error`.
    Errored { class: ErrorClass, message: String },
    TimedOut,
    Written { uid: String },
}

struct Running {
    origin: WriterId,
    request_id: Option<String>,
    cancelable: bool,
    cancel_requested: bool,
    cancel: CancellationToken,
    join: JoinHandle<RunOutcome>,
}

/// Everything the scheduler needs from the rest of the daemon.
pub struct SchedulerDeps<C: Clock> {
    pub registry: Registry,
    pub engine: Arc<Engine>,
    pub clock: C,
    pub status: SharedStatus,
    pub shutdown: Arc<Notify>,
    pub exit_mode: Arc<Mutex<Option<ShutdownMode>>>,
    pub rfid_pictures: Arc<Mutex<HashMap<String, u8>>>,
    pub state_dir: PathBuf,
}

enum Step {
    Msg(Option<SchedulerMsg>),
    Done(Result<RunOutcome, tokio::task::JoinError>),
}

pub struct Scheduler<C: Clock> {
    rx: mpsc::Receiver<SchedulerMsg>,
    registry: Registry,
    engine: Arc<Engine>,
    clock: C,
    status: SharedStatus,
    shutdown: Arc<Notify>,
    exit_mode: Arc<Mutex<Option<ShutdownMode>>>,
    rfid_pictures: Arc<Mutex<HashMap<String, u8>>>,
    state_dir: PathBuf,

    queue: WorkQueue,
    /// Interactive owner's bypass lane.
    fast: VecDeque<WorkItem>,
    running: Option<Running>,
    state: State,
    recording: bool,
    interactive_owner: Option<WriterId>,
    animations: BTreeMap<String, IdleAnimation>,
    rotation: Arc<AtomicUsize>,
    animator: Option<AnimatorHandle>,
    stopping: bool,
}

/// Build the scheduler mailbox.
pub fn channel() -> (mpsc::Sender<SchedulerMsg>, mpsc::Receiver<SchedulerMsg>) {
    mpsc::channel(MAILBOX_BOUND)
}

impl<C: Clock> Scheduler<C> {
    pub fn new(deps: SchedulerDeps<C>, rx: mpsc::Receiver<SchedulerMsg>) -> Self {
        Self {
            rx,
            registry: deps.registry,
            engine: deps.engine,
            clock: deps.clock,
            status: deps.status,
            shutdown: deps.shutdown,
            exit_mode: deps.exit_mode,
            rfid_pictures: deps.rfid_pictures,
            state_dir: deps.state_dir,
            queue: WorkQueue::new(),
            fast: VecDeque::new(),
            running: None,
            state: State::Idle,
            recording: false,
            interactive_owner: None,
            animations: BTreeMap::new(),
            rotation: Arc::new(AtomicUsize::new(0)),
            animator: None,
            stopping: false,
        }
    }

    /// Run until shutdown or until every mailbox sender is gone.
    pub async fn run(mut self) {
        loop {
            self.advance();
            if self.stopping {
                break;
            }
            let step = match self.running.as_mut() {
                Some(running) => {
                    let rx = &mut self.rx;
                    tokio::select! {
                        msg = rx.recv() => Step::Msg(msg),
                        result = &mut running.join => Step::Done(result),
                    }
                }
                None => Step::Msg(self.rx.recv().await),
            };
            match step {
                Step::Msg(None) => break,
                Step::Msg(Some(msg)) => self.handle_msg(msg),
                Step::Done(result) => self.finish_running(result),
            }
        }
        if let Some(animator) = self.animator.take() {
            animator.stop();
        }
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }

    /// Start work until something is running (or nothing is eligible),
    /// then reconcile the state broadcast and the idle animator.
    fn advance(&mut self) {
        while self.running.is_none() && !self.stopping {
            let Some(item) = self.next_item() else { break };
            self.begin(item);
        }
        self.refresh_state();
        self.update_animator();
    }

    fn next_item(&mut self) -> Option<WorkItem> {
        // Interactive: the owner's lane runs, the main queue is held until
        // release.
        if self.interactive_owner.is_some() {
            return self.fast.pop_front();
        }

        let now = self.clock.epoch_ms();
        while let Some(expired) = self.queue.pop_expired_head(now) {
            debug!(request_id = ?expired.request_id, "expired before start");
            self.respond_status(&expired, Status::Expired);
        }

        // Sleep barrier: migrate behind pending hardware work, or put the
        // daemon to sleep when nothing blocks. Bounded by queue length per
        // pass since each rotation moves one sleep behind the work.
        for _ in 0..self.queue.len() {
            match self.queue.head_sleep_action() {
                SleepAction::None => break,
                SleepAction::Rotate => self.queue.rotate_head_to_back(),
                SleepAction::Asleep => {
                    if let Some(sleep) = self.queue.pop_front() {
                        info!("queue drained, going to sleep");
                        self.set_state(State::Asleep);
                        self.respond_status(&sleep, Status::Ok);
                    }
                }
            }
        }

        if self.state.is_asleep() {
            self.queue.pop_eligible_asleep()
        } else {
            self.queue.pop_front()
        }
    }

    /// Dispatch one item: spawn hardware work, or handle inline.
    fn begin(&mut self, item: WorkItem) {
        // Lazy expiration: evaluated when the item is about to start.
        if item.expired_at(self.clock.epoch_ms()) {
            self.respond_status(&item, Status::Expired);
            return;
        }
        match &item.kind {
            WorkKind::Command { .. } | WorkKind::Message { .. } => self.start_playback(item),
            WorkKind::Test { which } => {
                let which = *which;
                self.start_test(item, which);
            }
            WorkKind::RfidWrite { .. } => self.start_rfid_write(item),
            WorkKind::Sleep => {
                // Reached only while already asleep; further sleeps are
                // immediately satisfied.
                self.respond_status(&item, Status::Ok);
            }
            WorkKind::Interactive => {
                info!(owner = %item.origin, "interactive slot granted");
                self.interactive_owner = Some(item.origin);
                // Commands the owner queued while waiting for the grant
                // move to the bypass lane so they run during the session.
                self.fast.extend(self.queue.take_writer_commands(item.origin));
                self.respond_status(&item, Status::Ok);
            }
            WorkKind::ConfigUpdate { service, slot } => {
                self.apply_config_update(service, slot.as_deref());
                self.respond_status(&item, Status::Ok);
            }
            WorkKind::Shutdown { mode } => {
                info!(?mode, "shutdown requested");
                *self.exit_mode.lock() = Some(*mode);
                self.respond_status(&item, Status::Ok);
                self.stopping = true;
                self.shutdown.notify_one();
            }
        }
    }

    fn start_playback(&mut self, item: WorkItem) {
        let playlist = item.playlist();
        let cancelable = item.cancelable();
        let cancel = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            match engine.run_sequence(&playlist, &token).await {
                Ok(()) => RunOutcome::Done,
                Err(e) => engine_outcome(e),
            }
        });
        self.running = Some(Running {
            origin: item.origin,
            request_id: item.request_id,
            cancelable,
            cancel_requested: false,
            cancel,
            join,
        });
    }

    fn start_test(&mut self, item: WorkItem, which: nab_wire::TestKind) {
        let cancel = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            match engine.run_test(which, &token).await {
                Ok(()) => RunOutcome::Done,
                Err(e) => engine_outcome(e),
            }
        });
        self.running = Some(Running {
            origin: item.origin,
            request_id: item.request_id,
            cancelable: false,
            cancel_requested: false,
            cancel,
            join,
        });
    }

    fn start_rfid_write(&mut self, item: WorkItem) {
        let WorkKind::RfidWrite { tech, uid, picture, app, data, timeout } = &item.kind else {
            return;
        };
        let request = RfidWriteRequest {
            tech: tech.clone(),
            uid: uid.clone(),
            picture: *picture,
            app: app.clone(),
            data: data.clone(),
        };
        let timeout = *timeout;
        let rfid = self.engine.hardware().rfid.clone();
        let pictures = Arc::clone(&self.rfid_pictures);
        let cancel = CancellationToken::new();
        let join = tokio::spawn(async move {
            let Some(rfid) = rfid else {
                return RunOutcome::Errored {
                    class: ErrorClass::NfcException,
                    message: "no RFID reader present".to_string(),
                };
            };
            match tokio::time::timeout(timeout, rfid.write(request.clone())).await {
                Ok(Ok(uid)) => {
                    pictures.lock().insert(request.app.clone(), request.picture);
                    RunOutcome::Written { uid }
                }
                Ok(Err(e @ (HardwareError::NoRfid | HardwareError::TagIncompatible(_)))) => {
                    RunOutcome::Errored { class: ErrorClass::NfcException, message: e.to_string() }
                }
                Ok(Err(e)) => RunOutcome::Failed {
                    class: ErrorClass::HardwareError,
                    message: e.to_string(),
                },
                Err(_) => RunOutcome::TimedOut,
            }
        });
        self.running = Some(Running {
            origin: item.origin,
            request_id: item.request_id,
            cancelable: false,
            cancel_requested: false,
            cancel,
            join,
        });
    }

    fn apply_config_update(&self, service: &str, slot: Option<&str>) {
        if service == "nabd" && matches!(slot, None | Some("locale")) {
            match crate::lifecycle::read_locale(&self.state_dir) {
                Some(locale) => {
                    info!(locale = %locale, "locale reloaded");
                    self.engine.resolver().set_locale(locale);
                }
                None => warn!("config-update: no locale found on disk"),
            }
        } else {
            debug!(service, ?slot, "config-update ignored (not handled natively)");
        }
    }

    fn finish_running(&mut self, result: Result<RunOutcome, tokio::task::JoinError>) {
        let Some(running) = self.running.take() else { return };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                // Contain engine panics at the item boundary and put the
                // hardware back to rest.
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move { engine.settle().await });
                RunOutcome::Failed {
                    class: ErrorClass::HardwareError,
                    message: "engine panicked".to_string(),
                }
            }
            Err(e) => RunOutcome::Failed {
                class: ErrorClass::HardwareError,
                message: e.to_string(),
            },
        };
        debug!(request_id = ?running.request_id, outcome = ?outcome, "item finished");
        let response = match outcome {
            RunOutcome::Done => Response::ok(running.request_id),
            RunOutcome::Canceled => Response::status(Status::Canceled, running.request_id),
            RunOutcome::Failed { class, message } => {
                Response::failure(class, message, running.request_id)
            }
            RunOutcome::Errored { class, message } => {
                Response::error(class, message, running.request_id)
            }
            RunOutcome::TimedOut => Response::status(Status::Timeout, running.request_id),
            RunOutcome::Written { uid } => Response::ok(running.request_id).with_uid(uid),
        };
        self.respond(running.origin, response);
    }

    fn handle_msg(&mut self, msg: SchedulerMsg) {
        match msg {
            SchedulerMsg::Submit(item) => self.submit(item),
            SchedulerMsg::Cancel { origin, target } => self.handle_cancel(origin, &target),
            SchedulerMsg::Wakeup { origin, request_id } => {
                if self.state.is_asleep() {
                    info!("waking up");
                    self.set_state(State::Idle);
                }
                self.respond(origin, Response::ok(request_id));
            }
            SchedulerMsg::ReleaseInteractive { origin, request_id } => {
                if self.interactive_owner == Some(origin) {
                    info!(owner = %origin, "interactive slot released");
                    self.interactive_owner = None;
                    // Unplayed bypass items rejoin the queue head in order.
                    while let Some(item) = self.fast.pop_back() {
                        self.queue.push_front(item);
                    }
                }
                self.respond(origin, Response::ok(request_id));
            }
            SchedulerMsg::PublishInfo { origin, request_id, info_id, animation } => {
                match animation {
                    Some(animation) => {
                        self.animations.insert(info_id, animation);
                    }
                    None => {
                        self.animations.remove(&info_id);
                    }
                }
                // Restart the rotation with the fresh list.
                if let Some(animator) = self.animator.take() {
                    animator.stop();
                }
                self.respond(origin, Response::ok(request_id));
            }
            SchedulerMsg::ButtonClick => {
                if let Some(running) = self.running.as_mut() {
                    if running.cancelable && !running.cancel_requested {
                        info!("click cancels running item");
                        running.cancel_requested = true;
                        running.cancel.cancel();
                    }
                }
            }
            SchedulerMsg::SetRecording(on) => {
                if on {
                    if !self.state.is_asleep() && !self.recording {
                        self.recording = true;
                    }
                } else {
                    self.recording = false;
                }
            }
            SchedulerMsg::WriterGone(id) => {
                let dropped = self.queue.drop_writer(id);
                self.fast.retain(|i| i.origin != id);
                if dropped > 0 {
                    debug!(writer = %id, dropped, "dropped queued items from departed writer");
                }
                if self.interactive_owner == Some(id) {
                    info!(owner = %id, "interactive owner disconnected");
                    self.interactive_owner = None;
                    self.fast.clear();
                }
            }
        }
    }

    fn submit(&mut self, item: WorkItem) {
        let bypass = self.interactive_owner == Some(item.origin)
            && matches!(item.kind, WorkKind::Command { .. } | WorkKind::Message { .. });
        if bypass {
            self.fast.push_back(item);
        } else {
            self.queue.push_back(item);
        }
    }

    fn handle_cancel(&mut self, origin: WriterId, target: &str) {
        if let Some(running) = self.running.as_mut() {
            if running.request_id.as_deref() == Some(target) {
                if running.cancelable && !running.cancel_requested {
                    running.cancel_requested = true;
                    running.cancel.cancel();
                } else {
                    let message = if running.cancelable {
                        "cancel already requested"
                    } else {
                        "item is not cancelable"
                    };
                    self.respond(
                        origin,
                        Response::error(ErrorClass::StateError, message, Some(target.to_string())),
                    );
                }
                return;
            }
        }
        let queued = self
            .queue
            .remove_by_request_id(target)
            .or_else(|| remove_from_lane(&mut self.fast, target));
        match queued {
            Some(item) => self.respond_status(&item, Status::Canceled),
            None => self.respond(
                origin,
                Response::error(
                    ErrorClass::StateError,
                    "no such cancelable item",
                    Some(target.to_string()),
                ),
            ),
        }
    }

    fn refresh_state(&mut self) {
        if self.stopping {
            return;
        }
        let new = if self.state.is_asleep() {
            State::Asleep
        } else if self.recording {
            State::Recording
        } else if self.running.is_some() {
            if self.interactive_owner.is_some() {
                State::Interactive
            } else {
                State::Playing
            }
        } else if self.interactive_owner.is_some() {
            State::Interactive
        } else {
            State::Idle
        };
        self.set_state(new);
    }

    fn set_state(&mut self, new: State) {
        if self.state == new {
            return;
        }
        debug!(from = %self.state, to = %new, "state transition");
        self.state = new;
        self.status.set_state(new);
        self.registry.broadcast(&Msg::State { state: new });
    }

    fn update_animator(&mut self) {
        let should_run = self.state.is_idle()
            && self.running.is_none()
            && self.queue.is_empty()
            && !self.animations.is_empty();
        match (&self.animator, should_run) {
            (None, true) => {
                let animations: Vec<IdleAnimation> = self.animations.values().cloned().collect();
                self.animator = Some(crate::animator::spawn(
                    Arc::clone(&self.engine.hardware().leds),
                    animations,
                    Arc::clone(&self.rotation),
                ));
            }
            (Some(_), false) => {
                if let Some(animator) = self.animator.take() {
                    animator.stop();
                }
            }
            _ => {}
        }
    }

    fn respond_status(&self, item: &WorkItem, status: Status) {
        self.respond(item.origin, Response::status(status, item.request_id.clone()));
    }

    fn respond(&self, origin: WriterId, response: Response) {
        self.registry.send(origin, Msg::Response(response));
    }
}

fn engine_outcome(e: EngineError) -> RunOutcome {
    match e {
        EngineError::Canceled => RunOutcome::Canceled,
        EngineError::Hardware(e) => {
            RunOutcome::Failed { class: ErrorClass::HardwareError, message: e.to_string() }
        }
        EngineError::Resolve(e) => {
            RunOutcome::Errored { class: ErrorClass::InvalidResource, message: e.to_string() }
        }
    }
}

fn remove_from_lane(lane: &mut VecDeque<WorkItem>, request_id: &str) -> Option<WorkItem> {
    let idx = lane.iter().position(|i| i.request_id.as_deref() == Some(request_id))?;
    lane.remove(idx)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
