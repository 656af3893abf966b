// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: wire the actors together and bind the sockets.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use nab_core::{Clock, HwEvent, SystemClock};
use nab_wire::ShutdownMode;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use super::{Config, LifecycleError, PidLock};
use crate::dispatcher::{self, Dispatcher};
use crate::engine::Engine;
use crate::hw::virt::VirtualHw;
use crate::hw::Hardware;
use crate::listener::{ListenCtx, Listener};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::scheduler::{self, Scheduler, SchedulerDeps};
use crate::status::SharedStatus;

/// A running daemon's handles.
pub struct StartupResult {
    /// Signaled by `shutdown` work items.
    pub shutdown: Arc<Notify>,
    /// Requested shutdown flavor, read after the notify fires.
    pub exit_mode: Arc<Mutex<Option<ShutdownMode>>>,
    /// Bound client socket address.
    pub local_addr: SocketAddr,
    /// Bound virtual-backend socket, when the virtual backend is up.
    pub virt_addr: Option<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
    // NOTE(lifetime): held so the PID lock survives until shutdown
    #[allow(dead_code)]
    lock: Option<PidLock>,
}

impl StartupResult {
    pub async fn wait_shutdown(&self) {
        self.shutdown.notified().await;
    }

    /// Process exit code: 10 asks the supervisor script to reboot.
    pub fn exit_code(&self) -> u8 {
        match *self.exit_mode.lock() {
            Some(ShutdownMode::Reboot) => 10,
            _ => 0,
        }
    }

    /// Tear the actor tasks down.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Full startup with the virtual backend, for the `nabd` binary.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.media_root)?;
    let lock = PidLock::acquire(&config.lock_path)?;

    let (sensor_tx, sensor_rx) = dispatcher::channel();
    let virt = VirtualHw::new(sensor_tx);
    let aux = TcpListener::bind(("127.0.0.1", config.virtual_port())).await?;
    let virt_addr = aux.local_addr()?;
    info!(%virt_addr, "virtual backend listening");
    let virt_task = tokio::spawn(virt.clone().serve(aux));

    let mut result =
        startup_with(config, virt.hardware(), sensor_rx, SystemClock, Some(lock)).await?;
    result.virt_addr = Some(virt_addr);
    result.tasks.push(virt_task);
    Ok(result)
}

/// Startup against an arbitrary hardware bundle and clock. The binary and
/// the test harness share this path, so both exercise the same wiring.
pub async fn startup_with<C: Clock>(
    config: &Config,
    hw: Hardware,
    sensor_rx: mpsc::Receiver<HwEvent>,
    clock: C,
    lock: Option<PidLock>,
) -> Result<StartupResult, LifecycleError> {
    let registry = Registry::new();
    let status = SharedStatus::new();
    let shutdown = Arc::new(Notify::new());
    let exit_mode = Arc::new(Mutex::new(None));
    let rfid_pictures = Arc::new(Mutex::new(HashMap::new()));

    let resolver = Arc::new(Resolver::new(&config.media_root, &config.locale, config.seed));
    let engine = Arc::new(Engine::new(hw.clone(), resolver));

    let (sched_tx, sched_rx) = scheduler::channel();
    let sched = Scheduler::new(
        SchedulerDeps {
            registry: registry.clone(),
            engine: Arc::clone(&engine),
            clock: clock.clone(),
            status: status.clone(),
            shutdown: Arc::clone(&shutdown),
            exit_mode: Arc::clone(&exit_mode),
            rfid_pictures: Arc::clone(&rfid_pictures),
            state_dir: config.state_dir.clone(),
        },
        sched_rx,
    );

    let dispatch = Dispatcher::new(
        sensor_rx,
        registry.clone(),
        sched_tx.clone(),
        clock,
        status.clone(),
        hw.source.clone(),
        rfid_pictures,
    );

    let tcp = TcpListener::bind(("127.0.0.1", config.port)).await?;
    let local_addr = tcp.local_addr()?;
    let ctx = Arc::new(ListenCtx {
        registry,
        sched_tx,
        status,
        hw,
        start_time: Instant::now(),
    });
    let listener = Listener::new(tcp, ctx);

    let tasks = vec![
        tokio::spawn(sched.run()),
        tokio::spawn(dispatch.run()),
        tokio::spawn(listener.run()),
    ];
    info!(%local_addr, "daemon ready");

    Ok(StartupResult { shutdown, exit_mode, local_addr, virt_addr: None, tasks, lock })
}
