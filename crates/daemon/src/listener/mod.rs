// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the client TCP socket.
//!
//! Accepts connections without blocking the scheduler. Each connection
//! gets a reader loop (frame, parse, validate, dispatch) and a writer task
//! draining the registry's bounded outbound queue. The handshake is the
//! daemon sending its current state immediately after accept.

use std::sync::Arc;
use std::time::Instant;

use nab_core::WriterId;
use nab_wire::{
    decode, parse_error_class, read_line, write_msg, ErrorClass, Gestalt, ModeKind, Msg, Packet,
    ProtocolError, Response,
};
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::hw::Hardware;
use crate::registry::Registry;
use crate::scheduler::{SchedulerMsg, WorkItem, WorkKind};
use crate::status::SharedStatus;

/// Shared daemon context for all connections.
pub(crate) struct ListenCtx {
    pub registry: Registry,
    pub sched_tx: mpsc::Sender<SchedulerMsg>,
    pub status: SharedStatus,
    pub hw: Hardware,
    pub start_time: Instant,
}

/// Listener task accepting writer connections.
pub(crate) struct Listener {
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("scheduler unavailable")]
    SchedulerGone,
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { tcp, ctx }
    }

    /// Run the accept loop until the daemon shuts down.
    pub async fn run(self) {
        loop {
            match self.tcp.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "writer connected");
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("writer disconnected")
        }
        _ => warn!("connection error: {}", e),
    }
}

/// Handle one writer connection until EOF or overflow.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError> {
    let (read_half, mut write_half) = stream.into_split();
    let (id, mut outbound) = ctx.registry.register();

    // Handshake: the daemon speaks first with its current state.
    ctx.registry.send(id, Msg::State { state: ctx.status.state() });

    let mut writer_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = write_msg(&mut write_half, &msg).await {
                debug!(error = %e, "write failed, closing connection");
                break;
            }
        }
    });

    // The write side closing first means the registry dropped this writer
    // (queue overflow); tear the whole connection down, don't keep reading.
    let result = tokio::select! {
        result = read_loop(read_half, id, ctx) => result,
        _ = &mut writer_task => Ok(()),
    };

    ctx.registry.deregister(id);
    if ctx.sched_tx.send(SchedulerMsg::WriterGone(id)).await.is_err() {
        debug!("scheduler gone during disconnect");
    }
    writer_task.abort();
    result
}

async fn read_loop(
    read_half: OwnedReadHalf,
    id: WriterId,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError> {
    let mut reader = BufReader::new(read_half);
    loop {
        let line = match read_line(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e @ (ProtocolError::LineTooLong | ProtocolError::BadUtf8)) => {
                // The framing is unrecoverable mid-line; report and drop.
                ctx.registry.send(
                    id,
                    Msg::Response(Response::error(ErrorClass::ProtocolError, e.to_string(), None)),
                );
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        if line.is_empty() {
            continue;
        }
        match decode(&line) {
            Ok(packet) => {
                debug!(writer = %id, packet = ?packet, "received packet");
                if let Err(invalid) = packet.validate() {
                    ctx.registry.send(
                        id,
                        Msg::Response(Response::error(
                            invalid.class,
                            invalid.message,
                            packet.request_id().map(str::to_string),
                        )),
                    );
                    continue;
                }
                dispatch(packet, id, ctx).await?;
            }
            Err(ProtocolError::Parse(e)) => {
                // Malformed frame: answer with a named error class and
                // keep the connection open.
                ctx.registry.send(
                    id,
                    Msg::Response(Response::error(parse_error_class(&e), e.to_string(), None)),
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Route one validated packet: inline queries answered here, everything
/// else goes to the scheduler.
async fn dispatch(packet: Packet, id: WriterId, ctx: &ListenCtx) -> Result<(), ConnectionError> {
    let submit = |msg: SchedulerMsg| async move {
        ctx.sched_tx.send(msg).await.map_err(|_| ConnectionError::SchedulerGone)
    };
    match packet {
        Packet::Gestalt { request_id } => {
            ctx.registry.send(id, Msg::Response(gestalt_response(ctx, request_id)));
            Ok(())
        }
        Packet::Info { request_id, info_id: None, animation: _ } => {
            // Bare info is a gestalt-style query.
            ctx.registry.send(id, Msg::Response(gestalt_response(ctx, request_id)));
            Ok(())
        }
        Packet::Info { request_id, info_id: Some(info_id), animation } => {
            submit(SchedulerMsg::PublishInfo { origin: id, request_id, info_id, animation }).await
        }
        Packet::Mode { request_id, mode, events } => {
            if let Some(events) = events {
                ctx.registry.set_subscriptions(id, events);
            }
            match mode {
                ModeKind::Interactive => {
                    submit(SchedulerMsg::Submit(WorkItem {
                        origin: id,
                        request_id,
                        kind: WorkKind::Interactive,
                    }))
                    .await
                }
                ModeKind::Idle => {
                    submit(SchedulerMsg::ReleaseInteractive { origin: id, request_id }).await
                }
            }
        }
        Packet::Wakeup { request_id } => {
            submit(SchedulerMsg::Wakeup { origin: id, request_id }).await
        }
        Packet::Cancel { request_id } => {
            submit(SchedulerMsg::Cancel { origin: id, target: request_id }).await
        }
        Packet::Command { request_id, sequence, cancelable, expiration } => {
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::Command { sequence, cancelable, expiration },
            }))
            .await
        }
        Packet::Message { request_id, signature, body, cancelable, expiration } => {
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::Message { signature, body, cancelable, expiration },
            }))
            .await
        }
        Packet::Sleep { request_id } => {
            submit(SchedulerMsg::Submit(WorkItem { origin: id, request_id, kind: WorkKind::Sleep }))
                .await
        }
        Packet::Test { request_id, test } => {
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::Test { which: test },
            }))
            .await
        }
        Packet::RfidWrite { request_id, tech, uid, picture, app, data, timeout } => {
            let timeout = std::time::Duration::from_secs_f64(
                timeout.unwrap_or(nab_wire::DEFAULT_RFID_WRITE_TIMEOUT_SECS),
            );
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::RfidWrite { tech, uid, picture, app, data, timeout },
            }))
            .await
        }
        Packet::ConfigUpdate { request_id, service, slot } => {
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::ConfigUpdate { service, slot },
            }))
            .await
        }
        Packet::Shutdown { request_id, mode } => {
            submit(SchedulerMsg::Submit(WorkItem {
                origin: id,
                request_id,
                kind: WorkKind::Shutdown {
                    mode: mode.unwrap_or(nab_wire::ShutdownMode::Halt),
                },
            }))
            .await
        }
    }
}

fn gestalt_response(ctx: &ListenCtx, request_id: Option<String>) -> Response {
    Response::ok(request_id).with_gestalt(Gestalt {
        state: ctx.status.state(),
        uptime: ctx.start_time.elapsed().as_secs(),
        connections: ctx.registry.connections(),
        hardware: ctx.hw.summary(),
    })
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
