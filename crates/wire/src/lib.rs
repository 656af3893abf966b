// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's client protocol.
//!
//! Wire format: one UTF-8 JSON object per line, terminated by `\n`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod msg;
mod packet;
mod response;

pub use codec::{decode, encode, parse_error_class, read_line, write_msg, ProtocolError, MAX_LINE_BYTES};
pub use msg::Msg;
pub use packet::{Invalid, ModeKind, Packet, ShutdownMode, TestKind, DEFAULT_RFID_WRITE_TIMEOUT_SECS};
pub use response::{ErrorClass, Gestalt, Response, Status};
