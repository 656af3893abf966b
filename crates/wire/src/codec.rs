// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line framing: one JSON object per `\n`-terminated UTF-8 line.

use serde_json::error::Category;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ErrorClass, Msg, Packet};

/// Upper bound on a single frame. A writer exceeding it is protocol-broken.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Errors from framing and parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("frame exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong,

    #[error("frame is not valid UTF-8")]
    BadUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read one frame. `Ok(None)` means a clean EOF at a frame boundary.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take((MAX_LINE_BYTES + 1) as u64);
    let n = limited.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map(Some).map_err(|_| ProtocolError::BadUtf8)
}

/// Parse one frame into a packet. Validation beyond the schema is the
/// caller's job ([`Packet::validate`]).
pub fn decode(line: &str) -> Result<Packet, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Serialize a message to its wire line, `\n` included.
pub fn encode(msg: &Msg) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write one message frame and flush.
pub async fn write_msg<W>(writer: &mut W, msg: &Msg) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode(msg).map_err(ProtocolError::Parse)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Map a serde parse error onto the response error class taxonomy.
///
/// serde does not expose structured causes, so this keys off the stable
/// message prefixes it emits plus the messages our own validators raise
/// through `serde::de::Error::custom`.
pub fn parse_error_class(err: &serde_json::Error) -> ErrorClass {
    match err.classify() {
        Category::Syntax | Category::Eof | Category::Io => ErrorClass::ProtocolError,
        Category::Data => {
            let msg = err.to_string();
            if msg.starts_with("missing field") {
                ErrorClass::MissingField
            } else if msg.contains("invalid color")
                || msg.contains("ear position")
                || msg.contains("absolute resource path")
                || msg.contains("empty resource")
                || msg.contains("needs audio")
                || msg.contains("tempo")
            {
                ErrorClass::InvalidParameter
            } else {
                // unknown variant / wrong type / unknown `type` tag
                ErrorClass::InvalidPacket
            }
        }
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
