//! Wire framing for array traffic.
//!
//! Every request and response is one frame: an 8-byte header, optionally
//! followed by exactly one block of payload.
//!
//! | bytes | field  | encoding |
//! |-------|--------|----------|
//! | 0..2  | length | u16 big-endian, header plus payload if present |
//! | 2..6  | op     | u32 big-endian command word |
//! | 6..8  | status | u16 big-endian, 0 = success (responses) |
//!
//! Write requests and read responses carry the payload; everything else
//! is header-only. The length field is the only signal for payload
//! presence, and only the two legal lengths are accepted.

use std::io::{Read, Write};

use jbod_error::{JbodError, Result};
use jbod_types::{Block, BLOCK_SIZE};

/// Header length in bytes.
pub const HEADER_LEN: usize = 8;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub op: u32,
    pub status: u16,
    pub payload: Option<Block>,
}

/// Serialize and send one frame.
pub fn write_frame<W: Write>(
    writer: &mut W,
    op: u32,
    status: u16,
    payload: Option<&Block>,
) -> Result<()> {
    let len = HEADER_LEN + payload.map_or(0, |_| BLOCK_SIZE);
    let mut buf = [0_u8; HEADER_LEN + BLOCK_SIZE];
    buf[0..2].copy_from_slice(&(len as u16).to_be_bytes());
    buf[2..6].copy_from_slice(&op.to_be_bytes());
    buf[6..8].copy_from_slice(&status.to_be_bytes());
    if let Some(block) = payload {
        buf[HEADER_LEN..].copy_from_slice(block);
    }
    writer.write_all(&buf[..len])?;
    Ok(())
}

/// Receive and decode one frame.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut header = [0_u8; HEADER_LEN];
    reader.read_exact(&mut header)?;

    let len = usize::from(u16::from_be_bytes([header[0], header[1]]));
    let op = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
    let status = u16::from_be_bytes([header[6], header[7]]);

    let payload = match len {
        HEADER_LEN => None,
        l if l == HEADER_LEN + BLOCK_SIZE => {
            let mut block = [0_u8; BLOCK_SIZE];
            reader.read_exact(&mut block)?;
            Some(block)
        }
        other => {
            return Err(JbodError::Protocol(format!(
                "bad frame length {other}: expected {HEADER_LEN} or {}",
                HEADER_LEN + BLOCK_SIZE
            )));
        }
    };

    Ok(Frame {
        op,
        status,
        payload,
    })
}
