//! RCON packet codec
//!
//! All packets are framed as (little-endian):
//! ```text
//! [ 4 bytes: length (i32) ][ 4 bytes: request id ][ 4 bytes: type ][ body ][ 0x00 0x00 ]
//! ```
//!
//! `length` counts every byte after the length field itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Request id + type + two terminating NULs
pub const HEADER_AND_PADDING: usize = 10;

/// Largest response body a server sends in one packet
pub const MAX_RESPONSE_BODY: usize = 4096;

/// Largest command body a server accepts
pub const MAX_REQUEST_BODY: usize = 1446;

/// Largest accepted value of the length field
pub const MAX_PACKET_LEN: usize = MAX_RESPONSE_BODY + HEADER_AND_PADDING;

/// Packet type values
pub mod packet_type {
    /// Response to an exec command
    pub const RESPONSE_VALUE: i32 = 0;
    /// Execute a command
    pub const EXEC_COMMAND: i32 = 2;
    /// Reply to a login packet (shares the value of `EXEC_COMMAND`)
    pub const AUTH_RESPONSE: i32 = 2;
    /// Login with the RCON password
    pub const LOGIN: i32 = 3;
}

/// Request id the server answers with when a login is rejected
pub const AUTH_FAILED_ID: i32 = -1;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Packet body too large: {0} bytes (max: {MAX_REQUEST_BODY})")]
    BodyTooLarge(usize),

    #[error("Invalid packet length prefix: {0}")]
    InvalidLength(i32),

    #[error("Packet is missing its NUL terminator")]
    MissingTerminator,
}

/// One RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    /// Create a login packet
    pub fn login(request_id: i32, password: impl Into<String>) -> Self {
        Self {
            request_id,
            kind: packet_type::LOGIN,
            body: password.into(),
        }
    }

    /// Create an exec command packet
    pub fn command(request_id: i32, command: impl Into<String>) -> Self {
        Self {
            request_id,
            kind: packet_type::EXEC_COMMAND,
            body: command.into(),
        }
    }

    /// Value of the length field for this packet
    pub fn encoded_len(&self) -> usize {
        self.body.len() + HEADER_AND_PADDING
    }
}

/// Encode a packet into a length-prefixed byte buffer
pub fn encode(packet: &Packet) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(packet, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a packet directly into a provided buffer
pub fn encode_into(packet: &Packet, buf: &mut BytesMut) -> Result<(), CodecError> {
    if packet.body.len() > MAX_REQUEST_BODY {
        return Err(CodecError::BodyTooLarge(packet.body.len()));
    }

    let len = packet.encoded_len();
    buf.reserve(4 + len);

    buf.put_i32_le(len as i32);
    buf.put_i32_le(packet.request_id);
    buf.put_i32_le(packet.kind);
    buf.put_slice(packet.body.as_bytes());
    buf.put_u8(0);
    buf.put_u8(0);

    Ok(())
}

/// Try to decode a length-prefixed packet from a buffer
///
/// Returns:
/// - `Ok(Some(packet))` if a complete packet was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let len = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len < HEADER_AND_PADDING as i32 || len as usize > MAX_PACKET_LEN {
        return Err(CodecError::InvalidLength(len));
    }

    let total_len = 4 + len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let mut frame = buf.split_to(len as usize);

    let request_id = frame.get_i32_le();
    let kind = frame.get_i32_le();

    let body_len = frame.len() - 2;
    if frame[body_len] != 0 || frame[body_len + 1] != 0 {
        return Err(CodecError::MissingTerminator);
    }
    let body = String::from_utf8_lossy(&frame[..body_len]).into_owned();

    Ok(Some(Packet {
        request_id,
        kind,
        body,
    }))
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_PACKET_LEN + 4),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next packet from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete packets
    pub fn decode_next(&mut self) -> Result<Option<Packet>, CodecError> {
        decode(&mut self.buffer)
    }
}
