use alloc::{vec, vec::Vec};
use core::fmt;

use crate::{
    opcode::{ChunkType, Opcode},
    value::WireValue,
    LONG_MARK, SHORT_MARK, TERMINATOR,
};

/// Largest body a long frame can carry: the 16-bit length field also counts
/// the terminator byte.
pub const MAX_BODY: usize = u16::MAX as usize - 1;

/// Errors produced while decoding frame contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The body ended before the announced payload.
    Truncated,
    /// Unknown typed-value tag byte.
    BadValueTag(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "frame body is truncated"),
            DecodeError::BadValueTag(b) => write!(f, "unknown value tag {b}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// One protocol message, independent of its frame form.
///
/// A message with an empty body encodes as a short frame; anything else
/// encodes as a long frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// The operation this message requests or reports.
    pub op: Opcode,
    /// Chunk id, variable index, or 0 when the opcode ignores it.
    pub chunk_id: u8,
    /// Body bytes, excluding the frame terminator.
    pub body: Vec<u8>,
}

impl Message {
    /// A bodyless message.
    pub fn short(op: Opcode, chunk_id: u8) -> Self {
        Message {
            op,
            chunk_id,
            body: Vec::new(),
        }
    }

    /// A message with a body.
    pub fn long(op: Opcode, chunk_id: u8, body: Vec<u8>) -> Self {
        Message { op, chunk_id, body }
    }

    /// Serialize into the frame form the body size calls for.
    ///
    /// # Panics
    ///
    /// If the body exceeds [`MAX_BODY`]; chunk bodies are orders of
    /// magnitude below the 16-bit frame limit.
    pub fn encode(&self) -> Vec<u8> {
        if self.body.is_empty() {
            return vec![SHORT_MARK, self.op as u8, self.chunk_id];
        }
        assert!(self.body.len() <= MAX_BODY, "frame body too large");
        // Length counts the body plus the trailing terminator.
        let len = (self.body.len() + 1) as u16;
        let mut frame = Vec::with_capacity(5 + self.body.len() + 1);
        frame.push(LONG_MARK);
        frame.push(self.op as u8);
        frame.push(self.chunk_id);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&self.body);
        frame.push(TERMINATOR);
        frame
    }

    /// Decode the typed value carried in this message's body.
    pub fn value(&self) -> Result<WireValue, DecodeError> {
        WireValue::decode(&self.body)
    }

    // Host -> device.

    /// Upload a compiled chunk.
    pub fn chunk_code(chunk_id: u8, chunk_type: ChunkType, code: &[u8]) -> Self {
        let mut body = Vec::with_capacity(1 + code.len());
        body.push(chunk_type as u8);
        body.extend_from_slice(code);
        Message::long(Opcode::ChunkCode, chunk_id, body)
    }

    /// Remove one chunk.
    pub fn delete_chunk(chunk_id: u8) -> Self {
        Message::short(Opcode::DeleteChunk, chunk_id)
    }

    /// Start one chunk.
    pub fn start_chunk(chunk_id: u8) -> Self {
        Message::short(Opcode::StartChunk, chunk_id)
    }

    /// Stop one chunk's task.
    pub fn stop_chunk(chunk_id: u8) -> Self {
        Message::short(Opcode::StopChunk, chunk_id)
    }

    /// Start everything startable.
    pub fn start_all() -> Self {
        Message::short(Opcode::StartAll, 0)
    }

    /// Stop every running task.
    pub fn stop_all() -> Self {
        Message::short(Opcode::StopAll, 0)
    }

    /// Read global variable `index`.
    pub fn get_var(index: u8) -> Self {
        Message::short(Opcode::GetVar, index)
    }

    /// Write global variable `index`.
    pub fn set_var(index: u8, value: &WireValue) -> Self {
        Message::long(Opcode::SetVar, index, value.encode())
    }

    /// Ask for the firmware version.
    pub fn get_version() -> Self {
        Message::short(Opcode::GetVersion, 0)
    }

    /// Ask the device to replay all stored chunks.
    pub fn get_all_code() -> Self {
        Message::short(Opcode::GetAllCode, 0)
    }

    /// Forget every chunk.
    pub fn delete_all_code() -> Self {
        Message::short(Opcode::DeleteAllCode, 0)
    }

    /// Full device reset.
    pub fn system_reset() -> Self {
        Message::short(Opcode::SystemReset, 0)
    }

    /// Attach attribute bytes to a chunk.
    pub fn chunk_attribute(chunk_id: u8, attribute: u8, bytes: &[u8]) -> Self {
        let mut body = Vec::with_capacity(1 + bytes.len());
        body.push(attribute);
        body.extend_from_slice(bytes);
        Message::long(Opcode::ChunkAttribute, chunk_id, body)
    }

    // Device -> host.

    /// A task began running.
    pub fn task_started(chunk_id: u8) -> Self {
        Message::short(Opcode::TaskStarted, chunk_id)
    }

    /// A task completed without a value.
    pub fn task_done(chunk_id: u8) -> Self {
        Message::short(Opcode::TaskDone, chunk_id)
    }

    /// A reporter task finished with a value.
    pub fn task_returned(chunk_id: u8, value: &WireValue) -> Self {
        Message::long(Opcode::TaskReturnedValue, chunk_id, value.encode())
    }

    /// A task aborted with a fault code.
    pub fn task_error(chunk_id: u8, code: u8) -> Self {
        Message::long(Opcode::TaskError, chunk_id, vec![code])
    }

    /// Ambient output from a chunk, or from stdout (chunk id 255).
    pub fn output_value(chunk_id: u8, value: &WireValue) -> Self {
        Message::long(Opcode::OutputValue, chunk_id, value.encode())
    }

    /// Reply to `GetVar`.
    pub fn var_value(index: u8, value: &WireValue) -> Self {
        Message::long(Opcode::VarValue, index, value.encode())
    }

    /// Reply to `GetVersion`.
    pub fn version(version: &str) -> Self {
        Message::long(Opcode::Version, 0, WireValue::Str(version.into()).encode())
    }

    // Both directions.

    /// Liveness probe.
    pub fn ping() -> Self {
        Message::short(Opcode::Ping, 0)
    }

    /// Broadcast a string.
    pub fn broadcast(text: &str) -> Self {
        Message::long(Opcode::Broadcast, 0, text.as_bytes().to_vec())
    }
}
