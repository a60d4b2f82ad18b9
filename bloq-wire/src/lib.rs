//! Framed message protocol between the bloq host and a device.
//!
//! Every frame starts with one of two marks: [`SHORT_MARK`] for the 3-byte
//! `[mark, opcode, chunk id]` form, [`LONG_MARK`] for the variable-length
//! form `[mark, opcode, chunk id, len lo, len hi, body.., TERMINATOR]`. The
//! length field counts the body bytes plus the trailing terminator.
//!
//! [`FrameBuffer`] is the shared receive loop: both ends accumulate raw
//! serial bytes into it and pop whole [`Message`]s, resynchronizing past
//! garbage when a lead byte is not a frame mark.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

mod buffer;
mod message;
mod opcode;
mod value;

#[cfg(test)]
mod encoding_tests;

pub use buffer::FrameBuffer;
pub use message::{DecodeError, Message, MAX_BODY};
pub use opcode::{ChunkType, Opcode};
pub use value::WireValue;

/// Lead byte of a 3-byte short frame.
pub const SHORT_MARK: u8 = 250;

/// Lead byte of a length-prefixed long frame.
pub const LONG_MARK: u8 = 251;

/// Last byte of every long frame.
pub const TERMINATOR: u8 = 254;

/// Chunk id the device uses for output not attributable to a chunk (stdout).
pub const STDOUT_CHUNK: u8 = 255;
