use alloc::{string::String, vec::Vec};

use crate::message::DecodeError;

/// Typed value body carried by `SetVar`, `TaskReturnedValue`, `OutputValue`,
/// `VarValue` and `Version` frames.
///
/// The first body byte is the type tag; the payload layout depends on it:
/// `1` a little-endian int32, `2` raw string bytes, `3` one boolean byte,
/// `4` raw bytes. String and byte-array lengths are derived from the frame
/// length, so the payload runs to the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireValue {
    /// A 32-bit integer.
    Int(i32),
    /// A UTF-8 string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// A byte array.
    Bytes(Vec<u8>),
}

const TAG_INT: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_BYTES: u8 = 4;

impl WireValue {
    /// Encode the tag byte and payload into a fresh body.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        match self {
            WireValue::Int(n) => {
                body.push(TAG_INT);
                body.extend_from_slice(&n.to_le_bytes());
            }
            WireValue::Str(s) => {
                body.push(TAG_STR);
                body.extend_from_slice(s.as_bytes());
            }
            WireValue::Bool(b) => {
                body.push(TAG_BOOL);
                body.push(u8::from(*b));
            }
            WireValue::Bytes(bytes) => {
                body.push(TAG_BYTES);
                body.extend_from_slice(bytes);
            }
        }
        body
    }

    /// Decode a typed value from a frame body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let (&tag, payload) = body.split_first().ok_or(DecodeError::Truncated)?;
        match tag {
            TAG_INT => {
                let bytes: [u8; 4] =
                    payload.try_into().map_err(|_| DecodeError::Truncated)?;
                Ok(WireValue::Int(i32::from_le_bytes(bytes)))
            }
            TAG_STR => Ok(WireValue::Str(
                String::from_utf8_lossy(payload).into_owned(),
            )),
            TAG_BOOL => match payload {
                [b] => Ok(WireValue::Bool(*b != 0)),
                _ => Err(DecodeError::Truncated),
            },
            TAG_BYTES => Ok(WireValue::Bytes(payload.to_vec())),
            other => Err(DecodeError::BadValueTag(other)),
        }
    }
}

impl From<i32> for WireValue {
    fn from(n: i32) -> Self {
        WireValue::Int(n)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Str(s.into())
    }
}
