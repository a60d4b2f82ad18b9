//! MakeCode-compatible typed message frames.
//!
//! A packet is a MakeCode frame iff its length byte is at least 12, the
//! protocol byte at offset 1 is 1 and the version byte at offset 3 is 1.
//! The header is `[len, protocol, group, version, type, time(4, LE),
//! device id(4, LE)]`; the payload starts at offset 13 and its layout is
//! selected by the type byte.

use bloq_types::Word;

use crate::consts::{MAX_RADIO_STRING, PACKET_LEN};

const OFF_LEN: usize = 0;
const OFF_PROTOCOL: usize = 1;
const OFF_GROUP: usize = 2;
const OFF_VERSION: usize = 3;
const OFF_TYPE: usize = 4;
const OFF_TIME: usize = 5;
const OFF_DEVICE_ID: usize = 9;
const OFF_PAYLOAD: usize = 13;

const PROTOCOL: u8 = 1;
const VERSION: u8 = 1;

/// Header bytes counted by the length byte (everything after it up to the
/// payload).
const HEADER_LEN: u8 = 12;

/// Payload type selector at offset 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// int32 LE at 13.
    Integer = 0,
    /// int32 LE at 13, string length at 17, bytes at 18.
    Pair = 1,
    /// String length at 13, bytes at 14.
    Str = 2,
    /// float64 LE at 13, rounded on extraction.
    Double = 4,
    /// float64 LE at 13, string length at 21, bytes at 22.
    DoublePair = 5,
}

/// Payload extracted from a received frame; string bytes borrow from the
/// packet and are already capped at [`MAX_RADIO_STRING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// An integer (doubles arrive rounded).
    Integer(Word),
    /// A string.
    Str(&'a [u8]),
    /// A named value.
    Pair(Word, &'a [u8]),
}

fn int_at(packet: &[u8], offset: usize) -> Option<Word> {
    let bytes: [u8; 4] = packet.get(offset..offset + 4)?.try_into().ok()?;
    Some(Word::from_le_bytes(bytes))
}

fn double_at(packet: &[u8], offset: usize) -> Option<Word> {
    let bytes: [u8; 8] = packet.get(offset..offset + 8)?.try_into().ok()?;
    let d = f64::from_le_bytes(bytes);
    let rounded = if d >= 0.0 { d + 0.5 } else { d - 0.5 };
    Some(rounded as Word)
}

fn str_at(packet: &[u8], len_offset: usize) -> Option<&[u8]> {
    let len = usize::from(*packet.get(len_offset)?).min(MAX_RADIO_STRING);
    packet.get(len_offset + 1..len_offset + 1 + len)
}

/// Extract the typed payload, or `None` when the packet is not a MakeCode
/// frame this layer understands.
pub fn parse(packet: &[u8]) -> Option<Payload<'_>> {
    if packet.len() < OFF_PAYLOAD
        || *packet.get(OFF_LEN)? < HEADER_LEN
        || packet[OFF_PROTOCOL] != PROTOCOL
        || packet[OFF_VERSION] != VERSION
    {
        return None;
    }
    match packet[OFF_TYPE] {
        0 => Some(Payload::Integer(int_at(packet, OFF_PAYLOAD)?)),
        1 => Some(Payload::Pair(
            int_at(packet, OFF_PAYLOAD)?,
            str_at(packet, OFF_PAYLOAD + 4)?,
        )),
        2 => Some(Payload::Str(str_at(packet, OFF_PAYLOAD)?)),
        4 => Some(Payload::Integer(double_at(packet, OFF_PAYLOAD)?)),
        5 => Some(Payload::Pair(
            double_at(packet, OFF_PAYLOAD)?,
            str_at(packet, OFF_PAYLOAD + 8)?,
        )),
        _ => None,
    }
}

fn write_header(
    packet: &mut [u8; PACKET_LEN],
    kind: FrameKind,
    payload_len: u8,
    group: u8,
    millis: u32,
    device_id: u32,
) {
    packet[OFF_LEN] = HEADER_LEN + payload_len;
    packet[OFF_PROTOCOL] = PROTOCOL;
    packet[OFF_GROUP] = group;
    packet[OFF_VERSION] = VERSION;
    packet[OFF_TYPE] = kind as u8;
    packet[OFF_TIME..OFF_TIME + 4].copy_from_slice(&millis.to_le_bytes());
    packet[OFF_DEVICE_ID..OFF_DEVICE_ID + 4].copy_from_slice(&device_id.to_le_bytes());
}

/// Build an integer frame.
pub fn encode_integer(
    packet: &mut [u8; PACKET_LEN],
    n: Word,
    group: u8,
    millis: u32,
    device_id: u32,
) {
    write_header(packet, FrameKind::Integer, 4, group, millis, device_id);
    packet[OFF_PAYLOAD..OFF_PAYLOAD + 4].copy_from_slice(&n.to_le_bytes());
}

/// Build a string frame; `text` is capped at [`MAX_RADIO_STRING`] bytes.
pub fn encode_string(
    packet: &mut [u8; PACKET_LEN],
    text: &[u8],
    group: u8,
    millis: u32,
    device_id: u32,
) {
    let len = text.len().min(MAX_RADIO_STRING);
    write_header(packet, FrameKind::Str, (len + 1) as u8, group, millis, device_id);
    packet[OFF_PAYLOAD] = len as u8;
    packet[OFF_PAYLOAD + 1..OFF_PAYLOAD + 1 + len].copy_from_slice(&text[..len]);
}

/// Build a name/value pair frame; `name` is capped at [`MAX_RADIO_STRING`]
/// minus the four value bytes the layout spends first.
pub fn encode_pair(
    packet: &mut [u8; PACKET_LEN],
    name: &[u8],
    value: Word,
    group: u8,
    millis: u32,
    device_id: u32,
) {
    let room = PACKET_LEN - (OFF_PAYLOAD + 5);
    let len = name.len().min(MAX_RADIO_STRING).min(room);
    write_header(packet, FrameKind::Pair, (4 + 1 + len) as u8, group, millis, device_id);
    packet[OFF_PAYLOAD..OFF_PAYLOAD + 4].copy_from_slice(&value.to_le_bytes());
    packet[OFF_PAYLOAD + 4] = len as u8;
    packet[OFF_PAYLOAD + 5..OFF_PAYLOAD + 5 + len].copy_from_slice(&name[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn integer_frame_round_trip() {
        let mut p = [0u8; PACKET_LEN];
        encode_integer(&mut p, -123456, 0, 17, 0xDEAD_BEEF);
        assert_eq!(p[OFF_TYPE], 0);
        assert_eq!(parse(&p), Some(Payload::Integer(-123456)));
    }

    #[test]
    fn string_frame_round_trip() {
        let mut p = [0u8; PACKET_LEN];
        encode_string(&mut p, b"hi", 0, 17, 1);
        assert_eq!(p[OFF_PAYLOAD], 2);
        assert_eq!(parse(&p), Some(Payload::Str(b"hi".as_slice())));
    }

    #[test]
    fn pair_frame_round_trip() {
        let mut p = [0u8; PACKET_LEN];
        encode_pair(&mut p, b"temp", 21, 0, 17, 1);
        assert_eq!(parse(&p), Some(Payload::Pair(21, b"temp".as_slice())));
    }

    #[test]
    fn long_strings_are_capped_at_nineteen_bytes() {
        let mut p = [0u8; PACKET_LEN];
        encode_string(&mut p, b"abcdefghijklmnopqrstuvwxyz", 0, 0, 1);
        match parse(&p) {
            Some(Payload::Str(s)) => assert_eq!(s, b"abcdefghijklmnopqrs".as_slice()),
            other => panic!("expected a string payload, got {other:?}"),
        }
    }

    #[test]
    fn double_frame_rounds_to_nearest() {
        for (d, expected) in [(2.5f64, 3), (-2.5, -3), (41.4, 41)] {
            let mut p = [0u8; PACKET_LEN];
            write_header(&mut p, FrameKind::Double, 8, 0, 0, 1);
            p[OFF_PAYLOAD..OFF_PAYLOAD + 8].copy_from_slice(&d.to_le_bytes());
            assert_eq!(parse(&p), Some(Payload::Integer(expected)));
        }
    }

    #[test_case(&[0u8; PACKET_LEN]; "all zero")]
    #[test_case(&{ let mut p = [0u8; PACKET_LEN]; p[0] = 16; p[1] = 2; p[3] = 1; p }; "wrong protocol")]
    #[test_case(&{ let mut p = [0u8; PACKET_LEN]; p[0] = 16; p[1] = 1; p[3] = 2; p }; "wrong version")]
    #[test_case(&{ let mut p = [0u8; PACKET_LEN]; p[0] = 8; p[1] = 1; p[3] = 1; p }; "too short")]
    fn non_frames_are_rejected(packet: &[u8; PACKET_LEN]) {
        assert_eq!(parse(packet), None);
    }
}
