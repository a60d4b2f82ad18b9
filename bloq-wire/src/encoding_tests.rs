use alloc::{vec, vec::Vec};

use quickcheck_macros::quickcheck;
use rstest::rstest;
use strum::IntoEnumIterator;

use crate::{ChunkType, FrameBuffer, Message, Opcode, WireValue};

fn round_trip(msg: &Message) -> Message {
    let mut rx = FrameBuffer::new();
    rx.extend(&msg.encode());
    let out = rx.next_message().expect("one message in, one message out");
    assert_eq!(rx.pending(), 0);
    out
}

#[test]
fn every_opcode_round_trips_short_and_long() {
    for op in Opcode::iter() {
        for body in [Vec::new(), vec![7u8, 0, 255, 42]] {
            let msg = Message {
                op,
                chunk_id: 3,
                body,
            };
            assert_eq!(round_trip(&msg), msg);
        }
    }
}

#[test]
fn chunk_upload_frame_layout() {
    // chunkCode for chunk 0: type byte 1 (command) + four bytecode bytes.
    let msg = Message::chunk_code(0, ChunkType::Command, &[0x20, 0x00, 0x21, 0x00]);
    assert_eq!(
        msg.encode(),
        vec![251, 1, 0, 6, 0, 1, 0x20, 0x00, 0x21, 0x00, 254]
    );
}

#[test]
fn returned_value_frame_layout() {
    let msg = Message::task_returned(7, &WireValue::Int(42));
    assert_eq!(msg.encode(), vec![251, 18, 7, 6, 0, 1, 42, 0, 0, 0, 254]);
}

#[test]
fn ping_frame_layout() {
    assert_eq!(Message::ping().encode(), vec![250, 26, 0]);
}

#[rstest]
#[case(WireValue::Int(0))]
#[case(WireValue::Int(-1))]
#[case(WireValue::Int(i32::MAX))]
#[case(WireValue::Int(i32::MIN))]
#[case(WireValue::Bool(true))]
#[case(WireValue::Bool(false))]
#[case(WireValue::Str("".into()))]
#[case(WireValue::Str("héllo".into()))]
#[case(WireValue::Bytes(vec![]))]
#[case(WireValue::Bytes(vec![0, 127, 255]))]
fn typed_value_round_trip(#[case] value: WireValue) {
    assert_eq!(WireValue::decode(&value.encode()), Ok(value));
}

#[test]
fn junk_prefix_is_discarded_before_a_valid_frame() {
    let mut rx = FrameBuffer::new();
    rx.extend(&[0x00, 0xFF, 0x42]);
    rx.extend(&Message::ping().encode());
    assert_eq!(rx.next_message(), Some(Message::ping()));
    assert_eq!(rx.resyncs(), 1);
}

#[test]
fn partial_frames_wait_for_more_bytes() {
    let frame = Message::task_returned(7, &WireValue::Int(42)).encode();
    let mut rx = FrameBuffer::new();
    for &b in &frame[..frame.len() - 1] {
        rx.extend(&[b]);
        assert_eq!(rx.next_message(), None);
    }
    rx.extend(&frame[frame.len() - 1..]);
    assert_eq!(
        rx.next_message(),
        Some(Message::task_returned(7, &WireValue::Int(42)))
    );
}

#[test]
fn unknown_opcode_frames_are_skipped_whole() {
    let mut rx = FrameBuffer::new();
    rx.extend(&[250, 9, 0]); // opcode 9 is unassigned
    rx.extend(&Message::task_done(2).encode());
    assert_eq!(rx.next_message(), Some(Message::task_done(2)));
}

#[test]
fn corrupt_terminator_forces_resync() {
    let mut bad = Message::broadcast("go").encode();
    let last = bad.len() - 1;
    bad[last] = 0x00;
    let mut rx = FrameBuffer::new();
    rx.extend(&bad);
    rx.extend(&Message::ping().encode());
    assert_eq!(rx.next_message(), Some(Message::ping()));
    assert!(rx.resyncs() >= 1);
}

#[quickcheck]
fn arbitrary_bodies_round_trip(op_index: usize, chunk_id: u8, body: Vec<u8>) -> bool {
    let ops: Vec<Opcode> = Opcode::iter().collect();
    let op = ops[op_index % ops.len()];
    let body = body.into_iter().take(crate::MAX_BODY).collect::<Vec<_>>();
    let msg = Message { op, chunk_id, body };
    round_trip(&msg) == msg
}
