//! Device-side protocol scenarios driven over raw frame bytes.

use bloq_vm::prelude::*;

fn device() -> Device<LoopbackRadio, NoopExecutor> {
    let (hw, _peer) = LoopbackRadio::pair();
    Device::new(Machine::new(hw, 1024).unwrap(), NoopExecutor)
}

fn decode_all(bytes: Vec<u8>) -> Vec<Message> {
    let mut rx = FrameBuffer::new();
    rx.extend(&bytes);
    let mut out = Vec::new();
    while let Some(msg) = rx.next_message() {
        out.push(msg);
    }
    out
}

#[test]
fn chunk_upload_and_run_reports_started_then_done() {
    let mut dev = device();
    // chunkCode for chunk 0: command chunk with four bytecode bytes.
    dev.receive(&[251, 1, 0, 6, 0, 1, 0x20, 0x00, 0x21, 0x00, 254]);
    dev.receive(&Message::start_chunk(0).encode());
    dev.step();
    assert_eq!(dev.drain_outgoing(), vec![250, 16, 0, 250, 17, 0]);
}

#[test]
fn reporter_chunk_returns_its_value() {
    let (hw, _peer) = LoopbackRadio::pair();
    let machine = Machine::new(hw, 1024).unwrap();
    let executor = |_m: &mut Machine<LoopbackRadio>,
                    _p: &PrimitiveTable<LoopbackRadio>,
                    _id: u8,
                    _c: &Chunk|
     -> Result<Option<Value>, FaultReason> { Ok(Some(Value::int(21 * 2))) };
    let mut dev = Device::new(machine, executor);

    dev.receive(&Message::chunk_code(7, ChunkType::Reporter, &[0x01]).encode());
    dev.receive(&Message::start_chunk(7).encode());
    dev.step();
    let out = dev.drain_outgoing();
    // taskStarted, then taskReturnedValue carrying integer 42.
    assert_eq!(
        out,
        vec![250, 16, 7, 251, 18, 7, 6, 0, 1, 42, 0, 0, 0, 254]
    );
}

#[test]
fn junk_bytes_resync_and_the_next_frame_dispatches() {
    let mut dev = device();
    dev.receive(&[0x00, 0xFF, 0x42]);
    dev.receive(&Message::ping().encode());
    dev.step();
    assert_eq!(decode_all(dev.drain_outgoing()), vec![Message::ping()]);
}

#[test]
fn starting_an_unknown_chunk_is_a_bad_chunk_index_error() {
    let mut dev = device();
    dev.receive(&Message::start_chunk(9).encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![Message::task_error(9, FaultReason::BadChunkIndex.code())]
    );
}

#[test]
fn task_faults_surface_as_task_error_frames() {
    let (hw, _peer) = LoopbackRadio::pair();
    let machine = Machine::new(hw, 1024).unwrap();
    let executor = |_m: &mut Machine<LoopbackRadio>,
                    _p: &PrimitiveTable<LoopbackRadio>,
                    _id: u8,
                    _c: &Chunk|
     -> Result<Option<Value>, FaultReason> {
        Err(FaultReason::IndexOutOfRange)
    };
    let mut dev = Device::new(machine, executor);
    dev.receive(&Message::chunk_code(3, ChunkType::Command, &[]).encode());
    dev.receive(&Message::start_chunk(3).encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![
            Message::task_started(3),
            Message::task_error(3, FaultReason::IndexOutOfRange.code()),
        ]
    );
}

#[test]
fn variables_round_trip_through_set_var_and_get_var() {
    let mut dev = device();
    dev.receive(&Message::set_var(3, &WireValue::Int(7)).encode());
    dev.receive(&Message::set_var(4, &WireValue::Str("name".into())).encode());
    dev.receive(&Message::get_var(3).encode());
    dev.receive(&Message::get_var(4).encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![
            Message::var_value(3, &WireValue::Int(7)),
            Message::var_value(4, &WireValue::Str("name".into())),
        ]
    );
}

#[test]
fn broadcast_starts_matching_hat_chunks() {
    let mut dev = device();
    dev.receive(&Message::chunk_code(2, ChunkType::WhenBroadcastReceived, &[]).encode());
    dev.receive(&Message::chunk_attribute(2, 0, b"go").encode());
    dev.receive(&Message::chunk_code(5, ChunkType::WhenBroadcastReceived, &[]).encode());
    dev.receive(&Message::chunk_attribute(5, 0, b"other").encode());
    dev.receive(&Message::broadcast("go").encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![Message::task_started(2), Message::task_done(2)]
    );
}

#[test]
fn start_all_runs_when_started_hats_in_id_order() {
    let mut dev = device();
    dev.receive(&Message::chunk_code(4, ChunkType::WhenStarted, &[]).encode());
    dev.receive(&Message::chunk_code(1, ChunkType::WhenStarted, &[]).encode());
    dev.receive(&Message::chunk_code(2, ChunkType::Command, &[]).encode());
    dev.receive(&Message::start_all().encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![
            Message::task_started(1),
            Message::task_done(1),
            Message::task_started(4),
            Message::task_done(4),
        ]
    );
}

#[test]
fn program_output_and_broadcasts_become_frames() {
    let (hw, _peer) = LoopbackRadio::pair();
    let machine = Machine::new(hw, 1024).unwrap();
    let executor = |m: &mut Machine<LoopbackRadio>,
                    _p: &PrimitiveTable<LoopbackRadio>,
                    id: u8,
                    _c: &Chunk|
     -> Result<Option<Value>, FaultReason> {
        if id == 0 {
            m.emit_output(Value::int(99));
            m.emit_broadcast("chime".into());
        }
        Ok(None)
    };
    let mut dev = Device::new(machine, executor);

    dev.receive(&Message::chunk_code(0, ChunkType::Command, &[]).encode());
    dev.receive(&Message::chunk_code(6, ChunkType::WhenBroadcastReceived, &[]).encode());
    dev.receive(&Message::chunk_attribute(6, 0, b"chime").encode());
    dev.receive(&Message::start_chunk(0).encode());
    dev.step();

    // Output is charged to the running chunk, the broadcast goes out on
    // the wire and also starts the matching local hat.
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![
            Message::task_started(0),
            Message::output_value(0, &WireValue::Int(99)),
            Message::broadcast("chime"),
            Message::task_done(0),
            Message::task_started(6),
            Message::task_done(6),
        ]
    );
}

#[test]
fn ping_is_echoed() {
    let mut dev = device();
    dev.receive(&Message::ping().encode());
    dev.step();
    assert_eq!(dev.drain_outgoing(), vec![250, 26, 0]);
}

#[test]
fn get_version_reports_the_firmware_string() {
    let mut dev = device();
    dev.receive(&Message::get_version().encode());
    dev.step();
    let replies = decode_all(dev.drain_outgoing());
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].op, Opcode::Version);
    match replies[0].value().unwrap() {
        WireValue::Str(s) => assert!(s.starts_with("bloq ")),
        other => panic!("expected a string version, got {other:?}"),
    }
}

#[test]
fn get_all_code_replays_chunks_and_attributes() {
    let mut dev = device();
    dev.receive(&Message::chunk_code(1, ChunkType::Command, &[9, 9]).encode());
    dev.receive(&Message::chunk_attribute(1, 0, b"tag").encode());
    dev.receive(&Message::get_all_code().encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![
            Message::chunk_code(1, ChunkType::Command, &[9, 9]),
            Message::chunk_attribute(1, 0, b"tag"),
        ]
    );
}

#[test]
fn delete_all_code_forgets_every_chunk() {
    let mut dev = device();
    dev.receive(&Message::chunk_code(0, ChunkType::Command, &[1]).encode());
    dev.receive(&Message::delete_all_code().encode());
    dev.receive(&Message::start_chunk(0).encode());
    dev.step();
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![Message::task_error(0, FaultReason::BadChunkIndex.code())]
    );
}

#[test]
fn system_reset_clears_chunks_globals_and_arena() {
    let mut dev = device();
    dev.receive(&Message::chunk_code(0, ChunkType::Command, &[1]).encode());
    dev.receive(&Message::set_var(0, &WireValue::Str("boo".into())).encode());
    dev.step();
    let free_before_reset = dev.machine().arena().free_index();
    dev.receive(&Message::system_reset().encode());
    dev.receive(&Message::get_var(0).encode());
    dev.step();
    assert!(dev.machine().arena().free_index() < free_before_reset);
    assert_eq!(dev.chunk(0), None);
    // Globals read back as nil, formatted to the empty string.
    assert_eq!(
        decode_all(dev.drain_outgoing()),
        vec![Message::var_value(0, &WireValue::Str("".into()))]
    );
}

#[test]
fn split_delivery_still_dispatches_whole_frames() {
    let mut dev = device();
    let frame = Message::chunk_code(0, ChunkType::Command, &[1, 2, 3]).encode();
    let (head, tail) = frame.split_at(4);
    dev.receive(head);
    dev.step();
    assert!(dev.chunk(0).is_none());
    dev.receive(tail);
    dev.step();
    assert_eq!(
        dev.chunk(0).map(|c| c.code.clone()),
        Some(vec![1, 2, 3])
    );
}
