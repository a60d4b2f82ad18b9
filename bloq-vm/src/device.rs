//! Device-side runtime: chunk storage, task lifecycle and the serial
//! message loop.
//!
//! The runtime owns everything around bytecode execution: incoming frames
//! feed a [`FrameBuffer`], chunk uploads land in the store, and starting a
//! chunk hands it to the [`Executor`] together with the machine and the
//! primitive table. Task transitions and program output leave as encoded
//! frames through [`Device::drain_outgoing`].
//!
//! Execution itself is pluggable: the bytecode interpreter implements
//! [`Executor`]; tests use closures or [`NoopExecutor`].

use alloc::{string::String, vec::Vec};

use hashbrown::HashMap;

use bloq_types::{FaultReason, Value};
use bloq_wire::{ChunkType, FrameBuffer, Message, Opcode, STDOUT_CHUNK};

use crate::{
    consts::FIRMWARE_VERSION,
    machine::Machine,
    primitives::default_table,
    radio::RadioHw,
    registry::PrimitiveTable,
};

/// Attribute id carrying a hat chunk's broadcast-match string.
pub const BROADCAST_ATTRIBUTE: u8 = 0;

/// Upper bound on task runs per [`Device::step`], so a broadcast cycle
/// between hat chunks cannot wedge the message loop.
const MAX_TASK_RUNS_PER_STEP: usize = 64;

/// One stored chunk of compiled user code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chunk {
    /// What kind of block stack this chunk came from.
    pub chunk_type: ChunkType,
    /// The compiled bytecode.
    pub code: Vec<u8>,
    /// Attribute bytes attached after upload, e.g. the broadcast match
    /// string.
    pub attributes: Vec<(u8, Vec<u8>)>,
}

impl Chunk {
    /// Bytes of the first attribute with this id.
    pub fn attribute(&self, id: u8) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|(a, _)| *a == id)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

/// Executes one chunk's bytecode to completion.
///
/// The interpreter's opcode set lives behind this trait; the runtime only
/// depends on the contract that execution either finishes (optionally with
/// a value, for reporter chunks) or faults.
pub trait Executor<H: RadioHw> {
    /// Run `chunk` against `machine`, calling primitives through
    /// `primitives`.
    fn execute(
        &mut self,
        machine: &mut Machine<H>,
        primitives: &PrimitiveTable<H>,
        chunk_id: u8,
        chunk: &Chunk,
    ) -> Result<Option<Value>, FaultReason>;
}

impl<H, F> Executor<H> for F
where
    H: RadioHw,
    F: FnMut(
        &mut Machine<H>,
        &PrimitiveTable<H>,
        u8,
        &Chunk,
    ) -> Result<Option<Value>, FaultReason>,
{
    fn execute(
        &mut self,
        machine: &mut Machine<H>,
        primitives: &PrimitiveTable<H>,
        chunk_id: u8,
        chunk: &Chunk,
    ) -> Result<Option<Value>, FaultReason> {
        self(machine, primitives, chunk_id, chunk)
    }
}

/// Executor that treats every chunk as an empty program.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutor;

impl<H: RadioHw> Executor<H> for NoopExecutor {
    fn execute(
        &mut self,
        _machine: &mut Machine<H>,
        _primitives: &PrimitiveTable<H>,
        _chunk_id: u8,
        _chunk: &Chunk,
    ) -> Result<Option<Value>, FaultReason> {
        Ok(None)
    }
}

/// The device runtime.
#[derive(Debug)]
pub struct Device<H, X> {
    machine: Machine<H>,
    primitives: PrimitiveTable<H>,
    chunks: HashMap<u8, Chunk>,
    frames: FrameBuffer,
    executor: X,
    run_queue: Vec<u8>,
    out: Vec<u8>,
}

impl<H: RadioHw, X: Executor<H>> Device<H, X> {
    /// Wrap a machine and an executor; the default primitive sets are
    /// registered.
    pub fn new(machine: Machine<H>, executor: X) -> Self {
        Device {
            machine,
            primitives: default_table(),
            chunks: HashMap::new(),
            frames: FrameBuffer::new(),
            executor,
            run_queue: Vec::new(),
            out: Vec::new(),
        }
    }

    /// The machine.
    pub fn machine(&self) -> &Machine<H> {
        &self.machine
    }

    /// The machine, writable.
    pub fn machine_mut(&mut self) -> &mut Machine<H> {
        &mut self.machine
    }

    /// The registered primitives.
    pub fn primitives(&self) -> &PrimitiveTable<H> {
        &self.primitives
    }

    /// A stored chunk.
    pub fn chunk(&self, chunk_id: u8) -> Option<&Chunk> {
        self.chunks.get(&chunk_id)
    }

    /// Feed raw bytes from the serial link.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.frames.extend(bytes);
    }

    /// Encoded frames waiting to go out on the serial link.
    pub fn drain_outgoing(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.out)
    }

    /// Process buffered messages and run queued tasks.
    pub fn step(&mut self) {
        let resyncs = self.frames.resyncs();
        while let Some(msg) = self.frames.next_message() {
            self.handle(msg);
        }
        if self.frames.resyncs() != resyncs {
            tracing::debug!(
                total = self.frames.resyncs(),
                "discarded junk bytes on the serial link"
            );
        }
        let mut runs = 0;
        while !self.run_queue.is_empty() && runs < MAX_TASK_RUNS_PER_STEP {
            let chunk_id = self.run_queue.remove(0);
            self.run(chunk_id);
            runs += 1;
        }
    }

    fn send(&mut self, msg: &Message) {
        self.out.extend_from_slice(&msg.encode());
    }

    fn queue(&mut self, chunk_id: u8) {
        if !self.run_queue.contains(&chunk_id) {
            self.run_queue.push(chunk_id);
        }
    }

    fn handle(&mut self, msg: Message) {
        tracing::trace!(op = %msg.op, chunk = msg.chunk_id, "device message");
        match msg.op {
            Opcode::ChunkCode => {
                let Some((&type_byte, code)) = msg.body.split_first() else {
                    return;
                };
                let Some(chunk_type) = ChunkType::from_u8(type_byte) else {
                    tracing::debug!(type_byte, "unknown chunk type; upload dropped");
                    return;
                };
                self.chunks.insert(
                    msg.chunk_id,
                    Chunk {
                        chunk_type,
                        code: code.to_vec(),
                        attributes: Vec::new(),
                    },
                );
            }
            Opcode::DeleteChunk => {
                self.chunks.remove(&msg.chunk_id);
                self.run_queue.retain(|&id| id != msg.chunk_id);
            }
            Opcode::StartChunk => self.queue(msg.chunk_id),
            Opcode::StopChunk => self.run_queue.retain(|&id| id != msg.chunk_id),
            Opcode::StartAll => {
                let mut ids: Vec<u8> = self
                    .chunks
                    .iter()
                    .filter(|(_, c)| c.chunk_type == ChunkType::WhenStarted)
                    .map(|(&id, _)| id)
                    .collect();
                ids.sort_unstable();
                for id in ids {
                    self.queue(id);
                }
            }
            Opcode::StopAll => self.run_queue.clear(),
            Opcode::GetVar => {
                let index = usize::from(msg.chunk_id);
                match self.machine.global(index).and_then(|v| self.machine.to_wire(v)) {
                    Ok(wv) => self.send(&Message::var_value(msg.chunk_id, &wv)),
                    Err(reason) => {
                        tracing::debug!(index, %reason, "getVar ignored");
                    }
                }
            }
            Opcode::SetVar => {
                let index = usize::from(msg.chunk_id);
                let stored = match msg.value() {
                    Ok(wv) => match self.machine.value_from_wire(&wv) {
                        Ok(v) => self.machine.set_global(index, v),
                        Err(reason) => Err(reason),
                    },
                    Err(_) => Err(FaultReason::Unspecified),
                };
                if let Err(reason) = stored {
                    tracing::debug!(index, %reason, "setVar ignored");
                }
            }
            Opcode::GetVersion => self.send(&Message::version(FIRMWARE_VERSION)),
            Opcode::GetAllCode => {
                let mut ids: Vec<u8> = self.chunks.keys().copied().collect();
                ids.sort_unstable();
                for id in ids {
                    let chunk = self.chunks[&id].clone();
                    self.send(&Message::chunk_code(id, chunk.chunk_type, &chunk.code));
                    for (attr, bytes) in &chunk.attributes {
                        self.send(&Message::chunk_attribute(id, *attr, bytes));
                    }
                }
            }
            Opcode::DeleteAllCode => {
                self.chunks.clear();
                self.run_queue.clear();
            }
            Opcode::SystemReset => {
                self.chunks.clear();
                self.run_queue.clear();
                self.machine.reset_globals();
                self.machine.arena_mut().clear();
            }
            Opcode::Ping => self.send(&Message::ping()),
            Opcode::Broadcast => {
                let text = msg.body.clone();
                self.start_broadcast_listeners(&text);
            }
            Opcode::ChunkAttribute => {
                let Some((&attribute, bytes)) = msg.body.split_first() else {
                    return;
                };
                if let Some(chunk) = self.chunks.get_mut(&msg.chunk_id) {
                    chunk.attributes.push((attribute, bytes.to_vec()));
                }
            }
            // Device-to-host reports arriving here mean the peer is
            // confused; drop them.
            _ => {
                tracing::debug!(op = %msg.op, "ignoring report opcode on device");
            }
        }
    }

    fn start_broadcast_listeners(&mut self, text: &[u8]) {
        let mut ids: Vec<u8> = self
            .chunks
            .iter()
            .filter(|(_, c)| {
                c.chunk_type == ChunkType::WhenBroadcastReceived
                    && c.attribute(BROADCAST_ATTRIBUTE) == Some(text)
            })
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        for id in ids {
            self.queue(id);
        }
    }

    fn run(&mut self, chunk_id: u8) {
        let Some(chunk) = self.chunks.get(&chunk_id).cloned() else {
            self.send(&Message::task_error(
                chunk_id,
                FaultReason::BadChunkIndex.code(),
            ));
            return;
        };
        self.send(&Message::task_started(chunk_id));
        self.machine.set_current_chunk(chunk_id);
        let result =
            self.executor
                .execute(&mut self.machine, &self.primitives, chunk_id, &chunk);
        self.flush_machine_events();
        match result {
            Ok(Some(value)) => match self.machine.to_wire(value) {
                Ok(wv) => self.send(&Message::task_returned(chunk_id, &wv)),
                Err(reason) => self.send(&Message::task_error(chunk_id, reason.code())),
            },
            Ok(None) => self.send(&Message::task_done(chunk_id)),
            Err(reason) => self.send(&Message::task_error(chunk_id, reason.code())),
        }
        self.machine.set_current_chunk(STDOUT_CHUNK);
    }

    /// Turn queued program output and broadcasts into frames; a broadcast
    /// also starts matching local hat chunks.
    fn flush_machine_events(&mut self) {
        let chunk_id = self.machine.current_chunk();
        for value in self.machine.take_outputs() {
            match self.machine.to_wire(value) {
                Ok(wv) => self.send(&Message::output_value(chunk_id, &wv)),
                Err(reason) => {
                    tracing::debug!(%reason, "unprintable output value dropped");
                }
            }
        }
        let broadcasts: Vec<String> = self.machine.take_broadcasts();
        for text in broadcasts {
            self.send(&Message::broadcast(&text));
            self.start_broadcast_listeners(text.as_bytes());
        }
    }
}
