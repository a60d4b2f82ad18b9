use std::time::Instant;

use bloq_wire::{ChunkType, Message, WireValue};

use crate::{
    chunks::ChunkIds,
    connection::{BoardEvents, Connection, ConnectionStatus},
    error::HostError,
    link::Link,
};

/// The IDE-facing runtime: one connection plus the chunk-id registry.
///
/// Blocks are addressed by a stable key the editor chooses (e.g. its
/// serialized block id); the runtime maps keys to chunk ids and speaks the
/// wire protocol.
#[derive(Debug)]
pub struct HostRuntime<L> {
    connection: Connection<L>,
    ids: ChunkIds,
}

impl<L: Link> HostRuntime<L> {
    /// Wrap an open link.
    pub fn new(link: L) -> Self {
        HostRuntime {
            connection: Connection::new(link),
            ids: ChunkIds::new(),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<L> {
        &self.connection
    }

    /// The underlying connection, writable.
    pub fn connection_mut(&mut self) -> &mut Connection<L> {
        &mut self.connection
    }

    /// The chunk-id registry.
    pub fn chunk_ids(&self) -> &ChunkIds {
        &self.ids
    }

    /// The chunk-id registry, writable.
    pub fn chunk_ids_mut(&mut self) -> &mut ChunkIds {
        &mut self.ids
    }

    /// Current liveness.
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Pump I/O and deliver board events.
    pub fn poll(&mut self, events: &mut dyn BoardEvents) {
        self.connection.poll(events);
    }

    /// Pump I/O at an explicit instant, for deterministic tests.
    pub fn poll_at(&mut self, now: Instant, events: &mut dyn BoardEvents) {
        self.connection.poll_at(now, events);
    }

    /// Upload a block's compiled chunk, assigning its id on first save.
    pub fn save_chunk(
        &mut self,
        block: &str,
        chunk_type: ChunkType,
        code: &[u8],
    ) -> Result<u8, HostError> {
        let id = self.ids.ensure(block)?;
        self.connection
            .send(&Message::chunk_code(id, chunk_type, code))?;
        Ok(id)
    }

    /// Attach an attribute to a saved block's chunk, e.g. its broadcast
    /// match string.
    pub fn save_attribute(
        &mut self,
        block: &str,
        attribute: u8,
        bytes: &[u8],
    ) -> Result<(), HostError> {
        let id = self.id_of(block)?;
        self.connection
            .send(&Message::chunk_attribute(id, attribute, bytes))
    }

    /// Start a saved block's chunk.
    pub fn start(&mut self, block: &str) -> Result<(), HostError> {
        let id = self.id_of(block)?;
        self.connection.send(&Message::start_chunk(id))
    }

    /// Stop a saved block's chunk.
    pub fn stop(&mut self, block: &str) -> Result<(), HostError> {
        let id = self.id_of(block)?;
        self.connection.send(&Message::stop_chunk(id))
    }

    /// Start everything startable on the device.
    pub fn start_all(&mut self) -> Result<(), HostError> {
        self.connection.send(&Message::start_all())
    }

    /// Stop every running task on the device.
    pub fn stop_all(&mut self) -> Result<(), HostError> {
        self.connection.send(&Message::stop_all())
    }

    /// Broadcast a string to the device.
    pub fn broadcast(&mut self, text: &str) -> Result<(), HostError> {
        self.connection.send(&Message::broadcast(text))
    }

    /// Write a global variable.
    pub fn set_var(&mut self, index: u8, value: &WireValue) -> Result<(), HostError> {
        self.connection.send(&Message::set_var(index, value))
    }

    /// Request a global variable; the reply arrives as a
    /// [`BoardEvents::var_value`] event.
    pub fn get_var(&mut self, index: u8) -> Result<(), HostError> {
        self.connection.send(&Message::get_var(index))
    }

    /// Request the firmware version; the reply arrives as a
    /// [`BoardEvents::version`] event.
    pub fn get_version(&mut self) -> Result<(), HostError> {
        self.connection.send(&Message::get_version())
    }

    /// Delete every chunk on the device and free all chunk ids.
    pub fn delete_all_code(&mut self) -> Result<(), HostError> {
        self.connection.send(&Message::delete_all_code())?;
        self.ids.reset();
        Ok(())
    }

    /// Reset the device wholesale.
    pub fn system_reset(&mut self) -> Result<(), HostError> {
        self.connection.send(&Message::system_reset())
    }

    fn id_of(&self, block: &str) -> Result<u8, HostError> {
        self.ids
            .get(block)
            .ok_or_else(|| HostError::UnknownBlock(block.to_string()))
    }
}
