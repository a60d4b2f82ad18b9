use alloc::vec::Vec;

use crate::{message::Message, opcode::Opcode, LONG_MARK, SHORT_MARK, TERMINATOR};

/// Rolling receive buffer shared by both ends of the serial link.
///
/// Raw bytes go in with [`extend`](FrameBuffer::extend); whole messages come
/// out of [`next_message`](FrameBuffer::next_message). When the byte at the
/// read cursor is not a frame mark some bytes were lost on the wire: the
/// unparseable prefix is discarded up to the next mark and the in-flight
/// frame is gone. No retransmit is requested; the stream heals on the next
/// well-formed frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    resyncs: u64,
}

impl FrameBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the link.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes currently waiting to be parsed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// How many times the parser had to discard garbage to find a frame
    /// mark. Useful as a link-quality diagnostic.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Drop everything buffered, e.g. after reopening the port.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Pop the next complete message, or `None` when the buffer holds only
    /// a partial frame (or nothing parseable yet).
    ///
    /// Frames with opcodes this protocol version doesn't know are drained
    /// and skipped, so dispatch stays idempotent across junk and version
    /// mismatches.
    pub fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.buf.first() {
                None => return None,
                Some(&SHORT_MARK) => {
                    if self.buf.len() < 3 {
                        return None;
                    }
                    let op = Opcode::from_u8(self.buf[1]);
                    let chunk_id = self.buf[2];
                    self.buf.drain(..3);
                    match op {
                        Some(op) => return Some(Message::short(op, chunk_id)),
                        None => continue,
                    }
                }
                Some(&LONG_MARK) => {
                    if self.buf.len() < 5 {
                        return None;
                    }
                    let len = usize::from(u16::from_le_bytes([self.buf[3], self.buf[4]]));
                    if len == 0 {
                        // A long frame always carries at least its terminator.
                        self.resync();
                        continue;
                    }
                    let total = 5 + len;
                    if self.buf.len() < total {
                        return None;
                    }
                    if self.buf[total - 1] != TERMINATOR {
                        self.resync();
                        continue;
                    }
                    let op = Opcode::from_u8(self.buf[1]);
                    let chunk_id = self.buf[2];
                    let body = self.buf[5..total - 1].to_vec();
                    self.buf.drain(..total);
                    match op {
                        Some(op) => return Some(Message::long(op, chunk_id, body)),
                        None => continue,
                    }
                }
                Some(_) => self.resync(),
            }
        }
    }

    /// Discard bytes up to the next frame mark.
    fn resync(&mut self) {
        let next = self.buf[1..]
            .iter()
            .position(|&b| b == SHORT_MARK || b == LONG_MARK);
        match next {
            Some(i) => self.buf.drain(..=i),
            None => self.buf.drain(..),
        };
        self.resyncs = self.resyncs.saturating_add(1);
    }
}
