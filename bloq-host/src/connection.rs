use std::time::{Duration, Instant};

use bloq_types::FaultReason;
use bloq_wire::{FrameBuffer, Message, Opcode, WireValue};

use crate::{error::HostError, link::Link};

/// How often a `ping` goes out.
pub const PING_INTERVAL: Duration = Duration::from_secs(2);

/// How long after the last echo the board still counts as alive: one ping
/// interval plus 200 ms of grace.
pub const RESPONSE_WINDOW: Duration = Duration::from_millis(2200);

/// Liveness as shown in the IDE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A ping echo arrived within the response window.
    Connected,
    /// No port is open, or nothing was ever heard.
    NotConnected,
    /// The port is open but echoes stopped coming back.
    BoardNotResponding,
}

/// Hooks the IDE implements to surface device state: highlight running
/// blocks, show returned values, relay broadcasts.
pub trait BoardEvents {
    /// A task began running.
    fn task_started(&mut self, _chunk_id: u8) {}
    /// A task finished without a value.
    fn task_done(&mut self, _chunk_id: u8) {}
    /// A reporter finished; show the value on the matching block.
    fn task_returned(&mut self, _chunk_id: u8, _value: &WireValue) {}
    /// A task aborted with a fault.
    fn task_error(&mut self, _chunk_id: u8, _fault: FaultReason) {}
    /// Ambient program output; chunk id 255 is stdout.
    fn output_value(&mut self, _chunk_id: u8, _value: &WireValue) {}
    /// Reply to a variable read.
    fn var_value(&mut self, _index: u8, _value: &WireValue) {}
    /// A broadcast from the device.
    fn broadcast(&mut self, _text: &str) {}
    /// The device's firmware version string.
    fn version(&mut self, _version: &str) {}
}

/// Throwaway sink for callers that don't watch events.
impl BoardEvents for () {}

/// One open link to a board, with framing, ping scheduling and liveness.
#[derive(Debug)]
pub struct Connection<L> {
    link: Option<L>,
    frames: FrameBuffer,
    last_ping: Option<Instant>,
    last_heard: Option<Instant>,
}

impl<L: Link> Connection<L> {
    /// Wrap an open link.
    pub fn new(link: L) -> Self {
        Connection {
            link: Some(link),
            frames: FrameBuffer::new(),
            last_ping: None,
            last_heard: None,
        }
    }

    /// Drop the link and everything buffered on it.
    pub fn close(&mut self) {
        self.link = None;
        self.frames.clear();
        self.last_ping = None;
        self.last_heard = None;
    }

    /// Whether a link is attached.
    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Encode and write one message.
    pub fn send(&mut self, msg: &Message) -> Result<(), HostError> {
        let link = self.link.as_mut().ok_or(HostError::Closed)?;
        link.write_all(&msg.encode())
    }

    /// Liveness judged at `now`.
    pub fn status_at(&self, now: Instant) -> ConnectionStatus {
        if self.link.is_none() {
            return ConnectionStatus::NotConnected;
        }
        match self.last_heard {
            Some(heard) if now.duration_since(heard) <= RESPONSE_WINDOW => {
                ConnectionStatus::Connected
            }
            Some(_) => ConnectionStatus::BoardNotResponding,
            // Nothing echoed yet: not responding once the first ping has
            // gone unanswered past the window, otherwise still connecting.
            None => match self.last_ping {
                Some(pinged) if now.duration_since(pinged) > RESPONSE_WINDOW => {
                    ConnectionStatus::BoardNotResponding
                }
                _ => ConnectionStatus::NotConnected,
            },
        }
    }

    /// Liveness judged now.
    pub fn status(&self) -> ConnectionStatus {
        self.status_at(Instant::now())
    }

    /// Pump the connection: send a due ping, read whatever arrived and
    /// dispatch complete messages into `events`.
    ///
    /// Link failures degrade the connection to `NotConnected` rather than
    /// propagating; the caller keeps polling and may reopen.
    pub fn poll_at(&mut self, now: Instant, events: &mut dyn BoardEvents) {
        if self.link.is_none() {
            return;
        }
        let ping_due = self
            .last_ping
            .map_or(true, |t| now.duration_since(t) >= PING_INTERVAL);
        if ping_due {
            match self.send(&Message::ping()) {
                Ok(()) => self.last_ping = Some(now),
                Err(e) => {
                    tracing::warn!(error = %e, "ping failed; closing the link");
                    self.close();
                    return;
                }
            }
        }
        let mut buf = [0u8; 256];
        loop {
            let read = match self.link.as_mut() {
                Some(link) => link.read_available(&mut buf),
                None => return,
            };
            match read {
                Ok(0) => break,
                Ok(n) => self.frames.extend(&buf[..n]),
                Err(e) => {
                    tracing::warn!(error = %e, "read failed; closing the link");
                    self.close();
                    return;
                }
            }
        }
        let resyncs = self.frames.resyncs();
        while let Some(msg) = self.frames.next_message() {
            self.dispatch(msg, now, events);
        }
        if self.frames.resyncs() != resyncs {
            tracing::debug!(
                total = self.frames.resyncs(),
                "discarded junk bytes from the device"
            );
        }
    }

    /// [`poll_at`](Connection::poll_at) against the wall clock.
    pub fn poll(&mut self, events: &mut dyn BoardEvents) {
        self.poll_at(Instant::now(), events);
    }

    fn dispatch(&mut self, msg: Message, now: Instant, events: &mut dyn BoardEvents) {
        tracing::trace!(op = %msg.op, chunk = msg.chunk_id, "board message");
        match msg.op {
            Opcode::Ping => self.last_heard = Some(now),
            Opcode::TaskStarted => events.task_started(msg.chunk_id),
            Opcode::TaskDone => events.task_done(msg.chunk_id),
            Opcode::TaskReturnedValue => match msg.value() {
                Ok(value) => events.task_returned(msg.chunk_id, &value),
                Err(e) => tracing::debug!(error = %e, "bad taskReturnedValue body"),
            },
            Opcode::TaskError => {
                let code = msg.body.first().copied().unwrap_or(1);
                events.task_error(msg.chunk_id, FaultReason::from(code));
            }
            Opcode::OutputValue => match msg.value() {
                Ok(value) => events.output_value(msg.chunk_id, &value),
                Err(e) => tracing::debug!(error = %e, "bad outputValue body"),
            },
            Opcode::VarValue => match msg.value() {
                Ok(value) => events.var_value(msg.chunk_id, &value),
                Err(e) => tracing::debug!(error = %e, "bad varValue body"),
            },
            Opcode::Version => match msg.value() {
                Ok(WireValue::Str(version)) => events.version(&version),
                _ => tracing::debug!("bad version body"),
            },
            Opcode::Broadcast => {
                events.broadcast(&String::from_utf8_lossy(&msg.body));
            }
            // Host-to-device opcodes coming back mean an echo or a confused
            // peer; drop them.
            _ => tracing::debug!(op = %msg.op, "ignoring command opcode on host"),
        }
    }
}
