//! Host-side runtime adapter for bloq devices.
//!
//! The IDE talks to a device through this crate: it enumerates and opens
//! serial ports, keeps the board's liveness status from `ping` round-trips,
//! assigns chunk ids to blocks, and surfaces task state and values through
//! the [`BoardEvents`] hooks so the editor can highlight running blocks and
//! show returned results.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod chunks;
mod connection;
mod error;
mod link;
mod runtime;

pub use chunks::{ChunkEntry, ChunkIds};
pub use connection::{
    BoardEvents, Connection, ConnectionStatus, PING_INTERVAL, RESPONSE_WINDOW,
};
pub use error::HostError;
pub use link::{available_ports, Link, PipeLink, SerialLink, BAUD_RATE};
pub use runtime::HostRuntime;
