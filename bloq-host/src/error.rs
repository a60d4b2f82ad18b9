use thiserror::Error;

/// Host adapter error variants.
#[derive(Debug, Error)]
pub enum HostError {
    /// Opening or configuring the serial port failed.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// Reading or writing the open port failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The link was closed, locally or by an earlier failure.
    #[error("the serial link is closed")]
    Closed,
    /// All 255 chunk ids are taken; only `deleteAllCode` frees them.
    #[error("no chunk ids left to assign")]
    ChunkIdsExhausted,
    /// The block was never saved, so it has no chunk id.
    #[error("block {0:?} has no assigned chunk")]
    UnknownBlock(String),
}
