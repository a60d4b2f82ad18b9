//! Embedding-level error type.

use core::fmt;

use bloq_types::FaultReason;

/// Errors surfaced to the code embedding the VM.
///
/// Faults raised by user programs stay inside the task that caused them and
/// travel to the host as `taskError` frames; `VmError` is for conditions the
/// embedding itself must handle, like failing to carve out the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// The requested arena cannot hold the reserved singleton block and the
    /// static radio string objects.
    ArenaTooSmall {
        /// Words requested.
        words: usize,
        /// Smallest workable arena.
        minimum: usize,
    },
    /// A fault escaped task context, e.g. while the runtime itself was
    /// allocating.
    Fault(FaultReason),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::ArenaTooSmall { words, minimum } => {
                write!(f, "arena of {words} words is below the minimum of {minimum}")
            }
            VmError::Fault(reason) => write!(f, "fault outside task context: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VmError {}

impl From<FaultReason> for VmError {
    fn from(reason: FaultReason) -> Self {
        VmError::Fault(reason)
    }
}
