use core::fmt;

/// Message opcodes of the host<->device protocol.
///
/// Host-to-device opcodes drive the chunk lifecycle; device-to-host opcodes
/// report run state, values and errors. `Ping` and `Broadcast` travel in
/// both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[non_exhaustive]
pub enum Opcode {
    /// Store a chunk: body is the chunk type byte followed by bytecode.
    ChunkCode = 1,
    /// Remove the chunk with this id.
    DeleteChunk = 2,
    /// Start the task for this chunk.
    StartChunk = 3,
    /// Stop the task for this chunk.
    StopChunk = 4,
    /// Start every stored chunk with a startable hat.
    StartAll = 5,
    /// Stop every running task.
    StopAll = 6,
    /// Read a global variable; the chunk id field carries the variable index.
    GetVar = 7,
    /// Write a global variable; body is a typed value.
    SetVar = 8,
    /// Ask the device for its firmware version string.
    GetVersion = 12,
    /// Ask the device to replay every stored chunk as `ChunkCode` frames.
    GetAllCode = 13,
    /// Forget all chunks; the host may reuse chunk ids afterwards.
    DeleteAllCode = 14,
    /// Reset chunks, tasks and the object arena.
    SystemReset = 15,
    /// A task began running.
    TaskStarted = 16,
    /// A task ran to completion without a value.
    TaskDone = 17,
    /// A reporter task finished; body is its typed result.
    TaskReturnedValue = 18,
    /// A task aborted; body\[0\] is the fault code.
    TaskError = 19,
    /// Ambient program output; chunk id 255 means stdout.
    OutputValue = 20,
    /// Reply to `GetVar`; body is a typed value.
    VarValue = 21,
    /// Reply to `GetVersion`; body is a string.
    Version = 22,
    /// Liveness probe, echoed verbatim.
    Ping = 26,
    /// Broadcast a string to every listener, on device or host.
    Broadcast = 27,
    /// Attach an attribute to a chunk: body is the attribute id byte plus
    /// its bytes. Attribute 0 is the broadcast-match string.
    ChunkAttribute = 28,
}

impl Opcode {
    /// Decode an opcode byte; `None` for ids this protocol version doesn't
    /// know, which the receive loop skips as a whole frame.
    pub const fn from_u8(b: u8) -> Option<Self> {
        use Opcode::*;
        match b {
            1 => Some(ChunkCode),
            2 => Some(DeleteChunk),
            3 => Some(StartChunk),
            4 => Some(StopChunk),
            5 => Some(StartAll),
            6 => Some(StopAll),
            7 => Some(GetVar),
            8 => Some(SetVar),
            12 => Some(GetVersion),
            13 => Some(GetAllCode),
            14 => Some(DeleteAllCode),
            15 => Some(SystemReset),
            16 => Some(TaskStarted),
            17 => Some(TaskDone),
            18 => Some(TaskReturnedValue),
            19 => Some(TaskError),
            20 => Some(OutputValue),
            21 => Some(VarValue),
            22 => Some(Version),
            26 => Some(Ping),
            27 => Some(Broadcast),
            28 => Some(ChunkAttribute),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// What kind of top-level block stack a chunk was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[non_exhaustive]
pub enum ChunkType {
    /// A command script started explicitly by the host.
    Command = 1,
    /// A reporter expression whose result is sent back.
    Reporter = 2,
    /// A function definition hat.
    FunctionHat = 3,
    /// Runs when the program starts.
    WhenStarted = 4,
    /// Runs whenever its condition reports true.
    WhenCondition = 5,
    /// Runs when a matching broadcast arrives.
    WhenBroadcastReceived = 6,
}

impl ChunkType {
    /// Decode a chunk type byte from a `ChunkCode` body.
    pub const fn from_u8(b: u8) -> Option<Self> {
        use ChunkType::*;
        match b {
            1 => Some(Command),
            2 => Some(Reporter),
            3 => Some(FunctionHat),
            4 => Some(WhenStarted),
            5 => Some(WhenCondition),
            6 => Some(WhenBroadcastReceived),
            _ => None,
        }
    }
}
