use core::fmt;

/// Fault codes reported from primitives and the interpreter to the host.
///
/// The numbers are part of the wire contract (`taskError` carries the code
/// in the first body byte) and stay stable across firmware versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[non_exhaustive]
pub enum FaultReason {
    /// Task completed without a fault.
    NoError = 0,
    /// The byte can't be mapped to any known fault.
    Unspecified = 1,
    /// A chunk id with no stored chunk behind it.
    BadChunkIndex = 2,
    /// The arena bump allocator is exhausted.
    InsufficientMemory = 10,
    /// Operation needs a list argument.
    NeedsArray = 11,
    /// Operation needs a boolean argument.
    NeedsBoolean = 12,
    /// Operation needs an integer argument.
    NeedsInteger = 13,
    /// Operation needs a string argument.
    NeedsString = 14,
    /// Equality is only defined on integers, booleans, nil and strings.
    NonComparable = 15,
    /// Requested collection size is negative or too large.
    ArraySize = 16,
    /// Index argument is neither an integer nor a recognized keyword.
    NeedsIntegerIndex = 17,
    /// Index outside `[1, count]`.
    IndexOutOfRange = 18,
    /// Byte array elements must be integers in `0..=255`.
    ByteArrayStore = 19,
    /// Hexadecimal literal out of the representable range.
    HexRange = 20,
    /// I²C device id outside `0..=127`.
    I2cDeviceId = 21,
    /// I²C register id outside `0..=255`.
    I2cRegisterId = 22,
    /// I²C value outside `0..=255`.
    I2cValue = 23,
    /// `return` used outside a function-definition chunk.
    NotInFunction = 24,
    /// `for` loop argument is not a list or integer.
    BadForLoopArg = 25,
    /// Operand stack limit exceeded.
    StackOverflow = 26,
    /// Operation needs an indexable argument (list, string or byte array).
    NeedsIndexable = 27,
    /// `join` arguments must all be lists or all be strings.
    JoinArgsNotSameType = 28,
}

impl FaultReason {
    /// The numeric code sent in a `taskError` body.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FaultReason {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<u8> for FaultReason {
    /// Converts the `u8` into a `FaultReason`.
    fn from(b: u8) -> Self {
        use FaultReason::*;
        match b {
            0 => NoError,
            2 => BadChunkIndex,
            10 => InsufficientMemory,
            11 => NeedsArray,
            12 => NeedsBoolean,
            13 => NeedsInteger,
            14 => NeedsString,
            15 => NonComparable,
            16 => ArraySize,
            17 => NeedsIntegerIndex,
            18 => IndexOutOfRange,
            19 => ByteArrayStore,
            20 => HexRange,
            21 => I2cDeviceId,
            22 => I2cRegisterId,
            23 => I2cValue,
            24 => NotInFunction,
            25 => BadForLoopArg,
            26 => StackOverflow,
            27 => NeedsIndexable,
            28 => JoinArgsNotSameType,
            _ => Unspecified,
        }
    }
}
