//! VM parameters

use static_assertions::const_assert;

/// Words occupied by an object header.
pub const HEADER_WORDS: usize = 1;

/// Arena words reserved so no object lands on the byte offsets of the
/// `nil` (0), `false` (4) and `true` (8) singletons.
pub const RESERVED_WORDS: usize = 3;

/// Size of the global variable table.
pub const GLOBAL_COUNT: usize = 25;

/// Operand stack limit, in values.
pub const STACK_LIMIT: usize = 256;

/// Default arena size for embeddings that don't pick one, in words.
pub const DEFAULT_ARENA_WORDS: usize = 4096;

/// Largest data word count encodable in an object header (24-bit field).
pub const MAX_OBJ_WORDS: usize = (1 << 24) - 1;

/// Radio packet size, in bytes.
pub const PACKET_LEN: usize = 32;

/// Slots in the radio receive ring. The ring index is masked, so this must
/// stay a power of two.
pub const MAX_PACKETS: usize = 16;

/// Longest string payload extracted from a radio message.
pub const MAX_RADIO_STRING: usize = 19;

/// Radio base address, the ASCII bytes `'uBit'`.
pub const RADIO_BASE_ADDRESS: u32 = 0x7562_6974;

/// Radio channel selected on first use (2407 MHz).
pub const RADIO_DEFAULT_CHANNEL: u8 = 7;

/// Transmit power level selected on first use.
pub const RADIO_DEFAULT_POWER: u8 = 6;

/// Whitening initialization vector.
pub const RADIO_WHITENING_IV: u8 = 0x18;

/// Version string reported in reply to `getVersion`.
pub const FIRMWARE_VERSION: &str = concat!("bloq ", env!("CARGO_PKG_VERSION"));

const_assert!(MAX_PACKETS.is_power_of_two());
const_assert!(RESERVED_WORDS * bloq_types::WORD_SIZE == 12);
const_assert!(STACK_LIMIT >= 32);
