//! bloq VM core.
//!
//! The device side of the bloq system: a bump-allocated object arena, the
//! data primitives user programs call, the 2.4 GHz radio layer, and the
//! runtime that owns the chunk lifecycle behind the serial wire protocol.
//! The bytecode interpreter itself plugs in through [`device::Executor`];
//! everything it needs (object memory, fault codes, the primitive table)
//! is defined here.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

pub mod consts;
pub mod device;
pub mod error;
pub mod machine;
pub mod memory;
pub mod primitives;
pub mod radio;
pub mod registry;

pub mod prelude {
    //! Everything an embedding typically needs.
    #[doc(no_inline)]
    pub use bloq_types::{ClassId, FaultReason, Value, Word};
    #[doc(no_inline)]
    pub use bloq_wire::{ChunkType, FrameBuffer, Message, Opcode, WireValue};

    pub use crate::{
        device::{Chunk, Device, Executor, NoopExecutor},
        error::VmError,
        machine::Machine,
        memory::Arena,
        primitives::default_table,
        radio::{MessageKind, Radio, RadioConfig, RadioEvents, RadioHw, RadioState},
        registry::{ArgRange, Primitive, PrimitiveTable},
    };

    #[cfg(any(test, feature = "test-helpers"))]
    pub use crate::radio::LoopbackRadio;
}
