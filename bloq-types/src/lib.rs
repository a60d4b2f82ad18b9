//! Atomic types of the bloq VM.
//!
//! The device firmware, the wire codec, and the host tooling all agree on two
//! contracts: the in-word encoding of dynamic values ([`Value`]) and the
//! numeric fault table reported over the wire ([`FaultReason`]). Both live
//! here so no other crate re-derives them.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod fault;
mod value;

pub use fault::FaultReason;
pub use value::{ClassId, Value, Word, INT_MAX, INT_MIN, WORD_SIZE};
