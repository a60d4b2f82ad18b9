//! Shared machine state: arena, operand stack, globals and the radio.
//!
//! A [`Machine`] is everything a primitive can touch. The bytecode
//! interpreter pushes arguments on the operand stack and hands primitives an
//! [`ArgRange`](crate::registry::ArgRange) into it; because the stack and
//! the arena live here, a primitive that allocates can re-fetch its
//! arguments afterwards, which is the growth-safety discipline every
//! allocating primitive follows.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use rand::{rngs::SmallRng, Rng, SeedableRng};

use bloq_types::{ClassId, FaultReason, Value};
use bloq_wire::WireValue;

use crate::{
    consts::{GLOBAL_COUNT, STACK_LIMIT},
    error::VmError,
    memory::Arena,
    radio::{Radio, RadioHw},
    registry::ArgRange,
};

/// Data words of the static slot the radio's received string is copied
/// into: room for 19 payload bytes plus the terminator.
const RECEIVED_SLOT_WORDS: usize = 5;

/// Data words of the static slot holding the received-message type name.
const TYPE_SLOT_WORDS: usize = 2;

/// The VM state shared by the interpreter and every primitive.
#[derive(Debug)]
pub struct Machine<H> {
    arena: Arena,
    stack: Vec<Value>,
    globals: [Value; GLOBAL_COUNT],
    rng: SmallRng,
    radio: Radio<H>,
    received_string_slot: Value,
    message_type_slot: Value,
    current_chunk: u8,
    outputs: Vec<Value>,
    broadcasts: Vec<String>,
}

impl<H: RadioHw> Machine<H> {
    /// Build a machine with an arena of `arena_words` words.
    ///
    /// The radio's two static string objects are carved out below the
    /// arena's rewind floor before anything else can allocate, so they
    /// survive [`Arena::clear`] and keep the high-frequency receive path
    /// off the bump allocator.
    pub fn new(hw: H, arena_words: usize) -> Result<Self, VmError> {
        let mut arena = Arena::new(arena_words)?;
        let received_string_slot = arena.alloc_static(ClassId::String, RECEIVED_SLOT_WORDS)?;
        let message_type_slot = arena.alloc_static(ClassId::String, TYPE_SLOT_WORDS)?;
        let seed = u64::from(hw.device_id()) ^ 0x62_6c_6f_71;
        Ok(Machine {
            arena,
            stack: Vec::new(),
            globals: [Value::NIL; GLOBAL_COUNT],
            rng: SmallRng::seed_from_u64(seed),
            radio: Radio::new(hw),
            received_string_slot,
            message_type_slot,
            current_chunk: bloq_wire::STDOUT_CHUNK,
            outputs: Vec::new(),
            broadcasts: Vec::new(),
        })
    }

    /// The object arena.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The object arena, writable.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// The radio driver.
    pub fn radio(&self) -> &Radio<H> {
        &self.radio
    }

    /// The radio driver, writable.
    pub fn radio_mut(&mut self) -> &mut Radio<H> {
        &mut self.radio
    }

    // Operand stack.

    /// Push a value; faults when the stack limit is hit.
    pub fn push(&mut self, v: Value) -> Result<(), FaultReason> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(FaultReason::StackOverflow);
        }
        self.stack.push(v);
        Ok(())
    }

    /// Pop a value; nil on an empty stack.
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::NIL)
    }

    /// Stack depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The range covering the topmost `count` stack slots, i.e. the
    /// arguments just pushed for a primitive call.
    pub fn top_args(&self, count: usize) -> Result<ArgRange, FaultReason> {
        if count > self.stack.len() {
            return Err(FaultReason::Unspecified);
        }
        Ok(ArgRange::new(self.stack.len() - count, count))
    }

    /// Re-fetch argument `i` from the stack. Always read arguments through
    /// this after any allocation; nil for slots outside the range.
    pub fn arg(&self, args: ArgRange, i: usize) -> Value {
        if i >= args.count {
            return Value::NIL;
        }
        self.stack.get(args.base + i).copied().unwrap_or(Value::NIL)
    }

    /// Replace argument `i`, e.g. with a relocated reference after a
    /// resize.
    pub fn set_arg(&mut self, args: ArgRange, i: usize, v: Value) {
        if i < args.count {
            if let Some(slot) = self.stack.get_mut(args.base + i) {
                *slot = v;
            }
        }
    }

    /// Drop a primitive's arguments and push its result in their place.
    pub fn return_value(&mut self, args: ArgRange, result: Value) -> Result<(), FaultReason> {
        self.stack.truncate(args.base);
        self.push(result)
    }

    // Globals.

    /// Read global variable `i`.
    pub fn global(&self, i: usize) -> Result<Value, FaultReason> {
        self.globals.get(i).copied().ok_or(FaultReason::IndexOutOfRange)
    }

    /// Write global variable `i`.
    pub fn set_global(&mut self, i: usize, v: Value) -> Result<(), FaultReason> {
        match self.globals.get_mut(i) {
            Some(slot) => {
                *slot = v;
                Ok(())
            }
            None => Err(FaultReason::IndexOutOfRange),
        }
    }

    /// Reset every global to nil.
    pub fn reset_globals(&mut self) {
        self.globals = [Value::NIL; GLOBAL_COUNT];
    }

    /// Uniform random index in `[1, count]`.
    pub fn random_index(&mut self, count: usize) -> usize {
        self.rng.gen_range(1..=count)
    }

    // Task plumbing.

    /// Chunk id charged with subsequent output, or 255 outside any task.
    pub fn current_chunk(&self) -> u8 {
        self.current_chunk
    }

    /// Set the chunk id charged with subsequent output.
    pub fn set_current_chunk(&mut self, chunk_id: u8) {
        self.current_chunk = chunk_id;
    }

    /// Queue a value for an `outputValue` frame.
    pub fn emit_output(&mut self, v: Value) {
        self.outputs.push(v);
    }

    /// Drain queued output values.
    pub fn take_outputs(&mut self) -> Vec<Value> {
        core::mem::take(&mut self.outputs)
    }

    /// Queue an outgoing broadcast.
    pub fn emit_broadcast(&mut self, text: String) {
        self.broadcasts.push(text);
    }

    /// Drain queued broadcasts.
    pub fn take_broadcasts(&mut self) -> Vec<String> {
        core::mem::take(&mut self.broadcasts)
    }

    // Radio glue.

    /// Copy the radio's received string into its static slot and return
    /// the slot's reference.
    pub fn received_string(&mut self) -> Result<Value, FaultReason> {
        let mut text = [0u8; crate::consts::MAX_RADIO_STRING];
        let src = self.radio.received().text();
        text[..src.len()].copy_from_slice(src);
        let len = src.len();
        self.arena.write_static_string(
            self.received_string_slot,
            RECEIVED_SLOT_WORDS,
            &text[..len],
        )?;
        Ok(self.received_string_slot)
    }

    /// Write the received-message type name into its static slot and
    /// return the slot's reference.
    pub fn received_message_type(&mut self) -> Result<Value, FaultReason> {
        let name = self.radio.received().kind.name();
        self.arena
            .write_static_string(self.message_type_slot, TYPE_SLOT_WORDS, name.as_bytes())?;
        Ok(self.message_type_slot)
    }

    // Value semantics shared with the wire layer.

    /// Equality as user programs see it: defined on integers, booleans,
    /// nil and strings (byte-wise); comparing lists or byte arrays faults.
    pub fn equal(&self, a: Value, b: Value) -> Result<bool, FaultReason> {
        for v in [a, b] {
            match self.arena.class_of(v) {
                Some(ClassId::List) | Some(ClassId::ByteArray) => {
                    return Err(FaultReason::NonComparable)
                }
                _ if v.is_obj() && self.arena.class_of(v).is_none() => {
                    return Err(FaultReason::NonComparable)
                }
                _ => {}
            }
        }
        if a.is_int() && b.is_int() {
            return Ok(a.as_int() == b.as_int());
        }
        let a_str = self.arena.class_of(a) == Some(ClassId::String);
        let b_str = self.arena.class_of(b) == Some(ClassId::String);
        if a_str && b_str {
            return Ok(self.arena.string_bytes(a)? == self.arena.string_bytes(b)?);
        }
        // Booleans and nil compare by identity; mixed kinds are unequal.
        Ok(a == b && !a.is_obj())
    }

    /// Canonical text form: decimal integers, `true`/`false`, the empty
    /// string for nil, string contents, and space-joined elements for
    /// collections.
    pub fn format_value(&self, v: Value) -> Result<String, FaultReason> {
        if v.is_int() {
            return Ok(v.as_int().to_string());
        }
        if let Some(b) = v.as_boolean() {
            return Ok(if b { "true" } else { "false" }.to_string());
        }
        if v.is_nil() {
            return Ok(String::new());
        }
        match self.arena.class_of(v) {
            Some(ClassId::String) => {
                Ok(String::from_utf8_lossy(&self.arena.string_bytes(v)?).into_owned())
            }
            Some(ClassId::List) => {
                let count = self.arena.list_count(v)?;
                let mut out = String::new();
                for i in 1..=count {
                    if i > 1 {
                        out.push(' ');
                    }
                    out.push_str(&self.format_value(self.arena.list_item(v, i)?)?);
                }
                Ok(out)
            }
            Some(ClassId::ByteArray) => {
                let len = self.arena.byte_array_len(v)?;
                let mut out = String::new();
                for i in 0..len {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.arena.byte(v, i)?.to_string());
                }
                Ok(out)
            }
            None => Err(FaultReason::Unspecified),
        }
    }

    /// Convert a value into its typed wire body.
    pub fn to_wire(&self, v: Value) -> Result<WireValue, FaultReason> {
        if v.is_int() {
            return Ok(WireValue::Int(v.as_int()));
        }
        if let Some(b) = v.as_boolean() {
            return Ok(WireValue::Bool(b));
        }
        match self.arena.class_of(v) {
            Some(ClassId::ByteArray) => {
                let len = self.arena.byte_array_len(v)?;
                let mut bytes = Vec::with_capacity(len);
                for i in 0..len {
                    bytes.push(self.arena.byte(v, i)?);
                }
                Ok(WireValue::Bytes(bytes))
            }
            _ => Ok(WireValue::Str(self.format_value(v)?)),
        }
    }

    /// Materialize a typed wire body as a value, allocating strings and
    /// byte arrays in the arena.
    pub fn value_from_wire(&mut self, wv: &WireValue) -> Result<Value, FaultReason> {
        match wv {
            WireValue::Int(n) => Ok(Value::int(*n)),
            WireValue::Bool(b) => Ok(Value::boolean(*b)),
            WireValue::Str(s) => self.arena.alloc_string(s.as_bytes()),
            WireValue::Bytes(bytes) => {
                let words = (bytes.len() + bloq_types::WORD_SIZE - 1) / bloq_types::WORD_SIZE;
                let obj = self.arena.alloc(ClassId::ByteArray, words.max(1), 0)?;
                for (i, &b) in bytes.iter().enumerate() {
                    self.arena.set_byte(obj, i, b)?;
                }
                Ok(obj)
            }
        }
    }
}
