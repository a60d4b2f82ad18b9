//! Named primitive registry.
//!
//! Primitives are registered in namespaced sets and invoked by their full
//! `"set:name"` form. A handler receives the machine and a window into the
//! operand stack holding its arguments; by convention statement-style
//! primitives return the false singleton.

use alloc::{format, string::String};

use hashbrown::HashMap;

use bloq_types::{FaultReason, Value};

use crate::machine::Machine;

/// Window into the operand stack covering one call's arguments.
///
/// Handlers read through [`Machine::arg`] rather than keeping copies, so a
/// re-fetch after an allocation always observes relocated references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgRange {
    /// Stack index of the first argument.
    pub base: usize,
    /// Number of arguments.
    pub count: usize,
}

impl ArgRange {
    /// A window of `count` slots starting at `base`.
    pub const fn new(base: usize, count: usize) -> Self {
        ArgRange { base, count }
    }
}

/// Handler signature: `(machine, args) -> result`.
pub type Primitive<H> = fn(&mut Machine<H>, ArgRange) -> Result<Value, FaultReason>;

/// Table of every registered primitive, keyed by full name.
pub struct PrimitiveTable<H> {
    entries: HashMap<String, Primitive<H>>,
}

impl<H> Default for PrimitiveTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PrimitiveTable<H> {
    /// An empty table.
    pub fn new() -> Self {
        PrimitiveTable {
            entries: HashMap::new(),
        }
    }

    /// Register a named set of primitives under its namespace.
    pub fn register_set(&mut self, set: &str, entries: &[(&str, Primitive<H>)]) {
        for (name, handler) in entries {
            self.entries.insert(format!("{set}:{name}"), *handler);
        }
    }

    /// Look up a handler by full name.
    pub fn lookup(&self, name: &str) -> Option<Primitive<H>> {
        self.entries.get(name).copied()
    }

    /// Registered primitive count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke a primitive by full name. Unknown names fault rather than
    /// aborting the VM.
    pub fn call(
        &self,
        machine: &mut Machine<H>,
        name: &str,
        args: ArgRange,
    ) -> Result<Value, FaultReason> {
        tracing::trace!(primitive = name, argc = args.count, "primitive call");
        match self.lookup(name) {
            Some(handler) => handler(machine, args),
            None => Err(FaultReason::Unspecified),
        }
    }
}

impl<H> core::fmt::Debug for PrimitiveTable<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrimitiveTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}
