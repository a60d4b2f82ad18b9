//! Built-in primitive sets.

use crate::{radio::RadioHw, registry::PrimitiveTable};

pub mod data;
pub mod radio;

/// Table with every built-in set registered.
pub fn default_table<H: RadioHw>() -> PrimitiveTable<H> {
    let mut table = PrimitiveTable::new();
    data::register(&mut table);
    radio::register(&mut table);
    table
}
