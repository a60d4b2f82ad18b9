//! Collection and string primitives.
//!
//! Lists are growable, strings are immutable NUL-terminated UTF-8, byte
//! arrays are raw bytes. Every primitive that can allocate re-fetches its
//! object arguments from the stack afterwards; [`add_last`] is the one
//! place a reference can actually move (list growth), and it writes the
//! relocated reference back into its argument slot.

use alloc::vec::Vec;

use bloq_types::{ClassId, FaultReason, Value, Word, WORD_SIZE};

use crate::{
    machine::Machine,
    radio::RadioHw,
    registry::{ArgRange, Primitive, PrimitiveTable},
};


/// Register the `data` set.
pub fn register<H: RadioHw>(table: &mut PrimitiveTable<H>) {
    table.register_set(
        "data",
        &[
            ("makeList", make_list as Primitive<H>),
            ("newArray", new_array),
            ("newByteArray", new_byte_array),
            ("length", length),
            ("at", at),
            ("atPut", at_put),
            ("addLast", add_last),
            ("delete", delete),
            ("copyFromTo", copy_from_to),
            ("findInString", find_in_string),
            ("join", join),
            ("joinStrings", join_strings),
        ],
    );
}

// Argument helpers.

fn int_arg<H: RadioHw>(
    m: &Machine<H>,
    args: ArgRange,
    i: usize,
) -> Result<Word, FaultReason> {
    let v = m.arg(args, i);
    if v.is_int() {
        Ok(v.as_int())
    } else {
        Err(FaultReason::NeedsInteger)
    }
}

fn string_arg<H: RadioHw>(
    m: &Machine<H>,
    args: ArgRange,
    i: usize,
) -> Result<Vec<u8>, FaultReason> {
    let v = m.arg(args, i);
    if m.arena().class_of(v) == Some(ClassId::String) {
        m.arena().string_bytes(v)
    } else {
        Err(FaultReason::NeedsString)
    }
}

/// Index argument: a 1-based integer or one of the index keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexArg {
    Numeric(Word),
    Last,
    Random,
    All,
}

fn index_arg<H: RadioHw>(
    m: &Machine<H>,
    args: ArgRange,
    i: usize,
) -> Result<IndexArg, FaultReason> {
    let v = m.arg(args, i);
    if v.is_int() {
        return Ok(IndexArg::Numeric(v.as_int()));
    }
    if m.arena().class_of(v) == Some(ClassId::String) {
        return match m.arena().string_bytes(v)?.as_slice() {
            b"last" => Ok(IndexArg::Last),
            b"random" => Ok(IndexArg::Random),
            b"all" => Ok(IndexArg::All),
            _ => Err(FaultReason::NeedsIntegerIndex),
        };
    }
    Err(FaultReason::NeedsIntegerIndex)
}

/// Resolve an index argument against a collection of `count` elements.
/// `All` is rejected here; operations that accept it handle it first.
fn resolve_index<H: RadioHw>(
    m: &mut Machine<H>,
    index: IndexArg,
    count: usize,
) -> Result<usize, FaultReason> {
    match index {
        IndexArg::Numeric(n) => {
            if n < 1 || n as usize > count {
                Err(FaultReason::IndexOutOfRange)
            } else {
                Ok(n as usize)
            }
        }
        IndexArg::Last => {
            if count == 0 {
                Err(FaultReason::IndexOutOfRange)
            } else {
                Ok(count)
            }
        }
        IndexArg::Random => {
            if count == 0 {
                Err(FaultReason::IndexOutOfRange)
            } else {
                Ok(m.random_index(count))
            }
        }
        IndexArg::All => Err(FaultReason::NeedsIntegerIndex),
    }
}

// UTF-8 scanning.

/// Step over one UTF-8 sequence starting at `i`: stay on NUL, one byte for
/// ASCII, lead byte plus its continuations otherwise.
pub(crate) fn next_utf8(bytes: &[u8], i: usize) -> usize {
    match bytes.get(i) {
        None | Some(0) => i,
        Some(&b) if b < 128 => i + 1,
        Some(&b) if b & 0xC0 == 0xC0 => {
            let mut j = i + 1;
            while matches!(bytes.get(j), Some(&c) if c & 0xC0 == 0x80) {
                j += 1;
            }
            j
        }
        // Stray continuation byte; step over it.
        _ => i + 1,
    }
}

/// Codepoint count of a byte string.
pub(crate) fn codepoint_count(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        let next = next_utf8(bytes, i);
        if next == i {
            break;
        }
        i = next;
        count += 1;
    }
    count
}

/// Byte offset where 1-based codepoint `index` starts.
fn codepoint_offset(bytes: &[u8], index: usize) -> usize {
    let mut i = 0;
    for _ in 1..index {
        let next = next_utf8(bytes, i);
        if next == i {
            break;
        }
        i = next;
    }
    i
}

// Construction.

/// `makeList(items…)`: a list holding exactly the arguments. An empty call
/// reserves room for two items so the first appends don't immediately grow.
pub fn make_list<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let capacity = args.count.max(2);
    let list = m.arena_mut().alloc(ClassId::List, capacity + 1, 0)?;
    m.arena_mut().set_list_count(list, args.count)?;
    for i in 0..args.count {
        let item = m.arg(args, i); // re-fetched after the allocation
        m.arena_mut().set_list_item(list, i + 1, item)?;
    }
    Ok(list)
}

/// `newArray(capacityOpt)`: an empty list with reserved capacity
/// `max(2, capacityOpt)`.
pub fn new_array<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let requested = if args.count >= 1 { int_arg(m, args, 0)? } else { 0 };
    if requested < 0 {
        return Err(FaultReason::ArraySize);
    }
    let capacity = (requested as usize).max(2);
    let list = m.arena_mut().alloc(ClassId::List, capacity + 1, 0)?;
    m.arena_mut().set_list_count(list, 0)?;
    Ok(list)
}

/// `newByteArray(n)`: a zeroed byte array covering at least `n` bytes.
/// There is no sub-word length field, so the logical length rounds up to
/// the next word boundary.
pub fn new_byte_array<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let requested = if args.count >= 1 { int_arg(m, args, 0)? } else { 0 };
    if requested < 0 {
        return Err(FaultReason::ArraySize);
    }
    let words = ((requested as usize) + WORD_SIZE - 1) / WORD_SIZE;
    m.arena_mut().alloc(ClassId::ByteArray, words.max(1), 0)
}

// Shared accessors.

/// `length(collection)`: item count for lists, codepoint count for
/// strings, byte count for byte arrays.
pub fn length<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let v = m.arg(args, 0);
    let n = match m.arena().class_of(v) {
        Some(ClassId::List) => m.arena().list_count(v)?,
        Some(ClassId::String) => codepoint_count(&m.arena().string_bytes(v)?),
        Some(ClassId::ByteArray) => m.arena().byte_array_len(v)?,
        None => return Err(FaultReason::NeedsIndexable),
    };
    Ok(Value::int(n as Word))
}

/// `at(index, collection)`: 1-based element access. `"last"` and
/// `"random"` resolve against the element count; strings index by
/// codepoint and answer a fresh one-codepoint string.
pub fn at<H: RadioHw>(m: &mut Machine<H>, args: ArgRange) -> Result<Value, FaultReason> {
    let index = index_arg(m, args, 0)?;
    let target = m.arg(args, 1);
    match m.arena().class_of(target) {
        Some(ClassId::List) => {
            let count = m.arena().list_count(target)?;
            let i = resolve_index(m, index, count)?;
            m.arena().list_item(target, i)
        }
        Some(ClassId::String) => {
            let bytes = m.arena().string_bytes(target)?;
            let count = codepoint_count(&bytes);
            let i = resolve_index(m, index, count)?;
            let start = codepoint_offset(&bytes, i);
            let end = next_utf8(&bytes, start);
            m.arena_mut().alloc_string(&bytes[start..end])
        }
        Some(ClassId::ByteArray) => {
            let count = m.arena().byte_array_len(target)?;
            let i = resolve_index(m, index, count)?;
            Ok(Value::int(Word::from(m.arena().byte(target, i - 1)?)))
        }
        None => Err(FaultReason::NeedsIndexable),
    }
}

/// `atPut(index, collection, value)`: 1-based element store. `"all"`
/// fills every used position of a list. Byte arrays only accept integers
/// in `0..=255`; strings are immutable.
pub fn at_put<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let index = index_arg(m, args, 0)?;
    let target = m.arg(args, 1);
    let value = m.arg(args, 2);
    match m.arena().class_of(target) {
        Some(ClassId::List) => {
            let count = m.arena().list_count(target)?;
            if index == IndexArg::All {
                for i in 1..=count {
                    m.arena_mut().set_list_item(target, i, value)?;
                }
            } else {
                let i = resolve_index(m, index, count)?;
                m.arena_mut().set_list_item(target, i, value)?;
            }
            Ok(Value::FALSE)
        }
        Some(ClassId::ByteArray) => {
            if !value.is_int() {
                return Err(FaultReason::NeedsInteger);
            }
            let byte = value.as_int();
            if !(0..=255).contains(&byte) {
                return Err(FaultReason::ByteArrayStore);
            }
            let count = m.arena().byte_array_len(target)?;
            let i = resolve_index(m, index, count)?;
            m.arena_mut().set_byte(target, i - 1, byte as u8)?;
            Ok(Value::FALSE)
        }
        Some(ClassId::String) | None => Err(FaultReason::NeedsArray),
    }
}

/// `addLast(value, list)`: append, growing the list by
/// `max(3, min(count / 3, 100))` items when it is full. Growth may move
/// the list; the relocated reference is written back into the argument
/// slot so the caller's re-fetch observes it.
pub fn add_last<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let mut list = m.arg(args, 1);
    if m.arena().class_of(list) != Some(ClassId::List) {
        return Err(FaultReason::NeedsArray);
    }
    let count = m.arena().list_count(list)?;
    let capacity = m.arena().list_capacity(list)?;
    if count == capacity {
        let growth = 3.max((count / 3).min(100));
        let grown = m.arena_mut().resize(list, capacity + growth + 1)?;
        m.set_arg(args, 1, grown);
        list = grown;
    }
    let value = m.arg(args, 0); // re-fetch across the possible allocation
    m.arena_mut().set_list_count(list, count + 1)?;
    m.arena_mut().set_list_item(list, count + 1, value)?;
    Ok(Value::FALSE)
}

/// `delete(index, list)`: remove an element, shifting the tail left and
/// zeroing the freed slot. `"all"` empties the list; `"last"` trims one.
pub fn delete<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let index = index_arg(m, args, 0)?;
    let list = m.arg(args, 1);
    if m.arena().class_of(list) != Some(ClassId::List) {
        return Err(FaultReason::NeedsArray);
    }
    let count = m.arena().list_count(list)?;
    if index == IndexArg::All {
        for i in 1..=count {
            m.arena_mut().set_word(list, i, 0)?;
        }
        m.arena_mut().set_list_count(list, 0)?;
        return Ok(Value::FALSE);
    }
    let i = resolve_index(m, index, count)?;
    for j in i..count {
        let next = m.arena().word(list, j + 1)?;
        m.arena_mut().set_word(list, j, next)?;
    }
    m.arena_mut().set_word(list, count, 0)?;
    m.arena_mut().set_list_count(list, count - 1)?;
    Ok(Value::FALSE)
}

/// `copyFromTo(src, start, endOpt)`: 1-based inclusive slice. The end is
/// clamped to the source length; strings slice by codepoint.
pub fn copy_from_to<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let start = int_arg(m, args, 1)?;
    if start < 1 {
        return Err(FaultReason::IndexOutOfRange);
    }
    let start = start as usize;
    let end = if args.count >= 3 {
        Some(int_arg(m, args, 2)?)
    } else {
        None
    };
    let src = m.arg(args, 0);
    match m.arena().class_of(src) {
        Some(ClassId::List) => {
            let count = m.arena().list_count(src)?;
            let end = end.map_or(count, |e| (e.max(0) as usize).min(count));
            let n = (end + 1).saturating_sub(start);
            let copy = m.arena_mut().alloc(ClassId::List, n + 1, 0)?;
            m.arena_mut().set_list_count(copy, n)?;
            let src = m.arg(args, 0); // re-fetched after the allocation
            for i in 0..n {
                let item = m.arena().list_item(src, start + i)?;
                m.arena_mut().set_list_item(copy, i + 1, item)?;
            }
            Ok(copy)
        }
        Some(ClassId::String) => {
            let bytes = m.arena().string_bytes(src)?;
            let count = codepoint_count(&bytes);
            let end = end.map_or(count, |e| (e.max(0) as usize).min(count));
            if start > end {
                return m.arena_mut().alloc_string(b"");
            }
            let from = codepoint_offset(&bytes, start);
            let to = codepoint_offset(&bytes, end + 1);
            m.arena_mut().alloc_string(&bytes[from..to])
        }
        Some(ClassId::ByteArray) => {
            let count = m.arena().byte_array_len(src)?;
            let end = end.map_or(count, |e| (e.max(0) as usize).min(count));
            let n = (end + 1).saturating_sub(start);
            let words = (n + WORD_SIZE - 1) / WORD_SIZE;
            let copy = m.arena_mut().alloc(ClassId::ByteArray, words.max(1), 0)?;
            let src = m.arg(args, 0); // re-fetched after the allocation
            for i in 0..n {
                let b = m.arena().byte(src, start - 1 + i)?;
                m.arena_mut().set_byte(copy, i, b)?;
            }
            Ok(copy)
        }
        None => Err(FaultReason::NeedsIndexable),
    }
}

/// `findInString(needle, haystack, startOpt)`: 1-based byte index of the
/// first match at or after `start`, or -1. An empty needle matches at 1.
pub fn find_in_string<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let needle = string_arg(m, args, 0)?;
    let haystack = string_arg(m, args, 1)?;
    if needle.is_empty() {
        return Ok(Value::int(1));
    }
    let start = if args.count >= 3 {
        int_arg(m, args, 2)?.max(1) as usize
    } else {
        1
    };
    if start > haystack.len() {
        return Ok(Value::int(-1));
    }
    let found = haystack[start - 1..]
        .windows(needle.len())
        .position(|w| w == needle.as_slice());
    Ok(match found {
        Some(i) => Value::int((start + i) as Word),
        None => Value::int(-1),
    })
}

/// `join(arg1, arg2, …)`: list concatenation when the first argument is a
/// list (every argument must be one), string concatenation when it is a
/// string (integers and booleans convert to their text forms).
pub fn join<H: RadioHw>(m: &mut Machine<H>, args: ArgRange) -> Result<Value, FaultReason> {
    if args.count == 0 {
        return Err(FaultReason::NeedsIndexable);
    }
    match m.arena().class_of(m.arg(args, 0)) {
        Some(ClassId::List) => {
            let mut total = 0;
            for i in 0..args.count {
                let arg = m.arg(args, i);
                if m.arena().class_of(arg) != Some(ClassId::List) {
                    return Err(FaultReason::JoinArgsNotSameType);
                }
                total += m.arena().list_count(arg)?;
            }
            let joined = m.arena_mut().alloc(ClassId::List, total + 1, 0)?;
            m.arena_mut().set_list_count(joined, total)?;
            let mut at = 1;
            for i in 0..args.count {
                let arg = m.arg(args, i); // re-fetched after the allocation
                for j in 1..=m.arena().list_count(arg)? {
                    let item = m.arena().list_item(arg, j)?;
                    m.arena_mut().set_list_item(joined, at, item)?;
                    at += 1;
                }
            }
            Ok(joined)
        }
        Some(ClassId::String) => {
            let mut out = Vec::new();
            for i in 0..args.count {
                let arg = m.arg(args, i);
                match m.arena().class_of(arg) {
                    Some(ClassId::String) => out.extend(m.arena().string_bytes(arg)?),
                    Some(_) => return Err(FaultReason::JoinArgsNotSameType),
                    None if arg.is_int() || arg.is_boolean() || arg.is_nil() => {
                        out.extend(m.format_value(arg)?.into_bytes());
                    }
                    None => return Err(FaultReason::NeedsString),
                }
            }
            m.arena_mut().alloc_string(&out)
        }
        _ => Err(FaultReason::NeedsIndexable),
    }
}

/// `joinStrings(list, separatorOpt)`: concatenate a list's items with the
/// separator between them; non-string items are formatted textually.
pub fn join_strings<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let list = m.arg(args, 0);
    if m.arena().class_of(list) != Some(ClassId::List) {
        return Err(FaultReason::NeedsArray);
    }
    let separator = if args.count >= 2 {
        string_arg(m, args, 1)?
    } else {
        Vec::new()
    };
    let mut out = Vec::new();
    for i in 1..=m.arena().list_count(list)? {
        if i > 1 {
            out.extend_from_slice(&separator);
        }
        let item = m.arena().list_item(list, i)?;
        out.extend(m.format_value(item)?.into_bytes());
    }
    m.arena_mut().alloc_string(&out)
}
