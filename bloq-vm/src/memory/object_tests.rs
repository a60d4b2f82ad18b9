use super::*;
use test_case::test_case;

use bloq_types::{ClassId, FaultReason, Value};

#[test_case("" ; "empty")]
#[test_case("a" ; "one byte")]
#[test_case("abc" ; "fills first word with terminator")]
#[test_case("abcd" ; "terminator spills into second word")]
#[test_case("héllo" ; "multibyte")]
fn string_round_trip(s: &str) {
    let mut arena = Arena::new(64).unwrap();
    let obj = arena.alloc_string(s.as_bytes()).unwrap();
    assert_eq!(arena.string_byte_len(obj), Ok(s.len()));
    assert_eq!(arena.string_bytes(obj), Ok(s.as_bytes().to_vec()));
    // A NUL terminator exists within the last data word.
    let size = arena.size_of(obj).unwrap();
    let last = (size - 1) * bloq_types::WORD_SIZE..size * bloq_types::WORD_SIZE;
    assert!(last.clone().any(|i| arena.byte(obj, i).unwrap() == 0));
}

#[test]
fn string_word_count_overprovides_at_most_three_bytes() {
    let mut arena = Arena::new(64).unwrap();
    for len in 0..9usize {
        let bytes = alloc::vec![b'x'; len];
        let obj = arena.alloc_string(&bytes).unwrap();
        let capacity = arena.size_of(obj).unwrap() * bloq_types::WORD_SIZE;
        let needed = len + 1;
        assert!(capacity >= needed);
        assert!(capacity - needed <= 3);
    }
}

#[test]
fn static_string_rewrite_narrows_the_header() {
    let mut arena = Arena::new(64).unwrap();
    let slot = arena.alloc_static(ClassId::String, 5).unwrap();
    arena.write_static_string(slot, 5, b"hi").unwrap();
    assert_eq!(arena.string_byte_len(slot), Ok(2));
    assert_eq!(arena.string_bytes(slot), Ok(b"hi".to_vec()));
    // A long rewrite is truncated to capacity minus the terminator.
    arena
        .write_static_string(slot, 5, b"abcdefghijklmnopqrstuvwxyz")
        .unwrap();
    assert_eq!(arena.string_byte_len(slot), Ok(19));
    arena.write_static_string(slot, 5, b"").unwrap();
    assert_eq!(arena.string_byte_len(slot), Ok(0));
}

#[test]
fn list_count_and_items() {
    let mut arena = Arena::new(64).unwrap();
    let list = arena.alloc(ClassId::List, 4, 0).unwrap();
    arena.set_list_count(list, 3).unwrap();
    for i in 1..=3 {
        arena.set_list_item(list, i, Value::int(i as i32 * 10)).unwrap();
    }
    assert_eq!(arena.list_count(list), Ok(3));
    assert_eq!(arena.list_capacity(list), Ok(3));
    assert_eq!(arena.list_item(list, 2), Ok(Value::int(20)));
    assert_eq!(arena.list_item(list, 0), Err(FaultReason::IndexOutOfRange));
    assert_eq!(arena.list_item(list, 4), Err(FaultReason::IndexOutOfRange));
}

#[test]
fn list_accessors_reject_other_classes() {
    let mut arena = Arena::new(64).unwrap();
    let s = arena.alloc_string(b"nope").unwrap();
    assert_eq!(arena.list_count(s), Err(FaultReason::NeedsArray));
    let n = Value::int(5);
    assert_eq!(arena.list_count(n), Err(FaultReason::NeedsArray));
}

#[test]
fn byte_array_bytes_are_little_endian_within_words() {
    let mut arena = Arena::new(64).unwrap();
    let bytes = arena.alloc(ClassId::ByteArray, 2, 0).unwrap();
    assert_eq!(arena.byte_array_len(bytes), Ok(8));
    arena.set_byte(bytes, 0, 0xAA).unwrap();
    arena.set_byte(bytes, 3, 0xBB).unwrap();
    assert_eq!(arena.word(bytes, 0), Ok(u32::from_le_bytes([0xAA, 0, 0, 0xBB]) as i32));
    arena.set_byte(bytes, 5, 0x01).unwrap();
    assert_eq!(arena.byte(bytes, 5), Ok(0x01));
    // Writes outside 4 * wordCount fail.
    assert_eq!(arena.set_byte(bytes, 8, 1), Err(FaultReason::IndexOutOfRange));
}

#[test]
fn immediates_have_no_object_accessors() {
    let arena = Arena::new(64).unwrap();
    for v in [Value::int(1), Value::NIL, Value::TRUE] {
        assert_eq!(arena.size_of(v), Err(FaultReason::Unspecified));
        assert_eq!(arena.class_of(v), None);
    }
    assert_eq!(arena.class_name(Value::int(1)), "integer");
    assert_eq!(arena.class_name(Value::NIL), "nil");
}
