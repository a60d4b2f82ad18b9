use super::*;
use quickcheck_macros::quickcheck;
use test_case::test_case;

use bloq_types::{ClassId, FaultReason, Value};

#[test]
fn fresh_arena_reserves_the_singleton_block() {
    let arena = Arena::new(64).unwrap();
    assert_eq!(arena.free_index(), RESERVED_WORDS);
    assert_eq!(arena.available(), 64 - RESERVED_WORDS);
}

#[test]
fn arena_below_minimum_is_rejected() {
    assert_eq!(
        Arena::new(4).unwrap_err(),
        VmError::ArenaTooSmall {
            words: 4,
            minimum: MIN_ARENA_WORDS
        }
    );
}

#[test]
fn allocations_never_land_on_singleton_offsets() {
    let mut arena = Arena::new(64).unwrap();
    let first = arena.alloc(ClassId::List, 2, 0).unwrap();
    assert_eq!(first.obj_offset(), Some(Value::FIRST_OBJ_OFFSET));
    assert_ne!(first, Value::NIL);
    assert_ne!(first, Value::FALSE);
    assert_ne!(first, Value::TRUE);
}

#[test_case(0; "empty object")]
#[test_case(1; "single word")]
#[test_case(7; "several words")]
fn alloc_fills_and_frames_the_object(word_count: usize) {
    let mut arena = Arena::new(64).unwrap();
    let obj = arena.alloc(ClassId::ByteArray, word_count, 0x0101_0101).unwrap();
    assert_eq!(arena.class_of(obj), Some(ClassId::ByteArray));
    assert_eq!(arena.size_of(obj), Ok(word_count));
    for i in 0..word_count {
        assert_eq!(arena.word(obj, i), Ok(0x0101_0101));
    }
    assert_eq!(arena.word(obj, word_count), Err(FaultReason::IndexOutOfRange));
}

#[test]
fn exhaustion_fails_without_moving_the_free_pointer() {
    let mut arena = Arena::new(MIN_ARENA_WORDS).unwrap();
    // 16 words total, 3 reserved: a 10-word object fits with 2 words spare.
    let obj = arena.alloc(ClassId::List, 10, 0).unwrap();
    let free = arena.free_index();
    assert_eq!(
        arena.alloc(ClassId::List, 4, 0),
        Err(FaultReason::InsufficientMemory)
    );
    assert_eq!(arena.free_index(), free);
    // The earlier object is intact and a fitting request still succeeds.
    assert_eq!(arena.size_of(obj), Ok(10));
    arena.alloc(ClassId::List, 1, 0).unwrap();
}

#[test]
fn oversized_request_is_an_array_size_fault() {
    let mut arena = Arena::new(64).unwrap();
    assert_eq!(
        arena.alloc(ClassId::List, MAX_OBJ_WORDS + 1, 0),
        Err(FaultReason::ArraySize)
    );
}

#[test]
fn clear_rewinds_to_the_floor_and_allocation_recovers() {
    let mut arena = Arena::new(64).unwrap();
    let stale = arena.alloc(ClassId::List, 8, 0).unwrap();
    arena.alloc(ClassId::String, 8, 0).unwrap();
    arena.clear();
    assert_eq!(arena.free_index(), RESERVED_WORDS);
    // Stale references are rejected, not misread.
    assert_eq!(arena.size_of(stale), Err(FaultReason::Unspecified));
    // The full capacity is usable again.
    arena.alloc(ClassId::List, 64 - RESERVED_WORDS - HEADER_WORDS, 0).unwrap();
}

#[test]
fn static_objects_survive_clear() {
    let mut arena = Arena::new(64).unwrap();
    let slot = arena.alloc_static(ClassId::String, 5).unwrap();
    arena.alloc(ClassId::List, 4, 0).unwrap();
    arena.clear();
    assert_eq!(arena.size_of(slot), Ok(5));
    assert_eq!(arena.free_index(), RESERVED_WORDS + HEADER_WORDS + 5);
}

#[test]
fn resize_topmost_grows_in_place() {
    let mut arena = Arena::new(64).unwrap();
    let obj = arena.alloc(ClassId::List, 2, 7).unwrap();
    let grown = arena.resize(obj, 6).unwrap();
    assert_eq!(grown, obj);
    assert_eq!(arena.size_of(grown), Ok(6));
    // Original words kept, new words zeroed.
    assert_eq!(arena.word(grown, 1), Ok(7));
    for i in 2..6 {
        assert_eq!(arena.word(grown, i), Ok(0));
    }
}

#[test]
fn resize_buried_object_relocates_and_copies() {
    let mut arena = Arena::new(64).unwrap();
    let obj = arena.alloc(ClassId::List, 2, 7).unwrap();
    arena.alloc(ClassId::String, 1, 0).unwrap(); // bury it
    let grown = arena.resize(obj, 4).unwrap();
    assert_ne!(grown, obj);
    assert_eq!(arena.size_of(grown), Ok(4));
    assert_eq!(arena.word(grown, 0), Ok(7));
    assert_eq!(arena.word(grown, 1), Ok(7));
    assert_eq!(arena.word(grown, 2), Ok(0));
}

#[test]
fn resize_past_the_arena_end_fails_cleanly() {
    let mut arena = Arena::new(32).unwrap();
    let obj = arena.alloc(ClassId::List, 2, 0).unwrap();
    let free = arena.free_index();
    assert_eq!(arena.resize(obj, 64), Err(FaultReason::InsufficientMemory));
    assert_eq!(arena.free_index(), free);
    assert_eq!(arena.size_of(obj), Ok(2));
}

#[quickcheck]
fn any_request_sequence_keeps_the_arena_consistent(sizes: alloc::vec::Vec<u8>) -> bool {
    let mut arena = Arena::new(256).unwrap();
    let mut live = alloc::vec::Vec::new();
    for size in sizes {
        let size = usize::from(size % 64);
        match arena.alloc(ClassId::List, size, 0) {
            Ok(obj) => live.push((obj, size)),
            Err(FaultReason::InsufficientMemory) => {}
            Err(_) => return false,
        }
        if arena.free_index() > 256 {
            return false;
        }
    }
    // Every successful allocation is still intact and inside the arena.
    live.into_iter().all(|(obj, size)| {
        let index = obj.obj_offset().unwrap() as usize / bloq_types::WORD_SIZE;
        arena.size_of(obj) == Ok(size)
            && index >= RESERVED_WORDS
            && index + HEADER_WORDS + size <= arena.free_index()
    })
}

#[test]
fn every_allocation_sits_inside_the_arena() {
    let mut arena = Arena::new(128).unwrap();
    let mut objs = alloc::vec::Vec::new();
    for size in [0usize, 1, 2, 5, 11] {
        objs.push((arena.alloc(ClassId::List, size, 0).unwrap(), size));
    }
    for (obj, size) in objs {
        let index = obj.obj_offset().unwrap() as usize / bloq_types::WORD_SIZE;
        assert!(index >= RESERVED_WORDS);
        assert!(index + HEADER_WORDS + size <= arena.free_index());
        assert_eq!(arena.size_of(obj), Ok(size));
    }
}
