//! Property tests for the pattern cache.
//!
//! Whatever the compile sequence, the cache never exceeds its capacity,
//! evicts in insertion order, and hands out objects with a rewound cursor.

use std::collections::VecDeque;
use std::rc::Rc;

use hush_core::Stats;
use hush_pattern::{CompiledPattern, EngineFamily, PatternCache, PatternSlot};
use proptest::prelude::*;

fn key_strategy() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(vec!["a", "b", "ab", r"\d", "x+", "[a-c]"]),
        prop::sample::select(vec!["", "g", "i", "gi", "y", "m"]),
    )
        .prop_map(|(s, f)| (s.to_owned(), f.to_owned()))
}

fn compile(source: &str, flags: &str) -> Result<Rc<CompiledPattern>, hush_pattern::PatternError> {
    CompiledPattern::new(source, flags).map(Rc::new)
}

proptest! {
    #[test]
    fn never_exceeds_capacity(
        capacity in 1usize..6,
        keys in prop::collection::vec(key_strategy(), 0..60),
    ) {
        let mut cache = PatternCache::new(capacity);
        for (source, flags) in &keys {
            cache.get_or_compile(source, flags, || compile(source, flags)).unwrap();
            prop_assert!(cache.len() <= capacity);
        }
    }

    #[test]
    fn evicts_in_insertion_order(
        capacity in 1usize..6,
        keys in prop::collection::vec(key_strategy(), 0..60),
    ) {
        let mut cache = PatternCache::new(capacity);
        let mut model: VecDeque<(String, String)> = VecDeque::new();
        for (source, flags) in &keys {
            cache.get_or_compile(source, flags, || compile(source, flags)).unwrap();
            let key = (source.clone(), flags.clone());
            if !model.contains(&key) {
                if model.len() == capacity {
                    model.pop_front();
                }
                model.push_back(key);
            }
        }
        prop_assert_eq!(cache.keys(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn handed_out_cursor_is_zero(
        keys in prop::collection::vec(key_strategy(), 1..40),
        dirty in 1usize..8,
    ) {
        let mut cache = PatternCache::new(4);
        for (source, flags) in &keys {
            let pattern = cache
                .get_or_compile(source, flags, || compile(source, flags))
                .unwrap();
            prop_assert_eq!(pattern.last_index(), 0);
            pattern.set_last_index(dirty);
        }
    }

    #[test]
    fn disable_is_idempotent(calls in 1usize..5, compiles in 0usize..10) {
        let slot = PatternSlot::native(Rc::new(Stats::new()));
        slot.install(8, EngineFamily::Blink);
        for i in 0..compiles {
            slot.construct(&format!("p{i}"), "g").unwrap();
        }
        prop_assert!(slot.disable());
        for _ in 1..calls {
            prop_assert!(!slot.disable());
        }
        prop_assert!(!slot.is_installed());
        let a = slot.construct("p0", "g").unwrap();
        let b = slot.construct("p0", "g").unwrap();
        prop_assert!(!Rc::ptr_eq(&a, &b));
    }
}
