use crate::common::setup_bpm;
use exthash::buffer::buffer_pool_manager::BufferPool;
use exthash::common::rid::RID;
use exthash::container::extendible_hash_table::ExtendibleHashTable;
use exthash::container::hash_function::HashFunction;
use exthash::storage::index::generic_key::{GenericComparator, GenericKey};
use exthash::storage::index::int_comparator::IntComparator;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::sync::Arc;
use std::thread;

/// Wide enough that a bucket page holds exactly four (key, RID) entries,
/// which makes split and merge scenarios small and fully deterministic.
const WIDE: usize = 1012;
type WideKey = GenericKey<WIDE>;
type WideTable = ExtendibleHashTable<WideKey, RID, GenericComparator<WIDE>>;
type IntTable = ExtendibleHashTable<i32, i32, IntComparator>;

fn wide_key(i: i64) -> WideKey {
    let mut key = WideKey::new();
    key.set_from_integer(i);
    key
}

/// Wide-key table whose hash is the first key byte, so the directory
/// routing is chosen by the test instead of by xxh3.
fn wide_table(pool_size: usize, hash_fn: HashFunction<WideKey>) -> (WideTable, Arc<dyn BufferPool>) {
    let bpm = setup_bpm(pool_size);
    let pool: Arc<dyn BufferPool> = bpm.clone();
    let table = ExtendibleHashTable::new(
        "wide_table".to_string(),
        Arc::clone(&pool),
        GenericComparator::new(),
        hash_fn,
    )
    .unwrap();
    (table, pool)
}

#[test]
fn test_basic_insert_and_get() {
    let bpm = setup_bpm(16);
    let table = IntTable::new(
        "basic".to_string(),
        bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap();

    assert!(table.insert(None, &1, &10));
    assert!(table.insert(None, &2, &20));

    let mut result = vec![];
    assert!(table.get_value(None, &1, &mut result));
    assert_eq!(result, vec![10]);

    result.clear();
    assert!(table.get_value(None, &2, &mut result));
    assert_eq!(result, vec![20]);

    result.clear();
    assert!(!table.get_value(None, &3, &mut result));
    assert!(result.is_empty());

    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_duplicate_keys_distinct_values() {
    let bpm = setup_bpm(16);
    let table = IntTable::new(
        "duplicates".to_string(),
        bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap();

    assert!(table.insert(None, &5, &100));
    assert!(table.insert(None, &5, &101));
    assert!(!table.insert(None, &5, &100));

    let mut result = vec![];
    assert!(table.get_value(None, &5, &mut result));
    result.sort_unstable();
    assert_eq!(result, vec![100, 101]);

    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_insert_triggers_split() {
    // Hash by the first key byte: keys 0..=4 land on hash values 0..=4.
    let hash_fn = HashFunction::with_fn(|key: &WideKey| key.as_bytes()[0] as u64);
    let (table, _pool) = wide_table(16, hash_fn);

    // Bucket capacity is four; the fifth insert forces a split.
    for i in 0..5i64 {
        assert!(
            table.insert(None, &wide_key(i), &RID::new(i as u32, 0)),
            "failed to insert entry {}",
            i
        );
    }

    assert_eq!(table.get_global_depth(), 1);
    table.verify_integrity();

    for i in 0..5i64 {
        let mut result = vec![];
        assert!(table.get_value(None, &wide_key(i), &mut result));
        assert_eq!(result, vec![RID::new(i as u32, 0)], "wrong value for key {}", i);
    }
}

#[test]
fn test_remove_merges_and_shrinks_directory() {
    let hash_fn = HashFunction::with_fn(|key: &WideKey| key.as_bytes()[0] as u64);
    let (table, _pool) = wide_table(16, hash_fn);

    for i in 0..5i64 {
        assert!(table.insert(None, &wide_key(i), &RID::new(i as u32, 0)));
    }
    assert_eq!(table.get_global_depth(), 1);

    for i in 0..5i64 {
        assert!(table.remove(None, &wide_key(i), &RID::new(i as u32, 0)));
    }

    // Everything gone: the buckets merged back and the directory shrank to
    // a single empty bucket.
    assert_eq!(table.get_global_depth(), 0);
    table.verify_integrity();
    for i in 0..5i64 {
        let mut result = vec![];
        assert!(!table.get_value(None, &wide_key(i), &mut result));
    }

    // Removing again reports a missing pair.
    assert!(!table.remove(None, &wide_key(0), &RID::new(0, 0)));
}

#[test]
fn test_directory_exhaustion_with_colliding_hashes() {
    // Every key hashes identically, so splitting never separates them and
    // the directory grows until it runs out of room.
    let hash_fn = HashFunction::with_fn(|_: &WideKey| 0);
    let (table, _pool) = wide_table(32, hash_fn);

    for i in 0..4i64 {
        assert!(table.insert(None, &wide_key(i), &RID::new(i as u32, 0)));
    }
    // The fifth colliding entry cannot be placed no matter how often the
    // bucket splits.
    assert!(!table.insert(None, &wide_key(4), &RID::new(4, 0)));

    // The directory grew all the way to its capacity along the way.
    assert_eq!(table.get_global_depth(), 9);
    table.verify_integrity();

    // The first four entries are still retrievable.
    for i in 0..4i64 {
        let mut result = vec![];
        assert!(table.get_value(None, &wide_key(i), &mut result));
        assert_eq!(result, vec![RID::new(i as u32, 0)]);
    }
}

#[test]
fn test_split_preserves_all_entries() {
    let bpm = setup_bpm(64);
    let table = IntTable::new(
        "split_preservation".to_string(),
        bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap();

    let num_keys = 2000;
    let mut keys: Vec<i32> = (0..num_keys).collect();
    keys.shuffle(&mut thread_rng());

    for &i in &keys {
        assert!(table.insert(None, &i, &i), "failed to insert key {}", i);
    }

    // A bucket holds 496 (i32, i32) entries, so 2000 keys force splits.
    assert!(table.get_global_depth() >= 1);
    table.verify_integrity();

    for i in 0..num_keys {
        let mut result = vec![];
        assert!(table.get_value(None, &i, &mut result), "lost key {}", i);
        assert_eq!(result, vec![i]);
    }

    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_merge_preserves_remaining_entries() {
    let bpm = setup_bpm(64);
    let table = IntTable::new(
        "merge_preservation".to_string(),
        bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap();

    let num_keys = 1500;
    for i in 0..num_keys {
        assert!(table.insert(None, &i, &i));
    }
    let depth_after_inserts = table.get_global_depth();

    for i in (0..num_keys).step_by(2) {
        assert!(table.remove(None, &i, &i), "failed to remove key {}", i);
    }
    table.verify_integrity();

    for i in 0..num_keys {
        let mut result = vec![];
        let found = table.get_value(None, &i, &mut result);
        if i % 2 == 0 {
            assert!(!found, "key {} should have been removed", i);
        } else {
            assert!(found, "key {} lost after merges", i);
            assert_eq!(result, vec![i]);
        }
    }

    // Removing the rest empties the table without losing consistency.
    for i in (1..num_keys).step_by(2) {
        assert!(table.remove(None, &i, &i));
    }
    table.verify_integrity();
    assert!(table.get_global_depth() <= depth_after_inserts);
    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_concurrent_inserts_disjoint_ranges() {
    let bpm = setup_bpm(64);
    let table = Arc::new(
        IntTable::new(
            "concurrent_inserts".to_string(),
            bpm.clone(),
            IntComparator::new(),
            HashFunction::new(),
        )
        .unwrap(),
    );

    let threads = 4;
    let per_thread = 500;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let key = t * per_thread + i;
                    assert!(table.insert(None, &key, &key));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    table.verify_integrity();
    for key in 0..threads * per_thread {
        let mut result = vec![];
        assert!(table.get_value(None, &key, &mut result), "lost key {}", key);
        assert_eq!(result, vec![key]);
    }
    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_concurrent_readers_with_writer() {
    let bpm = setup_bpm(64);
    let table = Arc::new(
        IntTable::new(
            "readers_writer".to_string(),
            bpm.clone(),
            IntComparator::new(),
            HashFunction::new(),
        )
        .unwrap(),
    );

    let stable_keys = 4000;
    let churn_keys = 500;
    for i in 0..stable_keys + churn_keys {
        assert!(table.insert(None, &i, &i));
    }

    let mut handles = vec![];
    // Eight readers: stable keys must always be present with the right
    // value; churned keys are either present with the right value or gone.
    for _ in 0..8 {
        let table = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            for round in 0..3 {
                for i in (round..stable_keys).step_by(7) {
                    let mut result = vec![];
                    assert!(table.get_value(None, &i, &mut result));
                    assert_eq!(result, vec![i]);
                }
                for i in stable_keys..stable_keys + churn_keys {
                    let mut result = vec![];
                    let found = table.get_value(None, &i, &mut result);
                    if found {
                        assert_eq!(result, vec![i]);
                    } else {
                        assert!(result.is_empty());
                    }
                }
            }
        }));
    }
    // One writer churning the upper key range.
    {
        let table = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            for i in stable_keys..stable_keys + churn_keys {
                assert!(table.remove(None, &i, &i));
            }
            for i in stable_keys..stable_keys + churn_keys {
                assert!(table.insert(None, &i, &i));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    table.verify_integrity();
    for i in 0..stable_keys + churn_keys {
        let mut result = vec![];
        assert!(table.get_value(None, &i, &mut result));
        assert_eq!(result, vec![i]);
    }
    assert_eq!(bpm.num_pinned_pages(), 0);
}

#[test]
fn test_pin_balance_across_operations() {
    let bpm = setup_bpm(16);
    let table = IntTable::new(
        "pin_balance".to_string(),
        bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap();
    assert_eq!(bpm.num_pinned_pages(), 0);

    for i in 0..600 {
        assert!(table.insert(None, &i, &i));
        assert_eq!(bpm.num_pinned_pages(), 0, "pin leaked by insert({})", i);
    }
    let mut result = vec![];
    table.get_value(None, &0, &mut result);
    assert_eq!(bpm.num_pinned_pages(), 0);

    for i in 0..600 {
        assert!(table.remove(None, &i, &i));
        assert_eq!(bpm.num_pinned_pages(), 0, "pin leaked by remove({})", i);
    }
}
