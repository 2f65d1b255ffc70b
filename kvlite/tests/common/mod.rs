// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared helpers and a backend conformance suite
//!
//! `run_backend_tests` checks the full `Db` contract against any complete
//! backend. Each check opens a fresh database in its own temp directory.

#![allow(dead_code)]

use kvlite::bytes::is_key_in_domain;
use kvlite::{Db, DbError, DbIterator};
use std::path::Path;
use tempfile::TempDir;

/// Opens a fresh database under the given directory
pub type Opener = fn(&Path) -> Box<dyn Db>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Drain an iterator into `(key, value)` pairs
pub fn collect(itr: Box<dyn DbIterator>) -> Vec<(Vec<u8>, Vec<u8>)> {
    itr.entries().map(|e| e.expect("iteration failed")).collect()
}

pub fn collect_keys(itr: Box<dyn DbIterator>) -> Vec<Vec<u8>> {
    collect(itr).into_iter().map(|(k, _)| k).collect()
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    items
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

/// Run the full conformance suite against a backend
pub fn run_backend_tests(open: Opener) {
    init_logging();
    test_set_get_has_delete(open);
    test_empty_value_is_not_missing(open);
    test_delete_missing_key(open);
    test_sync_variants(open);
    test_binary_and_empty_keys(open);
    test_batch_applies_in_order(open);
    test_batch_write_sync(open);
    test_example_dataset(open);
    test_reverse_mirrors_forward(open);
    test_iterator_results_in_domain(open);
    test_invalid_is_sticky(open);
    test_accessors_return_copies(open);
    test_print_and_stats(open);
    test_close(open);
}

fn with_db(open: Opener, f: impl FnOnce(&dyn Db)) {
    let dir = TempDir::new().unwrap();
    let db = open(dir.path());
    f(db.as_ref());
}

fn test_set_get_has_delete(open: Opener) {
    with_db(open, |db| {
        db.set(b"key", b"value1").unwrap();
        assert_eq!(db.get(b"key").unwrap(), Some(b"value1".to_vec()));
        assert!(db.has(b"key").unwrap());

        db.set(b"key", b"value2").unwrap();
        assert_eq!(db.get(b"key").unwrap(), Some(b"value2".to_vec()));

        db.delete(b"key").unwrap();
        assert_eq!(db.get(b"key").unwrap(), None);
        assert!(!db.has(b"key").unwrap());
    });
}

fn test_empty_value_is_not_missing(open: Opener) {
    with_db(open, |db| {
        db.set(b"empty", b"").unwrap();
        assert_eq!(db.get(b"empty").unwrap(), Some(Vec::new()));
        assert!(db.has(b"empty").unwrap());
        assert_eq!(db.get(b"missing").unwrap(), None);
    });
}

fn test_delete_missing_key(open: Opener) {
    with_db(open, |db| {
        db.delete(b"never-written").unwrap();
        db.delete_sync(b"never-written").unwrap();
        assert!(!db.has(b"never-written").unwrap());
    });
}

fn test_sync_variants(open: Opener) {
    with_db(open, |db| {
        db.set_sync(b"durable", b"yes").unwrap();
        assert_eq!(db.get(b"durable").unwrap(), Some(b"yes".to_vec()));
        db.delete_sync(b"durable").unwrap();
        assert_eq!(db.get(b"durable").unwrap(), None);
    });
}

fn test_binary_and_empty_keys(open: Opener) {
    with_db(open, |db| {
        db.set(b"", b"empty key").unwrap();
        db.set(b"\x00", b"zero").unwrap();
        db.set(b"\xff\xff", b"high").unwrap();

        assert_eq!(db.get(b"").unwrap(), Some(b"empty key".to_vec()));
        assert_eq!(
            collect_keys(db.iterator(None, None).unwrap()),
            vec![b"".to_vec(), b"\x00".to_vec(), b"\xff\xff".to_vec()]
        );
    });
}

fn test_batch_applies_in_order(open: Opener) {
    with_db(open, |db| {
        db.set(b"a", b"old").unwrap();

        let mut batch = db.new_batch().unwrap();
        assert!(batch.is_empty());
        batch.set(b"x", b"1");
        batch.delete(b"x");
        batch.set(b"x", b"2");
        batch.set(b"y", b"1");
        batch.delete(b"y");
        batch.delete(b"a");
        assert_eq!(batch.len(), 6);

        // Nothing is visible before commit
        assert_eq!(db.get(b"x").unwrap(), None);
        assert!(db.has(b"a").unwrap());

        batch.write().unwrap();
        assert_eq!(db.get(b"x").unwrap(), Some(b"2".to_vec()));
        assert_eq!(db.get(b"y").unwrap(), None);
        assert_eq!(db.get(b"a").unwrap(), None);

        // An empty batch commits cleanly
        db.new_batch().unwrap().write().unwrap();
    });
}

fn test_batch_write_sync(open: Opener) {
    with_db(open, |db| {
        let mut batch = db.new_batch().unwrap();
        for i in 0..10u8 {
            batch.set(&[i], &[i, i]);
        }
        batch.write_sync().unwrap();
        for i in 0..10u8 {
            assert_eq!(db.get(&[i]).unwrap(), Some(vec![i, i]));
        }
    });
}

fn test_example_dataset(open: Opener) {
    with_db(open, |db| {
        db.set(b"a", b"1").unwrap();
        db.set(b"b", b"2").unwrap();
        db.set(b"c", b"3").unwrap();

        assert_eq!(
            collect(db.iterator(None, None).unwrap()),
            pairs(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
        assert_eq!(
            collect(db.reverse_iterator(None, None).unwrap()),
            pairs(&[("c", "3"), ("b", "2"), ("a", "1")])
        );
        assert_eq!(
            collect(db.iterator(Some(b"b"), None).unwrap()),
            pairs(&[("b", "2"), ("c", "3")])
        );
        assert_eq!(
            collect(db.reverse_iterator(None, Some(b"b")).unwrap()),
            pairs(&[("a", "1")])
        );
    });
}

const DATASET: [&[u8]; 5] = [b"", b"b", b"d", b"f", b"f\x00"];

const BOUNDS: [Option<&[u8]>; 11] = [
    None,
    Some(b""),
    Some(b"\x00"),
    Some(b"a"),
    Some(b"b"),
    Some(b"c"),
    Some(b"d"),
    Some(b"e"),
    Some(b"f"),
    Some(b"f\x00"),
    Some(b"g"),
];

fn load_dataset(db: &dyn Db) {
    for key in DATASET {
        db.set(key, &[key, &b"-v"[..]].concat()).unwrap();
    }
}

fn test_reverse_mirrors_forward(open: Opener) {
    with_db(open, |db| {
        load_dataset(db);
        for start in BOUNDS {
            for end in BOUNDS {
                let mut forward = collect(db.iterator(start, end).unwrap());
                let reverse = collect(db.reverse_iterator(start, end).unwrap());
                forward.reverse();
                assert_eq!(forward, reverse, "domain [{:?}, {:?})", start, end);
            }
        }
    });
}

fn test_iterator_results_in_domain(open: Opener) {
    with_db(open, |db| {
        load_dataset(db);
        for start in BOUNDS {
            for end in BOUNDS {
                let expected: Vec<Vec<u8>> = DATASET
                    .iter()
                    .filter(|k| is_key_in_domain(k, start, end))
                    .map(|k| k.to_vec())
                    .collect();
                let keys = collect_keys(db.iterator(start, end).unwrap());
                assert_eq!(keys, expected, "domain [{:?}, {:?})", start, end);
                assert!(keys.windows(2).all(|w| w[0] < w[1]));
            }
        }
    });
}

fn test_invalid_is_sticky(open: Opener) {
    with_db(open, |db| {
        db.set(b"a", b"1").unwrap();
        db.set(b"b", b"2").unwrap();

        // Cursor runs off the end of the store
        let mut itr = db.iterator(None, None).unwrap();
        itr.next().unwrap();
        itr.next().unwrap();
        assert!(!itr.valid().unwrap());
        db.set(b"z", b"26").unwrap();
        assert!(!itr.valid().unwrap());

        // Cursor crosses the domain bound
        let mut itr = db.iterator(None, Some(b"b")).unwrap();
        assert!(itr.valid().unwrap());
        itr.next().unwrap();
        assert!(!itr.valid().unwrap());
        db.delete(b"b").unwrap();
        db.set(b"aa", b"x").unwrap();
        assert!(!itr.valid().unwrap());

        // Reverse cursor crosses the start bound
        let mut itr = db.reverse_iterator(Some(b"aa"), None).unwrap();
        assert_eq!(itr.key().unwrap(), b"z");
        itr.next().unwrap();
        assert_eq!(itr.key().unwrap(), b"aa");
        itr.next().unwrap();
        assert!(!itr.valid().unwrap());
        db.set(b"ab", b"y").unwrap();
        assert!(!itr.valid().unwrap());
    });
}

fn test_accessors_return_copies(open: Opener) {
    with_db(open, |db| {
        db.set(b"k", b"original").unwrap();

        let mut itr = db.iterator(None, None).unwrap();
        let mut key = itr.key().unwrap();
        let mut value = itr.value().unwrap();
        key.push(b'!');
        value.clear();

        db.set(b"k", b"overwritten").unwrap();
        assert_eq!(key, b"k!");
        assert_eq!(itr.key().unwrap(), b"k");
        assert!(value.is_empty());
        assert_eq!(itr.domain(), (None, None));
        assert!(!itr.is_reverse());
        itr.close();
    });
}

fn test_print_and_stats(open: Opener) {
    with_db(open, |db| {
        db.set(b"\x01", b"\x02").unwrap();

        let mut out = Vec::new();
        db.print_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[01]:\t[02]"), "unexpected dump: {}", text);

        let stats = db.stats().unwrap();
        assert_eq!(stats.get("backend").map(String::as_str), Some(db.backend()));
        assert_eq!(stats.get("entries").map(String::as_str), Some("1"));
    });
}

fn test_close(open: Opener) {
    with_db(open, |db| {
        db.set(b"k", b"v").unwrap();

        // Created before close, used after
        let mut batch = db.new_batch().unwrap();
        batch.set(b"late", b"write");
        let mut itr = db.iterator(None, None).unwrap();
        assert!(itr.valid().unwrap());

        db.close().unwrap();
        assert!(matches!(batch.write(), Err(DbError::Closed)));
        assert!(matches!(itr.valid(), Err(DbError::Closed)));
        db.close().unwrap();

        assert!(matches!(db.get(b"k"), Err(DbError::Closed)));
        assert!(matches!(db.set(b"k", b"v"), Err(DbError::Closed)));
        assert!(matches!(db.stats(), Err(DbError::Closed)));
        assert!(matches!(db.iterator(None, None), Err(DbError::Closed)));
        assert!(matches!(db.new_batch(), Err(DbError::Closed)));
    });
}
