// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory backend for testing and ephemeral databases

use crate::batch::{Batch, BatchBuffer, BatchOp};
use crate::db::{print_entries, Db};
use crate::error::{DbError, DbResult};
use crate::iterator::{DbIterator, RangeIterator, RawCursor};
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const BACKEND_NAME: &str = "memory";

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory database
///
/// Data lives until the handle is closed or dropped. Batches and
/// iterators created from it fail with `Closed` after that.
pub struct MemoryDb {
    name: String,
    data: Arc<RwLock<Map>>,
    closed: Arc<AtomicBool>,
}

impl MemoryDb {
    /// Create an empty in-memory database
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: Arc::new(RwLock::new(BTreeMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        ensure_open(&self.closed)
    }

    fn make_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        is_reverse: bool,
    ) -> DbResult<Box<dyn DbIterator>> {
        self.ensure_open()?;
        let cursor = MemoryCursor::new(Arc::clone(&self.data), Arc::clone(&self.closed));
        Ok(Box::new(RangeIterator::new(cursor, start, end, is_reverse)))
    }
}

impl Db for MemoryDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> &str {
        BACKEND_NAME
    }

    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> DbResult<bool> {
        self.ensure_open()?;
        Ok(self.data.read().contains_key(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.ensure_open()?;
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn set_sync(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        // Nothing to flush
        self.set(key, value)
    }

    fn delete(&self, key: &[u8]) -> DbResult<()> {
        self.ensure_open()?;
        self.data.write().remove(key);
        Ok(())
    }

    fn delete_sync(&self, key: &[u8]) -> DbResult<()> {
        self.delete(key)
    }

    fn close(&self) -> DbResult<()> {
        let mut data = self.data.write();
        if !self.closed.swap(true, Ordering::AcqRel) {
            data.clear();
            debug!("Closed in-memory database '{}'", self.name);
        }
        Ok(())
    }

    fn print_to(&self, out: &mut dyn Write) -> DbResult<()> {
        print_entries(self.make_iterator(None, None, false)?, out)
    }

    fn stats(&self) -> DbResult<HashMap<String, String>> {
        self.ensure_open()?;
        let data = self.data.read();
        let size_bytes: usize = data.iter().map(|(k, v)| k.len() + v.len()).sum();

        let mut stats = HashMap::new();
        stats.insert("backend".to_string(), BACKEND_NAME.to_string());
        stats.insert("entries".to_string(), data.len().to_string());
        stats.insert("size_bytes".to_string(), size_bytes.to_string());
        Ok(stats)
    }

    fn new_batch(&self) -> DbResult<Box<dyn Batch>> {
        self.ensure_open()?;
        Ok(Box::new(MemoryBatch {
            data: Arc::clone(&self.data),
            closed: Arc::clone(&self.closed),
            buffer: BatchBuffer::new(),
        }))
    }

    fn iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> DbResult<Box<dyn DbIterator>> {
        self.make_iterator(start, end, false)
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> DbResult<Box<dyn DbIterator>> {
        self.make_iterator(start, end, true)
    }
}

impl Drop for MemoryDb {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn ensure_open(closed: &AtomicBool) -> DbResult<()> {
    if closed.load(Ordering::Acquire) {
        return Err(DbError::Closed);
    }
    Ok(())
}

/// Batch applied under a single write lock
struct MemoryBatch {
    data: Arc<RwLock<Map>>,
    closed: Arc<AtomicBool>,
    buffer: BatchBuffer,
}

impl MemoryBatch {
    fn apply(self) -> DbResult<()> {
        let mut data = self.data.write();
        // Checked under the lock so a commit never lands after close returns
        ensure_open(&self.closed)?;
        for op in self.buffer.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl Batch for MemoryBatch {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.buffer.put(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.buffer.delete(key);
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn write(self: Box<Self>) -> DbResult<()> {
        self.apply()
    }

    fn write_sync(self: Box<Self>) -> DbResult<()> {
        self.apply()
    }
}

/// Cursor that re-resolves its position against the live map on each step
struct MemoryCursor {
    data: Arc<RwLock<Map>>,
    closed: Arc<AtomicBool>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl MemoryCursor {
    fn new(data: Arc<RwLock<Map>>, closed: Arc<AtomicBool>) -> Self {
        Self {
            data,
            closed,
            current: None,
        }
    }

    fn land(&mut self, entry: Option<(&Vec<u8>, &Vec<u8>)>) {
        self.current = entry.map(|(k, v)| (k.clone(), v.clone()));
    }
}

impl RawCursor for MemoryCursor {
    fn seek(&mut self, target: &[u8]) {
        let map = Arc::clone(&self.data);
        let data = map.read();
        let entry = data
            .range::<[u8], _>((Bound::Included(target), Bound::Unbounded))
            .next();
        self.land(entry);
    }

    fn seek_to_first(&mut self) {
        let map = Arc::clone(&self.data);
        let data = map.read();
        self.land(data.first_key_value());
    }

    fn seek_to_last(&mut self) {
        let map = Arc::clone(&self.data);
        let data = map.read();
        self.land(data.last_key_value());
    }

    fn next(&mut self) {
        let Some((key, _)) = self.current.take() else {
            return;
        };
        let map = Arc::clone(&self.data);
        let data = map.read();
        let entry = data
            .range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
            .next();
        self.land(entry);
    }

    fn prev(&mut self) {
        let Some((key, _)) = self.current.take() else {
            return;
        };
        let map = Arc::clone(&self.data);
        let data = map.read();
        let entry = data
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key.as_slice())))
            .next_back();
        self.land(entry);
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or(&[])
    }

    fn status(&self) -> DbResult<()> {
        ensure_open(&self.closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stats() {
        let db = MemoryDb::new("stats");
        db.set(b"ab", b"cde").unwrap();
        db.set(b"f", b"").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.get("backend").map(String::as_str), Some("memory"));
        assert_eq!(stats.get("entries").map(String::as_str), Some("2"));
        assert_eq!(stats.get("size_bytes").map(String::as_str), Some("6"));
    }

    #[test]
    fn test_print_hex_dump() {
        let db = MemoryDb::new("print");
        db.set(b"\x01\x02", b"\xff").unwrap();
        db.set(b"a", b"b").unwrap();

        let mut out = Vec::new();
        db.print_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "[0102]:\t[FF]\n[61]:\t[62]\n");
    }

    #[test]
    fn test_cursor_steps_see_live_data() {
        let db = MemoryDb::new("live");
        db.set(b"a", b"1").unwrap();
        db.set(b"c", b"3").unwrap();

        let mut itr = db.iterator(None, None).unwrap();
        assert_eq!(itr.key().unwrap(), b"a");
        db.set(b"b", b"2").unwrap();
        itr.next().unwrap();
        assert_eq!(itr.key().unwrap(), b"b");
    }
}
