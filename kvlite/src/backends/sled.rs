// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled backend
//!
//! Each logical database is a sled instance at `<dir>/<name>.db`. Buffered
//! writes rely on sled's background flusher; the `*_sync` variants flush
//! before returning.

use crate::batch::{Batch, BatchBuffer, BatchOp};
use crate::config::{OpenOptions, WriteOptions};
use crate::db::{print_entries, Db};
use crate::error::{DbError, DbResult};
use crate::iterator::{DbIterator, RangeIterator, RawCursor};
use log::{debug, info, warn};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use sled::IVec;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const BACKEND_NAME: &str = "sled";

/// Directory extension for sled databases
pub const DB_EXTENSION: &str = "db";

/// Engine slot shared by a handle and the batches and cursors it creates
///
/// `close` empties the slot; the engine is released once the last
/// in-flight operation drops its read guard.
type EngineSlot = Arc<RwLock<Option<sled::Db>>>;

/// Sled-backed database handle
pub struct SledDb {
    name: String,
    path: PathBuf,
    db: EngineSlot,
}

impl SledDb {
    /// Open or create `<dir>/<name>.db`
    pub fn open<P: AsRef<Path>>(name: &str, dir: P, options: &OpenOptions) -> DbResult<Self> {
        let path = dir.as_ref().join(format!("{}.{}", name, DB_EXTENSION));

        if !options.create_if_missing && !path.exists() {
            return Err(DbError::engine_open(
                BACKEND_NAME,
                &path,
                "database does not exist and create_if_missing is false",
            ));
        }

        let db = sled::Config::new()
            .path(&path)
            .cache_capacity(options.cache_capacity)
            .flush_every_ms(options.flush_every_ms)
            .open()
            .map_err(|e| DbError::engine_open(BACKEND_NAME, &path, e))?;

        info!("Opened sled database '{}' at {:?}", name, path);

        Ok(Self {
            name: name.to_string(),
            path,
            db: Arc::new(RwLock::new(Some(db))),
        })
    }

    /// On-disk location of this database
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the engine handle, failing fast once closed
    ///
    /// The read guard keeps `close` from tearing down the engine while an
    /// operation is in flight.
    fn db(&self) -> DbResult<MappedRwLockReadGuard<'_, sled::Db>> {
        RwLockReadGuard::try_map(self.db.read(), |db| db.as_ref()).map_err(|_| DbError::Closed)
    }

    fn put_opt(&self, key: &[u8], value: &[u8], opts: WriteOptions) -> DbResult<()> {
        let db = self.db()?;
        db.insert(key, value)?;
        if opts.sync {
            db.flush()?;
        }
        Ok(())
    }

    fn delete_opt(&self, key: &[u8], opts: WriteOptions) -> DbResult<()> {
        let db = self.db()?;
        db.remove(key)?;
        if opts.sync {
            db.flush()?;
        }
        Ok(())
    }

    fn make_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        is_reverse: bool,
    ) -> DbResult<Box<dyn DbIterator>> {
        // Fail fast, but do not hold the guard while the cursor positions itself
        drop(self.db()?);
        let cursor = SledCursor::new(Arc::clone(&self.db));
        Ok(Box::new(RangeIterator::new(cursor, start, end, is_reverse)))
    }
}

impl Db for SledDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> &str {
        BACKEND_NAME
    }

    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        let db = self.db()?;
        Ok(db.get(key)?.map(|v| v.to_vec()))
    }

    fn has(&self, key: &[u8]) -> DbResult<bool> {
        let db = self.db()?;
        Ok(db.contains_key(key)?)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.put_opt(key, value, WriteOptions::default())
    }

    fn set_sync(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.put_opt(key, value, WriteOptions::sync())
    }

    fn delete(&self, key: &[u8]) -> DbResult<()> {
        self.delete_opt(key, WriteOptions::default())
    }

    fn delete_sync(&self, key: &[u8]) -> DbResult<()> {
        self.delete_opt(key, WriteOptions::sync())
    }

    fn close(&self) -> DbResult<()> {
        let Some(db) = self.db.write().take() else {
            return Ok(());
        };
        db.flush()?;
        info!("Closed sled database '{}'", self.name);
        Ok(())
    }

    fn print_to(&self, out: &mut dyn Write) -> DbResult<()> {
        let mut stats: Vec<_> = self.stats()?.into_iter().collect();
        stats.sort();
        let line: Vec<String> = stats.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        writeln!(out, "{}", line.join(" "))?;

        print_entries(self.make_iterator(None, None, false)?, out)
    }

    fn stats(&self) -> DbResult<HashMap<String, String>> {
        let db = self.db()?;
        let mut stats = HashMap::new();
        stats.insert("backend".to_string(), BACKEND_NAME.to_string());
        stats.insert("entries".to_string(), db.len().to_string());
        stats.insert("path".to_string(), self.path.display().to_string());
        match db.size_on_disk() {
            Ok(size) => {
                stats.insert("size_on_disk".to_string(), size.to_string());
            }
            Err(e) => warn!("Could not read size_on_disk for '{}': {}", self.name, e),
        }
        Ok(stats)
    }

    fn new_batch(&self) -> DbResult<Box<dyn Batch>> {
        drop(self.db()?);
        Ok(Box::new(SledBatch {
            db: Arc::clone(&self.db),
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

impl Drop for SledDb {
    fn drop(&mut self) {
        if let Some(db) = self.db.write().take() {
            if let Err(e) = db.flush() {
                warn!("Flush on drop failed for '{}': {}", self.name, e);
            }
        }
    }
}

/// Batch committed through `Tree::apply_batch`
struct SledBatch {
    db: EngineSlot,
    buffer: BatchBuffer,
}

impl SledBatch {
    fn commit(self, opts: WriteOptions) -> DbResult<()> {
        let SledBatch { db, buffer } = self;
        let guard = db.read();
        let db = guard.as_ref().ok_or(DbError::Closed)?;

        let count = buffer.len();
        let mut batch = sled::Batch::default();
        for op in buffer.into_ops() {
            match op {
                BatchOp::Put { key, value } => batch.insert(key, value),
                BatchOp::Delete { key } => batch.remove(key),
            }
        }

        db.apply_batch(batch)?;
        if opts.sync {
            db.flush()?;
        }
        debug!("Committed batch of {} operations (sync: {})", count, opts.sync);
        Ok(())
    }
}

impl Batch for SledBatch {
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
        self.commit(WriteOptions::default())
    }

    fn write_sync(self: Box<Self>) -> DbResult<()> {
        self.commit(WriteOptions::sync())
    }
}

/// Cursor built from sled's ordered lookups relative to the current key
///
/// Every step goes back through the engine slot, so a cursor never keeps a
/// closed engine alive and reports `Closed` once the handle is gone.
struct SledCursor {
    db: EngineSlot,
    current: Option<(IVec, IVec)>,
    closed: bool,
    error: Option<String>,
}

impl SledCursor {
    fn new(db: EngineSlot) -> Self {
        Self {
            db,
            current: None,
            closed: false,
            error: None,
        }
    }

    fn step<F>(&mut self, lookup: F)
    where
        F: FnOnce(&sled::Db) -> sled::Result<Option<(IVec, IVec)>>,
    {
        let result = self.db.read().as_ref().map(lookup);
        match result {
            Some(Ok(entry)) => self.current = entry,
            Some(Err(e)) => {
                self.current = None;
                if self.error.is_none() {
                    self.error = Some(e.to_string());
                }
            }
            None => {
                self.current = None;
                self.closed = true;
            }
        }
    }
}

impl RawCursor for SledCursor {
    fn seek(&mut self, target: &[u8]) {
        self.step(|db| db.range(target..).next().transpose());
    }

    fn seek_to_first(&mut self) {
        self.step(|db| db.first());
    }

    fn seek_to_last(&mut self) {
        self.step(|db| db.last());
    }

    fn next(&mut self) {
        let Some((key, _)) = self.current.take() else {
            return;
        };
        self.step(|db| db.get_gt(&key));
    }

    fn prev(&mut self) {
        let Some((key, _)) = self.current.take() else {
            return;
        };
        self.step(|db| db.get_lt(&key));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_ref()).unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_ref()).unwrap_or(&[])
    }

    fn status(&self) -> DbResult<()> {
        if self.closed || self.db.read().is_none() {
            return Err(DbError::Closed);
        }
        match &self.error {
            Some(e) => Err(DbError::Operation(e.clone())),
            None => Ok(()),
        }
    }
}
