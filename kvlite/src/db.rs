// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database handle trait
//!
//! [`Db`] is the uniform operation surface every backend implements:
//! point reads and writes (with durable variants), diagnostics, and the
//! factories for batches and iterators.
//!
//! # Example Usage
//!
//! ```ignore
//! use kvlite::BackendRegistry;
//!
//! let registry = BackendRegistry::with_builtin_backends();
//! let db = registry.open("state", "sled", "./data")?;
//!
//! db.set(b"key", b"value")?;
//! assert_eq!(db.get(b"key")?, Some(b"value".to_vec()));
//!
//! let mut batch = db.new_batch()?;
//! batch.set(b"a", b"1");
//! batch.delete(b"key");
//! batch.write_sync()?;
//!
//! let mut it = db.iterator(Some(b"a"), None)?;
//! while it.valid()? {
//!     println!("{:?} => {:?}", it.key()?, it.value()?);
//!     it.next()?;
//! }
//! ```

use crate::batch::Batch;
use crate::bytes::to_hex;
use crate::error::DbResult;
use crate::iterator::DbIterator;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Write;

/// Operations a backend may or may not implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Get,
    Has,
    Set,
    SetSync,
    Delete,
    DeleteSync,
    Print,
    Stats,
    NewBatch,
    Iterator,
    ReverseIterator,
}

/// Every operation in the [`Db`] contract
pub const ALL_OPERATIONS: [Operation; 11] = [
    Operation::Get,
    Operation::Has,
    Operation::Set,
    Operation::SetSync,
    Operation::Delete,
    Operation::DeleteSync,
    Operation::Print,
    Operation::Stats,
    Operation::NewBatch,
    Operation::Iterator,
    Operation::ReverseIterator,
];

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Get => "get",
            Operation::Has => "has",
            Operation::Set => "set",
            Operation::SetSync => "set_sync",
            Operation::Delete => "delete",
            Operation::DeleteSync => "delete_sync",
            Operation::Print => "print",
            Operation::Stats => "stats",
            Operation::NewBatch => "new_batch",
            Operation::Iterator => "iterator",
            Operation::ReverseIterator => "reverse_iterator",
        };
        write!(f, "{}", name)
    }
}

/// Capability descriptor for an open handle
///
/// Queried right after open so callers can detect a partial backend before
/// depending on an operation it does not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    supported: BTreeSet<Operation>,
}

impl Capabilities {
    /// A backend implementing the whole contract
    pub fn all() -> Self {
        Self {
            supported: ALL_OPERATIONS.iter().copied().collect(),
        }
    }

    /// A backend implementing only the listed operations
    pub fn only(ops: &[Operation]) -> Self {
        Self {
            supported: ops.iter().copied().collect(),
        }
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.supported.contains(&op)
    }

    pub fn is_complete(&self) -> bool {
        self.supported.len() == ALL_OPERATIONS.len()
    }

    /// Operations missing from this backend, in contract order
    pub fn unsupported(&self) -> Vec<Operation> {
        ALL_OPERATIONS
            .iter()
            .copied()
            .filter(|op| !self.supported.contains(op))
            .collect()
    }
}

/// A logical key-value database opened against one backend
///
/// Point operations may be called concurrently from several threads; the
/// engine serializes conflicting writes. Batches and iterators produced by
/// a handle are single-owner.
pub trait Db: Send + Sync {
    /// Logical database name this handle was opened with
    fn name(&self) -> &str;

    /// Backend identifier
    fn backend(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    /// Point lookup; `None` when the key does not exist
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    fn has(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write, overwriting any existing value; may return before the write is durable
    fn set(&self, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Write and return only once the write is durable
    fn set_sync(&self, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Remove an entry; a missing key is not an error
    fn delete(&self, key: &[u8]) -> DbResult<()>;

    fn delete_sync(&self, key: &[u8]) -> DbResult<()>;

    /// Release the engine connection
    ///
    /// Closing twice is allowed. Every other operation afterwards fails with
    /// [`crate::DbError::Closed`].
    fn close(&self) -> DbResult<()>;

    /// Dump every entry to stdout in hex
    fn print(&self) -> DbResult<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.print_to(&mut out)
    }

    /// Dump every entry to `out` in hex
    fn print_to(&self, out: &mut dyn Write) -> DbResult<()>;

    /// Implementation-defined diagnostic counters
    fn stats(&self) -> DbResult<HashMap<String, String>>;

    fn new_batch(&self) -> DbResult<Box<dyn Batch>>;

    /// Ascending iterator over `[start, end)`
    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>)
        -> DbResult<Box<dyn DbIterator>>;

    /// Descending iterator over `[start, end)`
    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> DbResult<Box<dyn DbIterator>>;
}

/// Write every entry of `itr` as `[KEY]:\t[VALUE]` lines
pub(crate) fn print_entries(itr: Box<dyn DbIterator>, out: &mut dyn Write) -> DbResult<()> {
    for entry in itr.entries() {
        let (key, value) = entry?;
        writeln!(out, "[{}]:\t[{}]", to_hex(&key), to_hex(&value))?;
    }
    Ok(())
}
