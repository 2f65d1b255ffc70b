// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! kvlite - An embedded key-value storage abstraction
//!
//! kvlite puts one ordered byte-string key-value interface in front of
//! interchangeable storage engines. Callers pick an engine by name when the
//! database is opened and get the same behavior from all of them.
//!
//! # Features
//!
//! - **Point Operations**: get / has / set / delete, with durable `*_sync` variants
//! - **Atomic Batches**: ordered Put/Delete groups applied all-or-nothing
//! - **Range Iteration**: forward and reverse over half-open `[start, end)` domains
//! - **Pluggable Backends**: sled, in-memory, and a routed flat-file template
//! - **Capability Descriptors**: detect partially implemented backends up front
//!
//! # Architecture
//!
//! ```text
//! BackendRegistry (name -> constructor)
//!     ↓
//! Db (uniform handle) ── Batch / DbIterator
//!     ↓
//! Backend adapters (SledDb, MemoryDb, FileStore) ── RawCursor
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kvlite::BackendRegistry;
//!
//! let registry = BackendRegistry::with_builtin_backends();
//! let db = registry.open("state", "sled", "./data")?;
//!
//! db.set_sync(b"a", b"1")?;
//! for entry in db.reverse_iterator(None, Some(b"b"))?.entries() {
//!     let (key, value) = entry?;
//!     println!("{:?} = {:?}", key, value);
//! }
//! db.close()?;
//! ```

pub mod backends;
pub mod batch;
pub mod bytes;
pub mod config;
pub mod db;
pub mod error;
pub mod iterator;
pub mod registry;

pub use backends::{FileStore, MemoryDb, SledDb};
pub use batch::{Batch, BatchBuffer, BatchOp};
pub use config::{OpenOptions, WriteOptions};
pub use db::{Capabilities, Db, Operation};
pub use error::{DbError, DbResult};
pub use iterator::{DbIterator, Entries, RangeIterator, RawCursor};
pub use registry::{BackendRegistry, BackendType};

/// kvlite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// kvlite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
