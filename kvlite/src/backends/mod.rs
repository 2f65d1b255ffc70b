// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend implementations
//!
//! # Backends
//!
//! - [`SledDb`]: persistent storage on the sled engine. The production backend.
//! - [`MemoryDb`]: ordered in-memory storage. Data is lost when the handle is dropped.
//! - `routed`: sends one logical database to a flat-file [`FileStore`] and
//!   everything else to sled. The file store only implements point reads and
//!   writes and serves as the template for adding a backend.
//!
//! A new backend implements [`crate::Db`], [`crate::Batch`] and a
//! [`crate::RawCursor`] for its engine, wraps the cursor in
//! [`crate::RangeIterator`], and registers a constructor with
//! [`crate::BackendRegistry::register`].

pub mod memory;
pub mod routed;
pub mod sled;

pub use self::memory::MemoryDb;
pub use self::routed::FileStore;
pub use self::sled::SledDb;
