// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Atomic write batches
//!
//! A batch buffers Put/Delete operations in insertion order and applies
//! them as one atomic unit. `write` and `write_sync` consume the batch, so
//! a committed batch cannot be mutated or written again.

use crate::error::DbResult;

/// One buffered batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// A pending group of writes committed atomically
///
/// Not safe for concurrent mutation; a batch has exactly one owner.
pub trait Batch: Send {
    /// Buffer a put
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Buffer a delete
    fn delete(&mut self, key: &[u8]);

    /// Number of buffered operations
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every buffered operation atomically
    fn write(self: Box<Self>) -> DbResult<()>;

    /// Apply atomically and return once the result is durable
    fn write_sync(self: Box<Self>) -> DbResult<()>;
}

/// Ordered operation buffer shared by the backend batches
#[derive(Debug, Clone, Default)]
pub struct BatchBuffer {
    ops: Vec<BatchOp>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
