// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for database operations
//!
//! Engine faults are surfaced as [`DbError`] values so callers can decide
//! whether to retry or abort. Iterator misuse (reading an invalid iterator)
//! is a programming error and panics instead.

use crate::db::Operation;
use thiserror::Error;

/// Errors returned by the registry, database handles, batches and iterators
#[derive(Error, Debug)]
pub enum DbError {
    /// The requested backend identifier was never registered
    #[error("Unknown db backend: {0}")]
    BackendNotFound(String),

    /// The underlying engine could not open its storage
    #[error("Failed to open {backend} database at {path}: {message}")]
    EngineOpen {
        backend: String,
        path: String,
        message: String,
    },

    /// Engine I/O error during a point operation, batch commit or cursor step
    #[error("Storage engine error: {0}")]
    Operation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend does not implement this operation
    #[error("Operation {operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: String,
        operation: Operation,
    },

    /// The handle was closed before this call
    #[error("Database is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(backend: S, operation: Operation) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation,
        }
    }

    /// Create an engine open error
    pub fn engine_open<B: Into<String>, M: ToString>(
        backend: B,
        path: &std::path::Path,
        message: M,
    ) -> Self {
        Self::EngineOpen {
            backend: backend.into(),
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error reports a missing capability rather than a fault
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<sled::Error> for DbError {
    fn from(e: sled::Error) -> Self {
        match e {
            sled::Error::Io(io) => DbError::Io(io),
            other => DbError::Operation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::InvalidConfig(e.to_string())
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
