// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Open-time and per-call configuration
//!
//! [`OpenOptions`] is fixed for the lifetime of a handle. [`WriteOptions`]
//! is a small `Copy` value built for each write, so toggling durability for
//! one call never affects another.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default logical database routed to the flat-file store by the `routed` backend
pub const DEFAULT_ROUTED_NAME: &str = "blockstore";

/// Options applied when a database handle is opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Create the on-disk directory if it does not exist
    pub create_if_missing: bool,

    /// Engine page cache size in bytes (sled)
    pub cache_capacity: u64,

    /// Background flush interval in milliseconds; `None` disables it
    pub flush_every_ms: Option<u64>,

    /// Logical database name the `routed` backend sends to its flat-file store
    pub routed_name: String,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            cache_capacity: 64 * 1024 * 1024, // 64MB
            flush_every_ms: Some(500),
            routed_name: DEFAULT_ROUTED_NAME.to_string(),
        }
    }
}

impl OpenOptions {
    /// Parse options from a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> DbResult<Self> {
        let options: OpenOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject option combinations no backend can honor
    pub fn validate(&self) -> DbResult<()> {
        if self.cache_capacity == 0 {
            return Err(DbError::config("cache_capacity must be greater than zero"));
        }
        if self.flush_every_ms == Some(0) {
            return Err(DbError::config(
                "flush_every_ms must be positive; use null to disable background flushes",
            ));
        }
        if self.routed_name.is_empty() {
            return Err(DbError::config("routed_name must not be empty"));
        }
        Ok(())
    }
}

/// Options for a single write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Return only after the engine has made the write durable
    pub sync: bool,
}

impl WriteOptions {
    /// Options for a durable write
    pub const fn sync() -> Self {
        Self { sync: true }
    }

    /// Options for a buffered write
    pub const fn buffered() -> Self {
        Self { sync: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = OpenOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.routed_name, "blockstore");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = OpenOptions::from_json_str(r#"{"routed_name": "blocks"}"#).unwrap();
        assert_eq!(options.routed_name, "blocks");
        assert_eq!(options.cache_capacity, OpenOptions::default().cache_capacity);
        assert!(options.create_if_missing);
    }

    #[test]
    fn test_invalid_json_options() {
        assert!(matches!(
            OpenOptions::from_json_str(r#"{"cache_capacity": 0}"#),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            OpenOptions::from_json_str(r#"{"flush_every_ms": 0}"#),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            OpenOptions::from_json_str("not json"),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvlite.json");
        std::fs::write(&path, r#"{"flush_every_ms": null}"#).unwrap();

        let options = OpenOptions::from_json_file(&path).unwrap();
        assert_eq!(options.flush_every_ms, None);
    }

    #[test]
    fn test_write_options_are_independent_values() {
        let buffered = WriteOptions::default();
        let durable = WriteOptions::sync();
        assert!(!buffered.sync);
        assert!(durable.sync);
        assert_eq!(WriteOptions::buffered(), buffered);
    }
}
