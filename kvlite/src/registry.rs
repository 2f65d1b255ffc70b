// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend registry
//!
//! Maps backend names to constructors. A registry is an ordinary value:
//! build it once at startup, register any custom backends, and pass it by
//! reference to whatever opens databases.
//!
//! # Examples
//! ```ignore
//! use kvlite::{BackendRegistry, BackendType};
//!
//! let registry = BackendRegistry::with_builtin_backends();
//! let db = registry.open("state", BackendType::Sled.as_str(), "./data")?;
//! ```

use crate::backends::{memory, routed, sled, MemoryDb, SledDb};
use crate::config::OpenOptions;
use crate::db::Db;
use crate::error::{DbError, DbResult};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Constructor signature: logical name, root directory, options
pub type Constructor =
    Arc<dyn Fn(&str, &Path, &OpenOptions) -> DbResult<Box<dyn Db>> + Send + Sync>;

/// Built-in backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Sled - Pure Rust embedded database
    /// Best for: production use
    Sled,

    /// Memory - Ordered in-memory map
    /// Best for: unit testing, ephemeral databases
    Memory,

    /// Routed - flat-file store for one logical database, sled for the rest
    Routed,
}

impl BackendType {
    pub const ALL: [BackendType; 3] = [BackendType::Sled, BackendType::Memory, BackendType::Routed];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Sled => sled::BACKEND_NAME,
            BackendType::Memory => memory::BACKEND_NAME,
            BackendType::Routed => routed::BACKEND_NAME,
        }
    }

    pub fn requires_directory(&self) -> bool {
        !matches!(self, BackendType::Memory)
    }
}

impl Default for BackendType {
    fn default() -> Self {
        BackendType::Sled
    }
}

impl std::str::FromStr for BackendType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        BackendType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| DbError::BackendNotFound(s.to_string()))
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn open_sled(name: &str, dir: &Path, options: &OpenOptions) -> DbResult<Box<dyn Db>> {
    Ok(Box::new(SledDb::open(name, dir, options)?))
}

fn open_memory(name: &str, _dir: &Path, _options: &OpenOptions) -> DbResult<Box<dyn Db>> {
    Ok(Box::new(MemoryDb::new(name)))
}

struct RegistryEntry {
    constructor: Constructor,
    requires_directory: bool,
}

/// Name → constructor mapping used to open databases
#[derive(Default)]
pub struct BackendRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every [`BackendType`]
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        registry.register(
            BackendType::Sled.as_str(),
            open_sled,
            BackendType::Sled.requires_directory(),
        );
        registry.register(
            BackendType::Memory.as_str(),
            open_memory,
            BackendType::Memory.requires_directory(),
        );
        registry.register(
            BackendType::Routed.as_str(),
            routed::open,
            BackendType::Routed.requires_directory(),
        );
        registry
    }

    /// Register a backend; a second registration under the same name replaces the first
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F, requires_directory: bool)
    where
        F: Fn(&str, &Path, &OpenOptions) -> DbResult<Box<dyn Db>> + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = RegistryEntry {
            constructor: Arc::new(constructor),
            requires_directory,
        };
        if self.entries.insert(name.clone(), entry).is_some() {
            debug!("Replaced registered backend '{}'", name);
        } else {
            debug!("Registered backend '{}'", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether the backend needs a root directory; `None` if unknown
    pub fn requires_directory(&self, name: &str) -> Option<bool> {
        self.entries.get(name).map(|e| e.requires_directory)
    }

    /// Registered backend names, sorted
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Open `logical_name` on `backend_name` with default options
    pub fn open<P: AsRef<Path>>(
        &self,
        logical_name: &str,
        backend_name: &str,
        dir: P,
    ) -> DbResult<Box<dyn Db>> {
        self.open_with(logical_name, backend_name, dir, &OpenOptions::default())
    }

    /// Open `logical_name` on `backend_name` with explicit options
    pub fn open_with<P: AsRef<Path>>(
        &self,
        logical_name: &str,
        backend_name: &str,
        dir: P,
        options: &OpenOptions,
    ) -> DbResult<Box<dyn Db>> {
        let entry = self
            .entries
            .get(backend_name)
            .ok_or_else(|| DbError::BackendNotFound(backend_name.to_string()))?;

        let dir = dir.as_ref();
        if entry.requires_directory && dir.as_os_str().is_empty() {
            return Err(DbError::config(format!(
                "backend '{}' requires a directory",
                backend_name
            )));
        }
        options.validate()?;

        info!(
            "Opening database '{}' with backend '{}' in {:?}",
            logical_name, backend_name, dir
        );
        (entry.constructor)(logical_name, dir, options)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backend_names())
            .finish()
    }
}
