// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Routed backend
//!
//! Sends one designated logical database (`OpenOptions::routed_name`,
//! `"blockstore"` by default) to a flat-file store and every other name to
//! the sled backend.
//!
//! The flat-file store is partial and doubles as the template
//! for new backends: it implements point reads and writes only, reports the
//! rest through [`Capabilities`], and returns [`DbError::Unsupported`] when
//! an unimplemented operation is called anyway.

use super::sled::SledDb;
use crate::batch::Batch;
use crate::bytes::{from_hex, to_hex};
use crate::config::{OpenOptions, WriteOptions};
use crate::db::{Capabilities, Db, Operation};
use crate::error::{DbError, DbResult};
use crate::iterator::DbIterator;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub const BACKEND_NAME: &str = "routed";

/// Directory extension for flat-file stores
pub const FILES_EXTENSION: &str = "files";

/// Prefix of files named by the hex-encoded key
const KEY_FILE_PREFIX: &str = "k";

/// Prefix of files named by a checksum of the key
const HASHED_FILE_PREFIX: &str = "h";

const TMP_SUFFIX: &str = ".tmp";

/// Longest hex key used directly as a file name; prefix and temp suffix
/// still fit under the 255-byte name limit of common filesystems
const MAX_HEX_NAME_LEN: usize = 200;

/// Size of the key length field in a hashed key file
const KEY_LEN_SIZE: usize = 4;

const FILE_STORE_OPERATIONS: [Operation; 4] = [
    Operation::Get,
    Operation::Has,
    Operation::Set,
    Operation::SetSync,
];

/// Open `name` against the store it is routed to
pub fn open(name: &str, dir: &Path, options: &OpenOptions) -> DbResult<Box<dyn Db>> {
    if name == options.routed_name {
        debug!("Routing '{}' to the flat-file store", name);
        Ok(Box::new(FileStore::open(name, dir, options)?))
    } else {
        debug!("Routing '{}' to sled", name);
        Ok(Box::new(SledDb::open(name, dir, options)?))
    }
}

/// Encode a hashed key file: key length (u32 LE), key, value
fn encode_record(key: &[u8], value: &[u8]) -> DbResult<Vec<u8>> {
    let key_len = u32::try_from(key.len())
        .map_err(|_| DbError::Operation(format!("key of {} bytes is too long", key.len())))?;
    let mut buffer = Vec::with_capacity(KEY_LEN_SIZE + key.len() + value.len());
    buffer.extend_from_slice(&key_len.to_le_bytes());
    buffer.extend_from_slice(key);
    buffer.extend_from_slice(value);
    Ok(buffer)
}

/// Split a hashed key file into `(key, value)`
fn decode_record<'a>(path: &Path, data: &'a [u8]) -> DbResult<(&'a [u8], &'a [u8])> {
    let corrupted = || DbError::Operation(format!("corrupted key file {:?}", path));
    if data.len() < KEY_LEN_SIZE {
        return Err(corrupted());
    }
    let (len_bytes, rest) = data.split_at(KEY_LEN_SIZE);
    let key_len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
    let key_len = usize::try_from(key_len).map_err(|_| corrupted())?;
    if rest.len() < key_len {
        return Err(corrupted());
    }
    Ok(rest.split_at(key_len))
}

/// Read a file, mapping a missing file to `None`
fn read_optional(path: &Path) -> DbResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Where a key lives on disk
enum KeyFile {
    /// File named after the hex key; holds the raw value
    Direct(PathBuf),
    /// Checksum-named slot holding a key header; `value` is set when the
    /// slot already stores this key
    Hashed {
        path: PathBuf,
        value: Option<Vec<u8>>,
    },
}

/// One file per key under `<dir>/<name>.files/`
///
/// Short keys map to `k<HEX>` with the value as the file body, so the
/// empty key still maps to a valid file name. Keys too long for a file
/// name map to `h<CRC32>` slots (`h<CRC32>-1`, `-2`, ... on collision)
/// whose body starts with the full key.
pub struct FileStore {
    name: String,
    root: PathBuf,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileStore {
    pub fn open(name: &str, dir: &Path, options: &OpenOptions) -> DbResult<Self> {
        let root = dir.join(format!("{}.{}", name, FILES_EXTENSION));
        if !root.is_dir() {
            if !options.create_if_missing {
                return Err(DbError::engine_open(
                    BACKEND_NAME,
                    &root,
                    "store does not exist and create_if_missing is false",
                ));
            }
            fs::create_dir_all(&root).map_err(|e| DbError::engine_open(BACKEND_NAME, &root, e))?;
        }

        info!("Opened flat-file store '{}' at {:?}", name, root);
        Ok(Self {
            name: name.to_string(),
            root,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Directory holding the key files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys currently stored, in no particular order
    pub fn keys(&self) -> DbResult<Vec<Vec<u8>>> {
        self.ensure_open()?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.ends_with(TMP_SUFFIX) {
                continue;
            }
            if let Some(hex) = file_name.strip_prefix(KEY_FILE_PREFIX) {
                if let Some(key) = from_hex(hex) {
                    keys.push(key);
                }
            } else if file_name.starts_with(HASHED_FILE_PREFIX) {
                let path = entry.path();
                let data = fs::read(&path)?;
                let (key, _) = decode_record(&path, &data)?;
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    /// Resolve the file for `key`, probing checksum slots for long keys
    ///
    /// Slots are never freed, so the first missing slot ends the probe.
    fn locate(&self, key: &[u8]) -> DbResult<KeyFile> {
        let hex = to_hex(key);
        if hex.len() <= MAX_HEX_NAME_LEN {
            return Ok(KeyFile::Direct(
                self.root.join(format!("{}{}", KEY_FILE_PREFIX, hex)),
            ));
        }

        let base = format!("{}{:08X}", HASHED_FILE_PREFIX, crc32fast::hash(key));
        let mut slot = 0usize;
        loop {
            let file_name = if slot == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, slot)
            };
            let path = self.root.join(file_name);
            let Some(data) = read_optional(&path)? else {
                return Ok(KeyFile::Hashed { path, value: None });
            };
            let (stored_key, value) = decode_record(&path, &data)?;
            if stored_key == key {
                let value = value.to_vec();
                return Ok(KeyFile::Hashed {
                    path,
                    value: Some(value),
                });
            }
            slot += 1;
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::Closed);
        }
        Ok(())
    }

    fn unsupported<T>(&self, op: Operation) -> DbResult<T> {
        self.ensure_open()?;
        Err(DbError::unsupported(BACKEND_NAME, op))
    }

    /// Write to a temporary file and rename it over the key file
    fn write_file(&self, key: &[u8], value: &[u8], opts: WriteOptions) -> DbResult<()> {
        self.ensure_open()?;
        // Held across locate so two long keys never claim the same free slot
        let _guard = self.write_lock.lock();

        let (path, body) = match self.locate(key)? {
            KeyFile::Direct(path) => (path, value.to_vec()),
            KeyFile::Hashed { path, .. } => (path, encode_record(key, value)?),
        };
        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp_name);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            if opts.sync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, &path)?;
        if opts.sync {
            // Persist the rename itself
            fs::File::open(&self.root)?.sync_all()?;
        }
        Ok(())
    }
}

impl Db for FileStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> &str {
        BACKEND_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::only(&FILE_STORE_OPERATIONS)
    }

    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        match self.locate(key)? {
            KeyFile::Direct(path) => read_optional(&path),
            KeyFile::Hashed { value, .. } => Ok(value),
        }
    }

    fn has(&self, key: &[u8]) -> DbResult<bool> {
        self.ensure_open()?;
        match self.locate(key)? {
            KeyFile::Direct(path) => match fs::metadata(&path) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            },
            KeyFile::Hashed { value, .. } => Ok(value.is_some()),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.write_file(key, value, WriteOptions::default())
    }

    fn set_sync(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.write_file(key, value, WriteOptions::sync())
    }

    fn delete(&self, _key: &[u8]) -> DbResult<()> {
        self.unsupported(Operation::Delete)
    }

    fn delete_sync(&self, _key: &[u8]) -> DbResult<()> {
        self.unsupported(Operation::DeleteSync)
    }

    fn close(&self) -> DbResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed flat-file store '{}'", self.name);
        }
        Ok(())
    }

    fn print_to(&self, _out: &mut dyn Write) -> DbResult<()> {
        self.unsupported(Operation::Print)
    }

    fn stats(&self) -> DbResult<HashMap<String, String>> {
        self.unsupported(Operation::Stats)
    }

    fn new_batch(&self) -> DbResult<Box<dyn Batch>> {
        self.unsupported(Operation::NewBatch)
    }

    fn iterator(
        &self,
        _start: Option<&[u8]>,
        _end: Option<&[u8]>,
    ) -> DbResult<Box<dyn DbIterator>> {
        self.unsupported(Operation::Iterator)
    }

    fn reverse_iterator(
        &self,
        _start: Option<&[u8]>,
        _end: Option<&[u8]>,
    ) -> DbResult<Box<dyn DbIterator>> {
        self.unsupported(Operation::ReverseIterator)
    }
}
