// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Range iteration
//!
//! Backends only expose a [`RawCursor`] over their ordered key space.
//! [`RangeIterator`] layers the domain bounds, direction and the sticky
//! invalid flag on top of it, so every backend iterates the same way.
//!
//! State machine:
//!
//! ```text
//! Unpositioned --new()--> Positioned --next()--> Positioned
//!                              |
//!                     valid() == false
//!                              v
//!                          Invalid (terminal)
//! ```

use crate::bytes::{compare, cp, is_before_start, is_past_end};
use crate::error::DbResult;
use std::cmp::Ordering;

/// Engine cursor primitives
///
/// `key` and `value` are only meaningful while `valid` is true and may
/// point into buffers the engine reuses on the next step. Engine errors are
/// latched and reported through `status`.
pub trait RawCursor: Send {
    /// Position at the first key >= `target`
    fn seek(&mut self, target: &[u8]);

    fn seek_to_first(&mut self);

    fn seek_to_last(&mut self);

    /// Step to the next larger key
    fn next(&mut self);

    /// Step to the next smaller key
    fn prev(&mut self);

    fn valid(&self) -> bool;

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];

    /// First engine error seen by this cursor, if any
    fn status(&self) -> DbResult<()>;
}

/// Directional cursor over a bounded key range
///
/// Not safe for concurrent use; an iterator has exactly one owner. Dropping
/// the iterator (or calling [`DbIterator::close`]) releases the engine
/// cursor.
pub trait DbIterator: Send {
    /// The `[start, end)` bounds this iterator was created with
    fn domain(&self) -> (Option<&[u8]>, Option<&[u8]>);

    fn is_reverse(&self) -> bool;

    /// Whether the iterator currently points at an entry inside its domain
    ///
    /// Once this returns `Ok(false)` it keeps returning `Ok(false)`.
    fn valid(&mut self) -> DbResult<bool>;

    /// Copy of the current key
    ///
    /// # Panics
    /// If the iterator is not valid.
    fn key(&mut self) -> DbResult<Vec<u8>>;

    /// Copy of the current value
    ///
    /// # Panics
    /// If the iterator is not valid.
    fn value(&mut self) -> DbResult<Vec<u8>>;

    /// Advance in the iterator's direction
    ///
    /// # Panics
    /// If the iterator is not valid.
    fn next(&mut self) -> DbResult<()>;

    /// Release the engine cursor
    fn close(self: Box<Self>) {}
}

impl dyn DbIterator {
    /// Adapt into a standard iterator yielding `(key, value)` pairs
    pub fn entries(self: Box<Self>) -> Entries {
        Entries {
            inner: self,
            done: false,
        }
    }
}

/// Standard-library adapter returned by `DbIterator::entries`
pub struct Entries {
    inner: Box<dyn DbIterator>,
    done: bool,
}

impl Entries {
    fn step(&mut self) -> DbResult<Option<(Vec<u8>, Vec<u8>)>> {
        if !self.inner.valid()? {
            return Ok(None);
        }
        let key = self.inner.key()?;
        let value = self.inner.value()?;
        self.inner.next()?;
        Ok(Some((key, value)))
    }
}

impl Iterator for Entries {
    type Item = DbResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// The shared iterator implementation over any [`RawCursor`]
pub struct RangeIterator<C: RawCursor> {
    source: C,
    start: Option<Vec<u8>>,
    end: Option<Vec<u8>>,
    is_reverse: bool,
    is_invalid: bool,
}

impl<C: RawCursor> RangeIterator<C> {
    /// Position `source` for the given domain and direction
    pub fn new(mut source: C, start: Option<&[u8]>, end: Option<&[u8]>, is_reverse: bool) -> Self {
        if is_reverse {
            match end {
                None => source.seek_to_last(),
                Some(end) => {
                    source.seek(end);
                    if source.valid() {
                        // end is exclusive: land strictly before it
                        if compare(end, source.key()) != Ordering::Greater {
                            source.prev();
                        }
                    } else {
                        source.seek_to_last();
                    }
                }
            }
        } else {
            match start {
                None => source.seek_to_first(),
                Some(start) => source.seek(start),
            }
        }

        Self {
            source,
            start: start.map(cp),
            end: end.map(cp),
            is_reverse,
            is_invalid: false,
        }
    }

    fn assert_is_valid(&mut self, op: &str) -> DbResult<()> {
        if !self.check_valid()? {
            panic!("RangeIterator::{} called on an invalid iterator", op);
        }
        Ok(())
    }

    fn check_valid(&mut self) -> DbResult<bool> {
        // Once invalid, forever invalid.
        if self.is_invalid {
            return Ok(false);
        }

        self.source.status()?;

        if !self.source.valid() {
            self.is_invalid = true;
            return Ok(false);
        }

        let key = self.source.key();
        let out_of_range = if self.is_reverse {
            is_before_start(key, self.start.as_deref())
        } else {
            is_past_end(key, self.end.as_deref())
        };
        if out_of_range {
            self.is_invalid = true;
            return Ok(false);
        }

        Ok(true)
    }
}

impl<C: RawCursor> DbIterator for RangeIterator<C> {
    fn domain(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        (self.start.as_deref(), self.end.as_deref())
    }

    fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    fn valid(&mut self) -> DbResult<bool> {
        self.check_valid()
    }

    fn key(&mut self) -> DbResult<Vec<u8>> {
        self.assert_is_valid("key")?;
        Ok(cp(self.source.key()))
    }

    fn value(&mut self) -> DbResult<Vec<u8>> {
        self.assert_is_valid("value")?;
        Ok(cp(self.source.value()))
    }

    fn next(&mut self) -> DbResult<()> {
        self.assert_is_valid("next")?;
        if self.is_reverse {
            self.source.prev();
        } else {
            self.source.next();
        }
        Ok(())
    }
}
