// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Byte ordering primitives
//!
//! Keys are ordered byte-wise lexicographically. Every range check in the
//! crate goes through these helpers so that all backends agree on what
//! `[start, end)` means.
//!
//! There is no separate "absent key" value: keys and values are `&[u8]`
//! throughout, so the empty slice is the only empty representation an
//! engine ever sees. `Option` appears only on range bounds.

use std::cmp::Ordering;
use std::fmt::Write;

/// Lexicographic comparison of two byte strings
#[inline]
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Return an owned copy of an engine-owned buffer
#[inline]
pub fn cp(bytes: &[u8]) -> Vec<u8> {
    bytes.to_vec()
}

/// True when `key` is at or past the exclusive upper bound
pub fn is_past_end(key: &[u8], end: Option<&[u8]>) -> bool {
    match end {
        Some(end) => compare(end, key) != Ordering::Greater,
        None => false,
    }
}

/// True when `key` sorts strictly before the inclusive lower bound
pub fn is_before_start(key: &[u8], start: Option<&[u8]>) -> bool {
    match start {
        Some(start) => compare(key, start) == Ordering::Less,
        None => false,
    }
}

/// True when `start <= key < end`, treating absent bounds as unbounded
pub fn is_key_in_domain(key: &[u8], start: Option<&[u8]>, end: Option<&[u8]>) -> bool {
    !is_before_start(key, start) && !is_past_end(key, end)
}

/// Upper-case hex rendering used by diagnostic dumps
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02X}", b);
    }
    out
}

/// Inverse of [`to_hex`]; accepts either case
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_is_lexicographic() {
        assert_eq!(compare(b"a", b"b"), Ordering::Less);
        assert_eq!(compare(b"ab", b"a"), Ordering::Greater);
        assert_eq!(compare(b"", b"\x00"), Ordering::Less);
        assert_eq!(compare(b"\xff", b"\x00\x00"), Ordering::Greater);
        assert_eq!(compare(b"abc", b"abc"), Ordering::Equal);
    }

    #[test]
    fn test_domain_bounds() {
        // start is inclusive, end is exclusive
        assert!(is_key_in_domain(b"b", Some(b"b"), Some(b"c")));
        assert!(!is_key_in_domain(b"c", Some(b"b"), Some(b"c")));
        assert!(!is_key_in_domain(b"a", Some(b"b"), None));
        assert!(is_key_in_domain(b"zzz", None, None));
        assert!(is_key_in_domain(b"", None, Some(b"a")));
        assert!(!is_key_in_domain(b"", Some(b"a"), None));
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(to_hex(b"\x00\xab\x10"), "00AB10");
        assert_eq!(from_hex("00ab10"), Some(b"\x00\xab\x10".to_vec()));
        assert_eq!(from_hex("abc"), None);
        assert_eq!(from_hex("zz"), None);
        assert_eq!(from_hex(""), Some(vec![]));
    }
}
