//! Column letter addressing and per-sheet key → column assignment.

use std::collections::HashMap;

use crate::config::{N_NCOLS_MAX, RESERVED_COLUMNS};

/// Convert a zero-based column index to its letter address
/// (0 → A, 25 → Z, 26 → AA, 701 → ZZ, 702 → AAA).
///
/// Bijective base-26: digits run 1..=26 (A..=Z) and there is no zero digit.
pub fn column_letters(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = index as u64 + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letters`]. Accepts lowercase; rejects empty input,
/// non-letters and addresses past `u32`.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (b.to_ascii_uppercase() - b'A') as u64 + 1;
        if n > u32::MAX as u64 + 1 {
            return None;
        }
    }
    Some((n - 1) as u32)
}

/// Cell reference such as `B7` for zero-based column and 1-based row.
pub fn cell_reference(column: u32, row: u32) -> String {
    format!("{}{row}", column_letters(column))
}

/// Split `AB12` (optionally `$AB$12`) into zero-based column and 1-based row.
pub fn split_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim();
    let stripped: String = reference.chars().filter(|c| *c != '$').collect();
    let split_at = stripped.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = stripped.split_at(split_at);
    let column = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((column, row))
}

/// Sheet ran out of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOverflow {
    pub key: String,
}

/// Key → column index assignment for one sheet, in first-seen order.
///
/// `name` and `filename` are always columns 0 and 1. Keys are expected to be
/// folded already (see [`crate::dat::parse_objects`]); the set lowercases
/// again so direct callers merge `Name`/`name` as well.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    keys: Vec<String>,
    lookup: HashMap<String, u16>,
    capacity: usize,
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::with_capacity(N_NCOLS_MAX)
    }

    /// Column set holding at most `capacity` columns (reserved ones included).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut set = Self {
            keys: Vec::new(),
            lookup: HashMap::new(),
            capacity: capacity.clamp(RESERVED_COLUMNS.len(), N_NCOLS_MAX),
        };
        for key in RESERVED_COLUMNS {
            let idx = set.keys.len() as u16;
            set.keys.push(key.to_string());
            set.lookup.insert(key.to_string(), idx);
        }
        set
    }

    /// Column of `key`, assigning the next index when unseen.
    pub fn assign(&mut self, key: &str) -> Result<u16, ColumnOverflow> {
        let folded = fold_key(key);
        if let Some(&idx) = self.lookup.get(folded.as_str()) {
            return Ok(idx);
        }
        if self.keys.len() >= self.capacity {
            return Err(ColumnOverflow { key: folded });
        }
        let idx = self.keys.len() as u16;
        self.keys.push(folded.clone());
        self.lookup.insert(folded, idx);
        Ok(idx)
    }

    pub fn get(&self, key: &str) -> Option<u16> {
        self.lookup.get(fold_key(key).as_str()).copied()
    }

    /// Keys in column order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

fn fold_key(key: &str) -> String {
    key.to_lowercase()
}
