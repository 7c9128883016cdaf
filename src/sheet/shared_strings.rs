//! Deduplicated, append-only string table referenced by index.

use std::collections::HashMap;

/// Shared-string pool. Indices are assigned in first-seen order and never
/// change once handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStringPool {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl SharedStringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from a table read back from a workbook. Duplicates in
    /// the table keep their positions; lookups resolve to the first one.
    pub fn from_strings(strings: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(strings.len());
        for (idx, s) in strings.iter().enumerate() {
            lookup.entry(s.clone()).or_insert(idx as u32);
        }
        Self { strings, lookup }
    }

    /// Index of `value`, appending it when unseen.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&idx) = self.lookup.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.lookup.insert(value.to_string(), idx);
        idx
    }

    pub fn resolve(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}
