//! Row matching - decides which table row a company name belongs to
//!
//! Matching is on the normalized join key (column D, lowercase + trim).
//! When several rows share a key the first one wins, in every code path.

use std::collections::HashMap;

use crate::models::table::{normalize_name, ReferenceTable};

/// First data row (index >= 1) whose join key equals `name`
pub fn find_match(table: &ReferenceTable, name: &str) -> Option<usize> {
    let target = normalize_name(name);
    (1..table.len()).find(|&i| normalize_name(table.name_at(i)) == target)
}

/// Where an unmatched company goes
///
/// One past the last row (header included) with a non-empty join key, or 1
/// when no row has one. A result inside the table is a blank slot to fill;
/// `table.len()` or beyond means append.
pub fn find_insertion_point(table: &ReferenceTable) -> usize {
    (0..table.len())
        .rev()
        .find(|&i| !table.name_at(i).trim().is_empty())
        .map_or(1, |i| i + 1)
}

/// Normalized name → first row index, for bulk lookups
#[derive(Debug, Default, Clone)]
pub struct MatchIndex {
    rows: HashMap<String, usize>,
}

impl MatchIndex {
    pub fn build(table: &ReferenceTable) -> Self {
        let mut rows = HashMap::new();
        for i in 1..table.len() {
            let key = normalize_name(table.name_at(i));
            if key.is_empty() {
                continue;
            }
            rows.entry(key).or_insert(i);
        }
        Self { rows }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.rows.get(&normalize_name(name)).copied()
    }
}
