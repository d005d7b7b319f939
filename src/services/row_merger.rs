//! Row merging - writes a lookup result into the reference table
//!
//! Matched rows only get their empty cells filled; existing values are
//! never overwritten. Unmatched companies fill the next blank slot or are
//! appended as a new row.

use std::fmt;

use crate::models::company::CompanyData;
use crate::models::table::{
    cell_ref, pad_row, ReferenceTable, DOMAIN_COL, MIN_ROW_WIDTH, NAME_COL, TAX_COL,
};
use crate::services::row_matcher::{find_insertion_point, find_match};

/// What a merge did to the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    /// Cells filled on a matched row, e.g. `["E5", "F5"]`
    Updated(Vec<String>),
    /// Matched row already had both cells
    AlreadyComplete,
    /// Blank slot filled, 1-based row number
    Filled(usize),
    /// New row appended, 1-based row number (= new row count)
    Added(usize),
}

impl fmt::Display for RowChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowChange::Updated(cells) => write!(f, "{}", cells.join(", ")),
            RowChange::AlreadyComplete => write!(f, "data already complete"),
            RowChange::Filled(row) => write!(f, "filled row {}", row),
            RowChange::Added(row) => write!(f, "added row {}", row),
        }
    }
}

/// Apply `result` to `table`
///
/// # Arguments
/// * `matched` - row found by `find_match`; `None` places the company at
///   `find_insertion_point`
/// * `name` - input name, written to column D of a new row
/// * `result` - lookup result; only empty domain and tax code cells are filled
///
/// # Returns
/// What changed, for the item's update history.
pub fn merge(
    table: &mut ReferenceTable,
    matched: Option<usize>,
    name: &str,
    result: &CompanyData,
) -> RowChange {
    if let Some(row_index) = matched {
        if let Some(row) = table.row_mut(row_index) {
            pad_row(row, MIN_ROW_WIDTH);
            let mut updates = Vec::new();
            if row[DOMAIN_COL].trim().is_empty() {
                row[DOMAIN_COL] = result.domain.clone();
                updates.push(cell_ref(DOMAIN_COL, row_index));
            }
            if row[TAX_COL].trim().is_empty() {
                row[TAX_COL] = result.tax_code.clone();
                updates.push(cell_ref(TAX_COL, row_index));
            }
            return if updates.is_empty() {
                RowChange::AlreadyComplete
            } else {
                RowChange::Updated(updates)
            };
        }
    }

    let target = find_insertion_point(table);
    if let Some(row) = table.row_mut(target) {
        pad_row(row, MIN_ROW_WIDTH);
        write_company(row, name, result);
        return RowChange::Filled(target + 1);
    }

    let width = MIN_ROW_WIDTH.max(table.header_width());
    let mut new_row = vec![String::new(); width];
    write_company(&mut new_row, name, result);
    table.push_row(new_row);
    RowChange::Added(table.len())
}

/// `find_match` followed by `merge`
pub fn reconcile(table: &mut ReferenceTable, name: &str, result: &CompanyData) -> RowChange {
    let matched = find_match(table, name);
    merge(table, matched, name, result)
}

fn write_company(row: &mut [String], name: &str, result: &CompanyData) {
    row[NAME_COL] = name.to_string();
    row[DOMAIN_COL] = result.domain.clone();
    row[TAX_COL] = result.tax_code.clone();
}
