//! Reference table (spreadsheet rows)
//!
//! Row 0 is the header. Columns are fixed by position: D holds the company
//! name used as the join key, E the domain and F the tax code.

use serde::{Deserialize, Serialize};

/// Column D: company name
pub const NAME_COL: usize = 3;
/// Column E: domain
pub const DOMAIN_COL: usize = 4;
/// Column F: tax code
pub const TAX_COL: usize = 5;
/// Every row is padded to at least this many cells
pub const MIN_ROW_WIDTH: usize = 6;

/// Lowercase + trim, the join-key normalization
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 0-based column index to spreadsheet letters (0 → "A", 27 → "AB")
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Cell reference with a 1-based row number, e.g. `cell_ref(4, 1)` → "E2"
pub fn cell_ref(col: usize, row_index: usize) -> String {
    format!("{}{}", column_letter(col), row_index + 1)
}

pub(crate) fn pad_row(row: &mut Vec<String>, width: usize) {
    if row.len() < width {
        row.resize(width, String::new());
    }
}

fn cell_is_blank(cell: Option<&String>) -> bool {
    cell.map_or(true, |c| c.trim().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTable {
    rows: Vec<Vec<String>>,
}

impl ReferenceTable {
    /// Build a table, padding every row to `MIN_ROW_WIDTH`
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                pad_row(&mut row, MIN_ROW_WIDTH);
                row
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    pub fn header_width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut Vec<String>> {
        self.rows.get_mut(index)
    }

    pub(crate) fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Raw join-key cell of a row ("" when missing)
    pub fn name_at(&self, index: usize) -> &str {
        self.rows
            .get(index)
            .and_then(|r| r.get(NAME_COL))
            .map_or("", |s| s.as_str())
    }

    pub fn domain_at(&self, index: usize) -> &str {
        self.rows
            .get(index)
            .and_then(|r| r.get(DOMAIN_COL))
            .map_or("", |s| s.as_str())
    }

    pub fn tax_code_at(&self, index: usize) -> &str {
        self.rows
            .get(index)
            .and_then(|r| r.get(TAX_COL))
            .map_or("", |s| s.as_str())
    }

    /// Both domain and tax code present
    pub fn is_row_complete(&self, index: usize) -> bool {
        match self.rows.get(index) {
            Some(row) => !cell_is_blank(row.get(DOMAIN_COL)) && !cell_is_blank(row.get(TAX_COL)),
            None => false,
        }
    }

    /// Cell is missing or whitespace-only
    pub fn is_cell_blank(&self, row: usize, col: usize) -> bool {
        cell_is_blank(self.rows.get(row).and_then(|r| r.get(col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(4), "E");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(cell_ref(DOMAIN_COL, 4), "E5");
    }

    #[test]
    fn test_rows_are_padded() {
        let table = ReferenceTable::new(vec![vec!["h".into()], vec![]]);
        assert!(table.rows().iter().all(|r| r.len() == MIN_ROW_WIDTH));
        assert_eq!(table.name_at(1), "");
        assert_eq!(table.name_at(99), "");
    }

    #[test]
    fn test_row_complete_ignores_whitespace() {
        let table = ReferenceTable::new(vec![
            vec!["h".into()],
            vec!["".into(), "".into(), "".into(), "Acme".into(), "@acme.vn".into(), "  ".into()],
            vec!["".into(), "".into(), "".into(), "Beta".into(), "@beta.vn".into(), "01".into()],
        ]);
        assert!(!table.is_row_complete(1));
        assert!(table.is_row_complete(2));
        assert!(table.is_cell_blank(1, TAX_COL));
    }
}
