use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::error::ParseError;
use crate::models::table::{ReferenceTable, NAME_COL};

/// Parse comma-separated text into rows of trimmed cells
///
/// Quote aware (`""` escapes a quote), rows may differ in width, and rows
/// with no non-blank cell are dropped.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Trim, drop blanks, de-duplicate keeping first occurrence
pub fn unique_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Company names from column D of the data rows
pub fn names_from_rows(rows: &[Vec<String>]) -> Vec<String> {
    unique_names(
        rows.iter()
            .skip(1)
            .filter_map(|row| row.get(NAME_COL).map(|s| s.as_str())),
    )
}

/// One company name per line
///
/// Anything after a tab is ignored, so a failure file (`name<TAB>error`)
/// reads back as a plain list of names.
pub async fn load_names_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read names file: {}", path.display()))?;
    Ok(unique_names(
        content
            .lines()
            .map(|line| line.split('\t').next().unwrap_or(line)),
    ))
}

/// Reference table from a local CSV file
///
/// Unlike a fetched sheet, blank rows inside the table are kept so they can
/// be filled by reconciliation.
pub async fn load_table_csv(path: &Path) -> Result<ReferenceTable> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read table file: {}", path.display()))?;
    let rows = read_csv_keep_blank(&content)
        .with_context(|| format!("failed to parse table file: {}", path.display()))?;
    if rows.is_empty() {
        return Err(ParseError::EmptySheet.into());
    }
    tracing::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(ReferenceTable::new(rows))
}

/// Like `parse_csv` but blank rows inside the table survive
///
/// Empty lines before the header and blank rows at the end are dropped.
/// The reader skips empty lines, so each record's start line is compared
/// with where the previous record ended and the gap is put back as blank
/// rows. Row indices then match the line numbers of the file.
fn read_csv_keep_blank(text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut next_line: Option<u64> = None;
    for record in reader.records() {
        let record = record?;
        let start = record.position().map_or(0, |p| p.line());
        if let Some(expected) = next_line {
            let width = rows.first().map_or(0, |header| header.len());
            for _ in expected..start {
                rows.push(vec![String::new(); width]);
            }
        }
        // quoted cells may span lines
        let spanned: u64 = record
            .iter()
            .map(|cell| cell.matches('\n').count() as u64)
            .sum();
        next_line = Some(start + spanned + 1);
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    while rows
        .last()
        .map_or(false, |row| row.iter().all(|cell| cell.is_empty()))
    {
        rows.pop();
    }
    Ok(rows)
}
