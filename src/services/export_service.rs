//! Export - capability layer
//!
//! Builds the export grid from a result set and writes it as XLSX or CSV,
//! plus the JSON bulk-copy payload consumed by the sheet-side import helper.

use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ExportError;
use crate::models::item::ItemStatus;
use crate::models::result_set::ResultSet;

/// Header of the synthesized three-column grid
pub const RESULT_HEADERS: [&str; 3] = ["Tên công ty", "Domain", "Mã số thuế"];
/// Cell text for items whose lookup failed
pub const ERROR_CELL: &str = "Lỗi";
/// Worksheet name in XLSX exports
pub const SHEET_NAME: &str = "KetQua";
pub const TABLE_EXPORT_NAME: &str = "BizSearch_Updated_Sheet.xlsx";
pub const RESULTS_EXPORT_NAME: &str = "BizSearch_Results.xlsx";

/// One entry of the bulk-copy payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCopyEntry {
    pub name: String,
    pub domain: String,
    pub tax: String,
}

/// Rows to export
///
/// The reconciled table when one is loaded; otherwise a header plus one
/// `[name, domain, tax code]` row per item, with "Lỗi" in place of missing
/// values for failed items.
pub fn export_grid(results: &ResultSet) -> Vec<Vec<String>> {
    if let Some(table) = results.table() {
        return table.rows().to_vec();
    }

    let mut grid = Vec::with_capacity(results.len() + 1);
    grid.push(RESULT_HEADERS.iter().map(|h| h.to_string()).collect());
    for item in results.items() {
        let fallback = if item.status == ItemStatus::Error {
            ERROR_CELL
        } else {
            ""
        };
        let pick = |value: Option<&str>| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        let data = item.data.as_ref();
        grid.push(vec![
            item.input_name.clone(),
            pick(data.map(|d| d.domain.as_str())),
            pick(data.map(|d| d.tax_code.as_str())),
        ]);
    }
    grid
}

/// Default file name for an export of `results`
pub fn default_export_name(results: &ResultSet) -> &'static str {
    if results.table().is_some() {
        TABLE_EXPORT_NAME
    } else {
        RESULTS_EXPORT_NAME
    }
}

pub fn write_xlsx(grid: &[Vec<String>], path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name(SHEET_NAME)?;

    for (row, cells) in grid.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(row as u32, col as u16, value)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub fn write_csv(grid: &[Vec<String>], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the export grid, picking the format from the file extension
///
/// # Returns
/// Rows written, header included.
///
/// # Errors
/// `UnsupportedFormat` for anything but `.xlsx` and `.csv`, or the writer's error.
pub fn export_to_path(results: &ResultSet, path: &Path) -> Result<usize, ExportError> {
    let grid = export_grid(results);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => write_xlsx(&grid, path)?,
        "csv" => write_csv(&grid, path)?,
        other => return Err(ExportError::UnsupportedFormat(other.to_string())),
    }

    info!("✓ Exported {} rows to {}", grid.len(), path.display());
    Ok(grid.len())
}

/// Success and skipped items that carry data
pub fn bulk_copy_payload(results: &ResultSet) -> Vec<BulkCopyEntry> {
    results
        .items()
        .iter()
        .filter(|item| matches!(item.status, ItemStatus::Success | ItemStatus::Skipped))
        .filter_map(|item| {
            item.data.as_ref().map(|data| BulkCopyEntry {
                name: item.input_name.clone(),
                domain: data.domain.clone(),
                tax: data.tax_code.clone(),
            })
        })
        .collect()
}

/// Compact JSON, as pasted into the sheet helper
pub fn bulk_copy_json(results: &ResultSet) -> Result<String, ExportError> {
    encode_bulk_copy(&bulk_copy_payload(results))
}

fn encode_bulk_copy(payload: &[BulkCopyEntry]) -> Result<String, ExportError> {
    Ok(serde_json::to_string(payload)?)
}

/// Write the bulk-copy JSON to a file; returns the entry count
pub fn write_bulk_copy(results: &ResultSet, path: &Path) -> Result<usize, ExportError> {
    let payload = bulk_copy_payload(results);
    std::fs::write(path, encode_bulk_copy(&payload)?)?;
    info!("✓ Wrote {} entries to {}", payload.len(), path.display());
    Ok(payload.len())
}
