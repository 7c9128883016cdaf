//! Workbook package: zip container plus SpreadsheetML parts.

pub mod escape;
pub mod package;
pub mod parts;
pub mod reader;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::DatSheetResult;
use crate::types::{CellValue, Workbook};

pub use package::{PackageReader, PackageWriter};
pub use reader::read_workbook;

/// Write `workbook` as a package at `path`.
///
/// Worksheets go first, followed by the relationships, the shared-string
/// table, content types, the workbook part and the document properties.
pub fn write_workbook(
    path: &Path,
    workbook: &Workbook,
    title: &str,
    created: DateTime<Utc>,
) -> DatSheetResult<()> {
    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    if names.is_empty() {
        tracing::warn!(path = %path.display(), "workbook has no sheets");
    }

    let mut package = PackageWriter::create(path)?;
    for (idx, sheet) in workbook.sheets.iter().enumerate() {
        let xml = parts::worksheet_xml(sheet, idx == 0)?;
        package.add_entry(&parts::worksheet_entry(idx + 1), &xml)?;
    }

    let shared_cells = workbook
        .sheets
        .iter()
        .flat_map(|s| s.rows.iter())
        .flat_map(|r| r.cells.values())
        .filter(|c| matches!(c, CellValue::Shared(_)))
        .count();

    package.add_entry(parts::ENTRY_ROOT_RELS, &parts::root_rels_xml()?)?;
    package.add_entry(
        parts::ENTRY_SHARED_STRINGS,
        &parts::shared_strings_xml(&workbook.strings, shared_cells)?,
    )?;
    package.add_entry(
        parts::ENTRY_WORKBOOK_RELS,
        &parts::workbook_rels_xml(names.len())?,
    )?;
    package.add_entry(
        parts::ENTRY_CONTENT_TYPES,
        &parts::content_types_xml(names.len())?,
    )?;
    package.add_entry(parts::ENTRY_WORKBOOK, &parts::workbook_xml(&names)?)?;
    package.add_entry(parts::ENTRY_APP, &parts::app_xml(&names)?)?;
    package.add_entry(parts::ENTRY_CORE, &parts::core_xml(title, created)?)?;
    package.finish()
}
