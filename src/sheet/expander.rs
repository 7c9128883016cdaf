//! One sheet → object files (import direction).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{COLUMN_FILENAME, COLUMN_NAME, COMMENT_MARKER, OBJECT_SEPARATOR};
use crate::dat::render_object;
use crate::diagnostics::{Report, Warning, WarningCode};
use crate::sheet::{cell_reference, SharedStringPool};
use crate::types::{CellValue, DatObject, Parameter, Row, Sheet, UnsupportedCell};

/// A data row turned back into an object plus the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRow {
    pub number: u32,
    /// `filename` cell, else `name` cell, else nothing.
    pub filename: Option<String>,
    pub object: DatObject,
}

/// Parameter key of every column, from row 1. Columns without a usable
/// header are `None` and their cells are ignored.
pub fn header_keys(sheet: &Sheet, pool: &SharedStringPool) -> Vec<Option<String>> {
    let Some(header) = sheet.header() else {
        return Vec::new();
    };
    let width = header.cells.keys().next_back().map_or(0, |c| *c as usize + 1);
    let mut keys = vec![None; width];
    for (column, cell) in &header.cells {
        let key = resolve_cell(cell, pool).ok().map(|k| fold_header(&k));
        keys[*column as usize] = key.filter(|k| !k.is_empty());
    }
    keys
}

fn fold_header(key: &str) -> String {
    let key = key.trim();
    if key.starts_with(COMMENT_MARKER) {
        key.to_string()
    } else {
        key.to_lowercase()
    }
}

/// Text of a cell. `Err` carries why the cell cannot be used.
pub fn resolve_cell(cell: &CellValue, pool: &SharedStringPool) -> Result<String, String> {
    match cell {
        CellValue::Number(digits) => Ok(digits.clone()),
        CellValue::Shared(idx) => pool
            .resolve(*idx)
            .map(str::to_string)
            .ok_or_else(|| format!("shared string {idx} does not exist")),
        CellValue::Boolean(b) => Ok(b.to_string()),
        CellValue::Inline(text) => Ok(text.clone()),
    }
}

/// Rebuild the object of one data row, in column order.
pub fn expand_row(
    row: &Row,
    keys: &[Option<String>],
    pool: &SharedStringPool,
    sheet_name: &str,
    report: &mut Report,
) -> ExpandedRow {
    let mut filename: Option<String> = None;
    let mut has_explicit_filename = false;
    let mut object = DatObject::new();

    for (column, cell) in &row.cells {
        let location = format!(
            "{sheet_name}({})",
            cell_reference(*column as u32, row.number)
        );
        let Some(key) = keys.get(*column as usize).and_then(Option::as_ref) else {
            tracing::debug!(%location, "cell outside any named column ignored");
            continue;
        };
        let value = match resolve_cell(cell, pool) {
            Ok(value) => value.trim().to_string(),
            Err(reason) => {
                report.warn(Warning::new(
                    WarningCode::UnsupportedType("s".to_string()),
                    location,
                    format!("Cell ignored: {reason}."),
                ));
                continue;
            }
        };
        if value.is_empty() {
            continue;
        }

        if key == COLUMN_FILENAME {
            filename = Some(value);
            has_explicit_filename = true;
            continue;
        }
        if key == COLUMN_NAME && !has_explicit_filename && filename.is_none() {
            filename = Some(value.clone());
        }
        if object.set(Parameter::new(key.as_str(), value)) {
            report.warn(Warning::new(
                WarningCode::Overwritten,
                location,
                format!("Parameter '{key}' overwritten."),
            ));
        }
    }

    ExpandedRow {
        number: row.number,
        filename,
        object,
    }
}

enum OutputState {
    Idle,
    Writing {
        filename: String,
        out: BufWriter<File>,
    },
}

/// Writes the rows of one sheet into a directory.
///
/// Consecutive rows with the same filename share one file, separated by
/// `---` lines. A different filename closes the current file and truncates
/// the next one. Rows without a filename are dropped and leave the current
/// file open.
pub struct RowExpander {
    sheet_name: String,
    dir: PathBuf,
    extension: String,
    state: OutputState,
}

impl RowExpander {
    pub fn new(sheet_name: impl Into<String>, dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            dir: dir.into(),
            extension: extension.to_string(),
            state: OutputState::Idle,
        }
    }

    /// Expand every data row of `sheet` and close the last file.
    pub fn expand(mut self, sheet: &Sheet, pool: &SharedStringPool, report: &mut Report) {
        let keys = header_keys(sheet, pool);

        let mut unsupported: BTreeMap<u32, Vec<&UnsupportedCell>> = BTreeMap::new();
        for cell in &sheet.unsupported {
            unsupported.entry(cell.row).or_default().push(cell);
        }

        for row in sheet.data_rows() {
            for cell in unsupported.remove(&row.number).unwrap_or_default() {
                self.warn_unsupported(cell, report);
            }
            let expanded = expand_row(row, &keys, pool, &self.sheet_name, report);
            self.emit(expanded, report);
        }
        for cell in unsupported.into_values().flatten() {
            self.warn_unsupported(cell, report);
        }

        self.close(report);
    }

    fn warn_unsupported(&self, cell: &UnsupportedCell, report: &mut Report) {
        report.warn(Warning::new(
            WarningCode::UnsupportedType(cell.declared_type.clone()),
            format!(
                "{}({})",
                self.sheet_name,
                cell_reference(cell.column as u32, cell.row)
            ),
            "Data type is not one of Number, Boolean, String, InlineString; cell ignored.",
        ));
    }

    /// Route one expanded row through the output state machine.
    pub fn emit(&mut self, row: ExpandedRow, report: &mut Report) {
        let location = format!("{}({})", self.sheet_name, row.number);
        let Some(filename) = row.filename else {
            report.warn(Warning::new(
                WarningCode::NoName,
                location,
                format!(
                    "Object at row {} has no 'name'; no file was generated.",
                    row.number
                ),
            ));
            return;
        };

        let text = render_object(&row.object);
        let appending =
            matches!(&self.state, OutputState::Writing { filename: current, .. } if *current == filename);

        if !appending {
            self.close(report);
            match self.open(&filename) {
                Ok(out) => {
                    report.files_written += 1;
                    self.state = OutputState::Writing {
                        filename: filename.clone(),
                        out,
                    };
                }
                Err(reason) => {
                    report.warn(Warning::new(
                        WarningCode::OutputOpen,
                        location,
                        format!("Could not create file for object '{filename}': {reason}"),
                    ));
                    return;
                }
            }
        }

        let OutputState::Writing { out, .. } = &mut self.state else {
            return;
        };
        let chunk = if appending {
            format!("{OBJECT_SEPARATOR}\n{text}")
        } else {
            text
        };
        match out.write_all(chunk.as_bytes()) {
            Ok(()) => report.objects += 1,
            Err(e) => report.warn(Warning::new(
                WarningCode::OutputWrite,
                location,
                format!("Error while writing object '{filename}', file may be corrupt: {e}"),
            )),
        }
    }

    /// Close the current file, if any.
    pub fn close(&mut self, report: &mut Report) {
        if let OutputState::Writing { filename, mut out } =
            std::mem::replace(&mut self.state, OutputState::Idle)
        {
            if let Err(e) = out.flush() {
                report.warn(Warning::new(
                    WarningCode::OutputWrite,
                    format!("{}({filename})", self.sheet_name),
                    format!("Error while finishing file, it may be corrupt: {e}"),
                ));
            }
        }
    }

    /// Target path of `filename` inside this sheet's directory.
    pub fn output_path(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_file_name(filename) {
            return None;
        }
        let file = if self.extension.is_empty() {
            filename.to_string()
        } else {
            format!("{filename}.{}", self.extension)
        };
        Some(self.dir.join(file))
    }

    fn open(&self, filename: &str) -> Result<BufWriter<File>, String> {
        let path = self
            .output_path(filename)
            .ok_or_else(|| "name would leave the sheet directory".to_string())?;
        fs::create_dir_all(&self.dir).map_err(|e| format!("{}: {e}", self.dir.display()))?;
        let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "writing");
        Ok(BufWriter::new(file))
    }
}

/// Single normal path component, no separators of either platform.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).components().count() == 1
}
