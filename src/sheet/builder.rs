//! Directory of object files → one sheet (export direction).

use std::path::Path;

use crate::config::{COLUMN_FILENAME, N_NROWS_MAX};
use crate::dat::{decode_source, parse_objects};
use crate::diagnostics::{Report, Warning, WarningCode};
use crate::sheet::{ColumnSet, SharedStringPool};
use crate::types::{CellValue, DatObject, ParamKind, Row, Sheet};

/// Accumulates the objects of one directory into rows.
///
/// Rows start at 2; row 1 (the column keys) is only synthesized by
/// [`SheetBuilder::finish`], once every column is known.
pub struct SheetBuilder {
    name: String,
    columns: ColumnSet,
    rows: Vec<Row>,
    next_row: u32,
}

impl SheetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_columns(name, ColumnSet::new())
    }

    /// Builder with a custom column set (e.g. a reduced capacity).
    pub fn with_columns(name: impl Into<String>, columns: ColumnSet) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            next_row: 2,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of data rows so far.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Decode and parse one source file, adding a row per object.
    ///
    /// Undecodable files are skipped with a `UE0` warning. Rows get the
    /// file's stem as their filename unless the object names its own.
    /// Returns the number of rows added.
    pub fn add_source(
        &mut self,
        path: &Path,
        bytes: &[u8],
        pool: &mut SharedStringPool,
        report: &mut Report,
    ) -> usize {
        let location = path.display().to_string();
        let text = match decode_source(bytes) {
            Ok(text) => text,
            Err(e) => {
                report.warn(Warning::new(
                    WarningCode::Encoding,
                    location,
                    format!("File skipped: {e}"),
                ));
                return 0;
            }
        };

        let stem = path.file_stem().and_then(|s| s.to_str());
        let objects = parse_objects(&text, &location, report);
        tracing::debug!(file = %location, objects = objects.len(), "parsed");

        let mut added = 0;
        for object in &objects {
            if self.add_object(object, stem, pool, report) {
                added += 1;
            }
        }
        added
    }

    /// Write one object as the next row. Returns `false` when no row was
    /// added (sheet already full).
    pub fn add_object(
        &mut self,
        object: &DatObject,
        stem: Option<&str>,
        pool: &mut SharedStringPool,
        report: &mut Report,
    ) -> bool {
        if self.next_row > N_NROWS_MAX {
            report.warn(Warning::new(
                WarningCode::ColumnOverflow,
                self.name.clone(),
                format!("Sheet is full ({N_NROWS_MAX} rows); object dropped."),
            ));
            return false;
        }

        let mut row = Row::new(self.next_row);
        for param in &object.params {
            let column = match self.columns.assign(&param.key) {
                Ok(column) => column,
                Err(overflow) => {
                    report.warn(Warning::new(
                        WarningCode::ColumnOverflow,
                        format!("{}({})", self.name, row.number),
                        format!(
                            "No column left for parameter '{}'; value dropped.",
                            overflow.key
                        ),
                    ));
                    continue;
                }
            };
            let cell = match param.kind {
                ParamKind::Number => CellValue::Number(param.value.clone()),
                ParamKind::String | ParamKind::Comment => {
                    CellValue::Shared(pool.intern(&param.value))
                }
            };
            row.cells.insert(column, cell);
        }

        if let Some(stem) = stem.filter(|s| !s.is_empty()) {
            if object.get(COLUMN_FILENAME).is_none() {
                if let Some(column) = self.columns.get(COLUMN_FILENAME) {
                    row.cells.insert(column, CellValue::Shared(pool.intern(stem)));
                }
            }
        }

        self.rows.push(row);
        self.next_row += 1;
        report.objects += 1;
        true
    }

    /// Synthesize the header row and hand the sheet over.
    pub fn finish(self, pool: &mut SharedStringPool) -> Sheet {
        let keys = self.columns.into_keys();
        let mut header = Row::new(1);
        for (idx, key) in keys.iter().enumerate() {
            header
                .cells
                .insert(idx as u16, CellValue::Shared(pool.intern(key)));
        }

        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(header);
        rows.extend(self.rows);

        Sheet {
            name: self.name,
            columns: keys,
            rows,
            unsupported: Vec::new(),
        }
    }
}
