//! The two conversion directions: directory tree → workbook and back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::{ExportOptions, ImportOptions, APP_NAME};
use crate::diagnostics::{Report, Warning, WarningCode};
use crate::error::DatSheetResult;
use crate::sheet::{RowExpander, SheetBuilder};
use crate::tree::{dir_for_sheet, SheetSource, TreeMapper};
use crate::types::Workbook;
use crate::xlsx::{read_workbook, write_workbook};

/// Directory tree of object files → workbook.
pub struct Exporter {
    root: PathBuf,
    options: ExportOptions,
}

impl Exporter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_options(root, ExportOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(root: P, options: ExportOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    /// Build the in-memory workbook without writing it.
    pub fn build(&self, report: &mut Report) -> DatSheetResult<Workbook> {
        let sources = TreeMapper::new(&self.root, &self.options.extension).walk(report)?;

        let mut workbook = Workbook::new();
        for source in sources {
            workbook = self.add_sheet(workbook, source, report);
        }
        Ok(workbook)
    }

    fn add_sheet(&self, mut workbook: Workbook, source: SheetSource, report: &mut Report) -> Workbook {
        let mut builder = SheetBuilder::new(source.sheet_name);
        for file in &source.files {
            let bytes = match fs::read(file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    report.warn(Warning::new(
                        WarningCode::FileRead,
                        file.display().to_string(),
                        format!("File skipped: {e}"),
                    ));
                    continue;
                }
            };
            report.files_read += 1;
            builder.add_source(file, &bytes, &mut workbook.strings, report);
        }
        tracing::info!(sheet = %builder.name(), rows = builder.row_count(), "sheet built");
        let sheet = builder.finish(&mut workbook.strings);
        workbook.sheets.push(sheet);
        report.sheets += 1;
        workbook
    }

    /// Document title: the configured one, else the root directory's name.
    pub fn title(&self) -> String {
        if let Some(title) = &self.options.title {
            return title.clone();
        }
        fs::canonicalize(&self.root)
            .ok()
            .as_deref()
            .unwrap_or(self.root.as_path())
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| APP_NAME.to_string())
    }

    /// Convert the tree and write the workbook to `output`.
    pub fn export<P: AsRef<Path>>(&self, output: P) -> DatSheetResult<Report> {
        let mut report = Report::default();
        let workbook = self.build(&mut report)?;
        write_workbook(output.as_ref(), &workbook, &self.title(), Utc::now())?;
        tracing::info!(path = %output.as_ref().display(), "{report}");
        Ok(report)
    }
}

/// Workbook → directory tree of object files.
pub struct Importer {
    options: ImportOptions,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    /// Read `path` and write its sheets under the output directory.
    pub fn import<P: AsRef<Path>>(&self, path: P) -> DatSheetResult<Report> {
        let mut report = Report::default();
        let workbook = read_workbook(path.as_ref())?;
        self.expand(&workbook, &mut report);
        tracing::info!(path = %path.as_ref().display(), "{report}");
        Ok(report)
    }

    /// Write every sheet of an in-memory workbook.
    pub fn expand(&self, workbook: &Workbook, report: &mut Report) {
        for sheet in &workbook.sheets {
            let Some(relative) = dir_for_sheet(&sheet.name) else {
                report.warn(Warning::new(
                    WarningCode::UnmappableSheet,
                    sheet.name.clone(),
                    "Sheet name does not map to a directory below the output root; sheet skipped.",
                ));
                continue;
            };
            let dir = self.options.output_dir.join(relative);
            RowExpander::new(sheet.name.clone(), dir, &self.options.extension).expand(
                sheet,
                &workbook.strings,
                report,
            );
            report.sheets += 1;
        }
    }
}
