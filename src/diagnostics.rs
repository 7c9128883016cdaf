//! Recoverable problems and per-run counters.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Stable, grep-able code of a recoverable problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningCode {
    /// Source bytes could not be decoded; the file was skipped.
    Encoding,
    /// Source file could not be read; the file was skipped.
    FileRead,
    /// Line with an empty key was ignored.
    SkippedLine,
    /// Parameter with an empty value was ignored.
    NullValue,
    /// Duplicate key inside one object; the later value won.
    Overwritten,
    /// Sheet ran out of columns or rows; the parameter or object was dropped.
    ColumnOverflow,
    /// Directory name cannot be encoded as a sheet name; subtree skipped.
    UnmappableDirectory,
    /// Sheet name will likely be rejected by spreadsheet applications.
    SheetNameLimits,
    /// Sub-directory could not be listed; subtree skipped.
    UnreadableDirectory,
    /// Cell declares a type the importer does not handle.
    UnsupportedType(String),
    /// Row resolved to no filename; nothing written.
    NoName,
    /// Output file could not be created.
    OutputOpen,
    /// Writing to the output file failed.
    OutputWrite,
    /// Sheet name does not map to a safe output directory.
    UnmappableSheet,
}

impl WarningCode {
    pub fn as_str(&self) -> String {
        match self {
            Self::Encoding => "UE0".to_string(),
            Self::FileRead => "FR0".to_string(),
            Self::SkippedLine => "SL0".to_string(),
            Self::NullValue => "NV0".to_string(),
            Self::Overwritten => "OV0".to_string(),
            Self::ColumnOverflow => "CO0".to_string(),
            Self::UnmappableDirectory => "SN0".to_string(),
            Self::SheetNameLimits => "SN1".to_string(),
            Self::UnreadableDirectory => "URD0".to_string(),
            Self::UnsupportedType(t) => format!("DATAT{t}"),
            Self::NoName => "FDATOUT1".to_string(),
            Self::OutputOpen => "FDATOUT2".to_string(),
            Self::OutputWrite => "FDATOUT3".to_string(),
            Self::UnmappableSheet => "SHN0".to_string(),
        }
    }
}

impl Serialize for WarningCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// One recoverable problem, rendered as `CODE location: message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: WarningCode,
    /// File path, `sheet(cell)` or `sheet(row)` the problem belongs to.
    pub location: String,
    pub message: String,
}

impl Warning {
    pub fn new(code: WarningCode, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.location, self.message)
    }
}

/// Counters and warnings of one conversion run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Report {
    /// Sheets written (export) or read (import).
    pub sheets: u64,
    /// Objects turned into rows (export) or rows turned into objects (import).
    pub objects: u64,
    /// Object files read.
    pub files_read: u64,
    /// Object files created (appends to an open file do not count).
    pub files_written: u64,
    pub warnings: Vec<Warning>,
}

impl Report {
    /// Record a warning and emit it on the diagnostic stream.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(code = %warning.code, "{warning}");
        self.warnings.push(warning);
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of warnings carrying `code`.
    pub fn count_code(&self, code: &WarningCode) -> usize {
        self.warnings.iter().filter(|w| &w.code == code).count()
    }

    /// Fold another run's report into this one.
    pub fn merge(&mut self, other: Report) {
        self.sheets += other.sheets;
        self.objects += other.objects;
        self.files_read += other.files_read;
        self.files_written += other.files_written;
        self.warnings.extend(other.warnings);
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("sheets".to_string(), self.sheets);
        dict_counts.insert("objects".to_string(), self.objects);
        dict_counts.insert("files_read".to_string(), self.files_read);
        dict_counts.insert("files_written".to_string(), self.files_written);
        dict_counts.insert("warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheets={} objects={} files_read={} files_written={} warnings={}",
            self.sheets,
            self.objects,
            self.files_read,
            self.files_written,
            self.warning_count()
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[DATSHEET]"))
    }
}
