//! Constants of the object-file and workbook conventions, plus per-run options.

use std::path::PathBuf;

/// Column that names the object; doubles as the output filename on import.
pub const COLUMN_NAME: &str = "name";
/// Column that overrides the output filename on import.
pub const COLUMN_FILENAME: &str = "filename";
/// Columns seeded at indices 0 and 1 of every sheet.
pub const RESERVED_COLUMNS: [&str; 2] = [COLUMN_NAME, COLUMN_FILENAME];

/// Key of comment parameters.
pub const COMMENT_MARKER: &str = "#";
/// Line written between two objects sharing one file.
pub const OBJECT_SEPARATOR: &str = "---";

/// Replaces the path separator in sheet names.
pub const SHEET_PATH_JOIN: char = ';';
/// Sheet name of the conversion root itself.
pub const ROOT_SHEET_NAME: &str = ";";

/// Default extension of object files.
pub const DEFAULT_EXTENSION: &str = "dat";

/// Worksheet maximum column count.
pub const N_NCOLS_MAX: usize = 16_384;
/// Worksheet maximum row count.
pub const N_NROWS_MAX: u32 = 1_048_576;
/// Sheet name length accepted by common spreadsheet applications.
pub const N_LEN_SHEET_NAME_MAX: usize = 31;
/// Characters those applications refuse in sheet names.
pub const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// Application name written to the workbook properties.
pub const APP_NAME: &str = "datSheet";

/// Options for the directory tree → workbook direction.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Extension (without dot) of the files read as object files.
    pub extension: String,
    /// Document title; defaults to the root directory's name.
    pub title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            title: None,
        }
    }
}

/// Options for the workbook → directory tree direction.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Root under which sheet directories are recreated.
    pub output_dir: PathBuf,
    /// Extension (without dot) given to written object files.
    pub extension: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}
