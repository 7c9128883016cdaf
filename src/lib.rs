//! datSheet - object-description files ⇄ spreadsheet workbook
//!
//! Converts a directory tree of `key=value` object files into one xlsx
//! workbook (one sheet per directory, one row per object, one column per
//! key) and writes such a workbook back to object files.
//!
//! # Features
//!
//! - Case-folded keys, digit-only values stored as numbers, comments kept
//! - Shared-string table with stable first-seen indices
//! - Bijective column letters (A..Z, AA..XFD)
//! - Sheet names from relative paths joined with `;` (`;` is the root)
//! - Consecutive rows with the same filename written to one file with `---`
//! - Recoverable problems reported as coded warnings, never aborting the run
//!
//! # Example
//!
//! ```no_run
//! use datsheet::config::ImportOptions;
//! use datsheet::{Exporter, Importer};
//!
//! let report = Exporter::new("pak128").export("pak128.xlsx")?;
//! println!("{report}");
//!
//! let importer = Importer::new(ImportOptions {
//!     output_dir: "pak128-edited".into(),
//!     ..Default::default()
//! });
//! let report = importer.import("pak128.xlsx")?;
//! println!("{} warnings", report.warning_count());
//! # Ok::<(), datsheet::error::DatSheetError>(())
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod dat;
pub mod diagnostics;
pub mod error;
pub mod sheet;
pub mod tree;
pub mod types;
pub mod xlsx;

// Re-export commonly used types
pub use convert::{Exporter, Importer};
pub use diagnostics::{Report, Warning, WarningCode};
pub use error::{DatSheetError, DatSheetResult};
pub use types::{DatObject, Parameter, Sheet, Workbook};
