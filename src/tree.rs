//! Directory paths ⇄ sheet names, and the ordered export walk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{N_LEN_SHEET_NAME_MAX, ROOT_SHEET_NAME, SHEET_NAME_ILLEGAL, SHEET_PATH_JOIN};
use crate::diagnostics::{Report, Warning, WarningCode};
use crate::error::{DatSheetError, DatSheetResult};

/// Sheet name of a directory relative to the conversion root.
///
/// Components are joined with `;`; the root itself is `;`. Returns `None`
/// when a component is not UTF-8, contains `;`, or is not a plain name,
/// since such a name could not be mapped back.
pub fn sheet_name_for(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str()?;
                if name.contains(SHEET_PATH_JOIN) {
                    return None;
                }
                parts.push(name);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return Some(ROOT_SHEET_NAME.to_string());
    }
    Some(parts.join(&SHEET_PATH_JOIN.to_string()))
}

/// Directory (relative to the output root) of a sheet name. `None` when a
/// component is empty, `.`/`..`, or holds a path separator.
pub fn dir_for_sheet(name: &str) -> Option<PathBuf> {
    if name == ROOT_SHEET_NAME {
        return Some(PathBuf::new());
    }
    let mut dir = PathBuf::new();
    for part in name.split(SHEET_PATH_JOIN) {
        if part.is_empty() || part == "." || part == ".." || part.contains(['/', '\\', '\0']) {
            return None;
        }
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => dir.push(part),
            _ => return None,
        }
    }
    Some(dir)
}

/// Why spreadsheet applications would refuse `name`, if they would.
pub fn sheet_name_problem(name: &str) -> Option<String> {
    let len = name.chars().count();
    if len > N_LEN_SHEET_NAME_MAX {
        return Some(format!(
            "{len} characters, more than {N_LEN_SHEET_NAME_MAX}"
        ));
    }
    if let Some(c) = name.chars().find(|c| SHEET_NAME_ILLEGAL.contains(c)) {
        return Some(format!("contains '{c}'"));
    }
    None
}

/// One directory that directly holds object files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    pub sheet_name: String,
    pub dir: PathBuf,
    /// Object files in name order.
    pub files: Vec<PathBuf>,
}

/// Pre-order walk of a directory tree collecting the directories that
/// become sheets.
pub struct TreeMapper {
    root: PathBuf,
    extension: String,
}

impl TreeMapper {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
        }
    }

    /// Sheets in traversal order. Entries are visited in name order and
    /// symlinked directories are not followed.
    ///
    /// An unreadable root is fatal; an unreadable sub-directory is a `URD0`
    /// warning and its subtree is skipped.
    pub fn walk(&self, report: &mut Report) -> DatSheetResult<Vec<SheetSource>> {
        let mut sources = Vec::new();
        self.visit(&self.root, Path::new(""), &mut sources, report)?;
        Ok(sources)
    }

    fn visit(
        &self,
        dir: &Path,
        relative: &Path,
        sources: &mut Vec<SheetSource>,
        report: &mut Report,
    ) -> DatSheetResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if relative.as_os_str().is_empty() => {
                return Err(DatSheetError::RootDirectory {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                report.warn(Warning::new(
                    WarningCode::UnreadableDirectory,
                    dir.display().to_string(),
                    format!("Directory skipped: {e}"),
                ));
                return Ok(());
            }
        };

        let mut entries: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    report.warn(Warning::new(
                        WarningCode::UnreadableDirectory,
                        dir.display().to_string(),
                        format!("Entry skipped: {e}"),
                    ));
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in entries {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() && self.is_object_file(&path) {
                files.push(path);
            }
        }

        if !files.is_empty() {
            // Unmappable names are caught before descending, so this holds.
            if let Some(sheet_name) = sheet_name_for(relative) {
                if let Some(problem) = sheet_name_problem(&sheet_name) {
                    report.warn(Warning::new(
                        WarningCode::SheetNameLimits,
                        dir.display().to_string(),
                        format!(
                            "Sheet name '{sheet_name}' may be rejected by spreadsheet applications: {problem}"
                        ),
                    ));
                }
                let folded = sheet_name.to_lowercase();
                if let Some(earlier) = sources
                    .iter()
                    .find(|s| s.sheet_name.to_lowercase() == folded)
                {
                    report.warn(Warning::new(
                        WarningCode::SheetNameLimits,
                        dir.display().to_string(),
                        format!(
                            "Sheet name '{sheet_name}' differs from sheet '{}' only in case and may be rejected by spreadsheet applications.",
                            earlier.sheet_name
                        ),
                    ));
                }
                tracing::debug!(sheet = %sheet_name, files = files.len(), "directory");
                sources.push(SheetSource {
                    sheet_name,
                    dir: dir.to_path_buf(),
                    files,
                });
            }
        }

        for subdir in subdirs {
            let Some(name) = subdir.file_name() else {
                continue;
            };
            let child = relative.join(name);
            if sheet_name_for(&child).is_none() {
                report.warn(Warning::new(
                    WarningCode::UnmappableDirectory,
                    subdir.display().to_string(),
                    format!(
                        "Directory name is not UTF-8 or contains '{SHEET_PATH_JOIN}'; subtree skipped."
                    ),
                ));
                continue;
            }
            self.visit(&subdir, &child, sources, report)?;
        }
        Ok(())
    }

    fn is_object_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.extension)
    }
}
