use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ExportOptions, ImportOptions};
use crate::convert::{Exporter, Importer};
use crate::diagnostics::Report;
use crate::error::DatSheetResult;

/// Execute the export command
pub fn export(
    root: PathBuf,
    output: PathBuf,
    extension: String,
    title: Option<String>,
    verbose: bool,
) -> DatSheetResult<Report> {
    println!("{}", "datSheet - Export".bold().green());
    println!("   Root:     {}", root.display());
    println!("   Workbook: {}\n", output.display());

    let exporter = Exporter::with_options(&root, ExportOptions { extension, title });
    if verbose {
        println!("   Title: {}", exporter.title().cyan());
    }

    let report = exporter.export(&output)?;

    println!("{}", "Export complete".bold().green());
    print_counts(&report, verbose);
    Ok(report)
}

/// Execute the import command
pub fn import(
    workbooks: Vec<PathBuf>,
    output_dir: PathBuf,
    extension: String,
    verbose: bool,
) -> DatSheetResult<Report> {
    println!("{}", "datSheet - Import".bold().green());
    println!("   Output: {}\n", output_dir.display());

    let importer = Importer::new(ImportOptions {
        output_dir,
        extension,
    });

    let mut total = Report::default();
    for workbook in workbooks {
        println!("   Workbook: {}", workbook.display().to_string().bright_blue());
        let report = importer.import(&workbook)?;
        if verbose {
            print_counts(&report, true);
        }
        total.merge(report);
    }

    println!("{}", "Import complete".bold().green());
    print_counts(&total, verbose);
    Ok(total)
}

/// Write the run's counters and warnings as JSON.
pub fn write_report(path: &Path, report: &Report) -> DatSheetResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json + "\n")?;
    println!("   Report: {}", path.display().to_string().bright_blue());
    Ok(())
}

fn print_counts(report: &Report, verbose: bool) {
    println!("   Sheets:        {}", report.sheets);
    println!("   Objects:       {}", report.objects);
    if verbose {
        println!("   Files read:    {}", report.files_read);
        println!("   Files written: {}", report.files_written);
    }
    println!();
}

/// Closing line of a run: clean, or how many warnings were emitted.
pub fn finish_message(report: &Report) -> String {
    match report.warning_count() {
        0 => "Finished without errors.".to_string(),
        1 => "Finished with 1 warning.".to_string(),
        n => format!("Finished with {n} warnings."),
    }
}
