use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use datsheet::cli;
use datsheet::config::DEFAULT_EXTENSION;
use datsheet::diagnostics::Report;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datsheet")]
#[command(about = "Convert between object-description (.dat) trees and xlsx workbooks")]
#[command(long_about = "datSheet - object files <-> spreadsheet workbook

Every directory holding object files becomes one sheet, every object one
row, every parameter key one column. Sub-directories are named by joining
path components with ';'; the root directory's own sheet is named ';'.

COMMANDS:
  export  - Directory tree of .dat files to one .xlsx workbook
  import  - .xlsx workbook(s) back to .dat files

EXAMPLES:
  datsheet export pak128 pak128.xlsx
  datsheet import pak128.xlsx -o pak128-edited

Warnings are written to stderr prefixed with a stable code (e.g. NV0,
FDATOUT1); set DATSHEET_LOG or RUST_LOG to change the log level.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Convert a directory tree of object files into one workbook.

The tree is walked depth-first with entries in name order. Row 1 of each
sheet holds the parameter keys; columns A and B are always 'name' and
'filename'. The filename column records the source file so that objects
sharing a file are written back together on import.")]
    /// Directory tree of object files → workbook
    Export {
        /// Root directory of the object files
        root: PathBuf,

        /// Workbook to create (.xlsx)
        workbook: PathBuf,

        /// Extension of object files, without the dot
        #[arg(long, env = "DATSHEET_EXTENSION", default_value = DEFAULT_EXTENSION)]
        extension: String,

        /// Document title (defaults to the root directory's name)
        #[arg(long, env = "DATSHEET_TITLE")]
        title: Option<String>,

        /// Also write counters and warnings as JSON to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Show the document title and file counters, log at debug level
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Write the sheets of one or more workbooks back to object files.

Each row becomes one object in <sheet directory>/<filename>.dat, where the
filename comes from the 'filename' column or, failing that, the 'name'
column. Consecutive rows with the same filename are appended to one file,
separated by '---' lines. Existing files are overwritten.")]
    /// Workbook(s) → directory tree of object files
    Import {
        /// Workbook(s) to read
        #[arg(required = true)]
        workbooks: Vec<PathBuf>,

        /// Directory under which sheet directories are recreated
        #[arg(short, long, env = "DATSHEET_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Extension given to written object files, without the dot
        #[arg(long, env = "DATSHEET_EXTENSION", default_value = DEFAULT_EXTENSION)]
        extension: String,

        /// Also write counters and warnings as JSON to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Show per-workbook and file counters, log at debug level
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "datsheet=debug"
    } else {
        "datsheet=info"
    };
    let filter = EnvFilter::try_from_env("DATSHEET_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> anyhow::Result<Report> {
    let (report, report_path) = match command {
        Commands::Export {
            root,
            workbook,
            extension,
            title,
            report,
            verbose,
        } => (
            cli::export(root, workbook, extension, title, verbose)?,
            report,
        ),

        Commands::Import {
            workbooks,
            output_dir,
            extension,
            report,
            verbose,
        } => (
            cli::import(workbooks, output_dir, extension, verbose)?,
            report,
        ),
    };
    if let Some(path) = report_path {
        cli::write_report(&path, &report)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Export { verbose, .. } | Commands::Import { verbose, .. } => *verbose,
    };
    init_tracing(verbose);

    match run(cli.command) {
        Ok(report) => {
            let message = cli::finish_message(&report);
            if report.warning_count() == 0 {
                println!("{}", message.bold().green());
            } else {
                println!("{}", message.yellow());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e:#}", "datsheet : error".bold().red());
            ExitCode::FAILURE
        }
    }
}
