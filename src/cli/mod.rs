//! CLI command handlers

pub mod commands;

pub use commands::{export, finish_message, import, write_report};
