//! Workbook layout: columns, the shared-string pool, and the two sheet
//! directions (objects → rows, rows → object files).

mod builder;
mod columns;
mod expander;
mod shared_strings;

pub use builder::SheetBuilder;
pub use columns::{
    cell_reference, column_index, column_letters, split_cell_reference, ColumnOverflow, ColumnSet,
};
pub use expander::{expand_row, header_keys, resolve_cell, ExpandedRow, RowExpander};
pub use shared_strings::SharedStringPool;
