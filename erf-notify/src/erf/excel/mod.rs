//! Spreadsheet input and output

pub mod reader;
pub mod sheet;
pub mod writer;

pub use reader::{LoadedSheet, inspect, load, read_sheets};
pub use sheet::{RawSheet, SheetAnalysis, select_best};
pub use writer::{unmapped_users_filename, write_mapping_template, write_unmapped_users};
