//! I/O module
//!
//! Handles roster CSV parsing and import report output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `async_reader` - Asynchronous roster reader with batch reading interface

pub mod async_reader;
pub mod csv_format;

pub use async_reader::{RosterReader, RosterRow};
pub use csv_format::{convert_roster_record, write_import_report_csv, RosterRecord};
