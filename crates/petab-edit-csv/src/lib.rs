//! # petab-edit-csv
//!
//! Reader and writer for PEtab tables (TSV/CSV) backing petab-edit.
//! Reading sniffs the table kind and delimiter from the header row, so
//! files can be opened without telling the editor what they are.

mod error;
mod options;
mod reader;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{ReadOptions, WriteOptions};
pub use reader::{sniff_delimiter, sniff_kind, TableReader};
pub use writer::TableWriter;
