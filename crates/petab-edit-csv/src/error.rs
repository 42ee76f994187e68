//! CSV error types

use thiserror::Error;

/// Result type for table file operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;

/// Errors that can occur reading or writing PEtab table files
#[derive(Debug, Error)]
pub enum CsvError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV library error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file has no header row
    #[error("file has no header row")]
    MissingHeader,

    /// The header matches no known PEtab table kind
    #[error("header matches no PEtab table: {0}")]
    UnknownTableKind(String),

    /// A required column is absent from the header
    #[error("{kind} table is missing required column '{column}'")]
    MissingColumn {
        kind: petab_edit_core::TableKind,
        column: String,
    },

    /// Two rows carry the same identifier
    #[error("duplicate identifier '{id}' at data row {row}")]
    DuplicateId { id: String, row: usize },

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] petab_edit_core::Error),
}
