//! Error types for petab-edit-core

use thiserror::Error;

use crate::schema::{ColumnKind, TableKind};

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in petab-edit-core
#[derive(Debug, Error)]
pub enum Error {
    /// A user-entered value failed type coercion for its column kind.
    /// The prior cell value is retained.
    #[error("column '{column}' expects a {expected} value, got '{got}'")]
    Validation {
        column: String,
        expected: ColumnKind,
        got: String,
    },

    /// Duplicate row identifier on insert or rename
    #[error("duplicate identifier '{0}'")]
    DuplicateKey(String),

    /// Row identifiers must be non-empty
    #[error("identifier must not be empty")]
    EmptyKey,

    /// Row key not present in the table
    #[error("row '{0}' not found")]
    RowNotFound(String),

    /// Column name already exists
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    /// Column not present in the table
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Attempted removal of a structurally required column
    #[error("column '{0}' is required and cannot be removed")]
    RequiredColumn(String),

    /// Value write attempted on the identifier column
    #[error("column '{0}' is the identifier column; rename the row instead")]
    IdentifierColumn(String),

    /// The trailing placeholder row cannot be removed or renamed
    #[error("the placeholder row cannot be modified")]
    SentinelRow,

    /// Mutation attempted on a read-only table (simulation)
    #[error("{0} table is read-only")]
    ReadOnly(TableKind),

    /// Rename attempted on a table whose rows have synthetic keys
    #[error("{0} table has no identifier column")]
    NotIdentifierKeyed(TableKind),

    /// A rename collided with an unresolved missing-identifier prompt
    #[error("rename refused: missing identifier '{0}' is awaiting resolution")]
    RenamePending(String),

    /// Corrupted or incompatible default-value configuration payload
    #[error("invalid default-value configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// True for per-cell type-coercion rejections (recoverable, the cell
    /// keeps its prior value).
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// True for per-action structural refusals (the command never applied).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::DuplicateKey(_)
                | Error::EmptyKey
                | Error::RowNotFound(_)
                | Error::DuplicateColumn(_)
                | Error::ColumnNotFound(_)
                | Error::RequiredColumn(_)
                | Error::IdentifierColumn(_)
                | Error::SentinelRow
                | Error::ReadOnly(_)
                | Error::NotIdentifierKeyed(_)
                | Error::RenamePending(_)
        )
    }
}
