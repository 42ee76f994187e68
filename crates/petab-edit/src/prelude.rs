//! Convenience re-exports for the common editing workflow
//!
//! ```rust
//! use petab_edit::prelude::*;
//! ```

pub use crate::problem::Problem;
pub use petab_edit_core::{
    CellValue, ChangeEvent, DefaultConfig, DefaultStrategy, Error, ProblemEditor, Result,
    TableKind, TableStore,
};
pub use petab_edit_csv::{ReadOptions, TableReader, TableWriter, WriteOptions};
