//! # petab-edit
//!
//! An editable data model for PEtab parameter-estimation problems.
//!
//! The crate ties the core model and the table file layer together:
//! - load PEtab tables (TSV/CSV) into a [`ProblemEditor`], sniffing what
//!   each file is from its header
//! - edit cells, rows, and columns with full undo/redo; renaming an
//!   identifier rewrites every reference to it in the same undo step
//! - new rows pick up configurable default values
//! - fold external consistency-check results into per-cell validity flags
//! - save the tables back out
//!
//! ## Example
//!
//! ```rust
//! use petab_edit::prelude::*;
//!
//! let mut editor = ProblemEditor::new();
//!
//! // typing into the trailing placeholder row creates a real row
//! let sentinel = editor
//!     .table(TableKind::Observable)
//!     .unwrap()
//!     .sentinel_key()
//!     .to_string();
//! editor.set_cell(TableKind::Observable, &sentinel, "observableId", "obs_a")?;
//! editor.set_cell(TableKind::Observable, "obs_a", "observableFormula", "x")?;
//!
//! // renaming rewrites measurement references too, as one undo step
//! editor.rename_id(TableKind::Observable, "obs_a", "obs_total")?;
//! editor.undo()?;
//! # Ok::<(), petab_edit::Error>(())
//! ```

pub mod prelude;
pub mod problem;

pub use problem::{Problem, ProblemError, ProblemResult};

// Cross-table link registry
pub use petab_edit_core::links;

// Re-export core types
pub use petab_edit_core::{
    ApplyOutcome,
    CellEdit,
    CellValue,
    ChangeEvent,
    CheckFinding,
    CheckTicket,
    ColumnDefault,
    ColumnKind,
    ColumnSpec,
    Command,
    CommandLog,
    ConsistencyChecker,
    DefaultConfig,
    DefaultStrategy,
    // Error types
    Error,
    Link,
    MemorySettings,
    ModelLookup,
    ProblemEditor,
    Result,
    Row,
    SavedColumn,
    SavedRow,
    SettingsStore,
    TableKind,
    TableSchema,
    TableStore,
    Tables,
    ValidityTracker,
};

// Re-export the file layer
pub use petab_edit_csv::{
    sniff_delimiter, sniff_kind, CsvError, ReadOptions, TableReader, TableWriter, WriteOptions,
};
