//! # petab-edit-core
//!
//! Core data model for editing PEtab parameter-estimation problems.
//!
//! This crate provides the editable in-memory representation behind the
//! petab-edit tools:
//! - [`TableStore`] - one table's rows, columns, and the trailing
//!   placeholder row new entries are typed into
//! - [`ProblemEditor`] - user actions over all tables: cell edits,
//!   paste, rename propagation, undo/redo
//! - [`DefaultConfig`] - pluggable default values for newly created rows
//! - [`ValidityTracker`] - linter-flagged cells, with stale-result
//!   protection for checks that finish after further edits
//!
//! ## Example
//!
//! ```rust
//! use petab_edit_core::{ProblemEditor, TableKind};
//!
//! let mut editor = ProblemEditor::new();
//!
//! // typing into the placeholder row creates a real row with defaults
//! let sentinel = editor
//!     .table(TableKind::Parameter)
//!     .unwrap()
//!     .sentinel_key()
//!     .to_string();
//! editor.set_cell(TableKind::Parameter, &sentinel, "parameterId", "k1")?;
//!
//! assert!(editor.table(TableKind::Parameter).unwrap().has_row("k1"));
//! editor.undo()?;
//! assert!(!editor.table(TableKind::Parameter).unwrap().has_row("k1"));
//! # Ok::<(), petab_edit_core::Error>(())
//! ```

pub mod command;
pub mod defaults;
pub mod editor;
pub mod error;
pub mod event;
pub mod links;
pub mod schema;
pub mod settings;
pub mod store;
pub mod tables;
pub mod validity;
pub mod value;

// Re-exports for convenience
pub use command::{CellEdit, Command, CommandLog};
pub use defaults::{ColumnDefault, DefaultConfig, DefaultStrategy, ModelLookup};
pub use editor::ProblemEditor;
pub use error::{Error, Result};
pub use event::ChangeEvent;
pub use links::Link;
pub use schema::{column_spec_for, ColumnKind, ColumnSpec, TableKind, TableSchema};
pub use settings::{MemorySettings, SettingsStore};
pub use store::{Row, SavedColumn, SavedRow, TableStore};
pub use tables::Tables;
pub use validity::{ApplyOutcome, CheckFinding, CheckTicket, ConsistencyChecker, ValidityTracker};
pub use value::CellValue;
