//! Change notifications emitted by the core
//!
//! The core is single-threaded; notifications are queued on the emitting
//! store and drained by the editor (and from there by UI collaborators)
//! after each user action, rather than delivered through callbacks.

use crate::schema::TableKind;

/// A change notification with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Rows were inserted or removed (`rows` is the affected index range,
    /// inclusive), or the column layout changed (`rows` is `None`).
    Structural {
        table: TableKind,
        rows: Option<(usize, usize)>,
    },

    /// Cell values changed; one event per logical action, carrying every
    /// affected (row key, column) pair.
    ValueChanged {
        table: TableKind,
        cells: Vec<(String, String)>,
    },

    /// An identifier row was re-keyed
    RowRenamed {
        table: TableKind,
        old_key: String,
        new_key: String,
    },

    /// The problem-wide unsaved-changes flag flipped
    DirtyChanged { dirty: bool },

    /// A referencing column now holds an identifier the target table does
    /// not define; an outer collaborator decides whether to create it.
    DanglingReference {
        table: TableKind,
        column: String,
        value: String,
    },

    /// A consistency-check complaint that could not be mapped to a cell
    CheckMessage { table: TableKind, message: String },

    /// The set of linter-flagged cells changed
    ValidityChanged { table: TableKind },
}
