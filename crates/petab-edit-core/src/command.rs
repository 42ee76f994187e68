//! Reversible commands and the undo/redo log
//!
//! Every user-visible table mutation is wrapped in a [`Command`] and run
//! through the [`CommandLog`]; this is the only path that keeps the undo
//! stack consistent with the stores. Commands carry enough pre-state to
//! invert themselves without querying live data after the fact.

use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, TableKind};
use crate::store::{SavedColumn, SavedRow};
use crate::tables::Tables;
use crate::value::CellValue;

/// One cell write within a bulk value change, with its pre-state
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row_key: String,
    pub column: String,
    pub old: CellValue,
    pub new: CellValue,
}

/// An atomic, reversible table mutation
#[derive(Debug, Clone)]
pub enum Command {
    /// Bulk cell-value change; a paste of N cells is one command and one
    /// undo step.
    SetCells {
        table: TableKind,
        edits: Vec<CellEdit>,
    },

    /// Insert rows (content included so redo reproduces defaults exactly);
    /// rows land immediately before the sentinel.
    InsertRows {
        table: TableKind,
        rows: Vec<(String, Vec<(String, CellValue)>)>,
    },

    /// Remove rows; pre-state is captured eagerly at construction so the
    /// inverse can reinsert each row at its original ordinal position.
    RemoveRows {
        table: TableKind,
        saved: Vec<SavedRow>,
    },

    /// Add a column (initialized empty)
    AddColumn { table: TableKind, spec: ColumnSpec },

    /// Remove a column; old position and values captured eagerly
    RemoveColumn {
        table: TableKind,
        saved: SavedColumn,
    },

    /// Re-key an identifier row
    RenameRow {
        table: TableKind,
        old_key: String,
        new_key: String,
    },

    /// Several commands applied as one logical undo unit (e.g. a rename
    /// plus its cross-table reference updates).
    Batch(Vec<Command>),
}

impl Command {
    /// Human-readable description for the action log
    pub fn describe(&self) -> String {
        match self {
            Command::SetCells { table, edits } => {
                format!("change {} cell(s) in {} table", edits.len(), table)
            }
            Command::InsertRows { table, rows } => {
                format!("add {} row(s) to {} table", rows.len(), table)
            }
            Command::RemoveRows { table, saved } => {
                format!("remove {} row(s) from {} table", saved.len(), table)
            }
            Command::AddColumn { table, spec } => {
                format!("add column {} to {} table", spec.name, table)
            }
            Command::RemoveColumn { table, saved } => {
                format!("remove column {} from {} table", saved.spec.name, table)
            }
            Command::RenameRow {
                table,
                old_key,
                new_key,
            } => format!("rename {} '{}' to '{}'", table, old_key, new_key),
            Command::Batch(commands) => commands
                .first()
                .map(|c| c.describe())
                .unwrap_or_else(|| "empty action".to_string()),
        }
    }

    fn apply(&mut self, tables: &mut Tables) -> Result<()> {
        match self {
            Command::SetCells { table, edits } => {
                let store = store_mut(tables, *table)?;
                let writes: Vec<_> = edits
                    .iter()
                    .map(|e| (e.row_key.clone(), e.column.clone(), e.new.clone()))
                    .collect();
                store.set_values_bulk(&writes)
            }
            Command::InsertRows { table, rows } => {
                let store = store_mut(tables, *table)?;
                store.insert_rows(rows.clone())
            }
            Command::RemoveRows { table, saved } => {
                let store = store_mut(tables, *table)?;
                let keys: Vec<_> = saved.iter().map(|r| r.key.clone()).collect();
                // refresh the captured pre-state; positions may legitimately
                // differ from the eager capture after surrounding undos
                *saved = store.remove_rows(&keys)?;
                Ok(())
            }
            Command::AddColumn { table, spec } => {
                let store = store_mut(tables, *table)?;
                store.add_column(spec.clone())
            }
            Command::RemoveColumn { table, saved } => {
                let store = store_mut(tables, *table)?;
                *saved = store.remove_column(&saved.spec.name)?;
                Ok(())
            }
            Command::RenameRow {
                table,
                old_key,
                new_key,
            } => {
                let store = store_mut(tables, *table)?;
                store.rename_row_key(old_key, new_key)
            }
            Command::Batch(commands) => {
                for command in commands.iter_mut() {
                    command.apply(tables)?;
                }
                Ok(())
            }
        }
    }

    fn unapply(&mut self, tables: &mut Tables) -> Result<()> {
        match self {
            Command::SetCells { table, edits } => {
                let store = store_mut(tables, *table)?;
                let writes: Vec<_> = edits
                    .iter()
                    .map(|e| (e.row_key.clone(), e.column.clone(), e.old.clone()))
                    .collect();
                store.set_values_bulk(&writes)
            }
            Command::InsertRows { table, rows } => {
                let store = store_mut(tables, *table)?;
                let keys: Vec<_> = rows.iter().map(|(k, _)| k.clone()).collect();
                store.remove_rows(&keys)?;
                Ok(())
            }
            Command::RemoveRows { table, saved } => {
                let store = store_mut(tables, *table)?;
                // reinsert each row at its original ordinal position,
                // ascending so later positions stay valid
                for row in saved.iter() {
                    store.insert_rows_at(
                        row.position,
                        vec![(row.key.clone(), row.values.clone())],
                    )?;
                }
                Ok(())
            }
            Command::AddColumn { table, spec } => {
                let store = store_mut(tables, *table)?;
                // added columns are always optional, so removal cannot be
                // refused; the saved values are empty by construction
                store.remove_column(&spec.name)?;
                Ok(())
            }
            Command::RemoveColumn { table, saved } => {
                let store = store_mut(tables, *table)?;
                store.add_column_at(saved.position, saved.spec.clone(), &saved.values)
            }
            Command::RenameRow {
                table,
                old_key,
                new_key,
            } => {
                let store = store_mut(tables, *table)?;
                store.rename_row_key(new_key, old_key)
            }
            Command::Batch(commands) => {
                for command in commands.iter_mut().rev() {
                    command.unapply(tables)?;
                }
                Ok(())
            }
        }
    }
}

fn store_mut(tables: &mut Tables, kind: TableKind) -> Result<&mut crate::store::TableStore> {
    tables.get_mut(kind).ok_or(Error::ReadOnly(kind))
}

/// Undo/redo stacks over [`Command`]s
#[derive(Debug, Default)]
pub struct CommandLog {
    undo: Vec<Command>,
    redo: Vec<Command>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and push it on the undo stack. The redo stack is
    /// cleared; a refused command leaves both stacks untouched.
    pub fn execute(&mut self, mut command: Command, tables: &mut Tables) -> Result<()> {
        command.apply(tables)?;
        log::debug!("executed: {}", command.describe());
        self.undo.push(command);
        self.redo.clear();
        Ok(())
    }

    /// Invert the most recent command. No-op on an empty stack.
    pub fn undo(&mut self, tables: &mut Tables) -> Result<bool> {
        let Some(mut command) = self.undo.pop() else {
            return Ok(false);
        };
        command.unapply(tables)?;
        log::debug!("undone: {}", command.describe());
        self.redo.push(command);
        Ok(true)
    }

    /// Re-apply the most recently undone command. No-op on an empty stack.
    pub fn redo(&mut self, tables: &mut Tables) -> Result<bool> {
        let Some(mut command) = self.redo.pop() else {
            return Ok(false);
        };
        command.apply(tables)?;
        log::debug!("redone: {}", command.describe());
        self.undo.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Depth of the undo stack (one entry per logical user action)
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Forget all history (after load/overwrite)
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use pretty_assertions::assert_eq;

    fn fixture() -> Tables {
        let mut tables = Tables::new();
        tables.observable = TableStore::from_rows(
            TableKind::Observable,
            crate::schema::TableSchema::builtin(TableKind::Observable),
            vec![
                (
                    "obs_a".to_string(),
                    vec![("observableFormula".to_string(), CellValue::text("x"))],
                ),
                (
                    "obs_b".to_string(),
                    vec![("observableFormula".to_string(), CellValue::text("y"))],
                ),
            ],
        )
        .unwrap();
        tables
    }

    fn snapshot(tables: &Tables) -> Vec<(String, String)> {
        tables
            .observable
            .rows()
            .map(|r| {
                (
                    r.key().to_string(),
                    tables
                        .observable
                        .get_value(r.key(), "observableFormula")
                        .to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_set_cells_round_trip() {
        let mut tables = fixture();
        let mut log = CommandLog::new();
        let before = snapshot(&tables);

        log.execute(
            Command::SetCells {
                table: TableKind::Observable,
                edits: vec![CellEdit {
                    row_key: "obs_a".to_string(),
                    column: "observableFormula".to_string(),
                    old: CellValue::text("x"),
                    new: CellValue::text("x * 2"),
                }],
            },
            &mut tables,
        )
        .unwrap();
        assert_eq!(
            tables.observable.get_value("obs_a", "observableFormula"),
            CellValue::text("x * 2")
        );

        log.undo(&mut tables).unwrap();
        assert_eq!(snapshot(&tables), before);

        log.redo(&mut tables).unwrap();
        assert_eq!(
            tables.observable.get_value("obs_a", "observableFormula"),
            CellValue::text("x * 2")
        );
    }

    #[test]
    fn test_remove_rows_restores_positions() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        let saved = vec![SavedRow {
            position: 0,
            key: "obs_a".to_string(),
            values: vec![("observableFormula".to_string(), CellValue::text("x"))],
        }];
        log.execute(
            Command::RemoveRows {
                table: TableKind::Observable,
                saved,
            },
            &mut tables,
        )
        .unwrap();
        assert_eq!(tables.observable.row_position("obs_b"), Some(0));

        log.undo(&mut tables).unwrap();
        assert_eq!(tables.observable.row_position("obs_a"), Some(0));
        assert_eq!(tables.observable.row_position("obs_b"), Some(1));
        assert_eq!(
            tables.observable.get_value("obs_a", "observableFormula"),
            CellValue::text("x")
        );
    }

    #[test]
    fn test_insert_rows_undo_removes() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        log.execute(
            Command::InsertRows {
                table: TableKind::Observable,
                rows: vec![("obs_c".to_string(), vec![])],
            },
            &mut tables,
        )
        .unwrap();
        assert!(tables.observable.has_row("obs_c"));

        log.undo(&mut tables).unwrap();
        assert!(!tables.observable.has_row("obs_c"));

        log.redo(&mut tables).unwrap();
        assert!(tables.observable.has_row("obs_c"));
    }

    #[test]
    fn test_rename_round_trip() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        log.execute(
            Command::RenameRow {
                table: TableKind::Observable,
                old_key: "obs_a".to_string(),
                new_key: "obs_z".to_string(),
            },
            &mut tables,
        )
        .unwrap();
        assert!(tables.observable.has_row("obs_z"));

        log.undo(&mut tables).unwrap();
        assert!(tables.observable.has_row("obs_a"));
        assert!(!tables.observable.has_row("obs_z"));
    }

    #[test]
    fn test_column_commands_round_trip() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        log.execute(
            Command::AddColumn {
                table: TableKind::Observable,
                spec: ColumnSpec::extra("observableName"),
            },
            &mut tables,
        )
        .unwrap();
        assert!(tables.observable.schema().contains("observableName"));

        log.undo(&mut tables).unwrap();
        assert!(!tables.observable.schema().contains("observableName"));
    }

    #[test]
    fn test_batch_is_one_undo_step() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        log.execute(
            Command::Batch(vec![
                Command::RenameRow {
                    table: TableKind::Observable,
                    old_key: "obs_a".to_string(),
                    new_key: "obs_z".to_string(),
                },
                Command::SetCells {
                    table: TableKind::Observable,
                    edits: vec![CellEdit {
                        row_key: "obs_b".to_string(),
                        column: "observableFormula".to_string(),
                        old: CellValue::text("y"),
                        new: CellValue::text("y + 1"),
                    }],
                },
            ]),
            &mut tables,
        )
        .unwrap();
        assert_eq!(log.undo_depth(), 1);

        log.undo(&mut tables).unwrap();
        assert!(tables.observable.has_row("obs_a"));
        assert_eq!(
            tables.observable.get_value("obs_b", "observableFormula"),
            CellValue::text("y")
        );
    }

    #[test]
    fn test_new_command_clears_redo() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        log.execute(
            Command::RenameRow {
                table: TableKind::Observable,
                old_key: "obs_a".to_string(),
                new_key: "obs_z".to_string(),
            },
            &mut tables,
        )
        .unwrap();
        log.undo(&mut tables).unwrap();
        assert!(log.can_redo());

        log.execute(
            Command::InsertRows {
                table: TableKind::Observable,
                rows: vec![("obs_c".to_string(), vec![])],
            },
            &mut tables,
        )
        .unwrap();
        assert!(!log.can_redo());
    }

    #[test]
    fn test_refused_command_leaves_stacks_untouched() {
        let mut tables = fixture();
        let mut log = CommandLog::new();

        let result = log.execute(
            Command::RenameRow {
                table: TableKind::Observable,
                old_key: "obs_a".to_string(),
                new_key: "obs_b".to_string(), // duplicate
            },
            &mut tables,
        );
        assert!(result.is_err());
        assert_eq!(log.undo_depth(), 0);
        assert!(tables.observable.has_row("obs_a"));
    }
}
