//! Loading and saving whole problems
//!
//! A PEtab problem is a handful of table files. [`Problem`] opens any mix
//! of them into a [`ProblemEditor`] (each file identified by its header)
//! and writes the edited tables back out under conventional file names.

use std::fs;
use std::path::{Path, PathBuf};

use petab_edit_core::{ProblemEditor, TableKind, Tables};
use petab_edit_csv::{CsvError, ReadOptions, TableReader, TableWriter, WriteOptions};
use thiserror::Error;

/// Result type for problem-level load/save
pub type ProblemResult<T> = std::result::Result<T, ProblemError>;

/// Errors that can occur loading or saving a problem
#[derive(Debug, Error)]
pub enum ProblemError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A table file failed to load or save
    #[error("{path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: CsvError,
    },

    /// Two files resolved to the same table kind
    #[error("{path} is a second {kind} table")]
    DuplicateTable { kind: TableKind, path: PathBuf },
}

/// Load/save entry points for a whole problem
pub struct Problem;

impl Problem {
    /// Load a set of table files into a fresh editor. Each file's kind is
    /// sniffed from its header; tables without a file start empty.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> ProblemResult<ProblemEditor> {
        let mut tables = Tables::new();
        let mut loaded: Vec<TableKind> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let store =
                TableReader::read_file(path, &ReadOptions::default()).map_err(|source| {
                    ProblemError::Table {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
            let kind = store.kind();
            if loaded.contains(&kind) {
                return Err(ProblemError::DuplicateTable {
                    kind,
                    path: path.to_path_buf(),
                });
            }
            loaded.push(kind);
            log::info!("loaded {} table from {}", kind, path.display());
            match kind {
                TableKind::Measurement => tables.measurement = store,
                TableKind::Observable => tables.observable = store,
                TableKind::Parameter => tables.parameter = store,
                TableKind::Condition => tables.condition = store,
                TableKind::Simulation => tables.simulation = Some(store),
            }
        }
        Ok(ProblemEditor::from_tables(tables))
    }

    /// Load every `.tsv`/`.csv` file found directly in a directory
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> ProblemResult<ProblemEditor> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("tsv") | Some("csv")
                )
            })
            .collect();
        paths.sort();
        Self::load_files(&paths)
    }

    /// Write the editable tables under conventional names
    /// (`measurements.tsv`, `observables.tsv`, ...) and reset the dirty
    /// state. The read-only simulation table is never written.
    pub fn save_dir<P: AsRef<Path>>(editor: &mut ProblemEditor, dir: P) -> ProblemResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for kind in [
            TableKind::Measurement,
            TableKind::Observable,
            TableKind::Parameter,
            TableKind::Condition,
        ] {
            let Some(store) = editor.table(kind) else {
                continue;
            };
            let path = dir.join(file_name(kind));
            TableWriter::write_file(store, &path, &WriteOptions::default()).map_err(|source| {
                ProblemError::Table {
                    path: path.clone(),
                    source,
                }
            })?;
        }
        editor.mark_saved();
        Ok(())
    }
}

fn file_name(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Measurement => "measurements.tsv",
        TableKind::Observable => "observables.tsv",
        TableKind::Parameter => "parameters.tsv",
        TableKind::Condition => "conditions.tsv",
        TableKind::Simulation => "simulations.tsv",
    }
}
