//! Tracking of linter-flagged cells
//!
//! Consistency checks run outside the edit path (possibly slowly), so every
//! check run is stamped with the store's edit generation when it starts.
//! Results arriving after further edits are stale and dropped; whatever the
//! user changed since would invalidate them anyway.

use ahash::AHashSet;

use crate::schema::TableKind;
use crate::store::TableStore;

/// One complaint from a consistency check, mapped to a cell when possible
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFinding {
    pub row_key: Option<String>,
    pub column: Option<String>,
    pub message: String,
}

impl CheckFinding {
    pub fn cell(row_key: impl Into<String>, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row_key: Some(row_key.into()),
            column: Some(column.into()),
            message: message.into(),
        }
    }

    pub fn table(message: impl Into<String>) -> Self {
        Self {
            row_key: None,
            column: None,
            message: message.into(),
        }
    }
}

/// A consistency check backend (the external linter)
pub trait ConsistencyChecker {
    /// Run the check over one table. An `Err` means the checker itself
    /// failed to run; existing flags are left untouched in that case.
    fn check(&self, store: &TableStore) -> std::result::Result<Vec<CheckFinding>, String>;
}

/// Stamp handed out when a check starts, validated when results arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTicket {
    table: TableKind,
    generation: u64,
}

impl CheckTicket {
    pub fn table(&self) -> TableKind {
        self.table
    }
}

/// Outcome of feeding check results back into the tracker
#[derive(Debug, PartialEq)]
pub enum ApplyOutcome {
    /// The table changed since the check started; results were dropped
    Stale,
    /// Results were applied
    Applied {
        /// The invalid-cell set changed
        changed: bool,
        /// Complaints that could not be mapped to a live cell
        messages: Vec<String>,
    },
}

/// Per-table set of linter-flagged cells
#[derive(Debug, Default)]
pub struct ValidityTracker {
    invalid: AHashSet<(String, String)>,
}

impl ValidityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_invalid(&self, row_key: &str, column: &str) -> bool {
        self.invalid
            .contains(&(row_key.to_string(), column.to_string()))
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    /// Flagged (row key, column) pairs, unordered
    pub fn invalid_cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.invalid.iter().map(|(r, c)| (r.as_str(), c.as_str()))
    }

    /// Stamp the start of a check run against the store's current state
    pub fn begin_check(&self, store: &TableStore) -> CheckTicket {
        CheckTicket {
            table: store.kind(),
            generation: store.edit_generation(),
        }
    }

    /// Replace the flag set with a check run's findings, unless the store
    /// has been edited since the ticket was issued. A finding that names a
    /// row or column the store no longer has is reported back as a message
    /// instead of being flagged.
    pub fn apply(
        &mut self,
        store: &TableStore,
        ticket: CheckTicket,
        findings: Vec<CheckFinding>,
    ) -> ApplyOutcome {
        if ticket.generation != store.edit_generation() {
            log::debug!(
                "dropping stale check results for {} table (generation {} != {})",
                store.kind(),
                ticket.generation,
                store.edit_generation()
            );
            return ApplyOutcome::Stale;
        }
        let mut fresh = AHashSet::new();
        let mut messages = Vec::new();
        for finding in findings {
            match (finding.row_key, finding.column) {
                (Some(row_key), Some(column))
                    if store.has_row(&row_key) && store.schema().contains(&column) =>
                {
                    fresh.insert((row_key, column));
                }
                _ => messages.push(finding.message),
            }
        }
        let changed = fresh != self.invalid;
        self.invalid = fresh;
        ApplyOutcome::Applied { changed, messages }
    }

    /// Optimistically clear one cell's flag when the user edits it.
    /// Returns true if a flag was removed.
    pub fn clear_cell(&mut self, row_key: &str, column: &str) -> bool {
        self.invalid
            .remove(&(row_key.to_string(), column.to_string()))
    }

    /// Drop every flag for a row (row removed or re-keyed)
    pub fn clear_row(&mut self, row_key: &str) -> bool {
        let before = self.invalid.len();
        self.invalid.retain(|(r, _)| r != row_key);
        self.invalid.len() != before
    }

    /// Drop all flags. Returns true if any were set.
    pub fn clear_all(&mut self) -> bool {
        let had_any = !self.invalid.is_empty();
        self.invalid.clear();
        had_any
    }
}
