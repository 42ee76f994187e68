//! Per-table row/column storage
//!
//! A [`TableStore`] owns one table's rows in display order plus a key →
//! position index, so row lookups never fall back to positional
//! recomputation. The last row is always a synthetic sentinel ("new
//! row...") that is regenerated after every row insertion or removal and
//! never leaves the store through persistence or aggregation accessors.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::schema::{ColumnSpec, TableKind, TableSchema};
use crate::value::CellValue;

/// One table row: a stable key plus sparse column values.
///
/// For identifier-keyed tables the key *is* the domain identifier; for
/// measurement/simulation tables it is synthetic and carries no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    key: String,
    values: AHashMap<String, CellValue>,
}

impl Row {
    fn new(key: String) -> Self {
        Self {
            key,
            values: AHashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, column: &str) -> CellValue {
        self.values.get(column).cloned().unwrap_or_default()
    }
}

/// A removed row captured for undo: its ordinal position, key, and values
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRow {
    pub position: usize,
    pub key: String,
    pub values: Vec<(String, CellValue)>,
}

/// A removed column captured for undo
#[derive(Debug, Clone, PartialEq)]
pub struct SavedColumn {
    pub position: usize,
    pub spec: ColumnSpec,
    /// (row key, value) for every row that held a non-empty value
    pub values: Vec<(String, CellValue)>,
}

/// In-memory store for one table kind
#[derive(Debug)]
pub struct TableStore {
    kind: TableKind,
    schema: TableSchema,
    /// Display order; the sentinel row is always last
    rows: Vec<Row>,
    /// Key → position for all non-sentinel rows
    index: AHashMap<String, usize>,
    sentinel_serial: u64,
    read_only: bool,
    dirty: bool,
    edit_generation: u64,
    events: Vec<ChangeEvent>,
}

impl TableStore {
    /// Create an empty store with the built-in schema for `kind`
    pub fn new(kind: TableKind) -> Self {
        Self::with_schema(kind, TableSchema::builtin(kind))
    }

    /// Create an empty store with an explicit schema
    pub fn with_schema(kind: TableKind, schema: TableSchema) -> Self {
        let mut store = Self {
            kind,
            schema,
            rows: Vec::new(),
            index: AHashMap::new(),
            sentinel_serial: 0,
            read_only: kind == TableKind::Simulation,
            dirty: false,
            edit_generation: 0,
            events: Vec::new(),
        };
        store.regenerate_sentinel();
        store
    }

    /// Build a store from loaded rows (persistence path). Keys must be
    /// unique; the sentinel row is appended automatically. The store
    /// starts clean.
    pub fn from_rows(
        kind: TableKind,
        schema: TableSchema,
        rows: Vec<(String, Vec<(String, CellValue)>)>,
    ) -> Result<Self> {
        let mut store = Self::with_schema(kind, schema);
        for (key, values) in rows {
            if key.is_empty() {
                return Err(Error::EmptyKey);
            }
            if store.index.contains_key(&key) {
                return Err(Error::DuplicateKey(key));
            }
            let position = store.data_row_count();
            let mut row = Row::new(key.clone());
            row.values = values.into_iter().collect();
            store.rows.insert(position, row);
            store.index.insert(key, position);
        }
        store.regenerate_sentinel();
        store.events.clear();
        Ok(store)
    }

    // === Accessors ===

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of rows excluding the sentinel
    pub fn data_row_count(&self) -> usize {
        self.rows.len() - 1
    }

    /// Key of the trailing sentinel row
    pub fn sentinel_key(&self) -> &str {
        &self.rows[self.rows.len() - 1].key
    }

    pub fn is_sentinel(&self, key: &str) -> bool {
        self.sentinel_key() == key
    }

    pub fn has_row(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn row_position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Keys of all non-sentinel rows, in display order
    pub fn row_keys(&self) -> impl Iterator<Item = &str> {
        self.rows[..self.rows.len() - 1].iter().map(|r| r.key())
    }

    /// Non-sentinel rows in display order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows[..self.rows.len() - 1].iter()
    }

    /// Value at (row key, column); absent rows, the sentinel, and absent
    /// columns all read as empty since callers probe speculatively.
    pub fn get_value(&self, key: &str, column: &str) -> CellValue {
        let Some(&position) = self.index.get(key) else {
            return CellValue::Empty;
        };
        if self.kind.id_column() == Some(column) {
            return CellValue::Text(key.to_string());
        }
        self.rows[position].get(column)
    }

    /// Distinct non-empty rendered values of a column, excluding the
    /// sentinel. Serves completion/suggestion collaborators.
    pub fn unique_values(&self, column: &str) -> BTreeSet<String> {
        if self.kind.id_column() == Some(column) {
            return self.row_keys().map(str::to_string).collect();
        }
        self.rows()
            .map(|r| r.get(column))
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .collect()
    }

    /// Non-empty values of a column in display order, excluding the sentinel
    pub fn column_values(&self, column: &str) -> Vec<CellValue> {
        if self.kind.id_column() == Some(column) {
            return self
                .row_keys()
                .map(|k| CellValue::Text(k.to_string()))
                .collect();
        }
        self.rows()
            .map(|r| r.get(column))
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the unsaved-changes flag (after save/load)
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Monotonic stamp bumped on every mutation; used to discard stale
    /// consistency-check results.
    pub fn edit_generation(&self) -> u64 {
        self.edit_generation
    }

    /// Drain queued change notifications
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Generate `count` fresh synthetic row keys ("new_<kind>_<n>")
    pub fn generate_keys(&self, count: usize) -> Vec<String> {
        let mut keys = Vec::with_capacity(count);
        let mut serial = 0u64;
        while keys.len() < count {
            let key = format!("new_{}_{}", self.kind, serial);
            if !self.index.contains_key(&key) && !keys.contains(&key) {
                keys.push(key);
            }
            serial += 1;
        }
        keys
    }

    // === Mutation primitives ===
    //
    // These are the building blocks commands are made of. User actions must
    // not call them directly; going through the command log is what keeps
    // the undo stack consistent.

    /// Write a value through after coercing it to the column's kind.
    ///
    /// Rejects without mutating if coercion fails; the prior value stays.
    pub fn set_value(&mut self, key: &str, column: &str, value: CellValue) -> Result<()> {
        self.check_writable()?;
        if self.kind.id_column() == Some(column) {
            return Err(Error::IdentifierColumn(column.to_string()));
        }
        let spec = self
            .schema
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        let value = value.coerce(column, spec.kind)?;
        let position = *self
            .index
            .get(key)
            .ok_or_else(|| Error::RowNotFound(key.to_string()))?;
        if value.is_empty() {
            self.rows[position].values.remove(column);
        } else {
            self.rows[position].values.insert(column.to_string(), value);
        }
        self.touch();
        self.events.push(ChangeEvent::ValueChanged {
            table: self.kind,
            cells: vec![(key.to_string(), column.to_string())],
        });
        Ok(())
    }

    /// Apply several pre-coerced cell writes as one notification.
    /// Used by bulk commands; all (key, column) pairs must exist.
    pub fn set_values_bulk(&mut self, edits: &[(String, String, CellValue)]) -> Result<()> {
        self.check_writable()?;
        for (key, column, _) in edits {
            if !self.index.contains_key(key) {
                return Err(Error::RowNotFound(key.clone()));
            }
            if !self.schema.contains(column) {
                return Err(Error::ColumnNotFound(column.clone()));
            }
        }
        let mut cells = Vec::with_capacity(edits.len());
        for (key, column, value) in edits {
            let position = self.index[key];
            if value.is_empty() {
                self.rows[position].values.remove(column);
            } else {
                self.rows[position]
                    .values
                    .insert(column.clone(), value.clone());
            }
            cells.push((key.clone(), column.clone()));
        }
        if !cells.is_empty() {
            self.touch();
            self.events.push(ChangeEvent::ValueChanged {
                table: self.kind,
                cells,
            });
        }
        Ok(())
    }

    /// Insert rows immediately before the sentinel. Keys must be fresh,
    /// non-empty, and unique within the batch.
    pub fn insert_rows(&mut self, rows: Vec<(String, Vec<(String, CellValue)>)>) -> Result<()> {
        let position = self.data_row_count();
        self.insert_rows_at(position, rows)
    }

    /// Insert rows at an explicit ordinal position (undo restore path)
    pub fn insert_rows_at(
        &mut self,
        position: usize,
        rows: Vec<(String, Vec<(String, CellValue)>)>,
    ) -> Result<()> {
        self.check_writable()?;
        let position = position.min(self.data_row_count());
        for (key, _) in &rows {
            if key.is_empty() {
                return Err(Error::EmptyKey);
            }
            if self.index.contains_key(key) {
                return Err(Error::DuplicateKey(key.clone()));
            }
        }
        if rows
            .iter()
            .enumerate()
            .any(|(i, (k, _))| rows[..i].iter().any(|(other, _)| other == k))
        {
            return Err(Error::DuplicateKey("batch".to_string()));
        }
        let count = rows.len();
        if count == 0 {
            return Ok(());
        }
        for (offset, (key, values)) in rows.into_iter().enumerate() {
            let mut row = Row::new(key);
            row.values = values.into_iter().filter(|(_, v)| !v.is_empty()).collect();
            self.rows.insert(position + offset, row);
        }
        self.reindex_from(position);
        self.regenerate_sentinel();
        self.touch();
        self.events.push(ChangeEvent::Structural {
            table: self.kind,
            rows: Some((position, position + count - 1)),
        });
        Ok(())
    }

    /// Remove rows by key; refuses unknown keys and the sentinel.
    /// Returns the removed rows (with positions) for undo, ordered by
    /// ascending position.
    pub fn remove_rows(&mut self, keys: &[String]) -> Result<Vec<SavedRow>> {
        self.check_writable()?;
        let mut positions = Vec::with_capacity(keys.len());
        for key in keys {
            match self.index.get(key) {
                Some(&p) => positions.push(p),
                None if self.is_sentinel(key) => return Err(Error::SentinelRow),
                None => return Err(Error::RowNotFound(key.clone())),
            }
        }
        positions.sort_unstable();
        positions.dedup();
        let (first, last) = (positions[0], positions[positions.len() - 1]);

        let mut saved = Vec::with_capacity(positions.len());
        for &position in positions.iter().rev() {
            let row = self.rows.remove(position);
            let mut values: Vec<_> = row.values.into_iter().collect();
            values.sort_by(|a, b| a.0.cmp(&b.0));
            saved.push(SavedRow {
                position,
                key: row.key,
                values,
            });
        }
        saved.reverse();
        self.reindex_from(first);
        self.regenerate_sentinel();
        self.touch();
        self.events.push(ChangeEvent::Structural {
            table: self.kind,
            rows: Some((first, last)),
        });
        Ok(saved)
    }

    /// Append a column; the name must not collide with existing columns
    pub fn add_column(&mut self, spec: ColumnSpec) -> Result<()> {
        let position = self.schema.len();
        self.add_column_at(position, spec, &[])
    }

    /// Insert a column at a position and restore saved values (undo path)
    pub fn add_column_at(
        &mut self,
        position: usize,
        spec: ColumnSpec,
        values: &[(String, CellValue)],
    ) -> Result<()> {
        self.check_writable()?;
        if self.schema.contains(&spec.name) || self.kind.id_column() == Some(spec.name.as_str()) {
            return Err(Error::DuplicateColumn(spec.name));
        }
        let name = spec.name.clone();
        self.schema.insert(position, spec);
        for (key, value) in values {
            if let Some(&p) = self.index.get(key) {
                if !value.is_empty() {
                    self.rows[p].values.insert(name.clone(), value.clone());
                }
            }
        }
        self.touch();
        self.events.push(ChangeEvent::Structural {
            table: self.kind,
            rows: None,
        });
        Ok(())
    }

    /// Remove a column across all rows. Identifier and required built-in
    /// columns are refused. Returns the removed column for undo.
    pub fn remove_column(&mut self, name: &str) -> Result<SavedColumn> {
        self.check_writable()?;
        if self.kind.id_column() == Some(name) {
            return Err(Error::RequiredColumn(name.to_string()));
        }
        let position = self
            .schema
            .position(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        if !self.schema.columns()[position].optional {
            return Err(Error::RequiredColumn(name.to_string()));
        }
        let spec = self.schema.remove(position);
        let mut values = Vec::new();
        for row in &mut self.rows {
            if let Some(value) = row.values.remove(name) {
                values.push((row.key.clone(), value));
            }
        }
        self.touch();
        self.events.push(ChangeEvent::Structural {
            table: self.kind,
            rows: None,
        });
        Ok(SavedColumn {
            position,
            spec,
            values,
        })
    }

    /// Re-key an identifier row in place, preserving its position.
    /// Only legal for identifier-keyed tables.
    pub fn rename_row_key(&mut self, old: &str, new: &str) -> Result<()> {
        self.check_writable()?;
        if self.kind.id_column().is_none() {
            return Err(Error::NotIdentifierKeyed(self.kind));
        }
        if new.is_empty() {
            return Err(Error::EmptyKey);
        }
        if self.index.contains_key(new) {
            return Err(Error::DuplicateKey(new.to_string()));
        }
        let position = self
            .index
            .remove(old)
            .ok_or_else(|| Error::RowNotFound(old.to_string()))?;
        self.rows[position].key = new.to_string();
        self.index.insert(new.to_string(), position);
        self.touch();
        self.events.push(ChangeEvent::RowRenamed {
            table: self.kind,
            old_key: old.to_string(),
            new_key: new.to_string(),
        });
        Ok(())
    }

    // === Internal ===

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            Err(Error::ReadOnly(self.kind))
        } else {
            Ok(())
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.edit_generation += 1;
    }

    fn reindex_from(&mut self, position: usize) {
        let sentinel = self.rows.len().saturating_sub(1);
        self.index.retain(|_, &mut p| p < position);
        for p in position..sentinel {
            self.index.insert(self.rows[p].key.clone(), p);
        }
    }

    fn regenerate_sentinel(&mut self) {
        // drop the old sentinel if one exists
        if let Some(last) = self.rows.last() {
            if !self.index.contains_key(&last.key) {
                self.rows.pop();
            }
        }
        loop {
            self.sentinel_serial += 1;
            let key = format!("__new_{}", self.sentinel_serial);
            if !self.index.contains_key(&key) {
                self.rows.push(Row::new(key));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn observable_store() -> TableStore {
        let mut store = TableStore::new(TableKind::Observable);
        store
            .insert_rows(vec![
                (
                    "obs_a".to_string(),
                    vec![("observableFormula".to_string(), CellValue::text("x"))],
                ),
                ("obs_b".to_string(), vec![]),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_sentinel_always_last() {
        let mut store = observable_store();
        assert_eq!(store.data_row_count(), 2);
        let sentinel = store.sentinel_key().to_string();
        assert_eq!(store.rows.last().unwrap().key(), sentinel);

        store
            .insert_rows(vec![("obs_c".to_string(), vec![])])
            .unwrap();
        // regenerated, still last
        assert_ne!(store.sentinel_key(), sentinel);
        assert_eq!(store.data_row_count(), 3);
        let fresh = store.sentinel_key().to_string();
        assert!(!store.has_row(&fresh));
    }

    #[test]
    fn test_sentinel_excluded_from_reads() {
        let store = observable_store();
        let keys: Vec<_> = store.row_keys().collect();
        assert_eq!(keys, vec!["obs_a", "obs_b"]);
        assert!(!store
            .unique_values("observableId")
            .contains(store.sentinel_key()));
    }

    #[test]
    fn test_get_value_probes_silently() {
        let store = observable_store();
        assert_eq!(store.get_value("missing", "observableFormula"), CellValue::Empty);
        assert_eq!(store.get_value("obs_a", "noSuchColumn"), CellValue::Empty);
        assert_eq!(
            store.get_value("obs_a", "observableId"),
            CellValue::text("obs_a")
        );
    }

    #[test]
    fn test_set_value_type_rejection_keeps_prior() {
        let mut store = TableStore::new(TableKind::Measurement);
        store
            .insert_rows(vec![(
                "new_measurement_0".to_string(),
                vec![("time".to_string(), CellValue::Number(1.0))],
            )])
            .unwrap();

        let err = store
            .set_value("new_measurement_0", "time", CellValue::text("soon"))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            store.get_value("new_measurement_0", "time"),
            CellValue::Number(1.0)
        );

        // empty succeeds and stores empty
        store
            .set_value("new_measurement_0", "time", CellValue::Empty)
            .unwrap();
        assert_eq!(
            store.get_value("new_measurement_0", "time"),
            CellValue::Empty
        );
    }

    #[test]
    fn test_duplicate_key_refused() {
        let mut store = observable_store();
        let err = store
            .insert_rows(vec![("obs_a".to_string(), vec![])])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(store.data_row_count(), 2);
    }

    #[test]
    fn test_remove_rows_returns_saved_state() {
        let mut store = observable_store();
        let saved = store.remove_rows(&["obs_a".to_string()]).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].position, 0);
        assert_eq!(saved[0].key, "obs_a");
        assert_eq!(
            saved[0].values,
            vec![("observableFormula".to_string(), CellValue::text("x"))]
        );
        assert_eq!(store.row_position("obs_b"), Some(0));
    }

    #[test]
    fn test_remove_sentinel_refused() {
        let mut store = observable_store();
        let sentinel = store.sentinel_key().to_string();
        assert!(matches!(
            store.remove_rows(&[sentinel]),
            Err(Error::SentinelRow)
        ));
    }

    #[test]
    fn test_rename_preserves_position() {
        let mut store = observable_store();
        store.rename_row_key("obs_a", "obs_z").unwrap();
        assert_eq!(store.row_position("obs_z"), Some(0));
        assert!(!store.has_row("obs_a"));

        assert!(matches!(
            store.rename_row_key("obs_z", "obs_b"),
            Err(Error::DuplicateKey(_))
        ));
        assert!(matches!(
            store.rename_row_key("obs_z", ""),
            Err(Error::EmptyKey)
        ));
    }

    #[test]
    fn test_rename_refused_for_synthetic_keys() {
        let mut store = TableStore::new(TableKind::Measurement);
        store
            .insert_rows(vec![("new_measurement_0".to_string(), vec![])])
            .unwrap();
        assert!(matches!(
            store.rename_row_key("new_measurement_0", "other"),
            Err(Error::NotIdentifierKeyed(_))
        ));
    }

    #[test]
    fn test_column_add_remove() {
        let mut store = TableStore::new(TableKind::Condition);
        store.insert_rows(vec![("c0".to_string(), vec![])]).unwrap();
        store
            .add_column(ColumnSpec::extra("k_deg"))
            .unwrap();
        store
            .set_value("c0", "k_deg", CellValue::text("0.1"))
            .unwrap();

        assert!(matches!(
            store.add_column(ColumnSpec::extra("k_deg")),
            Err(Error::DuplicateColumn(_))
        ));
        assert!(matches!(
            store.remove_column("conditionId"),
            Err(Error::RequiredColumn(_))
        ));

        let saved = store.remove_column("k_deg").unwrap();
        assert_eq!(saved.values, vec![("c0".to_string(), CellValue::text("0.1"))]);
        assert_eq!(store.get_value("c0", "k_deg"), CellValue::Empty);

        // restore
        store
            .add_column_at(saved.position, saved.spec, &saved.values)
            .unwrap();
        assert_eq!(store.get_value("c0", "k_deg"), CellValue::text("0.1"));
    }

    #[test]
    fn test_simulation_table_is_read_only() {
        let mut store = TableStore::new(TableKind::Simulation);
        assert!(matches!(
            store.insert_rows(vec![("r0".to_string(), vec![])]),
            Err(Error::ReadOnly(TableKind::Simulation))
        ));
    }

    #[test]
    fn test_generate_keys_skips_taken() {
        let mut store = TableStore::new(TableKind::Measurement);
        store
            .insert_rows(vec![("new_measurement_0".to_string(), vec![])])
            .unwrap();
        let keys = store.generate_keys(2);
        assert_eq!(keys, vec!["new_measurement_1", "new_measurement_2"]);
    }

    #[test]
    fn test_dirty_and_generation_tracking() {
        let mut store = observable_store();
        store.clear_dirty();
        let generation = store.edit_generation();
        store
            .set_value("obs_a", "observableFormula", CellValue::text("y"))
            .unwrap();
        assert!(store.is_dirty());
        assert!(store.edit_generation() > generation);
    }

    #[test]
    fn test_bulk_set_emits_one_event() {
        let mut store = observable_store();
        store.take_events();
        store
            .set_values_bulk(&[
                (
                    "obs_a".to_string(),
                    "observableFormula".to_string(),
                    CellValue::text("a"),
                ),
                (
                    "obs_b".to_string(),
                    "observableFormula".to_string(),
                    CellValue::text("b"),
                ),
            ])
            .unwrap();
        let events = store.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ChangeEvent::ValueChanged { cells, .. } if cells.len() == 2
        ));
    }

    /// Row insert/remove operation for the sentinel property test
    #[derive(Debug, Clone)]
    enum RowOp {
        Insert(u8),
        Remove(u8),
    }

    proptest! {
        #[test]
        fn sentinel_invariant_holds_for_any_op_sequence(
            ops in proptest::collection::vec(
                prop_oneof![
                    (0u8..64).prop_map(RowOp::Insert),
                    (0u8..64).prop_map(RowOp::Remove),
                ],
                0..32,
            )
        ) {
            let mut store = TableStore::new(TableKind::Condition);
            for op in ops {
                match op {
                    RowOp::Insert(n) => {
                        let key = format!("c{}", n);
                        let _ = store.insert_rows(vec![(key, vec![])]);
                    }
                    RowOp::Remove(n) => {
                        let key = format!("c{}", n);
                        let _ = store.remove_rows(&[key]);
                    }
                }
                // sentinel present, last, and not a data row
                let sentinel = store.sentinel_key().to_string();
                prop_assert_eq!(store.rows.last().unwrap().key(), sentinel.as_str());
                prop_assert!(!store.has_row(&sentinel));
                prop_assert_eq!(store.data_row_count() + 1, store.rows.len());
                prop_assert!(!store.unique_values("conditionId").contains(&sentinel));
            }
        }
    }
}
