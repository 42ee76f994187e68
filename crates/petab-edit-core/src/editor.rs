//! The problem editor: user actions over the table stores
//!
//! [`ProblemEditor`] is the entry point UI collaborators talk to. It owns
//! the stores, the command log, per-table validity trackers, and the
//! default-value configurations, and it is where cross-table concerns
//! live: rename propagation, dangling-reference detection, and the
//! problem-wide dirty flag. Every mutation goes through the command log,
//! so each user action is exactly one undo step.

use ahash::{AHashMap, AHashSet};

use crate::command::{CellEdit, Command, CommandLog};
use crate::defaults::{DefaultConfig, ModelLookup};
use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::links;
use crate::schema::{column_spec_for, TableKind};
use crate::settings::SettingsStore;
use crate::store::TableStore;
use crate::tables::Tables;
use crate::validity::{ApplyOutcome, ConsistencyChecker, ValidityTracker};
use crate::value::CellValue;

/// Editable state of one PEtab problem
pub struct ProblemEditor {
    tables: Tables,
    commands: CommandLog,
    validity: AHashMap<TableKind, ValidityTracker>,
    defaults: AHashMap<TableKind, DefaultConfig>,
    model: Option<Box<dyn ModelLookup>>,
    /// Dangling identifiers awaiting a create-or-dismiss decision,
    /// keyed by (target table, identifier)
    pending_dangling: AHashSet<(TableKind, String)>,
    /// Last problem-wide dirty state we notified about
    notified_dirty: bool,
    events: Vec<ChangeEvent>,
}

impl ProblemEditor {
    /// Empty problem with built-in schemas and default configurations
    pub fn new() -> Self {
        Self::from_tables(Tables::new())
    }

    pub fn from_tables(tables: Tables) -> Self {
        let defaults = TableKind::ALL
            .iter()
            .filter(|k| **k != TableKind::Simulation)
            .map(|&kind| (kind, DefaultConfig::builtin(kind)))
            .collect();
        let validity = TableKind::ALL
            .iter()
            .map(|&kind| (kind, ValidityTracker::new()))
            .collect();
        Self {
            tables,
            commands: CommandLog::new(),
            validity,
            defaults,
            model: None,
            pending_dangling: AHashSet::new(),
            notified_dirty: false,
            events: Vec::new(),
        }
    }

    /// Load default-value configurations from settings (built-ins are used
    /// for absent or unparseable entries).
    pub fn load_settings(&mut self, settings: &dyn SettingsStore) {
        self.defaults = crate::settings::load_default_configs(settings);
    }

    /// Attach a model for model-derived defaults
    pub fn set_model(&mut self, model: Box<dyn ModelLookup>) {
        self.model = Some(model);
    }

    /// Attach read-only simulation results
    pub fn attach_simulation(&mut self, store: TableStore) {
        self.tables.simulation = Some(store);
        self.events.push(ChangeEvent::Structural {
            table: TableKind::Simulation,
            rows: None,
        });
    }

    // === Accessors ===

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn table(&self, kind: TableKind) -> Option<&TableStore> {
        self.tables.get(kind)
    }

    pub fn validity(&self, kind: TableKind) -> &ValidityTracker {
        &self.validity[&kind]
    }

    pub fn default_config(&self, kind: TableKind) -> Option<&DefaultConfig> {
        self.defaults.get(&kind)
    }

    pub fn set_default_config(&mut self, kind: TableKind, config: DefaultConfig) {
        self.defaults.insert(kind, config);
    }

    pub fn is_dirty(&self) -> bool {
        self.tables.any_dirty()
    }

    /// Reset the dirty state after a save
    pub fn mark_saved(&mut self) {
        self.tables.clear_dirty();
        self.notify_dirty();
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.commands.undo_depth()
    }

    /// Drain queued notifications, store events first
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        let mut events = self.tables.take_events();
        events.append(&mut self.events);
        events
    }

    // === Cell edits ===

    /// Apply one user edit from raw input.
    ///
    /// Editing the sentinel row materializes a real row with defaults;
    /// editing the identifier column renames the row and rewrites every
    /// reference to it. Either way the action is one undo step.
    pub fn set_cell(&mut self, table: TableKind, row_key: &str, column: &str, raw: &str) -> Result<()> {
        let store = self.store(table)?;
        if store.is_read_only() {
            return Err(Error::ReadOnly(table));
        }
        if store.is_sentinel(row_key) {
            return self.materialize_sentinel(table, column, raw);
        }
        if !store.has_row(row_key) {
            return Err(Error::RowNotFound(row_key.to_string()));
        }
        if store.kind().id_column() == Some(column) {
            return self.rename_id(table, row_key, raw);
        }

        let spec = store
            .schema()
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        let new = CellValue::parse(raw).coerce(column, spec.kind)?;
        let old = store.get_value(row_key, column);
        if new == old {
            // re-entering the current value is still a touch: the linter
            // flag clears without a new undo step
            if self.tracker_mut(table).clear_cell(row_key, column) {
                self.events.push(ChangeEvent::ValidityChanged { table });
            }
            return Ok(());
        }
        let edit = CellEdit {
            row_key: row_key.to_string(),
            column: column.to_string(),
            old,
            new: new.clone(),
        };
        self.commands.execute(
            Command::SetCells {
                table,
                edits: vec![edit],
            },
            &mut self.tables,
        )?;
        self.after_cell_edit(table, row_key, column, &new);
        self.notify_dirty();
        Ok(())
    }

    /// Typing into the sentinel row creates a real row: the typed value is
    /// the seed, remaining columns come from the default configuration.
    fn materialize_sentinel(&mut self, table: TableKind, column: &str, raw: &str) -> Result<()> {
        let value = CellValue::parse(raw);
        if value.is_empty() {
            return Ok(());
        }
        let store = self.store(table)?;
        let spec = store
            .schema()
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;

        let (key, seed) = if store.kind().id_column() == Some(column) {
            (value.to_string(), Vec::new())
        } else {
            let value = value.coerce(column, spec.kind)?;
            let key = store.generate_keys(1).remove(0);
            (key, vec![(column.to_string(), value)])
        };
        if store.has_row(&key) {
            return Err(Error::DuplicateKey(key));
        }

        let config = self.defaults.get(&table).cloned().unwrap_or_default();
        let mut values = config.resolve_row(store, &key, &seed, self.model.as_deref());
        let seeded_column = seed.first().map(|(c, _)| c.clone());
        values.extend(seed);

        self.commands.execute(
            Command::InsertRows {
                table,
                rows: vec![(key.clone(), values)],
            },
            &mut self.tables,
        )?;
        if let Some(column) = seeded_column {
            let value = self.store(table)?.get_value(&key, &column);
            self.after_cell_edit(table, &key, &column, &value);
        }
        self.notify_dirty();
        Ok(())
    }

    /// Rename an identifier row and rewrite every reference to it, as one
    /// undo step. Refused while a dangling identifier awaits resolution,
    /// since resolving it could race the rename.
    pub fn rename_id(&mut self, table: TableKind, old_key: &str, new_key: &str) -> Result<()> {
        if old_key == new_key {
            return Ok(());
        }
        if let Some((_, pending)) = self.pending_dangling.iter().next() {
            return Err(Error::RenamePending(pending.clone()));
        }

        let mut commands = vec![Command::RenameRow {
            table,
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
        }];
        for link in links::referencing(table) {
            let Some(source) = self.tables.get(link.source) else {
                continue;
            };
            if source.is_read_only() {
                continue;
            }
            let edits: Vec<CellEdit> = source
                .rows()
                .filter(|row| row.get(link.column) == CellValue::text(old_key))
                .map(|row| CellEdit {
                    row_key: row.key().to_string(),
                    column: link.column.to_string(),
                    old: CellValue::text(old_key),
                    new: CellValue::text(new_key),
                })
                .collect();
            if !edits.is_empty() {
                commands.push(Command::SetCells {
                    table: link.source,
                    edits,
                });
            }
        }

        let command = if commands.len() == 1 {
            commands.remove(0)
        } else {
            Command::Batch(commands)
        };
        self.commands.execute(command, &mut self.tables)?;
        log::info!("renamed {} '{}' to '{}'", table, old_key, new_key);

        if self.tracker_mut(table).clear_row(old_key) {
            self.events.push(ChangeEvent::ValidityChanged { table });
        }
        self.notify_dirty();
        Ok(())
    }

    /// Paste a rectangle of raw text with its top-left corner at
    /// (`start_row`, `start_column`). Cells that fail type coercion or
    /// fall outside the column layout are skipped with a warning; rows
    /// below the last data row are created with defaults. The whole paste
    /// is one undo step. Returns the number of cells applied.
    pub fn paste_block(
        &mut self,
        table: TableKind,
        start_row: usize,
        start_column: usize,
        block: &[Vec<String>],
    ) -> Result<usize> {
        let store = self.store(table)?;
        if store.is_read_only() {
            return Err(Error::ReadOnly(table));
        }
        let schema = store.schema().clone();
        let id_column = store.kind().id_column();
        let existing_keys: Vec<String> = store.row_keys().map(str::to_string).collect();
        let data_rows = store.data_row_count();

        let new_row_count = (start_row + block.len()).saturating_sub(data_rows);
        let mut generated = store.generate_keys(new_row_count).into_iter();

        let mut edits: Vec<CellEdit> = Vec::new();
        let mut new_rows: Vec<(String, Vec<(String, CellValue)>)> = Vec::new();
        let mut link_writes: Vec<(String, String)> = Vec::new();
        let mut cleared = false;
        let mut applied = 0usize;

        for (r, row) in block.iter().enumerate() {
            let target = start_row + r;
            let is_new = target >= data_rows;
            let mut key = if is_new {
                generated.next().ok_or(Error::EmptyKey)?
            } else {
                existing_keys[target].clone()
            };

            let mut seed: Vec<(String, CellValue)> = Vec::new();
            for (c, text) in row.iter().enumerate() {
                let Some(spec) = schema.columns().get(start_column + c) else {
                    log::warn!("paste into {}: column {} out of range, skipping", table, start_column + c);
                    continue;
                };
                if id_column == Some(spec.name.as_str()) {
                    if is_new && !text.is_empty() {
                        key = text.clone();
                    } else if !is_new {
                        log::warn!("paste into {}: skipping identifier column '{}'", table, spec.name);
                    }
                    continue;
                }
                let value = match CellValue::parse(text).coerce(&spec.name, spec.kind) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("paste into {}: {}", table, e);
                        continue;
                    }
                };
                if !value.is_empty() && links::for_column(table, &spec.name).is_some() {
                    link_writes.push((spec.name.clone(), value.to_string()));
                }
                if is_new {
                    seed.push((spec.name.clone(), value));
                } else {
                    // clear the linter flag up front; the new value gets a
                    // fresh verdict from the next check run
                    cleared |= self.tracker_mut(table).clear_cell(&key, &spec.name);
                    edits.push(CellEdit {
                        row_key: key.clone(),
                        column: spec.name.clone(),
                        old: CellValue::Empty, // filled below
                        new: value,
                    });
                }
                applied += 1;
            }
            if is_new {
                new_rows.push((key, seed));
            }
        }

        // refuse key collisions up front so the batch applies atomically
        let store = self.store(table)?;
        for (key, _) in &new_rows {
            if store.has_row(key) {
                return Err(Error::DuplicateKey(key.clone()));
            }
        }
        for edit in &mut edits {
            edit.old = store.get_value(&edit.row_key, &edit.column);
        }
        let config = self.defaults.get(&table).cloned().unwrap_or_default();
        let new_rows: Vec<_> = new_rows
            .into_iter()
            .map(|(key, seed)| {
                let mut values = config.resolve_row(store, &key, &seed, self.model.as_deref());
                values.extend(seed);
                (key, values)
            })
            .collect();

        let mut commands = Vec::new();
        if !new_rows.is_empty() {
            commands.push(Command::InsertRows {
                table,
                rows: new_rows,
            });
        }
        if !edits.is_empty() {
            commands.push(Command::SetCells { table, edits });
        }
        if commands.is_empty() {
            return Ok(0);
        }
        let command = if commands.len() == 1 {
            commands.remove(0)
        } else {
            Command::Batch(commands)
        };
        self.commands.execute(command, &mut self.tables)?;

        if cleared {
            self.events.push(ChangeEvent::ValidityChanged { table });
        }
        for (column, id) in link_writes {
            self.detect_dangling(table, &column, &id);
        }
        self.notify_dirty();
        Ok(applied)
    }

    // === Row and column actions ===

    /// Append a row with a generated key and resolved defaults
    pub fn add_row(&mut self, table: TableKind) -> Result<String> {
        let store = self.store(table)?;
        let key = store.generate_keys(1).remove(0);
        let config = self.defaults.get(&table).cloned().unwrap_or_default();
        let values = config.resolve_row(store, &key, &[], self.model.as_deref());
        self.commands.execute(
            Command::InsertRows {
                table,
                rows: vec![(key.clone(), values)],
            },
            &mut self.tables,
        )?;
        self.notify_dirty();
        Ok(key)
    }

    /// Append many rows at once (the data-matrix import path). Each row
    /// is (column, raw text) pairs; values are coerced strictly, keys are
    /// generated unless the identifier column is supplied, defaults fill
    /// the remaining columns. The whole import is one undo step.
    /// Returns the new row keys.
    pub fn append_rows(
        &mut self,
        table: TableKind,
        rows: &[Vec<(String, String)>],
    ) -> Result<Vec<String>> {
        let store = self.store(table)?;
        if store.is_read_only() {
            return Err(Error::ReadOnly(table));
        }
        let id_column = store.kind().id_column();
        let generated = store.generate_keys(rows.len());
        let config = self.defaults.get(&table).cloned().unwrap_or_default();

        let mut keys = Vec::with_capacity(rows.len());
        let mut payload = Vec::with_capacity(rows.len());
        let mut link_writes: Vec<(String, String)> = Vec::new();
        for (generated_key, row) in generated.into_iter().zip(rows) {
            let mut key = generated_key;
            let mut seed = Vec::new();
            for (column, raw) in row {
                if id_column == Some(column.as_str()) {
                    if !raw.is_empty() {
                        key = raw.clone();
                    }
                    continue;
                }
                let spec = store
                    .schema()
                    .get(column)
                    .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
                let value = CellValue::parse(raw).coerce(column, spec.kind)?;
                if !value.is_empty() {
                    if links::for_column(table, column).is_some() {
                        link_writes.push((column.clone(), value.to_string()));
                    }
                    seed.push((column.clone(), value));
                }
            }
            if store.has_row(&key) {
                return Err(Error::DuplicateKey(key));
            }
            let mut values = config.resolve_row(store, &key, &seed, self.model.as_deref());
            values.extend(seed);
            keys.push(key.clone());
            payload.push((key, values));
        }

        self.commands
            .execute(Command::InsertRows { table, rows: payload }, &mut self.tables)?;
        for (column, id) in link_writes {
            self.detect_dangling(table, &column, &id);
        }
        self.notify_dirty();
        Ok(keys)
    }

    /// Remove rows by key, as one undo step
    pub fn remove_rows(&mut self, table: TableKind, keys: &[String]) -> Result<()> {
        let store = self.store(table)?;
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            let position = match store.row_position(key) {
                Some(p) => p,
                None if store.is_sentinel(key) => return Err(Error::SentinelRow),
                None => return Err(Error::RowNotFound(key.clone())),
            };
            saved.push(crate::store::SavedRow {
                position,
                key: key.clone(),
                values: Vec::new(), // refreshed when the command applies
            });
        }
        self.commands
            .execute(Command::RemoveRows { table, saved }, &mut self.tables)?;

        let mut cleared = false;
        for key in keys {
            cleared |= self.tracker_mut(table).clear_row(key);
        }
        if cleared {
            self.events.push(ChangeEvent::ValidityChanged { table });
        }
        self.notify_dirty();
        Ok(())
    }

    /// Add a column; known columns get their declared type, anything else
    /// is a free-text extra.
    pub fn add_column(&mut self, table: TableKind, name: &str) -> Result<()> {
        let spec = column_spec_for(table, name);
        self.commands
            .execute(Command::AddColumn { table, spec }, &mut self.tables)?;
        self.notify_dirty();
        Ok(())
    }

    pub fn remove_column(&mut self, table: TableKind, name: &str) -> Result<()> {
        let store = self.store(table)?;
        let position = store
            .schema()
            .position(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        let spec = store.schema().columns()[position].clone();
        self.commands.execute(
            Command::RemoveColumn {
                table,
                saved: crate::store::SavedColumn {
                    position,
                    spec,
                    values: Vec::new(), // refreshed when the command applies
                },
            },
            &mut self.tables,
        )?;
        self.notify_dirty();
        Ok(())
    }

    // === Undo/redo ===

    pub fn undo(&mut self) -> Result<bool> {
        let undone = self.commands.undo(&mut self.tables)?;
        if undone {
            self.notify_dirty();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let redone = self.commands.redo(&mut self.tables)?;
        if redone {
            self.notify_dirty();
        }
        Ok(redone)
    }

    // === Find and replace ===

    /// Cells whose rendered value contains `needle`, in display order
    pub fn find(&self, table: TableKind, needle: &str) -> Vec<(String, String)> {
        let Some(store) = self.tables.get(table) else {
            return Vec::new();
        };
        let mut hits = Vec::new();
        for row in store.rows() {
            for column in store.schema().column_names() {
                let value = store.get_value(row.key(), column);
                if !value.is_empty() && value.to_string().contains(needle) {
                    hits.push((row.key().to_string(), column.to_string()));
                }
            }
        }
        hits
    }

    /// Replace `needle` with `replacement` in every matching cell, as one
    /// undo step. Identifier cells and cells whose replacement fails type
    /// coercion are skipped with a warning. Returns the replaced count.
    pub fn replace_all(&mut self, table: TableKind, needle: &str, replacement: &str) -> Result<usize> {
        let store = self.store(table)?;
        if store.is_read_only() {
            return Err(Error::ReadOnly(table));
        }
        if needle.is_empty() {
            return Ok(0);
        }
        let id_column = store.kind().id_column();
        let mut edits = Vec::new();
        for row in store.rows() {
            for spec in store.schema().columns() {
                if id_column == Some(spec.name.as_str()) {
                    continue;
                }
                let old = store.get_value(row.key(), &spec.name);
                let rendered = old.to_string();
                if old.is_empty() || !rendered.contains(needle) {
                    continue;
                }
                let replaced = rendered.replace(needle, replacement);
                match CellValue::parse(&replaced).coerce(&spec.name, spec.kind) {
                    Ok(new) => edits.push(CellEdit {
                        row_key: row.key().to_string(),
                        column: spec.name.clone(),
                        old,
                        new,
                    }),
                    Err(e) => log::warn!("replace in {}: {}", table, e),
                }
            }
        }
        if edits.is_empty() {
            return Ok(0);
        }
        let count = edits.len();
        self.commands
            .execute(Command::SetCells { table, edits }, &mut self.tables)?;
        self.notify_dirty();
        Ok(count)
    }

    // === Dangling references ===

    /// Dangling identifiers awaiting a create-or-dismiss decision
    pub fn pending_dangling(&self) -> impl Iterator<Item = (TableKind, &str)> {
        self.pending_dangling.iter().map(|(t, v)| (*t, v.as_str()))
    }

    /// Create the missing identifier row a dangling reference points at,
    /// with resolved defaults, as its own undo step.
    pub fn confirm_add_identifier(&mut self, target: TableKind, id: &str) -> Result<()> {
        self.pending_dangling.remove(&(target, id.to_string()));
        let store = self.store(target)?;
        if store.has_row(id) {
            return Ok(());
        }
        let config = self.defaults.get(&target).cloned().unwrap_or_default();
        let values = config.resolve_row(store, id, &[], self.model.as_deref());
        self.commands.execute(
            Command::InsertRows {
                table: target,
                rows: vec![(id.to_string(), values)],
            },
            &mut self.tables,
        )?;
        log::info!("created missing {} '{}'", target, id);
        self.notify_dirty();
        Ok(())
    }

    /// Leave a dangling reference in place (the user declined to create it)
    pub fn dismiss_dangling(&mut self, target: TableKind, id: &str) {
        self.pending_dangling.remove(&(target, id.to_string()));
    }

    // === Consistency checks ===

    /// Run the checker over every table and fold the results into the
    /// validity trackers. A checker failure leaves flags unchanged.
    pub fn run_checks(&mut self, checker: &dyn ConsistencyChecker) {
        for kind in TableKind::ALL {
            let Some(store) = self.tables.get(kind) else {
                continue;
            };
            let tracker = match self.validity.get_mut(&kind) {
                Some(t) => t,
                None => continue,
            };
            let ticket = tracker.begin_check(store);
            let findings = match checker.check(store) {
                Ok(findings) => findings,
                Err(e) => {
                    log::warn!("consistency check failed for {} table: {}", kind, e);
                    continue;
                }
            };
            match tracker.apply(store, ticket, findings) {
                ApplyOutcome::Stale => {}
                ApplyOutcome::Applied { changed, messages } => {
                    if changed {
                        self.events.push(ChangeEvent::ValidityChanged { table: kind });
                    }
                    for message in messages {
                        self.events.push(ChangeEvent::CheckMessage {
                            table: kind,
                            message,
                        });
                    }
                }
            }
        }
    }

    // === Internal ===

    fn store(&self, kind: TableKind) -> Result<&TableStore> {
        self.tables.get(kind).ok_or(Error::ReadOnly(kind))
    }

    fn tracker_mut(&mut self, kind: TableKind) -> &mut ValidityTracker {
        self.validity.entry(kind).or_default()
    }

    /// Post-edit bookkeeping: clear the cell's linter flag and flag a
    /// dangling reference if the cell names an unknown identifier.
    fn after_cell_edit(&mut self, table: TableKind, row_key: &str, column: &str, value: &CellValue) {
        if self.tracker_mut(table).clear_cell(row_key, column) {
            self.events.push(ChangeEvent::ValidityChanged { table });
        }
        if !value.is_empty() {
            self.detect_dangling(table, column, &value.to_string());
        }
    }

    /// Flag a link-column value the target table does not define
    fn detect_dangling(&mut self, table: TableKind, column: &str, id: &str) {
        let Some(link) = links::for_column(table, column) else {
            return;
        };
        let known = self
            .tables
            .get(link.target)
            .map(|t| t.has_row(id))
            .unwrap_or(false);
        if !known && self.pending_dangling.insert((link.target, id.to_string())) {
            self.events.push(ChangeEvent::DanglingReference {
                table,
                column: column.to_string(),
                value: id.to_string(),
            });
        }
    }

    fn notify_dirty(&mut self) {
        let dirty = self.tables.any_dirty();
        if dirty != self.notified_dirty {
            self.notified_dirty = dirty;
            self.events.push(ChangeEvent::DirtyChanged { dirty });
        }
    }
}

impl Default for ProblemEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProblemEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemEditor")
            .field("tables", &self.tables)
            .field("dirty", &self.tables.any_dirty())
            .field("undo_depth", &self.commands.undo_depth())
            .finish_non_exhaustive()
    }
}
