//! The set of stores making up one PEtab problem

use crate::event::ChangeEvent;
use crate::schema::TableKind;
use crate::store::TableStore;

/// All table stores of a loaded problem.
///
/// The simulation store is a read-only derived view and only present when
/// simulation results have been attached.
#[derive(Debug)]
pub struct Tables {
    pub measurement: TableStore,
    pub observable: TableStore,
    pub parameter: TableStore,
    pub condition: TableStore,
    pub simulation: Option<TableStore>,
}

impl Tables {
    /// Empty problem with built-in schemas
    pub fn new() -> Self {
        Self {
            measurement: TableStore::new(TableKind::Measurement),
            observable: TableStore::new(TableKind::Observable),
            parameter: TableStore::new(TableKind::Parameter),
            condition: TableStore::new(TableKind::Condition),
            simulation: None,
        }
    }

    pub fn get(&self, kind: TableKind) -> Option<&TableStore> {
        match kind {
            TableKind::Measurement => Some(&self.measurement),
            TableKind::Observable => Some(&self.observable),
            TableKind::Parameter => Some(&self.parameter),
            TableKind::Condition => Some(&self.condition),
            TableKind::Simulation => self.simulation.as_ref(),
        }
    }

    pub fn get_mut(&mut self, kind: TableKind) -> Option<&mut TableStore> {
        match kind {
            TableKind::Measurement => Some(&mut self.measurement),
            TableKind::Observable => Some(&mut self.observable),
            TableKind::Parameter => Some(&mut self.parameter),
            TableKind::Condition => Some(&mut self.condition),
            TableKind::Simulation => self.simulation.as_mut(),
        }
    }

    /// The editable stores, in schema order
    pub fn editable(&self) -> [&TableStore; 4] {
        [
            &self.measurement,
            &self.observable,
            &self.parameter,
            &self.condition,
        ]
    }

    /// True if any store holds unsaved changes
    pub fn any_dirty(&self) -> bool {
        self.editable().iter().any(|s| s.is_dirty())
    }

    /// Clear unsaved-changes flags on every store (after save/load)
    pub fn clear_dirty(&mut self) {
        self.measurement.clear_dirty();
        self.observable.clear_dirty();
        self.parameter.clear_dirty();
        self.condition.clear_dirty();
    }

    /// Drain queued notifications from every store, in table order
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        events.append(&mut self.measurement.take_events());
        events.append(&mut self.observable.take_events());
        events.append(&mut self.parameter.take_events());
        events.append(&mut self.condition.take_events());
        if let Some(simulation) = &mut self.simulation {
            events.append(&mut simulation.take_events());
        }
        events
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}
