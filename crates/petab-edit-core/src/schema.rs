//! Table kinds, column schemas, and the static column registry
//!
//! Column names and per-column types follow the PEtab table format; the
//! registry is the fixed wire-format contract every other module keys off.

use std::fmt;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The logical table kinds of a PEtab problem.
///
/// `Simulation` is a read-only derived variant of the measurement table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Measurement,
    Observable,
    Parameter,
    Condition,
    Simulation,
}

impl TableKind {
    /// All kinds with their own backing store
    pub const ALL: [TableKind; 5] = [
        TableKind::Measurement,
        TableKind::Observable,
        TableKind::Parameter,
        TableKind::Condition,
        TableKind::Simulation,
    ];

    /// The identifier column that doubles as the row key, if this table
    /// kind is identifier-keyed. Measurement and simulation rows carry
    /// synthetic keys instead.
    pub fn id_column(&self) -> Option<&'static str> {
        match self {
            TableKind::Observable => Some("observableId"),
            TableKind::Parameter => Some("parameterId"),
            TableKind::Condition => Some("conditionId"),
            TableKind::Measurement | TableKind::Simulation => None,
        }
    }

    /// Stable name used in settings keys and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Measurement => "measurement",
            TableKind::Observable => "observable",
            TableKind::Parameter => "parameter",
            TableKind::Condition => "condition",
            TableKind::Simulation => "simulation",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared value kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "text"),
            ColumnKind::Numeric => write!(f, "numeric"),
        }
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub optional: bool,
}

impl ColumnSpec {
    pub fn new<S: Into<String>>(name: S, kind: ColumnKind, optional: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            optional,
        }
    }

    /// A user-defined extra column: free text, never required
    pub fn extra<S: Into<String>>(name: S) -> Self {
        Self::new(name, ColumnKind::Text, true)
    }
}

/// Ordered list of columns for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Schema holding the required built-in columns of a table kind.
    /// Optional columns are only added once data or the user asks for them.
    pub fn builtin(kind: TableKind) -> Self {
        let columns = registry(kind)
            .iter()
            .filter(|c| !c.optional)
            .cloned()
            .collect();
        Self { columns }
    }

    pub fn from_columns(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub(crate) fn insert(&mut self, position: usize, spec: ColumnSpec) {
        let position = position.min(self.columns.len());
        self.columns.insert(position, spec);
    }

    pub(crate) fn remove(&mut self, position: usize) -> ColumnSpec {
        self.columns.remove(position)
    }
}

/// Look up the declared spec for a known column of a table kind.
///
/// Columns absent from the registry are user-defined extras (condition
/// tables may carry arbitrary model-entity override columns).
pub fn known_column(kind: TableKind, name: &str) -> Option<&'static ColumnSpec> {
    REGISTRY.get(&kind).and_then(|cols| {
        cols.iter().find(|c| c.name == name)
    })
}

/// Resolve the spec for a column being added at runtime
pub fn column_spec_for(kind: TableKind, name: &str) -> ColumnSpec {
    known_column(kind, name)
        .cloned()
        .unwrap_or_else(|| ColumnSpec::extra(name))
}

/// Static tooltip text for a known column, for completion/help surfaces
pub fn tooltip(kind: TableKind, column: &str) -> Option<&'static str> {
    TOOLTIPS.get(&(kind, column)).copied()
}

fn registry(kind: TableKind) -> &'static [ColumnSpec] {
    REGISTRY.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
}

static REGISTRY: Lazy<AHashMap<TableKind, Vec<ColumnSpec>>> = Lazy::new(|| {
    use ColumnKind::{Numeric, Text};
    let mut m = AHashMap::new();
    let measurement_like = |value_column: &str| {
        vec![
            ColumnSpec::new("observableId", Text, false),
            ColumnSpec::new("preequilibrationConditionId", Text, true),
            ColumnSpec::new("simulationConditionId", Text, false),
            ColumnSpec::new("time", Numeric, false),
            ColumnSpec::new(value_column, Numeric, false),
            ColumnSpec::new("observableParameters", Text, true),
            ColumnSpec::new("noiseParameters", Text, true),
            ColumnSpec::new("datasetId", Text, true),
            ColumnSpec::new("replicateId", Text, true),
        ]
    };
    m.insert(TableKind::Measurement, measurement_like("measurement"));
    m.insert(TableKind::Simulation, measurement_like("simulation"));
    m.insert(
        TableKind::Observable,
        vec![
            ColumnSpec::new("observableId", Text, false),
            ColumnSpec::new("observableName", Text, true),
            ColumnSpec::new("observableFormula", Text, false),
            ColumnSpec::new("observableTransformation", Text, true),
            ColumnSpec::new("noiseFormula", Text, false),
            ColumnSpec::new("noiseDistribution", Text, true),
        ],
    );
    m.insert(
        TableKind::Parameter,
        vec![
            ColumnSpec::new("parameterId", Text, false),
            ColumnSpec::new("parameterName", Text, true),
            ColumnSpec::new("parameterScale", Text, false),
            ColumnSpec::new("lowerBound", Numeric, false),
            ColumnSpec::new("upperBound", Numeric, false),
            ColumnSpec::new("nominalValue", Numeric, false),
            ColumnSpec::new("estimate", Text, false),
            ColumnSpec::new("initializationPriorType", Text, true),
            ColumnSpec::new("initializationPriorParameters", Text, true),
            ColumnSpec::new("objectivePriorType", Text, true),
            ColumnSpec::new("objectivePriorParameters", Text, true),
        ],
    );
    m.insert(
        TableKind::Condition,
        vec![
            ColumnSpec::new("conditionId", Text, false),
            ColumnSpec::new("conditionName", Text, true),
        ],
    );
    m
});

static TOOLTIPS: Lazy<AHashMap<(TableKind, &'static str), &'static str>> = Lazy::new(|| {
    let mut m = AHashMap::new();
    m.insert(
        (TableKind::Measurement, "observableId"),
        "Identifier of an observable defined in the observable table",
    );
    m.insert(
        (TableKind::Measurement, "simulationConditionId"),
        "Identifier of the simulation condition for this measurement",
    );
    m.insert(
        (TableKind::Measurement, "preequilibrationConditionId"),
        "Optional condition used for pre-equilibration",
    );
    m.insert((TableKind::Measurement, "time"), "Measurement time point");
    m.insert(
        (TableKind::Observable, "observableFormula"),
        "Observation function as a model expression",
    );
    m.insert(
        (TableKind::Observable, "noiseFormula"),
        "Noise model; a number is interpreted as a constant standard deviation",
    );
    m.insert(
        (TableKind::Parameter, "parameterScale"),
        "Scale of the parameter: lin, log, or log10",
    );
    m.insert(
        (TableKind::Parameter, "estimate"),
        "1 if the parameter is estimated, 0 if fixed",
    );
    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schema_has_only_required_columns() {
        let schema = TableSchema::builtin(TableKind::Measurement);
        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(
            names,
            vec![
                "observableId",
                "simulationConditionId",
                "time",
                "measurement"
            ]
        );
    }

    #[test]
    fn test_id_columns() {
        assert_eq!(TableKind::Observable.id_column(), Some("observableId"));
        assert_eq!(TableKind::Measurement.id_column(), None);
    }

    #[test]
    fn test_unknown_column_falls_back_to_extra() {
        let spec = column_spec_for(TableKind::Condition, "k_deg");
        assert_eq!(spec.kind, ColumnKind::Text);
        assert!(spec.optional);

        let spec = column_spec_for(TableKind::Measurement, "noiseParameters");
        assert_eq!(spec.kind, ColumnKind::Text);
        assert!(spec.optional);
    }

    #[test]
    fn test_tooltip_registry() {
        assert!(tooltip(TableKind::Parameter, "estimate").is_some());
        assert!(tooltip(TableKind::Parameter, "nope").is_none());
    }
}
