//! Default values for newly created rows
//!
//! When a user edit materializes the sentinel row into a real row, the
//! remaining columns are filled from a per-table configuration of
//! [`DefaultStrategy`]s. Configurations are serde payloads so they can be
//! persisted in settings; an unrecognized strategy name fails
//! deserialization and the built-in configuration is used instead.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::TableKind;
use crate::store::TableStore;
use crate::value::CellValue;

/// Read access to the attached model, for defaults derived from it
/// (e.g. a parameter's nominal value from the SBML document).
pub trait ModelLookup {
    /// Value of a model parameter, if the model defines one with this id
    fn parameter_value(&self, id: &str) -> Option<f64>;
}

/// How to produce a default value for one column of a new row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DefaultStrategy {
    /// Leave the cell empty
    NoDefault,

    /// Use the configured `default_value` verbatim
    UseDefault,

    /// Copy from another column of the same row (the identifier column
    /// copies the row key), optionally with a fixed prefix.
    CopyFrom {
        source_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    /// Minimum over the column's existing values, floored at `min_cap`
    UseColumnMin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_cap: Option<f64>,
    },

    /// Maximum over the column's existing values, capped at `max_cap`
    UseColumnMax {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_cap: Option<f64>,
    },

    /// The most frequent existing value of a column; ties go to the value
    /// that appears latest, so recent entries win.
    UseMostFrequent { source_column: String },

    /// Look the row key up in the attached model
    SbmlLookup,
}

/// Strategy plus fallback for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefault {
    #[serde(flatten)]
    pub strategy: DefaultStrategy,

    /// Used when the strategy yields nothing (empty source column, no
    /// model attached, ...).
    #[serde(default, skip_serializing_if = "CellValue::is_empty")]
    pub default_value: CellValue,
}

impl ColumnDefault {
    pub fn new(strategy: DefaultStrategy, default_value: CellValue) -> Self {
        Self {
            strategy,
            default_value,
        }
    }

    fn fallback(strategy: DefaultStrategy) -> Self {
        Self::new(strategy, CellValue::Empty)
    }

    /// Resolve this column's default for a row about to be created.
    ///
    /// `seed` holds the values the user action already supplies; the row
    /// does not exist in the store yet, so column-derived strategies read
    /// the existing rows only. `column` is the column this default is
    /// attached to, which the min/max strategies derive from.
    pub fn resolve(
        &self,
        store: &TableStore,
        column: &str,
        row_key: &str,
        seed: &[(String, CellValue)],
        model: Option<&dyn ModelLookup>,
    ) -> CellValue {
        let resolved = match &self.strategy {
            DefaultStrategy::NoDefault => CellValue::Empty,
            DefaultStrategy::UseDefault => self.default_value.clone(),
            DefaultStrategy::CopyFrom {
                source_column,
                prefix,
            } => {
                let source = if store.kind().id_column() == Some(source_column.as_str()) {
                    CellValue::text(row_key)
                } else {
                    seed_value(seed, source_column)
                };
                match source {
                    CellValue::Empty => CellValue::Empty,
                    other => match prefix {
                        Some(prefix) => CellValue::Text(format!("{}{}", prefix, other)),
                        None => CellValue::text(other.to_string()),
                    },
                }
            }
            DefaultStrategy::UseColumnMin { min_cap } => numeric_extreme(store, column, f64::min)
                .map(|n| min_cap.map_or(n, |cap| n.max(cap)))
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
            DefaultStrategy::UseColumnMax { max_cap } => numeric_extreme(store, column, f64::max)
                .map(|n| max_cap.map_or(n, |cap| n.min(cap)))
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
            DefaultStrategy::UseMostFrequent { source_column } => {
                most_frequent(store, source_column)
            }
            DefaultStrategy::SbmlLookup => model
                .and_then(|m| m.parameter_value(row_key))
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
        };
        if resolved.is_empty() {
            self.default_value.clone()
        } else {
            resolved
        }
    }
}

fn seed_value(seed: &[(String, CellValue)], column: &str) -> CellValue {
    seed.iter()
        .find(|(name, _)| name == column)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

/// Most frequent non-empty value of a column; ties favor the value that
/// appears latest in display order.
fn most_frequent(store: &TableStore, column: &str) -> CellValue {
    let values = store.column_values(column);
    let mut counts: AHashMap<String, usize> = AHashMap::new();
    for value in &values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let mut best: Option<(&CellValue, usize)> = None;
    for value in values.iter().rev() {
        let count = counts[&value.to_string()];
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(v, _)| v.clone()).unwrap_or_default()
}

/// Per-table default configuration: column name → strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultConfig {
    columns: AHashMap<String, ColumnDefault>,
}

impl DefaultConfig {
    /// The shipped configuration for a table kind
    pub fn builtin(kind: TableKind) -> Self {
        let mut columns = AHashMap::new();
        match kind {
            TableKind::Parameter => {
                columns.insert(
                    "parameterName".to_string(),
                    ColumnDefault::fallback(DefaultStrategy::CopyFrom {
                        source_column: "parameterId".to_string(),
                        prefix: None,
                    }),
                );
                columns.insert(
                    "parameterScale".to_string(),
                    ColumnDefault::new(DefaultStrategy::UseDefault, CellValue::text("log10")),
                );
                columns.insert(
                    "lowerBound".to_string(),
                    ColumnDefault::new(
                        DefaultStrategy::UseColumnMin { min_cap: None },
                        CellValue::Number(1e-3),
                    ),
                );
                columns.insert(
                    "upperBound".to_string(),
                    ColumnDefault::new(
                        DefaultStrategy::UseColumnMax { max_cap: None },
                        CellValue::Number(1e3),
                    ),
                );
                columns.insert(
                    "nominalValue".to_string(),
                    ColumnDefault::new(DefaultStrategy::SbmlLookup, CellValue::Number(1.0)),
                );
                columns.insert(
                    "estimate".to_string(),
                    ColumnDefault::new(DefaultStrategy::UseDefault, CellValue::text("1")),
                );
            }
            TableKind::Observable => {
                columns.insert(
                    "observableName".to_string(),
                    ColumnDefault::fallback(DefaultStrategy::CopyFrom {
                        source_column: "observableId".to_string(),
                        prefix: None,
                    }),
                );
                columns.insert(
                    "observableTransformation".to_string(),
                    ColumnDefault::new(DefaultStrategy::UseDefault, CellValue::text("lin")),
                );
                columns.insert(
                    "noiseFormula".to_string(),
                    ColumnDefault::new(DefaultStrategy::UseDefault, CellValue::Number(1.0)),
                );
                columns.insert(
                    "noiseDistribution".to_string(),
                    ColumnDefault::new(DefaultStrategy::UseDefault, CellValue::text("normal")),
                );
            }
            TableKind::Condition => {
                columns.insert(
                    "conditionName".to_string(),
                    ColumnDefault::fallback(DefaultStrategy::CopyFrom {
                        source_column: "conditionId".to_string(),
                        prefix: None,
                    }),
                );
            }
            TableKind::Measurement | TableKind::Simulation => {}
        }
        Self { columns }
    }

    /// Parse a configuration from a settings payload. A payload naming an
    /// unknown strategy is refused as a whole rather than partially applied.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDefault> {
        self.columns.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, default: ColumnDefault) {
        self.columns.insert(column.into(), default);
    }

    /// Resolve one column's default
    pub fn resolve_column(
        &self,
        store: &TableStore,
        column: &str,
        row_key: &str,
        seed: &[(String, CellValue)],
        model: Option<&dyn ModelLookup>,
    ) -> CellValue {
        let Some(default) = self.columns.get(column) else {
            return CellValue::Empty;
        };
        default.resolve(store, column, row_key, seed, model)
    }

    /// Defaults for every schema column the seed leaves empty, in schema
    /// order. The identifier column is keyed, not stored, and is skipped.
    pub fn resolve_row(
        &self,
        store: &TableStore,
        row_key: &str,
        seed: &[(String, CellValue)],
        model: Option<&dyn ModelLookup>,
    ) -> Vec<(String, CellValue)> {
        let id_column = store.kind().id_column();
        let mut resolved = Vec::new();
        for column in store.schema().column_names() {
            if id_column == Some(column) {
                continue;
            }
            if !seed_value(seed, column).is_empty() {
                continue;
            }
            let value = self.resolve_column(store, column, row_key, seed, model);
            if !value.is_empty() {
                resolved.push((column.to_string(), value));
            }
        }
        resolved
    }
}

fn numeric_extreme(store: &TableStore, column: &str, pick: fn(f64, f64) -> f64) -> Option<f64> {
    store
        .column_values(column)
        .iter()
        .filter_map(CellValue::as_number)
        .reduce(pick)
}
