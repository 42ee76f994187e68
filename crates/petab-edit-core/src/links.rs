//! Cross-table reference links
//!
//! Measurement rows refer to observables and conditions by identifier.
//! These links drive rename propagation and dangling-reference detection;
//! the set is fixed by the table format.

use crate::schema::TableKind;

/// One referencing column and the identifier-keyed table it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Table holding the referencing column
    pub source: TableKind,
    /// Referencing column name
    pub column: &'static str,
    /// Table whose identifiers the column must name
    pub target: TableKind,
}

const LINKS: [Link; 3] = [
    Link {
        source: TableKind::Measurement,
        column: "observableId",
        target: TableKind::Observable,
    },
    Link {
        source: TableKind::Measurement,
        column: "simulationConditionId",
        target: TableKind::Condition,
    },
    Link {
        source: TableKind::Measurement,
        column: "preequilibrationConditionId",
        target: TableKind::Condition,
    },
];

/// All links defined by the table format
pub fn all() -> &'static [Link] {
    &LINKS
}

/// Links whose identifiers live in `target` (rename propagation fan-out)
pub fn referencing(target: TableKind) -> impl Iterator<Item = &'static Link> {
    LINKS.iter().filter(move |l| l.target == target)
}

/// The link a (table, column) pair participates in, if any
pub fn for_column(source: TableKind, column: &str) -> Option<&'static Link> {
    LINKS
        .iter()
        .find(|l| l.source == source && l.column == column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observable_renames_fan_out_to_measurements() {
        let links: Vec<_> = referencing(TableKind::Observable).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, TableKind::Measurement);
        assert_eq!(links[0].column, "observableId");
    }

    #[test]
    fn test_condition_is_referenced_twice() {
        let columns: Vec<_> = referencing(TableKind::Condition)
            .map(|l| l.column)
            .collect();
        assert_eq!(columns, vec!["simulationConditionId", "preequilibrationConditionId"]);
    }

    #[test]
    fn test_for_column() {
        assert!(for_column(TableKind::Measurement, "observableId").is_some());
        assert!(for_column(TableKind::Measurement, "time").is_none());
        assert!(for_column(TableKind::Observable, "observableId").is_none());
    }
}
