//! PEtab table reader

use std::fs;
use std::path::Path;

use petab_edit_core::{
    column_spec_for, CellValue, ColumnSpec, TableKind, TableSchema, TableStore,
};

use crate::error::{CsvError, CsvResult};
use crate::options::ReadOptions;

/// Reads a PEtab table file into a [`TableStore`]
pub struct TableReader;

impl TableReader {
    /// Read a table file, sniffing kind and delimiter unless the options
    /// pin them down.
    pub fn read_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> CsvResult<TableStore> {
        let text = fs::read_to_string(path)?;
        Self::read_str(&text, options)
    }

    /// Read a table from in-memory text
    pub fn read_str(text: &str, options: &ReadOptions) -> CsvResult<TableStore> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let header_line = text.lines().next().ok_or(CsvError::MissingHeader)?;
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| sniff_delimiter(header_line));

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(CsvError::MissingHeader);
        }
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let kind = match options.kind {
            Some(kind) => kind,
            None => sniff_kind(&header_refs)
                .ok_or_else(|| CsvError::UnknownTableKind(header_line.to_string()))?,
        };
        if let Some(id_column) = kind.id_column() {
            if !headers.iter().any(|h| h == id_column) {
                return Err(CsvError::MissingColumn {
                    kind,
                    column: id_column.to_string(),
                });
            }
        }

        // file columns in file order, then any required column the file lacks
        let mut columns: Vec<ColumnSpec> = headers
            .iter()
            .filter(|h| !h.is_empty())
            .map(|h| column_spec_for(kind, h))
            .collect();
        for required in TableSchema::builtin(kind).columns() {
            if !columns.iter().any(|c| c.name == required.name) {
                columns.push(required.clone());
            }
        }
        let schema = TableSchema::from_columns(columns);

        let id_position = kind
            .id_column()
            .and_then(|id| headers.iter().position(|h| h == id));

        let mut rows: Vec<(String, Vec<(String, CellValue)>)> = Vec::new();
        for (row_index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let key = match id_position {
                Some(p) => record.get(p).unwrap_or("").trim().to_string(),
                None => format!("new_{}_{}", kind, row_index),
            };
            if id_position.is_some() && rows.iter().any(|(k, _)| *k == key) {
                return Err(CsvError::DuplicateId {
                    id: key,
                    row: row_index,
                });
            }

            let mut values = Vec::new();
            for (position, field) in record.iter().enumerate() {
                if Some(position) == id_position {
                    continue;
                }
                let Some(header) = headers.get(position).filter(|h| !h.is_empty()) else {
                    continue;
                };
                let raw = CellValue::parse(field.trim());
                if raw.is_empty() {
                    continue;
                }
                let spec = schema
                    .get(header)
                    .cloned()
                    .unwrap_or_else(|| ColumnSpec::extra(header));
                // a value that fails its column's type is kept as text so
                // the file still loads; the linter flags it afterwards
                let value = match raw.clone().coerce(header, spec.kind) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("row {} of {} table: {}", row_index, kind, e);
                        raw
                    }
                };
                values.push((header.clone(), value));
            }
            rows.push((key, values));
        }

        Ok(TableStore::from_rows(kind, schema, rows)?)
    }
}

/// Guess the field delimiter from the header line. PEtab tables are
/// conventionally tab-separated, so ties go to tab.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    // max_by_key returns the last maximal element, so tab goes last
    let candidates = [b',', b';', b'\t'];
    candidates
        .into_iter()
        .max_by_key(|&d| {
            header_line
                .as_bytes()
                .iter()
                .filter(|&&b| b == d)
                .count()
        })
        .filter(|&d| header_line.as_bytes().contains(&d))
        .unwrap_or(b'\t')
}

/// Identify the table kind from its header columns.
///
/// Measurement-like tables are checked first since every kind shares the
/// observable identifier column with them.
pub fn sniff_kind(headers: &[&str]) -> Option<TableKind> {
    let has = |name: &str| headers.contains(&name);
    if has("observableId") && has("time") && has("measurement") {
        Some(TableKind::Measurement)
    } else if has("observableId") && has("time") && has("simulation") {
        Some(TableKind::Simulation)
    } else if has("observableId") && has("observableFormula") {
        Some(TableKind::Observable)
    } else if has("parameterId") {
        Some(TableKind::Parameter)
    } else if has("conditionId") {
        Some(TableKind::Condition)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_sniff_kind_prefers_measurement_like() {
        assert_eq!(
            sniff_kind(&["observableId", "simulationConditionId", "time", "measurement"]),
            Some(TableKind::Measurement)
        );
        assert_eq!(
            sniff_kind(&["observableId", "time", "simulation"]),
            Some(TableKind::Simulation)
        );
        assert_eq!(
            sniff_kind(&["observableId", "observableFormula"]),
            Some(TableKind::Observable)
        );
        assert_eq!(sniff_kind(&["parameterId", "lowerBound"]), Some(TableKind::Parameter));
        assert_eq!(sniff_kind(&["conditionId"]), Some(TableKind::Condition));
        assert_eq!(sniff_kind(&["foo", "bar"]), None);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        // single column, no delimiter at all
        assert_eq!(sniff_delimiter("conditionId"), b'\t');
    }

    #[test]
    fn test_read_observable_table() {
        let text = "observableId\tobservableFormula\tnoiseFormula\n\
                    obs_a\tx * scale\t1\n\
                    obs_b\ty\t0.5\n";
        let store = TableReader::read_str(text, &ReadOptions::default()).unwrap();
        assert_eq!(store.kind(), TableKind::Observable);
        assert_eq!(store.data_row_count(), 2);
        assert_eq!(
            store.get_value("obs_a", "observableFormula"),
            CellValue::text("x * scale")
        );
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_read_measurement_table_coerces_numbers() {
        let text = "observableId\tsimulationConditionId\ttime\tmeasurement\n\
                    obs_a\tc0\t0\t0.12\n\
                    obs_a\tc0\t10\t0.98\n";
        let store = TableReader::read_str(text, &ReadOptions::default()).unwrap();
        assert_eq!(store.kind(), TableKind::Measurement);
        assert_eq!(
            store.get_value("new_measurement_0", "measurement"),
            CellValue::Number(0.12)
        );
        assert_eq!(
            store.get_value("new_measurement_1", "time"),
            CellValue::Number(10.0)
        );
    }

    #[test]
    fn test_read_tolerates_bom_and_comma_delimiter() {
        let text = "\u{feff}conditionId,conditionName\nc0,control\n";
        let store = TableReader::read_str(text, &ReadOptions::default()).unwrap();
        assert_eq!(store.kind(), TableKind::Condition);
        assert_eq!(
            store.get_value("c0", "conditionName"),
            CellValue::text("control")
        );
    }

    #[test]
    fn test_bad_numeric_cell_loads_as_text() {
        let text = "observableId\tsimulationConditionId\ttime\tmeasurement\n\
                    obs_a\tc0\tlater\t0.5\n";
        let store = TableReader::read_str(text, &ReadOptions::default()).unwrap();
        assert_eq!(
            store.get_value("new_measurement_0", "time"),
            CellValue::text("later")
        );
    }

    #[test]
    fn test_duplicate_identifier_is_refused() {
        let text = "conditionId\nc0\nc0\n";
        let err = TableReader::read_str(text, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, CsvError::DuplicateId { row: 1, .. }));
    }

    #[test]
    fn test_unknown_header_is_refused() {
        let text = "alpha\tbeta\n1\t2\n";
        let err = TableReader::read_str(text, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, CsvError::UnknownTableKind(_)));
    }

    #[test]
    fn test_missing_required_column_joins_schema() {
        let text = "parameterId\tnominalValue\nk1\t1.0\n";
        let store = TableReader::read_str(text, &ReadOptions::default()).unwrap();
        assert!(store.schema().contains("lowerBound"));
        assert!(store.schema().contains("upperBound"));
    }

    #[test]
    fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "conditionId\tconditionName\nc0\tcontrol\n").unwrap();
        let store = TableReader::read_file(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(store.kind(), TableKind::Condition);
        assert!(store.has_row("c0"));
    }
}
