//! Default resolution for new rows and linter-flag lifecycle

use petab_edit::prelude::*;
use petab_edit::{CheckFinding, ConsistencyChecker, TableStore};
use pretty_assertions::assert_eq;

fn sentinel(editor: &ProblemEditor, kind: TableKind) -> String {
    editor.table(kind).unwrap().sentinel_key().to_string()
}

fn add_parameter(editor: &mut ProblemEditor, id: &str, lower: &str, upper: &str, scale: &str) {
    editor
        .set_cell(TableKind::Parameter, &sentinel(editor, TableKind::Parameter), "parameterId", id)
        .unwrap();
    editor
        .set_cell(TableKind::Parameter, id, "lowerBound", lower)
        .unwrap();
    editor
        .set_cell(TableKind::Parameter, id, "upperBound", upper)
        .unwrap();
    editor
        .set_cell(TableKind::Parameter, id, "parameterScale", scale)
        .unwrap();
}

#[test]
fn new_parameter_bounds_follow_existing_extremes() {
    let mut editor = ProblemEditor::new();
    add_parameter(&mut editor, "k1", "0.01", "100", "log10");
    add_parameter(&mut editor, "k2", "0.5", "10", "log10");

    editor
        .set_cell(TableKind::Parameter, &sentinel(&editor, TableKind::Parameter), "parameterId", "k3")
        .unwrap();
    let store = editor.table(TableKind::Parameter).unwrap();
    assert_eq!(store.get_value("k3", "lowerBound"), CellValue::Number(0.01));
    assert_eq!(store.get_value("k3", "upperBound"), CellValue::Number(100.0));
}

#[test]
fn most_frequent_strategy_breaks_ties_toward_latest() {
    let mut editor = ProblemEditor::new();
    let mut config = DefaultConfig::builtin(TableKind::Parameter);
    config.set(
        "parameterScale",
        petab_edit::ColumnDefault::new(
            DefaultStrategy::UseMostFrequent {
                source_column: "parameterScale".to_string(),
            },
            CellValue::text("lin"),
        ),
    );
    editor.set_default_config(TableKind::Parameter, config);

    // majority wins: log10, lin, log10 -> log10
    add_parameter(&mut editor, "k1", "0.1", "10", "log10");
    add_parameter(&mut editor, "k2", "0.1", "10", "lin");
    add_parameter(&mut editor, "k3", "0.1", "10", "log10");
    editor
        .set_cell(TableKind::Parameter, &sentinel(&editor, TableKind::Parameter), "parameterId", "k4")
        .unwrap();
    assert_eq!(
        editor
            .table(TableKind::Parameter)
            .unwrap()
            .get_value("k4", "parameterScale"),
        CellValue::text("log10")
    );

    // a tie goes to the most recent entry
    editor
        .set_cell(TableKind::Parameter, "k4", "parameterScale", "lin")
        .unwrap();
    editor
        .set_cell(TableKind::Parameter, &sentinel(&editor, TableKind::Parameter), "parameterId", "k5")
        .unwrap();
    assert_eq!(
        editor
            .table(TableKind::Parameter)
            .unwrap()
            .get_value("k5", "parameterScale"),
        CellValue::text("lin")
    );
}

#[test]
fn corrupt_default_config_falls_back_to_builtin() {
    use petab_edit::{MemorySettings, SettingsStore};

    let mut settings = MemorySettings::new();
    settings.set(
        "defaults/parameter",
        serde_json_value(r#"{"estimate": {"strategy": "use_quantile"}}"#),
    );

    let mut editor = ProblemEditor::new();
    editor.load_settings(&settings);
    editor
        .set_cell(TableKind::Parameter, &sentinel(&editor, TableKind::Parameter), "parameterId", "k1")
        .unwrap();
    // builtin default applied despite the corrupt stored config
    assert_eq!(
        editor
            .table(TableKind::Parameter)
            .unwrap()
            .get_value("k1", "estimate"),
        CellValue::text("1")
    );
}

fn serde_json_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap()
}

/// Flags every empty observableFormula cell
struct FormulaChecker;

impl ConsistencyChecker for FormulaChecker {
    fn check(&self, store: &TableStore) -> std::result::Result<Vec<CheckFinding>, String> {
        if store.kind() != TableKind::Observable {
            return Ok(Vec::new());
        }
        Ok(store
            .rows()
            .filter(|r| r.get("observableFormula").is_empty())
            .map(|r| CheckFinding::cell(r.key(), "observableFormula", "missing formula"))
            .collect())
    }
}

#[test]
fn check_results_flag_cells_and_edits_clear_them() {
    let mut editor = ProblemEditor::new();
    editor
        .set_cell(TableKind::Observable, &sentinel(&editor, TableKind::Observable), "observableId", "obs_a")
        .unwrap();
    editor.run_checks(&FormulaChecker);
    assert!(editor
        .validity(TableKind::Observable)
        .is_invalid("obs_a", "observableFormula"));
    let events = editor.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, ChangeEvent::ValidityChanged { table: TableKind::Observable })));

    // fixing the cell clears the flag without waiting for the next check
    editor
        .set_cell(TableKind::Observable, "obs_a", "observableFormula", "x")
        .unwrap();
    assert!(!editor
        .validity(TableKind::Observable)
        .is_invalid("obs_a", "observableFormula"));

    // and a clean re-check stays clean
    editor.run_checks(&FormulaChecker);
    assert_eq!(editor.validity(TableKind::Observable).invalid_count(), 0);
}

#[test]
fn stale_check_results_are_discarded() {
    use petab_edit::ValidityTracker;

    let mut editor = ProblemEditor::new();
    editor
        .set_cell(TableKind::Observable, &sentinel(&editor, TableKind::Observable), "observableId", "obs_a")
        .unwrap();

    // a slow check starts, then the user keeps editing
    let mut tracker = ValidityTracker::new();
    let ticket = tracker.begin_check(editor.table(TableKind::Observable).unwrap());
    editor
        .set_cell(TableKind::Observable, "obs_a", "observableFormula", "x")
        .unwrap();

    let outcome = tracker.apply(
        editor.table(TableKind::Observable).unwrap(),
        ticket,
        vec![CheckFinding::cell("obs_a", "observableFormula", "stale complaint")],
    );
    assert_eq!(outcome, petab_edit::ApplyOutcome::Stale);
    assert_eq!(tracker.invalid_count(), 0);
}

#[test]
fn unmappable_findings_surface_as_messages() {
    struct TableLevel;
    impl ConsistencyChecker for TableLevel {
        fn check(&self, store: &TableStore) -> std::result::Result<Vec<CheckFinding>, String> {
            if store.kind() == TableKind::Measurement {
                Ok(vec![CheckFinding::table("no measurements defined")])
            } else {
                Ok(Vec::new())
            }
        }
    }

    let mut editor = ProblemEditor::new();
    editor.run_checks(&TableLevel);
    let events = editor.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        ChangeEvent::CheckMessage { table: TableKind::Measurement, message }
            if message == "no measurements defined"
    )));
}
