//! Report-building pipeline tests: queued filters over tables with subtables

use archivist::datatable::{AggregationOp, AggregationOps, DataTable, DataTableError, Row, Value};
use archivist::filters::{
    AddSegmentValue, ColumnDelete, ExcludeLowPopulation, FilterArgs, FilterDefaults,
    FilterError, FilterRegistry, Limit, SEGMENT_METADATA, Sort, Truncate,
};
use serde_json::json;

fn row(label: &str, visits: i64, max_actions: i64) -> Row {
    Row::from_columns([
        ("label", Value::from(label)),
        ("nb_visits", Value::Int(visits)),
        ("max_actions", Value::Int(max_actions)),
    ])
}

fn browsers() -> DataTable {
    let ops = AggregationOps::new().with("max_actions", AggregationOp::Max);
    let mut table = DataTable::new();
    table.set_aggregation_ops(&ops);

    for (label, visits, actions) in [
        ("Firefox", 40, 12),
        ("Chrome", 50, 9),
        ("Safari", 30, 20),
        ("Edge", 20, 3),
        ("Opera", 10, 7),
        ("Lynx", 1, 1),
    ] {
        let mut browser = row(label, visits, actions);
        let mut versions = DataTable::new();
        versions.set_aggregation_ops(&ops);
        for v in 1..=4 {
            versions.add_row(row(&format!("{} {}", label, v), visits / 4 + v, v));
        }
        browser.set_subtable(versions);
        table.add_row(browser);
    }
    table
}

fn labels(table: &DataTable) -> Vec<String> {
    table.rows().filter_map(|r| r.label_text()).collect()
}

fn int(row: &Row, column: &str) -> i64 {
    match row.column(column) {
        Some(Value::Int(v)) => *v,
        other => panic!("unexpected {:?} in {}", other, column),
    }
}

#[test]
fn test_report_pipeline() {
    let registry = FilterRegistry::with_defaults();
    let mut table = browsers();

    table.queue_filter(
        ExcludeLowPopulation::NAME,
        FilterArgs::new().with("column", "nb_visits").with("min_value", 5),
    );
    table.queue_filter(
        Truncate::NAME,
        FilterArgs::new().with("limit", 2).with("recursive", true),
    );
    table.queue_filter(
        AddSegmentValue::NAME,
        FilterArgs::new().with("segment", "browserName"),
    );
    table.queue_filter(
        ColumnDelete::NAME,
        FilterArgs::new().with("columns_to_remove", "max_actions"),
    );
    table.apply_queued_filters(&registry).unwrap();

    // Lynx dropped, then Chrome and Firefox kept, Safari+Edge+Opera folded
    assert_eq!(labels(&table), vec!["Chrome", "Firefox", "Others"]);
    let summary = table.summary_row().unwrap();
    assert_eq!(int(summary, "nb_visits"), 60);
    assert!(summary.column("max_actions").is_none());
    assert!(summary.metadata(SEGMENT_METADATA).is_none());

    let chrome = table.row_from_label("Chrome").unwrap();
    assert_eq!(chrome.metadata(SEGMENT_METADATA), Some(&json!("browserName==Chrome")));

    // subtables are truncated too, and the top-level relabel reaches them
    let mut chrome = chrome.clone();
    let versions = chrome.subtable_mut().unwrap();
    assert_eq!(versions.row_count(), 3);
    let summary = versions.summary_row().unwrap();
    assert_eq!(int(summary, "max_actions"), 2);
    assert_eq!(summary.label_text().as_deref(), Some("Others"));
}

#[test]
fn test_truncate_example_sums_tail() {
    let registry = FilterRegistry::with_defaults();
    let mut table = DataTable::new();
    for (label, visits) in [("a", 50), ("b", 40), ("c", 30), ("d", 20), ("e", 10)] {
        table.add_row(row(label, visits, 1));
    }

    table
        .filter(&registry, Truncate::NAME, FilterArgs::new().with("limit", 2))
        .unwrap();
    table.apply_queued_filters(&registry).unwrap();

    let visits: Vec<i64> = table.rows().map(|r| int(r, "nb_visits")).collect();
    assert_eq!(visits, vec![50, 40, 60]);
}

#[test]
fn test_exclude_low_population_examples() {
    let registry = FilterRegistry::with_defaults();

    let mut table = DataTable::new();
    for (label, visits) in [("a", 100), ("b", 3), ("c", 50), ("d", 1)] {
        table.add_row(row(label, visits, 1));
    }
    table
        .filter(
            &registry,
            ExcludeLowPopulation::NAME,
            FilterArgs::new().with("column", "nb_visits").with("min_value", 5),
        )
        .unwrap();
    assert_eq!(labels(&table), vec!["a", "c"]);

    let mut table = DataTable::new();
    table.add_row(row("a", 90, 1));
    table.add_row(row("b", 10, 1));
    table
        .filter(
            &registry,
            ExcludeLowPopulation::NAME,
            FilterArgs::new().with("column", "nb_visits"),
        )
        .unwrap();
    assert_eq!(table.row_count(), 2);
}

#[test]
fn test_configured_summary_label() {
    let registry = FilterRegistry::with_settings(&FilterDefaults {
        summary_row_label: "Rest".to_string(),
        ..FilterDefaults::default()
    });
    let mut table = browsers();
    table.queue_filter(Truncate::NAME, FilterArgs::new().with("limit", 1));
    table.apply_queued_filters(&registry).unwrap();

    assert_eq!(labels(&table), vec!["Chrome", "Rest"]);
}

#[test]
fn test_sort_then_limit_keeps_summary() {
    let registry = FilterRegistry::with_defaults();
    let mut table = browsers();
    table.queue_filter(Truncate::NAME, FilterArgs::new().with("limit", 4));
    table.queue_filter(
        Sort::NAME,
        FilterArgs::new().with("column", "max_actions").with("order", "asc"),
    );
    table.queue_filter(
        Limit::NAME,
        FilterArgs::new()
            .with("limit", 2)
            .with("keep_summary_row", true),
    );
    table.apply_queued_filters(&registry).unwrap();

    assert_eq!(labels(&table), vec!["Edge", "Chrome", "Others"]);
}

#[test]
fn test_unknown_filter_fails_at_use() {
    let registry = FilterRegistry::with_defaults();
    let mut table = browsers();
    table.queue_filter("Nonexistent", FilterArgs::new());

    let err = table.apply_queued_filters(&registry).unwrap_err();
    assert!(matches!(err, FilterError::UnknownFilter(name) if name == "Nonexistent"));
}

#[test]
fn test_merging_text_into_sum_is_a_contract_violation() {
    let registry = FilterRegistry::with_defaults();
    let mut table = DataTable::new();
    for (label, visits) in [("a", 3), ("b", 2), ("c", 1)] {
        let mut r = row(label, visits, 1);
        r.set_column("browser_engine", "Gecko");
        table.add_row(r);
    }

    let err = table
        .filter(&registry, Truncate::NAME, FilterArgs::new().with("limit", 1))
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::Table(DataTableError::AggregationContractViolation { .. })
    ));
}
