use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;
use serde::Deserialize;

use casco_tables::{
    Collision, ColumnType, Filter, JoinHow, MemorySource, Table, TableConfig, TableError, TableStore,
    Trend, Value,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[derive(Deserialize)]
struct FixtureCatalog {
    tables: Vec<TableConfig>,
}

fn fixture_store() -> TableStore {
    let text = std::fs::read_to_string(fixtures_dir().join("tables.toml")).unwrap();
    let catalog: FixtureCatalog = toml::from_str(&text).unwrap();
    let store = TableStore::new(fixtures_dir());
    for config in catalog.tables {
        store.register(config).unwrap();
    }
    store
}

fn memory_store(tables: Vec<Table>) -> TableStore {
    let store = TableStore::new(".");
    for table in tables {
        let config = TableConfig {
            name: table.name().to_string(),
            ..TableConfig::default()
        };
        store.register_source(config, MemorySource::new(table)).unwrap();
    }
    store
}

// -------------------------------------------------------------------------
// Assistant scenarios
// -------------------------------------------------------------------------

#[test]
fn casco_filter_by_model() {
    let store = memory_store(vec![Table::from_rows(
        "casco",
        &["modelo", "ano"],
        vec![
            vec!["CIVIC".into(), 2020.into()],
            vec!["COROLLA".into(), 2021.into()],
        ],
    )]);

    let out = store.filter("casco", &Filter::new().eq("modelo", "CIVIC")).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json, serde_json::json!([{ "modelo": "CIVIC", "ano": 2020 }]));
}

#[test]
fn query_many_is_all_or_nothing() {
    let store = fixture_store();
    let err = store
        .query_many(&[("casco", Filter::new()), ("ghost_table", Filter::new())])
        .unwrap_err();
    match err {
        TableError::UnknownTable { name, registered } => {
            assert_eq!(name, "ghost_table");
            assert!(registered.contains(&"casco".to_string()));
        }
        other => panic!("expected UnknownTable, got {other:?}"),
    }
    // Nothing was loaded on the way to the failure.
    assert!(!store.is_loaded("casco"));
    assert!(!store.is_loaded("casco_sem1"));
}

#[test]
fn query_many_keeps_request_order() {
    let store = fixture_store();
    let results = store
        .query_many(&[
            ("sinistros", Filter::new().eq("modelo", "GOL")),
            ("casco", Filter::new().eq("modelo", "GOL")),
        ])
        .unwrap();
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["sinistros", "casco"]);
    assert_eq!(results[0].1.len(), 1);
    assert_eq!(results[1].1.len(), 2);
}

// -------------------------------------------------------------------------
// Loading from disk
// -------------------------------------------------------------------------

#[test]
fn fixture_tables_register_lazily() {
    let store = fixture_store();
    assert_eq!(
        store.list_tables(),
        vec!["casco_sem1", "casco_sem2", "casco", "sinistros", "acidentes", "seguranca"]
    );
    assert!(store.list_tables().iter().all(|t| !store.is_loaded(t)));
}

#[test]
fn repeated_access_returns_same_table() {
    let store = fixture_store();
    let first = store.get_table("casco_sem1").unwrap();
    let second = store.get_table("casco_sem1").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn column_types_are_inferred() {
    let store = fixture_store();
    let table = store.get_table("sinistros").unwrap();
    let kinds: Vec<ColumnType> = table.columns().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ColumnType::Text, ColumnType::Float, ColumnType::Int]);
    assert_eq!(table.row(2).unwrap().get("severidade"), Some(&Value::Missing));
}

#[test]
fn latin1_semicolon_file_keeps_accents() {
    let store = fixture_store();
    let table = store.get_table("acidentes").unwrap();
    assert_eq!(table.column_names(), vec!["uf", "causa_acidente", "mortos"]);
    assert_eq!(
        table.row(1).unwrap().get("causa_acidente"),
        Some(&Value::from("Falta de atenção"))
    );
    assert_eq!(table.row(1).unwrap().get("mortos"), Some(&Value::Missing));
}

#[test]
fn headerless_file_gets_configured_columns() {
    let store = fixture_store();
    let out = store
        .filter("seguranca", &Filter::new().eq("estado", "SP"))
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(
        store.unique_values("seguranca", "tipo_crime").unwrap(),
        vec![Value::from("roubo"), Value::from("furto")]
    );
}

#[test]
fn union_tags_each_semester() {
    let store = fixture_store();
    let casco = store.get_table("casco").unwrap();
    assert_eq!(casco.len(), 7);
    assert_eq!(casco.column_names().last().map(String::as_str), Some("periodo"));
    assert!(store.is_loaded("casco_sem1"));

    let second = store
        .filter("casco", &Filter::new().eq("periodo", "casco_sem2"))
        .unwrap();
    assert_eq!(second.len(), 3);
}

#[test]
fn missing_file_reports_path() {
    let store = TableStore::new(fixtures_dir());
    store
        .register(TableConfig::csv("ghost", "no_such_file.csv", "", &[]))
        .unwrap();
    let err = store.get_table("ghost").unwrap_err();
    assert!(matches!(err, TableError::DataLoad { .. }));
    assert!(err.to_string().contains("no_such_file.csv"));
    assert!(!store.is_loaded("ghost"));
}

// -------------------------------------------------------------------------
// Merge and compare
// -------------------------------------------------------------------------

#[test]
fn merge_premiums_with_claims() {
    let store = fixture_store();
    let inner = store
        .merge("casco_sem1", "sinistros", "modelo", JoinHow::Inner)
        .unwrap();
    assert_eq!(inner.len(), 3);
    assert!(inner.has_column("freq_sinistro"));

    let outer = store
        .merge("casco_sem1", "sinistros", "modelo", JoinHow::Outer)
        .unwrap();
    // Four sem1 rows, plus KWID which only has claims.
    assert_eq!(outer.len(), 5);
    let kwid = outer.row(4).unwrap();
    assert_eq!(kwid.get("modelo"), Some(&Value::from("KWID")));
    assert_eq!(kwid.get("premio1"), Some(&Value::Missing));
}

#[test]
fn merge_semesters_is_ambiguous_by_default() {
    let store = fixture_store();
    let err = store
        .merge("casco_sem1", "casco_sem2", "modelo", JoinHow::Inner)
        .unwrap_err();
    assert!(matches!(err, TableError::AmbiguousColumn { .. }));
}

#[test]
fn compare_semester_premiums() {
    let store = fixture_store();
    let out = store
        .compare("premio1", &["modelo", "ano"], "casco_sem1", "casco_sem2")
        .unwrap();
    let civic_2020 = out
        .rows()
        .find(|r| r.get("modelo") == Some(&Value::from("CIVIC")) && r.get("ano") == Some(&Value::Int(2020)))
        .unwrap();
    assert_eq!(civic_2020.get("delta_pct"), Some(&Value::Float(4.98)));

    let onix = out
        .rows()
        .find(|r| r.get("modelo") == Some(&Value::from("ONIX")))
        .unwrap();
    assert_eq!(onix.get("premio1_casco_sem1"), Some(&Value::Missing));
}

#[test]
fn stats_over_premiums() {
    let store = fixture_store();
    let stats = store.column_stats("casco_sem2", "premio1").unwrap().unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.min, 1750.0);
    assert_eq!(stats.max, 3360.0);

    let err = store.column_stats("casco_sem2", "modelo").unwrap_err();
    assert!(matches!(err, TableError::NotNumeric { .. }));
}

#[test]
fn mean_premium_per_model_over_union() {
    let store = fixture_store();
    let out = store.group_mean("casco", &["modelo"], "premio1").unwrap();
    assert_eq!(out.column_names(), vec!["modelo", "premio1"]);
    let civic = out.row(0).unwrap();
    assert_eq!(civic.get("modelo"), Some(&Value::from("CIVIC")));
    assert_eq!(civic.get("premio1"), Some(&Value::Float(3203.5)));
}

#[test]
fn suffixed_merges_never_repeat_a_column() {
    let store = memory_store(vec![
        Table::from_rows(
            "casco",
            &["modelo", "ano"],
            vec![vec!["CIVIC".into(), 2020.into()]],
        ),
        Table::from_rows(
            "sin",
            &["modelo", "ano", "ano_sin"],
            vec![vec!["CIVIC".into(), 2019.into(), 2018.into()]],
        ),
    ]);

    let own = store
        .merge_with("casco", "casco", "modelo", JoinHow::Inner, Collision::SuffixTableName)
        .unwrap();
    assert_eq!(own.column_names(), vec!["modelo", "ano_left", "ano_right"]);

    let err = store
        .merge_with("casco", "sin", "modelo", JoinHow::Inner, Collision::SuffixTableName)
        .unwrap_err();
    assert!(matches!(err, TableError::AmbiguousColumn { ref columns, .. } if columns == &["ano_sin"]));
}

#[test]
fn compare_semester_with_itself() {
    let store = fixture_store();
    let out = store.compare("premio1", &["modelo"], "casco_sem2", "casco_sem2").unwrap();
    assert_eq!(
        out.column_names(),
        vec!["modelo", "premio1_left", "premio1_right", "delta_abs", "delta_pct"]
    );
}

#[test]
fn top_growing_and_declining_models() {
    let store = fixture_store();
    let growing = store
        .top_changes("premio1", &["modelo"], "casco_sem1", "casco_sem2", Trend::Growing, 1)
        .unwrap();
    assert_eq!(growing.len(), 1);
    assert_eq!(growing.row(0).unwrap().get("modelo"), Some(&Value::from("CIVIC")));

    let declining = store
        .top_changes("premio1", &["modelo"], "casco_sem1", "casco_sem2", Trend::Declining, 1)
        .unwrap();
    assert_eq!(declining.row(0).unwrap().get("modelo"), Some(&Value::from("GOL")));
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn keyed_table(name: &str, keys: &[Option<u8>]) -> Table {
    let rows = keys
        .iter()
        .enumerate()
        .map(|(i, k)| {
            let key = k.map_or(Value::Missing, |k| Value::Int(k as i64));
            vec![key, Value::Int(i as i64)]
        })
        .collect();
    Table::from_rows(name, &["k", &format!("{name}_pos")], rows)
}

proptest! {
    #[test]
    fn join_cardinalities_are_ordered(
        left in prop::collection::vec(prop::option::weighted(0.9, 0u8..6), 0..12),
        right in prop::collection::vec(prop::option::weighted(0.9, 0u8..6), 0..12),
    ) {
        let store = memory_store(vec![keyed_table("l", &left), keyed_table("r", &right)]);
        let inner = store.merge("l", "r", "k", JoinHow::Inner).unwrap().len();
        let left_join = store.merge("l", "r", "k", JoinHow::Left).unwrap().len();
        let outer = store.merge("l", "r", "k", JoinHow::Outer).unwrap().len();
        prop_assert!(inner <= left_join);
        prop_assert!(left_join <= outer);
        prop_assert!(left_join >= left.len());
    }

    #[test]
    fn unique_values_are_distinct_and_first_seen(
        keys in prop::collection::vec(prop::option::weighted(0.8, 0u8..8), 0..20),
    ) {
        let store = memory_store(vec![keyed_table("t", &keys)]);
        let unique = store.unique_values("t", "k").unwrap();
        prop_assert!(unique.len() <= keys.len());

        let mut expected: Vec<Value> = Vec::new();
        for k in keys.iter().flatten() {
            let v = Value::Int(*k as i64);
            if !expected.contains(&v) {
                expected.push(v);
            }
        }
        prop_assert_eq!(unique, expected);
    }
}
