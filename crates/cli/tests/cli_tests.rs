// End-to-end tests driving the built `casco` binary against the fixture
// catalog in tests/fixtures.

use std::process::{Command, Output};

const CATALOG: &str = "tests/fixtures/catalog.toml";

fn casco() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_casco"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("CASCO_CATALOG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    casco()
        .arg("--catalog")
        .arg(CATALOG)
        .args(args)
        .output()
        .expect("run casco")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        stderr(output)
    );
}

fn json(output: &Output) -> serde_json::Value {
    assert_success(output);
    serde_json::from_str(stdout(output).trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{}", stdout(output)))
}

// ===========================================================================
// Catalog
// ===========================================================================

#[test]
fn tables_in_catalog_order() {
    let output = run(&["tables"]);
    assert_success(&output);
    let names: Vec<String> = stdout(&output)
        .lines()
        .map(|l| l.split_whitespace().next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["casco_sem1", "casco_sem2", "casco", "sinistros", "frota"]);
}

#[test]
fn tables_json_does_not_load_data() {
    let value = json(&run(&["tables", "--json"]));
    let tables = value.as_array().unwrap();
    assert_eq!(tables.len(), 5);
    assert_eq!(tables[2]["name"], "casco");
    assert_eq!(tables[2]["kind"], "union");
    assert!(tables.iter().all(|t| t["loaded"] == false));
}

#[test]
fn missing_catalog_exits_3() {
    let output = casco()
        .args(["--catalog", "tests/fixtures/nope.toml", "tables"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("cannot read catalog"));
}

#[test]
fn undiscoverable_catalog_has_hint() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_casco"))
        .current_dir(dir.path())
        .env_remove("CASCO_CATALOG")
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("tables")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("hint:  pass --catalog"));
}

#[test]
fn summary_degrades_on_missing_file() {
    let output = run(&["summary"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("**casco**: Premios casco dos dois semestres\n  - Registros: 7"));
    assert!(text.contains("**frota**: indisponível"));
}

// ===========================================================================
// Queries
// ===========================================================================

#[test]
fn query_union_by_model() {
    let value = json(&run(&["query", "casco", "--where", "modelo=CIVIC", "--json"]));
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["periodo"], "casco_sem1");
    assert_eq!(rows[2]["periodo"], "casco_sem2");

    let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["modelo", "ano", "regiao_desc", "premio1", "is_media", "periodo"]);
}

#[test]
fn query_numbers_match_text_arguments() {
    let value = json(&run(&[
        "query", "casco", "--where", "modelo=CIVIC", "--where", "ano=2020|2021", "--json",
    ]));
    assert_eq!(value.as_array().unwrap().len(), 2);
}

#[test]
fn query_text_output_counts_rows() {
    let output = run(&["query", "sinistros", "--where", "modelo=GOL"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "modelo  freq_sinistro  severidade\nGOL     0.12           8000\n(1 row)\n"
    );
}

#[test]
fn unknown_table_exits_4() {
    let output = run(&["query", "ghost_table"]);
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("unknown table 'ghost_table'"));
    assert!(err.contains("casco_sem1"));
}

#[test]
fn unknown_column_exits_4() {
    let output = run(&["query", "casco", "--where", "marca=HONDA"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("unknown column 'marca'"));
}

#[test]
fn bad_where_exits_2() {
    let output = run(&["query", "casco", "--where", "modelo"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_data_file_exits_5() {
    let output = run(&["info", "frota"]);
    assert_eq!(output.status.code(), Some(5));
    let err = stderr(&output);
    assert!(err.contains("frota_2019.csv"));
    assert!(err.contains("hint:"));
}

#[test]
fn info_shows_sample() {
    let value = json(&run(&["info", "casco_sem1", "--json"]));
    assert_eq!(value["rows"], 4);
    assert_eq!(value["key_columns"], serde_json::json!(["modelo", "ano"]));
    assert_eq!(value["sample"].as_array().unwrap().len(), 3);
}

#[test]
fn unique_models_first_seen() {
    let output = run(&["unique", "casco", "modelo"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "CIVIC\nGOL\nHB20\nONIX\n");
}

#[test]
fn stats_json() {
    let value = json(&run(&["stats", "sinistros", "freq_sinistro", "--json"]));
    assert_eq!(value["count"], 3);
    assert_eq!(value["max"], 0.15);
}

#[test]
fn stats_on_text_column_fails() {
    let output = run(&["stats", "casco", "modelo"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not numeric"));
}

// ===========================================================================
// Merge / concat / compare
// ===========================================================================

#[test]
fn merge_collision_needs_flag() {
    let output = run(&["merge", "casco_sem1", "casco_sem2", "--on", "modelo"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--suffix-names"));

    let value = json(&run(&[
        "merge", "casco_sem1", "casco_sem2", "--on", "modelo", "--suffix-names", "--json",
    ]));
    let first = value[0].as_object().unwrap();
    assert!(first.contains_key("premio1_casco_sem1"));
    assert!(first.contains_key("premio1_casco_sem2"));
}

#[test]
fn merge_outer_keeps_everything() {
    let value = json(&run(&[
        "merge", "casco_sem1", "sinistros", "--on", "modelo", "--how", "outer", "--json",
    ]));
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4]["modelo"], "KWID");
    assert!(rows[4]["premio1"].is_null());
}

#[test]
fn merge_rejects_unknown_join() {
    let output = run(&["merge", "casco_sem1", "sinistros", "--on", "modelo", "--how", "cross"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn concat_with_tag() {
    let value = json(&run(&["concat", "casco_sem1", "casco_sem2", "--tag", "semestre", "--json"]));
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[6]["semestre"], "casco_sem2");
}

#[test]
fn compare_semesters() {
    let value = json(&run(&[
        "compare", "premio1", "--by", "modelo", "casco_sem1", "casco_sem2", "--json",
    ]));
    let civic = &value[0];
    assert_eq!(civic["modelo"], "CIVIC");
    assert_eq!(civic["premio1_casco_sem1"], 3125.25);
    assert_eq!(civic["premio1_casco_sem2"], 3360.0);
    assert_eq!(civic["delta_pct"], 7.51);

    let hb20 = value
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["modelo"] == "HB20")
        .unwrap();
    assert!(hb20["premio1_casco_sem2"].is_null());
    assert!(hb20["delta_pct"].is_null());
}

#[test]
fn compare_top_movers() {
    let growing = json(&run(&[
        "compare", "premio1", "--by", "modelo", "casco_sem1", "casco_sem2", "--top", "1", "--json",
    ]));
    assert_eq!(growing.as_array().unwrap().len(), 1);
    assert_eq!(growing[0]["modelo"], "CIVIC");

    let declining = json(&run(&[
        "compare", "premio1", "--by", "modelo", "casco_sem1", "casco_sem2", "--top", "5", "--declining",
        "--json",
    ]));
    let models: Vec<&str> = declining
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["modelo"].as_str().unwrap())
        .collect();
    assert_eq!(models, vec!["GOL", "CIVIC"]);
    assert_eq!(declining[0]["delta_pct"], -2.78);
}

#[test]
fn declining_needs_top() {
    let output = run(&["compare", "premio1", "--by", "modelo", "casco_sem1", "casco_sem2", "--declining"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn compare_table_with_itself_labels_sides() {
    let value = json(&run(&[
        "compare", "premio1", "--by", "modelo", "casco_sem1", "casco_sem1", "--json",
    ]));
    let keys: Vec<&str> = value[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["modelo", "premio1_left", "premio1_right", "delta_abs", "delta_pct"]);
}

#[test]
fn self_merge_with_suffix_names() {
    let value = json(&run(&[
        "merge", "sinistros", "sinistros", "--on", "modelo", "--suffix-names", "--json",
    ]));
    let keys: Vec<&str> = value[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["modelo", "freq_sinistro_left", "severidade_left", "freq_sinistro_right", "severidade_right"]
    );
}

#[test]
fn mean_per_model() {
    let value = json(&run(&["mean", "casco", "premio1", "--by", "modelo", "--json"]));
    assert_eq!(value[0]["modelo"], "CIVIC");
    assert_eq!(value[0]["premio1"], 3203.5);
    assert_eq!(value.as_array().unwrap().len(), 4);
}

// ===========================================================================
// Intent / context
// ===========================================================================

#[test]
fn intent_for_claims_question() {
    let value = json(&run(&["intent", "Qual o risco de sinistro do Civic?", "--json"]));
    assert_eq!(value["tables"], serde_json::json!(["sinistros", "casco"]));
    assert_eq!(value["topic"], "claims");
    assert_eq!(value["entities"][0]["name"], "modelo");
    assert_eq!(value["entities"][0]["value"], "CIVIC");
}

#[test]
fn intent_without_match() {
    let output = run(&["intent", "bom dia"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "tables:   \ntopic:    general\nentities: \n");
}

#[test]
fn context_prompt_has_filtered_rows() {
    let output = run(&[
        "context",
        "Qual o preço do Civic?",
        "--history",
        "user:oi",
        "--history",
        "assistant:Olá! Como posso ajudar?",
    ]);
    assert_success(&output);
    let prompt = stdout(&output);
    assert!(prompt.contains("**casco** (3 registros):"));
    assert!(prompt.contains("USER: oi\nASSISTANT: Olá! Como posso ajudar?"));
    assert!(prompt.contains("Qual o preço do Civic?"));
    assert!(!prompt.contains("GOL"));
    assert!(prompt.contains(
        "**ANÁLISE TEMPORAL:**\n\
         - Prêmio médio 1º semestre: R$ 3.125,25\n\
         - Prêmio médio 2º semestre: R$ 3.360,00\n\
         - Variação: +7,51%"
    ));
}

#[test]
fn context_json_includes_intent() {
    let value = json(&run(&["context", "Qual o preço do Civic?", "--json"]));
    assert_eq!(value["intent"]["topic"], "pricing");
    assert!(value["prompt"].as_str().unwrap().ends_with("**Sua resposta:**"));
}
