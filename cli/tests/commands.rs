use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

const COMPANY_TEMPLATE: &str = r#"[
  {"blockName": "core/heading", "attrs": {"level": 2, "metadata": {"formFieldNames": {"content": "company_name"}}}, "innerBlocks": [], "innerHTML": ""},
  {"blockName": null, "attrs": [], "innerBlocks": [], "innerHTML": "\n\n"},
  {"blockName": "core/paragraph", "attrs": {"metadata": {"formFieldNames": {"content": "website"}}}, "innerBlocks": [], "innerHTML": ""}
]"#;

const ACME: &str = r#"[
  {"blockName": "core/heading", "attrs": {"level": 2, "content": "ACME", "metadata": {"formFieldNames": {"content": "company_name"}}}, "innerBlocks": [], "innerHTML": "<h2>ACME</h2>"},
  {"blockName": "core/paragraph", "attrs": {"content": "https://acme.test", "metadata": {"formFieldNames": {"content": "website"}}}, "innerBlocks": [], "innerHTML": ""}
]"#;

fn run(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blockfields"))
        .arg("--no-color")
        .arg("--compact")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run blockfields")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("company.json"), COMPANY_TEMPLATE).unwrap();
    std::fs::write(dir.path().join("acme.json"), ACME).unwrap();
    std::fs::write(
        dir.path().join("site.toml"),
        r#"
[[data_type]]
title = "Company"
blocks = "company.json"

[[data_type]]
title = "Broken"
body = "{"

[[content]]
id = 1
type = "company"
blocks = "acme.json"

[[content]]
id = 2
type = "post"
body = "[]"
"#,
    )
    .unwrap();
    dir
}

#[test]
fn extract_prints_record() {
    let dir = site();
    let output = run(&["extract", "acme.json"], dir.path());
    assert_eq!(
        stdout_json(&output),
        json!({ "company_name": "ACME", "website": "https://acme.test" })
    );
}

#[test]
fn template_prints_entries_in_order() {
    let dir = site();
    let output = run(&["template", "company.json"], dir.path());
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        text.trim(),
        r#"[["core/heading",{"level":2,"metadata":{"formFieldNames":{"content":"company_name"}}}],["core/paragraph",{"metadata":{"formFieldNames":{"content":"website"}}}]]"#
    );
}

#[test]
fn hydrate_applies_set_fields() {
    let dir = site();
    let output = run(
        &["hydrate", "company.json", "--set", "company_name=Globex", "--set", "website=null"],
        dir.path(),
    );
    let blocks = stdout_json(&output);
    assert_eq!(blocks[0]["attrs"]["content"], json!("Globex"));
    assert!(blocks[2]["attrs"].get("content").is_none());
}

#[test]
fn hydrate_reads_record_file() {
    let dir = site();
    std::fs::write(dir.path().join("record.json"), r#"{"website": "https://globex.test"}"#)
        .unwrap();
    let output = run(&["hydrate", "acme.json", "--record", "record.json"], dir.path());
    let blocks = stdout_json(&output);
    assert_eq!(blocks[0]["attrs"]["content"], json!("ACME"));
    assert_eq!(blocks[1]["attrs"]["content"], json!("https://globex.test"));
}

#[test]
fn resolve_prints_record_or_null() {
    let dir = site();
    let output = run(&["resolve", "site.toml", "1"], dir.path());
    assert_eq!(
        stdout_json(&output),
        json!({ "company_name": "ACME", "website": "https://acme.test" })
    );

    let output = run(&["resolve", "site.toml", "2"], dir.path());
    assert_eq!(stdout_json(&output), Value::Null);
}

#[test]
fn resolve_missing_item_fails() {
    let dir = site();
    let output = run(&["resolve", "site.toml", "42"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("content item 42 not found"));
}

#[test]
fn resolve_hydrate_fills_data_type_tree() {
    let dir = site();
    let output = run(&["resolve", "site.toml", "1", "--hydrate"], dir.path());
    let blocks = stdout_json(&output);
    assert_eq!(blocks[0]["attrs"]["content"], json!("ACME"));
    assert_eq!(blocks[2]["attrs"]["content"], json!("https://acme.test"));
    assert_eq!(blocks[1]["innerHTML"], json!("\n\n"));
}

#[test]
fn register_skips_broken_data_types() {
    let dir = site();
    let output = run(&["register", "site.toml"], dir.path());
    let registrations = stdout_json(&output);
    assert_eq!(registrations.as_array().map(Vec::len), Some(1));
    assert_eq!(registrations[0]["slug"], json!("company"));
    assert_eq!(registrations[0]["template_lock"], json!("insert"));
    assert_eq!(registrations[0]["template"][0][0], json!("core/heading"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("warning: cannot parse blocks of data type 'Broken'"));
}

#[test]
fn load_errors_are_diagnostics() {
    let dir = site();
    std::fs::write(dir.path().join("bad.json"), "[\n  {\"name\": 5}\n]").unwrap();
    let output = run(&["extract", "bad.json"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "{}", stderr);
    assert!(stderr.contains("bad.json:2"), "{}", stderr);
}
