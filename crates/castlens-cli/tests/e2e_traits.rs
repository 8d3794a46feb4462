//! E2E tests for trait management and the trait index cache:
//! `castlens traits *` and `castlens index *`.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

const DATASET: &str = r#"{"items": [
  {"id": "0xa", "text": "gm frens", "timestamp": "2024-03-01T08:00:00Z"},
  {"id": "0xb", "text": "what is this?", "timestamp": "2024-03-02T12:30:00Z"},
  {"id": "0xc", "text": "gm gm gm", "timestamp": "2024-03-03T00:15:00Z"}
]}"#;

const GM_CODE: &str = "c => (c.text ?? '').includes('gm')";

fn castlens(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("castlens"));
    cmd.current_dir(dir);
    cmd.env("CASTLENS_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd
}

/// Project with seeding disabled so only the traits a test adds exist.
fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("data")).expect("mkdir data");
    fs::create_dir_all(dir.path().join(".castlens")).expect("mkdir config");
    fs::write(dir.path().join("data/casts.json"), DATASET).expect("write dataset");
    fs::write(
        dir.path().join(".castlens/config.toml"),
        "[traits]\nseed_defaults = false\n",
    )
    .expect("write config");
    dir
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = castlens(dir)
        .args(args)
        .args(["--format", "json"])
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn fails_with(dir: &Path, args: &[&str], code: &str) {
    castlens(dir)
        .args(args)
        .assert()
        .failure()
        .stderr(predicates::str::contains(code));
}

fn search_keys(dir: &Path, args: &[&str]) -> Vec<String> {
    let mut full = vec!["search"];
    full.extend_from_slice(args);
    json_of(dir, &full)["results"]
        .as_array()
        .expect("results")
        .iter()
        .map(|row| row["key"].as_str().expect("key").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// traits lifecycle
// ---------------------------------------------------------------------------

#[test]
fn add_toggle_and_delete_drive_search() {
    let dir = project();

    let added = json_of(dir.path(), &["traits", "add", "gm", "--code", GM_CODE]);
    assert_eq!(added["action"], "added");
    assert_eq!(added["matches"], 2);
    assert_eq!(added["saved"], true);

    assert_eq!(search_keys(dir.path(), &["--trait", "gm"]), vec!["0xc", "0xa"]);

    let disabled = json_of(dir.path(), &["traits", "disable", "gm"]);
    assert_eq!(disabled["enabled"], false);
    // A disabled trait no longer filters.
    assert_eq!(search_keys(dir.path(), &["--trait", "gm"]).len(), 3);

    json_of(dir.path(), &["traits", "enable", "gm"]);
    assert_eq!(search_keys(dir.path(), &["--trait", "gm"]).len(), 2);

    json_of(dir.path(), &["traits", "rm", "gm"]);
    let listed = json_of(dir.path(), &["traits", "list"]);
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
    fails_with(dir.path(), &["traits", "enable", "gm"], "E2001");
}

#[test]
fn edit_recomputes_membership() {
    let dir = project();
    json_of(dir.path(), &["traits", "add", "gm", "--code", GM_CODE, "--description", "says gm"]);

    let edited = json_of(
        dir.path(),
        &["traits", "edit", "gm", "--code", "c => c.text == 'gm gm gm'"],
    );
    assert_eq!(edited["matches"], 1);

    let listed = json_of(dir.path(), &["traits", "list"]);
    assert_eq!(listed[0]["name"], "gm");
    assert_eq!(listed[0]["description"], "says gm");
    assert_eq!(listed[0]["matches"], 1);
}

#[test]
fn registry_errors_carry_codes() {
    let dir = project();
    json_of(dir.path(), &["traits", "add", "gm", "--code", GM_CODE]);
    fails_with(dir.path(), &["traits", "add", "gm", "--code", GM_CODE], "E2002");
    fails_with(dir.path(), &["traits", "add", "   ", "--code", GM_CODE], "E2003");
    fails_with(dir.path(), &["traits", "rm", "nope"], "E2001");
    fails_with(dir.path(), &["traits", "edit", "nope", "--code", "c => true"], "E2001");
}

#[test]
fn uncompilable_code_needs_force_and_then_matches_nothing() {
    let dir = project();
    fails_with(dir.path(), &["traits", "add", "broken", "--code", "c => ("], "E3001");

    let forced = json_of(dir.path(), &["traits", "add", "broken", "--code", "c => (", "--force"]);
    assert_eq!(forced["matches"], 0);

    let listed = json_of(dir.path(), &["traits", "list"]);
    assert!(listed[0]["error"].is_string());
}

#[test]
fn check_counts_matches_without_saving() {
    let dir = project();
    let out = json_of(dir.path(), &["traits", "check", "c => (c.text ?? '').includes('?')"]);
    assert_eq!(out["matched"], 1);
    assert_eq!(out["total"], 3);
    assert_eq!(out["sample"][0], "0xb");

    fails_with(dir.path(), &["traits", "check", "c => c.text =="], "E3001");
    assert!(!dir.path().join(".castlens/store/castlens_traits_v1.json").exists());
}

// ---------------------------------------------------------------------------
// index cache
// ---------------------------------------------------------------------------

#[test]
fn index_status_tracks_dataset_changes() {
    let dir = project();

    let status = json_of(dir.path(), &["index", "status"]);
    assert_eq!(status["fresh"], false);
    assert_eq!(status["reason"], "no persisted index");

    json_of(dir.path(), &["traits", "add", "gm", "--code", GM_CODE]);
    let status = json_of(dir.path(), &["index", "status"]);
    assert_eq!(status["fresh"], true, "{status}");
    assert_eq!(status["indexedItems"], 3);

    fs::write(
        dir.path().join("data/casts.json"),
        r#"[{"id": "0xz", "text": "gm", "timestamp": "2024-04-01T00:00:00Z"}]"#,
    )
    .expect("rewrite dataset");
    let status = json_of(dir.path(), &["index", "status"]);
    assert_eq!(status["fresh"], false);
    assert!(status["reason"].as_str().expect("reason").contains("dataset changed"));

    let rebuilt = json_of(dir.path(), &["index", "rebuild"]);
    assert_eq!(rebuilt["items"], 1);
    assert_eq!(rebuilt["saved"], true);
    assert_eq!(json_of(dir.path(), &["index", "status"])["fresh"], true);
}

#[test]
fn default_pack_is_seeded_when_enabled() {
    let dir = project();
    fs::write(dir.path().join(".castlens/config.toml"), "").expect("reset config");
    let listed = json_of(dir.path(), &["traits", "list"]);
    let names: Vec<&str> = listed
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|row| row["name"].as_str())
        .collect();
    assert!(names.contains(&"Questioner"));
    assert!(names.contains(&"Emoji"));
}
