//! E2E tests for the read commands: `castlens search`, `castlens stats`,
//! `castlens sample`, plus coded failures for bad input.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

const DATASET: &str = r#"[
  {"id": "0xa", "text": "gm frens 🔥", "timestamp": "2024-03-01T08:00:00Z",
   "author": {"username": "alice"}, "reactions": {"likes_count": 10}, "replies": {"count": 2}},
  {"id": "0xb", "text": "what is this?", "timestamp": "2024-03-02T12:30:00Z",
   "reactions": {"likes_count": 3}},
  {"id": "0xc", "text": "quoting", "timestamp": "2024-03-03T00:15:00Z",
   "embeds": [{"quotedItem": {"text": "gm from the quote"}}], "reactions": {"likes_count": 5}},
  {"id": "0xd", "text": "look", "timestamp": "2024-03-04T19:11:00Z",
   "embeds": [{"url": "https://img.example/a.png"}], "reactions": {"likes_count": 1}}
]"#;

fn castlens(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("castlens"));
    cmd.current_dir(dir);
    cmd.env("CASTLENS_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("data")).expect("mkdir");
    fs::write(dir.path().join("data/casts.json"), DATASET).expect("write dataset");
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

fn keys(value: &Value, field: &str) -> Vec<String> {
    value[field]
        .as_array()
        .expect("array")
        .iter()
        .map(|row| row["key"].as_str().expect("key").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

#[test]
fn query_ranks_direct_hits_before_quoted_hits() {
    let dir = project();
    let out = json_of(dir.path(), &["search", "GM"]);
    assert_eq!(out["total"], 2);
    assert_eq!(keys(&out, "results"), vec!["0xa", "0xc"]);
    assert_eq!(out["query"], "GM");
    assert!(out.get("suggestions").is_none());
}

#[test]
fn facets_cover_the_whole_filtered_set_not_the_page() {
    let dir = project();
    let out = json_of(dir.path(), &["search", "--limit", "1"]);
    assert_eq!(out["total"], 4);
    assert_eq!(out["count"], 1);
    assert_eq!(out["facets"]["counts"]["quotes"], 1);
    assert_eq!(out["facets"]["counts"]["images"], 1);
    assert_eq!(out["facets"]["topEmojis"][0]["emoji"], "🔥");
}

#[test]
fn sort_and_offset_page_through_results() {
    let dir = project();
    let out = json_of(dir.path(), &["search", "--sort", "likes", "--offset", "1", "--limit", "2"]);
    assert_eq!(keys(&out, "results"), vec!["0xc", "0xb"]);

    let out = json_of(dir.path(), &["search", "--offset", "-5", "--limit", "-1"]);
    assert_eq!(out["offset"], 0);
    assert_eq!(out["count"], 0);
    assert_eq!(out["total"], 4);
}

#[test]
fn structural_and_trait_filters_combine() {
    let dir = project();
    let out = json_of(dir.path(), &["search", "--has-image", "true"]);
    assert_eq!(keys(&out, "results"), vec!["0xd"]);

    let out = json_of(dir.path(), &["search", "--trait", "Questioner"]);
    assert_eq!(keys(&out, "results"), vec!["0xb"]);
    let traits = out["results"][0]["traits"].as_array().expect("traits");
    assert!(traits.iter().any(|t| t == "Questioner"));

    let out = json_of(dir.path(), &["search", "--is-quote", "false", "--from", "2024-03-02"]);
    assert_eq!(keys(&out, "results"), vec!["0xd", "0xb"]);
}

#[test]
fn empty_result_for_query_offers_suggestions() {
    let dir = project();
    let out = json_of(dir.path(), &["search", "gm frenz"]);
    assert_eq!(out["total"], 0);
    let suggestions = keys(&out, "suggestions");
    assert_eq!(suggestions.first().map(String::as_str), Some("0xa"));
    assert!(out["suggestions"][0]["score"].as_f64().expect("score") > 0.0);
}

#[test]
fn text_output_is_tab_separated() {
    let dir = project();
    let output = castlens(dir.path())
        .args(["search", "look", "--format", "text"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let fields: Vec<&str> = stdout.trim_end().split('\t').collect();
    assert_eq!(fields[0], "0xd");
    assert_eq!(fields.last().copied(), Some("look"));
}

#[test]
fn unknown_bucket_is_a_coded_error() {
    let dir = project();
    castlens(dir.path())
        .args(["search", "--bucket", "brunch"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E2005"));
}

// ---------------------------------------------------------------------------
// stats / sample
// ---------------------------------------------------------------------------

#[test]
fn stats_reports_default_traits_and_distribution() {
    let dir = project();
    let out = json_of(dir.path(), &["stats"]);
    assert_eq!(out["total_items"], 4);
    assert_eq!(out["counts_by_trait"]["Questioner"], 1);
    assert_eq!(out["counts_by_trait"]["Emoji"], 1);

    let d = &out["distribution"];
    let total: u64 = ["0", "1", "2", "3+"]
        .iter()
        .map(|k| d[*k].as_u64().expect("count"))
        .sum();
    assert_eq!(total, 4);
}

#[test]
fn seeded_sample_is_reproducible_and_distinct() {
    let dir = project();
    let first = json_of(dir.path(), &["sample", "--seed", "42"]);
    let second = json_of(dir.path(), &["sample", "--seed", "42"]);
    assert_eq!(first, second);

    let mut drawn = keys(&first, "items");
    assert_eq!(drawn.len(), 3);
    drawn.sort();
    drawn.dedup();
    assert_eq!(drawn.len(), 3);
}

// ---------------------------------------------------------------------------
// dataset errors
// ---------------------------------------------------------------------------

#[test]
fn missing_dataset_is_reported_with_code() {
    let dir = TempDir::new().expect("tempdir");
    castlens(dir.path())
        .args(["stats"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E1003"));
}

#[test]
fn malformed_dataset_is_reported_as_json_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("bad.json");
    fs::write(&path, "{\"rows\": 1}").expect("write");
    let output = castlens(dir.path())
        .args(["--data", path.to_str().expect("utf8 path"), "sample", "--format", "json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let json_start = stderr.find('{').expect("json error on stderr");
    let err: Value = serde_json::Deserializer::from_str(&stderr[json_start..])
        .into_iter::<Value>()
        .next()
        .expect("one value")
        .expect("valid json");
    assert_eq!(err["error"]["error_code"], "E1004");
}
