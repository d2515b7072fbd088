//! Tests for the JSON output formats.
//!
//! Field names in these documents are consumed by other tools, so they are
//! checked literally.

use std::path::PathBuf;

use serde_json::Value;
use smellcheck::cli::collect_files;
use smellcheck::config::Config;
use smellcheck::detect::Runner;
use smellcheck::report;
use smellcheck::score;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Run detection over testdata and return the JSON report.
fn run_and_get_json(config: &Config) -> Value {
    let testdata = testdata_path();
    let files = collect_files(&testdata, config).expect("should collect files");

    let runner = Runner::from_config(config);
    let result = runner.run(&files);
    let smell_score = score::calculate(&result, config);

    let json = report::render_json("testdata", &result, &smell_score).expect("should render");
    serde_json::from_str(&json).expect("report should be valid JSON")
}

#[test]
fn test_report_top_level_fields() {
    let report = run_and_get_json(&Config::default());

    for key in [
        "version",
        "path",
        "score",
        "threshold",
        "passed",
        "smell_count",
        "high_confidence_count",
        "control_flow_issue_count",
        "files_scanned",
        "files",
    ] {
        assert!(report.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(report["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(report["threshold"], 0.75);
    assert_eq!(report["files_scanned"], 9);
}

#[test]
fn test_smell_fields() {
    let report = run_and_get_json(&Config::default());
    let files = report["files"].as_array().unwrap();

    let god_class = files
        .iter()
        .flat_map(|f| f["smells"].as_array().unwrap())
        .find(|s| s["smell"] == "god_class")
        .expect("god class should be reported");

    assert_eq!(god_class["display_name"], "God Class");
    assert_eq!(god_class["location"], "Inventory");
    assert_eq!(god_class["metric_value"], 12);
    assert_eq!(god_class["threshold"], 10);
    assert_eq!(god_class["severity"], "warning");
    assert!(god_class["confidence"].as_f64().unwrap() > 0.5);
    assert!(god_class["refactor_hint"].as_str().unwrap().len() > 10);
}

#[test]
fn test_control_flow_fields() {
    let report = run_and_get_json(&Config::default());
    let files = report["files"].as_array().unwrap();

    let flow = files
        .iter()
        .find(|f| f["path"].as_str().unwrap().ends_with("infinite_loop.py"))
        .map(|f| &f["control_flow"])
        .expect("infinite_loop.py should be reported");

    assert_eq!(flow["has_issues"], true);
    assert_eq!(flow["issues"][0]["type"], "infinite_loop");
    assert_eq!(flow["issues"][0]["severity"], "error");
    assert_eq!(flow["nodes"][0]["type"], "entry");
    assert!(flow["diagram"].as_str().unwrap().starts_with("flowchart TD"));
}

#[test]
fn test_syntax_error_reported_per_file() {
    let report = run_and_get_json(&Config::default());
    let broken = report["files"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["path"].as_str().unwrap().ends_with("broken.py"))
        .expect("broken.py should be reported");

    assert!(broken["syntax_error"]["line"].as_u64().unwrap() >= 1);
    assert_eq!(broken["smells"].as_array().unwrap().len(), 0);
    assert!(broken.get("control_flow").is_none());
}

#[test]
fn test_config_filters_apply() {
    let config = Config {
        min_confidence: 0.99,
        languages: vec!["python".to_string()],
        ..Default::default()
    };
    let report = run_and_get_json(&config);

    assert_eq!(report["files_scanned"], 7);
    assert_eq!(report["smell_count"], 0);
    assert_eq!(report["passed"], true);
}

#[test]
fn test_gate_fails_on_low_threshold() {
    let config = Config {
        threshold: 0.1,
        ..Default::default()
    };
    let report = run_and_get_json(&config);
    assert_eq!(report["passed"], false);
    assert!(report["high_confidence_count"].as_u64().unwrap() >= 3);
}
