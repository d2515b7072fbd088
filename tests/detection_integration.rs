//! Integration tests for the full detection pipeline.
//!
//! These tests run the smell classifier and control-flow analyzer against
//! the testdata fixtures.

use std::path::PathBuf;

use smellcheck::detect::{CfgNodeType, IssueType, Metric, Runner, Severity, SmellKind};
use smellcheck::{analyze_control_flow, detect_smells, extract_source, Language};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(testdata_path().join(name)).expect("fixture should exist")
}

#[test]
fn test_god_class_by_method_count() {
    let smells = detect_smells(&fixture("god_class.py"), "python");

    assert_eq!(smells.len(), 1, "only the class should be flagged: {:?}", smells);
    let smell = &smells[0];
    assert_eq!(smell.smell, SmellKind::GodClass);
    assert_eq!(smell.location, "Inventory");
    assert_eq!(smell.metric_value, Metric::Count(12));
    assert_eq!(smell.threshold, Metric::Count(10));
}

#[test]
fn test_long_method() {
    let smells = detect_smells(&fixture("long_method.py"), "python");

    assert_eq!(smells.len(), 1, "{:?}", smells);
    let smell = &smells[0];
    assert_eq!(smell.smell, SmellKind::LongMethod);
    assert_eq!(smell.location, "build_report");
    assert_eq!(smell.metric_value, Metric::Count(32));
    assert_eq!(smell.severity, Severity::Warning);
    assert!(smell.confidence > 0.5 && smell.confidence < 1.0);
}

#[test]
fn test_infinite_loop() {
    let result = analyze_control_flow(&fixture("infinite_loop.py"), "python");

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.issue_type, IssueType::InfiniteLoop);
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.line, 5);

    assert!(!result.diagram.is_empty());
    assert!(result
        .nodes
        .iter()
        .any(|n| n.node_type == CfgNodeType::Condition && n.is_problematic));
    assert!(result
        .edges
        .iter()
        .any(|e| e.label.as_deref().is_some_and(|l| l.contains("never taken"))));
}

#[test]
fn test_unreachable_code() {
    let result = analyze_control_flow(&fixture("unreachable.py"), "python");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].issue_type, IssueType::UnreachableCode);
    assert_eq!(result.issues[0].line, 3);
}

#[test]
fn test_parse_failure_is_contained() {
    let source = fixture("broken.py");

    assert!(extract_source(&source, "python").is_err());
    assert!(detect_smells(&source, "python").is_empty());

    let flow = analyze_control_flow(&source, "python");
    assert!(!flow.has_issues);
    assert!(flow.issues.is_empty());
    assert!(flow.diagram.is_empty());

    let report = Runner::new().analyze_source(&source, Language::Python);
    let err = report.syntax_error.expect("syntax error should be reported");
    assert!(err.line >= 1);
    assert!(!err.message.is_empty());
}

#[test]
fn test_truncated_source_is_a_syntax_error() {
    let source = fixture("truncated.py");

    assert!(extract_source(&source, "python").is_err());
    assert!(detect_smells(&source, "python").is_empty());
    assert!(!analyze_control_flow(&source, "python").has_issues);

    let report = Runner::new().analyze_source(&source, Language::Python);
    let err = report.syntax_error.expect("syntax error should be reported");
    assert_eq!(err.line, 4);
    assert_eq!(err.message, "expected an indented block");
}

#[test]
fn test_misindented_body_reports_no_unreachable_code() {
    let source = "def f():\n    return 1\n      x = 2\n";

    let flow = analyze_control_flow(source, "python");
    assert!(flow.issues.is_empty());

    let report = Runner::new().analyze_source(source, Language::Python);
    assert!(report.syntax_error.is_some());
    assert!(report.control_flow_issues().is_empty());
}

#[test]
fn test_deep_nesting_is_contained_on_a_small_stack() {
    let deep = format!("x = 1{}\n", " + 1".repeat(5000));
    let shallow = format!("x = 1{}\n", " + 1".repeat(60));

    // Match the default stack of a rayon worker.
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            assert!(detect_smells(&deep, "python").is_empty());
            assert!(analyze_control_flow(&deep, "python").issues.is_empty());

            let report = Runner::new().analyze_source(&deep, Language::Python);
            assert!(report.syntax_error.is_none());
            assert!(report.analysis_error.is_some());
            assert!(!report.is_clean());

            let report = Runner::new().analyze_source(&shallow, Language::Python);
            assert!(report.analysis_error.is_none());
            assert!(report.is_clean());
        })
        .expect("should spawn analysis thread");

    handle.join().expect("analysis thread should not crash");
}

#[test]
fn test_clean_module() {
    let source = fixture("clean.py");
    assert!(detect_smells(&source, "python").is_empty());
    assert!(!analyze_control_flow(&source, "python").has_issues);
}

#[test]
fn test_javascript_class() {
    let source = fixture("service.js");
    let result = analyze_control_flow(&source, "javascript");

    let found: Vec<(IssueType, usize)> = result
        .issues
        .iter()
        .map(|i| (i.issue_type, i.line))
        .collect();
    assert_eq!(
        found,
        vec![(IssueType::InfiniteLoop, 9), (IssueType::UnreachableCode, 16)]
    );

    let features = extract_source(&source, "javascript").unwrap();
    assert_eq!(features.classes.len(), 1);
    assert_eq!(features.classes[0].name, "Poller");
    assert_eq!(features.classes[0].methods.len(), 3);
}

#[test]
fn test_typescript_function() {
    let source = fixture("handlers.ts");

    let smells = detect_smells(&source, "typescript");
    assert_eq!(smells.len(), 1);
    assert_eq!(smells[0].smell, SmellKind::LargeParameterList);
    assert_eq!(smells[0].metric_value, Metric::Count(6));

    let flow = analyze_control_flow(&source, "ts");
    assert_eq!(flow.issues.len(), 1);
    assert_eq!(
        flow.issues[0].description,
        "Infinite loop: for(;;) without break statement"
    );
}

#[test]
fn test_runner_over_fixtures() {
    let testdata = testdata_path();
    let mut files: Vec<PathBuf> = std::fs::read_dir(&testdata)
        .expect("should read testdata dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    files.sort();
    files.reverse();

    let result = Runner::new().run(&files);

    let names: Vec<String> = result
        .files
        .iter()
        .filter_map(|f| f.path.as_ref()?.file_name()?.to_str().map(String::from))
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted, "reports should be sorted by path");

    assert_eq!(result.syntax_error_count(), 2);
    assert_eq!(result.analysis_error_count(), 0);
    assert!(result.smells().any(|s| s.smell == SmellKind::GodClass));
    assert!(result
        .control_flow_issues()
        .any(|i| i.issue_type == IssueType::UnreachableCode));
}

#[test]
fn test_results_are_deterministic() {
    let source = fixture("service.js");
    let runner = Runner::new();

    let first = runner.analyze_source(&source, Language::JavaScript);
    let second = runner.analyze_source(&source, Language::JavaScript);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_analysis_has_no_side_effects() {
    let temp = tempfile::TempDir::new().unwrap();
    let victim = temp.path().join("important.txt");
    std::fs::write(&victim, "keep me").unwrap();

    let source = format!(
        "import os\nimport shutil\n\nos.remove({path:?})\nshutil.rmtree({dir:?})\n\ndef wipe():\n    os.remove({path:?})\n    return True\n    os.unlink({path:?})\n",
        path = victim.display().to_string(),
        dir = temp.path().display().to_string(),
    );

    let report = Runner::new().analyze_source(&source, Language::Python);
    assert!(report.syntax_error.is_none());
    assert_eq!(report.control_flow_issues().len(), 1);
    let _ = smellcheck::check(&source, "python").unwrap();
    let _ = extract_source(&source, "python").unwrap();

    assert!(victim.exists());
    assert_eq!(std::fs::read_to_string(&victim).unwrap(), "keep me");
}
