//! Output formatting for smellcheck results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::check::{CheckReport, CheckStatus, DiagnosticKind};
use crate::detect::{ControlFlowIssue, ControlFlowResult, FileReport, RunResult, Severity, SmellResult};
use crate::score::SmellScore;

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report for a lint run.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub score: f64,
    pub threshold: f64,
    pub passed: bool,
    pub smell_count: usize,
    pub high_confidence_count: usize,
    pub control_flow_issue_count: usize,
    pub files_scanned: usize,
    pub files: Vec<FileReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<String>,
}

/// Build the JSON report text for a lint run.
pub fn render_json(path: &str, result: &RunResult, score: &SmellScore) -> anyhow::Result<String> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        score: score.score,
        threshold: score.threshold,
        passed: score.passed,
        smell_count: score.smell_count,
        high_confidence_count: score.high_confidence_count,
        control_flow_issue_count: result.control_flow_issues().count(),
        files_scanned: result.files.len(),
        files: result.files.clone(),
        unreadable: result
            .unreadable
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Write results in JSON format.
pub fn write_json(path: &str, result: &RunResult, score: &SmellScore) -> anyhow::Result<()> {
    println!("{}", render_json(path, result, score)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write lint results in pretty (human-readable) format.
pub fn write_pretty(path: &str, result: &RunResult, score: &SmellScore) {
    // Header
    println!();
    print!("  ");
    print!("{}", "smellcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Files:    ".dimmed());
    println!("{}", result.files.len());
    println!();

    write_result_summary(score);
    println!();

    for file in &result.files {
        if file.is_clean() {
            continue;
        }
        write_file(file);
        println!();
    }

    for path in &result.unreadable {
        println!("    {} {}", "SKIP ".dimmed(), path.display().to_string().blue());
    }

    if !score.breakdown.is_empty() {
        write_breakdown(score);
        println!();
    }

    write_final_status(score);
    println!();
}

fn write_result_summary(score: &SmellScore) {
    if score.passed {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }

    print!("  Smell score: ");
    write_colored_confidence(score.score);
    print!(
        "  {}",
        format!(
            "({} smells, {} above threshold)",
            score.smell_count, score.high_confidence_count
        )
        .dimmed()
    );
    println!();
}

fn write_colored_confidence(c: f64) {
    let text = format!("{:.2}", c);
    match c {
        c if c < 0.5 => print!("{}", text.green()),
        c if c < 0.75 => print!("{}", text.yellow()),
        c if c < 0.9 => print!("{}", text.yellow().bold()),
        _ => print!("{}", text.red()),
    }
}

fn write_file(file: &FileReport) {
    let name = file
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string());
    println!("  {} {}", name.blue().bold(), format!("({})", file.language).dimmed());
    println!();

    if let Some(err) = &file.syntax_error {
        write_severity_tag(&Severity::Error);
        println!("   {:<22}{}", "syntax_error".dimmed(), err);
        println!("            {}", "analysis not attempted".dimmed());
        return;
    }
    if let Some(err) = &file.analysis_error {
        write_severity_tag(&Severity::Error);
        println!("   {:<22}{}", "analysis_error".dimmed(), err);
        println!("            {}", "analysis not attempted".dimmed());
        return;
    }

    for smell in &file.smells {
        write_smell(smell);
    }
    for issue in file.control_flow_issues() {
        write_issue(issue);
    }
}

fn write_smell(smell: &SmellResult) {
    write_severity_tag(&smell.severity);
    print!("   ");
    print!("{:<22}", smell.smell.as_str().dimmed());
    print!("{}", smell.location.bold());
    print!(
        "{}",
        format!(":{}-{}", smell.start_line, smell.end_line).dimmed()
    );
    print!("  ");
    write_colored_confidence(smell.confidence);
    println!();

    println!(
        "            {}: {} (threshold {})",
        smell.display_name, smell.metric_value, smell.threshold
    );
    println!("            {}", smell.refactor_hint.dimmed());
    println!();
}

fn write_issue(issue: &ControlFlowIssue) {
    write_severity_tag(&issue.severity);
    print!("   ");
    print!("{:<22}", issue.issue_type.as_str().dimmed());
    println!("{}", format!("line {}", issue.line).dimmed());
    println!("            {}", issue.description);
    println!();
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_breakdown(score: &SmellScore) {
    println!("  {}", "Breakdown:".bold());

    // Sort smells by count descending
    let mut smells: Vec<(&String, &usize)> = score.breakdown.iter().collect();
    smells.sort_by(|a, b| b.1.cmp(a.1));

    for (smell, count) in smells {
        let plural = if *count != 1 { "s" } else { "" };
        println!("    {:<22} {:>3} finding{}", smell, count, plural);
    }
}

fn write_final_status(score: &SmellScore) {
    print!("  {}", format!("Threshold: {:.2}", score.threshold).dimmed());
    print!("  Score: ");
    write_colored_confidence(score.score);
    print!("  ");

    if score.passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

// =============================================================================
// Single-file outputs
// =============================================================================

/// Write a control-flow result as its Mermaid diagram plus an issue list.
pub fn write_flow_pretty(result: &ControlFlowResult) {
    if !result.has_issues {
        println!("  {}", "✓ No control-flow issues".green());
        return;
    }
    for issue in &result.issues {
        write_issue(issue);
    }
    if !result.diagram.is_empty() {
        println!("{}", result.diagram);
    }
}

/// Write a compile-check report in pretty format.
pub fn write_check_pretty(report: &CheckReport) {
    match report.status {
        CheckStatus::Ok => println!("  {}", "✓ OK".green()),
        CheckStatus::Warning => println!("  {}", "! WARNING".yellow()),
        CheckStatus::Error => println!("  {}", "✗ ERROR".red()),
    }
    println!();

    for diag in &report.errors {
        let severity = match diag.kind {
            DiagnosticKind::SyntaxError => Severity::Error,
            DiagnosticKind::ImportWarning => Severity::Warning,
        };
        write_severity_tag(&severity);
        print!("   ");
        println!(
            "{}",
            format!("{}:{}", diag.line, diag.column).dimmed()
        );
        println!("            {}", diag.message);
        println!("            {}", diag.suggestion.dimmed());
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;
    use crate::detect::Runner;
    use crate::score;

    #[test]
    fn test_render_json_shape() {
        let runner = Runner::new();
        let mut file = runner.analyze_source(
            "def f(a, b, c, d, e, g, h, i, j):\n    return a\n",
            Language::Python,
        );
        file.path = Some("f.py".into());
        let result = RunResult {
            files: vec![file],
            unreadable: vec![],
        };
        let score = score::calculate_with_threshold(result.smells(), 0.75);

        let json: serde_json::Value =
            serde_json::from_str(&render_json("src", &result, &score).unwrap()).unwrap();
        assert_eq!(json["path"], "src");
        assert_eq!(json["files_scanned"], 1);
        assert_eq!(json["smell_count"], 1);
        assert_eq!(json["passed"], true);
        assert_eq!(json["files"][0]["smells"][0]["smell"], "large_parameter_list");
        assert_eq!(json["files"][0]["language"], "python");
        assert!(json.get("unreadable").is_none());
    }
}
