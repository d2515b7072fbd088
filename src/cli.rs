//! Command-line interface for smellcheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis::{self, Language};
use crate::check;
use crate::config::{self, Config, CONFIG_FILE_NAMES};
use crate::detect::{ControlFlowAnalyzer, Runner};
use crate::features;
use crate::report;
use crate::score;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "venv", "__pycache__", "dist", "build"];

/// Directory names holding tests, skipped unless test files are included.
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "testdata", "test_data"];

/// Static code smell and control-flow analyzer.
///
/// Detects structural smells (long methods, god classes, feature envy,
/// large parameter lists, deep nesting, high complexity) with calibrated
/// confidence, and control-flow defects (infinite loops, unreachable code,
/// stale loop conditions) in Python, JavaScript and TypeScript.
#[derive(Parser)]
#[command(name = "smellcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect smells and control-flow issues in a file or directory
    Lint(LintArgs),
    /// Analyze the control flow of one file
    Flow(FlowArgs),
    /// Check one file for syntax errors and risky imports
    Check(CheckArgs),
    /// Dump the extracted structural metrics of one file as JSON
    Features(FeaturesArgs),
    /// Write a default smellcheck.yaml
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Maximum acceptable smell confidence (exit non-zero if exceeded)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Skip control-flow analysis
    #[arg(long)]
    pub no_flow: bool,
}

/// Arguments for the flow command.
#[derive(Parser)]
pub struct FlowArgs {
    /// Source file to analyze
    pub file: PathBuf,

    /// Language id (default: from the file extension)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format: mermaid, pretty or json
    #[arg(short, long, default_value = "mermaid")]
    pub format: String,

    /// Number of issues to draw graphs for
    #[arg(long, default_value_t = crate::detect::MAX_GRAPHS_PER_ANALYSIS)]
    pub max_graphs: usize,
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Source file to check
    pub file: PathBuf,

    /// Language id (default: from the file extension)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the features command.
#[derive(Parser)]
pub struct FeaturesArgs {
    /// Source file to analyze
    pub file: PathBuf,

    /// Language id (default: from the file extension)
    #[arg(short, long)]
    pub language: Option<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "smellcheck.yaml")]
    pub output: PathBuf,
}

/// Pick the language from an explicit id or the file extension.
fn resolve_language(file: &Path, explicit: Option<&str>) -> anyhow::Result<Language> {
    if let Some(id) = explicit {
        return Ok(id.parse()?);
    }
    file.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cannot infer language of {}; pass --language",
                file.display()
            )
        })
}

fn is_test_file(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
}

/// Collect the source files under `root` that the config allows.
pub fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
                return false;
            }
            config.include_test_files || !TEST_DIRS.contains(&name.as_ref())
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let language = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension);

        match language {
            Some(lang) if config.allows_language(lang) => {}
            _ => continue,
        }
        if config.is_path_excluded(path) {
            continue;
        }
        if !config.include_test_files {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if is_test_file(name) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let is_dir = abs_path.is_dir();

    // Load config, explicit or discovered next to the scanned path
    let loaded = match &args.config {
        Some(p) => Config::parse_file(p),
        None => {
            let dir = if is_dir {
                abs_path.as_path()
            } else {
                abs_path.parent().unwrap_or(Path::new("."))
            };
            Config::load_from_dir(dir)
        }
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error parsing config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.no_flow {
        config.control_flow.enabled = false;
    }

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    // Collect files to scan
    let files = if is_dir {
        collect_files(&abs_path, &config)?
    } else {
        vec![abs_path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to scan");
        return Ok(EXIT_SUCCESS);
    }
    tracing::info!("scanning {} files", files.len());

    let runner = Runner::from_config(&config);
    let result = runner.run(&files);
    let smell_score = score::calculate(&result, &config);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &result, &smell_score)?,
        _ => report::write_pretty(&path_str, &result, &smell_score),
    }

    if smell_score.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the flow command.
pub fn run_flow(args: &FlowArgs) -> anyhow::Result<i32> {
    if !["mermaid", "pretty", "json"].contains(&args.format.as_str()) {
        eprintln!(
            "Error: invalid format {:?}, must be 'mermaid', 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let language = resolve_language(&args.file, args.language.as_deref())?;
    let source = std::fs::read_to_string(&args.file)?;
    let tree = analysis::get_backend(language).parse(&source)?;
    let result = ControlFlowAnalyzer::new()
        .with_max_graphs(args.max_graphs)
        .analyze(&tree);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "pretty" => report::write_flow_pretty(&result),
        _ => {
            if !result.diagram.is_empty() {
                println!("{}", result.diagram);
            }
        }
    }

    if result.has_issues {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let language = resolve_language(&args.file, args.language.as_deref())?;
    let source = std::fs::read_to_string(&args.file)?;
    let result = check::check(&source, language.as_str())?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => report::write_check_pretty(&result),
    }

    if result.has_errors() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the features command.
pub fn run_features(args: &FeaturesArgs) -> anyhow::Result<i32> {
    let language = resolve_language(&args.file, args.language.as_deref())?;
    let source = std::fs::read_to_string(&args.file)?;
    let file_features = features::extract_source(&source, language.as_str())?;
    println!("{}", serde_json::to_string_pretty(&file_features)?);
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    let content = serde_yaml::to_string(&Config::default())?;
    if let Err(e) = std::fs::write(&args.output, content) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("smellcheck looks for {} in the scanned directory.", CONFIG_FILE_NAMES.join(", "));

    Ok(EXIT_SUCCESS)
}
