//! Configuration file schema for smellcheck.
//!
//! Settings live in a YAML file at the project root. Smell thresholds are
//! fixed constants; the file only controls the gate, filtering and which
//! files are analyzed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::Language;
use crate::detect::MAX_GRAPHS_PER_ANALYSIS;
use crate::score::DEFAULT_THRESHOLD;

/// File names probed, in order, when no config path is given.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["smellcheck.yaml", ".smellcheck.yaml", "smellcheck.yml"];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Gate threshold: the run fails when any smell is more confident than this.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Smells below this confidence are hidden from reports.
    #[serde(default)]
    pub min_confidence: f64,
    /// Whether to analyze test files (default: false)
    #[serde(default)]
    pub include_test_files: bool,
    /// Glob patterns for paths to exclude (e.g., "**/migrations/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Restrict analysis to these languages; empty means all.
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub control_flow: ControlFlowConfig,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_max_graphs() -> usize {
    MAX_GRAPHS_PER_ANALYSIS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_confidence: 0.0,
            include_test_files: false,
            excluded_paths: Vec::new(),
            languages: Vec::new(),
            control_flow: ControlFlowConfig::default(),
        }
    }
}

/// Control-flow analysis settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControlFlowConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of issues per file that get a flow graph.
    #[serde(default = "default_max_graphs")]
    pub max_graphs: usize,
}

impl Default for ControlFlowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_graphs: MAX_GRAPHS_PER_ANALYSIS,
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file in `dir`.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Load the config found in `dir`, or defaults when there is none.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        match Self::discover(&dir) {
            Some(path) => {
                tracing::debug!("using config {}", path.display());
                Self::parse_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }

    /// Whether files in `language` are analyzed.
    pub fn allows_language(&self, language: Language) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|id| id.parse::<Language>().ok() == Some(language))
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&config.threshold) {
        anyhow::bail!("threshold {} is outside [0, 1]", config.threshold);
    }
    if !(0.0..=1.0).contains(&config.min_confidence) {
        anyhow::bail!("min_confidence {} is outside [0, 1]", config.min_confidence);
    }

    for id in &config.languages {
        id.parse::<Language>()
            .map_err(|e| anyhow::anyhow!("invalid languages entry: {}", e))?;
    }

    // Validate excluded_paths glob patterns compile
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
threshold: 0.6
min_confidence: 0.2
excluded_paths:
  - "**/migrations/**"
languages: [python, ts]
control_flow:
  max_graphs: 3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.min_confidence, 0.2);
        assert!(config.control_flow.enabled);
        assert_eq!(config.control_flow.max_graphs, 3);
        assert!(config.allows_language(Language::TypeScript));
        assert!(!config.allows_language(Language::JavaScript));
        validate(&config).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.threshold, 0.75);
        assert_eq!(config.control_flow.max_graphs, 1);
        assert!(config.allows_language(Language::Python));
    }

    #[test]
    fn test_path_exclusion() {
        let config = Config {
            excluded_paths: vec!["**/migrations/**".to_string()],
            ..Default::default()
        };
        assert!(config.is_path_excluded(Path::new("app/migrations/0001_initial.py")));
        assert!(!config.is_path_excluded(Path::new("app/models.py")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_threshold = Config {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(validate(&bad_threshold).is_err());

        let bad_language = Config {
            languages: vec!["cobol".to_string()],
            ..Default::default()
        };
        assert!(validate(&bad_language).is_err());

        let bad_glob = Config {
            excluded_paths: vec!["a/[".to_string()],
            ..Default::default()
        };
        assert!(validate(&bad_glob).is_err());
    }

    #[test]
    fn test_discover_and_load() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Config::load_from_dir(temp.path()).unwrap(), Config::default());

        std::fs::write(temp.path().join(".smellcheck.yaml"), "threshold: 0.5\n").unwrap();
        assert_eq!(
            Config::discover(temp.path()).unwrap().file_name().unwrap(),
            ".smellcheck.yaml"
        );
        assert_eq!(Config::load_from_dir(temp.path()).unwrap().threshold, 0.5);
    }
}
