//! Configuration loading and parsing
//!
//! Loads `serval.toml`, discovered by walking upward from the analyzed
//! path. The `[taint]` section is the policy interface for overriding the
//! built-in taint source/sink function names.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::rules::Severity;
use crate::taint::{SinkKind, SourceKind, TaintSinksRegistry, TaintSourcesRegistry};

pub const CONFIG_FILENAME: &str = "serval.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["include", "exclude", "rules", "taint"];
const KNOWN_RULES_KEYS: &[&str] = &["enabled", "disabled", "severity", "quality", "security"];
const KNOWN_TAINT_KEYS: &[&str] = &["sources", "sinks"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub rules: RulesConfig,
    pub taint: TaintConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    #[serde(default)]
    pub severity: HashMap<String, SeverityValue>,
    pub quality: Option<bool>,
    pub security: Option<bool>,
}

/// Overrides for the taint registries. An empty list keeps the built-in
/// defaults for that side.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaintConfig {
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
}

impl TaintConfig {
    pub fn sources_registry(&self) -> TaintSourcesRegistry {
        if self.sources.is_empty() {
            return TaintSourcesRegistry::with_defaults();
        }
        let mut registry = TaintSourcesRegistry::new();
        for name in &self.sources {
            registry.register(name, SourceKind::Untrusted);
        }
        registry
    }

    pub fn sinks_registry(&self) -> TaintSinksRegistry {
        if self.sinks.is_empty() {
            return TaintSinksRegistry::with_defaults();
        }
        let mut registry = TaintSinksRegistry::new();
        for name in &self.sinks {
            registry.register(name, SinkKind::MemoryWrite);
        }
        registry
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityValue {
    Error,
    Warning,
    Info,
    Hint,
}

impl From<SeverityValue> for Severity {
    fn from(value: SeverityValue) -> Self {
        match value {
            SeverityValue::Error => Severity::Error,
            SeverityValue::Warning => Severity::Warning,
            SeverityValue::Info => Severity::Info,
            SeverityValue::Hint => Severity::Hint,
        }
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let warnings = detect_unknown_keys(&content);

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known_top.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    if let Some(toml::Value::Table(rules)) = table.get("rules") {
        let known_rules: HashSet<&str> = KNOWN_RULES_KEYS.iter().copied().collect();
        for key in rules.keys() {
            if !known_rules.contains(key.as_str()) {
                warnings.push(format!("Unknown config option in [rules]: '{}'", key));
            }
        }
    }

    if let Some(toml::Value::Table(taint)) = table.get("taint") {
        let known_taint: HashSet<&str> = KNOWN_TAINT_KEYS.iter().copied().collect();
        for key in taint.keys() {
            if !known_taint.contains(key.as_str()) {
                warnings.push(format!("Unknown config option in [taint]: '{}'", key));
            }
        }
    }

    warnings
}

pub fn load_config_or_default(start_dir: &Path) -> Config {
    find_config_file(start_dir)
        .and_then(|path| load_config(&path).ok())
        .unwrap_or_default()
}

pub fn load_config_or_default_with_warnings(start_dir: &Path) -> ConfigResult {
    match find_config_file(start_dir) {
        Some(path) => load_config_with_warnings(&path).unwrap_or_default(),
        None => ConfigResult::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    #[test]
    fn load_config_from_file() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
include = ["src/**/*.c"]
exclude = ["vendor/**"]

[rules]
disabled = ["Q101"]

[rules.severity]
S003 = "error"

[taint]
sources = ["my_read"]
sinks = ["my_exec"]
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();

        assert_eq!(config.include, vec!["src/**/*.c"]);
        assert_eq!(config.exclude, vec!["vendor/**"]);
        assert_eq!(config.rules.disabled, vec!["Q101"]);
        assert_eq!(
            config.rules.severity.get("S003"),
            Some(&SeverityValue::Error)
        );
        assert_eq!(config.taint.sources, vec!["my_read"]);
        assert_eq!(config.taint.sinks, vec!["my_exec"]);
    }

    #[test]
    fn default_config_when_missing() {
        let dir = create_temp_dir();
        let config = load_config_or_default(dir.path());

        assert_eq!(config, Config::default());
    }

    #[test]
    fn error_on_invalid_toml() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "this is not valid { toml }").unwrap();

        let result = load_config(&config_path);

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn find_config_file_in_parent_directory() {
        let parent = create_temp_dir();
        let child = parent.path().join("subdir");
        fs::create_dir(&child).unwrap();
        let config_path = parent.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "").unwrap();

        let found = find_config_file(&child);

        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn warns_on_unknown_keys() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
unknown_option = true

[rules]
mystery = 1

[taint]
sanitizers = ["x"]
"#,
        )
        .unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].contains("unknown_option"));
        assert!(result.warnings[1].contains("[rules]"));
        assert!(result.warnings[2].contains("[taint]"));
    }

    #[test]
    fn no_warnings_for_valid_config() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
include = ["src/**"]

[rules]
disabled = ["Q101"]

[taint]
sources = ["my_read"]
"#,
        )
        .unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert!(result.warnings.is_empty());
    }

    #[test]
    fn empty_taint_lists_keep_defaults() {
        let config = Config::default();

        let sources = config.taint.sources_registry();
        let sinks = config.taint.sinks_registry();

        assert!(sources.is_source("scanf"));
        assert!(sinks.is_sink("strcpy"));
    }

    #[test]
    fn taint_overrides_replace_defaults() {
        let taint = TaintConfig {
            sources: vec!["my_read".to_string()],
            sinks: vec!["my_exec".to_string()],
        };

        let sources = taint.sources_registry();
        let sinks = taint.sinks_registry();

        assert!(sources.is_source("my_read"));
        assert!(!sources.is_source("getenv"), "defaults replaced");
        assert!(sinks.is_sink("my_exec"));
        assert!(!sinks.is_sink("printf"), "defaults replaced");
    }

    #[test]
    fn severity_value_converts_to_severity() {
        assert_eq!(Severity::from(SeverityValue::Error), Severity::Error);
        assert_eq!(Severity::from(SeverityValue::Warning), Severity::Warning);
        assert_eq!(Severity::from(SeverityValue::Info), Severity::Info);
        assert_eq!(Severity::from(SeverityValue::Hint), Severity::Hint);
    }
}
