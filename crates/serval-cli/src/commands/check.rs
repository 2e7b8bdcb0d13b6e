//! Check command - analyzes C files for issues

use crate::output::json::JsonFormatter;
use crate::output::pretty::PrettyFormatter;
use crate::output::sarif::SarifFormatter;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use rayon::prelude::*;
use serval_core::analysis::AnalysisEngine;
use serval_core::config::load_config_or_default_with_warnings;
use serval_core::diagnostic::Diagnostic;
use serval_core::parser::ParsedFile;
use serval_core::risk;
use serval_core::rules::Severity;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["c", "h"];

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to file or directory to analyze
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format for diagnostics (pretty, text, json, sarif)
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Fail on warnings (exit code 1)
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Filter diagnostics by minimum severity level (error, warning, info, hint)
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<String>,

    /// Print a risk and compliance summary after the diagnostics
    #[arg(long)]
    pub risk: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();

        let config_result = load_config_or_default_with_warnings(&self.path);
        for warning in &config_result.warnings {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
        let config = config_result.config;

        let files = discover_files(&self.path)?;
        tracing::debug!(count = files.len(), "discovered C files");
        if files.is_empty() {
            println!("No C files found.");
            return Ok(());
        }

        let engine = AnalysisEngine::with_config(&config);
        let min_severity = self.parse_severity()?;

        let results: Vec<(PathBuf, String, Vec<Diagnostic>)> = files
            .par_iter()
            .filter_map(|file| {
                let content = fs::read_to_string(file).ok()?;
                let parsed = ParsedFile::from_source(&file.to_string_lossy(), &content);
                let diagnostics = engine.analyze(&parsed);
                Some((file.clone(), content, diagnostics))
            })
            .collect();

        let sources: HashMap<String, String> = results
            .iter()
            .map(|(path, content, _)| (path.to_string_lossy().to_string(), content.clone()))
            .collect();

        let all_diagnostics: Vec<Diagnostic> = results
            .into_iter()
            .flat_map(|(_, _, diags)| diags)
            .filter(|d| severity_level(&d.severity) >= severity_level(&min_severity))
            .collect();

        match self.format.as_str() {
            "json" => {
                let formatter = JsonFormatter::new();
                let risk_report = self
                    .risk
                    .then(|| risk::assess(&all_diagnostics, engine.registry()));
                println!(
                    "{}",
                    formatter.format(
                        &all_diagnostics,
                        files.len(),
                        &self.path.to_string_lossy(),
                        risk_report.as_ref(),
                    )
                );
            }
            "sarif" => {
                let formatter = SarifFormatter::with_registry(engine.registry());
                println!("{}", formatter.format(&all_diagnostics));
            }
            "text" => self.output_text(&all_diagnostics),
            _ => {
                let formatter = PrettyFormatter::with_sources(sources);
                print!("{}", formatter.format(&all_diagnostics));
            }
        }

        if self.risk && self.format != "json" {
            print_risk_summary(&all_diagnostics, &engine);
        }

        let error_count = count_severity(&all_diagnostics, Severity::Error);
        let warning_count = count_severity(&all_diagnostics, Severity::Warning);

        if error_count > 0 || (warning_count > 0 && self.fail_on_warnings) {
            process::exit(1);
        }

        Ok(())
    }

    fn parse_severity(&self) -> Result<Severity> {
        match self.severity.as_deref() {
            Some("error") => Ok(Severity::Error),
            Some("warning") => Ok(Severity::Warning),
            Some("info") => Ok(Severity::Info),
            Some("hint") => Ok(Severity::Hint),
            Some(other) => anyhow::bail!(
                "Invalid severity '{}'. Valid values: error, warning, info, hint",
                other
            ),
            None => Ok(Severity::Hint),
        }
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }

    fn output_text(&self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
                Severity::Info => "info".blue().bold(),
                Severity::Hint => "hint".cyan().bold(),
            };

            println!(
                "{}:{}:{}: {} [{}]: {}",
                diag.file,
                diag.line,
                diag.column,
                severity_str,
                diag.rule_id.dimmed(),
                diag.message
            );

            if let Some(suggestion) = &diag.suggestion {
                println!("  {} {}", "suggestion:".green(), suggestion);
            }
        }

        if !diagnostics.is_empty() {
            println!();
            println!(
                "Found {} error(s) and {} warning(s)",
                count_severity(diagnostics, Severity::Error),
                count_severity(diagnostics, Severity::Warning)
            );
        }
    }
}

fn print_risk_summary(diagnostics: &[Diagnostic], engine: &AnalysisEngine) {
    let report = risk::assess(diagnostics, engine.registry());

    println!();
    println!("{}", "Risk summary".bold());
    println!(
        "  overall {:.2}  (likelihood {:.2}, impact {:.2})",
        report.project.overall, report.project.likelihood, report.project.impact
    );
    for rule in &report.by_rule {
        println!(
            "  {} {} finding(s), risk {:.2}",
            rule.rule_id.dimmed(),
            rule.findings,
            rule.score.overall
        );
    }
    if !report.compliance.cwe.is_empty() {
        println!("  {} {}", "CWE:".cyan(), report.compliance.cwe.join(", "));
    }
    if !report.compliance.cert.is_empty() {
        println!("  {} {}", "CERT:".cyan(), report.compliance.cert.join(", "));
    }
    if !report.compliance.owasp.is_empty() {
        println!(
            "  {} {}",
            "OWASP:".cyan(),
            report.compliance.owasp.join(", ")
        );
    }
}

fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        if is_supported_file(path) {
            return Ok(vec![path.to_path_buf()]);
        } else {
            return Ok(vec![]);
        }
    }

    let files: Vec<PathBuf> = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_supported_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();

    Ok(files)
}

fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == "build" || name == "target")
        .unwrap_or(false)
}

fn severity_level(severity: &Severity) -> u8 {
    match severity {
        Severity::Error => 4,
        Severity::Warning => 3,
        Severity::Info => 2,
        Severity::Hint => 1,
    }
}

fn count_severity(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .count()
}
