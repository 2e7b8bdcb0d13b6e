//! Explain command - shows details about one rule

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serval_core::analysis::AnalysisEngine;
use serval_core::config::load_config_or_default_with_warnings;
use serval_core::rules::{RuleCategory, Severity};
use std::env;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[arg(
        value_name = "RULE",
        help = "Rule id or name to explain (e.g. \"S001\", \"taint-flow\")"
    )]
    pub rule_id: String,
}

impl ExplainArgs {
    pub fn run(&self) -> Result<()> {
        let cwd = env::current_dir()?;
        let config = load_config_or_default_with_warnings(&cwd).config;
        let engine = AnalysisEngine::with_config(&config);
        let registry = engine.registry();

        let rule = registry
            .get_rule(&self.rule_id)
            .or_else(|| registry.get_rule_by_name(&self.rule_id));

        let Some(rule) = rule else {
            eprintln!(
                "{} unknown rule '{}'",
                "error:".red().bold(),
                self.rule_id
            );
            eprintln!();
            eprintln!("Available rules:");
            for rule in registry.rules() {
                let meta = rule.metadata();
                eprintln!("  {} ({})", meta.id, meta.name);
            }
            std::process::exit(1);
        };

        let metadata = rule.metadata();

        println!();
        println!("{}", format!("Rule {}", metadata.id).bold());
        println!();
        println!("  {}: {}", "name".cyan(), metadata.name);
        println!("  {}: {}", "description".cyan(), metadata.description);
        println!("  {}: {}", "category".cyan(), category_name(&metadata.category));
        println!(
            "  {}: {}",
            "severity".cyan(),
            severity_name(&metadata.severity)
        );

        if let Some(cwe) = metadata.cwe {
            println!("  {}: {}", "cwe".cyan(), cwe);
        }
        if let Some(cert) = metadata.cert_reference {
            println!("  {}: {}", "cert".cyan(), cert);
        }
        if let Some(owasp) = metadata.owasp_reference {
            println!("  {}: {}", "owasp".cyan(), owasp);
        }

        if let Some(examples) = metadata.examples {
            println!();
            println!("  {}:", "examples".cyan());
            for line in examples.lines() {
                println!("    {}", line);
            }
        }

        println!();
        if registry.is_rule_enabled(&self.rule_id) {
            println!("  {}: {}", "status".cyan(), "enabled".green());
        } else {
            println!("  {}: {}", "status".cyan(), "disabled".red());
        }
        println!();

        Ok(())
    }
}

fn category_name(category: &RuleCategory) -> &'static str {
    match category {
        RuleCategory::Quality => "quality",
        RuleCategory::Security => "security",
    }
}

fn severity_name(severity: &Severity) -> String {
    match severity {
        Severity::Error => "error".red().to_string(),
        Severity::Warning => "warning".yellow().to_string(),
        Severity::Info => "info".blue().to_string(),
        Severity::Hint => "hint".cyan().to_string(),
    }
}
