//! Analysis engine
//!
//! Drives the per-file pipeline: parse errors become diagnostics, then
//! each function gets a CFG and a taint report, and the rule registry runs
//! over the combined artifacts. A function whose CFG cannot be built is
//! skipped; it never aborts the file, and other functions are still
//! analyzed.

use crate::ast::{Ast, FunctionId};
use crate::cfg::{Cfg, CfgBuilder};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::rules::quality::UseBeforeInit;
use crate::rules::security::{BannedFunctions, FormatString, TaintFlowRule};
use crate::rules::RuleRegistry;
use crate::semantic::SemanticModel;
use crate::taint::{TaintAnalyzer, TaintReport};

/// CFG and taint results for one function.
#[derive(Debug)]
pub struct FunctionAnalysis {
    pub function: FunctionId,
    pub name: String,
    pub cfg: Cfg,
    pub taint: TaintReport,
}

/// Owned per-file artifacts produced by [`analyze_file`].
#[derive(Debug)]
pub struct FileAnalysis {
    pub semantic: SemanticModel,
    pub functions: Vec<FunctionAnalysis>,
}

impl FileAnalysis {
    pub fn context<'a>(&'a self, parsed: &'a ParsedFile) -> FileContext<'a> {
        FileContext {
            parsed,
            semantic: &self.semantic,
            functions: &self.functions,
        }
    }
}

/// Everything a rule can look at for one file.
pub struct FileContext<'a> {
    pub parsed: &'a ParsedFile,
    pub semantic: &'a SemanticModel,
    pub functions: &'a [FunctionAnalysis],
}

impl<'a> FileContext<'a> {
    pub fn ast(&self) -> &'a Ast {
        self.parsed.ast()
    }

    pub fn filename(&self) -> &'a str {
        &self.parsed.metadata().filename
    }
}

/// Builds the semantic model, CFGs, and taint reports for every function
/// in the file.
pub fn analyze_file(parsed: &ParsedFile, taint: &TaintAnalyzer) -> FileAnalysis {
    let ast = parsed.ast();
    let semantic = SemanticModel::build(ast);

    let mut functions = Vec::new();
    for (index, function) in ast.functions.iter().enumerate() {
        let cfg = CfgBuilder::build(ast, index);
        if !cfg.verify() {
            tracing::warn!(
                function = function.name.as_str(),
                "CFG verification failed; skipping function"
            );
            continue;
        }
        let report = taint.analyze(ast, &cfg);
        functions.push(FunctionAnalysis {
            function: index,
            name: function.name.clone(),
            cfg,
            taint: report,
        });
    }

    FileAnalysis {
        semantic,
        functions,
    }
}

pub struct AnalysisEngine {
    registry: RuleRegistry,
    taint: TaintAnalyzer,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self {
            registry: create_default_registry(),
            taint: TaintAnalyzer::new(),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut registry = create_default_registry();
        registry.configure(&config.rules);
        let taint = TaintAnalyzer::with_registries(
            config.taint.sources_registry(),
            config.taint.sinks_registry(),
        );
        Self { registry, taint }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn analyze(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let disable_directives = file.disable_directives();

        for error in file.errors() {
            let diagnostic = Diagnostic::new(
                "PARSE",
                crate::rules::Severity::Error,
                &error.message,
                &file.metadata().filename,
                error.line,
                error.column,
            );
            if !disable_directives.is_disabled(diagnostic.line, &diagnostic.rule_id) {
                diagnostics.push(diagnostic);
            }
        }

        let analysis = analyze_file(file, &self.taint);
        let ctx = analysis.context(file);

        for diagnostic in self.registry.run_all(&ctx) {
            if !disable_directives.is_disabled(diagnostic.line, &diagnostic.rule_id) {
                diagnostics.push(diagnostic);
            }
        }

        diagnostics
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn create_default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    registry.register(Box::new(TaintFlowRule::new()));
    registry.register(Box::new(FormatString::new()));
    registry.register(Box::new(BannedFunctions::new()));
    registry.register(Box::new(UseBeforeInit::new()));

    registry
}
