//! Taint analysis for tracking untrusted data flow
//!
//! Per-function, intraprocedural, may-taint analysis over the CFG. Sources
//! and sinks are configurable; defaults cover the classic C input and
//! memory/command functions.

pub mod propagation;
pub mod sinks;
pub mod sources;

pub use propagation::{TaintEngine, TaintFlow, TaintReport, TaintSet, TaintedValue};
pub use sinks::{SinkKind, TaintSinksRegistry};
pub use sources::{SourceKind, TaintSourcesRegistry};

use crate::ast::Ast;
use crate::cfg::Cfg;

/// Holds the source/sink configuration and runs the per-function engine.
#[derive(Debug, Clone)]
pub struct TaintAnalyzer {
    sources: TaintSourcesRegistry,
    sinks: TaintSinksRegistry,
}

impl Default for TaintAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TaintAnalyzer {
    pub fn new() -> Self {
        Self {
            sources: TaintSourcesRegistry::with_defaults(),
            sinks: TaintSinksRegistry::with_defaults(),
        }
    }

    pub fn with_registries(sources: TaintSourcesRegistry, sinks: TaintSinksRegistry) -> Self {
        Self { sources, sinks }
    }

    pub fn sources(&self) -> &TaintSourcesRegistry {
        &self.sources
    }

    pub fn sinks(&self) -> &TaintSinksRegistry {
        &self.sinks
    }

    /// Analyzes one function's CFG.
    pub fn analyze(&self, ast: &Ast, cfg: &Cfg) -> TaintReport {
        TaintEngine::new(ast, cfg, &self.sources, &self.sinks).analyze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::CfgBuilder;
    use crate::parser::ParsedFile;

    #[test]
    fn analyzer_runs_with_default_registries() {
        let parsed = ParsedFile::from_source(
            "test.c",
            r#"
            void f() {
                char buf[32];
                gets(buf);
                system(buf);
            }
            "#,
        );
        let cfg = CfgBuilder::build(parsed.ast(), 0);

        let analyzer = TaintAnalyzer::new();
        let report = analyzer.analyze(parsed.ast(), &cfg);

        assert_eq!(report.flows().len(), 1);
        assert_eq!(report.flows()[0].sink, "system");
    }

    #[test]
    fn custom_registries_replace_defaults() {
        let parsed = ParsedFile::from_source(
            "test.c",
            r#"
            void f() {
                char data[32];
                fetch_remote(data);
                render(data);
            }
            "#,
        );
        let cfg = CfgBuilder::build(parsed.ast(), 0);

        let mut sources = TaintSourcesRegistry::new();
        sources.register("fetch_remote", SourceKind::Network);
        let mut sinks = TaintSinksRegistry::new();
        sinks.register("render", SinkKind::FormatString);

        let analyzer = TaintAnalyzer::with_registries(sources, sinks);
        let report = analyzer.analyze(parsed.ast(), &cfg);

        assert_eq!(report.flows().len(), 1);
        assert_eq!(report.flows()[0].sink, "render");
        assert_eq!(report.flows()[0].source.kind, SourceKind::Network);
    }
}
