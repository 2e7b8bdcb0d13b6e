//! Taint flow rule: untrusted data reaching a dangerous call
//!
//! Reports every source-to-sink flow the taint engine recorded. The flow
//! itself was established by the dataflow analysis; this rule only turns
//! it into a diagnostic with the sink-appropriate wording.

use crate::analysis::FileContext;
use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Rule, RuleMetadata};
use crate::taint::SinkKind;

declare_rule!(
    TaintFlowRule,
    id = "S001",
    name = "taint-flow",
    description = "Untrusted input flows into a dangerous function without validation",
    category = Security,
    severity = Error,
    cwe = "CWE-20",
    cert = "STR31-C",
    owasp = "A03:2021",
    examples = "// Bad\nchar buf[64];\ngets(buf);\nsystem(buf);\n\n// Good\nchar buf[64];\nif (fgets(buf, sizeof buf, stdin) && is_allowed(buf)) { run(buf); }"
);

impl Rule for TaintFlowRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, ctx: &FileContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for function in ctx.functions {
            for flow in function.taint.flows() {
                let consequence = match flow.sink_kind {
                    SinkKind::MemoryWrite => "can overflow the destination buffer",
                    SinkKind::CommandExecution => "allows arbitrary command execution",
                    SinkKind::FormatString => "allows format-string attacks",
                };
                let message = format!(
                    "Tainted data from '{}' ({}) reaches {}(); this {}",
                    flow.source.identifier,
                    flow.source.kind.as_str(),
                    flow.sink,
                    consequence
                );

                diagnostics.push(
                    Diagnostic::new(
                        self.metadata.id,
                        self.metadata.severity,
                        &message,
                        ctx.filename(),
                        flow.location.line,
                        flow.location.column,
                    )
                    .with_function(&function.name)
                    .with_suggestion("validate or bound the untrusted data before this call"),
                );
            }
        }

        diagnostics
    }
}
