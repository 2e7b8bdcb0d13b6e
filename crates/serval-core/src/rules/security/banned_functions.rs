//! Banned function rule
//!
//! Flags calls to C library functions that cannot be used safely
//! (unbounded copies, `gets`) or that are routinely misused, each with its
//! bounded replacement.

use crate::analysis::FileContext;
use crate::ast::Expr;
use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Rule, RuleMetadata, Severity};

struct BannedEntry {
    name: &'static str,
    replacement: &'static str,
    reason: &'static str,
    severity: Severity,
}

const BANNED: &[BannedEntry] = &[
    BannedEntry {
        name: "gets",
        replacement: "fgets(buf, size, stdin)",
        reason: "cannot bound the read and always allows buffer overflow",
        severity: Severity::Error,
    },
    BannedEntry {
        name: "strcpy",
        replacement: "strncpy or snprintf",
        reason: "copies without a length bound",
        severity: Severity::Warning,
    },
    BannedEntry {
        name: "strcat",
        replacement: "strncat",
        reason: "appends without a length bound",
        severity: Severity::Warning,
    },
    BannedEntry {
        name: "sprintf",
        replacement: "snprintf",
        reason: "writes without a length bound",
        severity: Severity::Warning,
    },
    BannedEntry {
        name: "vsprintf",
        replacement: "vsnprintf",
        reason: "writes without a length bound",
        severity: Severity::Warning,
    },
    BannedEntry {
        name: "tmpnam",
        replacement: "mkstemp",
        reason: "creates predictable temporary file names",
        severity: Severity::Warning,
    },
];

declare_rule!(
    BannedFunctions,
    id = "S003",
    name = "banned-function",
    description = "Call to a C library function with no safe usage pattern",
    category = Security,
    severity = Warning,
    cwe = "CWE-120",
    cert = "MSC24-C",
    examples = "// Bad\ngets(buf);\n\n// Good\nfgets(buf, sizeof buf, stdin);"
);

impl Rule for BannedFunctions {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, ctx: &FileContext<'_>) -> Vec<Diagnostic> {
        let ast = ctx.ast();
        let mut diagnostics = Vec::new();

        for function in ctx.functions {
            let Some(body) = ast.function(function.function).and_then(|f| f.body) else {
                continue;
            };

            ast.visit_exprs_in_stmt(body, &mut |_, expr| {
                let Expr::Call { callee, loc, .. } = expr else {
                    return;
                };
                let Some(entry) = BANNED.iter().find(|e| e.name == callee.as_str()) else {
                    return;
                };

                let message = format!("{}() {}", entry.name, entry.reason);
                diagnostics.push(
                    Diagnostic::new(
                        self.metadata.id,
                        entry.severity,
                        &message,
                        ctx.filename(),
                        loc.line,
                        loc.column,
                    )
                    .with_function(&function.name)
                    .with_suggestion(&format!("use {} instead", entry.replacement)),
                );
            });
        }

        diagnostics
    }
}
