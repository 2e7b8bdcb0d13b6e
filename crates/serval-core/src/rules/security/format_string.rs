//! Format string rule
//!
//! Flags printf-family calls whose format argument is not a string
//! literal (worse when the variable is tainted), and literal formats whose
//! `%` specifier count disagrees with the number of passed arguments.

use std::sync::OnceLock;

use regex::Regex;

use crate::analysis::FileContext;
use crate::ast::{Expr, LiteralKind};
use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Confidence, Rule, RuleMetadata, Severity};

/// printf-family functions and the index of their format argument.
const FORMAT_FUNCTIONS: &[(&str, usize)] = &[
    ("printf", 0),
    ("fprintf", 1),
    ("sprintf", 1),
    ("snprintf", 2),
    ("vsprintf", 1),
];

fn specifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"%[-+ #0]*(\*|\d+)?(\.(\*|\d+))?[hlLqjzt]*[diouxXeEfFgGaAcspn%]")
            .expect("specifier regex is valid")
    })
}

/// Number of variadic arguments a literal format consumes. `%%` consumes
/// nothing; a `*` width or precision consumes one extra.
fn count_consumed_arguments(format: &str) -> usize {
    specifier_regex()
        .find_iter(format)
        .map(|m| {
            let spec = m.as_str();
            if spec.ends_with('%') {
                0
            } else {
                1 + spec.matches('*').count()
            }
        })
        .sum()
}

declare_rule!(
    FormatString,
    id = "S002",
    name = "format-string",
    description = "printf-family call with a non-literal format or mismatched arguments",
    category = Security,
    severity = Warning,
    cwe = "CWE-134",
    cert = "FIO30-C",
    owasp = "A03:2021",
    examples = "// Bad\nprintf(user_input);\n\n// Good\nprintf(\"%s\", user_input);"
);

impl Rule for FormatString {
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
                let Expr::Call { callee, args, loc } = expr else {
                    return;
                };
                let Some(&(_, fmt_index)) = FORMAT_FUNCTIONS
                    .iter()
                    .find(|(n, _)| *n == callee.as_str())
                else {
                    return;
                };
                let Some(&fmt_arg) = args.get(fmt_index) else {
                    return;
                };

                match ast.expr(fmt_arg) {
                    Expr::Literal {
                        value,
                        kind: LiteralKind::Str,
                        ..
                    } => {
                        let expected = count_consumed_arguments(value);
                        let actual = args.len() - fmt_index - 1;
                        if expected != actual {
                            let message = format!(
                                "{}() format string expects {} argument(s) but {} given",
                                callee, expected, actual
                            );
                            diagnostics.push(
                                Diagnostic::new(
                                    self.metadata.id,
                                    Severity::Warning,
                                    &message,
                                    ctx.filename(),
                                    loc.line,
                                    loc.column,
                                )
                                .with_function(&function.name),
                            );
                        }
                    }
                    Expr::Variable { name, .. } => {
                        let tainted = function.taint.is_tainted(name, None);
                        let (severity, confidence, detail) = if tainted {
                            (
                                Severity::Error,
                                Confidence::High,
                                "and the variable is tainted by untrusted input",
                            )
                        } else {
                            (
                                Severity::Warning,
                                Confidence::Medium,
                                "attacker-controlled formats allow memory disclosure",
                            )
                        };
                        let message = format!(
                            "{}() called with non-literal format '{}'; {}",
                            callee, name, detail
                        );
                        diagnostics.push(
                            Diagnostic::new(
                                self.metadata.id,
                                severity,
                                &message,
                                ctx.filename(),
                                loc.line,
                                loc.column,
                            )
                            .with_confidence(confidence)
                            .with_function(&function.name)
                            .with_suggestion(&format!("use {}(\"%s\", {})", callee, name)),
                        );
                    }
                    _ => {}
                }
            });
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_file;
    use crate::parser::ParsedFile;
    use crate::taint::TaintAnalyzer;

    fn check(source: &str) -> Vec<Diagnostic> {
        let parsed = ParsedFile::from_source("test.c", source);
        assert!(!parsed.metadata().has_errors, "{:?}", parsed.errors());
        let analysis = analyze_file(&parsed, &TaintAnalyzer::new());
        FormatString::new().check(&analysis.context(&parsed))
    }

    #[test]
    fn literal_format_with_matching_arguments_is_clean() {
        let diagnostics = check(r#"void f(int n) { printf("%d and %s", n, "x"); }"#);

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn too_few_arguments_is_flagged() {
        let diagnostics = check(r#"void f() { printf("%d %s"); }"#);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("expects 2 argument(s) but 0"));
    }

    #[test]
    fn too_many_arguments_is_flagged() {
        let diagnostics = check(r#"void f(int n) { printf("%d", n, n); }"#);

        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn double_percent_consumes_nothing() {
        let diagnostics = check(r#"void f() { printf("100%% done"); }"#);

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn star_width_consumes_an_extra_argument() {
        let diagnostics = check(r#"void f(int w, int n) { printf("%*d", w, n); }"#);

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn non_literal_format_is_a_warning() {
        let diagnostics = check(
            r#"
            void f() {
                char fmt[32] = "hello";
                printf(fmt);
            }
            "#,
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("non-literal format"));
    }

    #[test]
    fn tainted_non_literal_format_is_an_error() {
        let diagnostics = check(
            r#"
            void f() {
                char fmt[32];
                gets(fmt);
                printf(fmt);
            }
            "#,
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(diagnostics[0].message.contains("tainted"));
    }

    #[test]
    fn fprintf_format_index_is_one() {
        let diagnostics = check(r#"void f(int fd, int n) { fprintf(fd, "%d", n); }"#);

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn length_modifiers_are_understood() {
        let diagnostics = check(r#"void f(int n) { printf("%ld %02d", n, n); }"#);

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn count_consumed_arguments_cases() {
        assert_eq!(count_consumed_arguments("no specifiers"), 0);
        assert_eq!(count_consumed_arguments("%d"), 1);
        assert_eq!(count_consumed_arguments("%d %s %x"), 3);
        assert_eq!(count_consumed_arguments("%%"), 0);
        assert_eq!(count_consumed_arguments("%*.*f"), 3);
        assert_eq!(count_consumed_arguments("%5.2f"), 1);
    }
}
