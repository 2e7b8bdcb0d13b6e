//! Use-before-initialization heuristic
//!
//! Flags reads of locals declared without an initializer before any write
//! reaches them. The walk is linear over source order, not flow-sensitive:
//! a write anywhere earlier in the text counts. Writes are assignments to
//! the variable, address-of uses, and the receiving argument of the
//! standard input functions (`scanf(fmt, buf)` initializes `buf`).

use std::collections::HashSet;

use crate::analysis::FileContext;
use crate::ast::{Ast, Expr, ExprId, SourceLoc, Stmt, StmtId, UnaryOp};
use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Confidence, Rule, RuleMetadata};
use crate::semantic::SymbolKind;

/// Calls that write through their receiving argument.
const WRITE_THROUGH: &[&str] = &["scanf", "fscanf", "sscanf", "gets", "fgets", "read", "recv"];

declare_rule!(
    UseBeforeInit,
    id = "Q101",
    name = "use-before-init",
    description = "Local variable may be read before it is initialized",
    category = Quality,
    severity = Warning,
    cwe = "CWE-457",
    cert = "EXP33-C",
    examples = "// Bad\nint n;\nprintf(\"%d\", n);\n\n// Good\nint n = 0;\nprintf(\"%d\", n);"
);

impl Rule for UseBeforeInit {
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

            let mut walker = InitWalker::new(ast);
            walker.visit_stmt(body);

            for (name, loc) in walker.violations {
                // Cross-check against the symbol table: only report names
                // the declaration pass also saw as uninitialized locals.
                let confirmed = ctx
                    .semantic
                    .symbols
                    .all_symbols()
                    .any(|s| s.name == name && !s.has_initializer && s.kind == SymbolKind::Variable);
                if !confirmed {
                    continue;
                }
                let message =
                    format!("'{name}' may be read before it is assigned a value");
                diagnostics.push(
                    Diagnostic::new(
                        self.metadata.id,
                        self.metadata.severity,
                        &message,
                        ctx.filename(),
                        loc.line,
                        loc.column,
                    )
                    .with_confidence(Confidence::Medium)
                    .with_function(&function.name)
                    .with_suggestion(&format!("initialize '{name}' at its declaration")),
                );
            }
        }

        diagnostics
    }
}

struct InitWalker<'a> {
    ast: &'a Ast,
    uninitialized: HashSet<String>,
    /// One report per variable.
    reported: HashSet<String>,
    violations: Vec<(String, SourceLoc)>,
}

impl<'a> InitWalker<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            uninitialized: HashSet::new(),
            reported: HashSet::new(),
            violations: Vec::new(),
        }
    }

    fn visit_stmt(&mut self, stmt: StmtId) {
        match self.ast.stmt(stmt) {
            Stmt::Compound { statements, .. } => {
                for &child in statements {
                    self.visit_stmt(child);
                }
            }
            Stmt::VarDecl { name, init, .. } => {
                if let Some(init) = init {
                    self.visit_read(*init);
                } else {
                    self.uninitialized.insert(name.clone());
                }
            }
            Stmt::Expr { expr, .. } => self.visit_expr(*expr),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.visit_read(*condition);
                self.visit_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(*else_branch);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.visit_read(*condition);
                self.visit_stmt(*body);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.visit_read(*value);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
        }
    }

    /// Top-level expression of a statement: assignments write their left
    /// side, calls may write through arguments.
    fn visit_expr(&mut self, expr: ExprId) {
        match self.ast.expr(expr) {
            Expr::Binary {
                op, left, right, ..
            } if op.is_assignment() => {
                self.visit_read(*right);
                if let Some(name) = self.ast.expr(*left).as_variable() {
                    self.mark_written(name.to_string());
                } else {
                    self.visit_read(*left);
                }
            }
            Expr::Call { callee, args, .. } => {
                let writes_receiver = WRITE_THROUGH.contains(&callee.as_str());
                let receiver_index = if args.len() >= 2 { 1 } else { 0 };

                for (index, &arg) in args.iter().enumerate() {
                    if writes_receiver && index == receiver_index {
                        if let Some(name) = self.ast.expr(arg).as_variable() {
                            self.mark_written(name.to_string());
                            continue;
                        }
                    }
                    self.visit_read(arg);
                }
            }
            _ => self.visit_read(expr),
        }
    }

    /// Every variable reached from here is a read, except address-of
    /// operands, which conservatively count as writes (`scanf("%d", &n)`).
    fn visit_read(&mut self, expr: ExprId) {
        match self.ast.expr(expr) {
            Expr::Variable { name, loc } => {
                let name = name.clone();
                let loc = *loc;
                self.record_read(name, loc);
            }
            Expr::Unary {
                op: UnaryOp::AddrOf,
                operand,
                ..
            } => {
                if let Some(name) = self.ast.expr(*operand).as_variable() {
                    self.mark_written(name.to_string());
                } else {
                    self.visit_read(*operand);
                }
            }
            Expr::Unary { operand, .. } => self.visit_read(*operand),
            Expr::Binary { left, right, .. } => {
                self.visit_read(*left);
                self.visit_read(*right);
            }
            Expr::Call { args, .. } => {
                let args = args.clone();
                for arg in args {
                    self.visit_read(arg);
                }
            }
            Expr::Literal { .. } => {}
        }
    }

    fn record_read(&mut self, name: String, loc: SourceLoc) {
        if self.uninitialized.contains(&name) && self.reported.insert(name.clone()) {
            self.violations.push((name, loc));
        }
    }

    fn mark_written(&mut self, name: String) {
        self.uninitialized.remove(&name);
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
        UseBeforeInit::new().check(&analysis.context(&parsed))
    }

    #[test]
    fn read_before_any_write_is_flagged() {
        let diagnostics = check(
            r#"
            void f() {
                int n;
                int m = n + 1;
            }
            "#,
        );

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'n'"));
    }

    #[test]
    fn initialized_declaration_is_clean() {
        let diagnostics = check("void f() { int n = 0; int m = n + 1; }");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn assignment_before_read_is_clean() {
        let diagnostics = check(
            r#"
            void f() {
                int n;
                n = 5;
                int m = n + 1;
            }
            "#,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn scanf_receiver_counts_as_a_write() {
        let diagnostics = check(
            r#"
            void f() {
                char buf[32];
                scanf("%s", buf);
                puts(buf);
            }
            "#,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn address_of_counts_as_a_write() {
        let diagnostics = check(
            r#"
            void f() {
                int n;
                scanf("%d", &n);
                printf("%d", n);
            }
            "#,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn each_variable_is_reported_once() {
        let diagnostics = check(
            r#"
            void f() {
                int n;
                int a = n;
                int b = n;
            }
            "#,
        );

        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn parameters_are_never_flagged() {
        let diagnostics = check("int f(int n) { return n + 1; }");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn read_in_condition_is_flagged() {
        let diagnostics = check(
            r#"
            void f() {
                int flag;
                if (flag) {
                    flag = 0;
                }
            }
            "#,
        );

        assert_eq!(diagnostics.len(), 1);
    }
}
