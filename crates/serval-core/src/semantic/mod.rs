//! Scope and symbol resolution
//!
//! A single AST walk produces the [`ScopeTree`] and [`SymbolTable`] for a
//! translation unit. Undeclared identifiers are tolerated (C code under
//! analysis routinely calls functions from headers we never see).

pub mod scope;
pub mod symbols;

pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};

use std::collections::HashMap;

use crate::ast::{Ast, Expr, FunctionId, Stmt, StmtId};

/// Resolved scopes and symbols for one translation unit.
#[derive(Debug)]
pub struct SemanticModel {
    pub scopes: ScopeTree,
    pub symbols: SymbolTable,
    pub global_scope: ScopeId,
    /// Function index -> that function's top-level scope.
    pub function_scopes: HashMap<FunctionId, ScopeId>,
}

impl SemanticModel {
    pub fn build(ast: &Ast) -> Self {
        ScopeBuilder::new(ast).build()
    }

    pub fn function_scope(&self, function: FunctionId) -> Option<ScopeId> {
        self.function_scopes.get(&function).copied()
    }
}

struct ScopeBuilder<'a> {
    ast: &'a Ast,
    scopes: ScopeTree,
    symbols: SymbolTable,
    global_scope: ScopeId,
    function_scopes: HashMap<FunctionId, ScopeId>,
}

impl<'a> ScopeBuilder<'a> {
    fn new(ast: &'a Ast) -> Self {
        let mut scopes = ScopeTree::new();
        let global_scope = scopes.create_scope(ScopeKind::Global, None, Default::default());
        Self {
            ast,
            scopes,
            symbols: SymbolTable::new(),
            global_scope,
            function_scopes: HashMap::new(),
        }
    }

    fn build(mut self) -> SemanticModel {
        for (index, function) in self.ast.functions.iter().enumerate() {
            self.symbols.declare(
                &function.name,
                SymbolKind::Function,
                &function.return_type,
                self.global_scope,
                function.loc,
                false,
            );

            let scope = self
                .scopes
                .create_scope(ScopeKind::Function, Some(self.global_scope), function.loc);
            self.function_scopes.insert(index, scope);

            for param in &function.params {
                self.symbols.declare(
                    &param.name,
                    SymbolKind::Parameter,
                    &param.type_name,
                    scope,
                    param.loc,
                    true,
                );
            }

            if let Some(body) = function.body {
                self.visit_stmt(body, scope);
            }
        }

        SemanticModel {
            scopes: self.scopes,
            symbols: self.symbols,
            global_scope: self.global_scope,
            function_scopes: self.function_scopes,
        }
    }

    fn visit_stmt(&mut self, stmt: StmtId, scope: ScopeId) {
        match self.ast.stmt(stmt) {
            Stmt::Compound { statements, loc } => {
                let block_scope = self
                    .scopes
                    .create_scope(ScopeKind::Block, Some(scope), *loc);
                for &child in statements {
                    self.visit_stmt(child, block_scope);
                }
            }
            Stmt::VarDecl {
                type_name,
                name,
                init,
                loc,
            } => {
                if let Some(init) = init {
                    self.visit_expr(*init, scope);
                }
                self.symbols
                    .declare(name, SymbolKind::Variable, type_name, scope, *loc, init.is_some());
            }
            Stmt::Expr { expr, .. } => self.visit_expr(*expr, scope),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.visit_expr(*condition, scope);
                self.visit_stmt(*then_branch, scope);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(*else_branch, scope);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.visit_expr(*condition, scope);
                self.visit_stmt(*body, scope);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.visit_expr(*value, scope);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
        }
    }

    fn visit_expr(&mut self, expr: crate::ast::ExprId, scope: ScopeId) {
        let mut to_reference = Vec::new();
        self.ast.visit_expr(expr, &mut |_, node| {
            if let Expr::Variable { name, loc } = node {
                to_reference.push((name.clone(), *loc));
            }
        });
        for (name, loc) in to_reference {
            if let Some(id) = self.symbols.lookup(&name, scope, &self.scopes) {
                self.symbols.add_reference(id, loc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;

    fn build_model(source: &str) -> (ParsedFile, SemanticModel) {
        let parsed = ParsedFile::from_source("test.c", source);
        assert!(!parsed.metadata().has_errors, "{:?}", parsed.errors());
        let model = SemanticModel::build(parsed.ast());
        (parsed, model)
    }

    #[test]
    fn functions_are_declared_in_global_scope() {
        let (_, model) = build_model("int main() { return 0; }\nvoid helper() { }");

        let names: Vec<&str> = model
            .symbols
            .symbols_in_scope(model.global_scope)
            .map(|s| s.name.as_str())
            .collect();
        assert!(names.contains(&"main"));
        assert!(names.contains(&"helper"));
    }

    #[test]
    fn parameters_live_in_the_function_scope() {
        let (_, model) = build_model("int add(int a, int b) { return a + b; }");

        let scope = model.function_scope(0).expect("function scope");
        let params: Vec<&str> = model
            .symbols
            .symbols_in_scope(scope)
            .map(|s| s.name.as_str())
            .collect();
        assert!(params.contains(&"a"));
        assert!(params.contains(&"b"));
    }

    #[test]
    fn locals_record_initializer_presence() {
        let (_, model) = build_model("void f() { int set = 1; int unset; }");

        let set = model
            .symbols
            .all_symbols()
            .find(|s| s.name == "set")
            .unwrap();
        let unset = model
            .symbols
            .all_symbols()
            .find(|s| s.name == "unset")
            .unwrap();
        assert!(set.has_initializer);
        assert!(!unset.has_initializer);
    }

    #[test]
    fn references_are_resolved_through_scopes() {
        let (_, model) = build_model("int f(int n) { while (n) { n = n - 1; } return n; }");

        let n = model
            .symbols
            .all_symbols()
            .find(|s| s.name == "n")
            .unwrap();
        assert!(
            n.references.len() >= 4,
            "condition, two in assignment, return"
        );
    }

    #[test]
    fn undeclared_identifiers_are_tolerated() {
        let (_, model) = build_model("void f() { helper_from_header(global_thing); }");

        // Nothing declared, nothing resolved, no panic.
        assert!(model
            .symbols
            .all_symbols()
            .all(|s| s.kind == SymbolKind::Function));
    }
}
