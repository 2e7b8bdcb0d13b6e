//! Symbol table for declarations and references
//!
//! Stores every declaration with its scope and supports lookup with
//! scope-chain traversal. References are accumulated on the symbol as the
//! builder walks the AST.

use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::ast::SourceLoc;

use super::scope::{ScopeId, ScopeTree};

pub type SymbolId = Id<Symbol>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

#[derive(Debug)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub type_name: String,
    pub scope: ScopeId,
    pub loc: SourceLoc,
    /// For variables: whether the declaration carried an initializer.
    pub has_initializer: bool,
    pub references: Vec<SourceLoc>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    arena: Arena<Symbol>,
    by_scope: HashMap<ScopeId, HashMap<String, SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn declare(
        &mut self,
        name: &str,
        kind: SymbolKind,
        type_name: &str,
        scope: ScopeId,
        loc: SourceLoc,
        has_initializer: bool,
    ) -> SymbolId {
        let id = self.arena.alloc_with_id(|id| Symbol {
            id,
            name: name.to_string(),
            kind,
            type_name: type_name.to_string(),
            scope,
            loc,
            has_initializer,
            references: Vec::new(),
        });

        self.by_scope
            .entry(scope)
            .or_default()
            .insert(name.to_string(), id);

        id
    }

    /// Innermost declaration of `name` visible from `scope`.
    pub fn lookup(&self, name: &str, scope: ScopeId, scopes: &ScopeTree) -> Option<SymbolId> {
        if let Some(scope_symbols) = self.by_scope.get(&scope) {
            if let Some(&id) = scope_symbols.get(name) {
                return Some(id);
            }
        }

        if let Some(parent) = scopes.get(scope).parent {
            return self.lookup(name, parent, scopes);
        }

        None
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.arena[id]
    }

    pub fn add_reference(&mut self, id: SymbolId, loc: SourceLoc) {
        self.arena[id].references.push(loc);
    }

    pub fn mark_initialized(&mut self, id: SymbolId) {
        self.arena[id].has_initializer = true;
    }

    pub fn symbols_in_scope(&self, scope: ScopeId) -> impl Iterator<Item = &Symbol> {
        self.by_scope
            .get(&scope)
            .into_iter()
            .flat_map(|symbols| symbols.values().map(|&id| &self.arena[id]))
    }

    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.arena.iter().map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::scope::ScopeKind;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    #[test]
    fn declare_and_get_symbol() {
        let mut scopes = ScopeTree::new();
        let global = scopes.create_scope(ScopeKind::Global, None, loc());

        let mut symbols = SymbolTable::new();
        let id = symbols.declare("buf", SymbolKind::Variable, "char[64]", global, loc(), false);

        let symbol = symbols.get(id);
        assert_eq!(symbol.name, "buf");
        assert_eq!(symbol.kind, SymbolKind::Variable);
        assert_eq!(symbol.type_name, "char[64]");
        assert!(!symbol.has_initializer);
        assert!(symbol.references.is_empty());
    }

    #[test]
    fn lookup_walks_the_scope_chain() {
        let mut scopes = ScopeTree::new();
        let global = scopes.create_scope(ScopeKind::Global, None, loc());
        let func = scopes.create_scope(ScopeKind::Function, Some(global), loc());
        let block = scopes.create_scope(ScopeKind::Block, Some(func), loc());

        let mut symbols = SymbolTable::new();
        let id = symbols.declare("x", SymbolKind::Variable, "int", global, loc(), true);

        assert_eq!(symbols.lookup("x", block, &scopes), Some(id));
        assert_eq!(symbols.lookup("x", func, &scopes), Some(id));
        assert_eq!(symbols.lookup("missing", block, &scopes), None);
    }

    #[test]
    fn shadowing_returns_the_innermost_symbol() {
        let mut scopes = ScopeTree::new();
        let global = scopes.create_scope(ScopeKind::Global, None, loc());
        let block = scopes.create_scope(ScopeKind::Block, Some(global), loc());

        let mut symbols = SymbolTable::new();
        let outer = symbols.declare("x", SymbolKind::Variable, "int", global, loc(), true);
        let inner = symbols.declare("x", SymbolKind::Variable, "char", block, loc(), false);

        assert_eq!(symbols.lookup("x", block, &scopes), Some(inner));
        assert_eq!(symbols.lookup("x", global, &scopes), Some(outer));
    }

    #[test]
    fn references_accumulate() {
        let mut scopes = ScopeTree::new();
        let global = scopes.create_scope(ScopeKind::Global, None, loc());

        let mut symbols = SymbolTable::new();
        let id = symbols.declare("n", SymbolKind::Variable, "int", global, loc(), true);
        symbols.add_reference(id, SourceLoc::new(2, 5));
        symbols.add_reference(id, SourceLoc::new(3, 9));

        assert_eq!(symbols.get(id).references.len(), 2);
    }

    #[test]
    fn symbols_in_scope_lists_only_that_scope() {
        let mut scopes = ScopeTree::new();
        let global = scopes.create_scope(ScopeKind::Global, None, loc());
        let func = scopes.create_scope(ScopeKind::Function, Some(global), loc());

        let mut symbols = SymbolTable::new();
        symbols.declare("g", SymbolKind::Function, "int", global, loc(), false);
        symbols.declare("p", SymbolKind::Parameter, "int", func, loc(), true);

        let names: Vec<&str> = symbols.symbols_in_scope(func).map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["p"]);
    }
}
