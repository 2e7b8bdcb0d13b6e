//! Lexical scope tree
//!
//! Scopes form a tree rooted at the translation unit's global scope;
//! lookup walks the parent chain.

use id_arena::{Arena, Id};

use crate::ast::SourceLoc;

pub type ScopeId = Id<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub loc: SourceLoc,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    arena: Arena<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, loc: SourceLoc) -> ScopeId {
        self.arena.alloc_with_id(|id| Scope {
            id,
            kind,
            parent,
            loc,
        })
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    #[test]
    fn scope_tree_tracks_parents() {
        let mut tree = ScopeTree::new();
        let global = tree.create_scope(ScopeKind::Global, None, loc());
        let func = tree.create_scope(ScopeKind::Function, Some(global), loc());
        let block = tree.create_scope(ScopeKind::Block, Some(func), loc());

        assert_eq!(tree.get(block).parent, Some(func));
        assert_eq!(tree.get(func).parent, Some(global));
        assert_eq!(tree.get(global).parent, None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn scope_kinds_are_recorded() {
        let mut tree = ScopeTree::new();
        let global = tree.create_scope(ScopeKind::Global, None, loc());

        assert_eq!(tree.get(global).kind, ScopeKind::Global);
    }
}
