//! Control-flow graph per function
//!
//! A [`Cfg`] is a directed graph of [`BasicBlock`] vertices connected by
//! typed [`Edge`]s, built once per function by [`CfgBuilder`] and read-only
//! afterwards. Blocks reference AST statements by arena id, so a `Cfg`
//! never outlives the [`crate::ast::Ast`] it was built from.

pub mod builder;

pub use builder::CfgBuilder;

use serde::Serialize;

use crate::ast::{FunctionId, SourceLoc, StmtId};

/// Identifier of a basic block, assigned sequentially from 0 within one CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub usize);

/// Identifier of an edge within one CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeId(pub usize);

/// Kind of a control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Unconditional sequential flow.
    FallThrough,
    /// Condition evaluated true; always paired with a `FalseBranch` from
    /// the same source block.
    TrueBranch,
    /// Condition evaluated false.
    FalseBranch,
    /// Back edge from the end of a loop body to the loop header.
    LoopBack,
    /// Unconditional transfer (`break`, `continue`; reserved for `goto`).
    Jump,
    /// Transfer to the function exit on a `return` statement.
    Return,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::FallThrough => "fall_through",
            EdgeKind::TrueBranch => "true_branch",
            EdgeKind::FalseBranch => "false_branch",
            EdgeKind::LoopBack => "loop_back",
            EdgeKind::Jump => "jump",
            EdgeKind::Return => "return",
        }
    }
}

/// Directed edge between two basic blocks. The optional condition label is
/// display-only; it is never evaluated.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub source: BlockId,
    pub target: BlockId,
    pub kind: EdgeKind,
    pub condition: Option<String>,
}

/// A CFG vertex: an ordered run of statements with no internal branching.
#[derive(Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: Option<String>,
    /// Statements in execution order.
    pub statements: Vec<StmtId>,
    pub incoming: Vec<EdgeId>,
    pub outgoing: Vec<EdgeId>,
}

impl BasicBlock {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Structural problems found while building a CFG. These are reported, not
/// fatal: the graph is still usable for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgWarning {
    BreakOutsideLoop(SourceLoc),
    ContinueOutsideLoop(SourceLoc),
}

impl std::fmt::Display for CfgWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CfgWarning::BreakOutsideLoop(loc) => {
                write!(f, "'break' outside of a loop at {loc}")
            }
            CfgWarning::ContinueOutsideLoop(loc) => {
                write!(f, "'continue' outside of a loop at {loc}")
            }
        }
    }
}

/// Control-flow graph for one function. Vertex and edge sets are
/// append-only during construction and immutable afterwards.
#[derive(Debug)]
pub struct Cfg {
    function: FunctionId,
    function_name: String,
    blocks: Vec<BasicBlock>,
    edges: Vec<Edge>,
    entry: Option<BlockId>,
    exit: Option<BlockId>,
    exit_blocks: Vec<BlockId>,
    warnings: Vec<CfgWarning>,
}

impl Cfg {
    pub fn new(function: FunctionId, function_name: &str) -> Self {
        Self {
            function,
            function_name: function_name.to_string(),
            blocks: Vec::new(),
            edges: Vec::new(),
            entry: None,
            exit: None,
            exit_blocks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn create_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            label: if label.is_empty() {
                None
            } else {
                Some(label.to_string())
            },
            statements: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        id
    }

    /// Creates an edge and registers it in the source's outgoing list and
    /// the target's incoming list. The dual registration is what every
    /// traversal relies on; it happens in one place only.
    pub fn create_edge(
        &mut self,
        source: BlockId,
        target: BlockId,
        kind: EdgeKind,
        condition: Option<&str>,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            id,
            source,
            target,
            kind,
            condition: condition.map(|c| c.to_string()),
        });
        self.blocks[source.0].outgoing.push(id);
        self.blocks[target.0].incoming.push(id);
        id
    }

    pub fn add_statement(&mut self, block: BlockId, stmt: StmtId) {
        self.blocks[block.0].statements.push(stmt);
    }

    pub fn set_entry_block(&mut self, block: BlockId) {
        self.entry = Some(block);
    }

    /// Declares `block` as the function exit. Multiple returns declare
    /// multiple exits; the most recent declaration is the primary one, and
    /// every declared exit stays recorded in [`Cfg::exit_blocks`].
    pub fn set_exit_block(&mut self, block: BlockId) {
        self.exit = Some(block);
        if !self.exit_blocks.contains(&block) {
            self.exit_blocks.push(block);
        }
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.entry
    }

    pub fn exit_block(&self) -> Option<BlockId> {
        self.exit
    }

    pub fn exit_blocks(&self) -> &[BlockId] {
        &self.exit_blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn find_block_by_id(&self, id: usize) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[id.0]
            .outgoing
            .iter()
            .map(|&e| self.edges[e.0].target)
    }

    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[id.0]
            .incoming
            .iter()
            .map(|&e| self.edges[e.0].source)
    }

    pub(crate) fn push_warning(&mut self, warning: CfgWarning) {
        tracing::warn!(function = %self.function_name, "{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[CfgWarning] {
        &self.warnings
    }

    /// Consistency check: an entry block must be set, and every block other
    /// than a declared exit must have at least one outgoing edge. Problems
    /// are logged; only a missing entry makes the result `false`.
    pub fn verify(&self) -> bool {
        if self.entry.is_none() {
            tracing::warn!(function = %self.function_name, "CFG has no entry block");
            return false;
        }

        for block in &self.blocks {
            if block.outgoing.is_empty() && !self.exit_blocks.contains(&block.id) {
                tracing::warn!(
                    function = %self.function_name,
                    block = block.id.0,
                    "block has no outgoing edges and is not an exit block"
                );
            }
        }

        true
    }

    /// Human-readable listing: per block its id, label, and statement
    /// count, then each outgoing edge with its kind and condition label.
    pub fn dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "=== CFG for function: {} ===", self.function_name);

        for block in &self.blocks {
            let label = block.label.as_deref().unwrap_or("");
            let _ = writeln!(
                out,
                "  Block #{} [{}] ({} statements)",
                block.id.0,
                label,
                block.statements.len()
            );
            for &edge_id in &block.outgoing {
                let edge = &self.edges[edge_id.0];
                let _ = write!(out, "    -> Block #{} [{}]", edge.target.0, edge.kind.as_str());
                if let Some(cond) = &edge.condition {
                    let _ = write!(out, " (if {cond})");
                }
                out.push('\n');
            }
        }
        out
    }
}
