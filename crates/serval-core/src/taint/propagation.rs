//! Taint dataflow over the control-flow graph
//!
//! A monotone, set-union dataflow analysis run per function. Each block's
//! entry state is the union of its predecessors' exit states; per-statement
//! transfer rules grow the set; a set-backed FIFO worklist reschedules a
//! block's successors whenever its exit set grows. The lattice (subsets of
//! the identifiers mentioned in the function) is finite and the transfer
//! functions only add, so the iteration terminates; a generous cap guards
//! against regressions and reports instead of looping.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ast::{Ast, Expr, ExprId, SourceLoc, Stmt, StmtId};
use crate::cfg::{BlockId, Cfg};

use super::sinks::{SinkKind, TaintSinksRegistry};
use super::sources::{SourceKind, TaintSourcesRegistry};

/// A program name (variable identifier) considered reachable from an
/// untrusted source.
///
/// Equality and hashing are by identifier alone: multiple taints on the
/// same name collapse to one entry, so the provenance of the first-seen
/// taint wins within a set.
#[derive(Debug, Clone)]
pub struct TaintedValue {
    pub identifier: String,
    pub kind: SourceKind,
    /// Where the taint originated.
    pub location: SourceLoc,
    /// 0 = direct source, N = propagated N hops.
    pub depth: u32,
}

impl PartialEq for TaintedValue {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for TaintedValue {}

impl std::hash::Hash for TaintedValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

pub type TaintSet = HashSet<TaintedValue>;

/// A recorded source-to-sink candidate: a tainted variable used as a
/// direct argument of a sink call.
#[derive(Debug, Clone)]
pub struct TaintFlow {
    pub source: TaintedValue,
    pub sink: String,
    pub sink_kind: SinkKind,
    pub location: SourceLoc,
}

/// Per-function taint analysis driver. Borrows the AST and CFG only for
/// the duration of [`TaintEngine::analyze`]; the produced [`TaintReport`]
/// owns its data.
pub struct TaintEngine<'a> {
    ast: &'a Ast,
    cfg: &'a Cfg,
    sources: &'a TaintSourcesRegistry,
    sinks: &'a TaintSinksRegistry,
    seeds: TaintSet,
}

impl<'a> TaintEngine<'a> {
    pub fn new(
        ast: &'a Ast,
        cfg: &'a Cfg,
        sources: &'a TaintSourcesRegistry,
        sinks: &'a TaintSinksRegistry,
    ) -> Self {
        Self {
            ast,
            cfg,
            sources,
            sinks,
            seeds: TaintSet::new(),
        }
    }

    /// Adds an initial taint present at the entry block's entry state.
    /// Used by callers that carry taint across function boundaries and by
    /// the monotonicity property tests.
    pub fn add_seed(&mut self, seed: TaintedValue) {
        self.seeds.insert(seed);
    }

    /// Runs the dataflow to a fixed point and collects sink findings.
    pub fn analyze(self) -> TaintReport {
        let block_ids: Vec<BlockId> = self.cfg.blocks().map(|b| b.id).collect();

        let mut state: HashMap<usize, TaintSet> = block_ids
            .iter()
            .map(|id| (id.0, TaintSet::new()))
            .collect();

        // Set-backed FIFO worklist, seeded with every block in id order so
        // blocks unreachable from the entry still get a defined state.
        let mut worklist: VecDeque<BlockId> = block_ids.iter().copied().collect();
        let mut queued: HashSet<BlockId> = block_ids.iter().copied().collect();

        let cap = self.cfg.block_count() * 16 + 256;
        let mut iterations = 0usize;
        let mut converged = true;

        while let Some(block_id) = worklist.pop_front() {
            queued.remove(&block_id);

            iterations += 1;
            if iterations > cap {
                tracing::warn!(
                    function = self.cfg.function_name(),
                    cap,
                    "taint propagation exceeded its iteration cap; results may be incomplete"
                );
                converged = false;
                break;
            }

            let mut working = self.entry_state(block_id, &state);
            let mut discarded = Vec::new();
            for &stmt in &self.cfg.block(block_id).statements {
                self.transfer(stmt, &mut working, &mut discarded);
            }

            // Transfer functions only add, so a length change is the only
            // way the (monotone) exit set can differ.
            let changed = match state.get(&block_id.0) {
                Some(old) => old.len() != working.len(),
                None => true,
            };
            if changed {
                state.insert(block_id.0, working);
                for successor in self.cfg.successors(block_id) {
                    if queued.insert(successor) {
                        worklist.push_back(successor);
                    }
                }
            }
        }

        // Findings are collected in one pass over the converged state so
        // worklist revisits cannot duplicate them.
        let mut flows = Vec::new();
        for &block_id in &block_ids {
            let mut working = self.entry_state(block_id, &state);
            for &stmt in &self.cfg.block(block_id).statements {
                self.transfer(stmt, &mut working, &mut flows);
            }
        }

        tracing::debug!(
            function = self.cfg.function_name(),
            iterations,
            flows = flows.len(),
            "taint analysis finished"
        );

        TaintReport {
            function_name: self.cfg.function_name().to_string(),
            block_order: block_ids.iter().map(|id| id.0).collect(),
            state,
            exit_block: self.cfg.exit_block().map(|id| id.0),
            flows,
            converged,
        }
    }

    /// Union of the exit states of all predecessor blocks, plus the
    /// initial seeds for the entry block.
    fn entry_state(&self, block: BlockId, state: &HashMap<usize, TaintSet>) -> TaintSet {
        let mut entry = TaintSet::new();
        if Some(block) == self.cfg.entry_block() {
            entry.extend(self.seeds.iter().cloned());
        }
        for pred in self.cfg.predecessors(block) {
            if let Some(pred_exit) = state.get(&pred.0) {
                entry.extend(pred_exit.iter().cloned());
            }
        }
        entry
    }

    /// Per-statement transfer function. Control-flow statements are
    /// no-ops here: their nested statements live in their own blocks.
    fn transfer(&self, stmt: StmtId, taint: &mut TaintSet, flows: &mut Vec<TaintFlow>) {
        match self.ast.stmt(stmt) {
            Stmt::Expr { expr, .. } => self.transfer_expr(*expr, taint, flows),
            Stmt::VarDecl {
                name,
                init: Some(init),
                ..
            } => self.transfer_decl(name, *init, taint),
            Stmt::Return {
                value: Some(value), ..
            } => {
                // Analyzed for sink uses inside the returned expression;
                // nothing outside the function is tainted by a return.
                self.transfer_expr(*value, taint, flows);
            }
            Stmt::VarDecl { init: None, .. }
            | Stmt::Return { value: None, .. }
            | Stmt::If { .. }
            | Stmt::While { .. }
            | Stmt::Compound { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. } => {}
        }
    }

    fn transfer_expr(&self, expr: ExprId, taint: &mut TaintSet, flows: &mut Vec<TaintFlow>) {
        match self.ast.expr(expr) {
            Expr::Call { callee, args, loc } => {
                if let Some(kind) = self.sources.classify(callee) {
                    self.taint_receiving_argument(args, kind, *loc, taint);
                }
                if let Some(sink_kind) = self.sinks.classify(callee) {
                    self.check_sink_arguments(callee, args, sink_kind, *loc, taint, flows);
                }
            }
            Expr::Binary { left, right, .. } => {
                self.propagate_assignment(*left, *right, taint);
            }
            Expr::Variable { .. } | Expr::Literal { .. } | Expr::Unary { .. } => {}
        }
    }

    /// A source call taints its receiving argument: index 1 for sources
    /// taking a format/descriptor first (`scanf(fmt, buf)`, `read(fd,
    /// buf, n)`), index 0 for one-argument sources (`gets(buf)`). Only a
    /// direct variable reference can be tainted; complex sub-expressions
    /// are not traced.
    fn taint_receiving_argument(
        &self,
        args: &[ExprId],
        kind: SourceKind,
        loc: SourceLoc,
        taint: &mut TaintSet,
    ) {
        let receiver = if args.len() >= 2 {
            args.get(1)
        } else {
            args.first()
        };
        let Some(&receiver) = receiver else {
            return;
        };

        if let Some(name) = self.ast.expr(receiver).as_variable() {
            tracing::debug!(variable = name, "tainted by source call");
            taint.insert(TaintedValue {
                identifier: name.to_string(),
                kind,
                location: loc,
                depth: 0,
            });
        }
    }

    fn check_sink_arguments(
        &self,
        callee: &str,
        args: &[ExprId],
        sink_kind: SinkKind,
        loc: SourceLoc,
        taint: &TaintSet,
        flows: &mut Vec<TaintFlow>,
    ) {
        for &arg in args {
            let Some(name) = self.ast.expr(arg).as_variable() else {
                continue;
            };
            if let Some(tainted) = find_taint(taint, name) {
                tracing::debug!(
                    variable = name,
                    sink = callee,
                    "tainted variable reaches sink"
                );
                flows.push(TaintFlow {
                    source: tainted.clone(),
                    sink: callee.to_string(),
                    sink_kind,
                    location: loc,
                });
            }
        }
    }

    /// A declaration with an initializer propagates taint from the
    /// initializer to the declared variable, one hop deeper.
    fn transfer_decl(&self, name: &str, init: ExprId, taint: &mut TaintSet) {
        match self.ast.expr(init) {
            Expr::Variable {
                name: init_name, ..
            } => {
                if let Some(existing) = find_taint(taint, init_name) {
                    let propagated = TaintedValue {
                        identifier: name.to_string(),
                        kind: existing.kind,
                        location: existing.location,
                        depth: existing.depth + 1,
                    };
                    tracing::debug!(from = init_name.as_str(), to = name, "taint propagated");
                    taint.insert(propagated);
                }
            }
            Expr::Call { callee, loc, .. } => {
                if let Some(kind) = self.sources.classify(callee) {
                    tracing::debug!(variable = name, "initialized from source call");
                    taint.insert(TaintedValue {
                        identifier: name.to_string(),
                        kind,
                        location: *loc,
                        depth: 0,
                    });
                }
            }
            _ => {}
        }
    }

    /// Binary expressions are conservatively treated as potential
    /// assignments: a tainted right operand (variable or source call)
    /// taints a direct-variable left operand.
    fn propagate_assignment(&self, left: ExprId, right: ExprId, taint: &mut TaintSet) {
        let Some(lhs_name) = self.ast.expr(left).as_variable() else {
            return;
        };

        match self.ast.expr(right) {
            Expr::Variable { name, .. } => {
                if let Some(existing) = find_taint(taint, name) {
                    let propagated = TaintedValue {
                        identifier: lhs_name.to_string(),
                        kind: existing.kind,
                        location: existing.location,
                        depth: existing.depth + 1,
                    };
                    taint.insert(propagated);
                }
            }
            Expr::Call { callee, loc, .. } => {
                if let Some(kind) = self.sources.classify(callee) {
                    taint.insert(TaintedValue {
                        identifier: lhs_name.to_string(),
                        kind,
                        location: *loc,
                        depth: 1,
                    });
                }
            }
            _ => {}
        }
    }
}

fn find_taint<'s>(taint: &'s TaintSet, name: &str) -> Option<&'s TaintedValue> {
    taint.iter().find(|t| t.identifier == name)
}

/// Owned result of one [`TaintEngine::analyze`] run.
#[derive(Debug)]
pub struct TaintReport {
    function_name: String,
    /// Block ids in creation order, for deterministic iteration.
    block_order: Vec<usize>,
    /// Block id -> taint set at block exit.
    state: HashMap<usize, TaintSet>,
    exit_block: Option<usize>,
    flows: Vec<TaintFlow>,
    converged: bool,
}

impl TaintReport {
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Source-to-sink candidates found after convergence. Best-effort:
    /// may be empty even when taints exist.
    pub fn flows(&self) -> &[TaintFlow] {
        &self.flows
    }

    /// Whether the worklist drained before hitting the defensive cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Distinct taint sources across all blocks, deduplicated by
    /// identifier (first occurrence wins). The order has no contractual
    /// relationship with source order.
    pub fn taint_sources(&self) -> Vec<TaintedValue> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for &block in &self.block_order {
            let Some(set) = self.state.get(&block) else {
                continue;
            };
            let mut entries: Vec<&TaintedValue> = set.iter().collect();
            entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            for taint in entries {
                if seen.insert(taint.identifier.clone()) {
                    sources.push(taint.clone());
                }
            }
        }

        sources
    }

    /// Taint set at the function's declared exit block; empty when the
    /// function has none (bodyless functions).
    pub fn exit_taints(&self) -> TaintSet {
        self.exit_block
            .and_then(|id| self.state.get(&id))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `name` is tainted at the exit of `block`, or anywhere in
    /// the function when `block` is `None`.
    pub fn is_tainted(&self, name: &str, block: Option<BlockId>) -> bool {
        match block {
            Some(block) => self
                .state
                .get(&block.0)
                .is_some_and(|set| find_taint(set, name).is_some()),
            None => self
                .state
                .values()
                .any(|set| find_taint(set, name).is_some()),
        }
    }

    pub fn block_taints(&self, block: BlockId) -> Option<&TaintSet> {
        self.state.get(&block.0)
    }

    /// Debug dump: per block, each tainted identifier with its source
    /// kind and propagation depth.
    pub fn graph_dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "Taint graph for function: {}", self.function_name);

        for &block in &self.block_order {
            let _ = writeln!(out, "Block #{block}:");
            let taints = self.state.get(&block);
            match taints {
                Some(set) if !set.is_empty() => {
                    let mut entries: Vec<&TaintedValue> = set.iter().collect();
                    entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
                    for taint in entries {
                        let _ = writeln!(
                            out,
                            "  - {} (source: {}, depth: {})",
                            taint.identifier,
                            taint.kind.as_str(),
                            taint.depth
                        );
                    }
                }
                _ => {
                    let _ = writeln!(out, "  (no taints)");
                }
            }
        }

        out
    }
}
