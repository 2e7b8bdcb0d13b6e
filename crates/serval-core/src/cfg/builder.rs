//! CFG construction from a function's statement tree
//!
//! Structured recursive descent over statement kinds: the builder keeps a
//! "current block" cursor plus break/continue target stacks, and emits
//! blocks and typed edges as it walks. Malformed or unexpected input is
//! tolerated — the builder reports structural problems as [`CfgWarning`]s
//! and keeps going; it never panics out of [`CfgBuilder::build`].

use crate::ast::{Ast, FunctionId, Stmt, StmtId};

use super::{BlockId, Cfg, CfgWarning, EdgeKind};

pub struct CfgBuilder<'a> {
    ast: &'a Ast,
    cfg: Cfg,
    current: BlockId,
    break_targets: Vec<BlockId>,
    continue_targets: Vec<BlockId>,
}

impl<'a> CfgBuilder<'a> {
    /// Builds the CFG for one function. A function without a body yields a
    /// degenerate graph containing only the entry block.
    pub fn build(ast: &'a Ast, function: FunctionId) -> Cfg {
        let name = ast
            .function(function)
            .map(|f| f.name.as_str())
            .unwrap_or("<unknown>");
        let mut cfg = Cfg::new(function, name);

        let entry = cfg.create_block("entry");
        cfg.set_entry_block(entry);

        let body = ast.function(function).and_then(|f| f.body);
        let Some(body) = body else {
            return cfg;
        };

        let mut builder = Self {
            ast,
            cfg,
            current: entry,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
        };
        builder.visit_stmt(body);

        let mut cfg = builder.cfg;

        // Implicit fall-off-the-end return.
        if cfg.block(builder.current).outgoing.is_empty() {
            let exit = cfg.create_block("exit");
            cfg.set_exit_block(exit);
            cfg.create_edge(builder.current, exit, EdgeKind::FallThrough, None);
        }

        tracing::debug!(
            function = name,
            blocks = cfg.block_count(),
            "built CFG"
        );
        cfg
    }

    fn visit_stmt(&mut self, stmt: StmtId) {
        match self.ast.stmt(stmt) {
            Stmt::Compound { statements, .. } => {
                // A compound statement is not its own block; it only
                // sequences its children.
                let children = statements.clone();
                for child in children {
                    self.visit_stmt(child);
                }
            }
            Stmt::If { .. } => self.visit_if(stmt),
            Stmt::While { .. } => self.visit_while(stmt),
            Stmt::Return { .. } => self.visit_return(stmt),
            Stmt::Break { loc } => {
                let loc = *loc;
                self.cfg.add_statement(self.current, stmt);
                match self.break_targets.last().copied() {
                    Some(target) => {
                        self.cfg.create_edge(self.current, target, EdgeKind::Jump, None);
                        self.current = self.cfg.create_block("after_break");
                    }
                    None => self.cfg.push_warning(CfgWarning::BreakOutsideLoop(loc)),
                }
            }
            Stmt::Continue { loc } => {
                let loc = *loc;
                self.cfg.add_statement(self.current, stmt);
                match self.continue_targets.last().copied() {
                    Some(target) => {
                        self.cfg.create_edge(self.current, target, EdgeKind::Jump, None);
                        self.current = self.cfg.create_block("after_continue");
                    }
                    None => self.cfg.push_warning(CfgWarning::ContinueOutsideLoop(loc)),
                }
            }
            Stmt::Expr { .. } | Stmt::VarDecl { .. } => {
                self.cfg.add_statement(self.current, stmt);
            }
        }
    }

    fn visit_if(&mut self, stmt: StmtId) {
        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = self.ast.stmt(stmt)
        else {
            return;
        };
        let then_branch = *then_branch;
        let else_branch = *else_branch;

        // The block active when the condition is reached is the condition
        // block; the if statement itself is recorded there.
        let condition_block = self.current;
        self.cfg.add_statement(condition_block, stmt);

        let then_block = self.cfg.create_block("if_then");
        let merge_block = self.cfg.create_block("if_merge");

        self.cfg
            .create_edge(condition_block, then_block, EdgeKind::TrueBranch, None);

        self.current = then_block;
        self.visit_stmt(then_branch);
        self.cfg
            .create_edge(self.current, merge_block, EdgeKind::FallThrough, None);

        match else_branch {
            Some(else_branch) => {
                let else_block = self.cfg.create_block("if_else");
                self.cfg
                    .create_edge(condition_block, else_block, EdgeKind::FalseBranch, None);

                self.current = else_block;
                self.visit_stmt(else_branch);
                self.cfg
                    .create_edge(self.current, merge_block, EdgeKind::FallThrough, None);
            }
            None => {
                self.cfg
                    .create_edge(condition_block, merge_block, EdgeKind::FalseBranch, None);
            }
        }

        self.current = merge_block;
    }

    fn visit_while(&mut self, stmt: StmtId) {
        let Stmt::While { body, .. } = self.ast.stmt(stmt) else {
            return;
        };
        let body = *body;

        let header = self.cfg.create_block("while_header");
        let body_block = self.cfg.create_block("while_body");
        let exit_block = self.cfg.create_block("while_exit");

        self.cfg
            .create_edge(self.current, header, EdgeKind::FallThrough, None);

        self.break_targets.push(exit_block);
        self.continue_targets.push(header);

        self.current = header;
        self.cfg.add_statement(header, stmt);

        self.cfg
            .create_edge(header, body_block, EdgeKind::TrueBranch, None);
        self.cfg
            .create_edge(header, exit_block, EdgeKind::FalseBranch, None);

        self.current = body_block;
        self.visit_stmt(body);
        self.cfg
            .create_edge(self.current, header, EdgeKind::LoopBack, None);

        self.break_targets.pop();
        self.continue_targets.pop();

        self.current = exit_block;
    }

    fn visit_return(&mut self, stmt: StmtId) {
        self.cfg.add_statement(self.current, stmt);

        let exit_block = self.cfg.create_block("exit");
        self.cfg.set_exit_block(exit_block);
        self.cfg
            .create_edge(self.current, exit_block, EdgeKind::Return, None);

        self.current = exit_block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BasicBlock;
    use crate::parser::ParsedFile;

    fn build_cfg(source: &str) -> (ParsedFile, Cfg) {
        let parsed = ParsedFile::from_source("test.c", source);
        assert!(
            !parsed.metadata().has_errors,
            "fixture should parse cleanly: {:?}",
            parsed.errors()
        );
        let cfg = CfgBuilder::build(parsed.ast(), 0);
        (parsed, cfg)
    }

    fn edge_kinds_out(cfg: &Cfg, block: &BasicBlock) -> Vec<EdgeKind> {
        block.outgoing.iter().map(|&e| cfg.edge(e).kind).collect()
    }

    #[test]
    fn empty_function_has_entry_and_synthesized_exit() {
        let (_, cfg) = build_cfg("void f() { }");

        assert_eq!(cfg.block_count(), 2);
        let entry = cfg.entry_block().expect("entry set");
        let exit = cfg.exit_block().expect("exit synthesized");
        assert_eq!(
            edge_kinds_out(&cfg, cfg.block(entry)),
            vec![EdgeKind::FallThrough]
        );
        assert!(cfg.block(exit).outgoing.is_empty());
        assert!(cfg.verify());
    }

    #[test]
    fn bodyless_function_yields_entry_only() {
        let (_, cfg) = build_cfg("int helper(int x);");

        assert_eq!(cfg.block_count(), 1);
        assert!(cfg.entry_block().is_some());
        assert!(cfg.exit_block().is_none());
    }

    #[test]
    fn sequential_statements_share_one_block() {
        let (_, cfg) = build_cfg("void f() { int a = 1; int b = 2; a = b; }");

        let entry = cfg.entry_block().unwrap();
        assert_eq!(cfg.block(entry).statements.len(), 3);
        assert_eq!(cfg.block_count(), 2, "entry + synthesized exit");
    }

    #[test]
    fn if_condition_block_has_true_and_false_branch_pair() {
        let (_, cfg) = build_cfg("void f(int c) { if (c) { c = 1; } }");

        let entry = cfg.entry_block().unwrap();
        let kinds = edge_kinds_out(&cfg, cfg.block(entry));
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&EdgeKind::TrueBranch));
        assert!(kinds.contains(&EdgeKind::FalseBranch));
    }

    #[test]
    fn if_without_else_merges_via_false_branch() {
        let (_, cfg) = build_cfg("void f(int c) { if (c) { c = 1; } c = 2; }");

        let entry = cfg.entry_block().unwrap();
        let true_target = cfg
            .block(entry)
            .outgoing
            .iter()
            .map(|&e| cfg.edge(e))
            .find(|e| e.kind == EdgeKind::TrueBranch)
            .map(|e| e.target)
            .expect("true branch");
        let false_target = cfg
            .block(entry)
            .outgoing
            .iter()
            .map(|&e| cfg.edge(e))
            .find(|e| e.kind == EdgeKind::FalseBranch)
            .map(|e| e.target)
            .expect("false branch");

        // The then-path reaches the false-branch target (the merge block)
        // via a fall-through edge.
        let then_out: Vec<_> = cfg
            .block(true_target)
            .outgoing
            .iter()
            .map(|&e| cfg.edge(e))
            .collect();
        assert_eq!(then_out.len(), 1);
        assert_eq!(then_out[0].kind, EdgeKind::FallThrough);
        assert_eq!(then_out[0].target, false_target);
    }

    #[test]
    fn if_else_branches_reach_common_merge() {
        let (_, cfg) = build_cfg("void f(int c) { if (c) { c = 1; } else { c = 2; } c = 3; }");

        let entry = cfg.entry_block().unwrap();
        let mut merge_targets = std::collections::HashSet::new();
        for &edge_id in &cfg.block(entry).outgoing {
            let branch_target = cfg.edge(edge_id).target;
            for &out in &cfg.block(branch_target).outgoing {
                let edge = cfg.edge(out);
                assert_eq!(edge.kind, EdgeKind::FallThrough);
                merge_targets.insert(edge.target);
            }
        }
        assert_eq!(merge_targets.len(), 1, "both arms reach one merge block");
    }

    #[test]
    fn while_header_has_loop_structure() {
        let (_, cfg) = build_cfg("void f(int c) { while (c) { c = c - 1; } }");

        let header = cfg
            .blocks()
            .find(|b| b.label.as_deref() == Some("while_header"))
            .expect("header block");

        let kinds = edge_kinds_out(&cfg, header);
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&EdgeKind::TrueBranch));
        assert!(kinds.contains(&EdgeKind::FalseBranch));

        let loop_back = cfg
            .edges()
            .find(|e| e.kind == EdgeKind::LoopBack)
            .expect("loop back edge");
        assert_eq!(loop_back.target, header.id);
    }

    #[test]
    fn while_true_branch_targets_body_and_false_targets_exit() {
        let (_, cfg) = build_cfg("void f(int c) { while (c) { c = c - 1; } }");

        let header = cfg
            .blocks()
            .find(|b| b.label.as_deref() == Some("while_header"))
            .unwrap();
        for &edge_id in &header.outgoing {
            let edge = cfg.edge(edge_id);
            let target_label = cfg.block(edge.target).label.as_deref();
            match edge.kind {
                EdgeKind::TrueBranch => assert_eq!(target_label, Some("while_body")),
                EdgeKind::FalseBranch => assert_eq!(target_label, Some("while_exit")),
                other => panic!("unexpected edge kind {other:?} out of header"),
            }
        }
    }

    #[test]
    fn return_creates_return_edge_to_new_exit() {
        let (_, cfg) = build_cfg("int f() { return 1; }");

        let entry = cfg.entry_block().unwrap();
        let kinds = edge_kinds_out(&cfg, cfg.block(entry));
        assert_eq!(kinds, vec![EdgeKind::Return]);

        let exit = cfg.exit_block().expect("exit declared by return");
        assert!(cfg.block(exit).outgoing.is_empty());
    }

    #[test]
    fn multiple_returns_declare_multiple_exits() {
        let (_, cfg) = build_cfg("int f(int c) { if (c) { return 1; } return 0; }");

        assert!(cfg.exit_blocks().len() >= 2);
        let declared = cfg.exit_block().unwrap();
        assert!(cfg.exit_blocks().contains(&declared));
    }

    #[test]
    fn break_emits_jump_to_loop_exit() {
        let (_, cfg) = build_cfg("void f(int c) { while (c) { break; } }");

        let jump = cfg
            .edges()
            .find(|e| e.kind == EdgeKind::Jump)
            .expect("jump edge for break");
        let target_label = cfg.block(jump.target).label.as_deref();
        assert_eq!(target_label, Some("while_exit"));
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn continue_emits_jump_to_loop_header() {
        let (_, cfg) = build_cfg("void f(int c) { while (c) { continue; } }");

        let jump = cfg
            .edges()
            .find(|e| e.kind == EdgeKind::Jump)
            .expect("jump edge for continue");
        let target_label = cfg.block(jump.target).label.as_deref();
        assert_eq!(target_label, Some("while_header"));
    }

    #[test]
    fn break_outside_loop_is_reported_not_swallowed() {
        let (_, cfg) = build_cfg("void f() { break; }");

        assert_eq!(cfg.warnings().len(), 1);
        assert!(matches!(cfg.warnings()[0], CfgWarning::BreakOutsideLoop(_)));
        assert!(!cfg.edges().any(|e| e.kind == EdgeKind::Jump));
    }

    #[test]
    fn continue_outside_loop_is_reported() {
        let (_, cfg) = build_cfg("void f() { continue; }");

        assert!(matches!(
            cfg.warnings()[0],
            CfgWarning::ContinueOutsideLoop(_)
        ));
    }

    #[test]
    fn nested_loops_track_innermost_targets() {
        let (_, cfg) = build_cfg(
            "void f(int a, int b) { while (a) { while (b) { break; } a = a - 1; } }",
        );

        // Two headers, two loop-back edges; the break jumps to the inner
        // loop's exit, not the outer one's.
        let headers: Vec<_> = cfg
            .blocks()
            .filter(|b| b.label.as_deref() == Some("while_header"))
            .collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(cfg.edges().filter(|e| e.kind == EdgeKind::LoopBack).count(), 2);

        let jump = cfg.edges().find(|e| e.kind == EdgeKind::Jump).unwrap();
        let inner_exit = cfg.block(jump.target);
        assert_eq!(inner_exit.label.as_deref(), Some("while_exit"));
        // The inner exit flows back into the outer loop body, so it has an
        // outgoing loop-back path rather than being a function exit.
        assert!(!cfg.exit_blocks().contains(&inner_exit.id));
    }

    #[test]
    fn if_inside_while_keeps_loop_back_from_merge() {
        let (_, cfg) =
            build_cfg("void f(int c) { while (c) { if (c) { c = 1; } else { c = 2; } } }");

        let loop_back = cfg
            .edges()
            .find(|e| e.kind == EdgeKind::LoopBack)
            .expect("loop back edge");
        let source = cfg.block(loop_back.source);
        assert_eq!(source.label.as_deref(), Some("if_merge"));
    }

    #[test]
    fn statements_after_return_land_in_exit_block() {
        let (_, cfg) = build_cfg("int f() { return 1; int dead = 2; }");

        let exit_with_dead = cfg
            .blocks()
            .find(|b| b.label.as_deref() == Some("exit") && !b.statements.is_empty());
        assert!(exit_with_dead.is_some(), "trailing statements are kept");
    }

    #[test]
    fn every_non_exit_block_has_successors_in_wellformed_input() {
        let (_, cfg) = build_cfg(
            "int f(int c) { int x = 0; while (c) { if (x) { x = 1; } c = c - 1; } return x; }",
        );

        assert!(cfg.verify());
        for block in cfg.blocks() {
            if !cfg.exit_blocks().contains(&block.id) {
                assert!(
                    !block.outgoing.is_empty(),
                    "block {:?} ({:?}) is a dead end",
                    block.id,
                    block.label
                );
            }
        }
    }
}
