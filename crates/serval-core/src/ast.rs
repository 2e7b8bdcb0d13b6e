//! AST for the analyzed C subset
//!
//! Nodes live in `id-arena` arenas owned by an [`Ast`] value; children are
//! referenced by [`ExprId`]/[`StmtId`] indices. Downstream structures (the
//! CFG, the taint engine) store these indices rather than owning pointers,
//! so their lifetime is strictly nested within the `Ast` they were built
//! from. The `Ast` is immutable once parsing returns.

use id_arena::{Arena, Id};

pub type ExprId = Id<Expr>;
pub type StmtId = Id<Stmt>;

/// Index into [`Ast::functions`].
pub type FunctionId = usize;

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLoc {
    pub line: usize,
    pub column: usize,
}

impl SourceLoc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    Char,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::ModAssign
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddrOf,
}

/// Expression node. A closed sum type: every traversal dispatches here
/// exactly once, exhaustively.
#[derive(Debug)]
pub enum Expr {
    Variable {
        name: String,
        loc: SourceLoc,
    },
    Literal {
        value: String,
        kind: LiteralKind,
        loc: SourceLoc,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        loc: SourceLoc,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
        loc: SourceLoc,
    },
    Call {
        callee: String,
        args: Vec<ExprId>,
        loc: SourceLoc,
    },
}

impl Expr {
    pub fn loc(&self) -> SourceLoc {
        match self {
            Expr::Variable { loc, .. }
            | Expr::Literal { loc, .. }
            | Expr::Binary { loc, .. }
            | Expr::Unary { loc, .. }
            | Expr::Call { loc, .. } => *loc,
        }
    }

    /// The identifier if this is a direct variable reference.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Expr::Variable { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Statement node.
#[derive(Debug)]
pub enum Stmt {
    Expr {
        expr: ExprId,
        loc: SourceLoc,
    },
    VarDecl {
        type_name: String,
        name: String,
        init: Option<ExprId>,
        loc: SourceLoc,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
        loc: SourceLoc,
    },
    While {
        condition: ExprId,
        body: StmtId,
        loc: SourceLoc,
    },
    Return {
        value: Option<ExprId>,
        loc: SourceLoc,
    },
    Compound {
        statements: Vec<StmtId>,
        loc: SourceLoc,
    },
    Break {
        loc: SourceLoc,
    },
    Continue {
        loc: SourceLoc,
    },
}

impl Stmt {
    pub fn loc(&self) -> SourceLoc {
        match self {
            Stmt::Expr { loc, .. }
            | Stmt::VarDecl { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::Compound { loc, .. }
            | Stmt::Break { loc }
            | Stmt::Continue { loc } => *loc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub type_name: String,
    pub name: String,
    pub loc: SourceLoc,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub return_type: String,
    pub name: String,
    pub params: Vec<Param>,
    /// Body compound statement; `None` for declarations without a body.
    pub body: Option<StmtId>,
    pub loc: SourceLoc,
}

/// Owning arena storage for one translation unit's AST.
#[derive(Debug, Default)]
pub struct Ast {
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    pub functions: Vec<FunctionDecl>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.alloc(stmt)
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDecl> {
        self.functions.get(id)
    }

    /// Visit `expr` and all of its sub-expressions, outermost first.
    pub fn visit_expr(&self, expr: ExprId, f: &mut impl FnMut(ExprId, &Expr)) {
        let node = self.expr(expr);
        f(expr, node);
        match node {
            Expr::Binary { left, right, .. } => {
                self.visit_expr(*left, f);
                self.visit_expr(*right, f);
            }
            Expr::Unary { operand, .. } => self.visit_expr(*operand, f),
            Expr::Call { args, .. } => {
                for arg in args {
                    self.visit_expr(*arg, f);
                }
            }
            Expr::Variable { .. } | Expr::Literal { .. } => {}
        }
    }

    /// Visit `stmt` and every statement nested beneath it, in source order.
    pub fn visit_stmt(&self, stmt: StmtId, f: &mut impl FnMut(StmtId, &Stmt)) {
        let node = self.stmt(stmt);
        f(stmt, node);
        match node {
            Stmt::Compound { statements, .. } => {
                for child in statements {
                    self.visit_stmt(*child, f);
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.visit_stmt(*then_branch, f);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(*else_branch, f);
                }
            }
            Stmt::While { body, .. } => self.visit_stmt(*body, f),
            Stmt::Expr { .. }
            | Stmt::VarDecl { .. }
            | Stmt::Return { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. } => {}
        }
    }

    /// Visit every expression reachable from `stmt`, including nested
    /// statements' expressions and all sub-expressions.
    pub fn visit_exprs_in_stmt(&self, stmt: StmtId, f: &mut impl FnMut(ExprId, &Expr)) {
        self.visit_stmt(stmt, &mut |_, node| {
            let roots: Vec<ExprId> = match node {
                Stmt::Expr { expr, .. } => vec![*expr],
                Stmt::VarDecl { init, .. } => init.iter().copied().collect(),
                Stmt::If { condition, .. } => vec![*condition],
                Stmt::While { condition, .. } => vec![*condition],
                Stmt::Return { value, .. } => value.iter().copied().collect(),
                Stmt::Compound { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => Vec::new(),
            };
            for root in roots {
                self.visit_expr(root, f);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    #[test]
    fn arena_ids_are_stable_references() {
        let mut ast = Ast::new();
        let x = ast.alloc_expr(Expr::Variable {
            name: "x".to_string(),
            loc: loc(),
        });
        let y = ast.alloc_expr(Expr::Variable {
            name: "y".to_string(),
            loc: loc(),
        });

        assert_eq!(ast.expr(x).as_variable(), Some("x"));
        assert_eq!(ast.expr(y).as_variable(), Some("y"));
    }

    #[test]
    fn visit_expr_reaches_all_subexpressions() {
        let mut ast = Ast::new();
        let a = ast.alloc_expr(Expr::Variable {
            name: "a".to_string(),
            loc: loc(),
        });
        let b = ast.alloc_expr(Expr::Variable {
            name: "b".to_string(),
            loc: loc(),
        });
        let sum = ast.alloc_expr(Expr::Binary {
            op: BinaryOp::Add,
            left: a,
            right: b,
            loc: loc(),
        });
        let call = ast.alloc_expr(Expr::Call {
            callee: "f".to_string(),
            args: vec![sum],
            loc: loc(),
        });

        let mut names = Vec::new();
        ast.visit_expr(call, &mut |_, e| {
            if let Some(name) = e.as_variable() {
                names.push(name.to_string());
            }
        });

        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn visit_stmt_walks_nested_bodies() {
        let mut ast = Ast::new();
        let cond = ast.alloc_expr(Expr::Variable {
            name: "c".to_string(),
            loc: loc(),
        });
        let inner = ast.alloc_stmt(Stmt::Break { loc: loc() });
        let body = ast.alloc_stmt(Stmt::Compound {
            statements: vec![inner],
            loc: loc(),
        });
        let while_stmt = ast.alloc_stmt(Stmt::While {
            condition: cond,
            body,
            loc: loc(),
        });

        let mut count = 0;
        ast.visit_stmt(while_stmt, &mut |_, _| count += 1);

        assert_eq!(count, 3, "while + compound + break");
    }

    #[test]
    fn assignment_operators_are_classified() {
        assert!(BinaryOp::Assign.is_assignment());
        assert!(BinaryOp::AddAssign.is_assignment());
        assert!(!BinaryOp::Add.is_assignment());
        assert!(!BinaryOp::Eq.is_assignment());
    }

    #[test]
    fn source_loc_displays_line_and_column() {
        assert_eq!(SourceLoc::new(3, 7).to_string(), "3:7");
    }
}
