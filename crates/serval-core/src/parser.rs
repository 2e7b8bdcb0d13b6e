//! Recursive-descent parser for the analyzed C subset
//!
//! Parses the token stream into an arena-backed [`Ast`]. Parsing never
//! fails hard: syntax errors are collected and the parser re-synchronizes
//! at the next statement boundary, so a file with errors still yields a
//! partial AST for the declarations that did parse.

use std::ops::Range;
use std::sync::OnceLock;

use crate::ast::{
    Ast, BinaryOp, Expr, ExprId, FunctionDecl, LiteralKind, Param, SourceLoc, Stmt, StmtId,
    UnaryOp,
};
use crate::disable_comments::DisableDirectives;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct ParseResult {
    pub ast: Ast,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub line_count: usize,
    pub has_errors: bool,
}

/// A parsed source file: source text, metadata, AST, and parse errors.
pub struct ParsedFile {
    source: String,
    metadata: FileMetadata,
    ast: Ast,
    errors: Vec<ParseError>,
    line_ranges: OnceLock<Vec<Range<usize>>>,
    disable_directives: DisableDirectives,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("metadata", &self.metadata)
            .field("function_count", &self.ast.functions.len())
            .field("error_count", &self.errors.len())
            .finish()
    }
}

impl ParsedFile {
    pub fn from_source(filename: &str, source: &str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        let result = Parser::new(tokens).parse();
        let disable_directives = DisableDirectives::from_source(source);

        let line_count = if source.is_empty() {
            0
        } else {
            source.lines().count()
        };

        let metadata = FileMetadata {
            filename: filename.to_string(),
            line_count,
            has_errors: result.has_errors(),
        };

        Self {
            source: source.to_string(),
            metadata,
            ast: result.ast,
            errors: result.errors,
            line_ranges: OnceLock::new(),
            disable_directives,
        }
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn disable_directives(&self) -> &DisableDirectives {
        &self.disable_directives
    }

    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 {
            return None;
        }

        let ranges = self.line_ranges.get_or_init(|| self.build_line_ranges());
        let index = line_number - 1;

        ranges.get(index).map(|range| &self.source[range.clone()])
    }

    fn build_line_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;

        for (i, c) in self.source.char_indices() {
            if c == '\n' {
                ranges.push(start..i);
                start = i + 1;
            }
        }

        if start < self.source.len() || (start == 0 && !self.source.is_empty()) {
            ranges.push(start..self.source.len());
        }

        ranges
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    ast: Ast,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            ast: Ast::new(),
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseResult {
        while !self.is_at_end() {
            if let Err(err) = self.parse_top_level() {
                self.errors.push(err);
                self.synchronize();
            }
        }

        ParseResult {
            ast: self.ast,
            errors: self.errors,
        }
    }

    /// Function definition or global variable declaration.
    fn parse_top_level(&mut self) -> Result<(), ParseError> {
        let type_name = self.parse_type_specifier()?;
        let name_token = self.consume(TokenKind::Identifier, "expected identifier")?;
        let name = name_token.lexeme.clone();
        let loc = SourceLoc::new(name_token.line, name_token.column);

        if self.check(TokenKind::LParen) {
            self.parse_function_rest(type_name, name, loc)
        } else {
            // Global variable: parsed for completeness, not analyzed.
            self.parse_var_decl_rest(type_name, name, loc)?;
            Ok(())
        }
    }

    fn parse_function_rest(
        &mut self,
        return_type: String,
        name: String,
        loc: SourceLoc,
    ) -> Result<(), ParseError> {
        self.consume(TokenKind::LParen, "expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            // A lone `void` parameter list declares no parameters.
            if self.check(TokenKind::Keyword(Keyword::Void))
                && self.peek_at(1).map(|t| t.kind) == Some(TokenKind::RParen)
            {
                self.advance();
            } else {
                loop {
                    params.push(self.parse_param()?);
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        self.consume(TokenKind::RParen, "expected ')' after parameters")?;

        let body = if self.matches(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_compound_statement()?)
        };

        self.ast.functions.push(FunctionDecl {
            return_type,
            name,
            params,
            body,
            loc,
        });
        Ok(())
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let type_name = self.parse_type_specifier()?;
        let name_token = self.consume(TokenKind::Identifier, "expected parameter name")?;
        let loc = SourceLoc::new(name_token.line, name_token.column);
        let name = name_token.lexeme.clone();

        // Array suffix on a parameter (char buf[]).
        if self.matches(TokenKind::LBracket) {
            if self.check(TokenKind::IntLiteral) {
                self.advance();
            }
            self.consume(TokenKind::RBracket, "expected ']' in array parameter")?;
        }

        Ok(Param {
            type_name,
            name,
            loc,
        })
    }

    /// One or more type-specifier keywords followed by optional `*`s,
    /// collected into a single display string ("unsigned int", "char *").
    fn parse_type_specifier(&mut self) -> Result<String, ParseError> {
        let mut parts = Vec::new();

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Keyword(kw) if kw.is_type_specifier() => {
                    parts.push(token.lexeme.clone());
                    self.advance();
                }
                _ => break,
            }
        }

        if parts.is_empty() {
            return Err(self.error_at_current("expected type specifier"));
        }

        let mut type_name = parts.join(" ");
        while self.matches(TokenKind::Star) {
            type_name.push_str(" *");
        }
        Ok(type_name)
    }

    fn parse_statement(&mut self) -> Result<StmtId, ParseError> {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(self.error_at_current("unexpected end of input")),
        };
        let loc = SourceLoc::new(token.line, token.column);

        match token.kind {
            TokenKind::LBrace => self.parse_compound_statement(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(loc),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(loc),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(loc),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';' after 'break'")?;
                Ok(self.ast.alloc_stmt(Stmt::Break { loc }))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';' after 'continue'")?;
                Ok(self.ast.alloc_stmt(Stmt::Continue { loc }))
            }
            TokenKind::Keyword(kw) if kw.is_type_specifier() => self.parse_declaration_statement(),
            _ => self.parse_expression_statement(loc),
        }
    }

    fn parse_compound_statement(&mut self) -> Result<StmtId, ParseError> {
        let brace = self.consume(TokenKind::LBrace, "expected '{'")?;
        let loc = SourceLoc::new(brace.line, brace.column);

        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        self.consume(TokenKind::RBrace, "expected '}'")?;

        Ok(self.ast.alloc_stmt(Stmt::Compound { statements, loc }))
    }

    fn parse_if_statement(&mut self, loc: SourceLoc) -> Result<StmtId, ParseError> {
        self.advance(); // 'if'
        self.consume(TokenKind::LParen, "expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected ')' after condition")?;

        let then_branch = self.parse_statement()?;
        let else_branch = if self.matches(TokenKind::Keyword(Keyword::Else)) {
            Some(self.parse_statement()?)
        } else {
            None
        };

        Ok(self.ast.alloc_stmt(Stmt::If {
            condition,
            then_branch,
            else_branch,
            loc,
        }))
    }

    fn parse_while_statement(&mut self, loc: SourceLoc) -> Result<StmtId, ParseError> {
        self.advance(); // 'while'
        self.consume(TokenKind::LParen, "expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected ')' after condition")?;
        let body = self.parse_statement()?;

        Ok(self.ast.alloc_stmt(Stmt::While {
            condition,
            body,
            loc,
        }))
    }

    fn parse_return_statement(&mut self, loc: SourceLoc) -> Result<StmtId, ParseError> {
        self.advance(); // 'return'
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "expected ';' after return value")?;

        Ok(self.ast.alloc_stmt(Stmt::Return { value, loc }))
    }

    fn parse_declaration_statement(&mut self) -> Result<StmtId, ParseError> {
        let type_name = self.parse_type_specifier()?;
        let name_token = self.consume(TokenKind::Identifier, "expected variable name")?;
        let name = name_token.lexeme.clone();
        let loc = SourceLoc::new(name_token.line, name_token.column);
        self.parse_var_decl_rest(type_name, name, loc)
    }

    fn parse_var_decl_rest(
        &mut self,
        mut type_name: String,
        name: String,
        loc: SourceLoc,
    ) -> Result<StmtId, ParseError> {
        if self.matches(TokenKind::LBracket) {
            type_name.push('[');
            if self.check(TokenKind::IntLiteral) {
                type_name.push_str(&self.peek().map(|t| t.lexeme.clone()).unwrap_or_default());
                self.advance();
            }
            type_name.push(']');
            self.consume(TokenKind::RBracket, "expected ']' in array declaration")?;
        }

        let init = if self.matches(TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "expected ';' after declaration")?;

        Ok(self.ast.alloc_stmt(Stmt::VarDecl {
            type_name,
            name,
            init,
            loc,
        }))
    }

    fn parse_expression_statement(&mut self, loc: SourceLoc) -> Result<StmtId, ParseError> {
        let expr = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(self.ast.alloc_stmt(Stmt::Expr { expr, loc }))
    }

    // ==================== Expressions ====================

    fn parse_expression(&mut self) -> Result<ExprId, ParseError> {
        self.parse_assignment()
    }

    /// Assignment is right-associative: `a = b = c` parses as `a = (b = c)`.
    fn parse_assignment(&mut self) -> Result<ExprId, ParseError> {
        let left = self.parse_logical_or()?;

        let op = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Assign) => BinaryOp::Assign,
            Some(TokenKind::PlusAssign) => BinaryOp::AddAssign,
            Some(TokenKind::MinusAssign) => BinaryOp::SubAssign,
            Some(TokenKind::StarAssign) => BinaryOp::MulAssign,
            Some(TokenKind::SlashAssign) => BinaryOp::DivAssign,
            Some(TokenKind::PercentAssign) => BinaryOp::ModAssign,
            _ => return Ok(left),
        };
        let loc = self.current_loc();
        self.advance();
        let right = self.parse_assignment()?;

        Ok(self.ast.alloc_expr(Expr::Binary {
            op,
            left,
            right,
            loc,
        }))
    }

    fn parse_logical_or(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.check(TokenKind::OrOr) {
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_logical_and()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op: BinaryOp::LogicalOr,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::AndAnd) {
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_equality()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op: BinaryOp::LogicalAnd,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::Ne) => BinaryOp::Ne,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_comparison()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Le) => BinaryOp::Le,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Ge) => BinaryOp::Ge,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_term()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_factor()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_unary()?;
            left = self.ast.alloc_expr(Expr::Binary {
                op,
                left,
                right,
                loc,
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let op = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Not) => Some(UnaryOp::Not),
            Some(TokenKind::Star) => Some(UnaryOp::Deref),
            Some(TokenKind::Amp) => Some(UnaryOp::AddrOf),
            _ => None,
        };

        if let Some(op) = op {
            let loc = self.current_loc();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ast.alloc_expr(Expr::Unary { op, operand, loc }));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(self.error_at_current("expected expression")),
        };
        let loc = SourceLoc::new(token.line, token.column);

        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr::Literal {
                    value: token.lexeme,
                    kind: LiteralKind::Int,
                    loc,
                }))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr::Literal {
                    value: token.lexeme,
                    kind: LiteralKind::Float,
                    loc,
                }))
            }
            TokenKind::CharLiteral => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr::Literal {
                    value: token.lexeme,
                    kind: LiteralKind::Char,
                    loc,
                }))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr::Literal {
                    value: token.lexeme,
                    kind: LiteralKind::Str,
                    loc,
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    self.finish_call(token.lexeme, loc)
                } else {
                    // Array subscripts degrade to the base variable; index
                    // expressions are not modeled.
                    if self.matches(TokenKind::LBracket) {
                        let _ = self.parse_expression()?;
                        self.consume(TokenKind::RBracket, "expected ']'")?;
                    }
                    Ok(self.ast.alloc_expr(Expr::Variable {
                        name: token.lexeme,
                        loc,
                    }))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            _ => Err(ParseError {
                line: token.line,
                column: token.column,
                message: format!("unexpected token '{}'", token.lexeme),
            }),
        }
    }

    fn finish_call(&mut self, callee: String, loc: SourceLoc) -> Result<ExprId, ParseError> {
        self.consume(TokenKind::LParen, "expected '('")?;

        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected ')' after arguments")?;

        Ok(self.ast.alloc_expr(Expr::Call { callee, args, loc }))
    }

    // ==================== Helpers ====================

    fn is_at_end(&self) -> bool {
        self.peek().map(|t| t.kind) == Some(TokenKind::Eof) || self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    fn current_loc(&self) -> SourceLoc {
        self.peek()
            .map(|t| SourceLoc::new(t.line, t.column))
            .unwrap_or_default()
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().map(|t| t.kind) == Some(kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            let token = self.peek().cloned().unwrap_or_else(|| Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line: 0,
                column: 0,
            });
            self.advance();
            Ok(token)
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError {
                line: token.line,
                column: token.column,
                message: format!("{}, found '{}'", message, token.lexeme),
            },
            None => ParseError {
                line: 0,
                column: 0,
                message: format!("{}, found end of input", message),
            },
        }
    }

    /// Panic-mode recovery: always consume the offending token, then skip
    /// to the next statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().map(|t| t.kind) == Some(TokenKind::Semicolon) {
                return;
            }
            match self.peek().map(|t| t.kind) {
                Some(TokenKind::RBrace)
                | Some(TokenKind::Keyword(Keyword::If))
                | Some(TokenKind::Keyword(Keyword::While))
                | Some(TokenKind::Keyword(Keyword::Return))
                | Some(TokenKind::Keyword(Keyword::Int))
                | Some(TokenKind::Keyword(Keyword::Char))
                | Some(TokenKind::Keyword(Keyword::Void)) => return,
                _ => self.advance(),
            }
        }
    }

    fn previous(&self) -> Option<&Token> {
        if self.current == 0 {
            None
        } else {
            self.tokens.get(self.current - 1)
        }
    }
}
