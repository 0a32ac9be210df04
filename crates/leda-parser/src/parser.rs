//! Precedence-climbing, pull-based parser.
//!
//! The parser pulls tokens from [`Lexer`] on demand and buffers a small
//! lookahead window; `StartTree`/`EndTree` is a `Vec<u32>` position stack
//! recording where the current node began so each node gets a precise
//! range once its last child is parsed.

use crate::arena::{NodeArena, NodeId};
use crate::ast::*;
use leda_common::{Atom, DiagnosticKind, Interner, RawDiagnostic, Span};
use leda_lexer::{Keyword, Lexer, Punct, Token, TokenKind};
use std::collections::VecDeque;

/// Output of [`Parser::parse`]: the root block, the arena every node in the
/// tree lives in, the interner backing every `Name`/`TypeName` atom, and
/// diagnostics accumulated by the lexer and parser together.
pub struct ParseResult {
    pub root: NodeId,
    pub arena: NodeArena,
    pub interner: Interner,
    pub diagnostics: Vec<RawDiagnostic>,
}

/// Parses a whole source into a [`ParseResult`].
#[must_use]
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let root = parser.parse_block();
    parser.expect_kind(
        |k| matches!(k, TokenKind::Eof),
        DiagnosticKind::ExpectedTokenButGotToken,
        "end of file",
    );
    ParseResult { root, arena: parser.arena, interner: parser.interner, diagnostics: parser.diagnostics }
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    arena: NodeArena,
    interner: Interner,
    diagnostics: Vec<RawDiagnostic>,
    tree_starts: Vec<u32>,
    /// End offset of the most recently consumed token; the end side of
    /// every node's span.
    prev_end: u32,
    depth: usize,
    block_depth: usize,
}

const MAX_EXPR_DEPTH: usize = leda_common::limits::MAX_EXPRESSION_DEPTH;
const MAX_BLOCK_DEPTH: usize = leda_common::limits::MAX_BLOCK_DEPTH;

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            lookahead: VecDeque::new(),
            arena: NodeArena::new(),
            interner: Interner::new(),
            diagnostics: Vec::new(),
            tree_starts: Vec::new(),
            prev_end: 0,
            depth: 0,
            block_depth: 0,
        }
    }

    // ---- token stream -----------------------------------------------

    fn fill_to(&mut self, i: usize) {
        while self.lookahead.len() <= i {
            let tok = self.lexer.read_token();
            self.lookahead.push_back(tok);
        }
    }

    fn peek(&mut self, i: usize) -> &Token {
        self.fill_to(i);
        &self.lookahead[i]
    }

    fn bump(&mut self) -> Token {
        self.fill_to(0);
        let tok = self.lookahead.pop_front().expect("fill_to(0) guarantees a token");
        self.prev_end = tok.span.end;
        self.diagnostics.append(&mut self.lexer.take_diagnostics());
        tok
    }

    fn at_punct(&mut self, p: Punct) -> bool {
        matches!(self.peek(0).kind, TokenKind::Punct(ref q) if *q == p)
    }

    fn at_keyword(&mut self, kw: Keyword) -> bool {
        matches!(self.peek(0).kind, TokenKind::Keyword(ref k) if *k == kw)
    }

    fn at_eof(&mut self) -> bool {
        self.peek(0).is_eof()
    }

    fn bump_if_punct(&mut self, p: Punct) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn bump_if_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    // ---- tree construction --------------------------------------------

    fn start_tree(&mut self) {
        let start = self.peek(0).span.start;
        self.tree_starts.push(start);
    }

    fn end_tree(&mut self, kind: NodeKind) -> NodeId {
        let start = self.tree_starts.pop().unwrap_or(self.prev_end);
        let end = self.prev_end.max(start);
        self.arena.push(Span::new(start, end), kind)
    }

    /// Builds a node anchored at the current (unpopped) tree start, for
    /// left-associative chains that fold multiple nodes sharing one start
    /// (binary-operator climbing, prefix-expression suffix chains).
    fn push_at_current_start(&mut self, kind: NodeKind) -> NodeId {
        let start = *self.tree_starts.last().unwrap_or(&self.prev_end);
        self.arena.push(Span::new(start, self.prev_end), kind)
    }

    fn error_node(&mut self, start: u32) -> NodeId {
        self.arena.push(Span::new(start, self.prev_end.max(start)), NodeKind::Error)
    }

    // ---- diagnostics ----------------------------------------------------

    fn error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::error(span, kind, message));
    }

    /// Consumes the current token if `pred` matches; otherwise emits
    /// `ExpectedTokenButGotToken` and returns the token *unmoved*, the
    /// standard `Expect(T)` recovery rule.
    fn expect_kind(&mut self, pred: impl Fn(&TokenKind) -> bool, kind: DiagnosticKind, expected: &str) -> Span {
        let tok = self.peek(0);
        if pred(&tok.kind) {
            self.bump().span
        } else {
            let span = tok.span;
            let got = tok.kind.text();
            self.error(span, kind, format!("expected {expected} but got '{got}'"));
            span
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Span {
        self.expect_kind(
            |k| matches!(k, TokenKind::Punct(q) if *q == p),
            DiagnosticKind::ExpectedTokenButGotToken,
            &format!("'{}'", p.text()),
        )
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Span {
        self.expect_kind(
            |k| matches!(k, TokenKind::Keyword(q) if *q == kw),
            DiagnosticKind::ExpectedTokenButGotToken,
            &format!("'{}'", kw.text()),
        )
    }

    /// Skips one token and emits `DidNotExpectTokenHere`, the recovery rule
    /// for tokens that start nothing parseable.
    fn skip_unexpected(&mut self) {
        let tok = self.bump();
        self.error(tok.span, DiagnosticKind::DidNotExpectTokenHere, format!("did not expect '{}' here", tok.kind.text()));
    }

    fn intern(&mut self, text: &str) -> Atom {
        self.interner.intern(text)
    }

    // ---- block & statements ---------------------------------------------

    fn at_block_end(&mut self) -> bool {
        self.at_eof()
            || self.at_keyword(Keyword::End)
            || self.at_keyword(Keyword::Else)
            || self.at_keyword(Keyword::ElseIf)
            || self.at_keyword(Keyword::Until)
    }

    fn parse_block(&mut self) -> NodeId {
        self.block_depth += 1;
        if self.block_depth > MAX_BLOCK_DEPTH {
            self.block_depth -= 1;
            self.start_tree();
            let span = self.peek(0).span;
            self.error(span, DiagnosticKind::DidNotExpectTokenHere, "block nested too deeply");
            //: always a Block, even on the depth-limit bailout - callers
            // that bind or check the result assume that shape.
            return self.end_tree(NodeKind::Block(Block { statements: Vec::new(), type_declarations: Vec::new() }));
        }
        let result = self.parse_block_inner();
        self.block_depth -= 1;
        result
    }

    fn parse_block_inner(&mut self) -> NodeId {
        self.start_tree();
        let mut statements = Vec::new();
        let mut type_declarations = Vec::new();
        while !self.at_block_end() {
            let mut explicit_separator = false;
            while self.bump_if_punct(Punct::Semi) {
                explicit_separator = true;
            }
            if self.at_block_end() {
                break;
            }
            //: a statement starting with `(` right after a previous
            // statement in the same block, with nothing but a newline
            // between them, is ambiguous: it reads like that `(` continues
            // the previous statement's trailing value as a call.
            if !statements.is_empty()
                && !explicit_separator
                && self.at_punct(Punct::LParen)
                && self.newline_precedes_next_token()
            {
                let span = self.peek(0).span;
                self.error(
                    span,
                    DiagnosticKind::AmbiguousSyntax,
                    "ambiguous syntax: this looks like a call on the previous line's expression",
                );
            }
            let stmt = self.parse_statement();
            let terminal = matches!(self.arena.kind(stmt), NodeKind::Return(_) | NodeKind::Break);
            if matches!(self.arena.kind(stmt), NodeKind::TypeAliasDeclaration(_)) {
                type_declarations.push(stmt);
            }
            statements.push(stmt);
            while self.bump_if_punct(Punct::Semi) {}
            if terminal && !self.at_block_end() {
                //: return/break must be the last statement of
                // its block; truncate by discarding everything else.
                let trunc_start = self.peek(0).span.start;
                while !self.at_block_end() {
                    self.skip_unexpected();
                }
                let _ = trunc_start;
                break;
            }
        }
        self.end_tree(NodeKind::Block(Block { statements, type_declarations }))
    }

    fn parse_statement(&mut self) -> NodeId {
        match &self.peek(0).kind {
            TokenKind::Keyword(Keyword::Do) => self.parse_do(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Repeat) => self.parse_repeat(),
            TokenKind::Keyword(Keyword::Local) => self.parse_local(),
            TokenKind::Keyword(Keyword::Global) => self.parse_global(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => self.parse_break(),
            TokenKind::Keyword(Keyword::Type) => self.parse_type_alias(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_do(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Do);
        let body = self.parse_block();
        self.expect_keyword(Keyword::End);
        self.end_tree(NodeKind::Do(body))
    }

    fn parse_if(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::If);
        let cond = self.parse_expr();
        self.expect_keyword(Keyword::Then);
        let then_body = self.parse_block();
        let mut else_ifs = Vec::new();
        while self.at_keyword(Keyword::ElseIf) {
            self.bump();
            let c = self.parse_expr();
            self.expect_keyword(Keyword::Then);
            let b = self.parse_block();
            else_ifs.push((c, b));
        }
        let else_body = if self.bump_if_keyword(Keyword::Else) { Some(self.parse_block()) } else { None };
        self.expect_keyword(Keyword::End);
        self.end_tree(NodeKind::If(IfStmt { cond, then_body, else_ifs, else_body }))
    }

    /// One token of lookahead after the loop variable's name distinguishes
    /// `for i = ...` (numeric) from `for i[, j...] in ...` (iterator).
    fn parse_for(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::For);
        let first = self.parse_name_node();
        if self.bump_if_punct(Punct::Eq) {
            let start = self.parse_expr();
            self.expect_punct(Punct::Comma);
            let limit = self.parse_expr();
            let step = if self.bump_if_punct(Punct::Comma) { Some(self.parse_expr()) } else { None };
            self.expect_keyword(Keyword::Do);
            let body = self.parse_block();
            self.expect_keyword(Keyword::End);
            let counter = Declaration { name_node: first, type_ann: None };
            return self.end_tree(NodeKind::NumericalFor(NumericalFor { counter, start, limit, step, body }));
        }
        let mut declarations = vec![Declaration { name_node: first, type_ann: None }];
        while self.bump_if_punct(Punct::Comma) {
            let name = self.parse_name_node();
            declarations.push(Declaration { name_node: name, type_ann: None });
        }
        self.expect_keyword(Keyword::In);
        let mut iterator = vec![self.parse_expr()];
        while self.bump_if_punct(Punct::Comma) {
            iterator.push(self.parse_expr());
        }
        self.expect_keyword(Keyword::Do);
        let body = self.parse_block();
        self.expect_keyword(Keyword::End);
        self.end_tree(NodeKind::IteratorFor(IteratorFor { declarations, iterator, body }))
    }

    fn parse_while(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::While);
        let cond = self.parse_expr();
        self.expect_keyword(Keyword::Do);
        let body = self.parse_block();
        self.expect_keyword(Keyword::End);
        self.end_tree(NodeKind::While(WhileStmt { cond, body }))
    }

    fn parse_repeat(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Repeat);
        let body = self.parse_block();
        self.expect_keyword(Keyword::Until);
        let cond = self.parse_expr();
        self.end_tree(NodeKind::RepeatUntil(RepeatUntilStmt { body, cond }))
    }

    fn parse_declaration(&mut self) -> Declaration {
        let name_node = self.parse_name_node();
        let type_ann = if self.bump_if_punct(Punct::Colon) { Some(self.parse_type_expr()) } else { None };
        Declaration { name_node, type_ann }
    }

    fn parse_local(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Local);
        if self.bump_if_keyword(Keyword::Function) {
            let name_node = self.parse_name_node();
            let function = self.parse_function_tail(false);
            return self.end_tree(NodeKind::LocalFunctionDeclaration(LocalFunctionDeclStmt { name_node, function }));
        }
        let mut declarations = vec![self.parse_declaration()];
        while self.bump_if_punct(Punct::Comma) {
            declarations.push(self.parse_declaration());
        }
        let values = if self.bump_if_punct(Punct::Eq) { self.parse_expr_list() } else { Vec::new() };
        self.end_tree(NodeKind::LocalDeclaration(LocalDeclStmt { declarations, values }))
    }

    /// `global` declarations are the only way to introduce a name into the
    /// global scope. `global
    /// function f(...) ... end` desugars like `local function`, with the
    /// name bound before its body so recursive globals resolve.
    fn parse_global(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Global);
        if self.bump_if_keyword(Keyword::Function) {
            let name_node = self.parse_name_node();
            let function = self.parse_function_tail(false);
            let declarations = vec![Declaration { name_node, type_ann: None }];
            return self.end_tree(NodeKind::GlobalDeclaration(GlobalDeclStmt { declarations, values: vec![function] }));
        }
        let mut declarations = vec![self.parse_declaration()];
        while self.bump_if_punct(Punct::Comma) {
            declarations.push(self.parse_declaration());
        }
        let values = if self.bump_if_punct(Punct::Eq) { self.parse_expr_list() } else { Vec::new() };
        self.end_tree(NodeKind::GlobalDeclaration(GlobalDeclStmt { declarations, values }))
    }

    /// `function name{.name}[:name] funcbody` desugars to `Assignment`
    ///; the colon form marks `is_method` and the binder
    /// prepends a synthetic `self` parameter.
    fn parse_function_statement(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Function);
        let mut target = self.parse_name_node();
        let mut is_method = false;
        loop {
            if self.bump_if_punct(Punct::Dot) {
                let key = self.parse_name_node();
                target = self.push_at_current_start(NodeKind::Access(AccessExpr { target, key, dot_form: true }));
            } else if self.bump_if_punct(Punct::Colon) {
                let key = self.parse_name_node();
                target = self.push_at_current_start(NodeKind::Access(AccessExpr { target, key, dot_form: true }));
                is_method = true;
                break;
            } else {
                break;
            }
        }
        let function = self.parse_function_tail(is_method);
        self.end_tree(NodeKind::Assignment(AssignmentStmt { targets: vec![target], values: vec![function] }))
    }

    fn parse_return(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Return);
        let value = if self.at_block_end() || self.at_punct(Punct::Semi) { None } else { Some(self.parse_expr_list()) };
        self.end_tree(NodeKind::Return(value))
    }

    fn parse_break(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Break);
        self.end_tree(NodeKind::Break)
    }

    fn parse_type_alias(&mut self) -> NodeId {
        self.start_tree();
        self.expect_keyword(Keyword::Type);
        let name_node = self.parse_type_name_node();
        self.expect_punct(Punct::Eq);
        let ty = self.parse_type_expr();
        self.end_tree(NodeKind::TypeAliasDeclaration(TypeAliasDecl { name_node, ty }))
    }

    /// A prefix-expression that's a `Call`/`MethodCall`/`Error` is accepted
    /// directly as a statement; one that's assignable (`Name`/`Access`)
    /// continues with `{, prefix-expr}* = expr-list`; anything else is
    /// `DidNotExpectTokenHere`.
    fn parse_expr_statement(&mut self) -> NodeId {
        self.start_tree();
        let first = self.parse_prefix_expr();
        match self.arena.kind(first) {
            NodeKind::Call(_) | NodeKind::MethodCall(_) | NodeKind::Error => {
                self.tree_starts.pop();
                first
            }
            k if k.is_assignable() => {
                let mut targets = vec![first];
                while self.bump_if_punct(Punct::Comma) {
                    let next = self.parse_prefix_expr();
                    if !self.arena.kind(next).is_assignable() {
                        let span = self.arena.span(next);
                        self.error(span, DiagnosticKind::CannotAssignToThis, "cannot assign to this expression");
                        targets.push(self.arena.push(span, NodeKind::Error));
                    } else {
                        targets.push(next);
                    }
                }
                self.expect_punct(Punct::Eq);
                let values = self.parse_expr_list();
                self.end_tree(NodeKind::Assignment(AssignmentStmt { targets, values }))
            }
            _ => {
                let span = self.arena.span(first);
                self.error(span, DiagnosticKind::DidNotExpectTokenHere, "did not expect an expression here");
                self.tree_starts.pop();
                first
            }
        }
    }

    // ---- expressions ------------------------------------------------------

    fn parse_expr_list(&mut self) -> Vec<NodeId> {
        let mut list = vec![self.parse_expr()];
        while self.bump_if_punct(Punct::Comma) {
            list.push(self.parse_expr());
        }
        list
    }

    fn parse_expr(&mut self) -> NodeId {
        self.parse_binary_expr(0)
    }

    /// Maps the peeked token to its AST tag; the climbing precedence and
    /// associativity come from the token's own `operator_info`, not a
    /// parallel table keyed on `BinaryOp`.
    fn peek_binary_op(&mut self) -> Option<BinaryOp> {
        match &self.peek(0).kind {
            TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
            TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
            TokenKind::Punct(Punct::Plus) => Some(BinaryOp::Add),
            TokenKind::Punct(Punct::Minus) => Some(BinaryOp::Sub),
            TokenKind::Punct(Punct::Star) => Some(BinaryOp::Mul),
            TokenKind::Punct(Punct::Slash) => Some(BinaryOp::Div),
            TokenKind::Punct(Punct::Percent) => Some(BinaryOp::Mod),
            TokenKind::Punct(Punct::Caret) => Some(BinaryOp::Pow),
            TokenKind::Punct(Punct::DotDot) => Some(BinaryOp::Concat),
            TokenKind::Punct(Punct::EqEq) => Some(BinaryOp::Eq),
            TokenKind::Punct(Punct::NotEq) => Some(BinaryOp::Ne),
            TokenKind::Punct(Punct::Le) => Some(BinaryOp::Le),
            TokenKind::Punct(Punct::Ge) => Some(BinaryOp::Ge),
            TokenKind::Punct(Punct::Lt) => Some(BinaryOp::Lt),
            TokenKind::Punct(Punct::Gt) => Some(BinaryOp::Gt),
            _ => None,
        }
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> NodeId {
        self.start_tree();
        let mut left = self.parse_unary_expr();
        loop {
            let Some(op) = self.peek_binary_op() else { break };
            let info = self.peek(0).kind.operator_info().filter(|i| i.is_binary).expect("peek_binary_op and operator_info must agree on binary tokens");
            if info.precedence < min_prec {
                break;
            }
            self.bump();
            let next_min = if info.right_associative { info.precedence } else { info.precedence + 1 };
            let right = self.parse_binary_expr(next_min);
            left = self.push_at_current_start(NodeKind::Binary(BinaryExpr { op, left, right }));
        }
        self.tree_starts.pop();
        left
    }

    /// Unary `- not #` bind tighter than `^`: they recurse
    /// into `parse_unary_expr` again for their operand so a chain like
    /// `- -1` or `#t` composes, but stop short of consuming a following
    /// binary operator themselves.
    /// `Minus` is ambiguous between binary subtraction and unary negate;
    /// `as_unary_minus` disambiguates by only firing here, where a primary
    /// is expected rather than a continuation of the left operand.
    fn parse_unary_expr(&mut self) -> NodeId {
        self.start_tree();
        let kind = &self.peek(0).kind;
        let op = match kind {
            TokenKind::Keyword(Keyword::Not) if kind.operator_info().is_some_and(|i| i.is_unary) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Hash) if kind.operator_info().is_some_and(|i| i.is_unary) => Some(UnaryOp::Length),
            TokenKind::Punct(Punct::Minus) if kind.as_unary_minus().is_some() => Some(UnaryOp::Negate),
            _ => None,
        };
        let Some(op) = op else {
            self.tree_starts.pop();
            return self.parse_pow_expr();
        };
        self.bump();
        let expr = self.parse_unary_expr();
        self.end_tree(NodeKind::Unary(UnaryExpr { op, expr }))
    }

    /// `^` is right-associative and binds tighter than unary operators
    /// except that unary operators recurse through here for their operand,
    /// matching "Unary `- not #` bind tighter than `^`".
    fn parse_pow_expr(&mut self) -> NodeId {
        self.start_tree();
        let base = self.parse_primary_expr();
        if self.at_punct(Punct::Caret) {
            self.bump();
            let exponent = self.parse_unary_expr();
            return self.end_tree(NodeKind::Binary(BinaryExpr { op: BinaryOp::Pow, left: base, right: exponent }));
        }
        self.tree_starts.pop();
        base
    }

    fn parse_primary_expr(&mut self) -> NodeId {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            self.depth -= 1;
            self.start_tree();
            let span = self.peek(0).span;
            self.error(span, DiagnosticKind::DidNotExpectTokenHere, "expression nested too deeply");
            return self.end_tree(NodeKind::Error);
        }
        let result = self.parse_primary_expr_inner();
        self.depth -= 1;
        result
    }

    fn parse_primary_expr_inner(&mut self) -> NodeId {
        match self.peek(0).kind.clone() {
            TokenKind::Keyword(Keyword::Nil) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::Nil)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::True)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::False)
            }
            TokenKind::Number { lexeme, value } => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::Number { lexeme, value })
            }
            TokenKind::Str(value) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::Str(value))
            }
            TokenKind::LongStr { value, level } => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::LongStr { value, level })
            }
            TokenKind::Punct(Punct::Ellipsis) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::Vararg)
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_table(),
            TokenKind::Keyword(Keyword::Function) => {
                self.start_tree();
                self.bump();
                let function = self.parse_function_tail(false);
                self.tree_starts.pop();
                function
            }
            TokenKind::Name(_) | TokenKind::Punct(Punct::LParen) => self.parse_prefix_expr(),
            _ => {
                self.start_tree();
                let tok = self.peek(0).clone();
                self.error(
                    tok.span,
                    DiagnosticKind::ExpectedExpressionButGotToken,
                    format!("expected an expression but got '{}'", tok.kind.text()),
                );
                if !tok.is_eof() {
                    self.bump();
                }
                self.end_tree(NodeKind::Error)
            }
        }
    }

    /// `(expr)` or a name, followed by any number of `.name`, `[expr]`,
    /// `:name(args)`, `(args)` suffixes.
    fn parse_prefix_expr(&mut self) -> NodeId {
        self.start_tree();
        let mut expr = if self.at_punct(Punct::LParen) {
            self.bump();
            let inner = self.parse_expr();
            self.expect_punct(Punct::RParen);
            // Parenthesizing truncates a call's multi-value return to one
            // value; callers only ever see this through the checker, which
            // re-derives it from the node kind, so no wrapper node is kept.
            inner
        } else {
            self.parse_name_node()
        };

        loop {
            if self.newline_precedes_next_token() && self.at_punct(Punct::LParen) {
                let span = self.peek(0).span;
                self.error(
                    span,
                    DiagnosticKind::AmbiguousSyntax,
                    "ambiguous syntax: this looks like a call on the previous line's expression",
                );
            }
            if self.bump_if_punct(Punct::Dot) {
                let key = self.parse_name_node();
                expr = self.push_at_current_start(NodeKind::Access(AccessExpr { target: expr, key, dot_form: true }));
            } else if self.bump_if_punct(Punct::LBracket) {
                let key = self.parse_expr();
                self.expect_punct(Punct::RBracket);
                expr = self.push_at_current_start(NodeKind::Access(AccessExpr { target: expr, key, dot_form: false }));
            } else if self.bump_if_punct(Punct::Colon) {
                let (name, name_span) = self.parse_name_atom();
                let args = self.parse_call_args();
                expr = self.push_at_current_start(NodeKind::MethodCall(MethodCallExpr {
                    target: expr,
                    method_name: name,
                    method_name_span: name_span,
                    args,
                }));
            } else if self.at_call_args_start() {
                let args = self.parse_call_args();
                expr = self.push_at_current_start(NodeKind::Call(CallExpr { target: expr, args }));
            } else {
                break;
            }
        }
        self.tree_starts.pop();
        expr
    }

    fn at_call_args_start(&mut self) -> bool {
        matches!(self.peek(0).kind, TokenKind::Punct(Punct::LParen) | TokenKind::Punct(Punct::LBrace) | TokenKind::Str(_) | TokenKind::LongStr { .. })
    }

    /// Call arguments are `(exprlist?)`, a single table constructor, or a
    /// single string literal (Lua's sugar for `f"x"`/`f{t}`).
    fn parse_call_args(&mut self) -> Vec<NodeId> {
        match self.peek(0).kind.clone() {
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                let args = if self.at_punct(Punct::RParen) { Vec::new() } else { self.parse_expr_list() };
                self.expect_punct(Punct::RParen);
                args
            }
            TokenKind::Punct(Punct::LBrace) => vec![self.parse_table()],
            TokenKind::Str(_) | TokenKind::LongStr { .. } => vec![self.parse_primary_expr()],
            _ => Vec::new(),
        }
    }

    /// True if a newline appears in the trivia between the token just
    /// consumed and the upcoming one - the condition `parse_prefix_expr`
    /// uses to flag `AmbiguousSyntax` for a same-expression call that
    /// starts a new line.
    fn newline_precedes_next_token(&mut self) -> bool {
        let next_start = self.peek(0).span.start as usize;
        let end = self.prev_end as usize;
        next_start > end && self.source[end..next_start].contains('\n')
    }

    fn parse_name_atom(&mut self) -> (Atom, Span) {
        let tok = self.peek(0).clone();
        if let TokenKind::Name(text) = tok.kind {
            self.bump();
            (self.intern(&text), tok.span)
        } else {
            self.error(tok.span, DiagnosticKind::ExpectedTokenButGotToken, "expected a name");
            (self.intern(""), tok.span)
        }
    }

    fn parse_name_node(&mut self) -> NodeId {
        self.start_tree();
        let (atom, _) = self.parse_name_atom();
        self.end_tree(NodeKind::Name(atom))
    }

    fn parse_type_name_node(&mut self) -> NodeId {
        self.start_tree();
        let (atom, _) = self.parse_name_atom();
        self.end_tree(NodeKind::TypeName(atom))
    }

    /// `{ field (,|;) ... }`. Positional entries get
    /// consecutive 1-based number keys assigned by the checker, not here -
    /// the parser only records field *shape*.
    fn parse_table(&mut self) -> NodeId {
        self.start_tree();
        self.expect_punct(Punct::LBrace);
        let mut fields = Vec::new();
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            fields.push(self.parse_table_field());
            if !self.bump_if_punct(Punct::Comma) && !self.bump_if_punct(Punct::Semi) {
                break;
            }
        }
        self.expect_punct(Punct::RBrace);
        self.end_tree(NodeKind::Table(TableExpr { fields }))
    }

    fn parse_table_field(&mut self) -> TableField {
        if self.bump_if_punct(Punct::LBracket) {
            let key = self.parse_expr();
            self.expect_punct(Punct::RBracket);
            self.expect_punct(Punct::Eq);
            let value = self.parse_expr();
            return TableField::Indexed { key, value };
        }
        if matches!(self.peek(0).kind, TokenKind::Name(_)) && matches!(self.peek(1).kind, TokenKind::Punct(Punct::Eq)) {
            let key_node = self.parse_name_node();
            self.bump(); // '='
            let value = self.parse_expr();
            return TableField::Named { key_node, value };
        }
        TableField::Positional { value: self.parse_expr() }
    }

    /// Parses the parameter list, return annotation, and body following
    /// `function` (the keyword itself already consumed by the caller).
    fn parse_function_tail(&mut self, is_method: bool) -> NodeId {
        self.start_tree();
        let type_node = self.parse_function_type_signature(is_method);
        let body = self.parse_block();
        self.expect_keyword(Keyword::End);
        self.end_tree(NodeKind::Function(FunctionExpr { type_node, body, is_method }))
    }

    /// Parses `(params) [: returnTypes]` into a standalone `TypeFunction`
    /// node; if `is_method`, a synthetic `self` parameter is prepended.
    fn parse_function_type_signature(&mut self, is_method: bool) -> NodeId {
        self.start_tree();
        let mut params = Vec::new();
        if is_method {
            let self_name = self.synthetic_self_name();
            params.push(Declaration { name_node: self_name, type_ann: None });
        }
        self.expect_punct(Punct::LParen);
        let mut has_vararg = false;
        if !self.at_punct(Punct::RParen) {
            loop {
                if self.bump_if_punct(Punct::Ellipsis) {
                    has_vararg = true;
                    break;
                }
                params.push(self.parse_declaration());
                if !self.bump_if_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen);
        let return_types = if self.bump_if_punct(Punct::Colon) { Some(self.parse_return_type_list()) } else { None };
        self.end_tree(NodeKind::TypeFunction(TypeFunctionExpr { params, has_vararg, return_types }))
    }

    fn synthetic_self_name(&mut self) -> NodeId {
        let span = Span::at(self.peek(0).span.start);
        let atom = self.intern("self");
        self.arena.push(span, NodeKind::Name(atom))
    }

    fn parse_return_type_list(&mut self) -> Vec<NodeId> {
        if self.bump_if_punct(Punct::LParen) {
            let mut types = if self.at_punct(Punct::RParen) { Vec::new() } else { vec![self.parse_type_expr()] };
            while self.bump_if_punct(Punct::Comma) {
                types.push(self.parse_type_expr());
            }
            self.expect_punct(Punct::RParen);
            types
        } else {
            vec![self.parse_type_expr()]
        }
    }

    // ---- type expressions -------------------------------------------------

    /// `Union` binds loosest among type expressions (`A | B | C`); each
    /// alternative is parsed at the next tighter level.
    fn parse_type_expr(&mut self) -> NodeId {
        self.start_tree();
        let mut alternatives = vec![self.parse_type_atom()];
        while self.bump_if_punct(Punct::Pipe) {
            alternatives.push(self.parse_type_atom());
        }
        if alternatives.len() == 1 {
            self.tree_starts.pop();
            return alternatives.pop().unwrap();
        }
        self.end_tree(NodeKind::TypeUnion(alternatives))
    }

    fn parse_type_atom(&mut self) -> NodeId {
        match self.peek(0).kind.clone() {
            TokenKind::Str(value) => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::TypeStringLiteral(value))
            }
            TokenKind::Number { value, .. } => {
                self.start_tree();
                self.bump();
                self.end_tree(NodeKind::TypeNumberLiteral(value))
            }
            TokenKind::Punct(Punct::LParen) => self.parse_type_function(),
            TokenKind::Punct(Punct::LBrace) => self.parse_type_table(),
            TokenKind::Name(_) => self.parse_type_name_node(),
            _ => {
                self.start_tree();
                let tok = self.peek(0).clone();
                self.error(tok.span, DiagnosticKind::ExpectedTokenButGotToken, "expected a type");
                if !tok.is_eof() {
                    self.bump();
                }
                self.end_tree(NodeKind::Error)
            }
        }
    }

    fn parse_type_function(&mut self) -> NodeId {
        self.start_tree();
        self.expect_punct(Punct::LParen);
        let mut params = Vec::new();
        let mut has_vararg = false;
        if !self.at_punct(Punct::RParen) {
            loop {
                if self.bump_if_punct(Punct::Ellipsis) {
                    has_vararg = true;
                    break;
                }
                params.push(self.parse_declaration());
                if !self.bump_if_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen);
        self.expect_punct(Punct::Arrow);
        let return_types = Some(self.parse_return_type_list());
        self.end_tree(NodeKind::TypeFunction(TypeFunctionExpr { params, has_vararg, return_types }))
    }

    fn parse_type_table(&mut self) -> NodeId {
        self.start_tree();
        self.expect_punct(Punct::LBrace);
        let mut pairs = Vec::new();
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            let key = if self.bump_if_punct(Punct::LBracket) {
                let k = self.parse_type_atom();
                self.expect_punct(Punct::RBracket);
                k
            } else {
                self.parse_type_name_as_string_literal_key()
            };
            self.expect_punct(Punct::Colon);
            let value = self.parse_type_expr();
            pairs.push((key, value));
            if !self.bump_if_punct(Punct::Comma) && !self.bump_if_punct(Punct::Semi) {
                break;
            }
        }
        self.expect_punct(Punct::RBrace);
        self.end_tree(NodeKind::TypeTable(TypeTableExpr { pairs }))
    }

    /// A bare `name:` field key in a table type is sugar for a
    /// `StringLiteral` key equal to the field's name.
    fn parse_type_name_as_string_literal_key(&mut self) -> NodeId {
        self.start_tree();
        let (atom, _span) = self.parse_name_atom();
        let text = self.interner.resolve(atom).to_string();
        self.end_tree(NodeKind::TypeStringLiteral(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leda_common::DiagnosticKind;

    fn assert_ranges_nest(arena: &NodeArena, id: NodeId) {
        let span = arena.span(id);
        assert!(span.start <= span.end, "node span must not be inverted: {span:?}");
        for child in direct_children(arena, id) {
            let child_span = arena.span(child);
            assert!(
                span.start <= child_span.start && child_span.end <= span.end,
                "parent {span:?} does not contain child {child_span:?}"
            );
            assert_ranges_nest(arena, child);
        }
    }

    /// Direct children of a node, for the position-monotonicity property
    /// test below. Only needs enough cases to exercise a representative
    /// tree shape, not every `NodeKind` variant.
    fn direct_children(arena: &NodeArena, id: NodeId) -> Vec<NodeId> {
        match arena.kind(id).clone() {
            NodeKind::Block(b) => b.statements,
            NodeKind::Do(body) => vec![body],
            NodeKind::If(data) => {
                let mut v = vec![data.cond, data.then_body];
                for (c, b) in data.else_ifs {
                    v.push(c);
                    v.push(b);
                }
                if let Some(e) = data.else_body {
                    v.push(e);
                }
                v
            }
            NodeKind::NumericalFor(data) => {
                let mut v = vec![data.counter.name_node, data.start, data.limit];
                if let Some(step) = data.step {
                    v.push(step);
                }
                v.push(data.body);
                v
            }
            NodeKind::IteratorFor(data) => {
                let mut v: Vec<NodeId> = data.declarations.iter().map(|d| d.name_node).collect();
                v.extend(data.iterator);
                v.push(data.body);
                v
            }
            NodeKind::While(data) => vec![data.cond, data.body],
            NodeKind::RepeatUntil(data) => vec![data.body, data.cond],
            NodeKind::LocalDeclaration(data) => {
                let mut v: Vec<NodeId> = data.declarations.iter().map(|d| d.name_node).collect();
                v.extend(data.values);
                v
            }
            NodeKind::LocalFunctionDeclaration(data) => vec![data.name_node, data.function],
            NodeKind::GlobalDeclaration(data) => {
                let mut v: Vec<NodeId> = data.declarations.iter().map(|d| d.name_node).collect();
                v.extend(data.values);
                v
            }
            NodeKind::Return(Some(values)) => values,
            NodeKind::Return(None) | NodeKind::Break | NodeKind::Error => vec![],
            NodeKind::Assignment(data) => {
                let mut v = data.targets;
                v.extend(data.values);
                v
            }
            NodeKind::TypeAliasDeclaration(data) => vec![data.name_node, data.ty],
            NodeKind::Table(data) => data
                .fields
                .into_iter()
                .flat_map(|f| match f {
                    TableField::Named { key_node, value } => vec![key_node, value],
                    TableField::Indexed { key, value } => vec![key, value],
                    TableField::Positional { value } => vec![value],
                })
                .collect(),
            NodeKind::Function(data) => vec![data.type_node, data.body],
            NodeKind::Access(data) => vec![data.target, data.key],
            NodeKind::Call(data) => {
                let mut v = vec![data.target];
                v.extend(data.args);
                v
            }
            NodeKind::MethodCall(data) => {
                let mut v = vec![data.target];
                v.extend(data.args);
                v
            }
            NodeKind::Unary(data) => vec![data.expr],
            NodeKind::Binary(data) => vec![data.left, data.right],
            NodeKind::TypeFunction(data) => {
                let mut v: Vec<NodeId> = data.params.iter().map(|d| d.name_node).collect();
                if let Some(returns) = data.return_types {
                    v.extend(returns);
                }
                v
            }
            NodeKind::TypeTable(data) => data.pairs.into_iter().flat_map(|(k, v)| vec![k, v]).collect(),
            NodeKind::TypeUnion(alts) => alts,
            NodeKind::Nil
            | NodeKind::True
            | NodeKind::False
            | NodeKind::Number { .. }
            | NodeKind::Str(_)
            | NodeKind::LongStr { .. }
            | NodeKind::Name(_)
            | NodeKind::Vararg
            | NodeKind::TypeName(_)
            | NodeKind::TypeStringLiteral(_)
            | NodeKind::TypeNumberLiteral(_) => vec![],
        }
    }

    #[test]
    fn every_node_range_contains_its_children_and_is_not_inverted() {
        let src = "local t = { x = 1, [2] = \"a\", 3 }\nfunction t:m(a: number): string return a end\nif t.x then\n  for i = 1, 10 do end\nend\n";
        let result = parse(src);
        assert_ranges_nest(&result.arena, result.root);
    }

    #[test]
    fn malformed_input_recovers_into_a_well_formed_tree_instead_of_panicking() {
        for src in ["", "local x = 1", "--[[ unterminated", "1 + ", "\"unterminated", "local = = =", "if then end"] {
            let result = parse(src);
            assert_ranges_nest(&result.arena, result.root);
        }
    }

    #[test]
    fn empty_source_parses_to_an_empty_block() {
        let result = parse("");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!("expected a Block") };
        assert!(block.statements.is_empty());
    }

    #[test]
    fn binary_precedence_climbs_correctly() {
        // `1 + 2 * 3` must parse as `1 + (2 * 3)`, not `(1 + 2) * 3`.
        let result = parse("return 1 + 2 * 3");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::Return(Some(values)) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::Binary(top) = result.arena.kind(values[0]).clone() else { panic!("expected a top-level Binary") };
        assert_eq!(top.op, BinaryOp::Add);
        let NodeKind::Binary(rhs) = result.arena.kind(top.right).clone() else { panic!("rhs must be the Mul") };
        assert_eq!(rhs.op, BinaryOp::Mul);
    }

    #[test]
    fn caret_is_right_associative() {
        // `2 ^ 3 ^ 2` must parse as `2 ^ (3 ^ 2)`.
        let result = parse("return 2 ^ 3 ^ 2");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::Return(Some(values)) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::Binary(top) = result.arena.kind(values[0]).clone() else { panic!() };
        assert_eq!(top.op, BinaryOp::Pow);
        assert!(matches!(result.arena.kind(top.right), NodeKind::Binary(b) if b.op == BinaryOp::Pow));
    }

    #[test]
    fn function_statement_desugars_to_an_assignment() {
        let result = parse("function t.f() end");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        assert!(matches!(result.arena.kind(block.statements[0]), NodeKind::Assignment(_)));
    }

    #[test]
    fn method_function_statement_prepends_a_synthetic_self_parameter() {
        let result = parse("function t:f() end");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::Assignment(assign) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::Function(func) = result.arena.kind(assign.values[0]).clone() else { panic!() };
        assert!(func.is_method);
        let NodeKind::TypeFunction(sig) = result.arena.kind(func.type_node).clone() else { panic!() };
        assert_eq!(sig.params.len(), 1);
        assert!(matches!(result.arena.kind(sig.params[0].name_node), NodeKind::Name(_)));
    }

    #[test]
    fn return_must_be_the_last_statement_truncating_the_rest_of_the_block() {
        let result = parse("do return 1\nlocal x = 2 end");
        // The `local x = 2` after `return` is discarded, not parsed as a
        // second statement in the block.
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::Do(body) = result.arena.kind(block.statements[0]) else { panic!() };
        let NodeKind::Block(inner) = result.arena.kind(*body) else { panic!() };
        assert_eq!(inner.statements.len(), 1);
        assert!(matches!(result.arena.kind(inner.statements[0]), NodeKind::Return(_)));
    }

    #[test]
    fn ambiguous_call_on_a_new_line_is_flagged() {
        // S5: `a = 1\n(print)(1)` - the statement `(print)(1)` opens with a
        // `(` on a new line right after the previous statement.
        let result = parse("a = 1\n(print)(1)");
        let ambiguous: Vec<_> =
            result.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::AmbiguousSyntax).collect();
        assert_eq!(ambiguous.len(), 1);
    }

    #[test]
    fn cannot_assign_to_a_non_assignable_target() {
        let result = parse("1 = 2");
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::DidNotExpectTokenHere));
    }

    #[test]
    fn numeric_for_and_iterator_for_are_distinguished_by_one_token_lookahead() {
        let numeric = parse("for i = 1, 10 do end");
        let NodeKind::Block(b) = numeric.arena.kind(numeric.root) else { panic!() };
        assert!(matches!(numeric.arena.kind(b.statements[0]), NodeKind::NumericalFor(_)));

        let iterator = parse("for k, v in pairs(t) do end");
        let NodeKind::Block(b) = iterator.arena.kind(iterator.root) else { panic!() };
        assert!(matches!(iterator.arena.kind(b.statements[0]), NodeKind::IteratorFor(_)));
    }

    #[test]
    fn table_constructor_assigns_consecutive_positional_keys() {
        let result = parse("local t = { 10, 20, [5] = 30, x = 40 }");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::LocalDeclaration(decl) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::Table(t) = result.arena.kind(decl.values[0]).clone() else { panic!() };
        assert_eq!(t.fields.len(), 4);
        assert!(matches!(t.fields[0], TableField::Positional { .. }));
        assert!(matches!(t.fields[1], TableField::Positional { .. }));
        assert!(matches!(t.fields[2], TableField::Indexed { .. }));
        assert!(matches!(t.fields[3], TableField::Named { .. }));
    }

    #[test]
    fn missing_closing_paren_recovers_with_a_diagnostic() {
        let result = parse("local x = (1 + 2");
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::ExpectedTokenButGotToken));
    }

    #[test]
    fn type_union_parses_loosest_among_type_expressions() {
        let result = parse("local x: number | string = 1");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::LocalDeclaration(decl) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let ann = decl.declarations[0].type_ann.expect("annotation present");
        let NodeKind::TypeUnion(alts) = result.arena.kind(ann) else { panic!("expected a TypeUnion") };
        assert_eq!(alts.len(), 2);
    }

    #[test]
    fn table_type_bare_name_key_is_sugar_for_a_string_literal_key() {
        let result = parse("type T = { x: number }");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::TypeAliasDeclaration(decl) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::TypeTable(t) = result.arena.kind(decl.ty).clone() else { panic!("expected a TypeTable") };
        assert!(matches!(result.arena.kind(t.pairs[0].0), NodeKind::TypeStringLiteral(s) if s == "x"));
    }

    #[test]
    fn varargs_parse_as_a_rest_parameter_in_a_function_type() {
        let result = parse("local function f(...) end");
        let NodeKind::Block(block) = result.arena.kind(result.root) else { panic!() };
        let NodeKind::LocalFunctionDeclaration(decl) = result.arena.kind(block.statements[0]).clone() else { panic!() };
        let NodeKind::Function(func) = result.arena.kind(decl.function).clone() else { panic!() };
        let NodeKind::TypeFunction(sig) = result.arena.kind(func.type_node).clone() else { panic!() };
        assert!(sig.has_vararg);
        assert!(sig.params.is_empty());
    }

    #[test]
    fn runaway_block_nesting_recovers_instead_of_overflowing() {
        let src = format!("{}{}", "do ".repeat(MAX_BLOCK_DEPTH + 10), "end ".repeat(MAX_BLOCK_DEPTH + 10));
        let result = parse(&src);
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::DidNotExpectTokenHere));
    }
}
