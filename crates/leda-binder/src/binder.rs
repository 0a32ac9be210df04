//! The single-pass binder.

use crate::scope::{NameContext, ScopeStack};
use crate::symbol::{SymbolArena, SymbolId, SymbolKind};
use leda_common::{limits::MAX_SCOPE_DEPTH, Atom, BinderOptions, DiagnosticKind, Interner, RawDiagnostic, Span};
use leda_parser::ast::{Declaration, NodeKind};
use leda_parser::{NodeArena, NodeId};
use leda_types::Type;
use rustc_hash::FxHashMap;
use tracing::{debug, span as trace_span, Level};

/// Everything a binder pass produces for one source: new symbols, name-node -> symbol attachments, and
/// diagnostics.
pub struct BindResult {
    pub symbols: SymbolArena,
    pub tree_to_symbol: FxHashMap<NodeId, SymbolId>,
    pub diagnostics: Vec<RawDiagnostic>,
}

/// Binds a parsed tree with the default [`BinderOptions`]. See
/// [`bind_with_options`] to enable non-default behavior (e.g. implicit
/// globals).
#[must_use]
pub fn bind(arena: &NodeArena, interner: &mut Interner, root: NodeId) -> BindResult {
    bind_with_options(arena, interner, root, BinderOptions::default())
}

/// Binds a parsed tree. `root` must be the `Block` node `leda_parser::parse`
/// returned alongside `arena`; `interner` resolves the `Atom`s the parser
/// produced for every `Name`/`TypeName` node, and is also where the binder
/// interns the handful of intrinsic type names (`number`, `string`, ...) a
/// source may never otherwise mention.
#[must_use]
pub fn bind_with_options(arena: &NodeArena, interner: &mut Interner, root: NodeId, options: BinderOptions) -> BindResult {
    let _span = trace_span!(Level::DEBUG, "bind").entered();
    let mut binder = Binder::new(arena, interner, options);
    binder.bind_root(root);
    debug!(symbols = binder.symbols.len(), diagnostics = binder.diagnostics.len(), "bind finished");
    BindResult { symbols: binder.symbols, tree_to_symbol: binder.tree_to_symbol, diagnostics: binder.diagnostics }
}

struct Binder<'a> {
    arena: &'a NodeArena,
    interner: &'a mut Interner,
    options: BinderOptions,
    symbols: SymbolArena,
    tree_to_symbol: FxHashMap<NodeId, SymbolId>,
    scopes: ScopeStack,
    diagnostics: Vec<RawDiagnostic>,
    scope_depth_warned: bool,
}

impl<'a> Binder<'a> {
    fn new(arena: &'a NodeArena, interner: &'a mut Interner, options: BinderOptions) -> Self {
        Self {
            arena,
            interner,
            options,
            symbols: SymbolArena::new(),
            tree_to_symbol: FxHashMap::default(),
            scopes: ScopeStack::new(),
            diagnostics: Vec::new(),
            scope_depth_warned: false,
        }
    }

    /// Pushes a scope, flagging (once) a tree nested deep enough to suggest
    /// a malformed input rather than a real program. The parser's own block
    /// depth limit keeps this from ever firing on its own output, but the
    /// binder doesn't assume its tree came from `leda_parser::parse`.
    fn enter_scope(&mut self, span: Span) {
        self.scopes.push();
        if self.scopes.depth() > MAX_SCOPE_DEPTH && !self.scope_depth_warned {
            self.scope_depth_warned = true;
            self.error(span, DiagnosticKind::DidNotExpectTokenHere, "scope nested too deeply");
        }
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn resolve_atom(&self, atom: Atom) -> &str {
        self.interner.resolve(atom)
    }

    fn error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::error(span, kind, message));
    }

    /// Declares an intrinsic type symbol in the root scope, pre-populated
    /// with one symbol per primitive `Type`. `table` is included alongside
    /// the usual primitives so table types are nameable the same way
    /// function/number/string/boolean are (see `DESIGN.md`).
    fn declare_intrinsic(&mut self, name: &str, ty: Type) {
        let atom = self.intern(name);
        let symbol = self.symbols.declare(SymbolKind::IntrinsicType(ty), Span::at(0));
        self.scopes.declare(NameContext::Type, atom, symbol);
    }

    fn intern(&mut self, text: &str) -> Atom {
        self.interner.intern(text)
    }

    fn bind_root(&mut self, root: NodeId) {
        self.scopes.push();
        self.declare_intrinsic("any", Type::any());
        self.declare_intrinsic("boolean", Type::boolean());
        self.declare_intrinsic("number", Type::number());
        self.declare_intrinsic("string", Type::string());
        self.declare_intrinsic("function", Type::function_primitive());
        self.declare_intrinsic("table", Type::table_primitive());
        self.bind_block_statements(root);
        self.scopes.pop();
    }

    /// Binds a `Block` node's statements in the *current* scope (no push/pop
    /// - callers push the scope a block needs before calling this, since
    /// some blocks share a scope with surrounding bindings, e.g.
    /// `repeat...until`'s condition).
    fn bind_block_statements(&mut self, block: NodeId) {
        let NodeKind::Block(data) = self.arena.kind(block) else {
            unreachable!("bind_block_statements called on a non-Block node");
        };
        let statements = data.statements.clone();
        for stmt in statements {
            self.bind_statement(stmt);
        }
    }

    /// Binds a nested block in its own scope (`do`, loop/if bodies, function
    /// bodies).
    fn bind_scoped_block(&mut self, block: NodeId) {
        let span = self.arena.span(block);
        self.enter_scope(span);
        self.bind_block_statements(block);
        self.exit_scope();
    }

    fn bind_statement(&mut self, id: NodeId) {
        match self.arena.kind(id).clone() {
            NodeKind::Do(body) => self.bind_scoped_block(body),
            NodeKind::If(if_stmt) => {
                self.bind_expr(if_stmt.cond);
                self.bind_scoped_block(if_stmt.then_body);
                for (cond, body) in if_stmt.else_ifs {
                    self.bind_expr(cond);
                    self.bind_scoped_block(body);
                }
                if let Some(else_body) = if_stmt.else_body {
                    self.bind_scoped_block(else_body);
                }
            }
            NodeKind::NumericalFor(data) => {
                self.bind_expr(data.start);
                self.bind_expr(data.limit);
                if let Some(step) = data.step {
                    self.bind_expr(step);
                }
                let span = self.arena.span(id);
                self.enter_scope(span);
                self.declare_decl(data.counter, SymbolKind::LocalVariable, NameContext::Value);
                self.bind_block_statements(data.body);
                self.exit_scope();
            }
            NodeKind::IteratorFor(data) => {
                for e in &data.iterator {
                    self.bind_expr(*e);
                }
                let span = self.arena.span(id);
                self.enter_scope(span);
                for decl in &data.declarations {
                    self.declare_decl(*decl, SymbolKind::LocalVariable, NameContext::Value);
                }
                self.bind_block_statements(data.body);
                self.exit_scope();
            }
            NodeKind::While(data) => {
                self.bind_expr(data.cond);
                self.bind_scoped_block(data.body);
            }
            NodeKind::RepeatUntil(data) => {
                // `until cond` can see the body's locals (Lua semantics), so
                // the condition binds in the *same* scope as the body
                // rather than the outer one.
                let span = self.arena.span(id);
                self.enter_scope(span);
                self.bind_block_statements(data.body);
                self.bind_expr(data.cond);
                self.exit_scope();
            }
            NodeKind::LocalDeclaration(data) => {
                for v in &data.values {
                    self.bind_expr(*v);
                }
                for decl in &data.declarations {
                    self.declare_decl(*decl, SymbolKind::LocalVariable, NameContext::Value);
                }
            }
            NodeKind::LocalFunctionDeclaration(data) => {
                // Bound before the body so recursive calls resolve
                //.
                self.declare_name(data.name_node, SymbolKind::LocalVariable, NameContext::Value);
                self.bind_expr(data.function);
            }
            NodeKind::GlobalDeclaration(data) => {
                for v in &data.values {
                    self.bind_expr(*v);
                }
                for decl in &data.declarations {
                    self.declare_decl(*decl, SymbolKind::Global, NameContext::Value);
                }
            }
            NodeKind::Return(values) => {
                if let Some(values) = values {
                    for v in values {
                        self.bind_expr(v);
                    }
                }
            }
            NodeKind::Break => {}
            NodeKind::Assignment(data) => {
                for v in &data.values {
                    self.bind_expr(*v);
                }
                for target in &data.targets {
                    self.bind_expr(*target);
                }
            }
            NodeKind::TypeAliasDeclaration(data) => {
                self.bind_type_expr(data.ty);
                self.declare_name(data.name_node, SymbolKind::TypeSymbol, NameContext::Type);
            }
            // Expression-statements (Call/MethodCall/Error).
            _ => self.bind_expr(id),
        }
    }

    /// Declares a `Declaration`'s name in `ctx`, resolving its type
    /// annotation (if any) first - annotations are ordinary `Type.Name`
    /// lookups, unaffected by the value binding they describe.
    fn declare_decl(&mut self, decl: Declaration, kind: SymbolKind, ctx: NameContext) {
        if let Some(type_ann) = decl.type_ann {
            self.bind_type_expr(type_ann);
        }
        self.declare_name(decl.name_node, kind, ctx);
    }

    fn declare_name(&mut self, name_node: NodeId, kind: SymbolKind, ctx: NameContext) {
        let NodeKind::Name(atom) = *self.arena.kind(name_node) else {
            unreachable!("declaration name_node is always a Name node");
        };
        let span = self.arena.span(name_node);
        let symbol = self.symbols.declare(kind, span);
        self.tree_to_symbol.insert(name_node, symbol);
        if self.scopes.declare(ctx, atom, symbol).is_some() {
            let diag_kind = match ctx {
                NameContext::Value => DiagnosticKind::ValueAlreadyDeclared,
                NameContext::Type => DiagnosticKind::TypeAlreadyDeclared,
            };
            self.error(span, diag_kind, format!("'{}' is already declared in this scope", self.resolve_atom(atom)));
        }
    }

    fn bind_expr(&mut self, id: NodeId) {
        match self.arena.kind(id).clone() {
            NodeKind::Name(atom) => self.resolve(id, atom, NameContext::Value),
            NodeKind::Table(data) => {
                for field in data.fields {
                    match field {
                        leda_parser::ast::TableField::Named { value, .. } => self.bind_expr(value),
                        leda_parser::ast::TableField::Indexed { key, value } => {
                            self.bind_expr(key);
                            self.bind_expr(value);
                        }
                        leda_parser::ast::TableField::Positional { value } => self.bind_expr(value),
                    }
                }
            }
            NodeKind::Function(data) => {
                let span = self.arena.span(id);
                self.enter_scope(span);
                self.bind_type_node_params(data.type_node);
                self.bind_block_statements(data.body);
                self.exit_scope();
            }
            NodeKind::Access(data) => {
                self.bind_expr(data.target);
                // `t.k`'s key is a bound field name, never resolved as a
                // value.
                if !data.dot_form {
                    self.bind_expr(data.key);
                }
            }
            NodeKind::Call(data) => {
                self.bind_expr(data.target);
                for arg in data.args {
                    self.bind_expr(arg);
                }
            }
            NodeKind::MethodCall(data) => {
                self.bind_expr(data.target);
                for arg in data.args {
                    self.bind_expr(arg);
                }
            }
            NodeKind::Unary(data) => self.bind_expr(data.expr),
            NodeKind::Binary(data) => {
                self.bind_expr(data.left);
                self.bind_expr(data.right);
            }
            NodeKind::Nil
            | NodeKind::True
            | NodeKind::False
            | NodeKind::Number { .. }
            | NodeKind::Str(_)
            | NodeKind::LongStr { .. }
            | NodeKind::Vararg
            | NodeKind::Error => {}
            _ => {}
        }
    }

    /// Binds a `TypeFunction` node's parameter declarations into the scope
    /// just pushed for the enclosing function body.
    fn bind_type_node_params(&mut self, type_node: NodeId) {
        let NodeKind::TypeFunction(data) = self.arena.kind(type_node).clone() else {
            unreachable!("Function.type_node is always a TypeFunction node");
        };
        for decl in &data.params {
            self.declare_decl(*decl, SymbolKind::Parameter, NameContext::Value);
        }
        if let Some(return_types) = &data.return_types {
            for t in return_types {
                self.bind_type_expr(*t);
            }
        }
    }

    fn bind_type_expr(&mut self, id: NodeId) {
        match self.arena.kind(id).clone() {
            NodeKind::TypeName(atom) => self.resolve(id, atom, NameContext::Type),
            NodeKind::TypeFunction(data) => {
                // A function-type expression used as a type annotation
                // (not a function expression's own signature, which the
                // `Function` case in `bind_expr` handles against the body's
                // scope). Its parameter names are documentation-only but
                // are still `Name` nodes reachable from a valid parse, so
                // invariant 1 (every such node resolves to a symbol) still
                // applies; they get their own throwaway scope.
                let span = self.arena.span(id);
                self.enter_scope(span);
                for decl in &data.params {
                    self.declare_decl(*decl, SymbolKind::Parameter, NameContext::Value);
                }
                if let Some(returns) = &data.return_types {
                    for t in returns {
                        self.bind_type_expr(*t);
                    }
                }
                self.exit_scope();
            }
            NodeKind::TypeTable(data) => {
                for (key, value) in data.pairs {
                    self.bind_type_expr(key);
                    self.bind_type_expr(value);
                }
            }
            NodeKind::TypeUnion(alts) => {
                for alt in alts {
                    self.bind_type_expr(alt);
                }
            }
            NodeKind::TypeStringLiteral(_) | NodeKind::TypeNumberLiteral(_) | NodeKind::Error => {}
            _ => {}
        }
    }

    fn resolve(&mut self, node: NodeId, atom: Atom, ctx: NameContext) {
        let span = self.arena.span(node);
        match self.scopes.resolve(ctx, atom) {
            Some(symbol) => {
                self.tree_to_symbol.insert(node, symbol);
                self.symbols.add_reference(symbol, span);
            }
            None if ctx == NameContext::Value && self.options.allow_implicit_globals => {
                // Declared at the root scope (not wherever it was first
                // read) so later reads elsewhere in the file see the same
                // symbol, the way a real Lua global would be visible
                // everywhere once assigned.
                let symbol = self.symbols.declare(SymbolKind::Global, span);
                self.tree_to_symbol.insert(node, symbol);
                self.scopes.declare_at_root(ctx, atom, symbol);
            }
            None => {
                self.error(span, DiagnosticKind::NameNotFound, format!("'{}' is not defined", self.resolve_atom(atom)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind_source(src: &str) -> BindResult {
        let mut parsed = leda_parser::parse(src);
        bind(&parsed.arena, &mut parsed.interner, parsed.root)
    }

    #[test]
    fn undeclared_global_use_is_name_not_found() {
        let result = bind_source("print(1)");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::NameNotFound);
    }

    #[test]
    fn local_is_visible_after_its_own_declaration() {
        let result = bind_source("local x = 1\nreturn x");
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.symbols.len(), 1);
    }

    #[test]
    fn local_rhs_cannot_see_its_own_name() {
        // `local x = x` - the RHS binds in the enclosing scope, before `x`
        // becomes visible, so this `x` is a use of an outer/undeclared name
        //.
        let result = bind_source("local x = x");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::NameNotFound);
    }

    #[test]
    fn local_function_sees_itself_for_recursion() {
        let result = bind_source("local function f() return f() end");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn redeclaring_a_local_in_the_same_scope_is_an_error() {
        let result = bind_source("local x = 1\nlocal x = 2");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ValueAlreadyDeclared);
    }

    #[test]
    fn numeric_for_counter_is_scoped_to_the_body_only() {
        let result = bind_source("for i = 1, 10 do end\nreturn i");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::NameNotFound);
    }

    #[test]
    fn type_alias_introduces_a_type_symbol() {
        let result = bind_source("type T = number\nlocal x: T = 1");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn intrinsic_number_resolves_without_declaration() {
        let result = bind_source("local x: number = 1");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn implicit_globals_are_rejected_by_default() {
        let mut parsed = leda_parser::parse("print(1)");
        let result = bind_with_options(&parsed.arena, &mut parsed.interner, parsed.root, BinderOptions::default());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::NameNotFound);
    }

    #[test]
    fn implicit_globals_can_be_opted_into() {
        let mut parsed = leda_parser::parse("print(1)\nprint(2)");
        let options = BinderOptions { allow_implicit_globals: true };
        let result = bind_with_options(&parsed.arena, &mut parsed.interner, parsed.root, options);
        assert!(result.diagnostics.is_empty());
        // Both uses of `print` resolve to the same implicit global symbol.
        assert_eq!(result.symbols.len(), 1);
    }

    #[test]
    fn deeply_nested_blocks_bind_without_overflowing() {
        let src = format!("{}{}", "do ".repeat(300), "end ".repeat(300));
        let result = bind_source(&src);
        assert!(result.diagnostics.iter().any(|d| d.kind == DiagnosticKind::DidNotExpectTokenHere));
    }
}
