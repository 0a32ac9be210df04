//! The scope stack: a dual value/type namespace per lexical block.

use crate::symbol::SymbolId;
use leda_common::Atom;
use rustc_hash::FxHashMap;

/// Which of the two parallel namespaces a name lookup or declaration
/// targets. `local x` and `type x` never collide - `x` can name both a
/// value and a type at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameContext {
    Value,
    Type,
}

/// One lexical block's bindings, separated by namespace. Pushed on entering
/// any block that introduces locals and popped on exit.
#[derive(Default)]
pub struct Scope {
    values: FxHashMap<Atom, SymbolId>,
    types: FxHashMap<Atom, SymbolId>,
}

impl Scope {
    fn namespace(&self, ctx: NameContext) -> &FxHashMap<Atom, SymbolId> {
        match ctx {
            NameContext::Value => &self.values,
            NameContext::Type => &self.types,
        }
    }

    fn namespace_mut(&mut self, ctx: NameContext) -> &mut FxHashMap<Atom, SymbolId> {
        match ctx {
            NameContext::Value => &mut self.values,
            NameContext::Type => &mut self.types,
        }
    }

    /// Declares `name` in this scope's `ctx` namespace. Returns the symbol
    /// already bound under that name in this exact scope, if any, so the
    /// caller can emit `ValueAlreadyDeclared`/`TypeAlreadyDeclared` instead
    /// of silently shadowing.
    pub fn declare(&mut self, ctx: NameContext, name: Atom, symbol: SymbolId) -> Option<SymbolId> {
        self.namespace_mut(ctx).insert(name, symbol)
    }

    #[must_use]
    pub fn lookup(&self, ctx: NameContext, name: Atom) -> Option<SymbolId> {
        self.namespace(ctx).get(&name).copied()
    }
}

/// A stack of [`Scope`]s. Resolution walks top-down; names remain visible
/// in their declaring scope and every nested scope.
#[derive(Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Declares in the *innermost* scope.
    pub fn declare(&mut self, ctx: NameContext, name: Atom, symbol: SymbolId) -> Option<SymbolId> {
        self.scopes.last_mut().expect("scope stack is never empty while binding").declare(ctx, name, symbol)
    }

    /// Declares in the outermost (root) scope, for implicit globals: they
    /// must be visible from anywhere afterward, not just the block they
    /// were first read in.
    pub fn declare_at_root(&mut self, ctx: NameContext, name: Atom, symbol: SymbolId) -> Option<SymbolId> {
        self.scopes.first_mut().expect("scope stack is never empty while binding").declare(ctx, name, symbol)
    }

    #[must_use]
    pub fn resolve(&self, ctx: NameContext, name: Atom) -> Option<SymbolId> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(ctx, name))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
