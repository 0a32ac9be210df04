//! [`Checker`] - the shared state every checking pass reads and writes.

use leda_binder::{BindResult, SymbolId};
use leda_common::{Atom, Interner, RawDiagnostic};
use leda_parser::{NodeArena, NodeId};
use leda_types::{Type, TypeList};
use rustc_hash::FxHashMap;
use tracing::{debug, span as trace_span, Level};

/// Output of [`check`]: a type for every expression and declaration symbol
/// the checker visited, plus diagnostics.
pub struct CheckResult {
    pub node_types: FxHashMap<NodeId, Type>,
    pub symbol_types: FxHashMap<SymbolId, Type>,
    pub diagnostics: Vec<RawDiagnostic>,
}

/// Runs the checker over a bound tree. `bind_result` must be the
/// [`BindResult`] produced by [`leda_binder::bind`] for the same
/// `(arena, root)`.
#[must_use]
pub fn check(arena: &NodeArena, interner: &Interner, root: NodeId, bind_result: &BindResult) -> CheckResult {
    let _span = trace_span!(Level::DEBUG, "check").entered();
    let mut checker = Checker::new(arena, interner, bind_result);
    checker.check_block(root);
    debug!(
        node_types = checker.node_types.len(),
        diagnostics = checker.diagnostics.len(),
        "check finished"
    );
    CheckResult { node_types: checker.node_types, symbol_types: checker.symbol_types, diagnostics: checker.diagnostics }
}

/// One frame per function body currently being checked: `declared` is the return-type
/// annotation evaluated up front, if the function wrote one; `inferred`
/// collects the `TypeList` of every `return` statement encountered directly
/// in that body (not in a nested function expression), so an omitted
/// annotation can be inferred as their position-wise union once the body
/// finishes checking.
pub(crate) struct ReturnFrame {
    pub(crate) declared: Option<TypeList>,
    pub(crate) inferred: Vec<TypeList>,
}

pub(crate) struct Checker<'a> {
    pub(crate) arena: &'a NodeArena,
    pub(crate) interner: &'a Interner,
    pub(crate) bind_result: &'a BindResult,
    pub(crate) node_types: FxHashMap<NodeId, Type>,
    pub(crate) symbol_types: FxHashMap<SymbolId, Type>,
    pub(crate) diagnostics: Vec<RawDiagnostic>,
    pub(crate) return_stack: Vec<ReturnFrame>,
}

impl<'a> Checker<'a> {
    fn new(arena: &'a NodeArena, interner: &'a Interner, bind_result: &'a BindResult) -> Self {
        Self {
            arena,
            interner,
            bind_result,
            node_types: FxHashMap::default(),
            symbol_types: FxHashMap::default(),
            diagnostics: Vec::new(),
            return_stack: Vec::new(),
        }
    }

    pub(crate) fn resolve_atom(&self, atom: Atom) -> String {
        self.interner.resolve(atom).to_string()
    }

    /// The `Atom -> String` resolver every `Type::display`/
    /// `TypeMismatchReason::render` call needs.
    pub(crate) fn resolver(&self) -> impl Fn(Atom) -> String + '_ {
        move |a| self.resolve_atom(a)
    }

    /// The symbol a name-like node resolved to, if the binder attached one.
    /// `None` means the binder already reported `NameNotFound` for it; the
    /// checker stays silent rather than cascading a second diagnostic.
    pub(crate) fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.bind_result.tree_to_symbol.get(&node).copied()
    }

    pub(crate) fn record_node_type(&mut self, node: NodeId, ty: Type) -> Type {
        self.node_types.insert(node, ty.clone());
        ty
    }
}
