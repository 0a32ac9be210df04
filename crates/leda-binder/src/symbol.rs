//! [`Symbol`] - the identity of a declared value or type.
//!
//! Definition and reference sites are kept as byte [`Span`]s here, the same
//! boundary convention `leda_common::RawDiagnostic` uses: everything before
//! `Source` works in offsets, and only `Source` (which owns the
//! `LineIndex`) turns a `Span` into the `Location` an editor-integration
//! caller actually wants.

use leda_common::Span;
use leda_types::Type;

/// Index of a [`Symbol`] within a [`SymbolArena`]. Stable for the arena's
/// lifetime, same rationale as `leda_parser::NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol was declared as.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    LocalVariable,
    Parameter,
    Global,
    TypeSymbol,
    /// A root-scope built-in type symbol wrapping a primitive [`Type`].
    IntrinsicType(Type),
}

/// The identity of a declared value or type. Two locals named `x` in
/// sibling scopes are distinct symbols.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub definition: Span,
}

/// Owns every symbol produced while binding a single source. References
/// from symbol to use-site ranges are stored here as plain index-keyed
/// vectors rather than back-pointers into the tree.
#[derive(Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
    /// Use-site ranges recorded against each symbol, in the declaring
    /// source's own coordinate system. Definitions are intentionally not
    /// included.
    references: Vec<Vec<Span>>,
}

impl SymbolArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, kind: SymbolKind, definition: Span) -> SymbolId {
        let id = u32::try_from(self.symbols.len()).expect("symbol arena overflow");
        self.symbols.push(Symbol { kind, definition });
        self.references.push(Vec::new());
        SymbolId(id)
    }

    pub fn add_reference(&mut self, symbol: SymbolId, span: Span) {
        self.references[symbol.index()].push(span);
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    #[must_use]
    pub fn references(&self, id: SymbolId) -> &[Span] {
        &self.references[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len()).map(|i| SymbolId(u32::try_from(i).expect("symbol arena overflow")))
    }
}
