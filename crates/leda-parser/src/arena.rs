//! Stable-index storage for tree nodes.
//!
//! Attaching a symbol to a tree node calls for either interior mutability
//! on each node or an arena with a stable index; we take the arena route so
//! `tree -> Symbol` can be a plain `FxHashMap<NodeId, SymbolId>` instead of
//! something keyed on node reference identity.

use crate::ast::NodeKind;
use leda_common::Span;

/// Index of a node within a [`NodeArena`]. Stable for the arena's lifetime:
/// nodes are never removed or reordered once pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

struct NodeData {
    span: Span,
    kind: NodeKind,
}

/// Owns every node produced while parsing a single source. Indexed by
/// [`NodeId`]; never shrinks, so ids handed out earlier stay valid for the
/// arena's whole lifetime.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<NodeData>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, span: Span, kind: NodeKind) -> NodeId {
        let id = u32::try_from(self.nodes.len()).expect("node arena overflow");
        self.nodes.push(NodeData { span, kind });
        NodeId(id)
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every [`NodeId`] the arena has ever handed out, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(u32::try_from(i).expect("node arena overflow")))
    }
}
