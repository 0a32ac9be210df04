//! Lexical-scope name binder for Leda.
//!
//! Traverses a parsed tree exactly once, opening and closing scopes,
//! declaring symbols at every binding site, and attaching resolved names
//! (and unresolved-name diagnostics) as it goes.

pub mod binder;
pub mod scope;
pub mod symbol;

pub use binder::{bind, bind_with_options, BindResult};
pub use scope::{NameContext, Scope, ScopeStack};
pub use symbol::{Symbol, SymbolArena, SymbolId, SymbolKind};
