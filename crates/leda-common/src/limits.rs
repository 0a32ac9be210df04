//! Shared thresholds guarding against pathological input.
//!
//! One place to tune recursion/size guards instead of scattering magic
//! numbers through the parser, binder, and checker.

/// Maximum expression nesting depth the parser will descend before giving
/// up and emitting an `Error` node instead of overflowing the call stack.
pub const MAX_EXPRESSION_DEPTH: usize = 512;

/// Maximum nested block depth (do/if/while/for/repeat) the parser accepts.
pub const MAX_BLOCK_DEPTH: usize = 256;

/// Maximum number of scopes the binder will push before assuming a
/// malformed tree is producing runaway nesting.
pub const MAX_SCOPE_DEPTH: usize = 256;

/// Maximum number of alternatives folded into a single `Union` type before
/// the checker stops trying to keep them distinct and widens to `any`.
pub const MAX_UNION_ALTERNATIVES: usize = 64;
