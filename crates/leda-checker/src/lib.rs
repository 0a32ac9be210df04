//! The type checker: second tree traversal computing a [`leda_types::Type`]
//! for every expression and checking assignability.

pub mod context;
pub mod error_reporter;
pub mod expr;
pub mod statements;
pub mod types;

pub use context::{check, CheckResult};
