//! The structural type lattice for Leda.
//!
//! [`Type`] is a closed, reference-counted sum type: primitives are unit
//! variants of the enum rather than a hand-rolled singleton registry, so
//! Rust's own equality and pattern matching give us identity for free.

pub mod assignability;
pub mod mismatch;
pub mod ty;
pub mod type_list;

pub use mismatch::{ListKind, TypeMismatchReason};
pub use ty::{FunctionType, TableType, Type, TypeKind};
pub use type_list::TypeList;
