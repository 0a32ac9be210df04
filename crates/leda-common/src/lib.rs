//! Common types shared across the Leda analysis pipeline.
//!
//! This crate provides foundations used by every later stage:
//! - Byte-offset [`Span`] and line/character [`Position`]/[`Range`]/[`Location`]
//! - [`Atom`] string interning for identifiers and literal text
//! - [`diagnostics`] - diagnostic severities, kinds, and a structured
//!   assignability-mismatch reason tree
//! - [`limits`] - recursion and size thresholds shared by the parser,
//!   binder, and checker

pub mod atom;
pub use atom::{Atom, Interner};

pub mod span;
pub use span::{LineIndex, Span};

pub mod position;
pub use position::{Location, Position, Range};

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity, RawDiagnostic};

pub mod limits;

pub mod options;
pub use options::BinderOptions;
