//! The structured assignability-mismatch reason tree. Reasons carry [`Type`] values rather than
//! pre-rendered strings, so rendering only happens once, at the point an
//! editor-integration caller actually wants a message and can supply the
//! `Atom -> String` resolver a display name needs.

use crate::ty::Type;
use leda_common::Atom;

/// Which multi-value list a [`TypeMismatchReason::NotEnoughValues`] or
/// [`TypeMismatchReason::ValueInListIncompatible`] refers to, so the
/// rendered message can say "argument 2" vs "return value 1" vs "field 3".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Parameters,
    Returns,
    Arguments,
    LocalDeclaration,
    Assignment,
}

impl ListKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ListKind::Parameters => "parameter",
            ListKind::Returns => "return value",
            ListKind::Arguments => "argument",
            ListKind::LocalDeclaration => "declared value",
            ListKind::Assignment => "assigned value",
        }
    }
}

/// A node in the structured mismatch tree.
#[derive(Debug, Clone)]
pub enum TypeMismatchReason {
    Primitive { target: Type, source: Type },
    NotEnoughValues { expected: usize, got: usize, kind: ListKind },
    ValueInListIncompatible { index: usize, kind: ListKind, inner: Box<TypeMismatchReason> },
    ParameterIncompatible { target_name: Option<Atom>, source_name: Option<Atom>, inner: Box<TypeMismatchReason> },
    SourceMissingKey { target: Type, source: Type, key: Type },
    TableKeyIncompatible { key: Type, inner: Box<TypeMismatchReason> },
}

impl TypeMismatchReason {
    /// Renders this reason and every nested reason as an indented bullet
    /// list, two spaces per nesting level.
    #[must_use]
    pub fn render(&self, resolve: &impl Fn(Atom) -> String) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0, resolve);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize, resolve: &impl Fn(Atom) -> String) {
        let pad = "  ".repeat(depth);
        match self {
            TypeMismatchReason::Primitive { target, source } => {
                out.push_str(&format!(
                    "{pad}type '{}' is not assignable to type '{}'",
                    source.display(resolve),
                    target.display(resolve)
                ));
            }
            TypeMismatchReason::NotEnoughValues { expected, got, kind } => {
                out.push_str(&format!("{pad}expected at least {expected} {}(s) but got {got}", kind.label()));
            }
            TypeMismatchReason::ValueInListIncompatible { index, kind, inner } => {
                out.push_str(&format!("{pad}{} {} is incompatible:\n", kind.label(), index + 1));
                inner.render_into(out, depth + 1, resolve);
            }
            TypeMismatchReason::ParameterIncompatible { target_name, source_name, inner } => {
                let t = target_name.map_or_else(|| "?".to_string(), &resolve);
                let s = source_name.map_or_else(|| "?".to_string(), &resolve);
                out.push_str(&format!("{pad}parameter '{s}' is incompatible with '{t}':\n"));
                inner.render_into(out, depth + 1, resolve);
            }
            TypeMismatchReason::SourceMissingKey { target, source, key } => {
                out.push_str(&format!(
                    "{pad}type '{}' is missing key '{}' required by type '{}'",
                    source.display(resolve),
                    key.display(resolve),
                    target.display(resolve)
                ));
            }
            TypeMismatchReason::TableKeyIncompatible { key, inner } => {
                out.push_str(&format!("{pad}key '{}' is incompatible:\n", key.display(resolve)));
                inner.render_into(out, depth + 1, resolve);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_resolve(_: Atom) -> String {
        String::new()
    }

    #[test]
    fn nested_reason_indents_two_spaces_per_level() {
        let reason = TypeMismatchReason::ValueInListIncompatible {
            index: 0,
            kind: ListKind::Returns,
            inner: Box::new(TypeMismatchReason::Primitive { target: Type::string(), source: Type::number() }),
        };
        let rendered = reason.render(&noop_resolve);
        assert!(rendered.contains("return value 1 is incompatible"));
        assert!(rendered.contains("  type 'number' is not assignable to type 'string'"));
    }
}
