//! [`TypeList`] - the variable-length sequence of types flowing through
//! function parameters, returns, and multi-value expressions.

use crate::mismatch::{ListKind, TypeMismatchReason};
use crate::ty::Type;

/// An ordered, length-variable sequence of [`Type`]s.
///
/// - `Finite` is a plain, fixed-arity list.
/// - `Continued` is a finite prefix followed by another `TypeList`: when the
///   last entry of a value-list expression is itself a call, its full
///   return list is spliced in as a continuation rather than truncated to
///   one value.
/// - `Rest` is a finite prefix followed by a repeating tail type, modeling
///   varargs.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeList {
    Finite(Vec<Type>),
    Continued(Vec<Type>, Box<TypeList>),
    Rest(Vec<Type>, Box<Type>),
}

impl TypeList {
    #[must_use]
    pub fn empty() -> Self {
        TypeList::Finite(Vec::new())
    }

    #[must_use]
    pub fn single(ty: Type) -> Self {
        TypeList::Finite(vec![ty])
    }

    /// A list with unknown/variadic shape, used as the return type of the
    /// `function` primitive: any call against it is accepted and returns
    /// this same unbounded list.
    #[must_use]
    pub fn any() -> Self {
        TypeList::Rest(Vec::new(), Box::new(Type::any()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, TypeList::Finite(v) if v.is_empty())
    }

    fn prefix(&self) -> &[Type] {
        match self {
            TypeList::Finite(v) | TypeList::Continued(v, _) | TypeList::Rest(v, _) => v,
        }
    }

    fn prefix_len(&self) -> usize {
        self.prefix().len()
    }

    /// The count of non-nillable entries at the front of this list's finite
    /// prefix: how many values a caller must
    /// supply before the callee's required parameters run out.
    #[must_use]
    pub fn minimum_values(&self) -> usize {
        self.prefix().iter().take_while(|t| !t.is_nillable()).count()
    }

    /// How many values this list is statically known to provide, or `None`
    /// if it ends in a continuation/rest tail whose length isn't known
    /// without deeper call-return inference.
    #[must_use]
    pub fn available_count(&self) -> Option<usize> {
        match self {
            TypeList::Finite(v) => Some(v.len()),
            TypeList::Continued(..) | TypeList::Rest(..) => None,
        }
    }

    /// The effective type at position `index`: the declared entry if one
    /// exists, the continuation/rest tail's contribution otherwise, or
    /// `nil` past the end of a finite list - each destination consumes the
    /// next value, or `nil` once the list is exhausted.
    #[must_use]
    pub fn get(&self, index: usize) -> Type {
        match self {
            TypeList::Finite(v) => v.get(index).cloned().unwrap_or_else(Type::nil),
            TypeList::Continued(v, rest) => {
                v.get(index).cloned().unwrap_or_else(|| rest.get(index - v.len()))
            }
            TypeList::Rest(v, rest) => v.get(index).cloned().unwrap_or_else(|| (**rest).clone()),
        }
    }

    /// Drops the first `n` entries of this list's finite prefix, keeping
    /// whatever continuation/rest tail it had. Used to remove an implicit
    /// leading parameter (a method's synthetic `self`) before checking the
    /// remaining positions against a call's explicit arguments.
    #[must_use]
    pub fn drop_front(&self, n: usize) -> TypeList {
        match self {
            TypeList::Finite(v) => TypeList::Finite(v.iter().skip(n).cloned().collect()),
            TypeList::Continued(v, rest) => TypeList::Continued(v.iter().skip(n).cloned().collect(), rest.clone()),
            TypeList::Rest(v, rest) => TypeList::Rest(v.iter().skip(n).cloned().collect(), rest.clone()),
        }
    }

    /// `self ≤ other` as typelists: `other` must supply at
    /// least `self`'s `minimum_values`, and every position `self` names
    /// must accept the corresponding position of `other`.
    pub fn assignable_from(&self, other: &TypeList, kind: ListKind) -> Result<(), TypeMismatchReason> {
        let expected = self.minimum_values();
        if let Some(got) = other.available_count() {
            if got < expected {
                return Err(TypeMismatchReason::NotEnoughValues { expected, got, kind });
            }
        }
        for i in 0..self.prefix_len() {
            let target_ty = &self.prefix()[i];
            let source_ty = other.get(i);
            target_ty
                .assignable_from(&source_ty)
                .map_err(|inner| TypeMismatchReason::ValueInListIncompatible { index: i, kind, inner: Box::new(inner) })?;
        }
        if let TypeList::Rest(_, rest_ty) = self {
            if let TypeList::Finite(source_values) = other {
                for (i, source_ty) in source_values.iter().enumerate().skip(self.prefix_len()) {
                    rest_ty.assignable_from(source_ty).map_err(|inner| TypeMismatchReason::ValueInListIncompatible {
                        index: i,
                        kind,
                        inner: Box::new(inner),
                    })?;
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn render(&self, resolve: &impl Fn(leda_common::Atom) -> String) -> String {
        let rendered_prefix: Vec<String> = self.prefix().iter().map(|t| t.display(resolve)).collect();
        match self {
            TypeList::Finite(_) => rendered_prefix.join(", "),
            TypeList::Continued(_, rest) => {
                let mut parts = rendered_prefix;
                let inner = rest.render(resolve);
                if !inner.is_empty() {
                    parts.push(inner);
                }
                parts.join(", ")
            }
            TypeList::Rest(_, rest) => {
                let mut parts = rendered_prefix;
                parts.push(format!("...{}", rest.display(resolve)));
                parts.join(", ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_values_stops_at_first_nillable_entry() {
        let list = TypeList::Finite(vec![Type::number(), Type::nil(), Type::string()]);
        assert_eq!(list.minimum_values(), 1);
    }

    #[test]
    fn get_past_finite_end_is_nil() {
        let list = TypeList::Finite(vec![Type::number()]);
        assert!(list.get(5).is_nil());
    }

    #[test]
    fn not_enough_values_is_reported_against_minimum() {
        let target = TypeList::Finite(vec![Type::number(), Type::number()]);
        let source = TypeList::Finite(vec![Type::number()]);
        let err = target.assignable_from(&source, ListKind::Parameters).unwrap_err();
        assert!(matches!(err, TypeMismatchReason::NotEnoughValues { expected: 2, got: 1, .. }));
    }

    #[test]
    fn continuation_satisfies_positions_past_its_own_prefix() {
        let target = TypeList::Finite(vec![Type::number(), Type::string()]);
        let source = TypeList::Continued(vec![Type::number()], Box::new(TypeList::Finite(vec![Type::string()])));
        assert!(target.assignable_from(&source, ListKind::Returns).is_ok());
    }
}
