//! [`Type`] - the structural type lattice.

use crate::mismatch::{ListKind, TypeMismatchReason};
use crate::type_list::TypeList;
use leda_common::Atom;
use std::rc::Rc;

/// A table's declared member: `(key-type, value-type)`. Keys may be literal
/// types (named fields, e.g. `StringLiteral("x")`) or primitive types
/// (general indexers, e.g. `string` for `{[string]: T}`).
pub type TablePair = (Type, Type);

#[derive(Debug, Clone)]
pub struct FunctionType {
    pub params: TypeList,
    pub returns: TypeList,
    /// Parameter names running parallel to `params`'s finite prefix,
    /// used to label `ParameterIncompatible` mismatches. `None` for
    /// synthesized function types (e.g. the `function` primitive's call
    /// signature) that never had declared parameter names.
    pub param_names: Option<Vec<Atom>>,
}

#[derive(Debug, Clone)]
pub struct TableType {
    pub pairs: Vec<TablePair>,
}

impl TableType {
    /// The value type for a key assignable *to* one of this table's key
    /// types: the key's computed type must be assignable to some key-type
    /// in the table's pair list.
    #[must_use]
    pub fn lookup(&self, key: &Type) -> Option<&Type> {
        self.pairs.iter().find(|(k, _)| key.assignable_to(k).is_ok()).map(|(_, v)| v)
    }
}

/// A stable, hashable bit-pattern comparison of an `f64` literal value, so
/// `NumberLiteral` can derive `PartialEq`/`Eq`/`Hash` without pretending
/// `NaN == NaN` means anything semantically - malformed-number literals
/// never reach the type lattice (the checker widens them to `number`
/// before they would), so bit-identity is all that's needed here.
#[derive(Debug, Clone, Copy)]
pub struct LiteralNumber(pub f64);

impl PartialEq for LiteralNumber {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for LiteralNumber {}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Any,
    Unknown,
    Nil,
    True,
    False,
    Boolean,
    Number,
    String,
    /// The supertype of all `Function` types.
    FunctionPrimitive,
    /// The supertype of all `Table` types.
    TablePrimitive,
    StringLiteral(Rc<str>),
    NumberLiteral(LiteralNumber),
    Function(Rc<FunctionType>),
    Table(Rc<TableType>),
    Union(Rc<Vec<Type>>),
}

/// A type value. Cheap to clone (an `Rc` bump); compares structurally via
/// [`TypeKind`]'s derived equality, except `Union`, which ignores member
/// order.
#[derive(Debug, Clone)]
pub struct Type {
    kind: Rc<TypeKind>,
    /// The alias name this type was introduced under, if any. Carried separately
    /// from `kind` so `type T = number; local x: T = 1` can render `T` in
    /// hover and diagnostics while still behaving exactly like `number`
    /// everywhere else.
    display_name: Option<Atom>,
}

impl Type {
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        Self { kind: Rc::new(kind), display_name: None }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(TypeKind::Any)
    }
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(TypeKind::Unknown)
    }
    #[must_use]
    pub fn nil() -> Self {
        Self::new(TypeKind::Nil)
    }
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }
    /// The primitive singleton for the literal `true`.
    #[must_use]
    pub fn true_value() -> Self {
        Self::new(TypeKind::True)
    }
    #[must_use]
    pub fn false_value() -> Self {
        Self::new(TypeKind::False)
    }
    #[must_use]
    pub fn number() -> Self {
        Self::new(TypeKind::Number)
    }
    #[must_use]
    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }
    #[must_use]
    pub fn function_primitive() -> Self {
        Self::new(TypeKind::FunctionPrimitive)
    }
    #[must_use]
    pub fn table_primitive() -> Self {
        Self::new(TypeKind::TablePrimitive)
    }
    #[must_use]
    pub fn string_literal(s: impl Into<Rc<str>>) -> Self {
        Self::new(TypeKind::StringLiteral(s.into()))
    }
    #[must_use]
    pub fn number_literal(n: f64) -> Self {
        Self::new(TypeKind::NumberLiteral(LiteralNumber(n)))
    }
    #[must_use]
    pub fn function(params: TypeList, returns: TypeList) -> Self {
        Self::new(TypeKind::Function(Rc::new(FunctionType { params, returns, param_names: None })))
    }

    #[must_use]
    pub fn function_named(params: TypeList, returns: TypeList, param_names: Vec<Atom>) -> Self {
        Self::new(TypeKind::Function(Rc::new(FunctionType { params, returns, param_names: Some(param_names) })))
    }
    #[must_use]
    pub fn table(pairs: Vec<TablePair>) -> Self {
        Self::new(TypeKind::Table(Rc::new(TableType { pairs })))
    }

    /// Builds a union, flattening nested unions and collapsing to the sole
    /// member when only one alternative remains.
    #[must_use]
    pub fn union(alternatives: Vec<Type>) -> Self {
        let mut flat = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            match alt.kind() {
                TypeKind::Union(members) => flat.extend(members.iter().cloned()),
                _ => flat.push(alt),
            }
        }
        if flat.len() > leda_common::limits::MAX_UNION_ALTERNATIVES {
            return Self::any();
        }
        if flat.len() == 1 {
            return flat.into_iter().next().unwrap();
        }
        Self::new(TypeKind::Union(Rc::new(flat)))
    }

    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    #[must_use]
    pub fn with_display_name(mut self, name: Atom) -> Self {
        self.display_name = Some(name);
        self
    }

    #[must_use]
    pub fn display_name(&self) -> Option<Atom> {
        self.display_name
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(*self.kind, TypeKind::Nil)
    }

    /// Whether a value of this type can be absent (`nil`), used by
    /// [`crate::TypeList::minimum_values`] to find where a parameter list's
    /// required prefix ends.
    #[must_use]
    pub fn is_nillable(&self) -> bool {
        match &*self.kind {
            TypeKind::Nil => true,
            TypeKind::Union(members) => members.iter().any(Type::is_nillable),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(*self.kind, TypeKind::Any)
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(*self.kind, TypeKind::Unknown)
    }

    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(*self.kind, TypeKind::FunctionPrimitive | TypeKind::Function(_) | TypeKind::Any | TypeKind::Unknown)
    }

    #[must_use]
    pub fn is_indexable(&self) -> bool {
        matches!(*self.kind, TypeKind::TablePrimitive | TypeKind::Table(_) | TypeKind::Any | TypeKind::Unknown)
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&TableType> {
        match &*self.kind {
            TypeKind::Table(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&FunctionType> {
        match &*self.kind {
            TypeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// `self ≤ other`, i.e. "`self` accepts `other`": can a value of type
    /// `other` flow into a slot declared as `self`? `Ok(())` on success,
    /// `Err(reason)` with the structured mismatch tree describing the
    /// incompatibility otherwise.
    pub fn assignable_from(&self, other: &Type) -> Result<(), TypeMismatchReason> {
        crate::assignability::assignable(self, other)
    }

    /// The mirror of [`Type::assignable_from`]: "is `self` assignable *to*
    /// `target`", i.e. can `self` flow into a slot declared `target`.
    pub fn assignable_to(&self, target: &Type) -> Result<(), TypeMismatchReason> {
        target.assignable_from(self)
    }

    /// A short, human-readable rendering, preferring the alias name a type
    /// was introduced under.
    #[must_use]
    pub fn display(&self, resolve: impl Fn(Atom) -> String) -> String {
        if let Some(name) = self.display_name {
            return resolve(name);
        }
        self.render(&resolve)
    }

    fn render(&self, resolve: &impl Fn(Atom) -> String) -> String {
        match &*self.kind {
            TypeKind::Any => "any".to_string(),
            TypeKind::Unknown => "unknown".to_string(),
            TypeKind::Nil => "nil".to_string(),
            TypeKind::True => "true".to_string(),
            TypeKind::False => "false".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Number => "number".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::FunctionPrimitive => "function".to_string(),
            TypeKind::TablePrimitive => "table".to_string(),
            TypeKind::StringLiteral(s) => format!("\"{s}\""),
            TypeKind::NumberLiteral(n) => format!("{}", n.0),
            TypeKind::Function(f) => {
                format!("({}) -> {}", f.params.render(resolve), f.returns.render(resolve))
            }
            TypeKind::Table(t) => {
                let fields: Vec<String> = t
                    .pairs
                    .iter()
                    .map(|(k, v)| format!("[{}]: {}", k.render(resolve), v.render(resolve)))
                    .collect();
                format!("{{ {} }}", fields.join(", "))
            }
            TypeKind::Union(members) => {
                members.iter().map(|m| m.render(resolve)).collect::<Vec<_>>().join(" | ")
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (&*self.kind, &*other.kind) {
            (TypeKind::Any, TypeKind::Any)
            | (TypeKind::Unknown, TypeKind::Unknown)
            | (TypeKind::Nil, TypeKind::Nil)
            | (TypeKind::True, TypeKind::True)
            | (TypeKind::False, TypeKind::False)
            | (TypeKind::Boolean, TypeKind::Boolean)
            | (TypeKind::Number, TypeKind::Number)
            | (TypeKind::String, TypeKind::String)
            | (TypeKind::FunctionPrimitive, TypeKind::FunctionPrimitive)
            | (TypeKind::TablePrimitive, TypeKind::TablePrimitive) => true,
            (TypeKind::StringLiteral(a), TypeKind::StringLiteral(b)) => a == b,
            (TypeKind::NumberLiteral(a), TypeKind::NumberLiteral(b)) => a == b,
            (TypeKind::Function(a), TypeKind::Function(b)) => {
                a.params == b.params && a.returns == b.returns
            }
            (TypeKind::Table(a), TypeKind::Table(b)) => a.pairs == b.pairs,
            (TypeKind::Union(a), TypeKind::Union(b)) => {
                // Order-independent: two unions are equivalent for diagnostic
                // purposes whenever each is assignable to the other.
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x == y))
            }
            _ => false,
        }
    }
}
