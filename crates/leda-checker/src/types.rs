//! Evaluates a *type expression* node
//! into a [`Type`] value.

use crate::context::Checker;
use leda_binder::SymbolKind;
use leda_parser::ast::NodeKind;
use leda_parser::NodeId;
use leda_types::{Type, TypeList};

impl Checker<'_> {
    /// Evaluates a type-expression node. `Unknown` is returned for a name
    /// the binder couldn't resolve (already reported as `NameNotFound`) or
    /// for a type-symbol whose alias body hasn't been evaluated yet - this
    /// is how recursive aliases quietly fail (no recursive aliases in v1)
    /// rather than infinitely recursing.
    pub(crate) fn eval_type_expr(&mut self, node: NodeId) -> Type {
        match self.arena.kind(node).clone() {
            NodeKind::TypeName(_) => self.eval_type_name(node),
            NodeKind::TypeFunction(data) => {
                let mut params = Vec::with_capacity(data.params.len());
                let mut param_names = Vec::with_capacity(data.params.len());
                for decl in &data.params {
                    let NodeKind::Name(atom) = *self.arena.kind(decl.name_node) else {
                        unreachable!("Declaration.name_node is always a Name node");
                    };
                    param_names.push(atom);
                    let ty = decl.type_ann.map_or_else(Type::any, |ann| self.eval_type_expr(ann));
                    params.push(ty);
                }
                let param_list = if data.has_vararg {
                    TypeList::Rest(params, Box::new(Type::any()))
                } else {
                    TypeList::Finite(params)
                };
                let returns = match &data.return_types {
                    Some(types) => {
                        let evaluated: Vec<Type> = types.iter().map(|t| self.eval_type_expr(*t)).collect();
                        TypeList::Finite(evaluated)
                    }
                    None => TypeList::Finite(Vec::new()),
                };
                Type::function_named(param_list, returns, param_names)
            }
            NodeKind::TypeTable(data) => {
                let pairs = data.pairs.iter().map(|(k, v)| (self.eval_type_expr(*k), self.eval_type_expr(*v))).collect();
                Type::table(pairs)
            }
            NodeKind::TypeStringLiteral(s) => Type::string_literal(s),
            NodeKind::TypeNumberLiteral(n) => Type::number_literal(n),
            NodeKind::TypeUnion(alts) => {
                let evaluated: Vec<Type> = alts.iter().map(|a| self.eval_type_expr(*a)).collect();
                Type::union(evaluated)
            }
            NodeKind::Error => Type::unknown(),
            _ => unreachable!("eval_type_expr called on a non-type-expression node"),
        }
    }

    fn eval_type_name(&mut self, node: NodeId) -> Type {
        let NodeKind::TypeName(atom) = *self.arena.kind(node) else {
            unreachable!("eval_type_name called on a non-TypeName node");
        };
        let Some(symbol) = self.symbol_of(node) else {
            return Type::unknown();
        };
        match &self.bind_result.symbols.get(symbol).kind {
            SymbolKind::IntrinsicType(ty) => ty.clone(),
            SymbolKind::TypeSymbol => {
                self.symbol_types.get(&symbol).cloned().unwrap_or_else(Type::unknown).with_display_name(atom)
            }
            _ => Type::unknown(),
        }
    }
}
