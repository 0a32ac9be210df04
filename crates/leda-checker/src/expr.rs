//! Checks an *expression* node, producing the [`Type`]
//! flowing out of it and recording it in `node_types` for editor-integration
//! hover support.

use crate::context::{Checker, ReturnFrame};
use leda_common::DiagnosticKind;
use leda_parser::ast::{
    AccessExpr, BinaryExpr, BinaryOp, CallExpr, FunctionExpr, MethodCallExpr, NodeKind, TableExpr, TableField,
    UnaryExpr, UnaryOp,
};
use leda_parser::NodeId;
use leda_types::{ListKind, Type, TypeKind, TypeList, TypeMismatchReason};

/// A function's signature, evaluated from its `TypeFunction` type node
/// before its body is checked.
struct FunctionSignature {
    params: TypeList,
    param_names: Vec<leda_common::Atom>,
    declared_returns: Option<TypeList>,
}

impl Checker<'_> {
    /// Checks an expression in an ordinary (widening) position: number and
    /// string literals widen to their primitive type.
    pub(crate) fn check_expr(&mut self, node: NodeId) -> Type {
        let ty = match self.arena.kind(node).clone() {
            NodeKind::Nil => Type::nil(),
            NodeKind::True => Type::true_value(),
            NodeKind::False => Type::false_value(),
            NodeKind::Number { .. } => Type::number(),
            NodeKind::Str(_) => Type::string(),
            NodeKind::LongStr { .. } => Type::string(),
            NodeKind::Name(_) => self.check_name(node),
            NodeKind::Vararg => Type::any(),
            NodeKind::Table(data) => self.check_table(&data),
            NodeKind::Function(data) => self.check_function_value(&data),
            NodeKind::Access(data) => self.check_access(node, &data),
            NodeKind::Call(data) => self.check_call_returns(node, &data).get(0),
            NodeKind::MethodCall(data) => self.check_method_call_returns(node, &data).get(0),
            NodeKind::Unary(data) => self.check_unary(node, &data),
            NodeKind::Binary(data) => self.check_binary(node, &data),
            NodeKind::Error => Type::unknown(),
            _ => unreachable!("check_expr called on a non-expression node"),
        };
        self.record_node_type(node, ty)
    }

    /// Checks an expression in a *constant position*: number/string literals keep their
    /// literal type instead of widening.
    pub(crate) fn check_expr_constant(&mut self, node: NodeId) -> Type {
        let ty = match self.arena.kind(node).clone() {
            NodeKind::Number { value, .. } => Type::number_literal(value),
            NodeKind::Str(value) => Type::string_literal(value),
            NodeKind::LongStr { value, .. } => Type::string_literal(value),
            _ => return self.check_expr(node),
        };
        self.record_node_type(node, ty)
    }

    fn check_name(&mut self, node: NodeId) -> Type {
        match self.symbol_of(node) {
            Some(symbol) => self.symbol_types.get(&symbol).cloned().unwrap_or_else(Type::unknown),
            None => Type::unknown(),
        }
    }

    fn check_table(&mut self, data: &TableExpr) -> Type {
        let mut pairs = Vec::with_capacity(data.fields.len());
        let mut next_index = 1.0_f64;
        for field in &data.fields {
            match field {
                TableField::Named { key_node, value } => {
                    let NodeKind::Name(atom) = *self.arena.kind(*key_node) else {
                        unreachable!("TableField::Named.key_node is always a Name node");
                    };
                    let key = Type::string_literal(self.resolve_atom(atom));
                    let value_ty = self.check_expr(*value);
                    pairs.push((key, value_ty));
                }
                TableField::Indexed { key, value } => {
                    let key_ty = self.check_expr_constant(*key);
                    let value_ty = self.check_expr(*value);
                    pairs.push((key_ty, value_ty));
                }
                TableField::Positional { value } => {
                    let key = Type::number_literal(next_index);
                    next_index += 1.0;
                    let value_ty = self.check_expr(*value);
                    pairs.push((key, value_ty));
                }
            }
        }
        Type::table(pairs)
    }

    /// Evaluates a `Function` expression's signature, checks its body
    /// against any declared return annotation (or infers one from its
    /// `return` statements), and produces the resulting `Function` type.
    fn check_function_value(&mut self, data: &FunctionExpr) -> Type {
        let sig = self.build_function_signature(data.type_node);
        self.return_stack.push(ReturnFrame { declared: sig.declared_returns.clone(), inferred: Vec::new() });
        self.check_block(data.body);
        let frame = self.return_stack.pop().expect("return_stack push/pop is balanced per function body");
        let returns = sig.declared_returns.unwrap_or_else(|| Self::infer_return_type(&frame.inferred));
        Type::function_named(sig.params, returns, sig.param_names)
    }

    fn build_function_signature(&mut self, type_node: NodeId) -> FunctionSignature {
        let NodeKind::TypeFunction(data) = self.arena.kind(type_node).clone() else {
            unreachable!("Function.type_node is always a TypeFunction node");
        };
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
        let params = if data.has_vararg { TypeList::Rest(params, Box::new(Type::any())) } else { TypeList::Finite(params) };
        let declared_returns =
            data.return_types.as_ref().map(|types| TypeList::Finite(types.iter().map(|t| self.eval_type_expr(*t)).collect()));
        FunctionSignature { params, param_names, declared_returns }
    }

    /// Position-wise union of every `return` statement's value types,
    /// falling back to `nil` when the body has no `return` with values.
    fn infer_return_type(returns: &[TypeList]) -> TypeList {
        let width = returns.iter().filter_map(TypeList::available_count).max().unwrap_or(0);
        if width == 0 {
            return TypeList::single(Type::nil());
        }
        let merged: Vec<Type> = (0..width).map(|i| Type::union(returns.iter().map(|r| r.get(i)).collect())).collect();
        TypeList::Finite(merged)
    }

    pub(crate) fn check_access(&mut self, node: NodeId, data: &AccessExpr) -> Type {
        let target_ty = self.check_expr(data.target);
        let key_ty = if data.dot_form {
            let NodeKind::Name(atom) = *self.arena.kind(data.key) else {
                unreachable!("Access.key in dot form is always a Name node");
            };
            Type::string_literal(self.resolve_atom(atom))
        } else {
            self.check_expr_constant(data.key)
        };
        if target_ty.is_any() || target_ty.is_unknown() {
            return target_ty;
        }
        match target_ty.kind() {
            TypeKind::TablePrimitive => Type::any(),
            TypeKind::Table(t) => match t.lookup(&key_ty) {
                Some(value_ty) => value_ty.clone(),
                None => {
                    let span = self.arena.span(node);
                    let message = format!(
                        "type '{}' does not have key '{}'",
                        target_ty.display(self.resolver()),
                        key_ty.display(self.resolver())
                    );
                    self.report(span, DiagnosticKind::TypeDoesntHaveKey, message);
                    Type::unknown()
                }
            },
            _ => {
                let span = self.arena.span(data.target);
                let message = format!("type '{}' is not indexable", target_ty.display(self.resolver()));
                self.report(span, DiagnosticKind::TypeNotIndexable, message);
                Type::unknown()
            }
        }
    }

    fn check_unary(&mut self, node: NodeId, data: &UnaryExpr) -> Type {
        let operand = self.check_expr(data.expr);
        match data.op {
            UnaryOp::Negate => {
                if Type::number().assignable_from(&operand).is_err() {
                    let span = self.arena.span(node);
                    let message = format!("cannot negate a value of type '{}'", operand.display(self.resolver()));
                    self.report(span, DiagnosticKind::CantNegate, message);
                }
                Type::number()
            }
            UnaryOp::Not => Type::boolean(),
            UnaryOp::Length => {
                let ok =
                    Type::string().assignable_from(&operand).is_ok() || Type::table_primitive().assignable_from(&operand).is_ok();
                if !ok {
                    let span = self.arena.span(node);
                    let message = format!("cannot get the length of a value of type '{}'", operand.display(self.resolver()));
                    self.report(span, DiagnosticKind::CantGetLength, message);
                }
                Type::number()
            }
        }
    }

    fn check_binary(&mut self, node: NodeId, data: &BinaryExpr) -> Type {
        let left = self.check_expr(data.left);
        let right = self.check_expr(data.right);
        match data.op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                let left_span = self.arena.span(data.left);
                let right_span = self.arena.span(data.right);
                self.check_assignable(left_span, &Type::number(), &left);
                self.check_assignable(right_span, &Type::number(), &right);
                Type::number()
            }
            BinaryOp::Concat => {
                let left_span = self.arena.span(data.left);
                let right_span = self.arena.span(data.right);
                self.check_assignable(left_span, &Type::string(), &left);
                self.check_assignable(right_span, &Type::string(), &right);
                Type::string()
            }
            BinaryOp::Eq | BinaryOp::Ne => Type::boolean(),
            BinaryOp::Le | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Gt => {
                let both_number = Type::number().assignable_from(&left).is_ok() && Type::number().assignable_from(&right).is_ok();
                let both_string = Type::string().assignable_from(&left).is_ok() && Type::string().assignable_from(&right).is_ok();
                if !(both_number || both_string) {
                    let span = self.arena.span(node);
                    self.report_mismatch(span, &TypeMismatchReason::Primitive { target: left.clone(), source: right.clone() });
                }
                Type::boolean()
            }
            // `and`/`or` short-circuit to one operand or the other at
            // runtime; the static type is simply the union of both
            // possibilities.
            BinaryOp::And | BinaryOp::Or => Type::union(vec![left, right]),
        }
    }

    /// Checks a `CallExpr`'s target and arguments, producing the callee's
    /// return `TypeList`.
    pub(crate) fn check_call_returns(&mut self, node: NodeId, data: &CallExpr) -> TypeList {
        let target_ty = self.check_expr(data.target);
        if target_ty.is_any() || target_ty.is_unknown() {
            for arg in &data.args {
                self.check_expr(*arg);
            }
            return TypeList::Rest(Vec::new(), Box::new(target_ty));
        }
        match target_ty.kind() {
            TypeKind::FunctionPrimitive => {
                for arg in &data.args {
                    self.check_expr(*arg);
                }
                TypeList::any()
            }
            TypeKind::Function(func) => {
                let func = func.clone();
                let args_list = self.check_value_list(&data.args);
                if let Err(reason) = func.params.assignable_from(&args_list, ListKind::Arguments) {
                    let span = self.arena.span(node);
                    self.report_call_mismatch(span, reason);
                }
                func.returns.clone()
            }
            _ => {
                for arg in &data.args {
                    self.check_expr(*arg);
                }
                let span = self.arena.span(data.target);
                let message = format!("type '{}' is not callable", target_ty.display(self.resolver()));
                self.report(span, DiagnosticKind::TypeNotCallable, message);
                TypeList::single(Type::unknown())
            }
        }
    }

    /// Checks a `MethodCallExpr`: resolves `target:method_name` as a field
    /// access, then checks the call against its signature with the
    /// synthetic leading `self` parameter the parser desugared in stripped back off.
    pub(crate) fn check_method_call_returns(&mut self, node: NodeId, data: &MethodCallExpr) -> TypeList {
        let target_ty = self.check_expr(data.target);
        if target_ty.is_any() || target_ty.is_unknown() {
            for arg in &data.args {
                self.check_expr(*arg);
            }
            return TypeList::Rest(Vec::new(), Box::new(target_ty));
        }
        let key_ty = Type::string_literal(self.resolve_atom(data.method_name));
        let method_ty = match target_ty.kind() {
            TypeKind::Table(t) => t.lookup(&key_ty).cloned(),
            TypeKind::TablePrimitive => Some(Type::any()),
            _ => None,
        };
        let Some(method_ty) = method_ty else {
            let message = format!(
                "type '{}' does not have key '{}'",
                target_ty.display(self.resolver()),
                self.resolve_atom(data.method_name)
            );
            self.report(data.method_name_span, DiagnosticKind::TypeDoesntHaveKey, message);
            for arg in &data.args {
                self.check_expr(*arg);
            }
            return TypeList::single(Type::unknown());
        };
        if method_ty.is_any() || method_ty.is_unknown() {
            for arg in &data.args {
                self.check_expr(*arg);
            }
            return TypeList::Rest(Vec::new(), Box::new(method_ty));
        }
        let Some(func) = method_ty.as_function().cloned() else {
            let message = format!("type '{}' is not callable", method_ty.display(self.resolver()));
            self.report(data.method_name_span, DiagnosticKind::TypeNotCallable, message);
            for arg in &data.args {
                self.check_expr(*arg);
            }
            return TypeList::single(Type::unknown());
        };
        let args_list = self.check_value_list(&data.args);
        let effective_params = func.params.drop_front(1);
        if let Err(reason) = effective_params.assignable_from(&args_list, ListKind::Arguments) {
            let span = self.arena.span(node);
            self.report_call_mismatch(span, reason);
        }
        func.returns.clone()
    }

    fn report_call_mismatch(&mut self, span: leda_common::Span, reason: TypeMismatchReason) {
        if let TypeMismatchReason::NotEnoughValues { expected, got, kind } = &reason {
            let message = format!("expected at least {expected} {}(s) but got {got}", kind.label());
            self.report(span, DiagnosticKind::NotEnoughArguments, message);
        } else {
            self.report_mismatch(span, &reason);
        }
    }

    /// Checks a value-producing expression list (declaration/assignment RHS,
    /// `return` values, call arguments): the last expression is special. A
    /// trailing call splices in its full return `TypeList` as a
    /// continuation, a trailing `...` becomes a repeating `any` rest, and
    /// anything else contributes a single value.
    pub(crate) fn check_value_list(&mut self, values: &[NodeId]) -> TypeList {
        self.check_value_list_with(values, |_| false)
    }

    /// Like [`check_value_list`](Self::check_value_list), but checks the
    /// value at any index for which `is_constant` returns `true` in
    /// *constant position* (`check_expr_constant`) instead of widening
    /// position. Used for declarations with a type annotation, so a literal
    /// RHS keeps its literal type and a mismatch reports the literal
    /// (`source = "hi"`) rather than its widened primitive (`source =
    /// string`).
    pub(crate) fn check_value_list_with(&mut self, values: &[NodeId], is_constant: impl Fn(usize) -> bool) -> TypeList {
        let Some((last, init)) = values.split_last() else {
            return TypeList::empty();
        };
        let mut prefix: Vec<Type> = init
            .iter()
            .enumerate()
            .map(|(i, v)| if is_constant(i) { self.check_expr_constant(*v) } else { self.check_expr(*v) })
            .collect();
        let last_index = init.len();
        match self.arena.kind(*last).clone() {
            NodeKind::Call(data) => {
                let returns = self.check_call_returns(*last, &data);
                self.record_node_type(*last, returns.get(0));
                match returns {
                    TypeList::Finite(v) => {
                        prefix.extend(v);
                        TypeList::Finite(prefix)
                    }
                    other => TypeList::Continued(prefix, Box::new(other)),
                }
            }
            NodeKind::MethodCall(data) => {
                let returns = self.check_method_call_returns(*last, &data);
                self.record_node_type(*last, returns.get(0));
                match returns {
                    TypeList::Finite(v) => {
                        prefix.extend(v);
                        TypeList::Finite(prefix)
                    }
                    other => TypeList::Continued(prefix, Box::new(other)),
                }
            }
            NodeKind::Vararg => {
                self.check_expr(*last);
                TypeList::Rest(prefix, Box::new(Type::any()))
            }
            _ => {
                let ty = if is_constant(last_index) { self.check_expr_constant(*last) } else { self.check_expr(*last) };
                prefix.push(ty);
                TypeList::Finite(prefix)
            }
        }
    }
}
