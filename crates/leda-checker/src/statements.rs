//! Checks a statement node and walks `Block`s. Mirrors `leda_binder::binder`'s statement dispatch so the
//! two passes stay easy to compare side by side.

use crate::context::Checker;
use leda_common::DiagnosticKind;
use leda_parser::ast::{AssignmentStmt, Declaration, IteratorFor, LocalFunctionDeclStmt, NodeKind, NumericalFor, TypeAliasDecl};
use leda_parser::NodeId;
use leda_types::{ListKind, Type, TypeList};

impl Checker<'_> {
    /// Checks every statement in a `Block` node's source order.
    pub(crate) fn check_block(&mut self, block: NodeId) {
        let NodeKind::Block(data) = self.arena.kind(block).clone() else {
            unreachable!("check_block called on a non-Block node");
        };
        for stmt in data.statements {
            self.check_statement(stmt);
        }
    }

    fn check_statement(&mut self, id: NodeId) {
        match self.arena.kind(id).clone() {
            NodeKind::Do(body) => self.check_block(body),
            NodeKind::If(data) => {
                self.check_expr(data.cond);
                self.check_block(data.then_body);
                for (cond, body) in data.else_ifs {
                    self.check_expr(cond);
                    self.check_block(body);
                }
                if let Some(else_body) = data.else_body {
                    self.check_block(else_body);
                }
            }
            NodeKind::NumericalFor(data) => self.check_numerical_for(&data),
            NodeKind::IteratorFor(data) => self.check_iterator_for(&data),
            NodeKind::While(data) => {
                self.check_expr(data.cond);
                self.check_block(data.body);
            }
            NodeKind::RepeatUntil(data) => {
                self.check_block(data.body);
                self.check_expr(data.cond);
            }
            NodeKind::LocalDeclaration(data) => self.check_decl_list(&data.declarations, &data.values),
            NodeKind::LocalFunctionDeclaration(data) => self.check_local_function_decl(&data),
            NodeKind::GlobalDeclaration(data) => self.check_decl_list(&data.declarations, &data.values),
            NodeKind::Return(values) => self.check_return(id, values),
            NodeKind::Break => {}
            NodeKind::Assignment(data) => self.check_assignment(&data),
            NodeKind::TypeAliasDeclaration(data) => self.check_type_alias(&data),
            // Expression-statements: Call/MethodCall/Error.
            _ => {
                self.check_expr(id);
            }
        }
    }

    /// Shared by `local` and `global` declarations: checks the value list
    /// once, then types each declared name against its annotation (if any)
    /// or the corresponding value's inferred type otherwise. A value lined
    /// up against an annotated declaration is checked in constant position,
    /// so a literal RHS mismatches against its literal type instead of its
    /// widened one.
    fn check_decl_list(&mut self, declarations: &[Declaration], values: &[NodeId]) {
        let value_list = self.check_value_list_with(values, |i| declarations.get(i).is_some_and(|d| d.type_ann.is_some()));
        for (i, decl) in declarations.iter().enumerate() {
            let actual = value_list.get(i);
            let Some(symbol) = self.symbol_of(decl.name_node) else { continue };
            let final_ty = match decl.type_ann {
                Some(ann) => {
                    let declared = self.eval_type_expr(ann);
                    let span = self.arena.span(decl.name_node);
                    self.check_assignable(span, &declared, &actual);
                    declared
                }
                None => actual,
            };
            self.symbol_types.insert(symbol, final_ty);
        }
    }

    /// `local function f() ... end` binds `f` before its body is checked, so
    /// a self-recursive call resolves. A preliminary
    /// signature-only type is recorded first; once the body is checked
    /// (possibly refining an inferred return type), the symbol is patched to
    /// the final type.
    fn check_local_function_decl(&mut self, data: &LocalFunctionDeclStmt) {
        let NodeKind::Function(func_data) = self.arena.kind(data.function).clone() else {
            unreachable!("LocalFunctionDeclaration.function is always a Function node");
        };
        let prelim_sig = self.build_function_signature(func_data.type_node);
        let prelim_returns = prelim_sig.declared_returns.clone().unwrap_or_else(TypeList::any);
        if let Some(symbol) = self.symbol_of(data.name_node) {
            self.symbol_types.insert(symbol, Type::function_named(prelim_sig.params.clone(), prelim_returns, prelim_sig.param_names.clone()));
        }
        let final_ty = self.check_expr(data.function);
        if let Some(symbol) = self.symbol_of(data.name_node) {
            self.symbol_types.insert(symbol, final_ty);
        }
    }

    fn check_return(&mut self, stmt_id: NodeId, values: Option<Vec<NodeId>>) {
        let actual = match &values {
            Some(vals) => self.check_value_list(vals),
            None => TypeList::empty(),
        };
        let declared = self.return_stack.last().and_then(|frame| frame.declared.clone());
        if let Some(declared) = declared {
            if let Err(reason) = declared.assignable_from(&actual, ListKind::Returns) {
                let report_span = match &values {
                    Some(vals) if !vals.is_empty() => self.arena.span(vals[0]),
                    _ => self.arena.span(stmt_id),
                };
                self.report_mismatch(report_span, &reason);
            }
        }
        if let Some(frame) = self.return_stack.last_mut() {
            frame.inferred.push(actual);
        }
    }

    fn check_assignment(&mut self, data: &AssignmentStmt) {
        let value_list = self.check_value_list(&data.values);
        for (i, target) in data.targets.iter().enumerate() {
            let actual = value_list.get(i);
            match self.arena.kind(*target).clone() {
                NodeKind::Name(_) => {
                    let Some(symbol) = self.symbol_of(*target) else { continue };
                    let span = self.arena.span(*target);
                    match self.symbol_types.get(&symbol).cloned() {
                        Some(declared) => {
                            self.check_assignable(span, &declared, &actual);
                        }
                        None => {
                            self.symbol_types.insert(symbol, actual);
                        }
                    }
                }
                NodeKind::Access(access) => {
                    let declared = self.check_access(*target, &access);
                    let span = self.arena.span(*target);
                    self.check_assignable(span, &declared, &actual);
                }
                _ => {}
            }
        }
    }

    fn check_numerical_for(&mut self, data: &NumericalFor) {
        let start_ty = self.check_expr(data.start);
        self.check_for_operand(data.start, &start_ty, DiagnosticKind::ForLoopStartNotNumber);
        let limit_ty = self.check_expr(data.limit);
        self.check_for_operand(data.limit, &limit_ty, DiagnosticKind::ForLoopLimitNotNumber);
        if let Some(step) = data.step {
            let step_ty = self.check_expr(step);
            self.check_for_operand(step, &step_ty, DiagnosticKind::ForLoopStepNotNumber);
        }
        if let Some(symbol) = self.symbol_of(data.counter.name_node) {
            self.symbol_types.insert(symbol, Type::number());
        }
        self.check_block(data.body);
    }

    fn check_for_operand(&mut self, node: NodeId, ty: &Type, kind: DiagnosticKind) {
        if Type::number().assignable_from(ty).is_err() {
            let span = self.arena.span(node);
            let message = format!("'for' loop operand must be a number, got '{}'", ty.display(self.resolver()));
            self.report(span, kind, message);
        }
    }

    /// Generic-for declarations are untyped at the source level (the parser
    /// never accepts an annotation there), so each is given type `any`
    /// rather than attempting to infer
    /// an iterator protocol's element type.
    fn check_iterator_for(&mut self, data: &IteratorFor) {
        for e in &data.iterator {
            self.check_expr(*e);
        }
        for decl in &data.declarations {
            if let Some(symbol) = self.symbol_of(decl.name_node) {
                self.symbol_types.insert(symbol, Type::any());
            }
        }
        self.check_block(data.body);
    }

    fn check_type_alias(&mut self, data: &TypeAliasDecl) {
        let ty = self.eval_type_expr(data.ty);
        if let Some(symbol) = self.symbol_of(data.name_node) {
            self.symbol_types.insert(symbol, ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use leda_common::DiagnosticKind;

    fn check_source(src: &str) -> crate::CheckResult {
        let mut parsed = leda_parser::parse(src);
        let bind_result = leda_binder::bind(&parsed.arena, &mut parsed.interner, parsed.root);
        crate::check(&parsed.arena, &parsed.interner, parsed.root, &bind_result)
    }

    #[test]
    fn local_declaration_with_mismatched_annotation_is_type_mismatch() {
        let result = check_source("local x: number = \"hi\"");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::TypeMismatch);
    }

    #[test]
    fn mismatched_annotation_reports_the_literal_value_not_its_widened_type() {
        // S1: the reason should name the source as the literal `"hi"`, not
        // the widened primitive `string` - the RHS of an annotated
        // declaration is checked in constant position.
        let result = check_source("local x: number = \"hi\"");
        assert!(result.diagnostics[0].message.contains("'\"hi\"'"));
        assert!(!result.diagnostics[0].message.contains("'string'"));
    }

    #[test]
    fn mismatched_type_alias_annotation_reports_the_alias_name_and_the_literal() {
        // S7: `type T = number; local x: T = ""` - target display is the
        // alias name `T`, source is the literal `""`.
        let result = check_source("type T = number\nlocal x: T = \"\"");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("'T'"));
        assert!(result.diagnostics[0].message.contains("'\"\"'"));
    }

    #[test]
    fn reassigning_an_inferred_local_to_an_incompatible_type_is_an_error() {
        let result = check_source("local x = 1\nx = \"hi\"");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::TypeMismatch);
    }

    #[test]
    fn accessing_a_missing_table_field_is_reported() {
        let result = check_source("local t = { x = 1 }\nlocal y = t.y");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::TypeDoesntHaveKey);
    }

    #[test]
    fn calling_with_too_few_arguments_is_not_enough_arguments() {
        let result = check_source("local function f(a: number, b: number): number return a + b end\nlocal x = f(1)");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::NotEnoughArguments);
    }

    #[test]
    fn recursive_local_function_type_checks_without_error() {
        let result = check_source("local function f(n: number): number if n <= 0 then return 0 end return f(n - 1) end");
        assert_eq!(result.diagnostics.len(), 0);
    }

    #[test]
    fn omitted_return_annotation_is_inferred_from_return_statements() {
        let result = check_source("local function f() return 1 end\nlocal x: number = f()");
        assert_eq!(result.diagnostics.len(), 0);
    }

    #[test]
    fn table_constructor_infers_a_structural_table_type() {
        let result = check_source("local t = { x = 1 }\nlocal y: number = t.x");
        assert_eq!(result.diagnostics.len(), 0);
    }

    #[test]
    fn numeric_for_loop_start_must_be_a_number() {
        let result = check_source("for i = \"a\", 10 do end");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ForLoopStartNotNumber);
    }

    #[test]
    fn concatenating_a_number_without_conversion_is_a_type_mismatch() {
        let result = check_source("local x = 1 .. 2");
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result.diagnostics.iter().all(|d| d.kind == DiagnosticKind::TypeMismatch));
    }

    #[test]
    fn calling_a_non_function_value_is_reported() {
        let result = check_source("local x = 1\nx()");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::TypeNotCallable);
    }
}
