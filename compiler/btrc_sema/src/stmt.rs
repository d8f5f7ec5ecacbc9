//! Statement analysis (pass 2, spec.md §4.4).

use btrc_ir::ast::Stmt;
use btrc_ir::Span;

use crate::error::SemaErrorKind;
use crate::scope::{ScopeKind, ScopeId, Symbol, SymbolKind};
use crate::Analyzer;

impl<'a> Analyzer<'a> {
    pub(crate) fn check_block(&mut self, body: &[Stmt], scope: ScopeId) {
        let block_scope = self.open_scope(scope, ScopeKind::Block);
        for stmt in body {
            self.check_stmt(stmt, block_scope);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match stmt {
            Stmt::VarDecl { name, ty, init, is_var, span } => {
                self.check_var_decl(*name, ty.as_ref(), init, *is_var, scope, *span);
            }
            Stmt::Assign { target, op, value, span } => {
                let target_ty = self.infer_expr(target, scope);
                let value_ty = self.infer_expr(value, scope);
                if !target.is_lvalue() {
                    let text = self.result.types.display(target_ty, self.interner);
                    self.diagnostics.emit_error(
                        SemaErrorKind::TypeMismatch { expected: "an assignable target".to_string(), found: text }
                            .into_diagnostic(*span),
                    );
                    return;
                }
                let rhs_ty = match op.underlying_binary() {
                    Some(bin_op) => self.infer_binary(bin_op, target_ty, value_ty, *span),
                    None => value_ty,
                };
                self.mismatch(target_ty, rhs_ty, *span);
            }
            Stmt::ExprStmt { value, .. } => {
                self.infer_expr(value, scope);
            }
            Stmt::If { cond, then_body, else_body, span } => {
                self.check_condition(cond, scope, *span);
                self.check_block(then_body, scope);
                self.check_block(else_body, scope);
            }
            Stmt::CFor { init, cond, step, body, .. } => {
                let for_scope = self.open_scope(scope, ScopeKind::Block);
                if let Some(init) = init {
                    self.check_stmt(init, for_scope);
                }
                if let Some(cond) = cond {
                    let span = cond.span();
                    self.check_condition(cond, for_scope, span);
                }
                if let Some(step) = step {
                    self.check_stmt(step, for_scope);
                }
                self.loop_depth += 1;
                self.check_block(body, for_scope);
                self.loop_depth -= 1;
            }
            Stmt::ForIn { binding, iter, body, span } => {
                let iter_ty = self.infer_expr(iter, scope);
                let elem_ty = self.for_in_element_type(iter_ty, *span);
                let for_scope = self.open_scope(scope, ScopeKind::Block);
                self.scopes.declare(
                    for_scope,
                    Symbol { name: *binding, kind: SymbolKind::Variable, ty: elem_ty, scope: for_scope, access: None, defining_span: *span },
                );
                self.loop_depth += 1;
                self.check_block(body, for_scope);
                self.loop_depth -= 1;
            }
            Stmt::While { cond, body, span } => {
                self.check_condition(cond, scope, *span);
                self.loop_depth += 1;
                self.check_block(body, scope);
                self.loop_depth -= 1;
            }
            Stmt::DoWhile { body, cond, span } => {
                self.loop_depth += 1;
                self.check_block(body, scope);
                self.loop_depth -= 1;
                self.check_condition(cond, scope, *span);
            }
            Stmt::Switch { subject, cases, .. } => {
                let subject_ty = self.infer_expr(subject, scope);
                for case in cases {
                    for label in &case.labels {
                        let label_ty = self.infer_expr(label, scope);
                        self.mismatch(subject_ty, label_ty, case.span);
                    }
                    self.check_block(&case.body, scope);
                }
            }
            Stmt::Try { body, catches, finally_body, .. } => {
                self.check_block(body, scope);
                for catch in catches {
                    let catch_scope = self.open_scope(scope, ScopeKind::Block);
                    if let (Some(binding), Some(ty)) = (catch.binding, &catch.ty) {
                        let resolved = self.resolve_type(ty, &[]);
                        self.scopes.declare(
                            catch_scope,
                            Symbol {
                                name: binding,
                                kind: SymbolKind::Variable,
                                ty: resolved,
                                scope: catch_scope,
                                access: None,
                                defining_span: catch.span,
                            },
                        );
                    }
                    self.check_block(&catch.body, catch_scope);
                }
                self.check_block(finally_body, scope);
            }
            Stmt::Throw { value, .. } => {
                self.infer_expr(value, scope);
            }
            Stmt::Return { value, span } => {
                let expected = self.expected_return.last().copied().unwrap_or(self.result.types.void);
                match value {
                    Some(value) => {
                        let ty = self.infer_expr(value, scope);
                        self.mismatch(expected, ty, *span);
                    }
                    None => {
                        if expected != self.result.types.void {
                            let text = self.result.types.display(expected, self.interner);
                            self.diagnostics.emit_error(
                                SemaErrorKind::TypeMismatch { expected: text, found: "void".to_string() }
                                    .into_diagnostic(*span),
                            );
                        }
                    }
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Block { body, .. } => self.check_block(body, scope),
        }
    }

    fn check_var_decl(
        &mut self,
        name: btrc_ir::Name,
        ty: Option<&btrc_ir::Type>,
        init: &btrc_ir::ast::Expr,
        is_var: bool,
        scope: ScopeId,
        span: Span,
    ) {
        let init_ty = self.infer_expr(init, scope);
        let declared_ty = match ty {
            Some(ty) => {
                let resolved = self.resolve_type(ty, &[]);
                self.mismatch(resolved, init_ty, span);
                resolved
            }
            None => {
                if !is_var {
                    let text = self.interner.resolve(name);
                    self.diagnostics
                        .emit_error(SemaErrorKind::VarWithoutInitializer { name: text }.into_diagnostic(span));
                }
                init_ty
            }
        };
        self.scopes.declare(
            scope,
            Symbol { name, kind: SymbolKind::Variable, ty: declared_ty, scope, access: None, defining_span: span },
        );
    }

    fn check_condition(&mut self, cond: &btrc_ir::ast::Expr, scope: ScopeId, span: Span) {
        let ty = self.infer_expr(cond, scope);
        if ty != self.result.types.bool_ && !self.result.types.is_error(ty) {
            self.mismatch(self.result.types.bool_, ty, span);
        }
    }

    /// Element type of a `for-in` iterable: the value type of a builtin
    /// collection, or `int` for the builtin `range(...)` pseudo-type
    /// (spec.md §4.5 "Control flow lowering").
    ///
    /// # Panics
    /// Never: the `Generic` arm only matches when `args` is non-empty, so
    /// `args.last()` always succeeds.
    #[allow(clippy::unwrap_used)]
    fn for_in_element_type(&mut self, iter_ty: crate::TypeId, span: Span) -> crate::TypeId {
        use crate::types::CanonicalType;
        match self.result.types.get(iter_ty).clone() {
            CanonicalType::Generic(_, args) if !args.is_empty() => *args.last().unwrap(),
            CanonicalType::Declared(name) if self.interner.resolve(name) == "range" => self.result.types.int,
            CanonicalType::Error => self.result.types.error,
            _ => {
                let text = self.result.types.display(iter_ty, self.interner);
                self.diagnostics.emit_error(
                    SemaErrorKind::TypeMismatch { expected: "an iterable".to_string(), found: text }.into_diagnostic(span),
                );
                self.result.types.error
            }
        }
    }
}
