//! Expression inference (pass 2, spec.md §4.4 "Type inference").
//!
//! Every function here returns the resolved `TypeId` of the expression it
//! is given and records an [`crate::ExprFacts`] for it via
//! [`Analyzer::record_expr`] before returning, so the IR Generator never
//! has to re-derive a type or a binding.

use btrc_ir::ast::{BinaryOp, Expr, FStringChunk, UnaryOp};
use btrc_ir::Name;

use crate::error::{null_deref_warning, SemaErrorKind};
use crate::scope::{ScopeId, ScopeKind, Symbol, SymbolKind};
use crate::types::CanonicalType;
use crate::{Analyzer, Binding, ExprFacts, TypeId};

impl<'a> Analyzer<'a> {
    pub(crate) fn record_expr(&mut self, expr: &Expr, ty: TypeId, binding: Option<Binding>) -> TypeId {
        self.result.expr_facts.insert(crate::expr_key(expr), ExprFacts { ty, binding });
        ty
    }

    pub(crate) fn infer_expr(&mut self, expr: &Expr, scope: ScopeId) -> TypeId {
        match expr {
            Expr::IntLit { .. } => {
                let ty = self.result.types.int;
                self.record_expr(expr, ty, None)
            }
            Expr::FloatLit { .. } => {
                let ty = self.result.types.double;
                self.record_expr(expr, ty, None)
            }
            Expr::CharLit { .. } => {
                let ty = self.result.types.char_;
                self.record_expr(expr, ty, None)
            }
            Expr::StringLit { .. } => {
                let ty = self.result.types.str_;
                self.record_expr(expr, ty, None)
            }
            Expr::BoolLit { .. } => {
                let ty = self.result.types.bool_;
                self.record_expr(expr, ty, None)
            }
            Expr::NullLit { .. } => {
                // Untyped null; widened against context at the use site
                // (assignment, call argument) by `is_structurally_assignable`.
                let ty = self.result.types.error;
                self.record_expr(expr, ty, None)
            }
            Expr::FString { chunks, .. } => {
                for chunk in chunks {
                    if let FStringChunk::Interp { value, .. } = chunk {
                        self.infer_expr(value, scope);
                    }
                }
                let ty = self.result.types.str_;
                self.record_expr(expr, ty, None)
            }
            Expr::Ident { name, span } => {
                let (ty, binding) = self.infer_ident(*name, *span, scope);
                self.record_expr(expr, ty, Some(binding))
            }
            Expr::Member { base, name, is_null_safe, span, .. } => {
                let base_ty = self.infer_expr(base, scope);
                let (ty, binding) = self.infer_member(base_ty, *name, *is_null_safe, *span);
                self.record_expr(expr, ty, Some(binding))
            }
            Expr::Index { base, index, span } => {
                let base_ty = self.infer_expr(base, scope);
                self.infer_expr(index, scope);
                let ty = self.element_type_of(base_ty, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::Call { callee, args, span } => {
                let arg_types: Vec<TypeId> = args.iter().map(|a| self.infer_expr(a, scope)).collect();
                let ty = self.infer_call(callee, &arg_types, scope, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::Unary { op, operand, span } => {
                let operand_ty = self.infer_expr(operand, scope);
                let ty = self.infer_unary(*op, operand_ty, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let lhs_ty = self.infer_expr(lhs, scope);
                let rhs_ty = self.infer_expr(rhs, scope);
                let ty = self.infer_binary(*op, lhs_ty, rhs_ty, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::Ternary { cond, then_expr, else_expr, span } => {
                let cond_ty = self.infer_expr(cond, scope);
                if cond_ty != self.result.types.bool_ && !self.result.types.is_error(cond_ty) {
                    self.type_mismatch(self.result.types.bool_, cond_ty, *span);
                }
                let then_ty = self.infer_expr(then_expr, scope);
                let else_ty = self.infer_expr(else_expr, scope);
                let ty = if self.result.types.is_structurally_assignable(else_ty, then_ty) {
                    then_ty
                } else if self.result.types.is_structurally_assignable(then_ty, else_ty) {
                    else_ty
                } else {
                    self.type_mismatch(then_ty, else_ty, *span);
                    self.result.types.error
                };
                self.record_expr(expr, ty, None)
            }
            Expr::Cast { ty, operand, .. } => {
                self.infer_expr(operand, scope);
                let resolved = self.resolve_type(ty, &[]);
                self.record_expr(expr, resolved, None)
            }
            Expr::SizeOf { ty, .. } => {
                self.resolve_type(ty, &[]);
                let resolved = self.result.types.int;
                self.record_expr(expr, resolved, None)
            }
            Expr::New { ty, args, span } => {
                let arg_types: Vec<TypeId> = args.iter().map(|a| self.infer_expr(a, scope)).collect();
                let resolved = self.resolve_type(ty, &[]);
                self.check_ctor_call(resolved, &arg_types, *span);
                self.record_expr(expr, resolved, None)
            }
            Expr::Delete { operand, .. } => {
                self.infer_expr(operand, scope);
                let ty = self.result.types.void;
                self.record_expr(expr, ty, None)
            }
            Expr::Release { operand, .. } => {
                self.infer_expr(operand, scope);
                let ty = self.result.types.void;
                self.record_expr(expr, ty, None)
            }
            Expr::LambdaArrow { params, body, span } => {
                let ty = self.infer_lambda(params, std::slice::from_ref(body.as_ref()), true, scope, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::LambdaBlock { params, body, span } => {
                let ty = self.infer_lambda_block(params, body, scope, *span);
                self.record_expr(expr, ty, None)
            }
            Expr::TupleLit { elements, .. } => {
                let tys = elements.iter().map(|e| self.infer_expr(e, scope)).collect();
                let ty = self.result.types.intern(CanonicalType::Tuple(tys));
                self.record_expr(expr, ty, None)
            }
            Expr::TuplePattern { bindings, value, span } => {
                let value_ty = self.infer_expr(value, scope);
                self.bind_tuple_pattern(bindings, value_ty, scope, *span);
                let ty = self.result.types.void;
                self.record_expr(expr, ty, None)
            }
            Expr::Range { start, stop, step, .. } => {
                self.infer_expr(start, scope);
                self.infer_expr(stop, scope);
                if let Some(step) = step {
                    self.infer_expr(step, scope);
                }
                let range_name = self.interner.intern("range");
                let ty = self.result.types.intern(CanonicalType::Declared(range_name));
                self.record_expr(expr, ty, None)
            }
            Expr::NullCoalesce { lhs, rhs, .. } => {
                let lhs_ty = self.infer_expr(lhs, scope);
                let rhs_ty = self.infer_expr(rhs, scope);
                let ty = self.result.types.underlying_if_nullable(lhs_ty).unwrap_or(lhs_ty);
                let _ = rhs_ty;
                self.record_expr(expr, ty, None)
            }
        }
    }

    fn infer_ident(&mut self, name: Name, span: btrc_ir::Span, scope: ScopeId) -> (TypeId, Binding) {
        if let Some(sym) = self.scopes.lookup(scope, name) {
            let binding = match sym.kind {
                SymbolKind::Variable if sym.scope == self.module_scope => Binding::Global,
                SymbolKind::Variable => Binding::Local,
                SymbolKind::Parameter => Binding::Parameter,
                SymbolKind::Field => {
                    Binding::Field { owner: self.scopes.owning_class(scope).unwrap_or(Name::EMPTY) }
                }
                SymbolKind::Method => {
                    Binding::Method { owner: self.scopes.owning_class(scope).unwrap_or(Name::EMPTY) }
                }
                SymbolKind::Function => Binding::Function,
                SymbolKind::Type => Binding::Type(name),
                SymbolKind::EnumVariant => {
                    Binding::EnumVariant { owner: self.scopes.owning_class(scope).unwrap_or(Name::EMPTY) }
                }
            };
            return (sym.ty, binding);
        }
        if name == self.interner.intern("this") || name == self.interner.intern("base") {
            if let Some(owner) = self.scopes.owning_class(scope) {
                let ty = self.result.types.intern(CanonicalType::Declared(owner));
                return (ty, Binding::SelfRef);
            }
        }
        let text = self.interner.resolve(name);
        self.diagnostics.emit_error(SemaErrorKind::UnknownIdentifier { name: text }.into_diagnostic(span));
        (self.result.types.error, Binding::Unresolved)
    }

    fn infer_member(&mut self, base_ty: TypeId, name: Name, is_null_safe: bool, span: btrc_ir::Span) -> (TypeId, Binding) {
        if self.result.types.is_error(base_ty) {
            return (self.result.types.error, Binding::Unresolved);
        }
        let (base_ty, was_nullable) = match self.result.types.underlying_if_nullable(base_ty) {
            Some(inner) => (inner, true),
            None => (base_ty, false),
        };
        if was_nullable && !is_null_safe {
            let text = self.interner.resolve(name);
            self.diagnostics.emit_warning(null_deref_warning(span, &text));
        }
        let Some(class_name) = self.result.types.declared_name(base_ty) else {
            return (self.result.types.error, Binding::Unresolved);
        };
        if let Some(found) = self.lookup_member(class_name, name) {
            let ty = if is_null_safe { self.result.types.widen_to_nullable(found.0) } else { found.0 };
            return (ty, found.1);
        }
        let text = self.interner.resolve(name);
        self.diagnostics.emit_error(SemaErrorKind::UnknownIdentifier { name: text }.into_diagnostic(span));
        (self.result.types.error, Binding::Unresolved)
    }

    /// Looks a member up through `class_name`'s inheritance chain: fields
    /// first, then methods, matching spec.md §4.4's member-resolution order.
    /// A method resolves to its `Function` type, so a bare `obj.method`
    /// (passed as a callback, or called directly by the caller) type-checks
    /// the same way either way.
    fn lookup_member(&mut self, class_name: Name, member: Name) -> Option<(TypeId, Binding)> {
        let mut current = Some(class_name);
        while let Some(name) = current {
            let Some(info) = self.result.classes.get(&name).cloned() else { break };
            if let Some(field) = info.fields.iter().find(|f| f.name == member) {
                let binding = if field.is_static { Binding::StaticField { owner: name } } else { Binding::Field { owner: name } };
                return Some((field.ty, binding));
            }
            if let Some(method) = info.methods.iter().find(|m| m.name == member) {
                let ty = self.result.types.intern(CanonicalType::Function(method.params.clone(), method.ret));
                let binding = if method.is_static { Binding::StaticMethod { owner: name } } else { Binding::Method { owner: name } };
                return Some((ty, binding));
            }
            current = info.superclass;
        }
        if let Some(info) = self.result.structs.get(&class_name).cloned() {
            if let Some(field) = info.fields.iter().find(|f| f.name == member) {
                return Some((field.ty, Binding::Field { owner: class_name }));
            }
        }
        if let Some(info) = self.result.enums.get(&class_name).cloned() {
            if info.variants.iter().any(|v| v.name == member) {
                return Some((self.declared_type_id(class_name), Binding::EnumVariant { owner: class_name }));
            }
        }
        None
    }

    fn declared_type_id(&mut self, name: Name) -> TypeId {
        self.result.types.intern(CanonicalType::Declared(name))
    }

    /// # Panics
    /// Never: the `Generic` arm only matches when `args` is non-empty, so
    /// `args.last()` always succeeds.
    #[allow(clippy::unwrap_used)]
    fn element_type_of(&mut self, base_ty: TypeId, span: btrc_ir::Span) -> TypeId {
        match self.result.types.get(base_ty).clone() {
            CanonicalType::Generic(_, args) if !args.is_empty() => *args.last().unwrap(),
            _ => {
                let text = self.result.types.display(base_ty, self.interner);
                self.diagnostics.emit_error(
                    SemaErrorKind::TypeMismatch { expected: "an indexable collection".to_string(), found: text }
                        .into_diagnostic(span),
                );
                self.result.types.error
            }
        }
    }

    fn infer_call(&mut self, callee: &Expr, arg_types: &[TypeId], scope: ScopeId, span: btrc_ir::Span) -> TypeId {
        if let Expr::Ident { name, .. } = callee {
            if let Some(info) = self.result.functions.get(name).cloned() {
                let callee_ty = self.result.types.intern(CanonicalType::Function(info.params.clone(), info.ret));
                self.record_expr(callee, callee_ty, Some(Binding::Function));
                if !self.arity_compatible(info.params.len(), info.param_defaults.len(), arg_types.len()) {
                    let text = self.interner.resolve(*name);
                    self.diagnostics
                        .emit_error(SemaErrorKind::NoMatchingOverload { name: text }.into_diagnostic(span));
                    return self.result.types.error;
                }
                for (arg_ty, param_ty) in arg_types.iter().zip(info.params.iter()) {
                    if !self.result.types.is_structurally_assignable(*arg_ty, *param_ty) {
                        self.mismatch(*param_ty, *arg_ty, span);
                    }
                }
                return info.ret;
            }
        }
        let callee_ty = self.infer_expr(callee, scope);
        match self.result.types.get(callee_ty).clone() {
            CanonicalType::Function(params, ret) => {
                if arg_types.len() != params.len() {
                    self.diagnostics.emit_error(
                        SemaErrorKind::NoMatchingOverload { name: "<lambda>".to_string() }.into_diagnostic(span),
                    );
                    return self.result.types.error;
                }
                for (arg_ty, param_ty) in arg_types.iter().zip(params.iter()) {
                    if !self.result.types.is_structurally_assignable(*arg_ty, *param_ty) {
                        self.mismatch(*param_ty, *arg_ty, span);
                    }
                }
                ret
            }
            CanonicalType::Error => self.result.types.error,
            _ => {
                let text = self.result.types.display(callee_ty, self.interner);
                self.diagnostics.emit_error(
                    SemaErrorKind::TypeMismatch { expected: "a callable".to_string(), found: text }.into_diagnostic(span),
                );
                self.result.types.error
            }
        }
    }

    fn arity_compatible(&self, total_params: usize, defaults: usize, given: usize) -> bool {
        let required = total_params.saturating_sub(defaults);
        given >= required && given <= total_params
    }

    fn check_ctor_call(&mut self, class_ty: TypeId, arg_types: &[TypeId], span: btrc_ir::Span) {
        let Some(class_name) = self.result.types.declared_name(class_ty) else { return };
        let Some(info) = self.result.classes.get(&class_name).cloned() else { return };
        if info.ctors.is_empty() {
            if !arg_types.is_empty() {
                let text = self.interner.resolve(class_name);
                self.diagnostics
                    .emit_error(SemaErrorKind::NoMatchingOverload { name: text }.into_diagnostic(span));
            }
            return;
        }
        let matching = info.ctors.iter().find(|c| {
            self.arity_compatible(c.params.len(), c.param_defaults.len(), arg_types.len())
                && c.params
                    .iter()
                    .zip(arg_types.iter())
                    .all(|(p, a)| self.result.types.is_structurally_assignable(*a, *p))
        });
        if matching.is_none() {
            let text = self.interner.resolve(class_name);
            self.diagnostics.emit_error(SemaErrorKind::NoMatchingOverload { name: text }.into_diagnostic(span));
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, operand_ty: TypeId, span: btrc_ir::Span) -> TypeId {
        if self.result.types.is_error(operand_ty) {
            return self.result.types.error;
        }
        if self.result.types.is_numeric(operand_ty) || matches!(op, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec) {
            return operand_ty;
        }
        if op == UnaryOp::Not && operand_ty == self.result.types.bool_ {
            return operand_ty;
        }
        if let Some(method_name) = op.overload_method_name() {
            if let Some(class_name) = self.result.types.declared_name(operand_ty) {
                if let Some(ret) = self.lookup_method_return(class_name, self.interner.intern(method_name)) {
                    return ret;
                }
            }
            let text = self.result.types.display(operand_ty, self.interner);
            self.diagnostics.emit_error(
                SemaErrorKind::MissingOperatorOverload { op: method_name.to_string(), ty: text }.into_diagnostic(span),
            );
            return self.result.types.error;
        }
        operand_ty
    }

    /// Like [`Self::lookup_member`] but unwraps straight to the method's
    /// return type, for operator-overload resolution where the call is
    /// implicit (spec.md §4.4 "Operator overloading resolution").
    fn lookup_method_return(&mut self, class_name: Name, method_name: Name) -> Option<TypeId> {
        let (ty, binding) = self.lookup_member(class_name, method_name)?;
        if !matches!(binding, Binding::Method { .. } | Binding::StaticMethod { .. }) {
            return None;
        }
        match self.result.types.get(ty) {
            CanonicalType::Function(_, ret) => Some(*ret),
            _ => None,
        }
    }

    pub(crate) fn infer_binary(&mut self, op: BinaryOp, lhs_ty: TypeId, rhs_ty: TypeId, span: btrc_ir::Span) -> TypeId {
        if self.result.types.is_error(lhs_ty) || self.result.types.is_error(rhs_ty) {
            return self.result.types.error;
        }
        match op {
            BinaryOp::And | BinaryOp::Or => return self.result.types.bool_,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if self.result.types.is_numeric(lhs_ty) && self.result.types.is_numeric(rhs_ty) {
                    return self.result.types.bool_;
                }
                if lhs_ty == rhs_ty {
                    return self.result.types.bool_;
                }
            }
            _ => {
                if self.result.types.is_numeric(lhs_ty) && self.result.types.is_numeric(rhs_ty) {
                    return if self.result.types.is_structurally_assignable(lhs_ty, rhs_ty) { rhs_ty } else { lhs_ty };
                }
                if op == BinaryOp::Add && lhs_ty == self.result.types.str_ && rhs_ty == self.result.types.str_ {
                    return self.result.types.str_;
                }
            }
        }
        if let Some(method_name) = op.overload_method_name() {
            if let Some(class_name) = self.result.types.declared_name(lhs_ty) {
                if let Some(ret) = self.lookup_method_return(class_name, self.interner.intern(method_name)) {
                    return ret;
                }
            }
            let text = self.result.types.display(lhs_ty, self.interner);
            self.diagnostics.emit_error(
                SemaErrorKind::MissingOperatorOverload { op: method_name.to_string(), ty: text }.into_diagnostic(span),
            );
            return self.result.types.error;
        }
        self.mismatch(lhs_ty, rhs_ty, span);
        self.result.types.error
    }

    fn infer_lambda(
        &mut self,
        params: &[btrc_ir::ast::Param],
        body: &[Expr],
        is_expr_body: bool,
        scope: ScopeId,
        _span: btrc_ir::Span,
    ) -> TypeId {
        let lambda_scope = self.open_scope(scope, ScopeKind::Function);
        let mut param_tys = Vec::with_capacity(params.len());
        for p in params {
            let ty = self.resolve_type(&p.ty, &[]);
            param_tys.push(ty);
            self.scopes.declare(
                lambda_scope,
                Symbol { name: p.name, kind: SymbolKind::Parameter, ty, scope: lambda_scope, access: None, defining_span: _span },
            );
        }
        let ret = if is_expr_body { self.infer_expr(&body[0], lambda_scope) } else { self.result.types.void };
        self.result.types.intern(CanonicalType::Function(param_tys, ret))
    }

    fn infer_lambda_block(
        &mut self,
        params: &[btrc_ir::ast::Param],
        body: &[btrc_ir::ast::Stmt],
        scope: ScopeId,
        span: btrc_ir::Span,
    ) -> TypeId {
        let lambda_scope = self.open_scope(scope, ScopeKind::Function);
        let mut param_tys = Vec::with_capacity(params.len());
        for p in params {
            let ty = self.resolve_type(&p.ty, &[]);
            param_tys.push(ty);
            self.scopes.declare(
                lambda_scope,
                Symbol { name: p.name, kind: SymbolKind::Parameter, ty, scope: lambda_scope, access: None, defining_span: span },
            );
        }
        self.expected_return.push(self.result.types.void);
        self.check_block(body, lambda_scope);
        let ret = self.expected_return.pop().unwrap_or(self.result.types.void);
        self.result.types.intern(CanonicalType::Function(param_tys, ret))
    }

    fn bind_tuple_pattern(&mut self, bindings: &[Name], value_ty: TypeId, scope: ScopeId, span: btrc_ir::Span) {
        let CanonicalType::Tuple(elements) = self.result.types.get(value_ty).clone() else {
            let text = self.result.types.display(value_ty, self.interner);
            self.diagnostics
                .emit_error(SemaErrorKind::TypeMismatch { expected: "a tuple".to_string(), found: text }.into_diagnostic(span));
            return;
        };
        for (name, ty) in bindings.iter().zip(elements.iter()) {
            self.scopes.declare(
                scope,
                Symbol { name: *name, kind: SymbolKind::Variable, ty: *ty, scope, access: None, defining_span: span },
            );
        }
    }

    pub(crate) fn mismatch(&mut self, expected: TypeId, found: TypeId, span: btrc_ir::Span) {
        if self.result.types.is_structurally_assignable(found, expected) {
            return;
        }
        self.type_mismatch(expected, found, span);
    }

    fn type_mismatch(&mut self, expected: TypeId, found: TypeId, span: btrc_ir::Span) {
        let expected_text = self.result.types.display(expected, self.interner);
        let found_text = self.result.types.display(found, self.interner);
        self.diagnostics
            .emit_error(SemaErrorKind::TypeMismatch { expected: expected_text, found: found_text }.into_diagnostic(span));
    }
}
