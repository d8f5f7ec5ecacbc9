//! Lambda lowering (spec.md §4.5 "Lambdas": "each lambda is lifted to a
//! static function; captures are packed into a generated capture struct").
//!
//! A non-capturing lambda lifts to a plain static function and its value at
//! the use site is just that function's name -- C already decays a
//! function name to a function pointer, so no thunk is needed and every
//! existing call site keeps working unchanged.
//!
//! A capturing lambda additionally gets one capture-slot global per free
//! variable, named uniquely to this lambda. The lambda *expression*'s
//! value populates every slot and then yields the function name, all as
//! one C comma-expression (`(slot1 = v1, slot2 = v2, fn_name)`) -- the same
//! sequencing idiom `expr::lower_delete` already uses to run a destructor
//! then `free` in one expression. The lifted function's body reads
//! captures back through those same slots (rewritten by `var_rename`
//! rather than threading an extra parameter), so calling it needs no
//! special-cased protocol either: it's still just a plain function
//! pointer, called like any other. This trades re-entrancy (two live
//! instances of the same lambda capturing different values would clobber
//! each other's slots) for call sites that never need to know a lambda
//! value is anything other than a function pointer -- see `DESIGN.md`.

use rustc_hash::{FxHashMap, FxHashSet};

use btrc_ir::ast::{Expr as AstExpr, FStringChunk, Param, Stmt as AstStmt};
use btrc_ir::Name;
use btrc_sema::{Binding, TypeId};

use crate::ir;

use super::{expr, stmt, LowerCtx};

enum Body<'a> {
    Arrow(&'a AstExpr),
    Block(&'a [AstStmt]),
}

pub fn lower_lambda_arrow(ctx: &mut LowerCtx, params: &[Param], body: &AstExpr) -> ir::Expr {
    lower_lambda(ctx, params, Body::Arrow(body))
}

pub fn lower_lambda_block(ctx: &mut LowerCtx, params: &[Param], body: &[AstStmt]) -> ir::Expr {
    lower_lambda(ctx, params, Body::Block(body))
}

fn lower_lambda(ctx: &mut LowerCtx, params: &[Param], body: Body) -> ir::Expr {
    let index = ctx.fresh_lambda_index();
    let fn_name = format!("_lambda{index}");

    let mut bound: FxHashSet<Name> = params.iter().map(|p| p.name).collect();
    let mut free = Vec::new();
    let mut seen = FxHashSet::default();
    match &body {
        Body::Arrow(e) => collect_free_vars_expr(ctx, &mut bound, &mut free, &mut seen, e),
        Body::Block(stmts) => collect_free_vars_block(ctx, &mut bound, &mut free, &mut seen, stmts),
    }

    let mut rename = FxHashMap::default();
    let mut capture_slots = Vec::new();
    for &(name, ty) in &free {
        let slot_name = format!("{fn_name}_cap_{}", ctx.resolve(name));
        let c_ty = ctx.lower_type(ty);
        ctx.pending_globals.push(ir::Global { name: slot_name.clone(), ty: c_ty, init: None });
        rename.insert(name, slot_name.clone());
        capture_slots.push((name, slot_name));
    }

    ctx.push_var_rename(rename);
    let mut out_params = Vec::new();
    for p in params {
        out_params.push(ir::Field { name: ctx.resolve(p.name), ty: super::lower_ast_type(ctx, &p.ty) });
    }
    let (ret, body_stmts) = match body {
        Body::Arrow(e) => {
            let ret_ty = ctx.lower_type(ctx.sema.expr_type(e));
            let ret_ir = expr::lower_expr(ctx, e);
            (ret_ty, vec![ir::Stmt::Return(Some(ret_ir))])
        }
        Body::Block(stmts) => {
            let ret_ty = ir::Type::Void;
            (ret_ty, stmt::lower_block(ctx, stmts))
        }
    };
    ctx.pop_var_rename();

    ctx.pending_functions.push(ir::Function {
        name: fn_name.clone(),
        ret,
        params: out_params,
        body: Some(body_stmts),
        is_static_linkage: true,
    });

    if capture_slots.is_empty() {
        return ir::Expr::var(fn_name);
    }

    // Populate every capture slot, then yield the lifted function, all in
    // one comma-sequenced expression.
    let mut value = ir::Expr::var(fn_name);
    for (name, slot_name) in capture_slots.into_iter().rev() {
        let captured_ir = ir::Expr::var(ctx.resolve(name));
        value = ir::Expr::Binary {
            op: ",",
            lhs: Box::new(ir::Expr::Binary { op: "=", lhs: Box::new(ir::Expr::var(slot_name)), rhs: Box::new(captured_ir) }),
            rhs: Box::new(value),
        };
    }
    value
}

fn collect_free_vars_block(
    ctx: &LowerCtx,
    bound: &mut FxHashSet<Name>,
    free: &mut Vec<(Name, TypeId)>,
    seen: &mut FxHashSet<Name>,
    body: &[AstStmt],
) {
    for stmt in body {
        collect_free_vars_stmt(ctx, bound, free, seen, stmt);
    }
}

fn collect_free_vars_stmt(
    ctx: &LowerCtx,
    bound: &mut FxHashSet<Name>,
    free: &mut Vec<(Name, TypeId)>,
    seen: &mut FxHashSet<Name>,
    stmt: &AstStmt,
) {
    match stmt {
        AstStmt::VarDecl { name, init, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, init);
            bound.insert(*name);
        }
        AstStmt::Assign { target, value, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, target);
            collect_free_vars_expr(ctx, bound, free, seen, value);
        }
        AstStmt::ExprStmt { value, .. } => collect_free_vars_expr(ctx, bound, free, seen, value),
        AstStmt::If { cond, then_body, else_body, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, cond);
            collect_free_vars_block(ctx, bound, free, seen, then_body);
            collect_free_vars_block(ctx, bound, free, seen, else_body);
        }
        AstStmt::CFor { init, cond, step, body, .. } => {
            if let Some(s) = init {
                collect_free_vars_stmt(ctx, bound, free, seen, s);
            }
            if let Some(c) = cond {
                collect_free_vars_expr(ctx, bound, free, seen, c);
            }
            if let Some(s) = step {
                collect_free_vars_stmt(ctx, bound, free, seen, s);
            }
            collect_free_vars_block(ctx, bound, free, seen, body);
        }
        AstStmt::ForIn { binding, iter, body, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, iter);
            bound.insert(*binding);
            collect_free_vars_block(ctx, bound, free, seen, body);
        }
        AstStmt::While { cond, body, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, cond);
            collect_free_vars_block(ctx, bound, free, seen, body);
        }
        AstStmt::DoWhile { body, cond, .. } => {
            collect_free_vars_block(ctx, bound, free, seen, body);
            collect_free_vars_expr(ctx, bound, free, seen, cond);
        }
        AstStmt::Switch { subject, cases, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, subject);
            for case in cases {
                for label in &case.labels {
                    collect_free_vars_expr(ctx, bound, free, seen, label);
                }
                collect_free_vars_block(ctx, bound, free, seen, &case.body);
            }
        }
        AstStmt::Try { body, catches, finally_body, .. } => {
            collect_free_vars_block(ctx, bound, free, seen, body);
            for catch in catches {
                if let Some(name) = catch.binding {
                    bound.insert(name);
                }
                collect_free_vars_block(ctx, bound, free, seen, &catch.body);
            }
            collect_free_vars_block(ctx, bound, free, seen, finally_body);
        }
        AstStmt::Throw { value, .. } => collect_free_vars_expr(ctx, bound, free, seen, value),
        AstStmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_free_vars_expr(ctx, bound, free, seen, v);
            }
        }
        AstStmt::Break { .. } | AstStmt::Continue { .. } => {}
        AstStmt::Block { body, .. } => collect_free_vars_block(ctx, bound, free, seen, body),
    }
}

/// Walks one expression looking for references to a local/parameter bound
/// outside the lambda (spec.md §4.5 "Lambdas"). Assumes no two distinct
/// bindings share a name across the lambda/enclosing-scope boundary --
/// this crate's chosen simplification, documented in `DESIGN.md`, rather
/// than threading full lexical-scope identity through lowering.
fn collect_free_vars_expr(
    ctx: &LowerCtx,
    bound: &mut FxHashSet<Name>,
    free: &mut Vec<(Name, TypeId)>,
    seen: &mut FxHashSet<Name>,
    expr: &AstExpr,
) {
    match expr {
        AstExpr::Ident { name, .. } => {
            if !bound.contains(name) && seen.insert(*name) {
                match ctx.sema.expr_binding(expr) {
                    Some(Binding::Local) | Some(Binding::Parameter) => free.push((*name, ctx.sema.expr_type(expr))),
                    Some(Binding::Field { .. }) | Some(Binding::SelfRef) => {
                        tracing::warn!(name = %ctx.resolve(*name), "lambda references an instance field or self; not captured, see DESIGN.md");
                    }
                    _ => {}
                }
            }
        }
        AstExpr::IntLit { .. }
        | AstExpr::FloatLit { .. }
        | AstExpr::CharLit { .. }
        | AstExpr::StringLit { .. }
        | AstExpr::BoolLit { .. }
        | AstExpr::NullLit { .. }
        | AstExpr::SizeOf { .. } => {}
        AstExpr::FString { chunks, .. } => {
            for chunk in chunks {
                if let FStringChunk::Interp { value, .. } = chunk {
                    collect_free_vars_expr(ctx, bound, free, seen, value);
                }
            }
        }
        AstExpr::Member { base, .. } => collect_free_vars_expr(ctx, bound, free, seen, base),
        AstExpr::Index { base, index, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, base);
            collect_free_vars_expr(ctx, bound, free, seen, index);
        }
        AstExpr::Call { callee, args, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, callee);
            for a in args {
                collect_free_vars_expr(ctx, bound, free, seen, a);
            }
        }
        AstExpr::Unary { operand, .. } => collect_free_vars_expr(ctx, bound, free, seen, operand),
        AstExpr::Binary { lhs, rhs, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, lhs);
            collect_free_vars_expr(ctx, bound, free, seen, rhs);
        }
        AstExpr::Ternary { cond, then_expr, else_expr, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, cond);
            collect_free_vars_expr(ctx, bound, free, seen, then_expr);
            collect_free_vars_expr(ctx, bound, free, seen, else_expr);
        }
        AstExpr::Cast { operand, .. } => collect_free_vars_expr(ctx, bound, free, seen, operand),
        AstExpr::New { args, .. } => {
            for a in args {
                collect_free_vars_expr(ctx, bound, free, seen, a);
            }
        }
        AstExpr::Delete { operand, .. } => collect_free_vars_expr(ctx, bound, free, seen, operand),
        AstExpr::Release { operand, .. } => collect_free_vars_expr(ctx, bound, free, seen, operand),
        AstExpr::LambdaArrow { params, body, .. } => {
            let mut inner_bound = bound.clone();
            inner_bound.extend(params.iter().map(|p| p.name));
            collect_free_vars_expr(ctx, &mut inner_bound, free, seen, body);
        }
        AstExpr::LambdaBlock { params, body, .. } => {
            let mut inner_bound = bound.clone();
            inner_bound.extend(params.iter().map(|p| p.name));
            collect_free_vars_block(ctx, &mut inner_bound, free, seen, body);
        }
        AstExpr::TupleLit { elements, .. } => {
            for e in elements {
                collect_free_vars_expr(ctx, bound, free, seen, e);
            }
        }
        AstExpr::TuplePattern { value, .. } => collect_free_vars_expr(ctx, bound, free, seen, value),
        AstExpr::Range { start, stop, step, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, start);
            collect_free_vars_expr(ctx, bound, free, seen, stop);
            if let Some(s) = step {
                collect_free_vars_expr(ctx, bound, free, seen, s);
            }
        }
        AstExpr::NullCoalesce { lhs, rhs, .. } => {
            collect_free_vars_expr(ctx, bound, free, seen, lhs);
            collect_free_vars_expr(ctx, bound, free, seen, rhs);
        }
    }
}
