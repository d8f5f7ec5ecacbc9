//! Statement lowering (spec.md §4.5 "Control flow lowering").
//!
//! `for-in` is the one statement with real work to do: the grammar gives it
//! three distinct iterables (a `a..b` range literal, a `range(a,b,step)`
//! call, or one of the five built-in collections) that all have to become
//! the same index-based C `for` loop. Everything else is close to a
//! one-to-one rewrite into [`ir::Stmt`].

use btrc_ir::ast::{AssignOp, CatchClause, Expr as AstExpr, Stmt as AstStmt, SwitchCase as AstSwitchCase};
use btrc_sema::types::CanonicalType;
use btrc_sema::{Binding, TypeId};

use crate::helpers::HelperCategory;
use crate::ir;
use crate::mangle;

use super::{collections, expr, LowerCtx};

pub fn lower_block(ctx: &mut LowerCtx, body: &[AstStmt]) -> Vec<ir::Stmt> {
    body.iter().map(|s| lower_stmt(ctx, s)).collect()
}

fn lower_stmt(ctx: &mut LowerCtx, stmt: &AstStmt) -> ir::Stmt {
    match stmt {
        AstStmt::VarDecl { name, ty, init, .. } => {
            let init_ir = expr::lower_expr(ctx, init);
            let declared_ty = match ty {
                Some(t) => super::lower_ast_type(ctx, t),
                None => ctx.lower_type(ctx.sema.expr_type(init)),
            };
            ir::Stmt::VarDecl { name: ctx.resolve(*name), ty: declared_ty, init: Some(init_ir) }
        }
        AstStmt::Assign { target, op, value, .. } => lower_assign(ctx, target, *op, value),
        AstStmt::ExprStmt { value, .. } => ir::Stmt::ExprStmt(expr::lower_expr(ctx, value)),
        AstStmt::If { cond, then_body, else_body, .. } => ir::Stmt::If {
            cond: expr::lower_expr(ctx, cond),
            then_body: lower_block(ctx, then_body),
            else_body: lower_block(ctx, else_body),
        },
        AstStmt::CFor { init, cond, step, body, .. } => ir::Stmt::For {
            init: init.as_ref().map(|s| Box::new(lower_stmt(ctx, s))),
            cond: cond.as_ref().map(|c| expr::lower_expr(ctx, c)),
            step: step.as_ref().map(|s| Box::new(lower_stmt(ctx, s))),
            body: lower_block(ctx, body),
        },
        AstStmt::ForIn { binding, iter, body, .. } => lower_for_in(ctx, *binding, iter, body),
        AstStmt::While { cond, body, .. } => {
            ir::Stmt::While { cond: expr::lower_expr(ctx, cond), body: lower_block(ctx, body) }
        }
        AstStmt::DoWhile { body, cond, .. } => lower_do_while(ctx, body, cond),
        AstStmt::Switch { subject, cases, .. } => ir::Stmt::Switch {
            subject: expr::lower_expr(ctx, subject),
            cases: cases.iter().map(|c| lower_case(ctx, c)).collect(),
        },
        AstStmt::Try { body, catches, finally_body, .. } => lower_try(ctx, body, catches, finally_body),
        AstStmt::Throw { value, .. } => lower_throw(ctx, value),
        AstStmt::Return { value, .. } => ir::Stmt::Return(value.as_ref().map(|v| expr::lower_expr(ctx, v))),
        AstStmt::Break { .. } => ir::Stmt::Break,
        AstStmt::Continue { .. } => ir::Stmt::Continue,
        AstStmt::Block { body, .. } => ir::Stmt::Block(lower_block(ctx, body)),
    }
}

/// Compound assignment (`+=`, `&=`, ...) desugars to `target = target OP
/// value`, reusing the same operator-overload resolution as a plain binary
/// expression (spec.md §4.4 "Operator overloading resolution") by building
/// a throwaway `target OP value` and handing it to [`expr::lower_binary`].
///
/// A plain `=` onto a class-typed field additionally gets ARC's "release
/// old, retain new" treatment (spec.md §4.5) via [`lower_field_assign`].
fn lower_assign(ctx: &mut LowerCtx, target: &AstExpr, op: AssignOp, value: &AstExpr) -> ir::Stmt {
    let target_ty = ctx.sema.expr_type(target);
    let target_ir = expr::lower_expr(ctx, target);
    let value_ir = match op.underlying_binary() {
        None => expr::lower_expr(ctx, value),
        Some(bin_op) => expr::lower_binary(ctx, bin_op, target, value),
    };
    let is_field_target = match target {
        AstExpr::Member { .. } => true,
        AstExpr::Ident { .. } => {
            matches!(ctx.sema.expr_binding(target), Some(Binding::Field { .. } | Binding::StaticField { .. }))
        }
        _ => false,
    };
    if op == AssignOp::Assign && is_field_target && expr::is_arc_class(ctx, target_ty) {
        return lower_field_assign(ctx, target_ty, target_ir, value_ir);
    }
    ir::Stmt::Assign { target: target_ir, value: value_ir }
}

/// `field = value` for a class-typed field: the new value is retained and
/// the old one stashed *before* the store so assigning a field to itself
/// (or to an expression that reads the same field) retains before it
/// releases, rather than releasing a value it's about to store right back.
fn lower_field_assign(ctx: &mut LowerCtx, target_ty: TypeId, target_ir: ir::Expr, value_ir: ir::Expr) -> ir::Stmt {
    let old_tmp = ctx.fresh_temp();
    let field_ty = ctx.lower_type(target_ty);
    let old_decl = ir::Stmt::VarDecl { name: old_tmp.clone(), ty: field_ty, init: Some(target_ir.clone()) };
    let store = ir::Stmt::Assign { target: target_ir.clone(), value: value_ir };
    let retain_new = ir::Stmt::ExprStmt(expr::retain_call(ctx, target_ir));
    let release_old = ir::Stmt::ExprStmt(expr::release_call(ctx, target_ty, ir::Expr::var(old_tmp)));
    ir::Stmt::Block(vec![old_decl, store, retain_new, release_old])
}

fn lower_case(ctx: &mut LowerCtx, case: &AstSwitchCase) -> ir::SwitchCase {
    ir::SwitchCase {
        labels: case.labels.iter().map(|l| expr::lower_expr(ctx, l)).collect(),
        body: lower_block(ctx, &case.body),
        is_default: case.is_default,
    }
}

/// `do { body } while (cond);` has no IR counterpart (spec.md §3's `IRFor`/
/// `IRWhile` are both test-before-body), so the simplest legal rendering
/// runs the body once unconditionally, then `while (cond) { body }`.
fn lower_do_while(ctx: &mut LowerCtx, body: &[AstStmt], cond: &AstExpr) -> ir::Stmt {
    let first_pass = lower_block(ctx, body);
    let cond_ir = expr::lower_expr(ctx, cond);
    let loop_body = lower_block(ctx, body);
    ir::Stmt::Block(vec![ir::Stmt::Block(first_pass), ir::Stmt::While { cond: cond_ir, body: loop_body }])
}

fn is_range_call(ctx: &LowerCtx, callee: &AstExpr) -> bool {
    matches!(callee, AstExpr::Ident { name, .. } if ctx.resolve(*name) == "range")
}

fn lower_for_in(ctx: &mut LowerCtx, binding: btrc_ir::Name, iter: &AstExpr, body: &[AstStmt]) -> ir::Stmt {
    match iter {
        AstExpr::Range { start, stop, step, .. } => lower_for_in_range(ctx, binding, start, stop, step.as_deref(), body),
        AstExpr::Call { callee, args, .. } if is_range_call(ctx, callee) => {
            lower_for_in_range(ctx, binding, &args[0], &args[1], args.get(2), body)
        }
        _ => lower_for_in_collection(ctx, binding, iter, body),
    }
}

/// `for x in a..b` / `for x in range(a, b, step)` lower to a plain C
/// counted loop -- no collection is ever materialized.
fn lower_for_in_range(
    ctx: &mut LowerCtx,
    binding: btrc_ir::Name,
    start: &AstExpr,
    stop: &AstExpr,
    step: Option<&AstExpr>,
    body: &[AstStmt],
) -> ir::Stmt {
    let name = ctx.resolve(binding);
    let start_ir = expr::lower_expr(ctx, start);
    let stop_ir = expr::lower_expr(ctx, stop);
    let init = ir::Stmt::VarDecl { name: name.clone(), ty: ir::Type::Int, init: Some(start_ir) };
    let cond = ir::Expr::Binary { op: "<", lhs: Box::new(ir::Expr::var(name.clone())), rhs: Box::new(stop_ir) };
    let step_stmt = match step {
        Some(step_expr) => {
            let step_ir = expr::lower_expr(ctx, step_expr);
            ir::Stmt::Assign {
                target: ir::Expr::var(name.clone()),
                value: ir::Expr::Binary { op: "+", lhs: Box::new(ir::Expr::var(name.clone())), rhs: Box::new(step_ir) },
            }
        }
        None => ir::Stmt::ExprStmt(ir::Expr::Unary { op: "++", prefix: false, operand: Box::new(ir::Expr::var(name.clone())) }),
    };
    ir::Stmt::For { init: Some(Box::new(init)), cond: Some(cond), step: Some(Box::new(step_stmt)), body: lower_block(ctx, body) }
}

/// `for x in collection` iterates a built-in `Vector`/`List`/`Array`/`Map`/
/// `Set` by index, reading `.length` directly rather than through a `_len`
/// call the generic method-call fallback would otherwise invent (every
/// built-in container names its element-count field `length`; see
/// `collections.rs`).
fn lower_for_in_collection(ctx: &mut LowerCtx, binding: btrc_ir::Name, iter: &AstExpr, body: &[AstStmt]) -> ir::Stmt {
    let iter_ty = ctx.sema.expr_type(iter);
    let elem_ty = for_in_element_type(ctx, iter_ty);
    let elem_c_ty = ctx.lower_type(elem_ty);
    let iter_c_ty = ctx.lower_type(iter_ty);
    let collection_name = declared_generic_name(ctx, iter_ty);
    let mangled = ctx.mangled_type_name(iter_ty);
    let iter_ir = expr::lower_expr(ctx, iter);

    let iter_tmp = ctx.fresh_temp();
    let index_tmp = ctx.fresh_temp();
    let binding_name = ctx.resolve(binding);

    let bound = ir::Expr::arrow(ir::Expr::var(iter_tmp.clone()), "length");
    let access = collection_name
        .and_then(|name| collections::for_in_access(ctx, name, &mangled, ir::Expr::var(iter_tmp.clone()), ir::Expr::var(index_tmp.clone())))
        .unwrap_or_else(|| ir::Expr::Index { base: Box::new(ir::Expr::var(iter_tmp.clone())), index: Box::new(ir::Expr::var(index_tmp.clone())) });

    let mut inner_body = vec![ir::Stmt::VarDecl { name: binding_name, ty: elem_c_ty, init: Some(access) }];
    inner_body.extend(lower_block(ctx, body));

    ir::Stmt::Block(vec![
        ir::Stmt::VarDecl { name: iter_tmp, ty: iter_c_ty, init: Some(iter_ir) },
        ir::Stmt::For {
            init: Some(Box::new(ir::Stmt::VarDecl { name: index_tmp.clone(), ty: ir::Type::Int, init: Some(ir::Expr::IntLit(0)) })),
            cond: Some(ir::Expr::Binary { op: "<", lhs: Box::new(ir::Expr::var(index_tmp.clone())), rhs: Box::new(bound) }),
            step: Some(Box::new(ir::Stmt::ExprStmt(ir::Expr::Unary {
                op: "++",
                prefix: false,
                operand: Box::new(ir::Expr::var(index_tmp)),
            }))),
            body: inner_body,
        },
    ])
}

/// Mirrors the private `Analyzer::for_in_element_type` in `btrc_sema::stmt`
/// (not reusable directly -- it takes `&mut Analyzer`, not a `SemaResult`).
/// By the time lowering runs, analysis has already rejected anything that
/// isn't one of these shapes, so there's no error case left to handle here.
///
/// # Panics
/// Never, in practice: sema rejects a `for (x in v)` whose `v` isn't a
/// non-empty generic before this runs, so the `args.last()` above it always
/// has an element.
#[allow(clippy::unwrap_used)]
fn for_in_element_type(ctx: &LowerCtx, iter_ty: TypeId) -> TypeId {
    match ctx.sema.types.get(iter_ty).clone() {
        CanonicalType::Generic(_, args) if !args.is_empty() => *args.last().unwrap(),
        _ => iter_ty,
    }
}

fn declared_generic_name(ctx: &LowerCtx, ty: TypeId) -> Option<btrc_ir::Name> {
    match ctx.sema.types.get(ty) {
        CanonicalType::Generic(name, _) => Some(*name),
        _ => None,
    }
}

/// `try`/`catch`/`finally` lowers to a `setjmp`/`longjmp` frame pushed onto
/// a thread of frames (spec.md §4.5 "control flow lowering": the reserved
/// `Stmt::RawC` node exists for exactly this). The frame push/pop and the
/// `setjmp` branch are emitted as paired opaque fragments bracketing
/// ordinary structured IR for the try body and each catch; `finally` always
/// runs, and a pending exception that matched no catch re-throws once
/// `finally` completes (spec.md: "finally runs in all cases; an unhandled
/// exception re-throws after it").
fn lower_try(ctx: &mut LowerCtx, body: &[AstStmt], catches: &[CatchClause], finally_body: &[AstStmt]) -> ir::Stmt {
    ctx.register_helper(HelperCategory::ExceptionUnwind);
    let frame_tmp = ctx.fresh_temp();
    let unhandled_tmp = ctx.fresh_temp();
    let try_body = lower_block(ctx, body);

    let mut chain = ir::Stmt::Block(Vec::new());
    for catch in catches.iter().rev() {
        let mut then_body = Vec::new();
        if let Some(decl) = bind_catch(ctx, catch.binding, catch.ty.as_ref()) {
            then_body.push(decl);
        }
        then_body.push(ir::Stmt::Assign { target: ir::Expr::var(unhandled_tmp.clone()), value: ir::Expr::BoolLit(false) });
        then_body.extend(lower_block(ctx, &catch.body));
        match &catch.ty {
            Some(ty) => {
                let type_name = super::ast_type_mangle_name(ctx, ty);
                let cond = ir::Expr::Binary {
                    op: "==",
                    lhs: Box::new(ir::Expr::call(
                        ir::Expr::var("strcmp"),
                        vec![ir::Expr::var("__btrc_exc_type"), ir::Expr::StringLit(type_name)],
                    )),
                    rhs: Box::new(ir::Expr::IntLit(0)),
                };
                chain = ir::Stmt::If { cond, then_body, else_body: vec![chain] };
            }
            None => {
                // A catch-all always handles, making any catch listed after
                // it unreachable -- same as a source-level `switch` default.
                chain = ir::Stmt::Block(then_body);
            }
        }
    }

    let mut stmts = vec![
        ir::Stmt::VarDecl { name: unhandled_tmp.clone(), ty: ir::Type::Bool, init: Some(ir::Expr::BoolLit(false)) },
        ir::Stmt::VarDecl { name: frame_tmp.clone(), ty: ir::Type::Struct("__btrc_exc_frame".to_string()), init: None },
        ir::Stmt::RawC(format!("__btrc_exc_push(&{frame_tmp}); if (setjmp({frame_tmp}.buf) == 0) {{")),
        ir::Stmt::Block(try_body),
        ir::Stmt::RawC("__btrc_exc_pop();".to_string()),
        ir::Stmt::RawC("} else {".to_string()),
        ir::Stmt::Assign { target: ir::Expr::var(unhandled_tmp.clone()), value: ir::Expr::BoolLit(true) },
        chain,
        ir::Stmt::RawC("}".to_string()),
    ];
    stmts.extend(lower_block(ctx, finally_body));
    stmts.push(ir::Stmt::If {
        cond: ir::Expr::var(unhandled_tmp),
        then_body: vec![ir::Stmt::ExprStmt(ir::Expr::call(
            ir::Expr::var("__btrc_exc_throw"),
            vec![ir::Expr::var("__btrc_exc_type"), ir::Expr::var("__btrc_exc_value")],
        ))],
        else_body: Vec::new(),
    });
    ir::Stmt::Block(stmts)
}

/// Binds a caught exception's payload back to its declared type. Scalars
/// were heap-boxed by `lower_throw` so the generic `void*` exception slot
/// always carries a pointer; pointer-shaped payloads (strings, class
/// instances) are already stored directly and just need the cast.
fn bind_catch(ctx: &mut LowerCtx, binding: Option<btrc_ir::Name>, ty: Option<&btrc_ir::types::Type>) -> Option<ir::Stmt> {
    let binding = binding?;
    let var_name = ctx.resolve(binding);
    let Some(t) = ty else {
        let init = ir::Expr::Cast { ty: ir::Type::CString, operand: Box::new(ir::Expr::var("__btrc_exc_value")) };
        return Some(ir::Stmt::VarDecl { name: var_name, ty: ir::Type::CString, init: Some(init) });
    };
    let c_ty = super::lower_ast_type(ctx, t);
    let init = match &c_ty {
        // Pointer-shaped payloads (strings, class instances) are already
        // stored directly in the exception slot; everything else was
        // heap-boxed by `lower_throw` and needs unboxing.
        ir::Type::CString | ir::Type::Pointer(_) => {
            ir::Expr::Cast { ty: c_ty.clone(), operand: Box::new(ir::Expr::var("__btrc_exc_value")) }
        }
        _ => ir::Expr::Deref(Box::new(ir::Expr::Cast {
            ty: c_ty.clone().ptr(),
            operand: Box::new(ir::Expr::var("__btrc_exc_value")),
        })),
    };
    Some(ir::Stmt::VarDecl { name: var_name, ty: c_ty, init: Some(init) })
}

/// `throw expr;` lowers to `__btrc_exc_throw(type_name, payload)` (spec.md
/// §4.5 "control flow lowering"). Pointer-shaped payloads (strings, class
/// instances) are passed through directly; everything else is heap-boxed
/// first since the shared exception slot is a single `void*` with no type
/// of its own to specialize per throw site.
fn lower_throw(ctx: &mut LowerCtx, value: &AstExpr) -> ir::Stmt {
    ctx.register_helper(HelperCategory::ExceptionUnwind);
    let value_ty = ctx.sema.expr_type(value);
    let c_ty = ctx.lower_type(value_ty);
    let type_name = ctx.mangled_type_name(value_ty);
    let value_ir = expr::lower_expr(ctx, value);

    let (mut stmts, payload) = match &c_ty {
        ir::Type::CString | ir::Type::Pointer(_) => {
            (Vec::new(), ir::Expr::Cast { ty: ir::Type::Void.ptr(), operand: Box::new(value_ir) })
        }
        _ => {
            ctx.register_helper(HelperCategory::Arc);
            let box_tmp = ctx.fresh_temp();
            let decl = ir::Stmt::VarDecl {
                name: box_tmp.clone(),
                ty: c_ty.clone().ptr(),
                init: Some(ir::Expr::Cast {
                    ty: c_ty.clone().ptr(),
                    operand: Box::new(ir::Expr::call(ir::Expr::var(mangle::helper("alloc")), vec![ir::Expr::Sizeof(c_ty.clone())])),
                }),
            };
            let assign = ir::Stmt::Assign {
                target: ir::Expr::Deref(Box::new(ir::Expr::var(box_tmp.clone()))),
                value: value_ir,
            };
            (vec![decl, assign], ir::Expr::Cast { ty: ir::Type::Void.ptr(), operand: Box::new(ir::Expr::var(box_tmp)) })
        }
    };
    stmts.push(ir::Stmt::ExprStmt(ir::Expr::call(
        ir::Expr::var("__btrc_exc_throw"),
        vec![ir::Expr::StringLit(type_name), payload],
    )));
    ir::Stmt::Block(stmts)
}
