//! Monomorphization worklist (spec.md §4.5 "Monomorphization": "each
//! distinct instantiation is lowered exactly once, to a fixed point").
//!
//! Lowering a non-generic declaration can itself discover new generic
//! instantiations (a method body that allocates a `List<T>`, a field typed
//! `Box<U>`), so this drains [`LowerCtx::pending_instances`] in a loop
//! rather than a single pass -- each round may append more work for the
//! next one, the same way the reference toolchain's `ori_canon` drives its
//! own specialization queue to a fixed point.

use btrc_sema::GenericInstance;

use crate::ir;
use crate::lower::{class, collections, function, LowerCtx};

/// Seeds the worklist from every instantiation the Analyzer already saw
/// (spec.md §4.4's pass 2 records `G<args>` at every use site), then drains
/// it -- and whatever lowering those instantiations discovers in turn -- to
/// a fixed point.
#[tracing::instrument(level = "debug", skip_all)]
pub fn run(ctx: &mut LowerCtx, module: &mut ir::Module) {
    for instance in ctx.sema.generic_instances.clone() {
        queue_seen(ctx, instance);
    }
    let mut lowered = 0usize;
    while let Some(instance) = ctx.pending_instances.pop() {
        lower_one(ctx, instance, module);
        lowered += 1;
    }
    tracing::debug!(lowered, "monomorphization reached a fixed point");
}

fn queue_seen(ctx: &mut LowerCtx, instance: GenericInstance) {
    ctx.queue_instance(instance.generic_name, instance.args);
}

fn lower_one(ctx: &mut LowerCtx, instance: GenericInstance, module: &mut ir::Module) {
    if collections::lower_instance(ctx, instance.generic_name, &instance.args, module) {
        return;
    }
    if ctx.class_decls.contains_key(&instance.generic_name) {
        class::lower_instance(ctx, instance.generic_name, &instance.args, module);
        return;
    }
    if let Some(decl) = ctx.function_decls.get(&instance.generic_name).cloned() {
        lower_generic_function_instance(ctx, &decl, &instance.args, module);
    }
}

fn lower_generic_function_instance(
    ctx: &mut LowerCtx,
    decl: &btrc_ir::ast::FunctionDecl,
    args: &[btrc_sema::TypeId],
    module: &mut ir::Module,
) {
    let arg_names: Vec<String> = args.iter().map(|a| ctx.mangled_type_name(*a)).collect();
    let mangled = crate::mangle::generic_instance(&ctx.resolve(decl.name), &arg_names);
    let subst = decl.type_params.iter().map(|p| p.name).zip(args.iter().copied()).collect();
    ctx.push_subst(subst);
    let f = function::lower_instance(ctx, decl, mangled);
    ctx.pop_subst();
    module.functions.push(f);
}
