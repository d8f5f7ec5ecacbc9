//! Free function lowering (spec.md §4.5 "Function lowering").

use btrc_ir::ast::FunctionDecl;

use crate::ir;

use super::{expr, stmt, LowerCtx};

pub fn lower_function(ctx: &mut LowerCtx, decl: &FunctionDecl) -> ir::Function {
    let name = ctx.resolve(decl.name);
    let ret = super::lower_ast_type(ctx, &decl.ret);
    let params = decl
        .params
        .iter()
        .map(|p| ir::Field { name: ctx.resolve(p.name), ty: super::lower_ast_type(ctx, &p.ty) })
        .collect();
    let mut body = stmt::lower_block(ctx, &decl.body);
    expr::append_kept_param_releases(ctx, &decl.params, &mut body);
    // `main` and every other source-level function is a real external
    // symbol the emitted `.c` file's caller (another translation unit, or
    // the CRT for `main`) needs to see -- never static linkage.
    ir::Function { name, ret, params, body: Some(body), is_static_linkage: false }
}

/// Lowers one instantiation of a generic free function (spec.md §4.5
/// "Monomorphization"), under a substitution frame already pushed by the
/// caller.
pub fn lower_instance(ctx: &mut LowerCtx, decl: &FunctionDecl, mangled_name: String) -> ir::Function {
    let ret = super::lower_ast_type(ctx, &decl.ret);
    let params = decl
        .params
        .iter()
        .map(|p| ir::Field { name: ctx.resolve(p.name), ty: super::lower_ast_type(ctx, &p.ty) })
        .collect();
    let mut body = stmt::lower_block(ctx, &decl.body);
    expr::append_kept_param_releases(ctx, &decl.params, &mut body);
    ir::Function { name: mangled_name, ret, params, body: Some(body), is_static_linkage: true }
}
