//! Class lowering (spec.md §4.5 "Class lowering", "Vtable construction").
//!
//! A class becomes one C `struct` (inherited fields prepended, then own
//! fields, with a `vtable` pointer field first when the class has any
//! virtual dispatch), one `_VTable` struct and statically-initialized
//! instance when it does, and one C function per constructor/destructor/
//! method. Generic classes are never lowered here directly -- `lower_class`
//! is a no-op for them, and [`lower_instance`] is driven instead by
//! [`crate::monomorphize::run`] once a concrete instantiation is known.

use rustc_hash::FxHashMap;

use btrc_ir::ast::{ClassDecl, Member};
use btrc_ir::Name;
use btrc_sema::{ClassInfo, TypeId};

use crate::helpers::HelperCategory;
use crate::ir;
use crate::mangle;

use super::{stmt, LowerCtx};

/// # Panics
/// Panics if `decl` has no matching entry in `ctx.sema.classes` -- sema
/// registers every declared class before irgen runs, so a miss means the two
/// phases have desynced on the program's class set.
#[allow(clippy::expect_used)]
pub fn lower_class(ctx: &mut LowerCtx, decl: &ClassDecl, module: &mut ir::Module) {
    if !decl.type_params.is_empty() {
        return;
    }
    let info = ctx.sema.classes.get(&decl.name).expect("class registered by sema").clone();
    lower_body(ctx, decl, &info, ctx.resolve(decl.name), module);
}

/// Lowers one concrete instantiation `name<args>` of a generic class,
/// substituting `args` for the class's own type parameters throughout.
///
/// # Panics
/// Panics if `name` has no sema-registered `ClassInfo` -- monomorphization
/// only ever instantiates classes sema already resolved.
#[allow(clippy::expect_used)]
pub fn lower_instance(ctx: &mut LowerCtx, name: Name, args: &[TypeId], module: &mut ir::Module) {
    let Some(decl) = ctx.class_decls.get(&name).cloned() else { return };
    let info = ctx.sema.classes.get(&name).expect("generic class registered by sema").clone();
    let arg_names: Vec<String> = args.iter().map(|a| ctx.mangled_type_name(*a)).collect();
    let mangled = mangle::generic_instance(&ctx.resolve(name), &arg_names);
    let subst: FxHashMap<Name, TypeId> = info.type_params.iter().copied().zip(args.iter().copied()).collect();
    ctx.push_subst(subst);
    lower_body(ctx, &decl, &info, mangled, module);
    ctx.pop_subst();
}

fn lower_body(ctx: &mut LowerCtx, decl: &ClassDecl, info: &ClassInfo, mangled_name: String, module: &mut ir::Module) {
    let has_vtable = !info.vtable.is_empty();
    // `__rc` is unconditionally the first field of every class struct
    // (spec.md §4.5 "Every heap-allocated class instance has a field
    // `__rc`") so the generic `__btrc_retain`/`__btrc_release` pair can
    // read/write it through a bare `void*` without per-class codegen.
    let mut fields = vec![ir::Field { name: "__rc".to_string(), ty: ir::Type::Int }];
    if has_vtable {
        fields.push(ir::Field { name: "vtable".to_string(), ty: ir::Type::Struct(mangle::vtable_type(&mangled_name)).ptr() });
    }
    collect_inherited_fields(ctx, info.superclass, &mut fields);
    let mut class_fields = Vec::new();
    for field in &info.fields {
        if field.is_static {
            continue;
        }
        let ty = ctx.lower_type(field.ty);
        class_fields.push((ctx.resolve(field.name), ty.clone(), field.ty));
        fields.push(ir::Field { name: ctx.resolve(field.name), ty });
    }
    module.structs.push(ir::Struct { name: mangled_name.clone(), fields });

    if has_vtable {
        lower_vtable(ctx, decl.name, info, &mangled_name, module);
    }

    let mut ctor_index = 0u32;
    for member in &decl.members {
        if let Member::Ctor { params, body, .. } = member {
            lower_ctor(ctx, &mangled_name, has_vtable, params, body, ctor_index, module);
            ctor_index += 1;
        } else {
            lower_member(ctx, decl.name, &mangled_name, member, module);
        }
    }
    if ctor_index == 0 {
        lower_ctor(ctx, &mangled_name, has_vtable, &[], &[], 0, module);
    }

    lower_destroy(ctx, info, &mangled_name, &class_fields, module);
    if info.is_cycle_capable {
        lower_trace(ctx, &mangled_name, &class_fields, module);
    }
}

/// The ARC teardown wrapper every class gets (spec.md §4.5 "`delete` ...
/// call `T_destroy` ... when [the refcount] reaches zero"): runs the user
/// destructor body, if any, releases every class-typed field it owns (the
/// other half of "release old, retain new" -- the retain happened at the
/// assignment that put the value there), then frees the object. This is
/// what `__btrc_release`/`__btrc_release_cyclable` call back into, cast to
/// `void (*)(void*)` at the call site (see `lower::expr::lower_release`).
fn lower_destroy(
    ctx: &mut LowerCtx,
    info: &ClassInfo,
    mangled_name: &str,
    class_fields: &[(String, ir::Type, TypeId)],
    module: &mut ir::Module,
) {
    let self_ty = ir::Type::Struct(mangled_name.to_string()).ptr();
    let mut body = Vec::new();
    if info.has_dtor {
        body.push(ir::Stmt::ExprStmt(ir::Expr::call(ir::Expr::var(mangle::dtor(mangled_name)), vec![ir::Expr::var("self")])));
    }
    for (name, ty, field_type_id) in class_fields {
        if matches!(ty, ir::Type::Pointer(inner) if matches!(inner.as_ref(), ir::Type::Struct(_))) && super::expr::is_arc_class(ctx, *field_type_id) {
            let field_ir = ir::Expr::arrow(ir::Expr::var("self"), name.clone());
            body.push(ir::Stmt::ExprStmt(super::expr::release_call(ctx, *field_type_id, field_ir)));
        }
    }
    body.push(ir::Stmt::ExprStmt(ir::Expr::call(ir::Expr::var("free"), vec![ir::Expr::var("self")])));
    module.functions.push(ir::Function {
        name: mangle::destroy(mangled_name),
        ret: ir::Type::Void,
        params: vec![ir::Field { name: "self".to_string(), ty: self_ty }],
        body: Some(body),
        is_static_linkage: true,
    });
}

/// The field-tracing function ARC cycle collection walks (spec.md §4.8
/// "ARC cycle collection"): calls `visit` on every class-typed field so the
/// trial-deletion collector can decrement (and re-increment) an object's
/// children without knowing the class's layout.
fn lower_trace(ctx: &mut LowerCtx, mangled_name: &str, class_fields: &[(String, ir::Type, TypeId)], module: &mut ir::Module) {
    let self_ty = ir::Type::Struct(mangled_name.to_string()).ptr();
    let visit_fn_ty = ir::Type::FunctionPointer(vec![ir::Type::Void.ptr()], Box::new(ir::Type::Void));
    let mut body = Vec::new();
    for (name, ty, _) in class_fields {
        if matches!(ty, ir::Type::Pointer(inner) if matches!(inner.as_ref(), ir::Type::Struct(_))) {
            body.push(ir::Stmt::ExprStmt(ir::Expr::call(
                ir::Expr::var("visit"),
                vec![ir::Expr::arrow(ir::Expr::var("self"), name.clone())],
            )));
        }
    }
    let _ = ctx;
    module.functions.push(ir::Function {
        name: mangle::trace(mangled_name),
        ret: ir::Type::Void,
        params: vec![
            ir::Field { name: "self".to_string(), ty: self_ty },
            ir::Field { name: "visit".to_string(), ty: visit_fn_ty },
        ],
        body: Some(body),
        is_static_linkage: true,
    });
}

/// Lowers one constructor to both its `_new` initializer function and an
/// accompanying `_create` factory that allocates, initializes the vtable
/// pointer, and runs the initializer -- so a source-level `new X(args)`
/// lowers to one call expression (spec.md §4.5 "new/delete lowering").
/// Overloaded constructors are disambiguated by a numeric suffix, the
/// first keeping the plain name.
fn lower_ctor(
    ctx: &mut LowerCtx,
    mangled_name: &str,
    has_vtable: bool,
    params: &[btrc_ir::ast::Param],
    body: &[btrc_ir::ast::Stmt],
    index: u32,
    module: &mut ir::Module,
) {
    let suffix = if index == 0 { String::new() } else { format!("_{index}") };
    let self_ty = ir::Type::Struct(mangled_name.to_string()).ptr();
    let ctor_name = format!("{}{suffix}", mangle::ctor(mangled_name));
    let func = lower_function_like(ctx, ctor_name.clone(), None, params, body, Some(self_ty.clone()));
    module.functions.push(func);

    let create_name = format!("{mangled_name}_create{suffix}");
    let mut create_params = Vec::new();
    let mut ctor_args = vec![ir::Expr::var("self")];
    for p in params {
        let field_name = ctx.resolve(p.name);
        create_params.push(ir::Field { name: field_name.clone(), ty: super::lower_ast_type(ctx, &p.ty) });
        ctor_args.push(ir::Expr::var(field_name));
    }
    ctx.register_helper(HelperCategory::Arc);
    let mut body = vec![
        ir::Stmt::VarDecl {
            name: "self".to_string(),
            ty: self_ty.clone(),
            init: Some(ir::Expr::Cast {
                ty: self_ty.clone(),
                operand: Box::new(ir::Expr::call(
                    ir::Expr::var(mangle::helper("alloc")),
                    vec![ir::Expr::Sizeof(ir::Type::Struct(mangled_name.to_string()))],
                )),
            }),
        },
    ];
    // spec.md §4.5 "new / delete": "allocates, zeroes, calls `_init`" --
    // every class-typed field starts NULL so a destroy-time release of a
    // field the constructor never touched is a safe no-op.
    body.push(ir::Stmt::ExprStmt(ir::Expr::call(
        ir::Expr::var("memset"),
        vec![ir::Expr::var("self"), ir::Expr::IntLit(0), ir::Expr::Sizeof(ir::Type::Struct(mangled_name.to_string()))],
    )));
    body.push(ir::Stmt::Assign { target: ir::Expr::arrow(ir::Expr::var("self"), "__rc"), value: ir::Expr::IntLit(1) });
    if has_vtable {
        body.push(ir::Stmt::Assign {
            target: ir::Expr::arrow(ir::Expr::var("self"), "vtable"),
            value: ir::Expr::AddrOf(Box::new(ir::Expr::var(mangle::vtable_instance(mangled_name)))),
        });
    }
    body.push(ir::Stmt::ExprStmt(ir::Expr::call(ir::Expr::var(ctor_name), ctor_args)));
    body.push(ir::Stmt::Return(Some(ir::Expr::var("self"))));
    module.functions.push(ir::Function { name: create_name, ret: self_ty, params: create_params, body: Some(body), is_static_linkage: true });
}

/// Prepends the superclass's own (non-static) fields, walking all the way
/// to the root so a grandchild class gets its grandparent's fields too
/// (spec.md §4.5: "a derived class's struct begins with its base's struct
/// layout, recursively").
fn collect_inherited_fields(ctx: &mut LowerCtx, superclass: Option<Name>, out: &mut Vec<ir::Field>) {
    let Some(base_name) = superclass else { return };
    let Some(base_info) = ctx.sema.classes.get(&base_name).cloned() else { return };
    collect_inherited_fields(ctx, base_info.superclass, out);
    for field in &base_info.fields {
        if !field.is_static {
            out.push(ir::Field { name: ctx.resolve(field.name), ty: ctx.lower_type(field.ty) });
        }
    }
}

/// The class that first introduces `method_name` in `start`'s ancestor
/// chain -- every override after it keeps the same vtable slot and the
/// same function-pointer type, typed against *this* class's self pointer
/// (spec.md §4.5 "Vtable construction": "the declaring class's self type
/// is used for every override, so the slot's function-pointer type never
/// changes down the chain").
fn declaring_class(classes: &FxHashMap<Name, ClassInfo>, start: Name, method_name: Name) -> Name {
    let mut chain = vec![start];
    let mut current = classes.get(&start).and_then(|c| c.superclass);
    while let Some(name) = current {
        chain.push(name);
        current = classes.get(&name).and_then(|c| c.superclass);
    }
    for &name in chain.iter().rev() {
        if let Some(class) = classes.get(&name) {
            if class.methods.iter().any(|m| m.name == method_name) {
                return name;
            }
        }
    }
    start
}

/// The nearest class (`start` or an ancestor) that actually implements
/// `method_name` -- the function a vtable slot should point at for `start`.
fn implementing_class(classes: &FxHashMap<Name, ClassInfo>, start: Name, method_name: Name) -> Name {
    let mut current = Some(start);
    while let Some(name) = current {
        let Some(class) = classes.get(&name) else { break };
        if class.methods.iter().any(|m| m.name == method_name) {
            return name;
        }
        current = class.superclass;
    }
    start
}

/// # Panics
/// Panics if `declaring_class` names a class missing from `ctx.sema.classes`,
/// or if that class's own method list lacks the vtable slot sema assigned it
/// -- both would mean `info.vtable` was built from a different class table
/// than the one lowering sees.
#[allow(clippy::expect_used)]
fn lower_vtable(ctx: &mut LowerCtx, class_name: Name, info: &ClassInfo, mangled_name: &str, module: &mut ir::Module) {
    let mut fields = Vec::new();
    let mut init_fields = Vec::new();
    for &method_name in &info.vtable {
        let declaring = declaring_class(&ctx.sema.classes, class_name, method_name);
        let declaring_info = ctx.sema.classes.get(&declaring).expect("declaring class exists");
        let method_info = declaring_info.methods.iter().find(|m| m.name == method_name).expect("method declared").clone();
        let mut params = vec![ir::Type::Struct(ctx.resolve(declaring)).ptr()];
        params.extend(method_info.params.iter().map(|p| ctx.lower_type(*p)));
        let ret = ctx.lower_type(method_info.ret);
        let field_name = ctx.resolve(method_name);
        fields.push(ir::Field { name: field_name.clone(), ty: ir::Type::FunctionPointer(params, Box::new(ret)) });

        let implementor = implementing_class(&ctx.sema.classes, class_name, method_name);
        let target = mangle::method(&ctx.resolve(implementor), &ctx.resolve(method_name));
        init_fields.push((field_name, ir::Expr::var(target)));
    }
    let vtable_type_name = mangle::vtable_type(mangled_name);
    module.structs.push(ir::Struct { name: vtable_type_name.clone(), fields });
    module.globals.push(ir::Global {
        name: mangle::vtable_instance(mangled_name),
        ty: ir::Type::Struct(vtable_type_name.clone()),
        init: Some(ir::Expr::Compound { ty: ir::Type::Struct(vtable_type_name), fields: init_fields }),
    });
}

fn lower_member(ctx: &mut LowerCtx, class_name: Name, mangled_name: &str, member: &Member, module: &mut ir::Module) {
    match member {
        Member::Field { .. } => {
            // Already accounted for in the struct's field list.
        }
        Member::Method { name, ret, params, body, is_static, is_abstract, .. } => {
            if *is_abstract {
                return;
            }
            let fn_name = mangle::method(mangled_name, &ctx.resolve(*name));
            let self_ty = if *is_static {
                None
            } else {
                let declaring = declaring_class(&ctx.sema.classes, class_name, *name);
                Some(ir::Type::Struct(ctx.resolve(declaring)).ptr())
            };
            let func = lower_function_like(ctx, fn_name, Some(ret), params, body, self_ty);
            module.functions.push(func);
        }
        Member::Ctor { .. } => unreachable!("constructors are lowered by `lower_ctor`, not `lower_member`"),
        Member::Dtor { body, .. } => {
            let fn_name = mangle::dtor(mangled_name);
            let self_ty = ir::Type::Struct(mangled_name.to_string()).ptr();
            let func = lower_function_like(ctx, fn_name, None, &[], body, Some(self_ty));
            module.functions.push(func);
        }
        Member::Property { name, ty, getter, setter, has_setter, .. } => {
            let self_ty = ir::Type::Struct(mangled_name.to_string()).ptr();
            let prop_ty = super::lower_ast_type(ctx, ty);

            let get_name = format!("{mangled_name}_get_{}", ctx.resolve(*name));
            let get_params = vec![ir::Field { name: "self".to_string(), ty: self_ty.clone() }];
            let get_body = stmt::lower_block(ctx, getter);
            module.functions.push(ir::Function {
                name: get_name,
                ret: prop_ty.clone(),
                params: get_params,
                body: Some(get_body),
                is_static_linkage: true,
            });

            if *has_setter {
                let set_name = format!("{mangled_name}_set_{}", ctx.resolve(*name));
                let set_params = vec![
                    ir::Field { name: "self".to_string(), ty: self_ty },
                    ir::Field { name: "value".to_string(), ty: prop_ty },
                ];
                let set_body = stmt::lower_block(ctx, setter);
                module.functions.push(ir::Function {
                    name: set_name,
                    ret: ir::Type::Void,
                    params: set_params,
                    body: Some(set_body),
                    is_static_linkage: true,
                });
            }
        }
    }
}

fn lower_function_like(
    ctx: &mut LowerCtx,
    name: String,
    ret: Option<&btrc_ir::types::Type>,
    params: &[btrc_ir::ast::Param],
    body: &[btrc_ir::ast::Stmt],
    self_ty: Option<ir::Type>,
) -> ir::Function {
    let mut out_params = Vec::new();
    if let Some(ty) = self_ty {
        out_params.push(ir::Field { name: "self".to_string(), ty });
    }
    for p in params {
        out_params.push(ir::Field { name: ctx.resolve(p.name), ty: super::lower_ast_type(ctx, &p.ty) });
    }
    let ret = ret.map_or(ir::Type::Void, |t| super::lower_ast_type(ctx, t));
    let mut lowered_body = stmt::lower_block(ctx, body);
    super::expr::append_kept_param_releases(ctx, params, &mut lowered_body);
    ir::Function { name, ret, params: out_params, body: Some(lowered_body), is_static_linkage: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_diagnostic::DiagnosticQueue;
    use btrc_ir::StringInterner;
    use btrc_sema::{check_module, SemaResult};

    fn analyze(src: &str) -> (btrc_ir::ast::Program, SemaResult, StringInterner) {
        let grammar_text =
            std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../../grammar/btrc.ebnf")).unwrap();
        let grammar = btrc_grammar::GrammarInfo::parse(&grammar_text, "btrc.ebnf").unwrap();
        let interner = StringInterner::new();
        let (tokens, _lex_diags) = btrc_lexer::Lexer::new(src, &grammar, &interner).tokenize();
        let (program, _parse_diags) = btrc_parse::parse(tokens, &grammar, &interner);
        let (sema, _diags) = check_module(&program, &interner);
        (program, sema, interner)
    }

    #[test]
    fn vtable_prefix_agrees_with_base() {
        let src = "class Animal { void speak() { } }\n\
                   class Dog : Animal { void speak() { } }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let mut ctx = LowerCtx::new(&sema, &interner, &mut diagnostics);
        let mut module = ir::Module::default();
        super::super::lower_program(&mut ctx, &program, &mut module);

        let animal_vtable = module.structs.iter().find(|s| s.name == "Animal_VTable").expect("Animal_VTable emitted");
        let dog_vtable = module.structs.iter().find(|s| s.name == "Dog_VTable").expect("Dog_VTable emitted");
        assert_eq!(animal_vtable.fields.len(), dog_vtable.fields.len());
        for (a, d) in animal_vtable.fields.iter().zip(&dog_vtable.fields) {
            assert_eq!(a.name, d.name, "vtable slot order must agree between base and derived");
        }
    }
}
