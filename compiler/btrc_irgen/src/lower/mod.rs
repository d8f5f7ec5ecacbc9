//! Stage 5, IR Generation (spec.md §4.5): lowers a checked [`ast::Program`]
//! plus its [`SemaResult`] into an [`ir::Module`].
//!
//! Split the way `ori_canon::lower` is split in the reference toolchain:
//! one file per syntactic family (`class`, `function`, `stmt`, `expr`),
//! plus `collections` for the five built-in generic containers and
//! `lambda` for closure lifting. [`LowerCtx`] is the thread-through state
//! every sub-module shares -- the semantic model to consult, the
//! diagnostic sink, and the bookkeeping (temp/lambda counters, the
//! generic-instantiation worklist) that has to survive across the whole
//! walk.

pub mod class;
pub mod collections;
pub mod expr;
pub mod function;
pub mod lambda;
pub mod stmt;

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use btrc_diagnostic::DiagnosticQueue;
use btrc_ir::ast::{ClassDecl, Decl, FunctionDecl, Program};
use btrc_ir::{Name, StringInterner};
use btrc_sema::types::CanonicalType;
use btrc_sema::{GenericInstance, SemaResult, TypeId};

use crate::helpers::HelperCategory;
use crate::ir;
use crate::mangle;

/// Shared mutable state for one whole-program lowering pass.
pub struct LowerCtx<'a> {
    pub sema: &'a SemaResult,
    pub interner: &'a StringInterner,
    pub diagnostics: &'a mut DiagnosticQueue,
    temp_counter: u32,
    lambda_counter: u32,
    /// Generic/collection instantiations discovered so far (source-level
    /// uses from the Analyzer, plus any new ones lowering itself
    /// discovers -- e.g. a `Vector<T>` method body that itself allocates a
    /// `List<T>`). Stage 5's monomorphization worklist (spec.md §4.5
    /// "Monomorphization") drains this to a fixed point.
    pub pending_instances: Vec<GenericInstance>,
    seen_instances: FxHashSet<GenericInstance>,
    /// Type-parameter substitutions currently in effect, innermost last;
    /// pushed while lowering one generic class/function instantiation's
    /// body, so a field or parameter typed as the class's own `T` resolves
    /// to this instantiation's concrete argument.
    subst_stack: Vec<FxHashMap<Name, TypeId>>,
    /// Source declarations for every class/function, keyed by name, so a
    /// generic instantiation discovered mid-lowering can find the body to
    /// lower against (spec.md §4.5 "Monomorphization").
    pub class_decls: FxHashMap<Name, ClassDecl>,
    pub function_decls: FxHashMap<Name, FunctionDecl>,
    /// `(class, property)` -> has_setter, so expression lowering can
    /// rewrite `obj.prop` reads/writes into getter/setter calls (spec.md
    /// §4.5 "Property getter/setter rewriting").
    pub properties: FxHashMap<(Name, Name), bool>,
    /// Helper categories referenced while lowering, merged into the
    /// [`ir::Module`] once the whole walk (including monomorphization)
    /// finishes -- expression/statement lowering only ever sees `&mut
    /// LowerCtx`, never the module, so this is the one place they can
    /// register a dependency on `__btrc_*` runtime support.
    pub helpers: BTreeSet<HelperCategory>,
    /// Functions a lifted lambda produced, queued the same way helpers are
    /// -- `lambda::lower_lambda_arrow`/`lower_lambda_block` only see `&mut
    /// LowerCtx`, never the module, so the caller that does hold the
    /// module drains this once the whole program (and any monomorphization
    /// it triggers) has been lowered.
    pub pending_functions: Vec<ir::Function>,
    /// Capture-slot globals a capturing lambda needs (spec.md §4.5
    /// "Lambdas": "captures packed into a generated capture struct"),
    /// drained into the module alongside `pending_functions`.
    pub pending_globals: Vec<ir::Global>,
    /// Identifier rename in effect while lowering a capturing lambda's
    /// body, innermost last: a captured local/parameter is read through its
    /// per-lambda capture-slot global instead of its own name (see
    /// `lambda.rs`).
    var_rename_stack: Vec<FxHashMap<Name, String>>,
}

impl<'a> LowerCtx<'a> {
    pub fn new(sema: &'a SemaResult, interner: &'a StringInterner, diagnostics: &'a mut DiagnosticQueue) -> Self {
        LowerCtx {
            sema,
            interner,
            diagnostics,
            temp_counter: 0,
            lambda_counter: 0,
            pending_instances: Vec::new(),
            seen_instances: FxHashSet::default(),
            subst_stack: Vec::new(),
            class_decls: FxHashMap::default(),
            function_decls: FxHashMap::default(),
            properties: FxHashMap::default(),
            helpers: BTreeSet::new(),
            pending_functions: Vec::new(),
            pending_globals: Vec::new(),
            var_rename_stack: Vec::new(),
        }
    }

    pub fn register_helper(&mut self, category: HelperCategory) {
        self.helpers.insert(category);
    }

    pub fn push_var_rename(&mut self, rename: FxHashMap<Name, String>) {
        self.var_rename_stack.push(rename);
    }

    pub fn pop_var_rename(&mut self) {
        self.var_rename_stack.pop();
    }

    /// Looks up `name` against the rename stack in effect (innermost
    /// lambda wins), for a captured local/parameter read from inside a
    /// lifted lambda body (spec.md §4.5 "Lambdas").
    pub fn var_rename_lookup(&self, name: Name) -> Option<String> {
        self.var_rename_stack.iter().rev().find_map(|frame| frame.get(&name).cloned())
    }

    /// Looks up whether `(class, property)` names a property and, if so,
    /// whether it has a setter. Walks the superclass chain so a property
    /// declared on a base class is found through a derived-typed access.
    pub fn property_info(&self, mut class: Name, property: Name) -> Option<bool> {
        loop {
            if let Some(&has_setter) = self.properties.get(&(class, property)) {
                return Some(has_setter);
            }
            class = self.sema.classes.get(&class)?.superclass?;
        }
    }

    pub fn push_subst(&mut self, subst: FxHashMap<Name, TypeId>) {
        self.subst_stack.push(subst);
    }

    /// Looks up `name` against the substitution stack directly, for
    /// syntactic `ast::Type::Primitive(name)` nodes -- these have no
    /// `TypeId` of their own to run through `apply_subst`, since they're
    /// lowered straight from the source AST (typedefs, externs, struct
    /// fields, and generic class/function bodies all go through
    /// [`lower_ast_type`] rather than the Analyzer's resolved types).
    pub fn subst_lookup(&self, name: Name) -> Option<TypeId> {
        self.subst_stack.iter().rev().find_map(|frame| frame.get(&name).copied())
    }

    pub fn pop_subst(&mut self) {
        self.subst_stack.pop();
    }

    /// Replaces `id` with its substitution, if any type-parameter frame on
    /// the stack maps it (innermost frame wins).
    fn apply_subst(&self, id: TypeId) -> TypeId {
        if let CanonicalType::Declared(name) = self.sema.types.get(id) {
            for frame in self.subst_stack.iter().rev() {
                if let Some(&mapped) = frame.get(name) {
                    return mapped;
                }
            }
        }
        id
    }

    pub fn fresh_temp(&mut self) -> String {
        let name = format!("_tmp{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    pub fn fresh_lambda_index(&mut self) -> u32 {
        let index = self.lambda_counter;
        self.lambda_counter += 1;
        index
    }

    pub fn resolve(&self, name: Name) -> String {
        self.interner.resolve(name)
    }

    /// Queues `generic_name<args>` for monomorphization if this is the
    /// first time it has been seen (spec.md §4.5 "Monomorphization":
    /// "each distinct instantiation is lowered exactly once").
    pub fn queue_instance(&mut self, generic_name: Name, args: Vec<TypeId>) {
        let instance = GenericInstance { generic_name, args };
        if self.seen_instances.insert(instance.clone()) {
            self.pending_instances.push(instance);
        }
    }

    /// Maps a resolved [`TypeId`] to the C type the Emitter renders,
    /// queuing any generic instantiation this type mentions along the way.
    pub fn lower_type(&mut self, id: TypeId) -> ir::Type {
        let id = self.apply_subst(id);
        match self.sema.types.get(id).clone() {
            CanonicalType::Void => ir::Type::Void,
            CanonicalType::Int => ir::Type::Int,
            CanonicalType::Float => ir::Type::Float,
            CanonicalType::Double => ir::Type::Double,
            CanonicalType::Bool => ir::Type::Bool,
            CanonicalType::Char => ir::Type::Char,
            CanonicalType::Str | CanonicalType::Error => ir::Type::CString,
            CanonicalType::Declared(name) => {
                if self.sema.classes.contains_key(&name) {
                    ir::Type::Struct(self.resolve(name)).ptr()
                } else {
                    ir::Type::Struct(self.resolve(name))
                }
            }
            CanonicalType::Nullable(inner) => self.lower_type(inner),
            CanonicalType::Pointer(inner) => self.lower_type(inner).ptr(),
            CanonicalType::Generic(name, args) => {
                let arg_names: Vec<String> = args.iter().map(|a| self.mangled_type_name(*a)).collect();
                self.queue_instance(name, args);
                let struct_name = mangle::generic_instance(&self.resolve(name), &arg_names);
                ir::Type::Struct(struct_name).ptr()
            }
            CanonicalType::Function(params, ret) => {
                let params = params.into_iter().map(|p| self.lower_type(p)).collect();
                let ret = self.lower_type(ret);
                ir::Type::FunctionPointer(params, Box::new(ret))
            }
            CanonicalType::Tuple(elements) => {
                // Tuples have no source-level name to mangle against; a
                // positional `_TupleN_T1_T2` name keeps distinct arities/
                // element-type combinations from colliding.
                let names: Vec<String> = elements.iter().map(|e| self.mangled_type_name(*e)).collect();
                ir::Type::Struct(format!("_Tuple{}_{}", elements.len(), names.join("_")))
            }
        }
    }

    /// A short, C-identifier-safe name for a type, used to build
    /// monomorphized struct/function names (spec.md §4.5 "Name mangling").
    pub fn mangled_type_name(&mut self, id: TypeId) -> String {
        let id = self.apply_subst(id);
        match self.sema.types.get(id).clone() {
            CanonicalType::Void => "void".to_string(),
            CanonicalType::Int => "int".to_string(),
            CanonicalType::Float => "float".to_string(),
            CanonicalType::Double => "double".to_string(),
            CanonicalType::Bool => "bool".to_string(),
            CanonicalType::Char => "char".to_string(),
            CanonicalType::Str | CanonicalType::Error => "string".to_string(),
            CanonicalType::Declared(name) => self.resolve(name),
            CanonicalType::Nullable(inner) | CanonicalType::Pointer(inner) => self.mangled_type_name(inner),
            CanonicalType::Generic(name, args) => {
                let arg_names: Vec<String> = args.iter().map(|a| self.mangled_type_name(*a)).collect();
                self.queue_instance(name, args);
                mangle::generic_instance(&self.resolve(name), &arg_names)
            }
            CanonicalType::Function(_, ret) => self.mangled_type_name(ret),
            CanonicalType::Tuple(elements) => {
                let names: Vec<String> = elements.iter().map(|e| self.mangled_type_name(*e)).collect();
                format!("Tuple{}_{}", elements.len(), names.join("_"))
            }
        }
    }
}

/// Lowers every top-level declaration (spec.md §4.5), in source order, so
/// non-generic declarations land in the module deterministically before
/// monomorphization appends generic instantiations afterward.
pub fn lower_program(ctx: &mut LowerCtx, program: &Program, module: &mut ir::Module) {
    for decl in &program.decls {
        match decl {
            Decl::Class(c) => {
                ctx.class_decls.insert(c.name, c.clone());
                for member in &c.members {
                    if let btrc_ir::ast::Member::Property { name, has_setter, .. } = member {
                        ctx.properties.insert((c.name, *name), *has_setter);
                    }
                }
            }
            Decl::Function(f) => {
                ctx.function_decls.insert(f.name, f.clone());
            }
            _ => {}
        }
    }
    for decl in &program.decls {
        btrc_stack::ensure_sufficient_stack(|| lower_decl(ctx, decl, module));
    }
}

fn lower_decl(ctx: &mut LowerCtx, decl: &Decl, module: &mut ir::Module) {
    match decl {
        Decl::Class(class_decl) => class::lower_class(ctx, class_decl, module),
        Decl::Interface(_) => {
            // Interfaces have no runtime representation of their own
            // (spec.md §4.5 "Interface satisfaction is structural"): a
            // class either has the method or it doesn't. Nothing to emit.
        }
        Decl::Enum(enum_decl) => lower_enum(ctx, enum_decl, module),
        Decl::Struct(struct_decl) => lower_struct(ctx, struct_decl, module),
        Decl::Typedef { name, ty, .. } => {
            module.typedefs.push(ir::Typedef { name: ctx.resolve(*name), ty: lower_ast_type(ctx, ty) });
        }
        Decl::Extern { name, ret, params, .. } => {
            module.externs.push(ir::Extern {
                name: ctx.resolve(*name),
                ret: lower_ast_type(ctx, ret),
                params: params.iter().map(|p| lower_ast_type(ctx, &p.ty)).collect(),
            });
        }
        Decl::Function(function_decl) => {
            if function_decl.type_params.is_empty() {
                let f = function::lower_function(ctx, function_decl);
                module.functions.push(f);
            }
            // Generic free functions are lowered lazily, once per call
            // site's instantiation, the same as generic classes (spec.md
            // §4.5 "Monomorphization"); see `monomorphize::run`.
        }
        Decl::GlobalVar { name, ty, init, .. } => {
            let lowered_init = init.as_ref().map(|e| expr::lower_expr(ctx, e));
            module.globals.push(ir::Global { name: ctx.resolve(*name), ty: lower_ast_type(ctx, ty), init: lowered_init });
        }
        Decl::Include { .. } => {
            // Resolved away by `btrc_lexer::include` before parsing ever
            // sees this file (spec.md §5); nothing survives to stage 5.
        }
    }
}

fn lower_enum(ctx: &mut LowerCtx, enum_decl: &btrc_ir::ast::EnumDecl, module: &mut ir::Module) {
    let name = ctx.resolve(enum_decl.name);
    let mut fields = vec![ir::Field { name: "tag".to_string(), ty: ir::Type::Int }];
    for (index, variant) in enum_decl.variants.iter().enumerate() {
        for (slot, payload_ty) in variant.payload.iter().enumerate() {
            fields.push(ir::Field {
                name: format!("v{index}_f{slot}"),
                ty: lower_ast_type(ctx, payload_ty),
            });
        }
    }
    module.structs.push(ir::Struct { name, fields });
}

fn lower_struct(ctx: &mut LowerCtx, struct_decl: &btrc_ir::ast::StructDecl, module: &mut ir::Module) {
    let name = ctx.resolve(struct_decl.name);
    let fields =
        struct_decl.fields.iter().map(|f| ir::Field { name: ctx.resolve(f.name), ty: lower_ast_type(ctx, &f.ty) }).collect();
    module.structs.push(ir::Struct { name, fields });
}

/// Lowers a syntactic `ast::Type` directly, for contexts (typedefs,
/// externs, struct fields) that never need a [`TypeId`]'s generic-instance
/// bookkeeping resolved by the Analyzer -- plain declared names stand for
/// themselves here.
pub fn lower_ast_type(ctx: &mut LowerCtx, ty: &btrc_ir::types::Type) -> ir::Type {
    use btrc_ir::types::Type as AstType;
    match ty {
        AstType::Primitive(name) => lower_primitive_name(ctx, *name),
        AstType::Nullable(inner) => lower_ast_type(ctx, inner),
        AstType::Pointer(inner) => lower_ast_type(ctx, inner).ptr(),
        AstType::Generic(name, args) => {
            let names: Vec<String> = args.iter().map(|a| ast_type_mangle_name(ctx, a)).collect();
            ir::Type::Struct(mangle::generic_instance(&ctx.resolve(*name), &names)).ptr()
        }
        AstType::Function(params, ret) => {
            ir::Type::FunctionPointer(params.iter().map(|p| lower_ast_type(ctx, p)).collect(), Box::new(lower_ast_type(ctx, ret)))
        }
        AstType::Tuple(elements) => {
            let names: Vec<String> = elements.iter().map(|e| ast_type_mangle_name(ctx, e)).collect();
            ir::Type::Struct(format!("_Tuple{}_{}", elements.len(), names.join("_")))
        }
    }
}

pub(crate) fn ast_type_mangle_name(ctx: &mut LowerCtx, ty: &btrc_ir::types::Type) -> String {
    use btrc_ir::types::Type as AstType;
    match ty {
        AstType::Primitive(name) => {
            if let Some(substituted) = ctx.subst_lookup(*name) {
                ctx.mangled_type_name(substituted)
            } else {
                ctx.resolve(*name)
            }
        }
        AstType::Nullable(inner) | AstType::Pointer(inner) => ast_type_mangle_name(ctx, inner),
        AstType::Generic(name, args) => {
            let names: Vec<String> = args.iter().map(|a| ast_type_mangle_name(ctx, a)).collect();
            mangle::generic_instance(&ctx.resolve(*name), &names)
        }
        AstType::Function(_, ret) => ast_type_mangle_name(ctx, ret),
        AstType::Tuple(elements) => {
            let names: Vec<String> = elements.iter().map(|e| ast_type_mangle_name(ctx, e)).collect();
            format!("Tuple{}_{}", elements.len(), names.join("_"))
        }
    }
}

/// Resolves a bare `Primitive(Name)` to either a built-in C scalar or a
/// `struct Name*` (user class/interface/struct/enum reference) -- the
/// grammar gives primitives and declared names the same syntax, so the
/// distinction is made here, by string.
fn lower_primitive_name(ctx: &mut LowerCtx, name: Name) -> ir::Type {
    if let Some(substituted) = ctx.subst_lookup(name) {
        return ctx.lower_type(substituted);
    }
    match ctx.resolve(name).as_str() {
        "void" => ir::Type::Void,
        "int" => ir::Type::Int,
        "float" => ir::Type::Float,
        "double" => ir::Type::Double,
        "bool" => ir::Type::Bool,
        "char" => ir::Type::Char,
        "string" => ir::Type::CString,
        _ if ctx.sema.classes.contains_key(&name) => ir::Type::Struct(ctx.resolve(name)).ptr(),
        _ => ir::Type::Struct(ctx.resolve(name)),
    }
}
