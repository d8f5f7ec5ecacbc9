//! Declaration registration (pass 1) and declaration-level driving of pass
//! 2 (spec.md §4.4).

use btrc_ir::ast::{self, Decl, Member, Program};
use btrc_ir::{Name, Span, Type};

use crate::builtins::is_builtin_collection;
use crate::class_info::{
    ClassInfo, CtorInfo, EnumInfo, EnumVariantInfo, FieldInfo, FunctionInfo, InterfaceInfo, MethodInfo, StructInfo,
};
use crate::error::SemaErrorKind;
use crate::scope::{Access, ScopeId, ScopeKind, Symbol, SymbolKind};
use crate::types::{CanonicalType, TypeId};
use crate::Analyzer;

impl<'a> Analyzer<'a> {
    /// Pass 1: register every declared name, then fill in member/parameter
    /// signatures now that every name in the module is visible (spec.md
    /// §4.4 "Forward references between top-level declarations are
    /// permitted").
    pub(crate) fn pass1(&mut self, program: &Program) {
        for decl in &program.decls {
            self.register_decl_name(decl);
        }
        for decl in &program.decls {
            self.fill_decl_signature(decl);
        }
        for decl in &program.decls {
            if let Decl::Class(c) = decl {
                self.check_inheritance(c);
            }
        }
    }

    /// Pass 2: walk every function/method/property body and every
    /// initializer expression, inferring a type for every expression and
    /// resolving every identifier.
    pub(crate) fn pass2(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Function(f) => self.check_function_body(f),
                Decl::Class(c) => self.check_class_body(c),
                Decl::GlobalVar { name, init: Some(init), .. } => {
                    let ty = self.result.globals.get(name).copied().unwrap_or(self.result.types.error);
                    let init_ty = self.infer_expr(init, self.module_scope);
                    self.mismatch(ty, init_ty, init.span());
                }
                Decl::GlobalVar { .. }
                | Decl::Interface(_)
                | Decl::Enum(_)
                | Decl::Struct(_)
                | Decl::Typedef { .. }
                | Decl::Extern { .. }
                | Decl::Include { .. } => {}
            }
        }
    }

    fn check_function_body(&mut self, f: &ast::FunctionDecl) {
        let Some(info) = self.result.functions.get(&f.name).cloned() else { return };
        let fn_scope = self.open_scope(self.module_scope, ScopeKind::Function);
        for (param, ty) in f.params.iter().zip(info.params.iter()) {
            self.scopes.declare(
                fn_scope,
                Symbol { name: param.name, kind: SymbolKind::Parameter, ty: *ty, scope: fn_scope, access: None, defining_span: f.span },
            );
        }
        self.expected_return.push(info.ret);
        btrc_stack::ensure_sufficient_stack(|| self.check_block(&f.body, fn_scope));
        self.expected_return.pop();
    }

    fn check_class_body(&mut self, c: &ast::ClassDecl) {
        let Some(info) = self.result.classes.get(&c.name).cloned() else { return };
        let class_scope = self.open_class_scope(self.module_scope, c.name);
        let mut ctor_index = 0usize;

        for member in &c.members {
            match member {
                Member::Field { init: Some(init), name, span, .. } => {
                    let field_ty = info.fields.iter().find(|f| f.name == *name).map_or(self.result.types.error, |f| f.ty);
                    let field_scope = self.this_scope(class_scope, c.name);
                    let init_ty = self.infer_expr(init, field_scope);
                    self.mismatch(field_ty, init_ty, init.span());
                }
                Member::Field { .. } => {}
                Member::Method { name, params, body, is_static, span, .. } => {
                    let Some(method) = info.methods.iter().find(|m| m.name == *name) else { continue };
                    let method_scope = if *is_static {
                        self.scopes.create(Some(class_scope), ScopeKind::Method, Some(c.name))
                    } else {
                        self.this_scope(class_scope, c.name)
                    };
                    for (param, ty) in params.iter().zip(method.params.iter()) {
                        self.scopes.declare(
                            method_scope,
                            Symbol { name: param.name, kind: SymbolKind::Parameter, ty: *ty, scope: method_scope, access: None, defining_span: *span },
                        );
                    }
                    self.expected_return.push(method.ret);
                    btrc_stack::ensure_sufficient_stack(|| self.check_block(body, method_scope));
                    self.expected_return.pop();
                }
                Member::Ctor { params, body, span } => {
                    let Some(ctor) = info.ctors.get(ctor_index).cloned() else { continue };
                    ctor_index += 1;
                    let ctor_scope = self.this_scope(class_scope, c.name);
                    for (param, ty) in params.iter().zip(ctor.params.iter()) {
                        self.scopes.declare(
                            ctor_scope,
                            Symbol { name: param.name, kind: SymbolKind::Parameter, ty: *ty, scope: ctor_scope, access: None, defining_span: *span },
                        );
                    }
                    self.expected_return.push(self.result.types.void);
                    btrc_stack::ensure_sufficient_stack(|| self.check_block(body, ctor_scope));
                    self.expected_return.pop();
                }
                Member::Dtor { body, span } => {
                    let dtor_scope = self.this_scope(class_scope, c.name);
                    self.expected_return.push(self.result.types.void);
                    btrc_stack::ensure_sufficient_stack(|| self.check_block(body, dtor_scope));
                    self.expected_return.pop();
                }
                Member::Property { name, ty, getter, setter, has_setter, span, .. } => {
                    let resolved = info
                        .methods
                        .iter()
                        .find(|m| m.name == *name && m.params.is_empty())
                        .map_or_else(|| self.resolve_type(ty, &[]), |m| m.ret);
                    let getter_scope = self.this_scope(class_scope, c.name);
                    self.expected_return.push(resolved);
                    btrc_stack::ensure_sufficient_stack(|| self.check_block(getter, getter_scope));
                    self.expected_return.pop();
                    if *has_setter {
                        let setter_scope = self.this_scope(class_scope, c.name);
                        let value_name = self.interner.intern("value");
                        self.scopes.declare(
                            setter_scope,
                            Symbol { name: value_name, kind: SymbolKind::Parameter, ty: resolved, scope: setter_scope, access: None, defining_span: *span },
                        );
                        self.expected_return.push(self.result.types.void);
                        btrc_stack::ensure_sufficient_stack(|| self.check_block(setter, setter_scope));
                        self.expected_return.pop();
                    }
                }
            }
        }
    }

    /// Opens a method-body scope whose `owning_class` lets `this`/`base`
    /// resolve inside it without a declared symbol (spec.md §4.4: "`this`
    /// resolves inside any non-static method/ctor/dtor/property body") --
    /// see `Analyzer::infer_ident`'s `this`/`base` fallback.
    fn this_scope(&mut self, class_scope: ScopeId, class_name: Name) -> ScopeId {
        self.scopes.create(Some(class_scope), ScopeKind::Method, Some(class_name))
    }

    fn declare_module_type(&mut self, name: Name, ty: TypeId, span: Span) {
        if self.scopes.lookup_local(self.module_scope, name).is_some() {
            let text = self.interner.resolve(name);
            self.diagnostics.emit_error(
                SemaErrorKind::DuplicateDefinition { name: text, scope: "module" }.into_diagnostic(span),
            );
            return;
        }
        self.scopes.declare(
            self.module_scope,
            Symbol { name, kind: SymbolKind::Type, ty, scope: self.module_scope, access: None, defining_span: span },
        );
    }

    fn register_decl_name(&mut self, decl: &Decl) {
        match decl {
            Decl::Class(c) => {
                let ty = self.result.types.intern(CanonicalType::Declared(c.name));
                self.declare_module_type(c.name, ty, c.span);
                self.result.classes.insert(
                    c.name,
                    ClassInfo {
                        name: c.name,
                        superclass: c.superclass,
                        interfaces: c.interfaces.clone(),
                        type_params: c.type_params.iter().map(|p| p.name).collect(),
                        ..ClassInfo::default()
                    },
                );
            }
            Decl::Interface(i) => {
                let ty = self.result.types.intern(CanonicalType::Declared(i.name));
                self.declare_module_type(i.name, ty, i.span);
                self.result.interfaces.insert(i.name, InterfaceInfo { name: i.name, methods: Vec::new() });
            }
            Decl::Enum(e) => {
                let ty = self.result.types.intern(CanonicalType::Declared(e.name));
                self.declare_module_type(e.name, ty, e.span);
                self.result.enums.insert(e.name, EnumInfo { name: e.name, variants: Vec::new() });
            }
            Decl::Struct(s) => {
                let ty = self.result.types.intern(CanonicalType::Declared(s.name));
                self.declare_module_type(s.name, ty, s.span);
                self.result.structs.insert(s.name, StructInfo { name: s.name, fields: Vec::new() });
            }
            Decl::Typedef { name, span, .. } => {
                // Placeholder; resolved to the aliased type in phase 1b.
                let ty = self.result.types.error;
                self.declare_module_type(*name, ty, *span);
            }
            Decl::Function(f) => {
                if self.scopes.lookup_local(self.module_scope, f.name).is_some() {
                    let text = self.interner.resolve(f.name);
                    self.diagnostics.emit_error(
                        SemaErrorKind::DuplicateDefinition { name: text, scope: "module" }.into_diagnostic(f.span),
                    );
                    return;
                }
                self.scopes.declare(
                    self.module_scope,
                    Symbol {
                        name: f.name,
                        kind: SymbolKind::Function,
                        ty: self.result.types.error,
                        scope: self.module_scope,
                        access: None,
                        defining_span: f.span,
                    },
                );
            }
            Decl::Extern { name, span, .. } => {
                self.scopes.declare(
                    self.module_scope,
                    Symbol {
                        name: *name,
                        kind: SymbolKind::Function,
                        ty: self.result.types.error,
                        scope: self.module_scope,
                        access: None,
                        defining_span: *span,
                    },
                );
            }
            Decl::GlobalVar { name, span, .. } => {
                self.scopes.declare(
                    self.module_scope,
                    Symbol {
                        name: *name,
                        kind: SymbolKind::Variable,
                        ty: self.result.types.error,
                        scope: self.module_scope,
                        access: None,
                        defining_span: *span,
                    },
                );
            }
            Decl::Include { .. } => {}
        }
    }

    /// # Panics
    /// Never: an earlier pass inserts a placeholder `InterfaceInfo`/`EnumInfo`/
    /// `StructInfo` for every declaration before signatures are filled in, so
    /// each `get_mut` below always finds the entry it just created.
    #[allow(clippy::unwrap_used)]
    fn fill_decl_signature(&mut self, decl: &Decl) {
        match decl {
            Decl::Class(c) => self.fill_class_signature(c),
            Decl::Interface(i) => {
                let methods = i.methods.iter().map(|m| self.method_sig_info(m)).collect();
                self.result.interfaces.get_mut(&i.name).unwrap().methods = methods;
            }
            Decl::Enum(e) => {
                let variants = e
                    .variants
                    .iter()
                    .map(|v| EnumVariantInfo {
                        name: v.name,
                        payload: v.payload.iter().map(|t| self.resolve_type(t, &[])).collect(),
                    })
                    .collect();
                self.result.enums.get_mut(&e.name).unwrap().variants = variants;
            }
            Decl::Struct(s) => {
                let fields = s
                    .fields
                    .iter()
                    .map(|f| FieldInfo {
                        name: f.name,
                        ty: self.resolve_type(&f.ty, &[]),
                        access: Access::Public,
                        is_static: false,
                    })
                    .collect();
                self.result.structs.get_mut(&s.name).unwrap().fields = fields;
            }
            Decl::Typedef { name, ty, .. } => {
                let resolved = self.resolve_type(ty, &[]);
                self.result.typedefs.insert(*name, resolved);
                if let Some(sym) = self.scopes.lookup_local(self.module_scope, *name) {
                    let mut updated = sym.clone();
                    updated.ty = resolved;
                    self.scopes.declare(self.module_scope, updated);
                }
            }
            Decl::Extern { name, ret, params, .. } => {
                let ret_ty = self.resolve_type(ret, &[]);
                let param_tys: Vec<TypeId> = params.iter().map(|p| self.resolve_type(&p.ty, &[])).collect();
                let defaults = params.iter().map(|p| p.default_value.is_some()).collect();
                self.result.functions.insert(
                    *name,
                    FunctionInfo { name: *name, ret: ret_ty, params: param_tys, param_defaults: defaults, type_params: vec![] },
                );
            }
            Decl::Function(f) => {
                let type_params: Vec<Name> = f.type_params.iter().map(|p| p.name).collect();
                let ret_ty = self.resolve_type(&f.ret, &type_params);
                let param_tys: Vec<TypeId> = f.params.iter().map(|p| self.resolve_type(&p.ty, &type_params)).collect();
                let defaults = f.params.iter().map(|p| p.default_value.is_some()).collect();
                self.result.functions.insert(
                    f.name,
                    FunctionInfo { name: f.name, ret: ret_ty, params: param_tys, param_defaults: defaults, type_params },
                );
            }
            Decl::GlobalVar { name, ty, .. } => {
                let resolved = self.resolve_type(ty, &[]);
                self.result.globals.insert(*name, resolved);
                if let Some(sym) = self.scopes.lookup_local(self.module_scope, *name) {
                    let mut updated = sym.clone();
                    updated.ty = resolved;
                    self.scopes.declare(self.module_scope, updated);
                }
            }
            Decl::Include { .. } => {}
        }
    }

    fn method_sig_info(&mut self, m: &ast::MethodSig) -> MethodInfo {
        MethodInfo {
            name: m.name,
            ret: self.resolve_type(&m.ret, &[]),
            params: m.params.iter().map(|p| self.resolve_type(&p.ty, &[])).collect(),
            param_defaults: m.params.iter().map(|p| p.default_value.is_some()).collect(),
            is_static: false,
            is_override: false,
            is_abstract: true,
            access: Access::Public,
        }
    }

    /// # Panics
    /// Never: `register_decl_name` inserts a placeholder `ClassInfo` for
    /// `c.name` before any call to this method.
    #[allow(clippy::unwrap_used)]
    fn fill_class_signature(&mut self, c: &ast::ClassDecl) {
        let type_params: Vec<Name> = c.type_params.iter().map(|p| p.name).collect();
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut ctors = Vec::new();
        let mut has_dtor = false;

        for member in &c.members {
            match member {
                Member::Field { name, ty, access, is_static, .. } => {
                    fields.push(FieldInfo {
                        name: *name,
                        ty: self.resolve_type(ty, &type_params),
                        access: (*access).into(),
                        is_static: *is_static,
                    });
                }
                Member::Method { name, ret, params, is_static, is_abstract, access, .. } => {
                    methods.push(MethodInfo {
                        name: *name,
                        ret: self.resolve_type(ret, &type_params),
                        params: params.iter().map(|p| self.resolve_type(&p.ty, &type_params)).collect(),
                        param_defaults: params.iter().map(|p| p.default_value.is_some()).collect(),
                        is_static: *is_static,
                        // There is no `override` keyword in the grammar;
                        // the parser always leaves `Member::Method::is_override`
                        // false. Real override status is structural (same
                        // name found in an ancestor) and is filled in by
                        // `check_inheritance` once every class's own
                        // methods are known.
                        is_override: false,
                        is_abstract: *is_abstract,
                        access: (*access).into(),
                    });
                }
                Member::Ctor { params, .. } => {
                    ctors.push(CtorInfo {
                        params: params.iter().map(|p| self.resolve_type(&p.ty, &type_params)).collect(),
                        param_defaults: params.iter().map(|p| p.default_value.is_some()).collect(),
                    });
                }
                Member::Dtor { .. } => has_dtor = true,
                Member::Property { name, ty, has_setter, access, .. } => {
                    let resolved = self.resolve_type(ty, &type_params);
                    methods.push(MethodInfo {
                        name: *name,
                        ret: resolved,
                        params: vec![],
                        param_defaults: vec![],
                        is_static: false,
                        is_override: false,
                        is_abstract: false,
                        access: (*access).into(),
                    });
                    if *has_setter {
                        methods.push(MethodInfo {
                            name: *name,
                            ret: self.result.types.void,
                            params: vec![resolved],
                            param_defaults: vec![false],
                            is_static: false,
                            is_override: false,
                            is_abstract: false,
                            access: (*access).into(),
                        });
                    }
                }
            }
        }

        let info = self.result.classes.get_mut(&c.name).unwrap();
        info.fields = fields;
        info.methods = methods;
        info.ctors = ctors;
        info.has_dtor = has_dtor;
    }

    fn ancestor_method_names(&self, start: Name) -> Vec<Name> {
        let mut names = Vec::new();
        let mut current = Some(start);
        while let Some(name) = current {
            let Some(info) = self.result.classes.get(&name) else { break };
            names.extend(info.methods.iter().map(|m| m.name));
            current = info.superclass;
        }
        names
    }

    /// Nearest ancestor (starting at `start`, walking up) that declares a
    /// method named `method_name`, if any.
    fn find_ancestor_method(&self, start: Name, method_name: Name) -> Option<MethodInfo> {
        let mut current = Some(start);
        while let Some(name) = current {
            let info = self.result.classes.get(&name)?;
            if let Some(m) = info.methods.iter().find(|m| m.name == method_name) {
                return Some(m.clone());
            }
            current = info.superclass;
        }
        None
    }

    /// Validates that every override is signature-compatible with the
    /// method it overrides, and that every abstract method inherited from
    /// an interface or abstract base is implemented by the first concrete
    /// descendant (spec.md §4.4 "Inheritance validation"). Override status
    /// itself is structural -- a method "overrides" whenever its name also
    /// appears somewhere in the ancestor chain -- since the grammar has no
    /// `override` keyword (see `fill_class_signature`).
    /// # Panics
    /// Never: `fill_class_signature` has already registered a `ClassInfo`
    /// for every class by the time inheritance checking runs.
    #[allow(clippy::unwrap_used)]
    fn check_inheritance(&mut self, c: &ast::ClassDecl) {
        let info = self.result.classes.get(&c.name).cloned().unwrap();
        if let Some(base_name) = info.superclass {
            let mut methods = info.methods.clone();
            for method in &mut methods {
                let Some(base_method) = self.find_ancestor_method(base_name, method.name) else { continue };
                method.is_override = true;
                if base_method.params != method.params {
                    let text = self.interner.resolve(method.name);
                    self.diagnostics.emit_error(
                        SemaErrorKind::InvalidOverride {
                            name: text,
                            reason: "parameter types must match the overridden method exactly".to_string(),
                        }
                        .into_diagnostic(c.span),
                    );
                } else if !self.return_type_compatible(base_method.ret, method.ret) {
                    let text = self.interner.resolve(method.name);
                    self.diagnostics.emit_error(
                        SemaErrorKind::InvalidOverride {
                            name: text,
                            reason: "return type is not covariant with the overridden method".to_string(),
                        }
                        .into_diagnostic(c.span),
                    );
                }
            }
            self.result.classes.get_mut(&c.name).unwrap().methods = methods;
        }

        let info = self.result.classes.get(&c.name).cloned().unwrap();
        for iface_name in &info.interfaces {
            let Some(iface) = self.result.interfaces.get(iface_name).cloned() else { continue };
            for required in &iface.methods {
                let implemented = self.ancestor_method_names(c.name).contains(&required.name)
                    || info.methods.iter().any(|m| m.name == required.name && !m.is_abstract);
                if !implemented {
                    let class_text = self.interner.resolve(c.name);
                    let method_text = self.interner.resolve(required.name);
                    self.diagnostics.emit_error(
                        SemaErrorKind::MissingAbstractImplementation { class: class_text, method: method_text }
                            .into_diagnostic(c.span),
                    );
                }
            }
        }
    }

    /// Return-type compatibility for an override (spec.md §4.4): covariant
    /// for reference (declared-class) return types, invariant otherwise.
    fn return_type_compatible(&self, base_ret: TypeId, derived_ret: TypeId) -> bool {
        if base_ret == derived_ret {
            return true;
        }
        if let (Some(base_name), Some(derived_name)) =
            (self.result.types.declared_name(base_ret), self.result.types.declared_name(derived_ret))
        {
            return crate::class_info::is_subclass_of(derived_name, base_name, &self.result.classes);
        }
        false
    }

    /// Resolves syntactic `ast::Type` to a semantic `TypeId`, recording any
    /// generic instantiation along the way (spec.md §4.4 "Generic instance
    /// collection"). `type_params` are the enclosing class/function's own
    /// type-parameter names, resolved as opaque placeholder types.
    pub(crate) fn resolve_type(&mut self, ty: &Type, type_params: &[Name]) -> TypeId {
        match ty {
            Type::Primitive(name) => self.resolve_primitive_or_named(*name, type_params, Span::DUMMY),
            Type::Pointer(inner) => {
                let resolved = self.resolve_type(inner, type_params);
                self.result.types.intern(CanonicalType::Pointer(resolved))
            }
            Type::Nullable(inner) => {
                let resolved = self.resolve_type(inner, type_params);
                self.result.types.widen_to_nullable(resolved)
            }
            Type::Generic(name, args) => {
                let resolved_args: Vec<TypeId> = args.iter().map(|a| self.resolve_type(a, type_params)).collect();
                self.resolve_generic_application(*name, resolved_args, Span::DUMMY)
            }
            Type::Function(params, ret) => {
                let resolved_params = params.iter().map(|p| self.resolve_type(p, type_params)).collect();
                let resolved_ret = self.resolve_type(ret, type_params);
                self.result.types.intern(CanonicalType::Function(resolved_params, resolved_ret))
            }
            Type::Tuple(elements) => {
                let resolved = elements.iter().map(|e| self.resolve_type(e, type_params)).collect();
                self.result.types.intern(CanonicalType::Tuple(resolved))
            }
        }
    }

    fn resolve_primitive_or_named(&mut self, name: Name, type_params: &[Name], span: Span) -> TypeId {
        let text = self.interner.resolve(name);
        match text.as_str() {
            "void" => return self.result.types.void,
            "int" => return self.result.types.int,
            "float" => return self.result.types.float,
            "double" => return self.result.types.double,
            "bool" => return self.result.types.bool_,
            "char" => return self.result.types.char_,
            "string" => return self.result.types.str_,
            _ => {}
        }
        if type_params.contains(&name) {
            return self.result.types.intern(CanonicalType::Declared(name));
        }
        if let Some(sym) = self.scopes.lookup(self.module_scope, name) {
            if sym.kind == SymbolKind::Type {
                return sym.ty;
            }
        }
        self.diagnostics.emit_error(SemaErrorKind::UnknownType { name: text }.into_diagnostic(span));
        self.result.types.error
    }

    fn resolve_generic_application(&mut self, name: Name, args: Vec<TypeId>, span: Span) -> TypeId {
        let arity_ok = if let Some(arity) = is_builtin_collection(self.interner, name) {
            arity == args.len()
        } else if let Some(class) = self.result.classes.get(&name) {
            class.type_params.len() == args.len()
        } else if let Some(iface) = self.result.interfaces.get(&name) {
            let _ = iface;
            true
        } else {
            false
        };
        if !arity_ok {
            let text = self.interner.resolve(name);
            self.diagnostics
                .emit_error(SemaErrorKind::UnresolvedGenericArgument { name: text }.into_diagnostic(span));
            return self.result.types.error;
        }
        self.generic_instances.record(name, args.clone());
        self.result.types.intern(CanonicalType::Generic(name, args))
    }

    pub(crate) fn open_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let owning_class = self.scopes.owning_class(parent);
        self.scopes.create(Some(parent), kind, owning_class)
    }

    pub(crate) fn open_class_scope(&mut self, parent: ScopeId, class_name: Name) -> ScopeId {
        self.scopes.create(Some(parent), ScopeKind::Class, Some(class_name))
    }
}
