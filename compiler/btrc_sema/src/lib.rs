//! Two-pass semantic analyzer (spec.md §4.4 Analyzer).
//!
//! Pass 1 registers every top-level declaration and class member in its
//! enclosing scope (forward references between top-level declarations are
//! permitted). Pass 2 walks statements and expressions, resolving every
//! identifier to a symbol and computing a resolved type for every
//! expression. The single entry point is [`check_module`], matching the
//! reference toolchain's `check_module_with_imports` shape (minus the
//! import/Salsa plumbing, out of scope here — see SPEC_FULL.md §4.4a).

mod builtins;
mod class_info;
mod decl;
mod error;
mod expr;
mod generics;
mod scope;
mod stmt;
#[cfg(test)]
mod tests;
pub mod types;

use rustc_hash::FxHashMap;

use btrc_diagnostic::DiagnosticQueue;
use btrc_ir::ast::Program;
use btrc_ir::{Name, StringInterner};

pub use class_info::{
    build_vtables, implements_interface, is_subclass_of, mark_cycle_capable, ClassInfo, CtorInfo, EnumInfo,
    EnumVariantInfo, FieldInfo, FunctionInfo, InterfaceInfo, MethodInfo, StructInfo,
};
pub use error::SemaErrorKind;
pub use generics::GenericInstance;
pub use scope::{Access, ScopeId, ScopeKind, Symbol, SymbolKind};
pub use types::{CanonicalType, TypeId, TypeTable};

/// What an `Expr::Ident` resolved to, kept alongside its `TypeId` in
/// [`SemaResult::expr_facts`] so the IR Generator doesn't need to re-run
/// symbol lookup.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Binding {
    Local,
    Parameter,
    Field { owner: Name },
    StaticField { owner: Name },
    Global,
    Function,
    Method { owner: Name },
    StaticMethod { owner: Name },
    EnumVariant { owner: Name },
    Type(Name),
    /// `this` / `base`.
    SelfRef,
    /// Resolution failed; a diagnostic was already emitted.
    Unresolved,
}

#[derive(Clone, Copy, Debug)]
pub struct ExprFacts {
    pub ty: TypeId,
    pub binding: Option<Binding>,
}

/// Everything the IR Generator needs from the Analyzer (spec.md §3
/// "Semantic Model").
#[derive(Default)]
pub struct SemaResult {
    pub types: TypeTable,
    pub classes: FxHashMap<Name, ClassInfo>,
    pub interfaces: FxHashMap<Name, InterfaceInfo>,
    pub enums: FxHashMap<Name, EnumInfo>,
    pub structs: FxHashMap<Name, StructInfo>,
    pub functions: FxHashMap<Name, FunctionInfo>,
    pub globals: FxHashMap<Name, TypeId>,
    pub typedefs: FxHashMap<Name, TypeId>,
    pub generic_instances: Vec<GenericInstance>,
    /// Keyed by the address of the `Expr` node it describes (stable for
    /// the lifetime of the `Program` the Analyzer borrowed — see
    /// SPEC_FULL.md §3's AST-representation note).
    pub expr_facts: FxHashMap<usize, ExprFacts>,
}

impl SemaResult {
    pub fn expr_type(&self, expr: &btrc_ir::ast::Expr) -> TypeId {
        self.expr_facts.get(&expr_key(expr)).map_or(self.types.error, |f| f.ty)
    }

    pub fn expr_binding(&self, expr: &btrc_ir::ast::Expr) -> Option<Binding> {
        self.expr_facts.get(&expr_key(expr)).and_then(|f| f.binding)
    }
}

pub(crate) fn expr_key(expr: &btrc_ir::ast::Expr) -> usize {
    std::ptr::from_ref(expr) as usize
}

pub(crate) struct Analyzer<'a> {
    pub interner: &'a StringInterner,
    pub diagnostics: DiagnosticQueue,
    pub scopes: scope::ScopeArena,
    pub module_scope: ScopeId,
    pub result: SemaResult,
    /// Current loop nesting depth, for `break`/`continue` validity (not a
    /// spec-mandated diagnostic, but keeps the AST honest).
    pub loop_depth: u32,
    /// Return type of the function/method/lambda currently being checked.
    pub expected_return: Vec<TypeId>,
    /// Every `G<args>` use seen so far, deduplicated -- a plain `Vec` on
    /// `SemaResult` would record the same instantiation once per syntactic
    /// occurrence (each cast, field, parameter, ...) instead of once per
    /// distinct instantiation.
    pub generic_instances: generics::GenericInstanceSet,
}

/// Checks a whole module (spec.md §4.4). Returns the semantic model the IR
/// Generator consumes and the diagnostics accumulated along the way; the
/// caller proceeds to stage 5 only if `diagnostics.has_errors()` is false
/// (spec.md §7).
#[tracing::instrument(level = "debug", skip_all, fields(decls = program.decls.len()))]
pub fn check_module(program: &Program, interner: &StringInterner) -> (SemaResult, DiagnosticQueue) {
    let mut scopes = scope::ScopeArena::new();
    let module_scope = scopes.create(None, ScopeKind::Module, None);
    let mut analyzer = Analyzer {
        interner,
        diagnostics: DiagnosticQueue::new(),
        scopes,
        module_scope,
        result: SemaResult::default(),
        loop_depth: 0,
        expected_return: Vec::new(),
        generic_instances: generics::GenericInstanceSet::new(),
    };
    builtins::register(&mut analyzer);

    btrc_stack::ensure_sufficient_stack(|| {
        analyzer.pass1(program);
        if !analyzer.diagnostics.has_errors() {
            analyzer.pass2(program);
        }
    });

    class_info::build_vtables(&mut analyzer.result.classes);
    class_info::mark_cycle_capable(&mut analyzer.result.classes, &analyzer.result.types);

    let mut result = analyzer.result;
    result.generic_instances = analyzer.generic_instances.into_vec();
    tracing::debug!(
        classes = result.classes.len(),
        functions = result.functions.len(),
        errors = analyzer.diagnostics.has_errors(),
        "analysis complete"
    );
    (result, analyzer.diagnostics)
}
