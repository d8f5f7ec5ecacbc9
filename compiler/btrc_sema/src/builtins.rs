//! Built-in symbols that exist without a source declaration: the free
//! function `print`, the `range` helper used in `for-in` loops, and the
//! built-in collection family (spec.md §4.5 "Built-in collections").

use btrc_ir::Name;

use crate::class_info::FunctionInfo;
use crate::scope::{ScopeKind, Symbol, SymbolKind};
use crate::types::CanonicalType;
use crate::Analyzer;

/// Names of the built-in generic collections, with their type-parameter
/// arity (spec.md §4.5: `Vector<T>`, `List<T>`, `Array<T>`, `Map<K,V>`,
/// `Set<T>`).
pub const BUILTIN_COLLECTIONS: &[(&str, usize)] =
    &[("Vector", 1), ("List", 1), ("Array", 1), ("Map", 2), ("Set", 1)];

pub fn is_builtin_collection(interner: &btrc_ir::StringInterner, name: Name) -> Option<usize> {
    let text = interner.resolve(name);
    BUILTIN_COLLECTIONS.iter().find(|(n, _)| *n == text).map(|(_, arity)| *arity)
}

pub(crate) fn register(analyzer: &mut Analyzer<'_>) {
    let str_ty = analyzer.result.types.str_;
    let void_ty = analyzer.result.types.void;
    let int_ty = analyzer.result.types.int;

    let print_name = analyzer.interner.intern("print");
    analyzer.result.functions.insert(
        print_name,
        FunctionInfo { name: print_name, ret: void_ty, params: vec![str_ty], param_defaults: vec![false], type_params: vec![] },
    );
    analyzer.scopes.declare(
        analyzer.module_scope,
        Symbol {
            name: print_name,
            kind: SymbolKind::Function,
            ty: void_ty,
            scope: analyzer.module_scope,
            access: None,
            defining_span: btrc_ir::Span::DUMMY,
        },
    );

    // `range(start, stop[, step])`, used as the iterable of a `for-in`
    // loop (spec.md §4.5 "Control flow lowering"). Modeled as a function
    // returning a synthetic `Range` declared type; the IR Generator
    // recognizes a `for-in` over a call to `range` structurally and
    // lowers it to a stepped C `for`, so no instance methods are needed
    // on this pseudo-type.
    let range_name = analyzer.interner.intern("range");
    let range_ty = analyzer.result.types.intern(CanonicalType::Declared(range_name));
    analyzer.result.functions.insert(
        range_name,
        FunctionInfo {
            name: range_name,
            ret: range_ty,
            params: vec![int_ty, int_ty, int_ty],
            param_defaults: vec![false, false, true],
            type_params: vec![],
        },
    );
    analyzer.scopes.declare(
        analyzer.module_scope,
        Symbol {
            name: range_name,
            kind: SymbolKind::Function,
            ty: range_ty,
            scope: analyzer.module_scope,
            access: None,
            defining_span: btrc_ir::Span::DUMMY,
        },
    );

    // Built-in collection generic names resolve as `Type` symbols so
    // `Vector<int> v;` type syntax resolves without a user `ClassDecl`.
    for &(name, _arity) in BUILTIN_COLLECTIONS {
        let interned = analyzer.interner.intern(name);
        let declared_ty = analyzer.result.types.intern(CanonicalType::Declared(interned));
        analyzer.scopes.declare(
            analyzer.module_scope,
            Symbol {
                name: interned,
                kind: SymbolKind::Type,
                ty: declared_ty,
                scope: analyzer.module_scope,
                access: None,
                defining_span: btrc_ir::Span::DUMMY,
            },
        );
    }
    let _ = ScopeKind::Module;
}
