//! `ClassInfo` and friends (spec.md §3 "ClassInfo"): the per-class facts
//! the IR Generator needs to lower a class to a struct + vtable without
//! re-deriving inheritance chains itself.

use rustc_hash::FxHashMap;

use btrc_ir::Name;

use crate::scope::Access;
use crate::types::TypeId;

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Name,
    pub ty: TypeId,
    pub access: Access,
    pub is_static: bool,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: Name,
    pub ret: TypeId,
    pub params: Vec<TypeId>,
    pub param_defaults: Vec<bool>,
    pub is_static: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub access: Access,
}

#[derive(Clone, Debug)]
pub struct CtorInfo {
    pub params: Vec<TypeId>,
    pub param_defaults: Vec<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ClassInfo {
    pub name: Name,
    pub superclass: Option<Name>,
    pub interfaces: Vec<Name>,
    pub type_params: Vec<Name>,
    /// Fields in declaration order, *own* fields only; the IR Generator
    /// prepends inherited fields itself by walking `superclass` (spec.md
    /// §4.5 "Class lowering").
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub ctors: Vec<CtorInfo>,
    pub has_dtor: bool,
    /// Vtable layout: method names in the order spec.md §4.5 "Vtable
    /// construction" assigns slots — inherited slots first (in the base's
    /// own order, overridden in place), then this class's newly
    /// introduced virtual methods appended.
    pub vtable: Vec<Name>,
    /// Whether this class's field-type graph can reach itself, making it
    /// eligible for cycle-collection helpers (spec.md §4.5, §4.6).
    pub is_cycle_capable: bool,
}

#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    pub name: Name,
    pub methods: Vec<MethodInfo>,
}

#[derive(Clone, Debug)]
pub struct EnumVariantInfo {
    pub name: Name,
    pub payload: Vec<TypeId>,
}

#[derive(Clone, Debug)]
pub struct EnumInfo {
    pub name: Name,
    pub variants: Vec<EnumVariantInfo>,
}

#[derive(Clone, Debug)]
pub struct StructInfo {
    pub name: Name,
    pub fields: Vec<FieldInfo>,
}

#[derive(Clone, Debug)]
pub struct FunctionInfo {
    pub name: Name,
    pub ret: TypeId,
    pub params: Vec<TypeId>,
    pub param_defaults: Vec<bool>,
    pub type_params: Vec<Name>,
}

/// Builds every class's vtable (spec.md §4.5 "Vtable construction") once
/// all classes have been registered, so a derived class can see its base's
/// already-built vtable regardless of declaration order.
/// # Panics
/// Never: `order` is built from `classes`'s own keys, so every name it
/// yields has an entry in `classes`.
#[allow(clippy::unwrap_used)]
pub fn build_vtables(classes: &mut FxHashMap<Name, ClassInfo>) {
    let order = topological_order(classes);
    for name in order {
        let base_vtable = classes[&name].superclass.and_then(|base| classes.get(&base)).map(|b| b.vtable.clone());
        let class = classes.get_mut(&name).unwrap();
        let mut vtable = base_vtable.unwrap_or_default();
        for method in &class.methods {
            if method.is_static {
                continue;
            }
            if !vtable.contains(&method.name) {
                vtable.push(method.name);
            }
        }
        class.vtable = vtable;
    }
}

/// Superclass-first ordering so `build_vtables` always processes a base
/// before its derived classes.
fn topological_order(classes: &FxHashMap<Name, ClassInfo>) -> Vec<Name> {
    let mut order = Vec::with_capacity(classes.len());
    let mut visited = FxHashMap::default();
    for &name in classes.keys() {
        visit(name, classes, &mut visited, &mut order);
    }
    order
}

fn visit(name: Name, classes: &FxHashMap<Name, ClassInfo>, visited: &mut FxHashMap<Name, bool>, order: &mut Vec<Name>) {
    if visited.contains_key(&name) {
        return;
    }
    visited.insert(name, true);
    if let Some(class) = classes.get(&name) {
        if let Some(base) = class.superclass {
            visit(base, classes, visited, order);
        }
    }
    order.push(name);
}

/// Detects classes whose field-type graph can reach themselves (spec.md
/// §4.5: "Classes detected (by type-graph analysis) to be capable of
/// forming reference cycles"). A class can reach a referenced class
/// through a plain class-typed field or through a generic field whose
/// arguments include a class type (e.g. `Vector<Node>`).
///
/// # Panics
/// Never: `names` is collected from `classes`'s own keys, so every `start`
/// it iterates has an entry in `classes`.
#[allow(clippy::unwrap_used)]
pub fn mark_cycle_capable(classes: &mut FxHashMap<Name, ClassInfo>, types: &crate::types::TypeTable) {
    let names: Vec<Name> = classes.keys().copied().collect();
    for &start in &names {
        let capable = reaches_self(start, start, classes, types, &mut FxHashMap::default());
        classes.get_mut(&start).unwrap().is_cycle_capable = capable;
    }
}

fn reaches_self(
    start: Name,
    current: Name,
    classes: &FxHashMap<Name, ClassInfo>,
    types: &crate::types::TypeTable,
    visiting: &mut FxHashMap<Name, bool>,
) -> bool {
    if visiting.contains_key(&current) {
        return false;
    }
    visiting.insert(current, true);
    let Some(class) = classes.get(&current) else { return false };
    for field in &class.fields {
        for referenced in referenced_classes(field.ty, types) {
            if referenced == start {
                return true;
            }
            if classes.contains_key(&referenced) && reaches_self(start, referenced, classes, types, visiting) {
                return true;
            }
        }
    }
    false
}

fn referenced_classes(ty: TypeId, types: &crate::types::TypeTable) -> Vec<Name> {
    use crate::types::CanonicalType;
    match types.get(ty) {
        CanonicalType::Declared(name) => vec![*name],
        CanonicalType::Nullable(inner) | CanonicalType::Pointer(inner) => referenced_classes(*inner, types),
        CanonicalType::Generic(name, args) => {
            let mut out = vec![*name];
            for a in args {
                out.extend(referenced_classes(*a, types));
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Walks `start`'s inheritance chain, returning `true` if `target` appears
/// (spec.md §3 "derived-to-base pointer" compatibility).
pub fn is_subclass_of(start: Name, target: Name, classes: &FxHashMap<Name, ClassInfo>) -> bool {
    let mut current = Some(start);
    while let Some(name) = current {
        if name == target {
            return true;
        }
        current = classes.get(&name).and_then(|c| c.superclass);
    }
    false
}

/// Whether `start` (directly or via an ancestor) implements `iface`
/// (spec.md §3 "interface satisfaction").
pub fn implements_interface(start: Name, iface: Name, classes: &FxHashMap<Name, ClassInfo>) -> bool {
    let mut current = Some(start);
    while let Some(name) = current {
        let Some(class) = classes.get(&name) else { return false };
        if class.interfaces.contains(&iface) {
            return true;
        }
        current = class.superclass;
    }
    false
}
