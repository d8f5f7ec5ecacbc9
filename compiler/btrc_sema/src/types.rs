//! The resolved semantic type model (spec.md §3 "TypeTable").
//!
//! `ast::Type` is what the programmer wrote; `TypeId` is what it means once
//! declared names have been resolved against the symbol table. Canonical
//! types are interned so `TypeId` equality is an O(1) integer comparison,
//! the same discipline `btrc_ir::Name` uses for strings.

use rustc_hash::FxHashMap;

use btrc_ir::Name;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A resolved type. Unlike `ast::Type`, `Declared` carries a `Name` that is
/// guaranteed to resolve to a class/interface/enum/struct/typedef symbol
/// (or is the error sentinel).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum CanonicalType {
    Void,
    Int,
    Float,
    Double,
    Bool,
    Char,
    Str,
    /// The sentinel "error type" (spec.md §4.4, §7): propagates silently
    /// once assigned so a single bad expression doesn't cascade into a
    /// wall of follow-on diagnostics.
    Error,
    /// A declared class, interface, enum, or struct with no type arguments.
    Declared(Name),
    Nullable(TypeId),
    Pointer(TypeId),
    /// `Name<arg1, ...>` — a use of a generic class/interface/collection.
    Generic(Name, Vec<TypeId>),
    Function(Vec<TypeId>, TypeId),
    Tuple(Vec<TypeId>),
}

pub struct TypeTable {
    types: Vec<CanonicalType>,
    index: FxHashMap<CanonicalType, TypeId>,
    // Cached well-known ids, populated by `TypeTable::new`.
    pub void: TypeId,
    pub int: TypeId,
    pub float: TypeId,
    pub double: TypeId,
    pub bool_: TypeId,
    pub char_: TypeId,
    pub str_: TypeId,
    pub error: TypeId,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table =
            TypeTable {
                types: Vec::new(),
                index: FxHashMap::default(),
                void: TypeId(0),
                int: TypeId(0),
                float: TypeId(0),
                double: TypeId(0),
                bool_: TypeId(0),
                char_: TypeId(0),
                str_: TypeId(0),
                error: TypeId(0),
            };
        table.void = table.intern(CanonicalType::Void);
        table.int = table.intern(CanonicalType::Int);
        table.float = table.intern(CanonicalType::Float);
        table.double = table.intern(CanonicalType::Double);
        table.bool_ = table.intern(CanonicalType::Bool);
        table.char_ = table.intern(CanonicalType::Char);
        table.str_ = table.intern(CanonicalType::Str);
        table.error = table.intern(CanonicalType::Error);
        table
    }

    pub fn intern(&mut self, ty: CanonicalType) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.index.insert(ty.clone(), id);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &CanonicalType {
        &self.types[id.0 as usize]
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.get(id), CanonicalType::Error)
    }

    pub fn is_nullable(&self, id: TypeId) -> bool {
        matches!(self.get(id), CanonicalType::Nullable(_))
    }

    pub fn underlying_if_nullable(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            CanonicalType::Nullable(inner) => Some(*inner),
            _ => None,
        }
    }

    pub fn widen_to_nullable(&mut self, id: TypeId) -> TypeId {
        if self.is_nullable(id) {
            id
        } else {
            self.intern(CanonicalType::Nullable(id))
        }
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(self.get(id), CanonicalType::Int | CanonicalType::Float | CanonicalType::Double)
    }

    /// Numeric promotion rank: wider types have a higher rank. `int` widens
    /// to `float` widens to `double`, matching the C-family promotions
    /// spec.md §4.4 calls for.
    fn numeric_rank(&self, id: TypeId) -> Option<u8> {
        match self.get(id) {
            CanonicalType::Int => Some(0),
            CanonicalType::Float => Some(1),
            CanonicalType::Double => Some(2),
            _ => None,
        }
    }

    /// Declared-name this type resolves to, if it names a user type
    /// (plain or generic), for class-hierarchy/interface lookups.
    pub fn declared_name(&self, id: TypeId) -> Option<Name> {
        match self.get(id) {
            CanonicalType::Declared(name) | CanonicalType::Generic(name, _) => Some(*name),
            _ => None,
        }
    }

    /// Implicit-conversion compatibility (spec.md §3 TypeTable, §4.4):
    /// identity, nullable widening `T -> T?`, numeric promotion, and
    /// derived-to-base pointer / interface satisfaction (the latter two
    /// need the class hierarchy, so they're checked by the caller before
    /// falling back to this structural check).
    pub fn is_structurally_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || self.is_error(from) || self.is_error(to) {
            return true;
        }
        if let (Some(f), Some(t)) = (self.numeric_rank(from), self.numeric_rank(to)) {
            return f <= t;
        }
        match (self.get(from), self.get(to)) {
            (_, CanonicalType::Nullable(inner)) if *inner == from => true,
            (CanonicalType::Nullable(a), CanonicalType::Nullable(b)) => a == b,
            (CanonicalType::Generic(na, aa), CanonicalType::Generic(nb, ab)) => na == nb && aa == ab,
            (CanonicalType::Tuple(a), CanonicalType::Tuple(b)) => a == b,
            (CanonicalType::Pointer(a), CanonicalType::Pointer(b)) => a == b,
            _ => false,
        }
    }

    pub fn display(&self, id: TypeId, interner: &btrc_ir::StringInterner) -> String {
        match self.get(id) {
            CanonicalType::Void => "void".to_string(),
            CanonicalType::Int => "int".to_string(),
            CanonicalType::Float => "float".to_string(),
            CanonicalType::Double => "double".to_string(),
            CanonicalType::Bool => "bool".to_string(),
            CanonicalType::Char => "char".to_string(),
            CanonicalType::Str => "string".to_string(),
            CanonicalType::Error => "<error>".to_string(),
            CanonicalType::Declared(name) => interner.resolve(*name),
            CanonicalType::Nullable(inner) => format!("{}?", self.display(*inner, interner)),
            CanonicalType::Pointer(inner) => format!("{}*", self.display(*inner, interner)),
            CanonicalType::Generic(name, args) => {
                let args = args.iter().map(|a| self.display(*a, interner)).collect::<Vec<_>>().join(", ");
                format!("{}<{}>", interner.resolve(*name), args)
            }
            CanonicalType::Function(params, ret) => {
                let params = params.iter().map(|a| self.display(*a, interner)).collect::<Vec<_>>().join(", ");
                format!("({}) -> {}", params, self.display(*ret, interner))
            }
            CanonicalType::Tuple(elements) => {
                let elements = elements.iter().map(|a| self.display(*a, interner)).collect::<Vec<_>>().join(", ");
                format!("({elements})")
            }
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_canonical_type_interns_once() {
        let mut table = TypeTable::new();
        let a = table.intern(CanonicalType::Declared(Name::EMPTY));
        let b = table.intern(CanonicalType::Declared(Name::EMPTY));
        assert_eq!(a, b);
    }

    #[test]
    fn int_widens_to_double_but_not_reverse() {
        let table = TypeTable::new();
        assert!(table.is_structurally_assignable(table.int, table.double));
        assert!(!table.is_structurally_assignable(table.double, table.int));
    }

    #[test]
    fn t_widens_to_nullable_t() {
        let mut table = TypeTable::new();
        let nullable_int = table.widen_to_nullable(table.int);
        assert!(table.is_structurally_assignable(table.int, nullable_int));
    }
}
