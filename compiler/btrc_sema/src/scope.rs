//! Scopes and symbols (spec.md §3 "Symbol", "Scope").
//!
//! Scopes are held in a flat arena (`Vec<Scope>`) addressed by `ScopeId`
//! rather than linked by owning parent pointers, per spec.md §9's guidance
//! to avoid owning cycles — a child scope's parent is a non-owning index.

use rustc_hash::FxHashMap;

use btrc_ir::{Name, Span};

use crate::types::TypeId;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScopeId(u32);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Method,
    Block,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Field,
    Method,
    Function,
    Type,
    EnumVariant,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Access {
    Public,
    Private,
}

impl From<btrc_ir::ast::Access> for Access {
    fn from(a: btrc_ir::ast::Access) -> Self {
        match a {
            btrc_ir::ast::Access::Public => Access::Public,
            btrc_ir::ast::Access::Private => Access::Private,
        }
    }
}

/// A declared name (spec.md §3 "Symbol"). `defining_span` stands in for a
/// pointer to the defining AST node: it's enough for diagnostics and
/// duplicate-definition detection without an owning/back-reference into
/// the AST.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub ty: TypeId,
    pub scope: ScopeId,
    pub access: Option<Access>,
    pub defining_span: Span,
}

pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// The class this scope belongs to, for `Class`/`Method` scopes --
    /// lets method-body lookups fall through to class fields/methods
    /// without re-walking the inheritance chain at every lookup site.
    pub owning_class: Option<Name>,
    symbols: FxHashMap<Name, Symbol>,
}

/// Arena of all scopes created during analysis of one module.
#[derive(Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena { scopes: Vec::new() }
    }

    pub fn create(&mut self, parent: Option<ScopeId>, kind: ScopeKind, owning_class: Option<Name>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { parent, kind, owning_class, symbols: FxHashMap::default() });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Declares `symbol` in `scope`. Returns the previous symbol of the
    /// same name if one already existed in this exact scope (a duplicate
    /// definition — the caller decides whether that's an error).
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Option<Symbol> {
        self.scopes[scope.0 as usize].symbols.insert(symbol.name, symbol)
    }

    /// Looks up `name` starting at `scope` and walking the parent chain
    /// (spec.md §3 "Lookups walk parent chain").
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.0 as usize];
            if let Some(sym) = s.symbols.get(&name) {
                return Some(sym);
            }
            current = s.parent;
        }
        None
    }

    /// Looks up `name` declared directly in `scope`, with no parent walk —
    /// used for duplicate-definition checks.
    pub fn lookup_local(&self, scope: ScopeId, name: Name) -> Option<&Symbol> {
        self.scopes[scope.0 as usize].symbols.get(&name)
    }

    pub fn owning_class(&self, scope: ScopeId) -> Option<Name> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.0 as usize];
            if s.owning_class.is_some() {
                return s.owning_class;
            }
            current = s.parent;
        }
        None
    }
}
