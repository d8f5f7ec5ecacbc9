//! Source-level type syntax (spec.md §3 "Types").
//!
//! This is the *syntactic* type written by the programmer (`Vector<int>`,
//! `Node?`, `(int, str)`, …), resolved by the Analyzer into `TypeId`s from
//! its `TypeTable`. Kept separate from the resolved semantic type so the
//! Parser can build it with zero knowledge of the type table.

use crate::name::Name;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    /// A primitive or user-declared name with no arguments (`int`, `Animal`).
    Primitive(Name),
    /// `T*`
    Pointer(Box<Type>),
    /// `T?`
    Nullable(Box<Type>),
    /// `Name<T1, …>`
    Generic(Name, Vec<Type>),
    /// `(T1, …) -> Tret`
    Function(Vec<Type>, Box<Type>),
    /// `(T1, …, Tn)`
    Tuple(Vec<Type>),
}

impl Type {
    pub const VOID: &'static str = "void";

    /// Strip one level of nullability, if present.
    pub fn underlying_if_nullable(&self) -> Option<&Type> {
        match self {
            Type::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    /// Wrap in a single level of nullability (`T` → `T?`; `T?` → `T?`).
    pub fn widen_to_nullable(self) -> Type {
        if self.is_nullable() {
            self
        } else {
            Type::Nullable(Box::new(self))
        }
    }
}
