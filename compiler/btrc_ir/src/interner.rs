//! String interner.
//!
//! btrc compiles one file per invocation on a single thread (spec.md §5), so
//! unlike a concurrent/incremental compiler's sharded interner this is a
//! plain `FxHashMap` + `Vec` pair behind a single `RwLock` — interior
//! mutability is still useful because the interner is threaded through
//! every pipeline stage by shared reference, but there is no concurrent
//! writer to shard against.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::name::Name;

struct Inner {
    map: FxHashMap<Box<str>, u32>,
    strings: Vec<Box<str>>,
}

impl Inner {
    fn new() -> Self {
        let mut strings = Vec::with_capacity(256);
        let mut map = FxHashMap::default();
        strings.push("".into());
        map.insert("".into(), 0u32);
        Self { map, strings }
    }

    fn intern(&mut self, s: &str) -> Name {
        if let Some(&idx) = self.map.get(s) {
            return Name::from_raw(idx);
        }
        let idx = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.map.insert(boxed, idx);
        Name::from_raw(idx)
    }

    fn lookup(&self, name: Name) -> Box<str> {
        self.strings[name.raw() as usize].clone()
    }
}

/// String interner, cheaply cloneable (an `Arc`-backed handle) for sharing
/// across pipeline stages.
#[derive(Clone)]
pub struct StringInterner {
    inner: Arc<RwLock<Inner>>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Inner::new())) }
    }

    /// Intern a string, returning its stable `Name`.
    pub fn intern(&self, s: &str) -> Name {
        self.inner.write().intern(s)
    }

    /// Resolve a `Name` back to its string contents.
    ///
    /// Returns an owned `String` rather than a borrowed `&str` since the
    /// lock cannot be held across the call boundary.
    pub fn resolve(&self, name: Name) -> String {
        self.inner.read().lookup(name).into_string()
    }
}

trait BoxStrExt {
    fn into_string(self) -> String;
}

impl BoxStrExt for Box<str> {
    fn into_string(self) -> String {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_interns_to_same_name() {
        let interner = StringInterner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_intern_to_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let interner = StringInterner::new();
        let name = interner.intern("ClassName_methodName");
        assert_eq!(interner.resolve(name), "ClassName_methodName");
    }

    #[test]
    fn empty_string_is_pre_interned_at_zero() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }
}
