//! `GenericInstance` collection (spec.md §3, §4.4 "Generic instance
//! collection"): every use of `G<T1,...>` found during analysis is
//! recorded once, deduplicated by structural equality of the argument
//! tuple, so stage 5 monomorphization has a closed starting work list.

use rustc_hash::FxHashSet;

use btrc_ir::Name;

use crate::types::TypeId;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct GenericInstance {
    pub generic_name: Name,
    pub args: Vec<TypeId>,
}

#[derive(Default)]
pub struct GenericInstanceSet {
    seen: FxHashSet<GenericInstance>,
    ordered: Vec<GenericInstance>,
}

impl GenericInstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a use of `generic_name<args>`. Returns `true` if this was a
    /// new instance (not previously recorded).
    pub fn record(&mut self, generic_name: Name, args: Vec<TypeId>) -> bool {
        let instance = GenericInstance { generic_name, args };
        if self.seen.insert(instance.clone()) {
            self.ordered.push(instance);
            true
        } else {
            false
        }
    }

    pub fn instances(&self) -> &[GenericInstance] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<GenericInstance> {
        self.ordered
    }
}
