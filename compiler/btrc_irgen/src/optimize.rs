//! IR Optimizer (spec.md §4.6): a single pass over a lowered [`ir::Module`]
//! that prunes helper categories down to the transitively-reachable set.
//!
//! This is deliberately the *only* optimization stage 6 performs (spec.md
//! §4.6: "no dead-code elimination, no inlining, no constant folding --
//! the sole transformation is helper-category pruning"). Everything else
//! that might look like an optimization (monomorphization worklists,
//! ARC-elision) happens earlier, during lowering (stage 5), because those
//! decisions need source-level facts the IR no longer carries.

use crate::helpers::transitive_closure;
use crate::ir::Module;

/// Replaces `module.helpers` with the transitive closure of whatever
/// lowering already registered, per [`crate::helpers::HelperCategory::prerequisites`].
pub fn optimize(module: &mut Module) {
    let closure = transitive_closure(module.helpers.iter().copied());
    module.helpers = closure.into_iter().collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::HelperCategory;

    #[test]
    fn closure_is_transitive() {
        let mut module = Module::default();
        module.register_helper(HelperCategory::VectorOf);
        optimize(&mut module);
        assert!(module.helpers.contains(&HelperCategory::VectorOf));
        assert!(module.helpers.contains(&HelperCategory::Arc));
    }

    #[test]
    fn unreferenced_categories_are_pruned() {
        let mut module = Module::default();
        module.register_helper(HelperCategory::StringPool);
        optimize(&mut module);
        assert_eq!(module.helpers.len(), 1);
        assert!(!module.helpers.contains(&HelperCategory::Arc));
    }

    #[test]
    fn empty_module_stays_empty() {
        let mut module = Module::default();
        optimize(&mut module);
        assert!(module.helpers.is_empty());
    }
}
