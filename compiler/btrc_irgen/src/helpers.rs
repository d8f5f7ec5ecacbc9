//! The Helper Registry's category taxonomy (spec.md §4.8 "Runtime Helper
//! Registry") and its inter-category prerequisite graph.
//!
//! This crate owns the *names* and *dependency edges* because stage 6, the
//! IR Optimizer's dead-helper pass (spec.md §4.6), needs the graph to
//! compute a transitive closure before any C text exists. `btrc_codegen`
//! depends on this crate and maps each category to the actual helper
//! fragment text (kept downstream so the emitter crate, not this one,
//! owns C source strings).

use rustc_hash::FxHashSet;

/// One named family of runtime support code (spec.md §4.8: "a fixed
/// catalogue of helper categories, each a self-contained C source
/// fragment"). Ordered so that `BTreeSet`/`Ord`-based containers give a
/// stable, human-sensible emission order (ARC and the safe-division check
/// first, then the trial-deletion cycle collector that rides on top of ARC,
/// then containers, then formatting/exceptions last).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum HelperCategory {
    Arc,
    ArcCycle,
    SafeDiv,
    VectorOf,
    ListOf,
    ArrayOf,
    MapOf,
    SetOf,
    FStringFormat,
    ExceptionUnwind,
    StringPool,
}

impl HelperCategory {
    /// Categories that must be emitted before this one (spec.md §4.8:
    /// "helper fragments may depend on other helper fragments; the
    /// registry resolves this as a prerequisite list, not a generic
    /// include graph"). Containers all need ARC for their element
    /// retain/release hooks; f-string formatting needs the string pool to
    /// build its result; exception unwinding needs the string pool for
    /// the `what()` message buffer.
    #[must_use]
    pub fn prerequisites(self) -> &'static [HelperCategory] {
        match self {
            HelperCategory::Arc | HelperCategory::StringPool | HelperCategory::SafeDiv => &[],
            HelperCategory::ArcCycle => &[HelperCategory::Arc],
            HelperCategory::VectorOf
            | HelperCategory::ListOf
            | HelperCategory::ArrayOf
            | HelperCategory::MapOf
            | HelperCategory::SetOf => &[HelperCategory::Arc],
            HelperCategory::FStringFormat => &[HelperCategory::StringPool],
            HelperCategory::ExceptionUnwind => &[HelperCategory::StringPool],
        }
    }
}

/// Expands `roots` to the transitively-reachable set over
/// [`HelperCategory::prerequisites`] (spec.md §4.6: "the Optimizer
/// computes the reachable closure of helper categories and discards the
/// rest -- the one optimization this system performs").
#[must_use]
pub fn transitive_closure(roots: impl IntoIterator<Item = HelperCategory>) -> FxHashSet<HelperCategory> {
    let mut closure = FxHashSet::default();
    let mut worklist: Vec<HelperCategory> = roots.into_iter().collect();
    while let Some(category) = worklist.pop() {
        if closure.insert(category) {
            worklist.extend(category.prerequisites().iter().copied());
        }
    }
    closure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_transitive() {
        let closure = transitive_closure([HelperCategory::VectorOf]);
        assert!(closure.contains(&HelperCategory::VectorOf));
        assert!(closure.contains(&HelperCategory::Arc));
        assert!(!closure.contains(&HelperCategory::MapOf));
    }

    #[test]
    fn arc_cycle_pulls_in_arc() {
        let closure = transitive_closure([HelperCategory::ArcCycle]);
        assert!(closure.contains(&HelperCategory::Arc));
    }

    #[test]
    fn fstring_pulls_in_string_pool() {
        let closure = transitive_closure([HelperCategory::FStringFormat]);
        assert!(closure.contains(&HelperCategory::StringPool));
    }

    #[test]
    fn empty_roots_close_to_empty() {
        let closure = transitive_closure([]);
        assert!(closure.is_empty());
    }
}
