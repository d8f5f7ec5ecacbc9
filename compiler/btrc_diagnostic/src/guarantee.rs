//! Type-level proof that an error was actually emitted.
//!
//! Functions that detect an error condition but can't usefully continue can
//! return `Result<T, ErrorGuaranteed>` instead of a bare error type; the
//! only way to construct an `ErrorGuaranteed` is through
//! `DiagnosticQueue::emit_error`, so the type itself documents "a diagnostic
//! was queued for this" at every call site that handles the `Err` case.

/// Proof that at least one error diagnostic was emitted on the queue that
/// produced this value. Carries no data — it exists purely for the
/// type-level guarantee.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// Only `DiagnosticQueue` may construct one of these.
    pub(crate) fn new_unchecked() -> Self {
        ErrorGuaranteed(())
    }
}
