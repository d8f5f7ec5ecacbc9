//! Per-invocation diagnostic accumulator.
//!
//! A `DiagnosticQueue` is owned by one pipeline stage at a time (never a
//! process-wide global — spec.md §9 "Global mutable state"). Each stage
//! checks `has_errors()` before handing its output to the next stage
//! (spec.md §7: "The pipeline proceeds to the next stage only if no error
//! diagnostics were emitted in the current stage").

use crate::diagnostic::{Diagnostic, Severity};
use crate::guarantee::ErrorGuaranteed;

#[derive(Default, Debug)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error diagnostic, returning proof that it was emitted.
    pub fn emit_error(&mut self, diagnostic: Diagnostic) -> ErrorGuaranteed {
        debug_assert_eq!(diagnostic.severity, Severity::Error);
        self.diagnostics.push(diagnostic);
        ErrorGuaranteed::new_unchecked()
    }

    pub fn emit_warning(&mut self, diagnostic: Diagnostic) {
        debug_assert_eq!(diagnostic.severity, Severity::Warning);
        self.diagnostics.push(diagnostic);
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticQueue) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use btrc_ir::Span;

    #[test]
    fn empty_queue_has_no_errors() {
        let queue = DiagnosticQueue::new();
        assert!(!queue.has_errors());
    }

    #[test]
    fn warning_alone_does_not_block() {
        let mut queue = DiagnosticQueue::new();
        queue.emit_warning(Diagnostic::warning(ErrorCode::S0010NullDereferenceWarning, Span::DUMMY, "maybe null"));
        assert!(!queue.has_errors());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn error_blocks_progression() {
        let mut queue = DiagnosticQueue::new();
        queue.emit_error(Diagnostic::error(ErrorCode::S0001UnknownIdentifier, Span::DUMMY, "unknown `x`"));
        assert!(queue.has_errors());
    }
}
