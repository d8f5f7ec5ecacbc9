mod terminal;

pub use terminal::{ColorMode, TerminalEmitter};

use crate::Diagnostic;

/// Something that can render a batch of diagnostics.
pub trait DiagnosticEmitter {
    fn emit_all(&mut self, diagnostics: &[Diagnostic]);
}
