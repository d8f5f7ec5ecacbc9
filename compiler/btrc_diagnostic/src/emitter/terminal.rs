//! Human-readable diagnostic output with optional ANSI color, in the same
//! spirit as a `rustc`-style "error[E0308]: message \n --> file:line:col"
//! rendering.

use std::io::{self, Write};

use crate::{Diagnostic, Severity};

use super::DiagnosticEmitter;

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const SECONDARY: &str = "\x1b[1;34m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Color output mode for the terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Renders diagnostics to any `Write`r, with an optional source snippet and
/// file path for `file:line:col` headers.
pub struct TerminalEmitter<'a, W: Write> {
    writer: W,
    colors: bool,
    source: Option<&'a str>,
    file_path: Option<&'a str>,
}

impl<'a, W: Write> TerminalEmitter<'a, W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter { writer, colors: mode.should_use_colors(is_tty), source: None, file_path: None }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_file_path(mut self, file_path: &'a str) -> Self {
        self.file_path = Some(file_path);
        self
    }

    fn color(&self, code: &str) -> &str {
        if self.colors { code } else { "" }
    }

    fn reset(&self) -> &str {
        self.color(colors::RESET)
    }

    fn emit_one(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        let (label, color) = match diagnostic.severity {
            Severity::Error => ("error", colors::ERROR),
            Severity::Warning => ("warning", colors::WARNING),
        };
        writeln!(
            self.writer,
            "{}{label}[{}]{}: {}{}{}",
            self.color(color),
            diagnostic.code,
            self.reset(),
            self.color(colors::BOLD),
            diagnostic.message,
            self.reset(),
        )?;
        let file_path = self.file_path.unwrap_or("<input>");
        writeln!(
            self.writer,
            "  {}-->{} {file_path}:{}:{}",
            self.color(colors::SECONDARY),
            self.reset(),
            diagnostic.span.line,
            diagnostic.span.col,
        )?;
        if let Some(source) = self.source {
            if let Some(line_text) = source.lines().nth((diagnostic.span.line.max(1) - 1) as usize) {
                writeln!(self.writer, "   |")?;
                writeln!(self.writer, "{:>3}| {line_text}", diagnostic.span.line)?;
                let caret_col = diagnostic.span.col.max(1) as usize;
                writeln!(self.writer, "   | {}^{}", " ".repeat(caret_col - 1), self.reset())?;
            }
        }
        for secondary in &diagnostic.labels {
            writeln!(
                self.writer,
                "  {}note{}: {} ({}:{})",
                self.color(colors::SECONDARY),
                self.reset(),
                secondary.message,
                secondary.span.line,
                secondary.span.col,
            )?;
        }
        writeln!(self.writer)
    }
}

impl<'a, W: Write> DiagnosticEmitter for TerminalEmitter<'a, W> {
    fn emit_all(&mut self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            // A write failure here (closed pipe, full disk) has nowhere
            // useful to propagate to from this interface; best-effort only.
            let _ = self.emit_one(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use btrc_ir::Span;

    #[test]
    fn emits_error_header_with_code() {
        let mut buf = Vec::new();
        {
            let mut emitter = TerminalEmitter::with_color_mode(&mut buf, ColorMode::Never, false);
            emitter.emit_all(&[Diagnostic::error(
                ErrorCode::S0001UnknownIdentifier,
                Span::new(3, 5, 10, 11),
                "unknown identifier `foo`",
            )]);
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("error[S0001]"));
        assert!(text.contains("unknown identifier `foo`"));
        assert!(text.contains("3:5"));
    }

    #[test]
    fn plain_mode_has_no_escape_codes() {
        let mut buf = Vec::new();
        {
            let mut emitter = TerminalEmitter::with_color_mode(&mut buf, ColorMode::Never, true);
            emitter.emit_all(&[Diagnostic::warning(ErrorCode::S0010NullDereferenceWarning, Span::DUMMY, "maybe null")]);
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains('\x1b'));
    }
}
