//! Hand-written recursive-descent parser (spec.md §4.3). No parser
//! generator is used; the `@syntax` section of the grammar file is
//! documentation only (spec.md §4.1) and is not consulted here.
//!
//! Grammar rules are split one-file-per-family (`decl`, `stmt`, `expr`,
//! `types`, `fstring`), each contributing `impl<'a> Parser<'a>` blocks to
//! the [`Parser`] defined in this module — the same "mixin-style assembly"
//! spec.md §9 notes is a module-decomposition choice with no visible
//! behavior.

mod decl;
mod error;
mod expr;
mod fstring;
mod stmt;
mod types;

use btrc_diagnostic::{Diagnostic, DiagnosticQueue};
use btrc_grammar::GrammarInfo;
use btrc_ir::ast::Program;
use btrc_ir::{Span, StringInterner, Token, TokenKind, TokenList};

pub use error::ParseErrorKind;

/// Primitive type keywords (spec.md §3 "Types"). These lex as
/// `TokenKind::Keyword`, not `Identifier` — anywhere a type name is
/// expected, both token kinds must be accepted.
pub(crate) const PRIMITIVE_TYPE_WORDS: &[&str] = &["void", "int", "float", "double", "bool", "char", "string"];

pub struct Parser<'a> {
    tokens: TokenList,
    pos: usize,
    interner: &'a StringInterner,
    grammar: &'a GrammarInfo,
    diagnostics: DiagnosticQueue,
}

/// Parses a complete token stream into a [`Program`], batching diagnostics
/// rather than stopping at the first error (spec.md §4.3: panic-mode
/// recovery to the next statement/declaration boundary).
#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn parse(tokens: TokenList, grammar: &GrammarInfo, interner: &StringInterner) -> (Program, DiagnosticQueue) {
    let mut parser = Parser { tokens, pos: 0, interner, grammar, diagnostics: DiagnosticQueue::new() };
    let program = btrc_stack::ensure_sufficient_stack(|| parser.parse_program());
    tracing::debug!(decls = program.decls.len(), errors = parser.diagnostics.has_errors(), "parse complete");
    (program, parser.diagnostics)
}

impl<'a> Parser<'a> {
    fn parse_program(&mut self) -> Program {
        let mut decls = Vec::new();
        while !self.at_eof() {
            let before = self.pos;
            match self.parse_decl() {
                Some(decl) => decls.push(decl),
                None => {
                    if self.pos == before {
                        // No progress was made; force it to avoid looping
                        // forever on a token no production accepts.
                        self.bump();
                    }
                    self.recover_to_decl_boundary();
                }
            }
        }
        Program { decls }
    }

    // ---- token-stream primitives -------------------------------------

    fn peek(&self) -> Token {
        self.tokens.get(self.pos)
    }

    fn peek_n(&self, n: usize) -> Token {
        self.tokens.get(self.pos + n)
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn text(&self, tok: Token) -> String {
        self.interner.resolve(tok.lexeme)
    }

    fn describe(&self, tok: Token) -> String {
        match tok.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Identifier => format!("identifier `{}`", self.text(tok)),
            _ => format!("`{}`", self.text(tok)),
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Keyword(_)) && self.text(self.peek()) == word
    }

    fn is_keyword_n(&self, n: usize, word: &str) -> bool {
        let tok = self.peek_n(n);
        matches!(tok.kind, TokenKind::Keyword(_)) && self.text(tok) == word
    }

    fn is_operator(&self, op: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Operator(_)) && self.text(self.peek()) == op
    }

    fn is_operator_n(&self, n: usize, op: &str) -> bool {
        let tok = self.peek_n(n);
        matches!(tok.kind, TokenKind::Operator(_)) && self.text(tok) == op
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.is_keyword(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: &str) -> bool {
        if self.is_operator(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: &str) -> Option<Token> {
        if self.is_operator(op) {
            Some(self.bump())
        } else {
            self.error_here(ParseErrorKind::UnexpectedToken {
                expected: format!("`{op}`"),
                found: self.describe(self.peek()),
            });
            None
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Option<Token> {
        if self.is_keyword(word) {
            Some(self.bump())
        } else {
            self.error_here(ParseErrorKind::UnexpectedToken {
                expected: format!("`{word}`"),
                found: self.describe(self.peek()),
            });
            None
        }
    }

    fn expect_identifier(&mut self) -> Option<(btrc_ir::Name, Span)> {
        let tok = self.peek();
        if matches!(tok.kind, TokenKind::Identifier) {
            self.bump();
            Some((tok.lexeme, tok.span))
        } else {
            self.error_here(ParseErrorKind::ExpectedIdentifier { found: self.describe(tok) });
            None
        }
    }

    /// A type name: either a declared name (`Identifier`) or one of the
    /// primitive type keywords (`int`, `bool`, ...). See
    /// [`PRIMITIVE_TYPE_WORDS`].
    fn expect_type_name(&mut self) -> Option<(btrc_ir::Name, Span)> {
        let tok = self.peek();
        let is_primitive_keyword =
            matches!(tok.kind, TokenKind::Keyword(_)) && PRIMITIVE_TYPE_WORDS.contains(&self.text(tok).as_str());
        if matches!(tok.kind, TokenKind::Identifier) || is_primitive_keyword {
            self.bump();
            Some((tok.lexeme, tok.span))
        } else {
            self.error_here(ParseErrorKind::ExpectedType);
            None
        }
    }

    fn error_here(&mut self, kind: ParseErrorKind) {
        let span = self.peek().span;
        self.diagnostics.emit_error(kind.into_diagnostic(span));
    }

    fn error_at(&mut self, kind: ParseErrorKind, span: Span) {
        self.diagnostics.emit_error(kind.into_diagnostic(span));
    }

    /// Panic-mode recovery: skip to the next `;`, matching `}`, or a token
    /// that starts a new top-level declaration (spec.md §4.3).
    fn recover_to_decl_boundary(&mut self) {
        while !self.at_eof() {
            if self.is_operator(";") {
                self.bump();
                return;
            }
            if self.is_operator("}") {
                self.bump();
                return;
            }
            if self.starts_decl() {
                return;
            }
            self.bump();
        }
    }

    /// Panic-mode recovery to the next statement boundary (spec.md §4.3).
    fn recover_to_stmt_boundary(&mut self) {
        let mut depth = 0i32;
        while !self.at_eof() {
            if self.is_operator("{") {
                depth += 1;
                self.bump();
                continue;
            }
            if self.is_operator("}") {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                self.bump();
                continue;
            }
            if depth == 0 && self.is_operator(";") {
                self.bump();
                return;
            }
            self.bump();
        }
    }

    fn starts_decl(&self) -> bool {
        const DECL_KEYWORDS: &[&str] =
            &["class", "interface", "enum", "struct", "typedef", "extern", "include", "var", "void"];
        matches!(self.peek().kind, TokenKind::Keyword(_))
            && DECL_KEYWORDS.contains(&self.text(self.peek()).as_str())
            || matches!(self.peek().kind, TokenKind::Identifier)
    }
}
