//! The tokenizer proper (spec.md §4.2): whitespace/comments, then the
//! longest operator prefix, then keyword-or-identifier, then a structural
//! literal class. A batched `DiagnosticQueue` collects lexer errors so one
//! malformed file reports every bad token instead of stopping at the
//! first.

use btrc_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use btrc_grammar::GrammarInfo;
use btrc_ir::{Name, Span, StringInterner, Token, TokenKind, TokenList};

use crate::cursor::Cursor;
use crate::literals::{self, NumberKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    grammar: &'a GrammarInfo,
    interner: &'a StringInterner,
    tokens: Vec<Token>,
    diagnostics: DiagnosticQueue,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, grammar: &'a GrammarInfo, interner: &'a StringInterner) -> Self {
        Lexer {
            cursor: Cursor::new(source),
            grammar,
            interner,
            tokens: Vec::new(),
            diagnostics: DiagnosticQueue::new(),
        }
    }

    /// Tokenizes the whole source, returning the token list and any
    /// accumulated diagnostics. Never fails outright: a malformed token is
    /// reported and scanning resumes at the next plausible boundary (spec.md
    /// §4.2), so the returned list is always `Eof`-terminated.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn tokenize(mut self) -> (TokenList, DiagnosticQueue) {
        loop {
            self.skip_trivia();
            if self.cursor.is_eof() {
                break;
            }
            self.scan_one();
        }
        let eof_span = Span::new(
            self.cursor.line(),
            self.cursor.col(),
            self.cursor.pos() as u32,
            self.cursor.pos() as u32,
        );
        self.tokens.push(Token::new(TokenKind::Eof, Name::EMPTY, eof_span));
        tracing::debug!(tokens = self.tokens.len(), errors = self.diagnostics.has_errors(), "tokenize complete");
        (TokenList::new(self.tokens), self.diagnostics)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.bump();
                }
                Some('/') if self.cursor.peek_at(1) == Some('/') => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('/') if self.cursor.peek_at(1) == Some('*') => {
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    /// Nested `/*...*/` block comments (spec.md §4.2 leaves this an
    /// implementer's choice; nesting makes commenting-out code containing
    /// comments safe, so btrc nests).
    fn skip_block_comment(&mut self) {
        let start_line = self.cursor.line();
        let start_col = self.cursor.col();
        let start_pos = self.cursor.pos();
        self.cursor.bump(); // '/'
        self.cursor.bump(); // '*'
        let mut depth = 1u32;
        while depth > 0 {
            match self.cursor.peek() {
                None => {
                    self.emit_error(
                        ErrorCode::L0005UnterminatedBlockComment,
                        Span::new(start_line, start_col, start_pos as u32, self.cursor.pos() as u32),
                        "unterminated block comment".to_string(),
                    );
                    return;
                }
                Some('/') if self.cursor.peek_at(1) == Some('*') => {
                    self.cursor.bump();
                    self.cursor.bump();
                    depth += 1;
                }
                Some('*') if self.cursor.peek_at(1) == Some('/') => {
                    self.cursor.bump();
                    self.cursor.bump();
                    depth -= 1;
                }
                Some(_) => {
                    self.cursor.bump();
                }
            }
        }
    }

    /// # Panics
    /// Never: `tokenize`'s loop checks `self.cursor.is_eof()` before every
    /// call, so the cursor always has a character to peek at here.
    #[allow(clippy::expect_used)]
    fn scan_one(&mut self) {
        let start_line = self.cursor.line();
        let start_col = self.cursor.col();
        let start_pos = self.cursor.pos();
        let c = self.cursor.peek().expect("scan_one called at EOF");

        let kind = if c.is_ascii_digit()
            || (c == '.' && self.cursor.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            self.scan_number_token(start_line, start_col)
        } else if c == '\'' {
            self.scan_char_token(start_line, start_col)
        } else if c == '"' {
            self.scan_string_token(start_line, start_col)
        } else if c == 'f' && self.cursor.peek_at(1) == Some('"') {
            self.scan_fstring_token(start_line, start_col)
        } else if is_ident_start(c) {
            self.cursor.eat_while(is_ident_continue);
            let text = self.cursor.slice_from(start_pos);
            match self.grammar.keyword_id(text) {
                Some(id) => Some(TokenKind::Keyword(id)),
                None => Some(TokenKind::Identifier),
            }
        } else if let Some(id) = self.match_operator() {
            Some(TokenKind::Operator(id))
        } else {
            self.cursor.bump();
            self.emit_error(
                ErrorCode::L0001MalformedToken,
                Span::new(start_line, start_col, start_pos as u32, self.cursor.pos() as u32),
                format!("unexpected character `{c}`"),
            );
            None
        };

        if let Some(kind) = kind {
            let text = self.cursor.slice_from(start_pos);
            let lexeme = self.interner.intern(text);
            let span = Span::new(start_line, start_col, start_pos as u32, self.cursor.pos() as u32);
            self.tokens.push(Token::new(kind, lexeme, span));
        }
    }

    fn scan_number_token(&mut self, line: u32, col: u32) -> Option<TokenKind> {
        let start_pos = self.cursor.pos();
        match literals::scan_number(&mut self.cursor) {
            Ok(NumberKind::Int) => Some(TokenKind::IntLiteral),
            Ok(NumberKind::Float) => Some(TokenKind::FloatLiteral),
            Err(reason) => {
                self.emit_error(
                    ErrorCode::L0001MalformedToken,
                    Span::new(line, col, start_pos as u32, self.cursor.pos() as u32),
                    reason.to_string(),
                );
                None
            }
        }
    }

    fn scan_char_token(&mut self, line: u32, col: u32) -> Option<TokenKind> {
        let start_pos = self.cursor.pos();
        match literals::scan_char(&mut self.cursor) {
            Ok(()) => Some(TokenKind::CharLiteral),
            Err(reason) => {
                self.emit_error(
                    ErrorCode::L0003UnterminatedChar,
                    Span::new(line, col, start_pos as u32, self.cursor.pos() as u32),
                    reason.to_string(),
                );
                None
            }
        }
    }

    fn scan_string_token(&mut self, line: u32, col: u32) -> Option<TokenKind> {
        let start_pos = self.cursor.pos();
        match literals::scan_string(&mut self.cursor) {
            Ok(()) => Some(TokenKind::StringLiteral),
            Err(reason) => {
                self.emit_error(
                    ErrorCode::L0002UnterminatedString,
                    Span::new(line, col, start_pos as u32, self.cursor.pos() as u32),
                    reason.to_string(),
                );
                None
            }
        }
    }

    fn scan_fstring_token(&mut self, line: u32, col: u32) -> Option<TokenKind> {
        let start_pos = self.cursor.pos();
        match literals::scan_fstring_body(&mut self.cursor) {
            Ok(()) => Some(TokenKind::FStringLiteral),
            Err(reason) => {
                self.emit_error(
                    ErrorCode::L0002UnterminatedString,
                    Span::new(line, col, start_pos as u32, self.cursor.pos() as u32),
                    reason.to_string(),
                );
                None
            }
        }
    }

    /// Tries the grammar's operator list (already longest-first, spec.md
    /// §4.1) against the cursor's remaining text, consuming on a match.
    fn match_operator(&mut self) -> Option<btrc_ir::OperatorId> {
        for op in self.grammar.operators() {
            if self.cursor.starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.cursor.bump();
                }
                return self.grammar.operator_id(op);
            }
        }
        None
    }

    fn emit_error(&mut self, code: ErrorCode, span: Span, message: String) {
        self.diagnostics.emit_error(Diagnostic::error(code, span, message));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_grammar::GrammarInfo;

    fn grammar() -> GrammarInfo {
        let text = std::fs::read_to_string(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../grammar/btrc.ebnf"),
        )
        .unwrap();
        GrammarInfo::parse(&text, "btrc.ebnf").unwrap()
    }

    fn lex(source: &str) -> (Vec<TokenKind>, Vec<String>) {
        let grammar = grammar();
        let interner = StringInterner::new();
        let (tokens, diags) = Lexer::new(source, &grammar, &interner).tokenize();
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags.into_vec());
        let kinds = tokens.tokens.iter().map(|t| t.kind).collect();
        let texts = tokens.tokens.iter().map(|t| interner.resolve(t.lexeme)).collect();
        (kinds, texts)
    }

    #[test]
    fn lexes_hello_world_tokens() {
        let (kinds, texts) = lex(r#"int main(){ print("hi"); return 0; }"#);
        assert!(kinds.contains(&TokenKind::StringLiteral));
        assert!(texts.iter().any(|t| t == "main"));
        assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn distinguishes_keyword_from_identifier() {
        let grammar = grammar();
        let interner = StringInterner::new();
        let (tokens, _) = Lexer::new("if iffy", &grammar, &interner).tokenize();
        assert!(matches!(tokens.tokens[0].kind, TokenKind::Keyword(_)));
        assert_eq!(tokens.tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn longest_operator_prefix_wins() {
        let grammar = grammar();
        let interner = StringInterner::new();
        let (tokens, _) = Lexer::new("a <<= b", &grammar, &interner).tokenize();
        let op_text = interner.resolve(tokens.tokens[1].lexeme);
        assert_eq!(op_text, "<<=");
    }

    #[test]
    fn unterminated_string_is_reported_and_recovered() {
        let grammar = grammar();
        let interner = StringInterner::new();
        let (_, diags) = Lexer::new("\"abc", &grammar, &interner).tokenize();
        assert!(diags.has_errors());
    }

    #[test]
    fn fstring_body_is_returned_raw_including_braces() {
        let grammar = grammar();
        let interner = StringInterner::new();
        let (tokens, diags) = Lexer::new(r#"f"hi {name}!""#, &grammar, &interner).tokenize();
        assert!(diags.is_empty());
        assert_eq!(tokens.tokens[0].kind, TokenKind::FStringLiteral);
        assert_eq!(interner.resolve(tokens.tokens[0].lexeme), r#"f"hi {name}!""#);
    }

    #[test]
    fn float_exponent_and_suffix_are_scanned() {
        let (kinds, texts) = lex("1.5e-3f");
        assert_eq!(kinds[0], TokenKind::FloatLiteral);
        assert_eq!(texts[0], "1.5e-3f");
    }

    #[test]
    fn hex_literal_is_an_int() {
        let (kinds, texts) = lex("0xFFu");
        assert_eq!(kinds[0], TokenKind::IntLiteral);
        assert_eq!(texts[0], "0xFFu");
    }
}
