//! F-string body parsing (spec.md §4.2, §4.3): the lexer returns the raw
//! `f"..."` text unparsed; splitting it into text/interpolation chunks and
//! re-lexing each `{...}` interpolation as a full expression is the
//! parser's job — "a nested mini-lexer re-entered on `{` with depth
//! tracking for braces."

use btrc_diagnostic::DiagnosticQueue;
use btrc_ir::ast::{Expr, FStringChunk};
use btrc_ir::Span;

use crate::{ParseErrorKind, Parser};

impl<'a> Parser<'a> {
    /// `raw` is the full literal text including the `f"` prefix and
    /// closing `"`.
    pub(crate) fn parse_fstring_chunks(&mut self, raw: &str, span: Span) -> Vec<FStringChunk> {
        let body = &raw[2..raw.len().saturating_sub(1)];
        let mut chunks = Vec::new();
        let mut text = String::new();
        let mut chars = body.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    if !text.is_empty() {
                        chunks.push(FStringChunk::Text(std::mem::take(&mut text)));
                    }
                    let start = i + c.len_utf8();
                    let Some(end) = find_interp_end(&mut chars) else {
                        self.error_at(ParseErrorKind::UnclosedDelimiter { delimiter: "{" }, span);
                        break;
                    };
                    let inner = &body[start..end];
                    let (expr_text, format_spec) = split_format_spec(inner);
                    let value = self.parse_subexpr(expr_text, span);
                    chunks.push(FStringChunk::Interp { value, format_spec });
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            chunks.push(FStringChunk::Text(text));
        }
        chunks
    }

    fn parse_subexpr(&mut self, text: &str, outer_span: Span) -> Expr {
        let (tokens, lex_diags) = btrc_lexer::Lexer::new(text, self.grammar, self.interner).tokenize();
        self.diagnostics.extend(lex_diags);
        let mut sub =
            Parser { tokens, pos: 0, interner: self.interner, grammar: self.grammar, diagnostics: DiagnosticQueue::new() };
        let expr = sub.parse_expression();
        self.diagnostics.extend(sub.diagnostics);
        expr.unwrap_or(Expr::NullLit { span: outer_span })
    }
}

/// Advances `chars` past a `{...}` interpolation body, tracking nested
/// braces and skipping brace characters inside a quoted string (so a
/// string literal argument like `{fmt("{}", x)}` doesn't confuse the
/// depth tracker). Returns the byte offset of the matching `}`.
fn find_interp_end(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<usize> {
    let mut depth = 1u32;
    let mut in_string = false;
    while let Some(&(j, c)) = chars.peek() {
        if in_string {
            chars.next();
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                chars.next();
            }
            '{' => {
                depth += 1;
                chars.next();
            }
            '}' => {
                depth -= 1;
                chars.next();
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {
                chars.next();
            }
        }
    }
    None
}

/// Splits `{expr:spec}` at the format-spec colon. Ambiguous with a
/// ternary's `cond ? a : b` (an Open Question per spec.md §9, not
/// resolved by the reference); btrc's documented simplest-legal choice: a
/// depth-0 `:` only introduces a format spec when no depth-0 `?` preceded
/// it in the same interpolation, since a format spec is never itself a
/// conditional expression.
fn split_format_spec(inner: &str) -> (&str, Option<String>) {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut seen_ternary = false;
    for (idx, c) in inner.char_indices() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '?' if depth == 0 => seen_ternary = true,
            ':' if depth == 0 && !seen_ternary => {
                return (&inner[..idx], Some(inner[idx + 1..].trim().to_string()));
            }
            _ => {}
        }
    }
    (inner, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_bare_interpolation_with_no_spec() {
        let (expr, spec) = split_format_spec("x");
        assert_eq!(expr, "x");
        assert_eq!(spec, None);
    }

    #[test]
    fn splits_format_spec_after_colon() {
        let (expr, spec) = split_format_spec("x:.2f");
        assert_eq!(expr, "x");
        assert_eq!(spec.as_deref(), Some(".2f"));
    }

    #[test]
    fn ternary_colon_is_not_mistaken_for_a_format_spec() {
        let (expr, spec) = split_format_spec("a ? b : c");
        assert_eq!(expr, "a ? b : c");
        assert_eq!(spec, None);
    }
}
