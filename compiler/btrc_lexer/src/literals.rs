//! Structural literal sub-scanners (spec.md §4.2): integer, float, char,
//! string, and the f-string raw-body scanner. Each function assumes the
//! cursor sits at the start of its literal and consumes exactly that
//! literal's text; the caller (the main scan loop in `lexer.rs`) records
//! the span and builds the token.

use crate::cursor::Cursor;

pub enum NumberKind {
    Int,
    Float,
}

/// Scans a decimal, `0x`, `0b`, or `0o` integer literal, or a float literal
/// (`d.d`, `.d`, `d.`, exponent form), with an optional alphabetic suffix.
/// The cursor must be positioned at the first digit (or `.` for a
/// leading-dot float).
pub fn scan_number(cursor: &mut Cursor) -> Result<NumberKind, &'static str> {
    let mut kind = NumberKind::Int;

    if cursor.peek() == Some('0') {
        if let Some(radix_char) = cursor.peek_at(1) {
            if matches!(radix_char, 'x' | 'X' | 'b' | 'B' | 'o' | 'O') {
                cursor.bump(); // '0'
                cursor.bump(); // radix marker
                let digits_consumed_start = cursor.pos();
                cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
                if cursor.pos() == digits_consumed_start {
                    return Err("radix-prefixed integer literal has no digits");
                }
                eat_suffix(cursor);
                return Ok(NumberKind::Int);
            }
        }
    }

    if cursor.peek() == Some('.') {
        // Leading-dot float: `.5`
        cursor.bump();
        let start = cursor.pos();
        cursor.eat_while(|c| c.is_ascii_digit());
        if cursor.pos() == start {
            return Err("malformed float literal: expected digits after `.`");
        }
        scan_exponent(cursor);
        eat_suffix(cursor);
        return Ok(NumberKind::Float);
    }

    cursor.eat_while(|c| c.is_ascii_digit());

    if cursor.peek() == Some('.') && cursor.peek_at(1) != Some('.') {
        // Guard against `1..5` range syntax being misread as `1.` `.5`.
        cursor.bump();
        kind = NumberKind::Float;
        cursor.eat_while(|c| c.is_ascii_digit());
    }

    if scan_exponent(cursor) {
        kind = NumberKind::Float;
    }

    eat_suffix(cursor);
    Ok(kind)
}

fn scan_exponent(cursor: &mut Cursor) -> bool {
    if matches!(cursor.peek(), Some('e' | 'E')) {
        let save_pos = cursor.pos();
        cursor.bump();
        if matches!(cursor.peek(), Some('+' | '-')) {
            cursor.bump();
        }
        let digits_start = cursor.pos();
        cursor.eat_while(|c| c.is_ascii_digit());
        if cursor.pos() == digits_start {
            // Not actually an exponent (e.g. identifier starting with `e`
            // immediately after digits is impossible since digits can't be
            // followed by an identifier start without a space, but guard
            // anyway by treating zero consumed digits as "not an exponent").
            let _ = save_pos;
            return false;
        }
        return true;
    }
    false
}

fn eat_suffix(cursor: &mut Cursor) {
    cursor.eat_while(|c| c.is_ascii_alphabetic());
}

/// Scans a single-quoted char literal with C escapes, consuming the
/// opening and closing quote.
pub fn scan_char(cursor: &mut Cursor) -> Result<(), &'static str> {
    cursor.bump(); // opening '
    match cursor.peek() {
        Some('\\') => {
            cursor.bump();
            if cursor.bump().is_none() {
                return Err("unterminated char literal escape");
            }
        }
        Some('\'') | None => return Err("empty char literal"),
        Some(_) => {
            cursor.bump();
        }
    }
    if cursor.peek() != Some('\'') {
        return Err("unterminated char literal");
    }
    cursor.bump();
    Ok(())
}

/// Scans a double-quoted string literal with C escapes, consuming the
/// opening and closing quote.
pub fn scan_string(cursor: &mut Cursor) -> Result<(), &'static str> {
    cursor.bump(); // opening "
    loop {
        match cursor.peek() {
            None | Some('\n') => return Err("unterminated string literal"),
            Some('"') => {
                cursor.bump();
                return Ok(());
            }
            Some('\\') => {
                cursor.bump();
                if cursor.bump().is_none() {
                    return Err("unterminated string literal escape");
                }
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
}

/// Scans an f-string's raw body: `f"..."`, including the `f` and `"`
/// delimiters but returning the raw text unparsed. Brace-nesting inside
/// `{...}` interpolations is tracked only enough to know a `"` inside one
/// does not end the f-string (spec.md §4.2: the parser re-lexes the body).
pub fn scan_fstring_body(cursor: &mut Cursor) -> Result<(), &'static str> {
    cursor.bump(); // 'f'
    cursor.bump(); // opening "
    let mut brace_depth: u32 = 0;
    loop {
        match cursor.peek() {
            None | Some('\n') if brace_depth == 0 => return Err("unterminated f-string literal"),
            None => return Err("unterminated f-string literal"),
            Some('"') if brace_depth == 0 => {
                cursor.bump();
                return Ok(());
            }
            Some('{') => {
                cursor.bump();
                if cursor.peek() == Some('{') {
                    cursor.bump(); // escaped `{{`
                } else {
                    brace_depth += 1;
                }
            }
            Some('}') if brace_depth > 0 => {
                cursor.bump();
                brace_depth -= 1;
            }
            Some('\\') if brace_depth == 0 => {
                cursor.bump();
                if cursor.bump().is_none() {
                    return Err("unterminated f-string literal escape");
                }
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
}
