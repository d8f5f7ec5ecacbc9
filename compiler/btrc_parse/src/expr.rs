//! Expression parsing: C-family precedence climbing plus the
//! source-language's disambiguations (spec.md §4.3).
//!
//! Precedence (high→low, per spec.md §4.3): postfix, prefix,
//! multiplicative, additive, shift, relational, equality, bitwise-AND,
//! bitwise-XOR, bitwise-OR, logical-AND, logical-OR, ternary,
//! null-coalesce. (Assignment is statement-level — see `stmt.rs` — since
//! the AST has no assignment-expression node.)

use btrc_ir::ast::{BinaryOp, Expr, Param, UnaryOp};
use btrc_ir::{TokenKind, Type};

use crate::{ParseErrorKind, Parser, PRIMITIVE_TYPE_WORDS};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Option<Expr> {
        let cond = self.parse_null_coalesce()?;
        if self.eat_operator("?") {
            let then_expr = self.parse_expression()?;
            self.expect_operator(":")?;
            let else_expr = self.parse_expression()?;
            let span = cond.span().merge(else_expr.span());
            return Some(Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                span,
            });
        }
        Some(cond)
    }

    fn parse_null_coalesce(&mut self) -> Option<Expr> {
        let mut left = self.parse_logical_or()?;
        while self.eat_operator("??") {
            let right = self.parse_logical_or()?;
            let span = left.span().merge(right.span());
            left = Expr::NullCoalesce { lhs: Box::new(left), rhs: Box::new(right), span };
        }
        Some(left)
    }

    fn parse_logical_or(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("||", BinaryOp::Or)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("&&", BinaryOp::And)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("|", BinaryOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("^", BinaryOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("&", BinaryOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(
            &[("<=", BinaryOp::Le), (">=", BinaryOp::Ge), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("<<", BinaryOp::Shl), (">>", BinaryOp::Shr)], Self::parse_range)
    }

    /// `a..b` (spec.md §3 "Range"); a stepped form is written as the
    /// ordinary call `range(a, b, step)` rather than special syntax.
    fn parse_range(&mut self) -> Option<Expr> {
        let start = self.parse_additive()?;
        if self.eat_operator("..") {
            let stop = self.parse_additive()?;
            let span = start.span().merge(stop.span());
            return Some(Expr::Range { start: Box::new(start), stop: Box::new(stop), step: None, span });
        }
        Some(start)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.parse_left_assoc_binary(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
            Self::parse_unary,
        )
    }

    fn parse_left_assoc_binary(
        &mut self,
        ops: &[(&str, BinaryOp)],
        mut next: impl FnMut(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for &(text, op) in ops {
                if self.is_operator(text) {
                    self.bump();
                    let right = next(self)?;
                    let span = left.span().merge(right.span());
                    left = Expr::Binary { op, lhs: Box::new(left), rhs: Box::new(right), span };
                    continue 'outer;
                }
            }
            break;
        }
        Some(left)
    }

    /// Prefix unary operators, then the cast disambiguation (spec.md
    /// §4.3): `(Type)expr` is a cast iff the parens enclose a
    /// syntactically valid type and the following token can start a
    /// unary expression.
    fn parse_unary(&mut self) -> Option<Expr> {
        let tok = self.peek();
        let prefix = if self.is_operator("-") {
            Some(UnaryOp::Neg)
        } else if self.is_operator("!") {
            Some(UnaryOp::Not)
        } else if self.is_operator("~") {
            Some(UnaryOp::BitNot)
        } else if self.is_operator("++") {
            Some(UnaryOp::PreInc)
        } else if self.is_operator("--") {
            Some(UnaryOp::PreDec)
        } else {
            None
        };
        if let Some(op) = prefix {
            self.bump();
            let operand = self.parse_unary()?;
            let span = tok.span.merge(operand.span());
            return Some(Expr::Unary { op, operand: Box::new(operand), span });
        }

        if self.is_operator("(") {
            if let Some(cast) = self.try_parse_cast() {
                return Some(cast);
            }
        }

        self.parse_postfix()
    }

    /// Trial-parses `(Type)` and commits to a cast only if a valid type
    /// was found and the token after `)` can start a unary expression.
    fn try_parse_cast(&mut self) -> Option<Expr> {
        let checkpoint = self.pos;
        let open = self.bump(); // "("
        let Some(ty) = self.parse_type() else {
            self.pos = checkpoint;
            return None;
        };
        if !self.eat_operator(")") {
            self.pos = checkpoint;
            return None;
        }
        if !self.can_start_unary() {
            self.pos = checkpoint;
            return None;
        }
        let operand = self.parse_unary()?;
        let span = open.span.merge(operand.span());
        Some(Expr::Cast { ty, operand: Box::new(operand), span })
    }

    fn can_start_unary(&self) -> bool {
        match self.peek().kind {
            TokenKind::Identifier
            | TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral
            | TokenKind::FStringLiteral => true,
            TokenKind::Operator(_) => {
                self.is_operator("(") || self.is_operator("-") || self.is_operator("!") || self.is_operator("~")
                    || self.is_operator("++") || self.is_operator("--")
            }
            TokenKind::Keyword(_) => {
                ["true", "false", "null", "this", "base", "new", "sizeof", "release"]
                    .contains(&self.text(self.peek()).as_str())
            }
            TokenKind::Eof => false,
        }
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_operator(".") {
                let (name, name_span) = self.expect_identifier()?;
                let span = expr.span().merge(name_span);
                expr = Expr::Member { base: Box::new(expr), name, is_arrow: false, is_null_safe: false, span };
            } else if self.eat_operator("->") {
                let (name, name_span) = self.expect_identifier()?;
                let span = expr.span().merge(name_span);
                expr = Expr::Member { base: Box::new(expr), name, is_arrow: true, is_null_safe: false, span };
            } else if self.eat_operator("?.") {
                let (name, name_span) = self.expect_identifier()?;
                let span = expr.span().merge(name_span);
                expr = Expr::Member { base: Box::new(expr), name, is_arrow: false, is_null_safe: true, span };
            } else if self.is_operator("[") {
                let open = self.bump();
                let index = self.parse_expression()?;
                let close_span = self.expect_operator("]").map_or(index.span(), |t| t.span);
                let span = expr.span().merge(open.span).merge(close_span);
                expr = Expr::Index { base: Box::new(expr), index: Box::new(index), span };
            } else if self.is_operator("(") {
                let (args, close_span) = self.parse_call_args()?;
                let span = expr.span().merge(close_span);
                expr = Expr::Call { callee: Box::new(expr), args, span };
            } else if self.is_operator("++") {
                let tok = self.bump();
                let span = expr.span().merge(tok.span);
                expr = Expr::Unary { op: UnaryOp::PostInc, operand: Box::new(expr), span };
            } else if self.is_operator("--") {
                let tok = self.bump();
                let span = expr.span().merge(tok.span);
                expr = Expr::Unary { op: UnaryOp::PostDec, operand: Box::new(expr), span };
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn parse_call_args(&mut self) -> Option<(Vec<Expr>, btrc_ir::Span)> {
        self.expect_operator("(")?;
        let mut args = Vec::new();
        if !self.is_operator(")") {
            args.push(self.parse_expression()?);
            while self.eat_operator(",") {
                args.push(self.parse_expression()?);
            }
        }
        let close = self.expect_operator(")")?;
        Some((args, close.span))
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::IntLiteral => {
                self.bump();
                let text = self.text(tok);
                let value = parse_int_literal(&text);
                Some(Expr::IntLit { value, span: tok.span })
            }
            TokenKind::FloatLiteral => {
                self.bump();
                let text = self.text(tok);
                let trimmed = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
                let value = trimmed.parse().unwrap_or(0.0);
                Some(Expr::FloatLit { value, span: tok.span })
            }
            TokenKind::CharLiteral => {
                self.bump();
                let text = self.text(tok);
                let value = parse_char_literal(&text);
                Some(Expr::CharLit { value, span: tok.span })
            }
            TokenKind::StringLiteral => {
                self.bump();
                let text = self.text(tok);
                let value = unescape(&text[1..text.len().saturating_sub(1)]);
                Some(Expr::StringLit { value, span: tok.span })
            }
            TokenKind::FStringLiteral => {
                self.bump();
                let text = self.text(tok);
                let chunks = self.parse_fstring_chunks(&text, tok.span);
                Some(Expr::FString { chunks, span: tok.span })
            }
            TokenKind::Identifier => self.parse_ident_primary(),
            TokenKind::Keyword(_) => self.parse_keyword_primary(),
            TokenKind::Operator(_) if self.is_operator("(") => self.parse_paren_form(),
            _ => {
                self.error_here(ParseErrorKind::ExpectedExpression);
                None
            }
        }
    }

    fn parse_ident_primary(&mut self) -> Option<Expr> {
        let tok = self.bump();
        let name = tok.lexeme;
        // Verbose lambda: `ReturnT identifier(params) { ... }` — recognized
        // when this identifier is immediately followed by another
        // identifier and then `(` (spec.md §4.3's third lambda form).
        if matches!(self.peek().kind, TokenKind::Identifier) && self.is_operator_n(1, "(") {
            return self.parse_verbose_lambda(Type::Primitive(name));
        }
        if let Some(_type_args) = self.try_parse_generic_call_name(name) {
            // Explicit call-site type arguments are accepted but not
            // retained on `Expr::Call` (which has no type-argument field);
            // monomorphization instead infers the instantiation from
            // argument/assignment types, same as an un-annotated call.
        }
        Some(Expr::Ident { name, span: tok.span })
    }

    fn parse_keyword_primary(&mut self) -> Option<Expr> {
        let tok = self.peek();
        let word = self.text(tok);
        match word.as_str() {
            "true" => {
                self.bump();
                Some(Expr::BoolLit { value: true, span: tok.span })
            }
            "false" => {
                self.bump();
                Some(Expr::BoolLit { value: false, span: tok.span })
            }
            "null" => {
                self.bump();
                Some(Expr::NullLit { span: tok.span })
            }
            "this" => {
                self.bump();
                Some(Expr::Ident { name: tok.lexeme, span: tok.span })
            }
            "base" => {
                self.bump();
                Some(Expr::Ident { name: tok.lexeme, span: tok.span })
            }
            "new" => self.parse_new(),
            "delete" => self.parse_delete(),
            "release" => self.parse_release(),
            "sizeof" => self.parse_sizeof(),
            // A primitive type keyword heading a verbose lambda
            // (`int add(int a, int b) { ... }`) or a cast already handled
            // by `try_parse_cast` — reaching here as a primary means a
            // verbose lambda with a primitive return type.
            _ if PRIMITIVE_TYPE_WORDS.contains(&word.as_str()) => {
                self.bump();
                if matches!(self.peek().kind, TokenKind::Identifier) && self.is_operator_n(1, "(") {
                    self.parse_verbose_lambda(Type::Primitive(tok.lexeme))
                } else {
                    self.error_at(ParseErrorKind::ExpectedExpression, tok.span);
                    None
                }
            }
            _ => {
                self.error_here(ParseErrorKind::ExpectedExpression);
                None
            }
        }
    }

    fn parse_new(&mut self) -> Option<Expr> {
        let start = self.bump(); // "new"
        let ty = self.parse_type()?;
        let (args, close_span) = self.parse_call_args()?;
        let span = start.span.merge(close_span);
        Some(Expr::New { ty, args, span })
    }

    fn parse_delete(&mut self) -> Option<Expr> {
        let start = self.bump(); // "delete"
        let operand = self.parse_unary()?;
        let span = start.span.merge(operand.span());
        Some(Expr::Delete { operand: Box::new(operand), span })
    }

    /// `release x` (spec.md §4.5): emits a release on `x` and zeroes the slot.
    fn parse_release(&mut self) -> Option<Expr> {
        let start = self.bump(); // "release"
        let operand = self.parse_unary()?;
        let span = start.span.merge(operand.span());
        Some(Expr::Release { operand: Box::new(operand), span })
    }

    fn parse_sizeof(&mut self) -> Option<Expr> {
        let start = self.bump(); // "sizeof"
        self.expect_operator("(")?;
        let ty = self.parse_type()?;
        let close = self.expect_operator(")")?;
        let span = start.span.merge(close.span);
        Some(Expr::SizeOf { ty, span })
    }

    /// Disambiguates, at `(`: arrow lambda, tuple literal, or grouping
    /// (spec.md §4.3: "a parenthesized list with `,` is a tuple... a
    /// single parenthesized type is grouping"; lambda forms).
    /// # Panics
    /// Never: the `elements.len() == 1` branch below only runs when
    /// `elements` has exactly one item.
    #[allow(clippy::unwrap_used)]
    fn parse_paren_form(&mut self) -> Option<Expr> {
        if let Some(lambda) = self.try_parse_arrow_lambda() {
            return Some(lambda);
        }

        let open = self.bump(); // "("
        let mut elements = Vec::new();
        if !self.is_operator(")") {
            elements.push(self.parse_expression()?);
            while self.eat_operator(",") {
                elements.push(self.parse_expression()?);
            }
        }
        let close = self.expect_operator(")")?;
        let span = open.span.merge(close.span);

        if elements.len() == 1 {
            Some(elements.into_iter().next().unwrap())
        } else {
            Some(Expr::TupleLit { elements, span })
        }
    }

    /// Trial-parses `(params) => expr` / `(params) => { ... }`.
    fn try_parse_arrow_lambda(&mut self) -> Option<Expr> {
        let checkpoint = self.pos;
        let open = self.bump(); // "("
        let Some(params) = self.try_parse_param_list() else {
            self.pos = checkpoint;
            return None;
        };
        if !self.eat_operator(")") || !self.eat_operator("=>") {
            self.pos = checkpoint;
            return None;
        }
        if self.is_operator("{") {
            let body = self.parse_block()?;
            let span = open.span.merge(body.last().map_or(open.span, btrc_ir::ast::Stmt::span));
            Some(Expr::LambdaBlock { params, body, span })
        } else {
            let body = self.parse_expression()?;
            let span = open.span.merge(body.span());
            Some(Expr::LambdaArrow { params, body: Box::new(body), span })
        }
    }

    fn parse_verbose_lambda(&mut self, _ret: Type) -> Option<Expr> {
        let (_name, name_span) = self.expect_identifier()?;
        self.expect_operator("(")?;
        let params = self.parse_param_list_body()?;
        self.expect_operator(")")?;
        let body = self.parse_block()?;
        let span = name_span.merge(body.last().map_or(name_span, btrc_ir::ast::Stmt::span));
        Some(Expr::LambdaBlock { params, body, span })
    }

    /// Trial: returns `None` (without consuming) if what follows `(` isn't
    /// a syntactically valid parameter list.
    fn try_parse_param_list(&mut self) -> Option<Vec<Param>> {
        let checkpoint = self.pos;
        match self.parse_param_list_body() {
            Some(params) => Some(params),
            None => {
                self.pos = checkpoint;
                None
            }
        }
    }

    fn parse_param_list_body(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        if self.is_operator(")") {
            return Some(params);
        }
        loop {
            let ty = self.parse_type()?;
            let (name, _span) = self.expect_identifier()?;
            let default_value = if self.eat_operator("=") { Some(self.parse_expression()?) } else { None };
            params.push(Param { name, ty, default_value, is_kept: false });
            if !self.eat_operator(",") {
                break;
            }
        }
        Some(params)
    }
}

fn parse_int_literal(text: &str) -> i64 {
    let trimmed = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        i64::from_str_radix(&hex.replace('_', ""), 16).unwrap_or(0)
    } else if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        i64::from_str_radix(&bin.replace('_', ""), 2).unwrap_or(0)
    } else if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        i64::from_str_radix(&oct.replace('_', ""), 8).unwrap_or(0)
    } else {
        trimmed.replace('_', "").parse().unwrap_or(0)
    }
}

fn parse_char_literal(text: &str) -> char {
    let inner = &text[1..text.len().saturating_sub(1)];
    let unescaped = unescape(inner);
    unescaped.chars().next().unwrap_or('\0')
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
