//! Statement parsing (spec.md §3 "Statements", §4.3).

use btrc_ir::ast::{AssignOp, CatchClause, Stmt, SwitchCase};
use btrc_ir::TokenKind;

use crate::{Parser, PRIMITIVE_TYPE_WORDS};

impl<'a> Parser<'a> {
    pub(crate) fn parse_block(&mut self) -> Option<Vec<Stmt>> {
        self.expect_operator("{")?;
        let mut body = Vec::new();
        while !self.is_operator("}") && !self.at_eof() {
            let before = self.pos;
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                    self.recover_to_stmt_boundary();
                }
            }
        }
        self.expect_operator("}")?;
        Some(body)
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        if self.is_operator("{") {
            let start = self.peek().span;
            let body = self.parse_block()?;
            let span = body.last().map_or(start, Stmt::span);
            return Some(Stmt::Block { body, span });
        }
        if self.is_keyword("var") {
            return self.parse_var_decl();
        }
        if self.is_keyword("if") {
            return self.parse_if();
        }
        if self.is_keyword("for") {
            return self.parse_for_or_for_in();
        }
        if self.is_keyword("while") {
            return self.parse_while();
        }
        if self.is_keyword("do") {
            return self.parse_do_while();
        }
        if self.is_keyword("switch") {
            return self.parse_switch();
        }
        if self.is_keyword("try") {
            return self.parse_try();
        }
        if self.is_keyword("throw") {
            return self.parse_throw();
        }
        if self.is_keyword("return") {
            return self.parse_return();
        }
        if self.is_keyword("break") {
            let tok = self.bump();
            self.expect_operator(";")?;
            return Some(Stmt::Break { span: tok.span });
        }
        if self.is_keyword("continue") {
            let tok = self.bump();
            self.expect_operator(";")?;
            return Some(Stmt::Continue { span: tok.span });
        }
        // A primitive-or-named type followed by an identifier and not `(`
        // is a typed local declaration (`int x = 1;`), indistinguishable
        // from `var` only in that the type is explicit rather than
        // `var`/inferred; both route through the same `VarDecl` node.
        if self.looks_like_typed_var_decl() {
            return self.parse_typed_var_decl();
        }
        self.parse_assign_or_expr_stmt()
    }

    fn looks_like_typed_var_decl(&self) -> bool {
        let is_type_start = matches!(self.peek().kind, TokenKind::Identifier)
            || (matches!(self.peek().kind, TokenKind::Keyword(_))
                && PRIMITIVE_TYPE_WORDS.contains(&self.text(self.peek()).as_str()));
        is_type_start && matches!(self.peek_n(1).kind, TokenKind::Identifier)
    }

    fn parse_var_decl(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "var"
        let (name, _span) = self.expect_identifier()?;
        self.expect_operator("=")?;
        let init = self.parse_expression()?;
        let end = self.expect_operator(";")?;
        Some(Stmt::VarDecl { name, ty: None, init, is_var: true, span: start.span.merge(end.span) })
    }

    fn parse_typed_var_decl(&mut self) -> Option<Stmt> {
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_identifier()?;
        self.expect_operator("=")?;
        let init = self.parse_expression()?;
        let end = self.expect_operator(";")?;
        Some(Stmt::VarDecl { name, ty: Some(ty), init, is_var: false, span: name_span.merge(end.span) })
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "if"
        self.expect_operator("(")?;
        let cond = self.parse_expression()?;
        self.expect_operator(")")?;
        let then_body = self.parse_block()?;
        let mut span = start.span.merge(then_body.last().map_or(start.span, Stmt::span));
        let else_body = if self.eat_keyword("else") {
            let body = if self.is_keyword("if") {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            };
            span = span.merge(body.last().map_or(span, Stmt::span));
            body
        } else {
            Vec::new()
        };
        Some(Stmt::If { cond, then_body, else_body, span })
    }

    /// Disambiguates C-style `for (init; cond; step)` from `for (x in it)`
    /// (spec.md §4.3): looks ahead past the opening `(` and an identifier
    /// for the `in` keyword.
    fn parse_for_or_for_in(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "for"
        self.expect_operator("(")?;

        if matches!(self.peek().kind, TokenKind::Identifier) && self.is_keyword_n(1, "in") {
            let (binding, _span) = self.expect_identifier()?;
            self.bump(); // "in"
            let iter = self.parse_expression()?;
            self.expect_operator(")")?;
            let body = self.parse_block()?;
            let span = start.span.merge(body.last().map_or(start.span, Stmt::span));
            return Some(Stmt::ForIn { binding, iter, body, span });
        }

        let init = if self.is_operator(";") {
            self.bump();
            None
        } else {
            Some(Box::new(self.parse_c_for_clause_stmt()?))
        };
        let cond = if self.is_operator(";") { None } else { Some(self.parse_expression()?) };
        self.expect_operator(";")?;
        let step = if self.is_operator(")") {
            None
        } else {
            Some(Box::new(self.parse_assign_or_expr_stmt_no_semi()?))
        };
        self.expect_operator(")")?;
        let body = self.parse_block()?;
        let span = start.span.merge(body.last().map_or(start.span, Stmt::span));
        Some(Stmt::CFor { init, cond, step, body, span })
    }

    /// The `for`-header init clause: a var decl or assignment/expr,
    /// terminated by the clause's own `;` (same grammar as a statement).
    fn parse_c_for_clause_stmt(&mut self) -> Option<Stmt> {
        if self.is_keyword("var") {
            return self.parse_var_decl();
        }
        if self.looks_like_typed_var_decl() {
            return self.parse_typed_var_decl();
        }
        self.parse_assign_or_expr_stmt()
    }

    /// Same as [`Self::parse_assign_or_expr_stmt`] but for the `for`
    /// header's step clause, which has no trailing `;`.
    fn parse_assign_or_expr_stmt_no_semi(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;
        if let Some(op) = self.match_assign_op() {
            let value = self.parse_expression()?;
            let span = expr.span().merge(value.span());
            return Some(Stmt::Assign { target: expr, op, value, span });
        }
        let span = expr.span();
        Some(Stmt::ExprStmt { value: expr, span })
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "while"
        self.expect_operator("(")?;
        let cond = self.parse_expression()?;
        self.expect_operator(")")?;
        let body = self.parse_block()?;
        let span = start.span.merge(body.last().map_or(start.span, Stmt::span));
        Some(Stmt::While { cond, body, span })
    }

    fn parse_do_while(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "do"
        let body = self.parse_block()?;
        self.expect_keyword("while")?;
        self.expect_operator("(")?;
        let cond = self.parse_expression()?;
        self.expect_operator(")")?;
        let end = self.expect_operator(";")?;
        Some(Stmt::DoWhile { body, cond, span: start.span.merge(end.span) })
    }

    fn parse_switch(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "switch"
        self.expect_operator("(")?;
        let subject = self.parse_expression()?;
        self.expect_operator(")")?;
        self.expect_operator("{")?;
        let mut cases = Vec::new();
        while !self.is_operator("}") && !self.at_eof() {
            cases.push(self.parse_switch_case()?);
        }
        let end = self.expect_operator("}")?;
        Some(Stmt::Switch { subject, cases, span: start.span.merge(end.span) })
    }

    fn parse_switch_case(&mut self) -> Option<SwitchCase> {
        let start = self.peek().span;
        let mut labels = Vec::new();
        let is_default;
        if self.eat_keyword("default") {
            is_default = true;
            self.expect_operator(":")?;
        } else {
            is_default = false;
            self.expect_keyword("case")?;
            labels.push(self.parse_expression()?);
            self.expect_operator(":")?;
            while self.is_keyword("case") {
                self.bump();
                labels.push(self.parse_expression()?);
                self.expect_operator(":")?;
            }
        }
        let mut body = Vec::new();
        while !self.is_keyword("case") && !self.is_keyword("default") && !self.is_operator("}") && !self.at_eof() {
            let before = self.pos;
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                    self.recover_to_stmt_boundary();
                }
            }
        }
        let span = start.merge(body.last().map_or(start, Stmt::span));
        Some(SwitchCase { labels, body, is_default, span })
    }

    fn parse_try(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "try"
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.is_keyword("catch") {
            catches.push(self.parse_catch_clause()?);
        }
        let finally_body = if self.eat_keyword("finally") { self.parse_block()? } else { Vec::new() };
        let last_span = finally_body
            .last()
            .map_or_else(|| catches.last().map(|c| c.span).unwrap_or(start.span), Stmt::span);
        Some(Stmt::Try { body, catches, finally_body, span: start.span.merge(last_span) })
    }

    fn parse_catch_clause(&mut self) -> Option<CatchClause> {
        let start = self.bump(); // "catch"
        self.expect_operator("(")?;
        let (ty, binding) = if matches!(self.peek().kind, TokenKind::Identifier)
            && matches!(self.peek_n(1).kind, TokenKind::Identifier)
        {
            let ty = self.parse_type()?;
            let (name, _span) = self.expect_identifier()?;
            (Some(ty), Some(name))
        } else if matches!(self.peek().kind, TokenKind::Identifier) {
            let (name, _span) = self.expect_identifier()?;
            (None, Some(name))
        } else {
            (None, None)
        };
        self.expect_operator(")")?;
        let body = self.parse_block()?;
        let span = start.span.merge(body.last().map_or(start.span, Stmt::span));
        Some(CatchClause { binding, ty, body, span })
    }

    fn parse_throw(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "throw"
        let value = self.parse_expression()?;
        let end = self.expect_operator(";")?;
        Some(Stmt::Throw { value, span: start.span.merge(end.span) })
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.bump(); // "return"
        let value = if self.is_operator(";") { None } else { Some(self.parse_expression()?) };
        let end = self.expect_operator(";")?;
        Some(Stmt::Return { value, span: start.span.merge(end.span) })
    }

    fn parse_assign_or_expr_stmt(&mut self) -> Option<Stmt> {
        let stmt = self.parse_assign_or_expr_stmt_no_semi()?;
        self.expect_operator(";")?;
        Some(stmt)
    }

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        const OPS: &[(&str, AssignOp)] = &[
            ("=", AssignOp::Assign),
            ("+=", AssignOp::AddAssign),
            ("-=", AssignOp::SubAssign),
            ("*=", AssignOp::MulAssign),
            ("/=", AssignOp::DivAssign),
            ("%=", AssignOp::ModAssign),
            ("&=", AssignOp::AndAssign),
            ("|=", AssignOp::OrAssign),
            ("^=", AssignOp::XorAssign),
            ("<<=", AssignOp::ShlAssign),
            (">>=", AssignOp::ShrAssign),
        ];
        for &(text, op) in OPS {
            if self.is_operator(text) {
                self.bump();
                return Some(op);
            }
        }
        None
    }
}
