//! Read-only AST visitor.
//!
//! Dispatch is by enum discriminant (a plain `match`), not virtual dispatch
//! — the node kind set is closed and only changes when `ast/btrc.asdl`
//! changes (spec.md §9). Default method bodies recurse into children so
//! implementors only override the node kinds they care about.

use crate::ast::{Decl, Expr, FStringChunk, Member, Program, Stmt};

pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        for decl in &program.decls {
            self.visit_decl(decl);
        }
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_member(&mut self, member: &Member) {
        walk_member(self, member);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(v: &mut V, decl: &Decl) {
    match decl {
        Decl::Class(c) => {
            for m in &c.members {
                v.visit_member(m);
            }
        }
        Decl::Function(f) => {
            for s in &f.body {
                v.visit_stmt(s);
            }
        }
        Decl::GlobalVar { init: Some(e), .. } => v.visit_expr(e),
        Decl::Interface(_)
        | Decl::Enum(_)
        | Decl::Struct(_)
        | Decl::Typedef { .. }
        | Decl::Extern { .. }
        | Decl::GlobalVar { .. }
        | Decl::Include { .. } => {}
    }
}

pub fn walk_member<V: Visitor + ?Sized>(v: &mut V, member: &Member) {
    match member {
        Member::Field { init: Some(e), .. } => v.visit_expr(e),
        Member::Field { init: None, .. } => {}
        Member::Method { body, .. } | Member::Ctor { body, .. } | Member::Dtor { body, .. } => {
            for s in body {
                v.visit_stmt(s);
            }
        }
        Member::Property { getter, setter, .. } => {
            for s in getter.iter().chain(setter) {
                v.visit_stmt(s);
            }
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl { init, .. } => v.visit_expr(init),
        Stmt::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Stmt::ExprStmt { value, .. } => v.visit_expr(value),
        Stmt::If { cond, then_body, else_body, .. } => {
            v.visit_expr(cond);
            for s in then_body.iter().chain(else_body) {
                v.visit_stmt(s);
            }
        }
        Stmt::CFor { init, cond, step, body, .. } => {
            if let Some(s) = init {
                v.visit_stmt(s);
            }
            if let Some(c) = cond {
                v.visit_expr(c);
            }
            if let Some(s) = step {
                v.visit_stmt(s);
            }
            for s in body {
                v.visit_stmt(s);
            }
        }
        Stmt::ForIn { iter, body, .. } => {
            v.visit_expr(iter);
            for s in body {
                v.visit_stmt(s);
            }
        }
        Stmt::While { cond, body, .. } => {
            v.visit_expr(cond);
            for s in body {
                v.visit_stmt(s);
            }
        }
        Stmt::DoWhile { body, cond, .. } => {
            for s in body {
                v.visit_stmt(s);
            }
            v.visit_expr(cond);
        }
        Stmt::Switch { subject, cases, .. } => {
            v.visit_expr(subject);
            for case in cases {
                for label in &case.labels {
                    v.visit_expr(label);
                }
                for s in &case.body {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::Try { body, catches, finally_body, .. } => {
            for s in body {
                v.visit_stmt(s);
            }
            for c in catches {
                for s in &c.body {
                    v.visit_stmt(s);
                }
            }
            for s in finally_body {
                v.visit_stmt(s);
            }
        }
        Stmt::Throw { value, .. } => v.visit_expr(value),
        Stmt::Return { value: Some(e), .. } => v.visit_expr(e),
        Stmt::Return { value: None, .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Block { body, .. } => {
            for s in body {
                v.visit_stmt(s);
            }
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::IntLit { .. }
        | Expr::FloatLit { .. }
        | Expr::CharLit { .. }
        | Expr::StringLit { .. }
        | Expr::BoolLit { .. }
        | Expr::NullLit { .. }
        | Expr::Ident { .. } => {}
        Expr::FString { chunks, .. } => {
            for chunk in chunks {
                if let FStringChunk::Interp { value, .. } = chunk {
                    v.visit_expr(value);
                }
            }
        }
        Expr::Member { base, .. } => v.visit_expr(base),
        Expr::Index { base, index, .. } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        Expr::Call { callee, args, .. } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Ternary { cond, then_expr, else_expr, .. } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::Cast { operand, .. } => v.visit_expr(operand),
        Expr::SizeOf { .. } => {}
        Expr::New { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Delete { operand, .. } => v.visit_expr(operand),
        Expr::Release { operand, .. } => v.visit_expr(operand),
        Expr::LambdaArrow { body, .. } => v.visit_expr(body),
        Expr::LambdaBlock { body, .. } => {
            for s in body {
                v.visit_stmt(s);
            }
        }
        Expr::TupleLit { elements, .. } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::TuplePattern { value, .. } => v.visit_expr(value),
        Expr::Range { start, stop, step, .. } => {
            v.visit_expr(start);
            v.visit_expr(stop);
            if let Some(s) = step {
                v.visit_expr(s);
            }
        }
        Expr::NullCoalesce { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    struct CountIdents(usize);
    impl Visitor for CountIdents {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr, Expr::Ident { .. }) {
                self.0 += 1;
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn counts_nested_idents() {
        let expr = Expr::Binary {
            op: crate::ast::BinaryOp::Add,
            lhs: Box::new(Expr::Ident { name: crate::name::Name::EMPTY, span: Span::DUMMY }),
            rhs: Box::new(Expr::Ident { name: crate::name::Name::EMPTY, span: Span::DUMMY }),
            span: Span::DUMMY,
        };
        let mut counter = CountIdents(0);
        counter.visit_expr(&expr);
        assert_eq!(counter.0, 2);
    }
}
