//! Statement rendering (spec.md §4.7 "C Emitter").

use btrc_irgen::ir::{Stmt, SwitchCase};

use crate::context::EmitContext;
use crate::expr;
use crate::types;

pub fn render_block(ctx: &mut EmitContext, stmts: &[Stmt]) {
    for stmt in stmts {
        render(ctx, stmt);
    }
}

pub fn render(ctx: &mut EmitContext, stmt: &Stmt) {
    match stmt {
        Stmt::Assign { target, value } => {
            ctx.writeln(&format!("{} = {};", expr::render(target), expr::render(value)));
        }
        Stmt::VarDecl { name, ty, init } => {
            let decl = types::render_declarator(ty, name);
            match init {
                Some(value) => ctx.writeln(&format!("{decl} = {};", expr::render(value))),
                None => ctx.writeln(&format!("{decl};")),
            }
        }
        Stmt::If { cond, then_body, else_body } => {
            ctx.writeln(&format!("if ({}) {{", expr::render(cond)));
            ctx.indent();
            render_block(ctx, then_body);
            ctx.dedent();
            if else_body.is_empty() {
                ctx.writeln("}");
            } else {
                ctx.writeln("} else {");
                ctx.indent();
                render_block(ctx, else_body);
                ctx.dedent();
                ctx.writeln("}");
            }
        }
        Stmt::While { cond, body } => {
            ctx.writeln(&format!("while ({}) {{", expr::render(cond)));
            ctx.indent();
            render_block(ctx, body);
            ctx.dedent();
            ctx.writeln("}");
        }
        Stmt::For { init, cond, step, body } => {
            let init_text = init.as_deref().map(render_header_stmt).unwrap_or_default();
            let cond_text = cond.as_ref().map(expr::render).unwrap_or_default();
            let step_text = step.as_deref().map(render_header_stmt).unwrap_or_default();
            ctx.writeln(&format!("for ({init_text}; {cond_text}; {step_text}) {{"));
            ctx.indent();
            render_block(ctx, body);
            ctx.dedent();
            ctx.writeln("}");
        }
        Stmt::Switch { subject, cases } => {
            ctx.writeln(&format!("switch ({}) {{", expr::render(subject)));
            ctx.indent();
            for case in cases {
                render_case(ctx, case);
            }
            ctx.dedent();
            ctx.writeln("}");
        }
        Stmt::Return(None) => ctx.writeln("return;"),
        Stmt::Return(Some(value)) => ctx.writeln(&format!("return {};", expr::render(value))),
        Stmt::Break => ctx.writeln("break;"),
        Stmt::Continue => ctx.writeln("continue;"),
        Stmt::Block(body) => {
            ctx.writeln("{");
            ctx.indent();
            render_block(ctx, body);
            ctx.dedent();
            ctx.writeln("}");
        }
        Stmt::ExprStmt(e) => ctx.writeln(&format!("{};", expr::render(e))),
        Stmt::RawC(text) => {
            for line in text.lines() {
                ctx.writeln(line);
            }
        }
    }
}

fn render_case(ctx: &mut EmitContext, case: &SwitchCase) {
    if case.is_default {
        ctx.writeln("default:");
    } else {
        for label in &case.labels {
            ctx.writeln(&format!("case {}:", expr::render(label)));
        }
    }
    ctx.indent();
    render_block(ctx, &case.body);
    ctx.dedent();
}

/// A `for` loop's init/step clause has no trailing semicolon and no
/// indentation of its own -- it sits on the `for (...)` line itself.
fn render_header_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assign { target, value } => format!("{} = {}", expr::render(target), expr::render(value)),
        Stmt::VarDecl { name, ty, init } => {
            let decl = types::render_declarator(ty, name);
            match init {
                Some(value) => format!("{decl} = {}", expr::render(value)),
                None => decl,
            }
        }
        Stmt::ExprStmt(e) => expr::render(e),
        other => unreachable!("for-loop header stmt cannot be {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_irgen::ir::{Expr, Type};

    #[test]
    fn if_without_else_omits_the_else_branch() {
        let mut ctx = EmitContext::new();
        render(&mut ctx, &Stmt::If { cond: Expr::BoolLit(true), then_body: vec![Stmt::Break], else_body: vec![] });
        assert_eq!(ctx.take_output(), "if (true) {\n    break;\n}\n");
    }

    #[test]
    fn if_with_else_emits_both_branches() {
        let mut ctx = EmitContext::new();
        render(&mut ctx, &Stmt::If { cond: Expr::BoolLit(false), then_body: vec![Stmt::Break], else_body: vec![Stmt::Continue] });
        assert_eq!(ctx.take_output(), "if (false) {\n    break;\n} else {\n    continue;\n}\n");
    }

    #[test]
    fn var_decl_without_init_has_no_equals() {
        let mut ctx = EmitContext::new();
        render(&mut ctx, &Stmt::VarDecl { name: "x".to_string(), ty: Type::Int, init: None });
        assert_eq!(ctx.take_output(), "int x;\n");
    }

    #[test]
    fn for_loop_renders_header_on_one_line() {
        let mut ctx = EmitContext::new();
        let init = Some(Box::new(Stmt::VarDecl { name: "i".to_string(), ty: Type::Int, init: Some(Expr::IntLit(0)) }));
        let cond = Some(Expr::Binary { op: "<", lhs: Box::new(Expr::var("i")), rhs: Box::new(Expr::IntLit(10)) });
        let step = Some(Box::new(Stmt::Assign {
            target: Expr::var("i"),
            value: Expr::Binary { op: "+", lhs: Box::new(Expr::var("i")), rhs: Box::new(Expr::IntLit(1)) },
        }));
        render(&mut ctx, &Stmt::For { init, cond, step, body: vec![Stmt::Break] });
        assert_eq!(ctx.take_output(), "for (int i = 0; (i < 10); i = (i + 1)) {\n    break;\n}\n");
    }

    #[test]
    fn raw_c_passes_through_verbatim_per_line() {
        let mut ctx = EmitContext::new();
        render(&mut ctx, &Stmt::RawC("if (setjmp(buf) == 0) {\n__btrc_exc_pop();\n}".to_string()));
        assert_eq!(ctx.take_output(), "if (setjmp(buf) == 0) {\n__btrc_exc_pop();\n}\n");
    }

    #[test]
    fn switch_emits_case_labels_and_default() {
        let mut ctx = EmitContext::new();
        let cases = vec![
            SwitchCase { labels: vec![Expr::IntLit(0)], body: vec![Stmt::Break], is_default: false },
            SwitchCase { labels: vec![], body: vec![Stmt::Break], is_default: true },
        ];
        render(&mut ctx, &Stmt::Switch { subject: Expr::var("tag"), cases });
        assert_eq!(ctx.take_output(), "switch (tag) {\ncase 0:\n    break;\ndefault:\n    break;\n}\n");
    }
}
