//! Expression rendering (spec.md §4.7 "C Emitter": "each IR node has
//! exactly one textual rendering"). Every composite operand is
//! parenthesized at its use site regardless of the surrounding operator's
//! precedence -- the Emitter never reasons about precedence tables, it
//! just always wraps, which is correct (if occasionally noisy) C for any
//! nesting the IR Generator could have produced.

use btrc_irgen::ir::Expr;

use crate::types;

#[must_use]
pub fn render(expr: &Expr) -> String {
    match expr {
        Expr::IntLit(n) => n.to_string(),
        Expr::FloatLit(f) => format!("{f:?}f"),
        Expr::DoubleLit(f) => format!("{f:?}"),
        Expr::CharLit(c) => format!("'{}'", escape_char(*c)),
        Expr::StringLit(s) => format!("\"{}\"", escape_string(s)),
        Expr::BoolLit(b) => b.to_string(),
        Expr::NullLit => "NULL".to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Binary { op, lhs, rhs } => format!("({} {op} {})", render(lhs), render(rhs)),
        Expr::Unary { op, prefix: true, operand } => format!("({op}{})", render(operand)),
        Expr::Unary { op, prefix: false, operand } => format!("({}{op})", render(operand)),
        Expr::Call { callee, args } => {
            format!("{}({})", render(callee), args.iter().map(render).collect::<Vec<_>>().join(", "))
        }
        Expr::Member { base, field, arrow } => {
            let sep = if *arrow { "->" } else { "." };
            format!("{}{sep}{field}", render(base))
        }
        Expr::Index { base, index } => format!("{}[{}]", render(base), render(index)),
        Expr::Cast { ty, operand } => format!("(({}) {})", types::render(ty), render(operand)),
        Expr::Sizeof(ty) => format!("sizeof({})", types::render(ty)),
        Expr::Compound { ty, fields } => {
            let body = fields.iter().map(|(name, value)| format!(".{name} = {}", render(value))).collect::<Vec<_>>().join(", ");
            format!("(({}){{ {body} }})", types::render(ty))
        }
        Expr::Ternary { cond, then_expr, else_expr } => {
            format!("({} ? {} : {})", render(cond), render(then_expr), render(else_expr))
        }
        Expr::AddrOf(inner) => format!("(&{})", render(inner)),
        Expr::Deref(inner) => format!("(*{})", render(inner)),
    }
}

fn escape_char(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\0' => "\\0".to_string(),
        c => c.to_string(),
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_irgen::ir::Type;

    #[test]
    fn binary_is_fully_parenthesized() {
        let e = Expr::Binary { op: "+", lhs: Box::new(Expr::IntLit(1)), rhs: Box::new(Expr::IntLit(2)) };
        assert_eq!(render(&e), "(1 + 2)");
    }

    #[test]
    fn nested_binary_double_parenthesizes_safely() {
        let inner = Expr::Binary { op: "*", lhs: Box::new(Expr::IntLit(2)), rhs: Box::new(Expr::IntLit(3)) };
        let outer = Expr::Binary { op: "+", lhs: Box::new(Expr::IntLit(1)), rhs: Box::new(inner) };
        assert_eq!(render(&outer), "(1 + (2 * 3))");
    }

    #[test]
    fn string_literal_escapes_quotes_and_backslashes() {
        let e = Expr::StringLit("say \"hi\"\\n".to_string());
        assert_eq!(render(&e), "\"say \\\"hi\\\"\\\\n\"");
    }

    #[test]
    fn member_arrow_vs_dot() {
        let base = Expr::var("p");
        let dot = Expr::member(base.clone(), "x");
        let arrow = Expr::arrow(base, "x");
        assert_eq!(render(&dot), "p.x");
        assert_eq!(render(&arrow), "p->x");
    }

    #[test]
    fn compound_literal_renders_designated_initializers() {
        let e = Expr::Compound {
            ty: Type::Struct("Point".to_string()),
            fields: vec![("x".to_string(), Expr::IntLit(1)), ("y".to_string(), Expr::IntLit(2))],
        };
        assert_eq!(render(&e), "((struct Point){ .x = 1, .y = 2 })");
    }

    #[test]
    fn cast_wraps_type_in_parens() {
        let e = Expr::Cast { ty: Type::CString, operand: Box::new(Expr::var("p")) };
        assert_eq!(render(&e), "((char*) p)");
    }
}
