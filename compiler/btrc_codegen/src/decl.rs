//! Top-level declaration and definition rendering (spec.md §4.7 "C
//! Emitter"): struct bodies, typedefs, extern prototypes, globals, and
//! function prototypes/definitions.

use btrc_irgen::ir::{Extern, Function, Global, Struct, Typedef};

use crate::context::EmitContext;
use crate::expr;
use crate::stmt;
use crate::types;

pub fn render_struct_forward_decl(ctx: &mut EmitContext, s: &Struct) {
    ctx.writeln(&format!("struct {};", s.name));
}

pub fn render_struct_body(ctx: &mut EmitContext, s: &Struct) {
    ctx.writeln(&format!("struct {} {{", s.name));
    ctx.indent();
    for field in &s.fields {
        ctx.writeln(&format!("{};", types::render_declarator(&field.ty, &field.name)));
    }
    ctx.dedent();
    ctx.writeln("};");
}

pub fn render_typedef(ctx: &mut EmitContext, t: &Typedef) {
    ctx.writeln(&format!("typedef {};", types::render_declarator(&t.ty, &t.name)));
}

pub fn render_extern(ctx: &mut EmitContext, e: &Extern) {
    let params = if e.params.is_empty() {
        "void".to_string()
    } else {
        e.params.iter().map(types::render).collect::<Vec<_>>().join(", ")
    };
    ctx.writeln(&format!("extern {} {}({params});", types::render(&e.ret), e.name));
}

pub fn render_global(ctx: &mut EmitContext, g: &Global) {
    let decl = types::render_declarator(&g.ty, &g.name);
    match &g.init {
        Some(value) => ctx.writeln(&format!("{decl} = {};", expr::render(value))),
        None => ctx.writeln(&format!("{decl};")),
    }
}

fn signature(f: &Function) -> String {
    let params = if f.params.is_empty() {
        "void".to_string()
    } else {
        f.params.iter().map(|p| types::render_declarator(&p.ty, &p.name)).collect::<Vec<_>>().join(", ")
    };
    let linkage = if f.is_static_linkage { "static " } else { "" };
    format!("{linkage}{} {}({params})", types::render(&f.ret), f.name)
}

pub fn render_prototype(ctx: &mut EmitContext, f: &Function) {
    ctx.writeln(&format!("{};", signature(f)));
}

pub fn render_definition(ctx: &mut EmitContext, f: &Function) {
    let Some(body) = &f.body else {
        render_prototype(ctx, f);
        return;
    };
    ctx.writeln(&format!("{} {{", signature(f)));
    ctx.indent();
    stmt::render_block(ctx, body);
    ctx.dedent();
    ctx.writeln("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_irgen::ir::{Field, Type};

    #[test]
    fn struct_body_renders_each_field() {
        let mut ctx = EmitContext::new();
        let s = Struct {
            name: "Point".to_string(),
            fields: vec![Field { name: "x".to_string(), ty: Type::Int }, Field { name: "y".to_string(), ty: Type::Int }],
        };
        render_struct_body(&mut ctx, &s);
        assert_eq!(ctx.take_output(), "struct Point {\n    int x;\n    int y;\n};\n");
    }

    #[test]
    fn prototype_has_no_body() {
        let mut ctx = EmitContext::new();
        let f = Function { name: "main".to_string(), ret: Type::Int, params: vec![], body: None, is_static_linkage: false };
        render_prototype(&mut ctx, &f);
        assert_eq!(ctx.take_output(), "int main(void);\n");
    }

    #[test]
    fn static_linkage_gets_static_keyword() {
        let mut ctx = EmitContext::new();
        let f = Function {
            name: "Counter_new".to_string(),
            ret: Type::Struct("Counter".to_string()).ptr(),
            params: vec![],
            body: Some(vec![]),
            is_static_linkage: true,
        };
        render_definition(&mut ctx, &f);
        assert_eq!(ctx.take_output(), "static struct Counter* Counter_new(void) {\n}\n");
    }

    #[test]
    fn extern_with_no_params_uses_void() {
        let mut ctx = EmitContext::new();
        render_extern(&mut ctx, &Extern { name: "abort".to_string(), ret: Type::Void, params: vec![] });
        assert_eq!(ctx.take_output(), "extern void abort(void);\n");
    }
}
