//! C Emitter and Helper Registry for the btrc compiler (spec.md §4.7,
//! §4.8).
//!
//! [`emit`] walks an [`btrc_irgen::ir::Module`] exactly once, in the
//! order spec.md §4.7 fixes: preamble includes, standard helper
//! fragments for the module's live categories, type declarations
//! (struct forward-decls, typedefs, externs), function prototypes, type
//! definitions (full struct bodies, globals), then function definitions.
//! Struct bodies come after prototypes and before definitions because a
//! function signature only ever needs a struct's name (pointers and
//! by-name struct params don't need the full layout), while statements
//! inside a function body may need to size or index into one.

mod context;
mod decl;
mod expr;
mod helpers;
mod stmt;
mod types;

use btrc_irgen::ir::Module;
use context::EmitContext;

const PREAMBLE: &[&str] = &[
    "#include <stdio.h>",
    "#include <stdlib.h>",
    "#include <stddef.h>",
    "#include <string.h>",
    "#include <stdbool.h>",
    "#include <stdarg.h>",
    "#include <setjmp.h>",
];

/// Render a lowered, optimized [`Module`] to a complete C translation
/// unit.
#[must_use]
pub fn emit(module: &Module) -> String {
    let mut ctx = EmitContext::new();

    for line in PREAMBLE {
        ctx.writeln(line);
    }
    ctx.newline();

    for category in &module.helpers {
        helpers::emit(&mut ctx, *category);
    }

    for s in &module.structs {
        decl::render_struct_forward_decl(&mut ctx, s);
    }
    if !module.structs.is_empty() {
        ctx.newline();
    }

    for t in &module.typedefs {
        decl::render_typedef(&mut ctx, t);
    }
    if !module.typedefs.is_empty() {
        ctx.newline();
    }

    for e in &module.externs {
        decl::render_extern(&mut ctx, e);
    }
    if !module.externs.is_empty() {
        ctx.newline();
    }

    for f in &module.functions {
        decl::render_prototype(&mut ctx, f);
    }
    if !module.functions.is_empty() {
        ctx.newline();
    }

    for s in &module.structs {
        decl::render_struct_body(&mut ctx, s);
    }
    if !module.structs.is_empty() {
        ctx.newline();
    }

    for g in &module.globals {
        decl::render_global(&mut ctx, g);
    }
    if !module.globals.is_empty() {
        ctx.newline();
    }

    for f in &module.functions {
        if f.body.is_some() {
            decl::render_definition(&mut ctx, f);
            ctx.newline();
        }
    }

    ctx.take_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_irgen::helpers::HelperCategory;
    use btrc_irgen::ir::{Field, Function, Struct, Type};

    #[test]
    fn preamble_always_present() {
        let module = Module::default();
        let out = emit(&module);
        assert!(out.contains("#include <stdio.h>"));
        assert!(out.contains("#include <setjmp.h>"));
    }

    #[test]
    fn live_helper_fragments_are_emitted() {
        let mut module = Module::default();
        module.register_helper(HelperCategory::SafeDiv);
        let out = emit(&module);
        assert!(out.contains("__btrc_safe_div"));
        assert!(!out.contains("__btrc_exc_throw"));
    }

    #[test]
    fn struct_forward_decl_precedes_prototype_precedes_body_precedes_definition() {
        let mut module = Module::default();
        module.structs.push(Struct { name: "Counter".to_string(), fields: vec![Field { name: "n".to_string(), ty: Type::Int }] });
        module.functions.push(Function {
            name: "Counter_get".to_string(),
            ret: Type::Int,
            params: vec![Field { name: "self".to_string(), ty: Type::Struct("Counter".to_string()).ptr() }],
            body: Some(vec![]),
            is_static_linkage: false,
        });
        let out = emit(&module);
        let fwd = out.find("struct Counter;").unwrap();
        let proto = out.find("int Counter_get(").unwrap();
        let body_def = out.find("struct Counter {").unwrap();
        let def = out.rfind("int Counter_get(").unwrap();
        assert!(fwd < proto, "forward decl must precede the prototype");
        assert!(proto < body_def, "prototype must precede the full struct body");
        assert!(body_def < def, "struct body must precede the function definition");
        assert!(proto < def, "prototype must differ in position from the definition");
    }

    #[test]
    fn prototype_only_function_has_no_definition_emitted_twice() {
        let mut module = Module::default();
        module.functions.push(Function { name: "puts".to_string(), ret: Type::Int, params: vec![], body: None, is_static_linkage: false });
        let out = emit(&module);
        assert_eq!(out.matches("puts(").count(), 1);
    }
}
