//! IR Generator and IR Optimizer (spec.md §4.5, §4.6): stage 5 lowers a
//! checked `ast::Program` to an [`ir::Module`], monomorphizing every
//! generic/collection instantiation it finds along the way; stage 6 prunes
//! the helper-category set down to what's actually reachable.
//!
//! [`generate`] is the single entry point the driver (`btrc`'s CLI crate)
//! calls once the Analyzer has returned a clean [`SemaResult`].

pub mod helpers;
pub mod ir;
pub mod lower;
mod mangle;
mod monomorphize;
pub mod optimize;

use btrc_diagnostic::DiagnosticQueue;
use btrc_ir::ast::Program;
use btrc_ir::StringInterner;
use btrc_sema::SemaResult;

pub use lower::LowerCtx;

/// Lowers `program` to a fully monomorphized, helper-pruned [`ir::Module`]
/// (spec.md §4.5 "IR Generator", §4.6 "IR Optimizer"). `sema` must be the
/// clean result of `btrc_sema::check_module` -- callers are expected to
/// have already checked `diagnostics.has_errors()` is false before this
/// point (spec.md §7's pipeline never reaches stage 5 otherwise).
#[tracing::instrument(level = "debug", skip_all, fields(decls = program.decls.len()))]
pub fn generate(program: &Program, sema: &SemaResult, interner: &StringInterner, diagnostics: &mut DiagnosticQueue) -> ir::Module {
    let mut ctx = LowerCtx::new(sema, interner, diagnostics);
    let mut module = ir::Module::default();

    lower::lower_program(&mut ctx, program, &mut module);
    monomorphize::run(&mut ctx, &mut module);

    module.functions.extend(ctx.pending_functions.drain(..));
    module.globals.extend(ctx.pending_globals.drain(..));
    module.helpers.extend(ctx.helpers.iter().copied());

    tracing::debug!(
        functions = module.functions.len(),
        structs = module.structs.len(),
        helpers = module.helpers.len(),
        "lowered module before optimization"
    );

    optimize::optimize(&mut module);
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_diagnostic::DiagnosticQueue;

    fn analyze(src: &str) -> (Program, SemaResult, StringInterner) {
        let grammar_text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../../grammar/btrc.ebnf")).unwrap();
        let grammar = btrc_grammar::GrammarInfo::parse(&grammar_text, "btrc.ebnf").unwrap();
        let interner = StringInterner::new();
        let (tokens, _lex_diags) = btrc_lexer::Lexer::new(src, &grammar, &interner).tokenize();
        let (program, _parse_diags) = btrc_parse::parse(tokens, &grammar, &interner);
        let (sema, _diags) = btrc_sema::check_module(&program, &interner);
        (program, sema, interner)
    }

    #[test]
    fn generic_class_instantiation_is_lowered_once() {
        let src = "class Box<T> { T value; Box(T v) { value = v; } }\n\
                   void main() { var b = new Box<int>(1); }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let module = generate(&program, &sema, &interner, &mut diagnostics);
        let instances: Vec<_> = module.structs.iter().filter(|s| s.name.starts_with("Box_")).collect();
        assert_eq!(instances.len(), 1, "Box<int> should be lowered exactly once: {:?}", module.structs);
    }

    #[test]
    fn vector_for_in_reads_length_field() {
        let src = "void main() { var v = new Vector<int>(); for (x in v) { } }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let module = generate(&program, &sema, &interner, &mut diagnostics);
        assert!(module.structs.iter().any(|s| s.name.starts_with("Vector_")), "{:?}", module.structs);
        assert!(module.helpers.contains(&helpers::HelperCategory::Arc));
        let create = module.functions.iter().find(|f| f.name.ends_with("_create")).unwrap();
        let rendered = format!("{:?}", create.body);
        assert!(rendered.contains("__btrc_alloc"), "{rendered}");
    }

    #[test]
    fn capturing_lambda_gets_a_capture_slot_global() {
        let src = "void main() { var factor = 2; var f = (int x) => x * factor; }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let module = generate(&program, &sema, &interner, &mut diagnostics);
        assert!(module.globals.iter().any(|g| g.name.contains("_cap_")), "{:?}", module.globals);
        assert!(module.functions.iter().any(|f| f.name.starts_with("_lambda")), "{:?}", module.functions);
    }

    #[test]
    fn integer_division_goes_through_the_safe_div_helper() {
        let src = "int div(int a, int b) { return a / b; }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let module = generate(&program, &sema, &interner, &mut diagnostics);
        assert!(module.helpers.contains(&helpers::HelperCategory::SafeDiv));
        let body = module.functions.iter().find(|f| f.name == "div").unwrap().body.as_ref().unwrap();
        let rendered = format!("{body:?}");
        assert!(rendered.contains("__btrc_safe_div"), "{rendered}");
    }

    #[test]
    fn float_division_is_a_plain_c_operator() {
        let src = "float div(float a, float b) { return a / b; }\n";
        let (program, sema, interner) = analyze(src);
        let mut diagnostics = DiagnosticQueue::new();
        let module = generate(&program, &sema, &interner, &mut diagnostics);
        assert!(!module.helpers.contains(&helpers::HelperCategory::SafeDiv));
    }
}
