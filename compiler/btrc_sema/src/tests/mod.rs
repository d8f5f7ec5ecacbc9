//! Tests for the semantic analyzer.

mod class_tests;
mod function_tests;
mod generic_tests;
mod literal_tests;

use btrc_diagnostic::{DiagnosticQueue, ErrorCode};
use btrc_grammar::GrammarInfo;
use btrc_ir::StringInterner;

use crate::SemaResult;

fn grammar() -> GrammarInfo {
    let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../../grammar/btrc.ebnf")).unwrap();
    GrammarInfo::parse(&text, "btrc.ebnf").unwrap()
}

/// Runs a source string through the full lex -> parse -> analyze pipeline.
/// Panics if lexing or parsing itself reports an error, since a malformed
/// fixture isn't testing the analyzer at all.
fn check_source(source: &str) -> (SemaResult, DiagnosticQueue) {
    let grammar = grammar();
    let interner = StringInterner::new();
    let (tokens, lex_diags) = btrc_lexer::Lexer::new(source, &grammar, &interner).tokenize();
    assert!(lex_diags.is_empty(), "unexpected lexer diagnostics: {:?}", lex_diags.into_vec());
    let (program, parse_diags) = btrc_parse::parse(tokens, &grammar, &interner);
    assert!(parse_diags.is_empty(), "unexpected parser diagnostics: {:?}", parse_diags.into_vec());
    crate::check_module(&program, &interner)
}

fn codes(diags: &DiagnosticQueue) -> Vec<ErrorCode> {
    diags.all().iter().map(|d| d.code).collect()
}
