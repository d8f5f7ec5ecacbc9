/// Fatal configuration error: the grammar file is missing, unreadable, or
/// malformed. This is not a `Diagnostic` — it happens before there is any
/// source file to attach a span to, and it always aborts the whole run
/// (spec.md §4.1: "construction fails with a fatal configuration error").
#[derive(thiserror::Error, Debug)]
pub enum GrammarError {
    #[error("could not read grammar file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("grammar file {path}: expected `@lexical` section")]
    MissingLexicalSection { path: String },

    #[error("grammar file {path}: expected `@syntax` section")]
    MissingSyntaxSection { path: String },

    #[error("grammar file {path}: malformed `@lexical` section: {reason}")]
    MalformedLexical { path: String, reason: String },

    #[error("grammar file {path}: malformed `@syntax` section: {reason}")]
    MalformedSyntax { path: String, reason: String },

    #[error("grammar file {path}: duplicate keyword `{word}`")]
    DuplicateKeyword { path: String, word: String },

    #[error("grammar file {path}: duplicate operator `{op}`")]
    DuplicateOperator { path: String, op: String },
}
