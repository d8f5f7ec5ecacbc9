use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsdlError {
    #[error("{path}: could not read file: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("{path}: missing `module <Name> {{ ... }}` header")]
    MissingModule { path: String },
    #[error("{path}: unterminated `{{` starting at byte {offset}")]
    UnterminatedBrace { path: String, offset: usize },
    #[error("{path}: malformed rule near {snippet:?}: {reason}")]
    MalformedRule { path: String, snippet: String, reason: String },
}
