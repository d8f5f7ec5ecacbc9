//! Parser diagnostics (spec.md §4.3, §7).

use btrc_diagnostic::{Diagnostic, ErrorCode};
use btrc_ir::Span;

#[derive(Clone, Debug)]
pub enum ParseErrorKind {
    UnexpectedToken { expected: String, found: String },
    UnexpectedEof { expected: String },
    ExpectedExpression,
    ExpectedDeclaration,
    ExpectedIdentifier { found: String },
    ExpectedType,
    UnclosedDelimiter { delimiter: &'static str },
    InvalidLambdaForm,
    DuplicateInclude { path: String },
}

impl ParseErrorKind {
    fn code(&self) -> ErrorCode {
        match self {
            ParseErrorKind::UnexpectedToken { .. } => ErrorCode::P0001UnexpectedToken,
            ParseErrorKind::UnexpectedEof { .. } => ErrorCode::P0002UnexpectedEof,
            ParseErrorKind::ExpectedExpression => ErrorCode::P0003ExpectedExpression,
            ParseErrorKind::ExpectedDeclaration => ErrorCode::P0004ExpectedDeclaration,
            ParseErrorKind::ExpectedIdentifier { .. } => ErrorCode::P0005ExpectedIdentifier,
            ParseErrorKind::ExpectedType => ErrorCode::P0006ExpectedType,
            ParseErrorKind::UnclosedDelimiter { .. } => ErrorCode::P0007UnclosedDelimiter,
            ParseErrorKind::InvalidLambdaForm => ErrorCode::P0008InvalidLambdaForm,
            ParseErrorKind::DuplicateInclude { .. } => ErrorCode::P0009DuplicateInclude,
        }
    }

    fn message(&self) -> String {
        match self {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                format!("expected {expected}, found {found}")
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                format!("unexpected end of file, expected {expected}")
            }
            ParseErrorKind::ExpectedExpression => "expected an expression".to_string(),
            ParseErrorKind::ExpectedDeclaration => {
                "expected a top-level declaration".to_string()
            }
            ParseErrorKind::ExpectedIdentifier { found } => {
                format!("expected an identifier, found {found}")
            }
            ParseErrorKind::ExpectedType => "expected a type".to_string(),
            ParseErrorKind::UnclosedDelimiter { delimiter } => {
                format!("unclosed delimiter `{delimiter}`")
            }
            ParseErrorKind::InvalidLambdaForm => {
                "invalid lambda form: expected `(params) => expr`, `(params) => { ... }`, or a verbose function literal".to_string()
            }
            ParseErrorKind::DuplicateInclude { path } => {
                format!("`{path}` is already included in this compilation")
            }
        }
    }

    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        Diagnostic::error(self.code(), span, self.message())
    }
}
