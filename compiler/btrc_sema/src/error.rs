//! Semantic diagnostics (spec.md §4.4, §7).

use btrc_diagnostic::{Diagnostic, ErrorCode};
use btrc_ir::Span;

#[derive(Clone, Debug)]
pub enum SemaErrorKind {
    UnknownIdentifier { name: String },
    UnknownType { name: String },
    TypeMismatch { expected: String, found: String },
    DuplicateDefinition { name: String, scope: &'static str },
    InvalidOverride { name: String, reason: String },
    MissingAbstractImplementation { class: String, method: String },
    UnresolvedGenericArgument { name: String },
    AccessViolation { name: String },
    VarWithoutInitializer { name: String },
    MissingOperatorOverload { op: String, ty: String },
    NoMatchingOverload { name: String },
}

impl SemaErrorKind {
    fn code(&self) -> ErrorCode {
        match self {
            SemaErrorKind::UnknownIdentifier { .. } => ErrorCode::S0001UnknownIdentifier,
            SemaErrorKind::TypeMismatch { .. } => ErrorCode::S0002TypeMismatch,
            SemaErrorKind::DuplicateDefinition { .. } => ErrorCode::S0003DuplicateDefinition,
            SemaErrorKind::InvalidOverride { .. } => ErrorCode::S0004InvalidOverride,
            SemaErrorKind::MissingAbstractImplementation { .. } => ErrorCode::S0005MissingAbstractImplementation,
            SemaErrorKind::UnresolvedGenericArgument { .. } => ErrorCode::S0006UnresolvedGenericArgument,
            SemaErrorKind::AccessViolation { .. } => ErrorCode::S0007AccessViolation,
            SemaErrorKind::VarWithoutInitializer { .. } => ErrorCode::S0008VarWithoutInitializer,
            SemaErrorKind::MissingOperatorOverload { .. } => ErrorCode::S0009MissingOperatorOverload,
            SemaErrorKind::NoMatchingOverload { .. } => ErrorCode::S0011NoMatchingOverload,
            SemaErrorKind::UnknownType { .. } => ErrorCode::S0012UnknownType,
        }
    }

    fn message(&self) -> String {
        match self {
            SemaErrorKind::UnknownIdentifier { name } => format!("unknown identifier `{name}`"),
            SemaErrorKind::UnknownType { name } => format!("unknown type `{name}`"),
            SemaErrorKind::TypeMismatch { expected, found } => {
                format!("type mismatch: expected `{expected}`, found `{found}`")
            }
            SemaErrorKind::DuplicateDefinition { name, scope } => {
                format!("`{name}` is already defined in this {scope}")
            }
            SemaErrorKind::InvalidOverride { name, reason } => {
                format!("invalid override of `{name}`: {reason}")
            }
            SemaErrorKind::MissingAbstractImplementation { class, method } => {
                format!("`{class}` does not implement abstract method `{method}`")
            }
            SemaErrorKind::UnresolvedGenericArgument { name } => {
                format!("`{name}` is not a declared generic class or interface")
            }
            SemaErrorKind::AccessViolation { name } => {
                format!("`{name}` is private and not accessible here")
            }
            SemaErrorKind::VarWithoutInitializer { name } => {
                format!("`var {name}` must have an initializer")
            }
            SemaErrorKind::MissingOperatorOverload { op, ty } => {
                format!("`{ty}` does not overload operator `{op}`")
            }
            SemaErrorKind::NoMatchingOverload { name } => {
                format!("no matching overload for call to `{name}`")
            }
        }
    }

    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        Diagnostic::error(self.code(), span, self.message())
    }
}

pub fn null_deref_warning(span: Span, name: &str) -> Diagnostic {
    Diagnostic::warning(
        ErrorCode::S0010NullDereferenceWarning,
        span,
        format!("`{name}` may be null here; use `?.` or check for null first"),
    )
}
