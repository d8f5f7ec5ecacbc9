//! Stable, searchable error codes.
//!
//! Codes are prefixed by the stage that can raise them: `L` (Lexer), `P`
//! (Parser), `S` (Semantic/Analyzer). Internal compiler errors don't get a
//! code — they're fatal panics, not diagnostics (spec.md §7).

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[non_exhaustive]
pub enum ErrorCode {
    // Lexer (spec.md §4.2)
    L0001MalformedToken,
    L0002UnterminatedString,
    L0003UnterminatedChar,
    L0004InvalidEscape,
    L0005UnterminatedBlockComment,

    // Parser (spec.md §4.3)
    P0001UnexpectedToken,
    P0002UnexpectedEof,
    P0003ExpectedExpression,
    P0004ExpectedDeclaration,
    P0005ExpectedIdentifier,
    P0006ExpectedType,
    P0007UnclosedDelimiter,
    P0008InvalidLambdaForm,
    P0009DuplicateInclude,

    // Semantic (spec.md §4.4)
    S0001UnknownIdentifier,
    S0002TypeMismatch,
    S0003DuplicateDefinition,
    S0004InvalidOverride,
    S0005MissingAbstractImplementation,
    S0006UnresolvedGenericArgument,
    S0007AccessViolation,
    S0008VarWithoutInitializer,
    S0009MissingOperatorOverload,
    S0010NullDereferenceWarning,
    S0011NoMatchingOverload,
    S0012UnknownType,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::L0001MalformedToken => "L0001",
            ErrorCode::L0002UnterminatedString => "L0002",
            ErrorCode::L0003UnterminatedChar => "L0003",
            ErrorCode::L0004InvalidEscape => "L0004",
            ErrorCode::L0005UnterminatedBlockComment => "L0005",
            ErrorCode::P0001UnexpectedToken => "P0001",
            ErrorCode::P0002UnexpectedEof => "P0002",
            ErrorCode::P0003ExpectedExpression => "P0003",
            ErrorCode::P0004ExpectedDeclaration => "P0004",
            ErrorCode::P0005ExpectedIdentifier => "P0005",
            ErrorCode::P0006ExpectedType => "P0006",
            ErrorCode::P0007UnclosedDelimiter => "P0007",
            ErrorCode::P0008InvalidLambdaForm => "P0008",
            ErrorCode::P0009DuplicateInclude => "P0009",
            ErrorCode::S0001UnknownIdentifier => "S0001",
            ErrorCode::S0002TypeMismatch => "S0002",
            ErrorCode::S0003DuplicateDefinition => "S0003",
            ErrorCode::S0004InvalidOverride => "S0004",
            ErrorCode::S0005MissingAbstractImplementation => "S0005",
            ErrorCode::S0006UnresolvedGenericArgument => "S0006",
            ErrorCode::S0007AccessViolation => "S0007",
            ErrorCode::S0008VarWithoutInitializer => "S0008",
            ErrorCode::S0009MissingOperatorOverload => "S0009",
            ErrorCode::S0010NullDereferenceWarning => "S0010",
            ErrorCode::S0011NoMatchingOverload => "S0011",
            ErrorCode::S0012UnknownType => "S0012",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
