//! Abstract syntax tree, as defined by `ast/btrc.asdl` (spec.md §3).
//!
//! Nodes are ordinary `Box`-linked recursive enums rather than an
//! arena-flattened tree: btrc is not an incremental compiler (see
//! Non-goals), so there is no memoization payoff to justify the extra
//! indirection a fully flattened AST buys an incremental one. Every node
//! still carries its own `Span`, and dispatch is by enum discriminant, per
//! spec.md §9's design note.

use crate::name::Name;
use crate::types::Type;
use crate::span::Span;

#[derive(Clone, Debug)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Access {
    Public,
    Private,
}

#[derive(Clone, Debug)]
pub struct TypeParam {
    pub name: Name,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub ty: Type,
    pub default_value: Option<Expr>,
    /// `keep` prefix (spec.md §4.5): caller-side retain on a class-typed argument.
    pub is_kept: bool,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: Name,
    pub ty: Type,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct MethodSig {
    pub name: Name,
    pub ret: Type,
    pub params: Vec<Param>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct EnumVariant {
    pub name: Name,
    pub payload: Vec<Type>,
    pub span: Span,
}

/// Top-level declaration (spec.md §3 "Declarations").
#[derive(Clone, Debug)]
pub enum Decl {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    Struct(StructDecl),
    Typedef { name: Name, ty: Type, span: Span },
    Extern { name: Name, ret: Type, params: Vec<Param>, span: Span },
    Function(FunctionDecl),
    GlobalVar { name: Name, ty: Type, init: Option<Expr>, span: Span },
    Include { path: String, span: Span },
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Class(c) => c.span,
            Decl::Interface(i) => i.span,
            Decl::Enum(e) => e.span,
            Decl::Struct(s) => s.span,
            Decl::Typedef { span, .. }
            | Decl::Extern { span, .. }
            | Decl::GlobalVar { span, .. }
            | Decl::Include { span, .. } => *span,
            Decl::Function(f) => f.span,
        }
    }

    pub fn name(&self) -> Option<Name> {
        match self {
            Decl::Class(c) => Some(c.name),
            Decl::Interface(i) => Some(i.name),
            Decl::Enum(e) => Some(e.name),
            Decl::Struct(s) => Some(s.name),
            Decl::Typedef { name, .. }
            | Decl::Extern { name, .. }
            | Decl::GlobalVar { name, .. } => Some(*name),
            Decl::Function(f) => Some(f.name),
            Decl::Include { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: Name,
    pub superclass: Option<Name>,
    pub interfaces: Vec<Name>,
    pub type_params: Vec<TypeParam>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct InterfaceDecl {
    pub name: Name,
    pub methods: Vec<MethodSig>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct EnumDecl {
    pub name: Name,
    pub variants: Vec<EnumVariant>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: Name,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Name,
    pub ret: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub type_params: Vec<TypeParam>,
    /// `keep` prefix on the return type (spec.md §4.5): caller becomes responsible
    /// for the subsequent release.
    pub returns_kept: bool,
    pub span: Span,
}

/// Class member (spec.md §3 "Class members").
#[derive(Clone, Debug)]
pub enum Member {
    Field {
        name: Name,
        ty: Type,
        access: Access,
        init: Option<Expr>,
        is_static: bool,
        span: Span,
    },
    Method {
        name: Name,
        ret: Type,
        params: Vec<Param>,
        body: Vec<Stmt>,
        is_static: bool,
        is_override: bool,
        is_abstract: bool,
        returns_kept: bool,
        access: Access,
        span: Span,
    },
    Ctor { params: Vec<Param>, body: Vec<Stmt>, span: Span },
    Dtor { body: Vec<Stmt>, span: Span },
    Property {
        name: Name,
        ty: Type,
        getter: Vec<Stmt>,
        setter: Vec<Stmt>,
        has_setter: bool,
        access: Access,
        span: Span,
    },
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Field { span, .. }
            | Member::Method { span, .. }
            | Member::Ctor { span, .. }
            | Member::Dtor { span, .. }
            | Member::Property { span, .. } => *span,
        }
    }

    pub fn name(&self) -> Option<Name> {
        match self {
            Member::Field { name, .. } | Member::Method { name, .. } | Member::Property { name, .. } => Some(*name),
            Member::Ctor { .. } | Member::Dtor { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment desugars to, or `None` for
    /// plain `=`.
    pub fn underlying_binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::AndAssign => Some(BinaryOp::BitAnd),
            AssignOp::OrAssign => Some(BinaryOp::BitOr),
            AssignOp::XorAssign => Some(BinaryOp::BitXor),
            AssignOp::ShlAssign => Some(BinaryOp::Shl),
            AssignOp::ShrAssign => Some(BinaryOp::Shr),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub is_default: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub binding: Option<Name>,
    pub ty: Option<Type>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Statement (spec.md §3 "Statements").
#[derive(Clone, Debug)]
pub enum Stmt {
    VarDecl { name: Name, ty: Option<Type>, init: Expr, is_var: bool, span: Span },
    Assign { target: Expr, op: AssignOp, value: Expr, span: Span },
    ExprStmt { value: Expr, span: Span },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>, span: Span },
    CFor {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        span: Span,
    },
    ForIn { binding: Name, iter: Expr, body: Vec<Stmt>, span: Span },
    While { cond: Expr, body: Vec<Stmt>, span: Span },
    DoWhile { body: Vec<Stmt>, cond: Expr, span: Span },
    Switch { subject: Expr, cases: Vec<SwitchCase>, span: Span },
    Try { body: Vec<Stmt>, catches: Vec<CatchClause>, finally_body: Vec<Stmt>, span: Span },
    Throw { value: Expr, span: Span },
    Return { value: Option<Expr>, span: Span },
    Break { span: Span },
    Continue { span: Span },
    Block { body: Vec<Stmt>, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::ExprStmt { span, .. }
            | Stmt::If { span, .. }
            | Stmt::CFor { span, .. }
            | Stmt::ForIn { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Block { span, .. } => *span,
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// The operator-overload special method name this operator resolves to
    /// on a class type (spec.md §4.4 "Operator overloading resolution"), or
    /// `None` if the operator is never user-overloadable.
    pub fn overload_method_name(self) -> Option<&'static str> {
        match self {
            BinaryOp::Add => Some("__add__"),
            BinaryOp::Sub => Some("__sub__"),
            BinaryOp::Mul => Some("__mul__"),
            BinaryOp::Div => Some("__div__"),
            BinaryOp::Mod => Some("__mod__"),
            BinaryOp::Eq => Some("__eq__"),
            _ => None,
        }
    }
}

impl UnaryOp {
    pub fn overload_method_name(self) -> Option<&'static str> {
        match self {
            UnaryOp::Neg => Some("__neg__"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum FStringChunk {
    Text(String),
    Interp { value: Expr, format_spec: Option<String> },
}

/// Expression (spec.md §3 "Expressions").
#[derive(Clone, Debug)]
pub enum Expr {
    IntLit { value: i64, span: Span },
    FloatLit { value: f64, span: Span },
    CharLit { value: char, span: Span },
    StringLit { value: String, span: Span },
    BoolLit { value: bool, span: Span },
    NullLit { span: Span },
    FString { chunks: Vec<FStringChunk>, span: Span },
    Ident { name: Name, span: Span },
    Member { base: Box<Expr>, name: Name, is_arrow: bool, is_null_safe: bool, span: Span },
    Index { base: Box<Expr>, index: Box<Expr>, span: Span },
    Call { callee: Box<Expr>, args: Vec<Expr>, span: Span },
    Unary { op: UnaryOp, operand: Box<Expr>, span: Span },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Ternary { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr>, span: Span },
    Cast { ty: Type, operand: Box<Expr>, span: Span },
    SizeOf { ty: Type, span: Span },
    New { ty: Type, args: Vec<Expr>, span: Span },
    Delete { operand: Box<Expr>, span: Span },
    Release { operand: Box<Expr>, span: Span },
    LambdaArrow { params: Vec<Param>, body: Box<Expr>, span: Span },
    LambdaBlock { params: Vec<Param>, body: Vec<Stmt>, span: Span },
    TupleLit { elements: Vec<Expr>, span: Span },
    TuplePattern { bindings: Vec<Name>, value: Box<Expr>, span: Span },
    Range { start: Box<Expr>, stop: Box<Expr>, step: Option<Box<Expr>>, span: Span },
    NullCoalesce { lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::CharLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::NullLit { span }
            | Expr::FString { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Cast { span, .. }
            | Expr::SizeOf { span, .. }
            | Expr::New { span, .. }
            | Expr::Delete { span, .. }
            | Expr::Release { span, .. }
            | Expr::LambdaArrow { span, .. }
            | Expr::LambdaBlock { span, .. }
            | Expr::TupleLit { span, .. }
            | Expr::TuplePattern { span, .. }
            | Expr::Range { span, .. }
            | Expr::NullCoalesce { span, .. } => *span,
        }
    }

    /// Whether this expression is a valid assignment target (an lvalue).
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Expr::Ident { .. } | Expr::Member { .. } | Expr::Index { .. })
    }
}
