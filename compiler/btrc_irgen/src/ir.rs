//! The Intermediate Representation (spec.md §3 "Intermediate Representation").
//!
//! A strictly structured tree: every node carries enough information to
//! emit valid C without further analysis (spec.md §4.5), and the only
//! embedded text is the reserved `Stmt::RawC` node used for the
//! `setjmp`/`longjmp` try/catch scaffolding (spec.md §4.5 "control flow
//! lowering"). Node families below mirror spec.md §3's `IR*` list
//! one-for-one (`IRAssign` -> `Stmt::Assign`, `IRBinOp` -> `Expr::Binary`,
//! ...); the `IR` prefix is dropped from the Rust names since the module
//! path (`ir::Stmt`, `ir::Expr`) already disambiguates from `ast::Stmt`.

use std::collections::BTreeSet;

use crate::helpers::HelperCategory;

/// A C type as the Emitter needs to render it -- no source-level sugar
/// (nullability, generics) survives past lowering; those are resolved to
/// concrete pointers/structs/tags by stage 5 (spec.md §4.5).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Void,
    Int,
    Float,
    Double,
    Bool,
    Char,
    /// `char*` -- btrc's `string` is a plain C string (spec.md §4.8
    /// "string pool and helpers" operate on this representation).
    CString,
    /// A named `struct Name` (a lowered class, collection instance,
    /// struct decl, capture struct, or vtable struct).
    Struct(String),
    Pointer(Box<Type>),
    /// `RetT (*)(ParamTs...)`, used for function-pointer fields (vtable
    /// slots, lambda captures) and `extern` prototypes.
    FunctionPointer(Vec<Type>, Box<Type>),
}

impl Type {
    pub fn ptr(self) -> Type {
        Type::Pointer(Box::new(self))
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// A C `struct` definition: a lowered class (with inherited fields
/// prepended), a monomorphized generic/collection instance, a source
/// `struct` declaration, a vtable layout, or a lambda capture struct
/// (spec.md §4.5 "Class lowering", "Vtable construction", "Lambdas").
#[derive(Clone, Debug)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug)]
pub struct Typedef {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct Extern {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
}

/// A file-scope variable with a constant initializer -- used for
/// statically-initialized vtable instances (spec.md §4.5 "Vtable
/// construction": "a `vtable` field points to a statically initialized
/// dispatch table").
#[derive(Clone, Debug)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: Option<Expr>,
}

/// A function prototype and, optionally, its body. Prototypes and
/// definitions share this one node (SPEC_FULL.md §4.5a): a prototype is a
/// `Function` with `body: None`, emitted before any type definition needs
/// it; a definition is the same shape with `body: Some(..)`.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Field>,
    pub body: Option<Vec<Stmt>>,
    /// Functions synthesized by lowering (ctors, dtors, vtable thunks,
    /// lambda thunks, collection methods) are never referenced from a
    /// `extern` surface and may be safely dropped by the optimizer's dead-
    /// helper pass if nothing calls them; user-declared functions/methods
    /// are always kept.
    pub is_static_linkage: bool,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub is_default: bool,
}

/// Statement (spec.md §3 IR "Statements": `IRAssign`, `IRVarDecl`, `IRIf`,
/// `IRWhile`, `IRFor`, `IRSwitch`, `IRReturn`, `IRBreak`, `IRContinue`,
/// `IRBlock`, `IRExprStmt`, `IRRawC`).
#[derive(Clone, Debug)]
pub enum Stmt {
    Assign { target: Expr, value: Expr },
    VarDecl { name: String, ty: Type, init: Option<Expr> },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Box<Stmt>>, body: Vec<Stmt> },
    Switch { subject: Expr, cases: Vec<SwitchCase> },
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Vec<Stmt>),
    ExprStmt(Expr),
    /// Opaque C text, reserved solely for `setjmp`/`longjmp` try/catch
    /// scaffolding (spec.md §3: "one reserved 'opaque C block' node").
    RawC(String),
}

/// Expression (spec.md §3 IR "Expressions": `IRBinOp`, `IRUnaryOp`,
/// `IRCall`, `IRMember`, `IRIndex`, `IRCast`, `IRLiteral`, `IRVar`,
/// `IRSizeof`, `IRCompound`).
#[derive(Clone, Debug)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f32),
    DoubleLit(f64),
    CharLit(char),
    /// A C string literal, already escaped-at-use; the Emitter renders it
    /// with C escaping applied once, at render time.
    StringLit(String),
    BoolLit(bool),
    NullLit,
    Var(String),
    Binary { op: &'static str, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `prefix` distinguishes `++x`/`-x` from `x++`.
    Unary { op: &'static str, prefix: bool, operand: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Member { base: Box<Expr>, field: String, arrow: bool },
    Index { base: Box<Expr>, index: Box<Expr> },
    Cast { ty: Type, operand: Box<Expr> },
    Sizeof(Type),
    /// A C99 compound literal `(Type){ .field = value, ... }`, used for
    /// vtable instances and stack-allocated capture structs.
    Compound { ty: Type, fields: Vec<(String, Expr)> },
    Ternary { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    AddrOf(Box<Expr>),
    Deref(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn member(base: Expr, field: impl Into<String>) -> Expr {
        Expr::Member { base: Box::new(base), field: field.into(), arrow: false }
    }

    pub fn arrow(base: Expr, field: impl Into<String>) -> Expr {
        Expr::Member { base: Box::new(base), field: field.into(), arrow: true }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call { callee: Box::new(callee), args }
    }
}

/// The whole translation unit (spec.md §3 "Module"). Ordering is
/// preserved top-to-bottom for the Emitter's single deterministic walk
/// (spec.md §4.7): structs, externs, typedefs, globals, then functions.
#[derive(Default, Debug)]
pub struct Module {
    pub structs: Vec<Struct>,
    pub typedefs: Vec<Typedef>,
    pub externs: Vec<Extern>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    /// Helper categories referenced anywhere in this module, registered by
    /// the IR Generator as it lowers each construct (spec.md §4.5 "Helper
    /// registration") and pruned to the transitively-reachable set by the
    /// Optimizer (spec.md §4.6). A `BTreeSet` keeps emission order
    /// deterministic regardless of registration order.
    pub helpers: BTreeSet<HelperCategory>,
}

impl Module {
    pub fn register_helper(&mut self, category: HelperCategory) {
        self.helpers.insert(category);
    }
}
