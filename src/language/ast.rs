use crate::language::{
    clauses::{ClauseKindDescriptor, StateKeyword},
    span::Span,
    types::{Type, TypeName},
};
use std::cell::OnceCell;

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, Default)]
pub struct CompilationUnit {
    pub classes: Vec<ClassDecl>,
}

#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: Identifier,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ClassDecl {
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn clauses(&self) -> impl Iterator<Item = &TypeClause> {
        self.members.iter().filter_map(|member| match member {
            Member::Clause(clause) => Some(clause),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub enum Member {
    Field(FieldDecl),
    Clause(TypeClause),
    Method(MethodDecl),
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub ty: TypeName,
    pub name: Identifier,
    pub init: Option<Expr>,
    /// Set for `ghost` fields.
    pub ghost: Option<ClauseKindDescriptor>,
    pub span: Span,
}

/// `invariant`, `constraint`, `axiom` or `initially` at class level.
#[derive(Clone, Debug)]
pub struct TypeClause {
    pub descriptor: ClauseKindDescriptor,
    pub expr: Expr,
    /// Only `constraint` clauses carry a frame.
    pub frame: Option<ConstraintFrame>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintFrame {
    Everything(Span),
    Methods(Vec<Identifier>),
}

#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub return_type: TypeName,
    pub name: Identifier,
    pub params: Vec<Param>,
    pub spec_cases: Vec<SpecCase>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub ty: TypeName,
    pub name: Identifier,
    pub span: Span,
}

/// One `requires`/`ensures` group; cases are separated by `also`.
#[derive(Clone, Debug)]
pub struct SpecCase {
    pub clauses: Vec<SpecClause>,
    pub span: Span,
}

/// A keyword followed by a single expression and `;`.
#[derive(Clone, Debug)]
pub struct SpecClause {
    pub descriptor: ClauseKindDescriptor,
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct LocalDecl {
    pub ty: TypeName,
    pub name: Identifier,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Local(LocalDecl),
    Ghost {
        descriptor: ClauseKindDescriptor,
        decl: LocalDecl,
    },
    Assign {
        target: Identifier,
        value: Expr,
        span: Span,
    },
    Labeled {
        label: Identifier,
        body: Box<Statement>,
        span: Span,
    },
    Clause(SpecClause),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
    Block(Block),
    Error(Span),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Implies,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Implies => "==>",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Identifier(Identifier),
    Int(i64, Span),
    Bool(bool, Span),
    /// `\result`
    Result(Span),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    FieldAccess {
        base: Box<Expr>,
        field: Identifier,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    State(Box<InvocationNode>),
    /// Placeholder left behind by a recovered syntax error.
    Error(Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(ident) => ident.span,
            Expr::Int(_, span) | Expr::Bool(_, span) | Expr::Result(span) => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::FieldAccess { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::State(node) => node.span,
            Expr::Error(span) => *span,
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Expr::Identifier(ident) => Some(ident),
            _ => None,
        }
    }
}

/// `\old(e)`, `\old(e, L)`, `\pre(e)`, `\past(e, L)`.
///
/// The argument list is kept exactly as written; arity is validated when the
/// node is resolved.
#[derive(Clone, Debug)]
pub struct InvocationNode {
    pub descriptor: ClauseKindDescriptor,
    pub token: StateKeyword,
    pub arguments: Vec<Expr>,
    pub type_args: Vec<TypeName>,
    pub keyword_span: Span,
    pub span: Span,
    ty: OnceCell<Type>,
}

impl InvocationNode {
    pub fn new(
        descriptor: ClauseKindDescriptor,
        token: StateKeyword,
        arguments: Vec<Expr>,
        keyword_span: Span,
        span: Span,
    ) -> Self {
        Self {
            descriptor,
            token,
            arguments,
            type_args: Vec::new(),
            keyword_span,
            span,
            ty: OnceCell::new(),
        }
    }

    pub fn keyword(&self) -> &'static str {
        self.descriptor.keyword
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.get()
    }

    /// Stores the resolved type. Later calls keep the first value.
    pub fn record_type(&self, ty: Type) -> &Type {
        self.ty.get_or_init(|| ty)
    }
}
