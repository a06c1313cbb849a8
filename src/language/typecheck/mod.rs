use crate::language::{clauses::Arity, span::Span, types::Type};
use thiserror::Error;

pub mod context;

mod checker;

pub use checker::{check_unit, Checker, Env};

/// Which check a type error comes from. Syntax errors are [`SyntaxError`]s.
///
/// [`SyntaxError`]: crate::language::errors::SyntaxError
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Arity,
    ContextLegality,
    LabelResolution,
    /// Ordinary typing errors of the host language.
    Host,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TypeErrorKind {
    #[error("{keyword} expects one argument, found {found}")]
    OneArgument { keyword: &'static str, found: usize },
    #[error("{keyword} expects {expected}, found {found}")]
    WrongNumberOfArguments {
        keyword: &'static str,
        expected: Arity,
        found: usize,
    },
    #[error("{what} is not allowed in {place}")]
    MisplacedStateExpression { what: &'static str, place: String },
    #[error("`{0}` is not a label of the enclosing method")]
    NotALabel(String),
    #[error("cannot find symbol `{0}`")]
    UnknownSymbol(String),
    #[error("cannot find type `{0}`")]
    UnknownType(String),
    #[error("incompatible types: required {expected}, found {found}")]
    IncompatibleTypes { expected: Type, found: Type },
    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    BadOperands {
        op: &'static str,
        left: Type,
        right: Type,
    },
    #[error("operator `{op}` cannot be applied to {operand}")]
    BadOperand { op: &'static str, operand: Type },
    #[error("{ty} has no field `{field}`")]
    UnknownField { ty: Type, field: String },
    #[error("{ty} has no method `{method}`")]
    UnknownMethod { ty: Type, method: String },
    #[error("method `{method}` expects {expected} argument(s), found {found}")]
    CallArity {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("expression is not callable")]
    NotCallable,
    #[error("`{0}` is already defined in this scope")]
    Duplicate(String),
    #[error("\\result is only allowed in an ensures clause of a non-void method")]
    MisplacedResult,
    #[error("\\result cannot be used inside a state expression")]
    ResultInStateExpression,
    #[error("constraint frame names unknown method `{0}`")]
    UnknownFrameMethod(String),
    #[error("void method cannot return a value")]
    ReturnValueInVoid,
    #[error("missing return value")]
    MissingReturnValue,
}

impl TypeErrorKind {
    pub fn category(&self) -> DiagnosticCategory {
        match self {
            TypeErrorKind::OneArgument { .. } | TypeErrorKind::WrongNumberOfArguments { .. } => {
                DiagnosticCategory::Arity
            }
            TypeErrorKind::MisplacedStateExpression { .. } => DiagnosticCategory::ContextLegality,
            TypeErrorKind::NotALabel(_) => DiagnosticCategory::LabelResolution,
            _ => DiagnosticCategory::Host,
        }
    }

    /// Stable message key.
    pub fn code(&self) -> &'static str {
        match self {
            TypeErrorKind::OneArgument { .. } => "spec.one.arg",
            TypeErrorKind::WrongNumberOfArguments { .. } => "spec.wrong.number.args",
            TypeErrorKind::MisplacedStateExpression { .. } => "spec.misplaced.old",
            TypeErrorKind::NotALabel(_) => "spec.bad.label",
            TypeErrorKind::UnknownSymbol(_) => "host.unknown.symbol",
            TypeErrorKind::UnknownType(_) => "host.unknown.type",
            TypeErrorKind::IncompatibleTypes { .. } => "host.incompatible.types",
            TypeErrorKind::BadOperands { .. } | TypeErrorKind::BadOperand { .. } => {
                "host.bad.operands"
            }
            TypeErrorKind::UnknownField { .. } => "host.unknown.field",
            TypeErrorKind::UnknownMethod { .. } => "host.unknown.method",
            TypeErrorKind::CallArity { .. } => "host.call.arity",
            TypeErrorKind::NotCallable => "host.not.callable",
            TypeErrorKind::Duplicate(_) => "host.duplicate",
            TypeErrorKind::MisplacedResult | TypeErrorKind::ResultInStateExpression => {
                "spec.misplaced.result"
            }
            TypeErrorKind::UnknownFrameMethod(_) => "spec.constraint.frame",
            TypeErrorKind::ReturnValueInVoid | TypeErrorKind::MissingReturnValue => {
                "host.return"
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeError {
    pub span: Span,
    pub kind: TypeErrorKind,
    pub help: Option<String>,
}

impl TypeError {
    pub fn new(span: Span, kind: TypeErrorKind) -> Self {
        Self {
            span,
            kind,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn category(&self) -> DiagnosticCategory {
        self.kind.category()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// A broken invariant of the checker itself, as opposed to a user error.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("attribution context not balanced after `{declaration}`: {depth} frame(s) left")]
    UnbalancedContext { declaration: String, depth: usize },
    #[error("node for `{0}` carries a descriptor that differs from the registry")]
    ForeignDescriptor(String),
}

#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Clause bodies must be `boolean`.
    pub boolean_clauses: bool,
    pub max_errors: Option<usize>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            boolean_clauses: true,
            max_errors: None,
        }
    }
}
