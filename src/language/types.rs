use crate::language::span::Span;
use std::fmt;

/// Attributed type of an expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Boolean,
    Void,
    Class(String),
    /// Marks an already reported error; checks that see it stay quiet.
    Error,
}

impl Type {
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Boolean => f.write_str("boolean"),
            Type::Void => f.write_str("void"),
            Type::Class(name) => f.write_str(name),
            Type::Error => f.write_str("<error>"),
        }
    }
}

/// A type as written in source, before resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub span: Span,
}

impl TypeName {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    pub fn primitive(&self) -> Option<Type> {
        match self.name.as_str() {
            "int" => Some(Type::Int),
            "boolean" => Some(Type::Boolean),
            "void" => Some(Type::Void),
            _ => None,
        }
    }
}
