use crate::language::span::Span;
use miette::SourceSpan;
use thiserror::Error;

pub const CODE_ARGS_REQUIRED: &str = "spec.args.required";
pub const CODE_BAD_CONSTRUCT: &str = "spec.bad.construct";
pub const CODE_UNKNOWN_KEYWORD: &str = "spec.unknown.keyword";

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
    pub code: Option<&'static str>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
            code: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.to_source_span()
    }
}

/// Every syntax error of one unit, for callers that refuse partial trees.
#[derive(Clone, Debug, Error)]
#[error("{} syntax error(s), first: {}", .errors.len(), .errors.first().map_or("", |err| err.message.as_str()))]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}
