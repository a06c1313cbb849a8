use crate::{
    driver::{DriverError, FileReport},
    language::{errors::SyntaxError, typecheck::TypeError},
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.code.unwrap_or("syntax error").to_string(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct TypeDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl TypeDiagnostic {
    pub fn from_error(src: NamedSource, err: &TypeError) -> Self {
        Self {
            src,
            span: err.span.to_source_span(),
            help: err.help.clone(),
            message: err.message(),
            label: err.code().to_string(),
        }
    }
}

fn named_source(report: &FileReport) -> NamedSource {
    NamedSource::new(report.path.display().to_string(), report.source.clone())
}

/// Renders every diagnostic of `report` to stderr, syntax errors first.
pub fn emit_report(report: &FileReport) {
    for err in &report.syntax {
        let diagnostic = SyntaxDiagnostic::from_error(named_source(report), err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
    for err in &report.semantic {
        let diagnostic = TypeDiagnostic::from_error(named_source(report), err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
    if report.suppressed > 0 {
        eprintln!(
            "{}: {} more diagnostic(s) not shown",
            report.path.display(),
            report.suppressed
        );
    }
}

pub fn report_driver_error(error: &DriverError) {
    eprintln!("error: {}", error);
}
