//! Syntax and typing extensions dispatched by clause keyword, plus the narrow
//! surfaces they need from the host parser and the host type checker.

use crate::language::{
    ast::{Expr, Identifier},
    clauses::ClauseKind,
    errors::SyntaxError,
    span::Span,
    token::{Token, TokenKind},
    typecheck::{
        context::{ContextHost, StateLabel},
        TypeError,
    },
    types::{Type, TypeName},
};

pub mod state;
pub mod type_clause;

/// What the extensions need from the token stream and the host parser.
pub trait ParserSurface {
    fn current_kind(&self) -> TokenKind;

    fn current_span(&self) -> Span;

    /// End offset of the last consumed token.
    fn previous_end(&self) -> usize;

    fn next_token(&mut self) -> Token;

    /// Parses `( e1, e2, ... )` starting at the open parenthesis. No arity check.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError>;

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError>;

    /// Continues a primary expression with `.field` and `(args)` selectors.
    fn parse_trailers(&mut self, expr: Expr) -> Result<Expr, SyntaxError>;

    fn report(&mut self, error: SyntaxError);

    /// Reports `error` and hands back a placeholder so parsing can go on.
    fn syntax_error(&mut self, error: SyntaxError) -> Expr {
        let span = error.span;
        self.report(error);
        Expr::Error(span)
    }

    /// Skips to the next `;` and consumes it; stops short of `}` and end of file.
    fn skip_through_terminator(&mut self);

    fn clause_keywords(&self) -> bool;

    /// Returns the previous mode.
    fn set_clause_keywords(&mut self, enabled: bool) -> bool;

    /// Runs `f` with clause keyword recognition switched, restoring the
    /// previous mode afterwards.
    fn with_clause_keywords<R>(&mut self, enabled: bool, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        let previous = self.set_clause_keywords(enabled);
        let result = f(self);
        self.set_clause_keywords(previous);
        result
    }
}

/// What the state-expression resolver needs from the host type checker.
pub trait AttributionHost: ContextHost {
    type Env;

    fn attribute_expr(&mut self, expr: &Expr, env: &Self::Env, expected: Option<&Type>) -> Type;

    fn attribute_type_args(&mut self, args: &[TypeName], env: &Self::Env);

    /// Resolves `expr` as a label of the enclosing method.
    fn resolve_label(&mut self, expr: &Expr, env: &Self::Env) -> Option<Identifier>;

    /// The environment in effect at `label` in the enclosing method body.
    fn environment_for_label(&mut self, span: Span, label: &StateLabel, env: &Self::Env)
        -> Self::Env;

    fn has_enclosing_method(&self, env: &Self::Env) -> bool;

    fn report(&mut self, error: TypeError);
}

/// Where a state expression sits relative to methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Embedding {
    /// Field initializers and type clauses.
    TopLevel,
    /// A `requires`/`ensures` clause of a method.
    SpecClause,
    MethodBody,
}

impl Embedding {
    pub fn classify(has_enclosing_method: bool, clause: Option<ClauseKind>) -> Self {
        match (has_enclosing_method, clause) {
            (false, _) => Embedding::TopLevel,
            (true, Some(kind)) if kind.is_method_spec() => Embedding::SpecClause,
            (true, _) => Embedding::MethodBody,
        }
    }
}
