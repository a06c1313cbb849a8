//! `\old`, `\pre` and `\past`: references to a value as of an earlier state.

use super::{AttributionHost, Embedding, ParserSurface};
use crate::language::{
    ast::{Expr, InvocationNode},
    clauses::{ClauseKindDescriptor, StateKeyword},
    errors::{SyntaxError, CODE_ARGS_REQUIRED},
    span::Span,
    token::TokenKind,
    typecheck::{
        context::{ContextScope, StateLabel},
        TypeError, TypeErrorKind,
    },
    types::Type,
};
use log::debug;

/// Parses `keyword(arg1[, arg2 ...])` and any selectors after it.
///
/// Any number of arguments is accepted here; the count is checked during
/// resolution so that a bad call yields one semantic diagnostic.
pub fn parse<P: ParserSurface>(
    parser: &mut P,
    descriptor: ClauseKindDescriptor,
    keyword: StateKeyword,
) -> Result<Expr, SyntaxError> {
    let keyword_span = parser.next_token().span;
    if parser.current_kind() != TokenKind::LParen {
        return Ok(parser.syntax_error(
            SyntaxError::new(
                format!("{} requires an argument list", descriptor.keyword),
                keyword_span,
            )
            .with_code(CODE_ARGS_REQUIRED)
            .with_help(format!("write `{}(expression)`", descriptor.keyword)),
        ));
    }
    let arguments = parser.parse_arguments()?;
    let span = Span::new(keyword_span.start, parser.previous_end());
    let node = InvocationNode::new(descriptor, keyword, arguments, keyword_span, span);
    parser.parse_trailers(Expr::State(Box::new(node)))
}

/// Shape of a state reference as far as legality is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StateForm {
    Entry,
    Unlabeled,
    Labeled,
}

impl StateForm {
    fn of(keyword: StateKeyword, argument_count: usize) -> Self {
        match keyword {
            StateKeyword::Pre => StateForm::Entry,
            _ if argument_count >= 2 => StateForm::Labeled,
            _ => StateForm::Unlabeled,
        }
    }

    fn describe(self, keyword: StateKeyword) -> &'static str {
        match (self, keyword) {
            (StateForm::Entry, _) => "\\pre token",
            (StateForm::Unlabeled, StateKeyword::Past) => "\\past token with no label",
            (StateForm::Unlabeled, _) => "\\old token with no label",
            (StateForm::Labeled, StateKeyword::Past) => "\\past token with a label",
            (StateForm::Labeled, _) => "\\old token with a label",
        }
    }

    fn is_legal_in(self, clause: Option<&ClauseKindDescriptor>, has_enclosing_method: bool) -> bool {
        let declaration_in_method =
            |desc: &ClauseKindDescriptor| desc.kind.is_declaration() && has_enclosing_method;
        match (self, clause) {
            (StateForm::Entry, Some(desc)) => desc.accepts_prev_entry_state(),
            (StateForm::Entry, None) => false,
            (StateForm::Unlabeled, None) => true,
            (StateForm::Unlabeled, Some(desc)) => {
                desc.accepts_unlabeled_prev_state() || declaration_in_method(desc)
            }
            (StateForm::Labeled, Some(desc)) => {
                desc.accepts_labeled_prev_state() || declaration_in_method(desc)
            }
            (StateForm::Labeled, None) => false,
        }
    }
}

fn place_of(clause: Option<&ClauseKindDescriptor>) -> String {
    match clause {
        Some(desc) => format!("a `{}` clause", desc.keyword),
        None => "this position".to_string(),
    }
}

/// Checks a state invocation and attributes its payload.
///
/// Returns the payload's type, or [`Type::Error`] once any diagnostic has
/// been reported for this node.
pub fn resolve<H: AttributionHost>(host: &mut H, node: &InvocationNode, env: &H::Env) -> Type {
    let mut scope = ContextScope::enter(host);
    let count = node.arguments.len();
    let keyword = node.token;
    let mut failed = false;

    if !node.descriptor.arity.admits(count) {
        let kind = if keyword.is_entry() {
            TypeErrorKind::OneArgument {
                keyword: node.keyword(),
                found: count,
            }
        } else {
            TypeErrorKind::WrongNumberOfArguments {
                keyword: node.keyword(),
                expected: node.descriptor.arity,
                found: count,
            }
        };
        scope.report(TypeError::new(node.span, kind));
        failed = true;
    }

    let clause = scope.context().current_clause_kind;
    let has_method = scope.has_enclosing_method(env);
    let form = StateForm::of(keyword, count);
    debug!(
        "resolving {} with {} argument(s) in {:?} (method: {})",
        node.keyword(),
        count,
        clause.map(|desc| desc.keyword),
        has_method
    );

    if !form.is_legal_in(clause.as_ref(), has_method) {
        scope.report(
            TypeError::new(
                node.keyword_span,
                TypeErrorKind::MisplacedStateExpression {
                    what: form.describe(keyword),
                    place: place_of(clause.as_ref()),
                },
            )
            .with_help(match form {
                StateForm::Entry => "\\pre refers to method entry and needs a clause that allows it",
                StateForm::Unlabeled => "this clause is evaluated in the pre-state already",
                StateForm::Labeled => "labels can only be referenced from inside a method body",
            }),
        );
        failed = true;
    }

    let mut label_span = node.span;
    let mut label = None;
    if count == 2 && !keyword.is_entry() {
        let label_expr = &node.arguments[1];
        label_span = label_expr.span();
        match scope.resolve_label(label_expr, env) {
            Some(ident) => label = Some(ident),
            None => {
                let text = label_expr
                    .as_identifier()
                    .map(|ident| ident.name.clone())
                    .unwrap_or_else(|| "expression".to_string());
                scope.report(TypeError::new(label_span, TypeErrorKind::NotALabel(text)));
                failed = true;
            }
        }
    }

    let effective = label.map(StateLabel::Named).unwrap_or(StateLabel::Entry);
    scope.context_mut().current_label = Some(effective.clone());

    let ty = if failed || count == 0 {
        Type::Error
    } else {
        let label_env;
        let payload_env = match Embedding::classify(has_method, clause.map(|desc| desc.kind)) {
            // Spec clauses are already checked in the method-entry environment.
            Embedding::TopLevel | Embedding::SpecClause => env,
            Embedding::MethodBody => {
                label_env = scope.environment_for_label(label_span, &effective, env);
                &label_env
            }
        };
        let payload = scope.attribute_expr(&node.arguments[0], payload_env, None);
        scope.attribute_type_args(&node.type_args, payload_env);
        payload
    };

    let recorded = node.record_type(ty.clone());
    debug_assert_eq!(recorded, &ty, "state expression re-resolved to a different type");
    recorded.clone()
}
