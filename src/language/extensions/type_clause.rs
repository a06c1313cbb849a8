//! Class-level `invariant`, `constraint`, `axiom` and `initially` clauses.

use super::ParserSurface;
use crate::language::{
    ast::{ConstraintFrame, Expr, Identifier, TypeClause},
    clauses::{ClauseKind, ClauseKindDescriptor, TypeClauseKeyword},
    errors::{SyntaxError, CODE_BAD_CONSTRUCT},
    span::Span,
    token::TokenKind,
};
use log::debug;

const FRAME_KEYWORD: &str = "for";
const EVERYTHING: &str = "\\everything";

/// Parses `keyword expr [for frame] ;` with the current token on the keyword.
///
/// Clause keywords read as plain identifiers inside the body. A body that
/// does not end in `;` is reported once and replaced by a placeholder.
pub fn parse<P: ParserSurface>(parser: &mut P, descriptor: ClauseKindDescriptor) -> TypeClause {
    let start = parser.next_token().span.start;
    let is_constraint = descriptor.kind == ClauseKind::TypeClause(TypeClauseKeyword::Constraint);

    let body = parser.with_clause_keywords(false, |parser| {
        let expr = parser.parse_expression()?;
        let frame = if is_constraint {
            parse_frame(parser)?
        } else {
            None
        };
        Ok::<_, SyntaxError>((expr, frame))
    });

    match body {
        Ok((expr, frame)) if parser.current_kind() == TokenKind::Semi => {
            parser.next_token();
            debug!("parsed `{}` clause", descriptor.keyword);
            TypeClause {
                descriptor,
                expr,
                frame,
                span: Span::new(start, parser.previous_end()),
            }
        }
        outcome => {
            let at = match &outcome {
                Err(err) => err.span,
                Ok(_) => parser.current_span(),
            };
            parser.report(
                SyntaxError::new(
                    format!("bad construct: `{}` declaration", descriptor.keyword),
                    at,
                )
                .with_code(CODE_BAD_CONSTRUCT)
                .with_help(format!(
                    "a `{}` clause is one expression terminated by `;`",
                    descriptor.keyword
                )),
            );
            parser.skip_through_terminator();
            let span = Span::new(start, parser.previous_end().max(start));
            TypeClause {
                descriptor,
                expr: Expr::Error(span),
                frame: None,
                span,
            }
        }
    }
}

fn parse_frame<P: ParserSurface>(parser: &mut P) -> Result<Option<ConstraintFrame>, SyntaxError> {
    if parser.current_kind() != TokenKind::Identifier(FRAME_KEYWORD.to_string()) {
        return Ok(None);
    }
    parser.next_token();

    if parser.current_kind() == TokenKind::SpecKeyword(EVERYTHING.to_string()) {
        let span = parser.next_token().span;
        return Ok(Some(ConstraintFrame::Everything(span)));
    }

    let mut methods = Vec::new();
    loop {
        // Only a method name is consumed; anything else stays for recovery.
        let TokenKind::Identifier(name) = parser.current_kind() else {
            return Err(SyntaxError::new(
                format!(
                    "expected a method name in constraint frame, found {}",
                    parser.current_kind()
                ),
                parser.current_span(),
            ));
        };
        let span = parser.next_token().span;
        methods.push(Identifier { name, span });
        if parser.current_kind() != TokenKind::Comma {
            break;
        }
        parser.next_token();
    }
    Ok(Some(ConstraintFrame::Methods(methods)))
}
