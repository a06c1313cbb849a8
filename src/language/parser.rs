use crate::language::{
    ast::*,
    clauses::{ClauseKind, ClauseKindDescriptor, ClauseRegistry},
    errors::{SyntaxError, SyntaxErrors, CODE_UNKNOWN_KEYWORD},
    extensions::{state, type_clause, ParserSurface},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
    types::TypeName,
};
use log::trace;

const ALSO: &str = "also";
const RESULT: &str = "\\result";

/// A parsed unit together with every syntax error recovered from on the way.
#[derive(Debug)]
pub struct ParsedUnit {
    pub unit: CompilationUnit,
    pub errors: Vec<SyntaxError>,
}

impl ParsedUnit {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<CompilationUnit, SyntaxErrors> {
        if self.errors.is_empty() {
            Ok(self.unit)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }
}

pub fn parse_unit(registry: &ClauseRegistry, source: &str) -> ParsedUnit {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errors = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return ParsedUnit {
                unit: CompilationUnit::default(),
                errors,
            };
        }
    };
    Parser::new(registry, tokens).parse()
}

pub struct Parser<'r> {
    registry: &'r ClauseRegistry,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    /// While set, registered clause keywords are reserved words.
    clause_keywords: bool,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r ClauseRegistry, tokens: Vec<Token>) -> Self {
        Self {
            registry,
            tokens,
            pos: 0,
            errors: Vec::new(),
            clause_keywords: true,
        }
    }

    pub fn parse(mut self) -> ParsedUnit {
        let mut classes = Vec::new();

        while !self.is_eof() {
            if self.check(&TokenKind::Class) {
                match self.parse_class() {
                    Ok(class) => classes.push(class),
                    Err(err) => {
                        self.report(err);
                        self.synchronize_class();
                    }
                }
                continue;
            }
            let err = self.error_here(format!(
                "expected class declaration, found {}",
                self.peek_kind()
            ));
            self.report(err);
            self.advance();
            self.synchronize_class();
        }

        ParsedUnit {
            unit: CompilationUnit { classes },
            errors: self.errors,
        }
    }

    fn parse_class(&mut self) -> Result<ClassDecl, SyntaxError> {
        let start = self.advance().span.start;
        let name = self.expect_identifier("expected class name")?;
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_member() {
                Ok(member) => members.push(member),
                Err(err) => {
                    self.report(err);
                    self.synchronize_member();
                }
            }
        }
        if let Err(err) = self.expect(TokenKind::RBrace) {
            self.report(err);
        }

        Ok(ClassDecl {
            name,
            members,
            span: Span::new(start, self.previous_end()),
        })
    }

    fn parse_member(&mut self) -> Result<Member, SyntaxError> {
        if let Some(descriptor) = self.clause_keyword() {
            return match descriptor.kind {
                ClauseKind::TypeClause(_) => {
                    Ok(Member::Clause(type_clause::parse(self, descriptor)))
                }
                ClauseKind::MethodSpec(_) => self.parse_specified_method().map(Member::Method),
                ClauseKind::Declaration => self.parse_ghost_field(descriptor).map(Member::Field),
                _ => Err(self.error_here(format!(
                    "`{}` is not allowed in a class body",
                    descriptor.keyword
                ))),
            };
        }
        if self.clause_keywords && self.peek_kind().is_identifier(ALSO) {
            return Err(self.error_here("`also` must follow a specification case"));
        }

        let ty = self.parse_type_name()?;
        let name = self.expect_identifier("expected member name")?;
        if self.check(&TokenKind::LParen) {
            return self
                .parse_method(Vec::new(), ty, name)
                .map(Member::Method);
        }
        self.parse_field(ty, name).map(Member::Field)
    }

    /// `ghost T name [= init];` at class level.
    fn parse_ghost_field(
        &mut self,
        descriptor: ClauseKindDescriptor,
    ) -> Result<FieldDecl, SyntaxError> {
        let start = self.advance().span.start;
        let ty = self.parse_type_name()?;
        let name = self.expect_identifier("expected ghost field name")?;
        let mut field = self.parse_field(ty, name)?;
        field.ghost = Some(descriptor);
        field.span = Span::new(start, field.span.end);
        Ok(field)
    }

    fn parse_field(&mut self, ty: TypeName, name: Identifier) -> Result<FieldDecl, SyntaxError> {
        let start = ty.span.start;
        let init = if self.matches(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(FieldDecl {
            ty,
            name,
            init,
            ghost: None,
            span: Span::new(start, self.previous_end()),
        })
    }

    fn parse_specified_method(&mut self) -> Result<MethodDecl, SyntaxError> {
        let spec_cases = self.parse_spec_cases()?;
        let ty = self.parse_type_name()?;
        let name = self.expect_identifier("expected method name after specification")?;
        if !self.check(&TokenKind::LParen) {
            return Err(self.error_here("specification cases must be followed by a method"));
        }
        self.parse_method(spec_cases, ty, name)
    }

    fn parse_spec_cases(&mut self) -> Result<Vec<SpecCase>, SyntaxError> {
        let mut cases = Vec::new();
        loop {
            let start = self.current_span().start;
            let mut clauses = Vec::new();
            while let Some(descriptor) = self
                .clause_keyword()
                .filter(|descriptor| descriptor.kind.is_method_spec())
            {
                clauses.push(self.parse_spec_clause(descriptor)?);
            }
            if clauses.is_empty() {
                return Err(self.error_here("expected `requires` or `ensures`"));
            }
            cases.push(SpecCase {
                clauses,
                span: Span::new(start, self.previous_end()),
            });

            if !self.peek_kind().is_identifier(ALSO) {
                break;
            }
            self.advance();
        }
        Ok(cases)
    }

    /// `keyword expr ;` with clause keywords read as identifiers in `expr`.
    fn parse_spec_clause(
        &mut self,
        descriptor: ClauseKindDescriptor,
    ) -> Result<SpecClause, SyntaxError> {
        let start = self.advance().span.start;
        let expr = self.with_clause_keywords(false, |parser| parser.parse_expression())?;
        self.expect(TokenKind::Semi)?;
        Ok(SpecClause {
            descriptor,
            expr,
            span: Span::new(start, self.previous_end()),
        })
    }

    fn parse_method(
        &mut self,
        spec_cases: Vec<SpecCase>,
        return_type: TypeName,
        name: Identifier,
    ) -> Result<MethodDecl, SyntaxError> {
        let start = spec_cases
            .first()
            .map(|case| case.span.start)
            .unwrap_or(return_type.span.start);
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;

        Ok(MethodDecl {
            return_type,
            name,
            params,
            spec_cases,
            body,
            span: Span::new(start, self.previous_end()),
        })
    }

    fn parse_param(&mut self) -> Result<Param, SyntaxError> {
        let ty = self.parse_type_name()?;
        let name = self.expect_identifier("expected parameter name")?;
        let span = ty.span.union(name.span);
        Ok(Param { ty, name, span })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            let statement_start = self.current_span().start;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.report(err);
                    self.skip_through_terminator();
                    let end = self.previous_end().max(statement_start);
                    statements.push(Statement::Error(Span::new(statement_start, end)));
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            TokenKind::LBrace => return self.parse_block().map(Statement::Block),
            TokenKind::Return => return self.parse_return(),
            _ => {}
        }

        if let Some(descriptor) = self.clause_keyword() {
            return match descriptor.kind {
                ClauseKind::Statement(_) => {
                    self.parse_spec_clause(descriptor).map(Statement::Clause)
                }
                ClauseKind::Declaration => {
                    self.advance();
                    let decl = self.parse_local()?;
                    Ok(Statement::Ghost { descriptor, decl })
                }
                _ => Err(self.error_here(format!(
                    "`{}` is not allowed in a method body",
                    descriptor.keyword
                ))),
            };
        }

        if let TokenKind::Identifier(_) = self.peek_kind() {
            match self.peek_kind_n(1) {
                TokenKind::Colon => return self.parse_labeled(),
                TokenKind::Identifier(_) => return self.parse_local().map(Statement::Local),
                TokenKind::Eq => return self.parse_assign(),
                _ => {}
            }
        }

        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Expr(expr))
    }

    fn parse_local(&mut self) -> Result<LocalDecl, SyntaxError> {
        let ty = self.parse_type_name()?;
        let name = self.expect_identifier("expected variable name")?;
        let init = if self.matches(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        let span = Span::new(ty.span.start, self.previous_end());
        Ok(LocalDecl {
            ty,
            name,
            init,
            span,
        })
    }

    fn parse_labeled(&mut self) -> Result<Statement, SyntaxError> {
        let label = self.expect_identifier("expected label")?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_statement()?;
        Ok(Statement::Labeled {
            span: Span::new(label.span.start, self.previous_end()),
            label,
            body: Box::new(body),
        })
    }

    fn parse_assign(&mut self) -> Result<Statement, SyntaxError> {
        let target = self.expect_identifier("expected assignment target")?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Assign {
            span: Span::new(target.span.start, self.previous_end()),
            target,
            value,
        })
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().span.start;
        let value = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Return {
            value,
            span: Span::new(start, self.previous_end()),
        })
    }

    /// `==>` binds loosest and groups to the right.
    fn parse_implication(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_binary(0)?;
        if self.matches(TokenKind::Implies) {
            let right = self.parse_implication()?;
            let span = left.span().union(right.span());
            return Ok(Expr::Binary {
                op: BinaryOp::Implies,
                left: Box::new(left),
                right: Box::new(right),
                span,
            });
        }
        Ok(left)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span().union(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span.start;
            let expr = self.parse_unary()?;
            let span = Span::new(start, expr.span().end);
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                span,
            });
        }
        let primary = self.parse_primary()?;
        self.parse_trailers(primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let reserved = self.clause_keyword();
                let span = self.advance().span;
                match reserved {
                    Some(descriptor) => Ok(self.syntax_error(
                        SyntaxError::new(
                            format!("`{}` is a clause keyword here", descriptor.keyword),
                            span,
                        )
                        .with_help("clause keywords can be used as names only inside clause bodies"),
                    )),
                    None => Ok(Expr::Identifier(Identifier { name, span })),
                }
            }
            TokenKind::Integer(value) => {
                let span = self.advance().span;
                Ok(Expr::Int(value, span))
            }
            TokenKind::True => {
                let span = self.advance().span;
                Ok(Expr::Bool(true, span))
            }
            TokenKind::False => {
                let span = self.advance().span;
                Ok(Expr::Bool(false, span))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::SpecKeyword(word) => self.parse_spec_keyword(&word),
            other => Err(self.error_here(format!("expected expression, found {other}"))),
        }
    }

    fn parse_spec_keyword(&mut self, word: &str) -> Result<Expr, SyntaxError> {
        if word == RESULT {
            let span = self.advance().span;
            return Ok(Expr::Result(span));
        }
        let state = self
            .registry
            .get(word)
            .and_then(|descriptor| Some((*descriptor, descriptor.state_keyword()?)));
        match state {
            Some((descriptor, keyword)) => state::parse(self, descriptor, keyword),
            None => {
                let span = self.advance().span;
                Ok(self.syntax_error(
                    SyntaxError::new(format!("unknown specification keyword `{word}`"), span)
                        .with_code(CODE_UNKNOWN_KEYWORD),
                ))
            }
        }
    }

    fn parse_type_name(&mut self) -> Result<TypeName, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(TypeName::new(name, span))
            }
            other => Err(self.error_here(format!("expected type, found {other}"))),
        }
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            TokenKind::Plus => Some((BinaryOp::Add, 10)),
            TokenKind::Minus => Some((BinaryOp::Sub, 10)),
            TokenKind::Star => Some((BinaryOp::Mul, 20)),
            TokenKind::Slash => Some((BinaryOp::Div, 20)),
            TokenKind::Percent => Some((BinaryOp::Rem, 20)),
            TokenKind::AmpersandAmpersand => Some((BinaryOp::And, 4)),
            TokenKind::PipePipe => Some((BinaryOp::Or, 3)),
            TokenKind::EqEq => Some((BinaryOp::Eq, 5)),
            TokenKind::BangEq => Some((BinaryOp::NotEq, 5)),
            TokenKind::Lt => Some((BinaryOp::Lt, 9)),
            TokenKind::LtEq => Some((BinaryOp::LtEq, 9)),
            TokenKind::Gt => Some((BinaryOp::Gt, 9)),
            TokenKind::GtEq => Some((BinaryOp::GtEq, 9)),
            _ => None,
        }
    }

    /// The registered clause keyword under the cursor, if keywords are live.
    fn clause_keyword(&self) -> Option<ClauseKindDescriptor> {
        if !self.clause_keywords {
            return None;
        }
        match self.tokens.get(self.pos).map(|token| &token.kind) {
            Some(TokenKind::Identifier(word)) => self.registry.get(word).copied(),
            _ => None,
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected {kind}, found {}", self.peek_kind())))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.pos)
            .is_some_and(|token| &token.kind == kind)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_n(0)
    }

    fn peek_kind_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|token| token.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    /// Consumes the current token. The end-of-file token is never consumed.
    fn advance(&mut self) -> Token {
        match self.tokens.get(self.pos) {
            Some(token) => {
                let token = token.clone();
                if token.kind != TokenKind::Eof {
                    self.pos += 1;
                }
                token
            }
            None => Token {
                kind: TokenKind::Eof,
                span: self.current_span(),
            },
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.current_span())
    }

    fn synchronize_class(&mut self) {
        while !self.is_eof() && !self.check(&TokenKind::Class) {
            self.advance();
        }
    }

    /// Skips the rest of a broken member: through its `;`, or over one
    /// balanced `{ ... }` body, stopping before the class's closing brace.
    fn synchronize_member(&mut self) {
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.peek_kind() {
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }
}

impl ParserSurface for Parser<'_> {
    fn current_kind(&self) -> TokenKind {
        self.peek_kind()
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|token| token.span)
            .unwrap_or_default()
    }

    fn previous_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|idx| self.tokens.get(idx)) {
            Some(token) => token.span.end,
            None => 0,
        }
    }

    fn next_token(&mut self) -> Token {
        self.advance()
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_implication()
    }

    fn parse_trailers(&mut self, mut expr: Expr) -> Result<Expr, SyntaxError> {
        loop {
            if self.check(&TokenKind::LParen) {
                let args = self.parse_arguments()?;
                let span = Span::new(expr.span().start, self.previous_end());
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
                continue;
            }
            if self.matches(TokenKind::Dot) {
                let field = self.expect_identifier("expected field name after `.`")?;
                let span = expr.span().union(field.span);
                expr = Expr::FieldAccess {
                    base: Box::new(expr),
                    field,
                    span,
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn report(&mut self, error: SyntaxError) {
        self.errors.push(error);
    }

    fn skip_through_terminator(&mut self) {
        while !self.is_eof() {
            match self.peek_kind() {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn clause_keywords(&self) -> bool {
        self.clause_keywords
    }

    fn set_clause_keywords(&mut self, enabled: bool) -> bool {
        trace!("clause keywords {}", if enabled { "on" } else { "off" });
        std::mem::replace(&mut self.clause_keywords, enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{
        clauses::{StateKeyword, TypeClauseKeyword},
        errors::{CODE_ARGS_REQUIRED, CODE_BAD_CONSTRUCT},
    };

    fn parse(source: &str) -> ParsedUnit {
        parse_unit(&ClauseRegistry::standard(), source)
    }

    fn single_class(source: &str) -> ClassDecl {
        let parsed = parse(source);
        assert!(parsed.errors.is_empty(), "unexpected errors: {:?}", parsed.errors);
        parsed.unit.classes.into_iter().next().expect("one class")
    }

    fn field_init(class: &ClassDecl, name: &str) -> Expr {
        class
            .fields()
            .find(|field| field.name.name == name)
            .and_then(|field| field.init.clone())
            .expect("field with initializer")
    }

    #[test]
    fn parses_members_and_spec_cases() {
        let class = single_class(
            r"class Account {
                int balance;
                invariant balance >= 0;
                requires amount > 0;
                ensures balance == \old(balance) + amount;
                also
                requires amount == 0;
                void deposit(int amount) {
                    start: balance = balance + amount;
                    assert balance >= \old(balance, start);
                    ghost int delta = balance - \old(balance);
                    return;
                }
            }",
        );
        assert_eq!(class.name.name, "Account");
        assert_eq!(class.fields().count(), 1);
        assert_eq!(class.clauses().count(), 1);
        let method = class.methods().next().expect("method");
        assert_eq!(method.spec_cases.len(), 2);
        assert_eq!(method.spec_cases[0].clauses.len(), 2);
        assert_eq!(method.params.len(), 1);
        assert!(matches!(method.body.statements[0], Statement::Labeled { .. }));
        assert!(matches!(method.body.statements[1], Statement::Clause(_)));
        assert!(matches!(method.body.statements[2], Statement::Ghost { .. }));
    }

    #[test]
    fn lex_errors_surface_as_syntax_errors() {
        let parsed = parse("class C { int x = 1 # 2; }");
        assert!(parsed.has_errors());
        assert!(parsed.unit.classes.is_empty());
        let err = parsed.into_result().unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(
            err.to_string(),
            "1 syntax error(s), first: unexpected character `#`"
        );
        assert!(parse("class C { }").into_result().is_ok());
    }

    #[test]
    fn argument_lists_are_not_arity_checked() {
        let class = single_class(r"class C { int x = \old(a, b, c); int y = \pre(); }");
        match field_init(&class, "x") {
            Expr::State(node) => {
                assert_eq!(node.token, StateKeyword::Old);
                assert_eq!(node.arguments.len(), 3);
            }
            other => panic!("expected state expression, got {other:?}"),
        }
        match field_init(&class, "y") {
            Expr::State(node) => assert!(node.arguments.is_empty()),
            other => panic!("expected state expression, got {other:?}"),
        }
    }

    #[test]
    fn missing_argument_list_leaves_a_placeholder() {
        let parsed = parse(r"class C { int x = \old y; int z; }");
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].code, Some(CODE_ARGS_REQUIRED));
        let class = &parsed.unit.classes[0];
        assert!(class.fields().any(|field| field.name.name == "z"));
    }

    #[test]
    fn selectors_continue_after_the_invocation() {
        let class = single_class(r"class C { int x = \old(a).size; }");
        match field_init(&class, "x") {
            Expr::FieldAccess { base, field, .. } => {
                assert_eq!(field.name, "size");
                assert!(matches!(*base, Expr::State(_)));
            }
            other => panic!("expected field access, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_constraint_recovers_at_the_next_terminator() {
        let parsed = parse("class C { int x; constraint x >= ; int y; }");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, Some(CODE_BAD_CONSTRUCT));
        let class = &parsed.unit.classes[0];
        let clause = class.clauses().next().expect("clause kept");
        assert!(matches!(clause.expr, Expr::Error(_)));
        assert!(class.fields().any(|field| field.name.name == "y"));
    }

    #[test]
    fn ghost_fields_are_class_members() {
        let class = single_class(r"class C { int x; ghost int g = \old(x); }");
        let ghost = class
            .fields()
            .find(|field| field.name.name == "g")
            .expect("ghost field");
        assert_eq!(ghost.ghost.map(|descriptor| descriptor.kind), Some(ClauseKind::Declaration));
        assert!(matches!(ghost.init, Some(Expr::State(_))));
        assert!(class.fields().all(|field| field.name.name == "g" || field.ghost.is_none()));
    }

    #[test]
    fn malformed_frame_leaves_the_next_member_alone() {
        let parsed = parse("class C { int x; constraint x > 0 for ; int y; }");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, Some(CODE_BAD_CONSTRUCT));
        let class = &parsed.unit.classes[0];
        let fields: Vec<_> = class.fields().map(|field| field.name.name.as_str()).collect();
        assert_eq!(fields, ["x", "y"]);
        assert!(class.clauses().next().is_some_and(|clause| clause.frame.is_none()));
    }

    #[test]
    fn malformed_frame_keeps_the_closing_brace() {
        let parsed = parse("class C { constraint true for } class D { int y; }");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.unit.classes.len(), 2);
        assert_eq!(parsed.unit.classes[1].fields().count(), 1);
    }

    #[test]
    fn recovery_stops_before_the_closing_brace() {
        let parsed = parse("class C { invariant x > 0 } class D { int y; }");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.unit.classes.len(), 2);
        assert_eq!(parsed.unit.classes[1].fields().count(), 1);
    }

    #[test]
    fn constraint_frames() {
        let class = single_class(
            r"class C { int x; constraint x >= \old(x) for inc, dec; constraint true for \everything; }",
        );
        let frames: Vec<_> = class.clauses().map(|clause| clause.frame.clone()).collect();
        match &frames[0] {
            Some(ConstraintFrame::Methods(methods)) => {
                let names: Vec<_> = methods.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, ["inc", "dec"]);
            }
            other => panic!("expected method frame, got {other:?}"),
        }
        assert!(matches!(frames[1], Some(ConstraintFrame::Everything(_))));
    }

    #[test]
    fn clause_keywords_are_plain_names_inside_clause_bodies() {
        let parsed = parse("class C { invariant initially > 0; int z = invariant; }");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("clause keyword"));
        let clause = parsed.unit.classes[0].clauses().next().expect("clause");
        assert!(matches!(clause.expr, Expr::Binary { .. }));
    }

    #[test]
    fn keyword_mode_is_restored_after_a_failed_clause() {
        let registry = ClauseRegistry::standard();
        let tokens = lex("invariant ; int").unwrap();
        let mut parser = Parser::new(&registry, tokens);
        let descriptor = *registry.lookup("invariant").unwrap();
        let clause = type_clause::parse(&mut parser, descriptor);
        assert!(matches!(clause.expr, Expr::Error(_)));
        assert!(parser.clause_keywords());
        assert_eq!(parser.current_kind(), TokenKind::Identifier("int".into()));
    }

    #[test]
    fn unknown_backslash_keyword() {
        let parsed = parse(r"class C { int x = \forall(y); }");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, Some(CODE_UNKNOWN_KEYWORD));
    }

    #[test]
    fn implication_is_loosest_and_right_associative() {
        let class = single_class("class C { boolean b = p && q ==> r ==> s; }");
        match field_init(&class, "b") {
            Expr::Binary {
                op: BinaryOp::Implies,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::And, .. }));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Implies, .. }));
            }
            other => panic!("expected implication, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_follows_the_registry() {
        let mut builder = ClauseRegistry::builder();
        builder
            .register(ClauseKindDescriptor::of(ClauseKind::TypeClause(
                TypeClauseKeyword::Invariant,
            )))
            .unwrap();
        let registry = builder.build();
        let parsed = parse_unit(&registry, r"class C { axiom x; invariant \old(x) > 0; }");
        // `\old` is not registered here and `axiom` is an ordinary type name.
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, Some(CODE_UNKNOWN_KEYWORD));
        let class = &parsed.unit.classes[0];
        assert_eq!(class.fields().next().map(|f| f.ty.name.as_str()), Some("axiom"));
    }
}
