use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, not_line_ending},
    combinator::{recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Punctuation and operators, longest spelling first.
const SYMBOLS: &[(&str, TokenKind)] = &[
    ("==>", TokenKind::Implies),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::BangEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::AmpersandAmpersand),
    ("||", TokenKind::PipePipe),
    ("=", TokenKind::Eq),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    (";", TokenKind::Semi),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
];

/// Splits `source` into tokens terminated by [`TokenKind::Eof`].
///
/// Lexing continues past bad characters so every problem in the file is
/// reported at once.
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut cursor = Cursor {
        source,
        rest: source,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    cursor.run();
    if cursor.errors.is_empty() {
        Ok(cursor.tokens)
    } else {
        Err(cursor.errors)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value(
        (),
        alt((
            take_while1(char::is_whitespace),
            recognize(pair(tag("//"), not_line_ending)),
            recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
        )),
    )(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_word_char),
    ))(input)
}

fn integer(input: &str) -> IResult<&str, &str> {
    digit1(input)
}

fn spec_keyword(input: &str) -> IResult<&str, &str> {
    recognize(preceded(char('\\'), take_while1(is_word_char)))(input)
}

// Clause keywords are left as identifiers; the parser decides whether a
// word is a keyword depending on its clause-keyword mode.
fn classify_word(text: &str) -> TokenKind {
    match text {
        "class" => TokenKind::Class,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Identifier(text.to_string()),
    }
}

struct Cursor<'a> {
    source: &'a str,
    rest: &'a str,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Cursor<'a> {
    fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    fn run(&mut self) {
        while !self.rest.is_empty() {
            if let Ok((rest, ())) = trivia(self.rest) {
                self.rest = rest;
            } else if self.rest.starts_with("/*") {
                let start = self.offset();
                self.rest = &self.rest[self.rest.len()..];
                self.error(start, self.offset(), "unterminated block comment");
            } else {
                self.token();
            }
        }
        let end = self.offset();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
    }

    fn token(&mut self) {
        let input = self.rest;
        let start = self.offset();

        if let Ok((rest, text)) = word(input) {
            self.emit(rest, classify_word(text));
        } else if let Ok((rest, text)) = integer(input) {
            match text.parse::<i64>() {
                Ok(number) => self.emit(rest, TokenKind::Integer(number)),
                Err(_) => {
                    self.rest = rest;
                    self.error(start, self.offset(), "integer literal out of range");
                }
            }
        } else if let Ok((rest, text)) = spec_keyword(input) {
            self.emit(rest, TokenKind::SpecKeyword(text.to_string()));
        } else if let Some((text, kind)) = SYMBOLS.iter().find(|(text, _)| input.starts_with(text)) {
            self.emit(&input[text.len()..], kind.clone());
        } else {
            let width = input.chars().next().map_or(1, char::len_utf8);
            self.rest = &input[width..];
            let message = if input.starts_with('\\') {
                "expected a keyword after `\\`".to_string()
            } else {
                format!("unexpected character `{}`", &input[..width])
            };
            self.error(start, self.offset(), message);
        }
    }

    fn emit(&mut self, rest: &'a str, kind: TokenKind) {
        let start = self.offset();
        self.rest = rest;
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.offset()),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }
}
