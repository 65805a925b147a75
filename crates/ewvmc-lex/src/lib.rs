//! ewvmc-lex - lexical analysis for the Pascal-standard source language.
//!
//! The lexer is total: every input string produces a finite token stream
//! terminated by [`Token::Eof`], and any character the lexer cannot classify
//! is reported through the [`Handler`] and skipped rather than causing the
//! lexer to stop. This mirrors the panic-mode recovery the rest of the
//! pipeline uses — a lexical error does not, by itself, abort compilation
//! until the diagnostic count is checked after the whole file has been
//! scanned.
//!
//! Identifiers and keywords are recognized case-insensitively: the lexeme is
//! lowercased before it is classified, so `WRITE`, `Write`, and `write` all
//! produce the same [`Token::Write`].

use ewvmc_util::diagnostic::{Diagnostic, Handler};
use ewvmc_util::{Span, Symbol};

/// A lexical token with no location attached; callers that need a location
/// pair this with the `(line, column)` returned alongside it by
/// [`Lexer::next_token`].
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Reserved words.
    Program,
    Begin,
    End,
    Var,
    Integer,
    Boolean,
    StringKw,
    Array,
    Of,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,
    DownTo,
    Function,
    Procedure,
    Read,
    ReadLn,
    Write,
    WriteLn,
    True,
    False,
    Div,
    Mod,
    And,
    Or,
    Not,

    // Identifiers and literals.
    Ident(Symbol),
    IntegerLit(i64),
    RealLit(f64),
    StringLit(Symbol),

    // Operators and punctuation.
    Plus,
    Minus,
    Star,
    Slash,
    Assign,    // :=
    Eq,        // =
    NotEq,     // <>
    Lt,
    Gt,
    LtEq,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    DotDot,

    Eof,
}

/// A single invalid character encountered while scanning, with its location.
#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub text: String,
}

const KEYWORDS: &[(&str, fn() -> Token)] = &[
    ("program", || Token::Program),
    ("begin", || Token::Begin),
    ("end", || Token::End),
    ("var", || Token::Var),
    ("integer", || Token::Integer),
    ("boolean", || Token::Boolean),
    ("string", || Token::StringKw),
    ("array", || Token::Array),
    ("of", || Token::Of),
    ("if", || Token::If),
    ("then", || Token::Then),
    ("else", || Token::Else),
    ("while", || Token::While),
    ("do", || Token::Do),
    ("for", || Token::For),
    ("to", || Token::To),
    ("downto", || Token::DownTo),
    ("function", || Token::Function),
    ("procedure", || Token::Procedure),
    ("read", || Token::Read),
    ("readln", || Token::ReadLn),
    ("write", || Token::Write),
    ("writeln", || Token::WriteLn),
    ("true", || Token::True),
    ("false", || Token::False),
    ("div", || Token::Div),
    ("mod", || Token::Mod),
    ("and", || Token::And),
    ("or", || Token::Or),
    ("not", || Token::Not),
];

fn keyword_or_ident(lowered: &str, interner: &mut ewvmc_util::Interner) -> Token {
    for (kw, make) in KEYWORDS {
        if *kw == lowered {
            return make();
        }
    }
    Token::Ident(interner.intern(lowered))
}

/// Lexes one source file. Owns its own character cursor; line/column are
/// tracked incrementally so they never require a backward scan.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    line: u32,
    column: u32,
    interner: &'a mut ewvmc_util::Interner,
    handler: &'a mut Handler,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, interner: &'a mut ewvmc_util::Interner, handler: &'a mut Handler) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
            interner,
            handler,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn at_eof(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.source[self.position..].starts_with(s)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.advance();
                }
                Some('{') => {
                    while let Some(c) = self.peek() {
                        self.advance();
                        if c == '}' {
                            break;
                        }
                    }
                }
                Some('(') if self.peek2() == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        if self.at_eof() {
                            break;
                        }
                        if self.starts_with("*)") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Returns the next token together with the (line, column) of its first
    /// character. Returns `Token::Eof` forever once the input is exhausted.
    pub fn next_token(&mut self) -> (Token, u32, u32) {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);

        let Some(c) = self.peek() else {
            return (Token::Eof, line, column);
        };

        if c.is_ascii_alphabetic() {
            return (self.lex_identifier(), line, column);
        }
        if c.is_ascii_digit() {
            return (self.lex_number(), line, column);
        }
        if c == '\'' {
            return (self.lex_string(), line, column);
        }

        let tok = match c {
            '+' => { self.advance(); Token::Plus }
            '-' => { self.advance(); Token::Minus }
            '*' => { self.advance(); Token::Star }
            '/' => { self.advance(); Token::Slash }
            '(' => { self.advance(); Token::LParen }
            ')' => { self.advance(); Token::RParen }
            '[' => { self.advance(); Token::LBracket }
            ']' => { self.advance(); Token::RBracket }
            ',' => { self.advance(); Token::Comma }
            ';' => { self.advance(); Token::Semicolon }
            '=' => { self.advance(); Token::Eq }
            ':' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Assign
                } else {
                    Token::Colon
                }
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('>') => { self.advance(); Token::NotEq }
                    Some('=') => { self.advance(); Token::LtEq }
                    _ => Token::Lt,
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '.' => {
                self.advance();
                if self.peek() == Some('.') {
                    self.advance();
                    Token::DotDot
                } else {
                    Token::Dot
                }
            }
            other => {
                self.advance();
                self.handler.emit_diagnostic(Diagnostic::error(
                    format!("unexpected character '{other}'"),
                    Span::point(line, column),
                ));
                // Recurse: an invalid character is skipped, not surfaced as
                // a token, keeping the parser free of an `Invalid` variant.
                return self.next_token();
            }
        };
        (tok, line, column)
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.position];
        keyword_or_ident(&text.to_lowercase(), self.interner)
    }

    /// Real literals are tried before integer literals: `digits ['.' digits]
    /// [('e'|'E') ['+'|'-'] digits]`, but a bare `digits` followed by `..`
    /// (the array-bound range operator) must not be consumed as the start
    /// of a real literal's fractional part.
    fn lex_number(&mut self) -> Token {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_real = false;

        if self.peek() == Some('.') && self.peek2() != Some('.') {
            if let Some(c) = self.peek2() {
                if c.is_ascii_digit() {
                    is_real = true;
                    self.advance(); // '.'
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.advance();
                    }
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.position + 1;
            let rest = &self.source[lookahead..];
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                if c == '+' || c == '-' {
                    lookahead += c.len_utf8();
                }
            }
            if self.source[lookahead..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
            {
                is_real = true;
                self.advance(); // e/E
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start..self.position];
        if is_real {
            Token::RealLit(text.parse().unwrap_or(0.0))
        } else {
            Token::IntegerLit(text.parse().unwrap_or(0))
        }
    }

    /// `'...'` with `''` as an escaped literal quote.
    fn lex_string(&mut self) -> Token {
        let open_line = self.line;
        let open_col = self.column;
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    self.handler.emit_diagnostic(Diagnostic::error(
                        "unterminated string literal",
                        Span::point(open_line, open_col),
                    ));
                    break;
                }
                Some('\'') => {
                    self.advance();
                    if self.peek() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Token::StringLit(self.interner.intern_raw(&value))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (Token, u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_token();
        if item.0 == Token::Eof {
            None
        } else {
            Some(item)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> (Vec<Token>, usize) {
        let mut interner = ewvmc_util::Interner::new();
        let mut handler = Handler::new();
        let mut lexer = Lexer::new(src, &mut interner, &mut handler);
        let mut tokens = Vec::new();
        loop {
            let (tok, _, _) = lexer.next_token();
            if tok == Token::Eof {
                break;
            }
            tokens.push(tok);
        }
        (tokens, handler.error_count())
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let (tokens, _) = lex_all("PROGRAM BEGIN end Var");
        assert_eq!(tokens, vec![Token::Program, Token::Begin, Token::End, Token::Var]);
    }

    #[test]
    fn identifiers_intern_lowercased() {
        let mut interner = ewvmc_util::Interner::new();
        let mut handler = Handler::new();
        let mut lexer = Lexer::new("Total total", &mut interner, &mut handler);
        let (a, _, _) = lexer.next_token();
        let (b, _, _) = lexer.next_token();
        assert_eq!(a, b);
    }

    #[test]
    fn integer_and_real_literals() {
        let (tokens, _) = lex_all("42 3.14 2e10 5.0e-3");
        assert_eq!(
            tokens,
            vec![
                Token::IntegerLit(42),
                Token::RealLit(3.14),
                Token::RealLit(2e10),
                Token::RealLit(5.0e-3),
            ]
        );
    }

    #[test]
    fn array_bound_range_not_mistaken_for_real() {
        let (tokens, _) = lex_all("1..10");
        assert_eq!(
            tokens,
            vec![Token::IntegerLit(1), Token::DotDot, Token::IntegerLit(10)]
        );
    }

    #[test]
    fn string_literal_with_escaped_quote() {
        let (tokens, errs) = lex_all("'it''s'");
        assert_eq!(errs, 0);
        match &tokens[0] {
            Token::StringLit(_) => {}
            other => panic!("expected StringLit, got {other:?}"),
        }
    }

    #[test]
    fn operator_lookahead() {
        let (tokens, _) = lex_all(":= <> <= >= < > =");
        assert_eq!(
            tokens,
            vec![
                Token::Assign,
                Token::NotEq,
                Token::LtEq,
                Token::GtEq,
                Token::Lt,
                Token::Gt,
                Token::Eq,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let (tokens, _) = lex_all("{ a comment } begin (* another *) end");
        assert_eq!(tokens, vec![Token::Begin, Token::End]);
    }

    #[test]
    fn invalid_character_is_reported_and_skipped() {
        let (tokens, errs) = lex_all("begin @ end");
        assert_eq!(errs, 1);
        assert_eq!(tokens, vec![Token::Begin, Token::End]);
    }

    #[test]
    fn an_identifier_may_not_start_with_an_underscore() {
        // §4.1: `[A-Za-z][A-Za-z0-9_]*` - a leading `_` is not a valid
        // identifier start, so it is reported and skipped one character at
        // a time like any other invalid character.
        let (tokens, errs) = lex_all("begin _x end");
        assert_eq!(errs, 1);
        match &tokens[1] {
            Token::Ident(_) => {}
            other => panic!("expected 'x' to lex as an identifier, got {other:?}"),
        }
        assert_eq!(tokens, vec![Token::Begin, tokens[1].clone(), Token::End]);
    }

    #[test]
    fn lexing_is_total_over_arbitrary_bytes() {
        let weird = "\u{0}\u{7}~`\\";
        let (_, _errs) = lex_all(weird);
        // Must terminate and not panic; every byte is either classified or
        // reported as an error.
    }

    proptest::proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(s in "\\PC*") {
            let mut interner = ewvmc_util::Interner::new();
            let mut handler = Handler::new();
            let mut lexer = Lexer::new(&s, &mut interner, &mut handler);
            loop {
                let (tok, _, _) = lexer.next_token();
                if tok == Token::Eof {
                    break;
                }
            }
        }
    }
}
