use crate::lexer::token::{Literal, Token, TokenKind};
use crate::lexer::{Result, ScanError};

use std::iter::Iterator;

#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    start: usize,
    current: usize,
    line: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            input: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            done: false,
        }
    }

    /// Scans the whole source. The returned sequence always ends in exactly
    /// one `Eof` token.
    pub fn tokenize(source: &str) -> Result<Vec<Token>> {
        Lexer::new(source).collect()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.input.len()
    }

    fn read_char(&mut self) -> u8 {
        let ch = self.input[self.current];
        self.current += 1;
        ch
    }

    fn peek_char(&self) -> u8 {
        self.input.get(self.current).copied().unwrap_or(0)
    }

    fn peek_next_char(&self) -> u8 {
        self.input.get(self.current + 1).copied().unwrap_or(0)
    }

    fn read_if_peek(&mut self, ch: u8, yes: TokenKind, no: TokenKind) -> TokenKind {
        if self.peek_char() == ch {
            self.current += 1;
            yes
        } else {
            no
        }
    }

    fn read_while(&mut self, predicate: fn(u8) -> bool) {
        while !self.is_at_end() && predicate(self.peek_char()) {
            self.current += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek_char() {
                b' ' | b'\r' | b'\t' => self.current += 1,
                b'\n' => {
                    self.line += 1;
                    self.current += 1;
                }
                b'/' if self.peek_next_char() == b'/' => self.read_while(|ch| ch != b'\n'),
                _ => return,
            }
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.current]
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.line)
    }

    fn identifier(&mut self) -> Token {
        self.read_while(is_ident_letter);
        self.token(lookup_ident(self.lexeme()))
    }

    fn number(&mut self) -> Token {
        self.read_while(is_digit);

        // a fractional part needs at least one digit after the `.`
        if self.peek_char() == b'.' && is_digit(self.peek_next_char()) {
            self.current += 1;
            self.read_while(is_digit);
        }

        // digits with an optional `.digits` always parse
        let value = self.lexeme().parse::<f64>().unwrap_or_default();

        self.token(TokenKind::Number)
            .with_literal(Literal::Number(value))
    }

    fn string(&mut self) -> Result<Token> {
        let opened = self.line;

        while !self.is_at_end() && self.peek_char() != b'"' {
            if self.peek_char() == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }

        if self.is_at_end() {
            return Err(ScanError::UnterminatedString {
                line: self.line,
                opened,
            });
        }

        self.current += 1; // the closing `"`

        let value = &self.source[self.start + 1..self.current - 1];
        Ok(self
            .token(TokenKind::String)
            .with_literal(Literal::String(value.to_string())))
    }

    fn scan_token(&mut self) -> Result<Token> {
        let ch = self.read_char();

        #[rustfmt::skip]
        let kind = match ch {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b';' => TokenKind::Semicolon,
            b'/' => TokenKind::Slash,
            b'*' => TokenKind::Star,
            b'!' => self.read_if_peek(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'<' => self.read_if_peek(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.read_if_peek(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'=' => match self.peek_char() {
                b'>' => { self.current += 1; TokenKind::Arrow }
                b'=' => { self.current += 1; TokenKind::EqualEqual }
                _    => TokenKind::Equal,
            },
            b'"' => return self.string(),
            ch if is_digit(ch) => return Ok(self.number()),
            ch if is_letter(ch) => return Ok(self.identifier()),
            _ => {
                let character = self.source[self.start..].chars().next().unwrap_or_default();
                return Err(ScanError::UnexpectedCharacter {
                    character,
                    line: self.line,
                });
            }
        };

        Ok(self.token(kind))
    }
}

fn lookup_ident(ident: &str) -> TokenKind {
    #[rustfmt::skip]
    let kind = match ident {
        "and"      => TokenKind::And,
        "break"    => TokenKind::Break,
        "class"    => TokenKind::Class,
        "continue" => TokenKind::Continue,
        "else"     => TokenKind::Else,
        "false"    => TokenKind::False,
        "for"      => TokenKind::For,
        "fun"      => TokenKind::Fun,
        "if"       => TokenKind::If,
        "nil"      => TokenKind::Nil,
        "or"       => TokenKind::Or,
        "print"    => TokenKind::Print,
        "return"   => TokenKind::Return,
        "super"    => TokenKind::Super,
        "this"     => TokenKind::This,
        "true"     => TokenKind::True,
        "var"      => TokenKind::Var,
        "while"    => TokenKind::While,
        _          => TokenKind::Identifier,
    };

    kind
}

fn is_letter(ch: u8) -> bool {
    (ch as char).is_ascii_alphabetic() || (ch as char) == '_'
}

fn is_digit(ch: u8) -> bool {
    (ch as char).is_ascii_digit()
}

fn is_ident_letter(ch: u8) -> bool {
    is_letter(ch) || is_digit(ch)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            self.done = true;
            return Some(Ok(Token::eof(self.line)));
        }

        let token = self.scan_token();
        if token.is_err() {
            self.done = true;
        }

        Some(token)
    }
}
