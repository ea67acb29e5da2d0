//! Tokenizer and parsers for class and generic specifications
//!
//! Grammar:
//! - superclasses: `Name {, Name}`
//! - members:      `[Class] name [*] [= constant] {, ...}`
//! - generics:     `[+|-|@] name(Class {, Class})`

use crate::error::{AdiError, AdiResult};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Sym(String),
    Int(i64),
    Real(f64),
    Str(String),
    Comma,
    Star,
    Assign,
    LParen,
    RParen,
    Plus,
    Minus,
    At,
    Other(char),
    End,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn take_while(&mut self, out: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
    }

    fn number(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        self.take_while(&mut text, |c| c.is_ascii_digit());

        let mut real = first == '.';
        if !real && self.chars.peek() == Some(&'.') {
            real = true;
            text.push('.');
            self.chars.next();
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }

        if matches!(self.chars.peek(), Some('e' | 'E' | 'd' | 'D')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let mut exponent = String::from("e");
            if let Some(&sign) = lookahead.peek() {
                if sign == '+' || sign == '-' {
                    exponent.push(sign);
                    lookahead.next();
                }
            }
            if matches!(lookahead.peek(), Some(c) if c.is_ascii_digit()) {
                self.chars = lookahead;
                self.take_while(&mut exponent, |c| c.is_ascii_digit());
                text.push_str(&exponent);
                real = true;
            }
        }

        if real {
            text.parse().map(Token::Real).unwrap_or(Token::Other(first))
        } else {
            match text.parse() {
                Ok(value) => Token::Int(value),
                Err(_) => text.parse().map(Token::Real).unwrap_or(Token::Other(first)),
            }
        }
    }

    fn string(&mut self, quote: char) -> Token {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                // Doubled quote stands for itself
                Some(c) if c == quote => {
                    if self.chars.peek() == Some(&quote) {
                        text.push(quote);
                        self.chars.next();
                    } else {
                        return Token::Str(text);
                    }
                }
                Some(c) => text.push(c),
                None => return Token::Other(quote),
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(c) = self.chars.next() else {
            return Token::End;
        };

        match c {
            ',' => Token::Comma,
            '*' => Token::Star,
            '=' => Token::Assign,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '@' => Token::At,
            '\'' | '"' => self.string(c),
            '.' if matches!(self.chars.peek(), Some(d) if d.is_ascii_digit()) => self.number(c),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::from(c);
                self.take_while(&mut name, |c| c.is_alphanumeric() || c == '_' || c == '$');
                Token::Sym(name)
            }
            other => Token::Other(other),
        }
    }

    /// Every remaining token, ending with `Token::End`
    pub fn tokens(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let token = self.next_token();
            let end = token == Token::End;
            out.push(token);
            if end {
                return out;
            }
        }
    }
}

/// Cursor over a token list
pub struct Tokens {
    tokens: Vec<Token>,
    pos: usize,
}

impl Tokens {
    pub fn new(input: &str) -> Self {
        Self {
            tokens: Lexer::new(input).tokens(),
            pos: 0,
        }
    }

    pub fn peek(&self) -> &Token {
        // The lexer always ends the list with `Token::End`
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn at_end(&self) -> bool {
        *self.peek() == Token::End
    }
}

/// Constant initialiser of a class member
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Integer(i32),
    Double(f64),
    Text(String),
    Logical(bool),
}

/// One parsed member declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSpec {
    pub class: Option<String>,
    pub name: String,
    pub default: bool,
    pub constant: Option<Constant>,
}

fn super_syntax() -> AdiError {
    AdiError::invalid("Syntax error in superclass specification")
}

fn member_syntax() -> AdiError {
    AdiError::invalid("Syntax error in member specification")
}

/// Parse a comma-separated superclass list
pub fn parse_supers(spec: &str) -> AdiResult<Vec<String>> {
    let mut tokens = Tokens::new(spec);
    let mut names = Vec::new();

    if tokens.at_end() {
        return Ok(names);
    }

    loop {
        match tokens.advance() {
            Token::Sym(name) => names.push(name),
            _ => return Err(super_syntax()),
        }
        match tokens.advance() {
            Token::Comma => {}
            Token::End => return Ok(names),
            _ => return Err(super_syntax()),
        }
    }
}

fn parse_constant(tokens: &mut Tokens) -> AdiResult<Constant> {
    let negative = tokens.eat(&Token::Minus);
    if !negative {
        tokens.eat(&Token::Plus);
    }

    let constant = match tokens.advance() {
        Token::Int(v) => {
            let v = if negative { -v } else { v };
            match i32::try_from(v) {
                Ok(v) => Constant::Integer(v),
                Err(_) => Constant::Double(v as f64),
            }
        }
        Token::Real(x) => Constant::Double(if negative { -x } else { x }),
        Token::Str(s) if !negative => Constant::Text(s),
        Token::Sym(s) if !negative && s.eq_ignore_ascii_case("TRUE") => Constant::Logical(true),
        Token::Sym(s) if !negative && s.eq_ignore_ascii_case("FALSE") => Constant::Logical(false),
        _ => return Err(member_syntax()),
    };
    Ok(constant)
}

/// Parse a comma-separated member list
pub fn parse_members(spec: &str) -> AdiResult<Vec<MemberSpec>> {
    let mut tokens = Tokens::new(spec);
    let mut members = Vec::new();
    let mut have_default = false;

    if tokens.at_end() {
        return Ok(members);
    }

    loop {
        let first = match tokens.advance() {
            Token::Sym(name) => name,
            _ => return Err(member_syntax()),
        };

        // Two symbols in a row are a class name then a member name
        let (class, name) = match tokens.peek().clone() {
            Token::Sym(name) => {
                tokens.advance();
                (Some(first), name)
            }
            _ => (None, first),
        };

        let default = tokens.eat(&Token::Star);
        if default {
            if have_default {
                return Err(AdiError::invalid("Default member already defined"));
            }
            have_default = true;
        }

        let constant = if tokens.eat(&Token::Assign) {
            Some(parse_constant(&mut tokens)?)
        } else {
            None
        };

        members.push(MemberSpec {
            class,
            name,
            default,
            constant,
        });

        match tokens.advance() {
            Token::Comma => {}
            Token::End => return Ok(members),
            _ => return Err(member_syntax()),
        }
    }
}
