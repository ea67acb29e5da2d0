//! Generic and method specification strings
//!
//! `name(a, b)` declares a generic; `[+|-|@] name(Class, Class)` declares
//! a method, where the marker selects the After, Before or Around form.

use super::MethodForm;
use crate::class::parse::{Token, Tokens};
use crate::error::{AdiError, AdiResult};

/// Parsed `name(arg, ...)` with an optional form marker
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub form: MethodForm,
    pub name: String,
    pub args: Vec<String>,
}

fn syntax(spec: &str) -> AdiError {
    AdiError::invalid("Syntax error in generic specification ^SPEC").token("SPEC", spec)
}

/// Parse a specification; `allow_form` admits a leading form marker
pub fn parse_signature(spec: &str, allow_form: bool) -> AdiResult<Signature> {
    let mut tokens = Tokens::new(spec);

    let form = match tokens.peek() {
        Token::Plus => MethodForm::After,
        Token::Minus => MethodForm::Before,
        Token::At => MethodForm::Around,
        _ => MethodForm::Primary,
    };
    if form != MethodForm::Primary {
        if !allow_form {
            return Err(syntax(spec));
        }
        tokens.advance();
    }

    let name = match tokens.advance() {
        Token::Sym(name) => name,
        _ => return Err(syntax(spec)),
    };
    if !tokens.eat(&Token::LParen) {
        return Err(syntax(spec));
    }

    let mut args = Vec::new();
    if !tokens.eat(&Token::RParen) {
        loop {
            match tokens.advance() {
                Token::Sym(arg) => args.push(arg),
                Token::Star => args.push("*".to_string()),
                _ => return Err(syntax(spec)),
            }
            match tokens.advance() {
                Token::Comma => {}
                Token::RParen => break,
                _ => return Err(syntax(spec)),
            }
        }
    }

    if !tokens.at_end() {
        return Err(syntax(spec));
    }
    Ok(Signature { form, name, args })
}
