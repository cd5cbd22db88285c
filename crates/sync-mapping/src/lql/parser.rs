/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use super::ast::Expr;
use super::lexer::{tokenize, Token};
use crate::Error;
use sync_core::CanonicalValue;

pub fn parse(input: &str) -> Result<Expr, Error> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_pipeline()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::LqlParse(format!(
            "unexpected trailing tokens at position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: &Token) -> Result<(), Error> {
        match self.advance() {
            Some(ref t) if t == want => Ok(()),
            other => Err(Error::LqlParse(format!(
                "expected {:?}, found {:?}",
                want, other
            ))),
        }
    }

    fn parse_pipeline(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_primary()?;
        while matches!(self.peek(), Some(Token::Pipe)) {
            self.advance();
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                other => {
                    return Err(Error::LqlParse(format!(
                        "expected function name after |>, found {:?}",
                        other
                    )))
                }
            };
            self.expect(&Token::LParen)?;
            let mut args = vec![left];
            args.extend(self.parse_args()?);
            self.expect(&Token::RParen)?;
            left = Expr::Call(name, args);
        }
        Ok(left)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_pipeline()?);
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.advance() {
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::String(s)) => Ok(Expr::Literal(CanonicalValue::String(s))),
            Some(Token::Number(n)) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n)
                    .map(CanonicalValue::Number)
                    .unwrap_or(CanonicalValue::Null),
            )),
            Some(Token::LParen) => {
                let expr = self.parse_pipeline()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            other => Err(Error::LqlParse(format!(
                "unexpected token while parsing expression: {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_and_ident() {
        assert_eq!(parse("name").unwrap(), Expr::Ident("name".into()));
        assert_eq!(
            parse("'hi'").unwrap(),
            Expr::Literal(CanonicalValue::String("hi".into()))
        );
    }

    #[test]
    fn test_parse_call() {
        assert_eq!(
            parse("upper(name)").unwrap(),
            Expr::Call("upper".into(), vec![Expr::Ident("name".into())])
        );
    }

    #[test]
    fn test_parse_pipeline_desugars_left_associatively() {
        let parsed = parse("name |> trim() |> upper()").unwrap();
        assert_eq!(
            parsed,
            Expr::Call(
                "upper".into(),
                vec![Expr::Call("trim".into(), vec![Expr::Ident("name".into())])]
            )
        );
    }

    #[test]
    fn test_parse_nested_calls() {
        let parsed = parse("concat(upper(a), '-', lower(b))").unwrap();
        assert_eq!(
            parsed,
            Expr::Call(
                "concat".into(),
                vec![
                    Expr::Call("upper".into(), vec![Expr::Ident("a".into())]),
                    Expr::Literal(CanonicalValue::String("-".into())),
                    Expr::Call("lower".into(), vec![Expr::Ident("b".into())]),
                ]
            )
        );
    }
}
