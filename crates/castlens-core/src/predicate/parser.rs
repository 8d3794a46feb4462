//! Recursive-descent parser for predicate programs.
//!
//! Precedence, loosest first: `?:`, `??`, `||`, `&&`, equality, relational
//! (including `in`), additive, multiplicative, unary, postfix.

use std::sync::Arc;

use regex::RegexBuilder;

use crate::predicate::ast::{BinaryOp, Expr, LogicalOp, Program, UnaryOp};
use crate::predicate::lexer::{Spanned, Token, tokenize};
use crate::predicate::value::Value;
use crate::predicate::{MAX_DEPTH, MAX_SOURCE_BYTES, PredicateError};

/// Compiled-size ceiling for regex literals.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Parse predicate source text into a [`Program`].
///
/// # Errors
///
/// Fails on empty or oversized source, lexical errors, syntax errors,
/// nesting deeper than [`MAX_DEPTH`], and invalid regex literals.
pub fn parse(source: &str) -> Result<Program, PredicateError> {
    if source.len() > MAX_SOURCE_BYTES {
        return Err(PredicateError::TooLong {
            len: source.len(),
            limit: MAX_SOURCE_BYTES,
        });
    }
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(PredicateError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: source.chars().count(),
    };
    let param = parser.arrow_header();
    let body = parser.parse_expr()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(Program { param, body })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), PredicateError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn here(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.pos)
    }

    fn unexpected(&self, wanted: &str) -> PredicateError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), |t| format!("{t:?}"));
        PredicateError::Parse {
            pos: self.here(),
            message: format!("expected {wanted}, found {found}"),
        }
    }

    fn enter(&mut self) -> Result<(), PredicateError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(PredicateError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    /// Length in tokens of a lambda header (`x =>`, `(x) =>`, `() =>`)
    /// starting at the cursor, if there is one.
    fn header_len(&self) -> Option<(usize, Option<String>)> {
        match (self.peek(), self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (Some(Token::Ident(name)), Some(Token::Arrow), _, _) => Some((2, Some(name.clone()))),
            (Some(Token::LParen), Some(Token::Ident(name)), Some(Token::RParen), Some(Token::Arrow)) => {
                Some((4, Some(name.clone())))
            }
            (Some(Token::LParen), Some(Token::RParen), Some(Token::Arrow), _) => Some((3, None)),
            _ => None,
        }
    }

    fn arrow_header(&mut self) -> Option<String> {
        let (len, param) = self.header_len()?;
        self.pos += len;
        param
    }

    fn parse_expr(&mut self) -> Result<Expr, PredicateError> {
        self.enter()?;
        let cond = self.parse_nullish()?;
        let expr = if self.eat(&Token::Question) {
            let then = self.parse_expr()?;
            self.expect(&Token::Colon, "':' in conditional")?;
            let otherwise = self.parse_expr()?;
            Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            }
        } else {
            cond
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_nullish(&mut self) -> Result<Expr, PredicateError> {
        self.fold_logical(Self::parse_or, &Token::Nullish, LogicalOp::Nullish)
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateError> {
        self.fold_logical(Self::parse_and, &Token::Or, LogicalOp::Or)
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateError> {
        self.fold_logical(Self::parse_equality, &Token::And, LogicalOp::And)
    }

    fn parse_equality(&mut self) -> Result<Expr, PredicateError> {
        self.fold_binary(Self::parse_relational, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, PredicateError> {
        self.fold_binary(Self::parse_additive, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::In => Some(BinaryOp::In),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, PredicateError> {
        self.fold_binary(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, PredicateError> {
        self.fold_binary(Self::parse_unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    /// Left-associative fold. Every fold step counts toward nesting depth
    /// because it deepens the tree the evaluator walks.
    fn fold_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, PredicateError>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, PredicateError> {
        let saved = self.depth;
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(op_for) {
            self.pos += 1;
            self.enter()?;
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = saved;
        Ok(left)
    }

    fn fold_logical(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, PredicateError>,
        token: &Token,
        op: LogicalOp,
    ) -> Result<Expr, PredicateError> {
        let saved = self.depth;
        let mut left = operand(self)?;
        while self.eat(token) {
            self.enter()?;
            let right = operand(self)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, PredicateError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, PredicateError> {
        let saved = self.depth;
        let mut expr = self.parse_primary()?;
        let mut optional_seen = false;
        loop {
            expr = match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.property_name()?;
                    self.member_or_method(expr, name, false)?
                }
                Some(Token::QuestionDot) => {
                    self.pos += 1;
                    optional_seen = true;
                    if self.eat(&Token::LBracket) {
                        let index = self.parse_expr()?;
                        self.expect(&Token::RBracket, "']'")?;
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: true,
                        }
                    } else {
                        let name = self.property_name()?;
                        self.member_or_method(expr, name, true)?
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']'")?;
                    Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: false,
                    }
                }
                Some(Token::LParen) => {
                    let Expr::Ident(function) = expr else {
                        return Err(PredicateError::Parse {
                            pos: self.here(),
                            message: "only builtin functions and methods can be called".into(),
                        });
                    };
                    let args = self.parse_args()?;
                    Expr::Call { function, args }
                }
                _ => break,
            };
            self.enter()?;
        }
        self.depth = saved;
        Ok(if optional_seen {
            Expr::Chain(Box::new(expr))
        } else {
            expr
        })
    }

    fn property_name(&mut self) -> Result<String, PredicateError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn member_or_method(
        &mut self,
        object: Expr,
        name: String,
        optional: bool,
    ) -> Result<Expr, PredicateError> {
        if self.peek() == Some(&Token::LParen) {
            let args = self.parse_args()?;
            return Ok(Expr::MethodCall {
                receiver: Box::new(object),
                method: name,
                args,
                optional,
            });
        }
        Ok(Expr::Member {
            object: Box::new(object),
            property: name,
            optional,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, PredicateError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        while !self.eat(&Token::RParen) {
            args.push(self.parse_arg()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen, "',' or ')'")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<Expr, PredicateError> {
        let Some((len, param)) = self.header_len() else {
            return self.parse_expr();
        };
        let Some(param) = param else {
            return Err(PredicateError::Parse {
                pos: self.here(),
                message: "lambda arguments take exactly one parameter".into(),
            });
        };
        self.pos += len;
        self.enter()?;
        let body = self.parse_expr()?;
        self.depth -= 1;
        Ok(Expr::Lambda {
            param,
            body: Box::new(body),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateError> {
        let pos = self.here();
        let Some(token) = self.bump() else {
            return Err(PredicateError::Parse {
                pos,
                message: "unexpected end of input".into(),
            });
        };
        match token {
            Token::Num(n) => Ok(Expr::Literal(Value::Num(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::from(s.as_str()))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Regex { pattern, flags } => {
                let regex = build_regex(&pattern, &flags)?;
                Ok(Expr::Literal(Value::Regex(Arc::new(regex))))
            }
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                while !self.eat(&Token::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBracket, "',' or ']'")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            other => Err(PredicateError::Parse {
                pos,
                message: format!("unexpected {other:?}"),
            }),
        }
    }
}

/// Compile a regex literal. `i`, `m`, `s` map to the matching `regex`
/// options; `g`, `u`, `y` carry no meaning for a yes/no test.
fn build_regex(pattern: &str, flags: &str) -> Result<regex::Regex, PredicateError> {
    let mut builder = RegexBuilder::new(pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' | 'y' => {}
            other => return Err(PredicateError::RegexFlag(other)),
        }
    }
    builder.build().map_err(|source| PredicateError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_forms() {
        assert_eq!(parse("c => true").expect("parse").param.as_deref(), Some("c"));
        assert_eq!(parse("(c) => true").expect("parse").param.as_deref(), Some("c"));
        assert_eq!(parse("() => true").expect("parse").param, None);
        assert_eq!(parse("true").expect("parse").param, None);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse("1 + 2 * 3").expect("parse");
        let Expr::Binary { op, right, .. } = program.body else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn optional_chain_is_wrapped_once() {
        let program = parse("c => c.reactions?.likes_count > 5").expect("parse");
        let Expr::Binary { left, .. } = program.body else {
            panic!("expected comparison");
        };
        assert!(matches!(*left, Expr::Chain(_)));
    }

    #[test]
    fn lambdas_only_in_argument_position() {
        assert!(parse("c => c.embeds.some(e => e.url)").is_ok());
        assert!(parse("c => c.embeds.some((e) => e.url)").is_ok());
        assert!(parse("c => (e => e)").is_err());
    }

    #[test]
    fn only_builtins_and_methods_are_callable() {
        assert!(parse("len('x')").is_ok());
        assert!(parse("c => c.text('x')").is_ok(), "method syntax parses");
        assert!(matches!(
            parse("c => (c.text)[0]('x')"),
            Err(PredicateError::Parse { .. })
        ));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(matches!(parse("true false"), Err(PredicateError::Parse { .. })));
        assert!(matches!(parse(""), Err(PredicateError::Empty)));
        assert!(matches!(parse("   "), Err(PredicateError::Empty)));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(matches!(parse(&deep), Err(PredicateError::TooDeep(_))));
        let long_chain = format!("c => c{}", ".a".repeat(200));
        assert!(matches!(parse(&long_chain), Err(PredicateError::TooDeep(_))));
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn source_length_limit_is_enforced() {
        let huge = format!("'{}'", "x".repeat(MAX_SOURCE_BYTES));
        assert!(matches!(parse(&huge), Err(PredicateError::TooLong { .. })));
    }

    #[test]
    fn regex_literals_compile_with_flags() {
        assert!(parse(r"c => /^gm\b/i.test(c.text)").is_ok());
        assert!(matches!(parse("/(/.test('x')"), Err(PredicateError::Regex { .. })));
        assert!(matches!(parse("/a/q.test('x')"), Err(PredicateError::RegexFlag('q'))));
    }
}
