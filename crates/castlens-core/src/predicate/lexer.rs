//! Tokenizer for trait predicate source text.

use crate::predicate::PredicateError;

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    /// A `/pattern/flags` literal, pattern already translated to `regex`
    /// crate syntax.
    Regex {
        pattern: String,
        flags: String,
    },
    Ident(String),
    True,
    False,
    Null,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    QuestionDot,
    Question,
    Colon,
    Arrow,
    Not,
    And,
    Or,
    Nullish,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl Token {
    /// Tokens after which a `/` is division rather than a regex literal.
    const fn ends_operand(&self) -> bool {
        matches!(
            self,
            Self::Num(_)
                | Self::Str(_)
                | Self::Regex { .. }
                | Self::Ident(_)
                | Self::True
                | Self::False
                | Self::Null
                | Self::RParen
                | Self::RBracket
        )
    }
}

/// A token and the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Split `source` into tokens.
///
/// # Errors
///
/// Returns [`PredicateError::Lex`] on unterminated literals, malformed
/// numbers, and characters outside the language (`{`, `;`, `=` alone, ...).
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, PredicateError> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        out: Vec::new(),
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    out: Vec<Spanned>,
}

impl Lexer {
    fn run(mut self) -> Result<Vec<Spanned>, PredicateError> {
        while let Some(c) = self.peek(0) {
            let start = self.pos;
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match c {
                '0'..='9' => self.number()?,
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.word(),
                '/' if self.regex_allowed() => self.regex()?,
                _ => self.punct()?,
            };
            self.out.push(Spanned { token, pos: start });
        }
        Ok(self.out)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn error(&self, message: impl Into<String>) -> PredicateError {
        PredicateError::Lex {
            pos: self.pos,
            message: message.into(),
        }
    }

    fn regex_allowed(&self) -> bool {
        self.out.last().is_none_or(|prev| !prev.token.ends_operand())
    }

    fn number(&mut self) -> Result<Token, PredicateError> {
        let start = self.pos;
        self.eat_digits();
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek(1), Some('+' | '-')));
            if self.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1 + sign;
                self.eat_digits();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| self.error(format!("malformed number '{text}'")))
    }

    fn eat_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" | "undefined" => Token::Null,
            "in" => Token::In,
            _ => Token::Ident(text),
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, PredicateError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error("unterminated string literal"));
            };
            self.pos += 1;
            match c {
                c if c == quote => return Ok(Token::Str(out)),
                '\n' => return Err(self.error("newline in string literal")),
                '\\' => {
                    let Some(escaped) = self.peek(0) else {
                        return Err(self.error("unterminated string literal"));
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        'u' => out.push(self.unicode_escape()?),
                        'x' => out.push(self.hex_escape(2)?),
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
    }

    /// Body of a `\u` escape: `{hex+}` or exactly four hex digits.
    fn unicode_escape(&mut self) -> Result<char, PredicateError> {
        if self.peek(0) == Some('{') {
            self.pos += 1;
            let start = self.pos;
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            if self.peek(0) != Some('}') || digits.is_empty() {
                return Err(self.error("malformed \\u{...} escape"));
            }
            self.pos += 1;
            return char_from_hex(&digits).ok_or_else(|| self.error("invalid code point"));
        }
        self.hex_escape(4)
    }

    fn hex_escape(&mut self, width: usize) -> Result<char, PredicateError> {
        let end = self.pos + width;
        if end > self.chars.len() {
            return Err(self.error("truncated hex escape"));
        }
        let digits: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        char_from_hex(&digits).ok_or_else(|| self.error("invalid hex escape"))
    }

    /// Scan `/pattern/flags`, translating JavaScript-only escapes.
    fn regex(&mut self) -> Result<Token, PredicateError> {
        self.pos += 1;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error("unterminated regex literal"));
            };
            self.pos += 1;
            match c {
                '\n' => return Err(self.error("newline in regex literal")),
                '/' if !in_class => break,
                '[' => {
                    in_class = true;
                    pattern.push(c);
                }
                ']' => {
                    in_class = false;
                    pattern.push(c);
                }
                '\\' => {
                    let Some(escaped) = self.peek(0) else {
                        return Err(self.error("unterminated regex literal"));
                    };
                    self.pos += 1;
                    match escaped {
                        '/' => pattern.push('/'),
                        'u' if self.peek(0) == Some('{') => {
                            self.pos += 1;
                            pattern.push_str("\\x{");
                        }
                        'u' => {
                            let end = self.pos + 4;
                            if end > self.chars.len() {
                                return Err(self.error("truncated \\u escape in regex"));
                            }
                            let digits: String = self.chars[self.pos..end].iter().collect();
                            self.pos = end;
                            pattern.push_str(&format!("\\x{{{digits}}}"));
                        }
                        other => {
                            pattern.push('\\');
                            pattern.push(other);
                        }
                    }
                }
                other => pattern.push(other),
            }
        }
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let flags: String = self.chars[start..self.pos].iter().collect();
        Ok(Token::Regex { pattern, flags })
    }

    fn punct(&mut self) -> Result<Token, PredicateError> {
        let c = self.peek(0).unwrap_or('\0');
        let next = self.peek(1);
        let third = self.peek(2);
        let (token, width) = match (c, next, third) {
            ('=', Some('='), Some('=')) => (Token::EqEq, 3),
            ('!', Some('='), Some('=')) => (Token::NotEq, 3),
            ('=', Some('='), _) => (Token::EqEq, 2),
            ('!', Some('='), _) => (Token::NotEq, 2),
            ('=', Some('>'), _) => (Token::Arrow, 2),
            ('<', Some('='), _) => (Token::Le, 2),
            ('>', Some('='), _) => (Token::Ge, 2),
            ('&', Some('&'), _) => (Token::And, 2),
            ('|', Some('|'), _) => (Token::Or, 2),
            ('?', Some('?'), _) => (Token::Nullish, 2),
            ('?', Some('.'), after) if !after.is_some_and(|d| d.is_ascii_digit()) => {
                (Token::QuestionDot, 2)
            }
            ('?', _, _) => (Token::Question, 1),
            ('!', _, _) => (Token::Not, 1),
            ('<', _, _) => (Token::Lt, 1),
            ('>', _, _) => (Token::Gt, 1),
            ('(', _, _) => (Token::LParen, 1),
            (')', _, _) => (Token::RParen, 1),
            ('[', _, _) => (Token::LBracket, 1),
            (']', _, _) => (Token::RBracket, 1),
            (',', _, _) => (Token::Comma, 1),
            ('.', _, _) => (Token::Dot, 1),
            (':', _, _) => (Token::Colon, 1),
            ('+', _, _) => (Token::Plus, 1),
            ('-', _, _) => (Token::Minus, 1),
            ('*', _, _) => (Token::Star, 1),
            ('/', _, _) => (Token::Slash, 1),
            ('%', _, _) => (Token::Percent, 1),
            (other, _, _) => return Err(self.error(format!("unexpected character '{other}'"))),
        };
        self.pos += width;
        Ok(token)
    }
}

fn char_from_hex(digits: &str) -> Option<char> {
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}
