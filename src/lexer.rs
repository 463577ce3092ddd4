use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Chars;

use serde::Serialize;

use crate::error::LexError;

pub const IDENTIFIER: &str = "identifier";
pub const BOOLEAN_CONSTANT: &str = "boolean_constant";
pub const INTEGER_CONSTANT: &str = "integer_constant";
pub const FLOAT_CONSTANT: &str = "float_constant";
pub const STRING_CONSTANT: &str = "string_constant";

const SINGLE_PUNCT: [char; 12] = ['(', ')', '[', ']', '{', '}', '*', '+', '-', '%', ',', ';'];

/// A scanned token: `kind` is matched against grammar terminals, `value` is
/// the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: String,
    pub value: String,
}

impl Token {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// A token whose value is its own kind, as for punctuation and keywords.
    pub fn symbol(kind: &str) -> Self {
        Self::new(kind, kind)
    }
}

/// Splits source text into tokens. Identifiers that spell a declared terminal
/// become that terminal; `//` comments are skipped.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    keywords: HashSet<&'a str>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, terminals: &'a [String]) -> Self {
        Self {
            chars: source.chars().peekable(),
            keywords: terminals.iter().map(|t| t.as_str()).collect(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric()) {
            text.push(c);
            self.bump();
        }

        if self.keywords.contains(text.as_str()) {
            Token::new(text.clone(), text)
        } else if text == "true" || text == "false" {
            Token::new(BOOLEAN_CONSTANT, text)
        } else {
            Token::new(IDENTIFIER, text)
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut has_dot = false;
        let mut has_e = false;
        let mut digits = false;
        let mut digits_after_e = false;
        let mut malformed = false;

        while let Some(c) = self.peek() {
            if c == '.' {
                if has_dot || has_e {
                    malformed = true;
                    break;
                }
                has_dot = true;
            } else if c == 'e' || c == 'E' {
                if has_e {
                    malformed = true;
                    break;
                }
                has_e = true;
            } else if c.is_ascii_digit() {
                digits = true;
                digits_after_e |= has_e;
            } else if c.is_ascii_alphabetic() {
                malformed = true;
                break;
            } else {
                break;
            }
            text.push(c);
            self.bump();
        }

        if malformed {
            while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '.') {
                text.push(c);
                self.bump();
            }
        }
        if malformed || !digits || (has_e && !digits_after_e) {
            return Err(LexError::MalformedNumber { line, column, text });
        }

        if text.chars().all(|c| c.is_ascii_digit()) {
            Ok(Token::new(INTEGER_CONSTANT, text))
        } else {
            Ok(Token::new(FLOAT_CONSTANT, text))
        }
    }

    fn string(&mut self, line: usize, column: usize) -> Result<Token, LexError> {
        let mut text = String::new();
        self.bump();
        text.push('"');
        loop {
            match self.bump() {
                Some('"') => break,
                Some(c) => text.push(c),
                None => return Err(LexError::UnterminatedString { line, column }),
            }
        }
        text.push('"');
        Ok(Token::new(STRING_CONSTANT, text))
    }

    fn operator(&mut self, c: char, line: usize, column: usize) -> Result<Token, LexError> {
        self.bump();
        if SINGLE_PUNCT.contains(&c) {
            return Ok(Token::symbol(&c.to_string()));
        }
        let token = match c {
            '&' if self.bump_if('&') => Token::symbol("&&"),
            '|' if self.bump_if('|') => Token::symbol("||"),
            '=' | '!' | '>' | '<' => {
                if self.bump_if('=') {
                    Token::symbol(&format!("{}=", c))
                } else {
                    Token::symbol(&c.to_string())
                }
            }
            _ => return Err(LexError::UnexpectedCharacter { line, column, found: c }),
        };
        Ok(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            let (line, column) = (self.line, self.column);
            let c = self.peek()?;

            let token = if c.is_ascii_alphabetic() {
                Ok(self.identifier())
            } else if c.is_ascii_digit() || c == '.' {
                self.number(line, column)
            } else if c == '"' {
                self.string(line, column)
            } else if c == '/' {
                self.bump();
                if self.bump_if('/') {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                    continue;
                }
                Ok(Token::symbol("/"))
            } else {
                self.operator(c, line, column)
            };
            return Some(token);
        }
    }
}

/// Scans the whole source, stopping at the first error.
pub fn tokenize(source: &str, terminals: &[String]) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, terminals).collect()
}
