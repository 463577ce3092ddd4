use log::trace;

use crate::error::{ParseError, TableError};
use crate::grammar::grammar::RuleId;
use crate::grammar::ll1_parsing_table::{Action, LL1ParsingTable};
use crate::grammar::{END_MARK, EPSILON};
use crate::lexer::Token;

/// Result of one complete run: the rules applied in order, the input
/// positions of the tokens actually matched and every error recovered from.
/// A non-empty `errors` means the derivation is partial.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    pub history: Vec<RuleId>,
    pub matched: Vec<usize>,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Table-driven predictive parser. The table (and its grammar) is only
/// borrowed, so any number of parsers can run against one table.
///
/// Only conflict-free tables are accepted: a cell overwritten by a
/// left-recursive rule would make the parser expand forever.
#[derive(Debug, Clone)]
pub struct LL1Parser<'t, 'a> {
    table: &'t LL1ParsingTable<'a>,
    tokens: Vec<Token>,
    stack: Vec<&'a str>,
    cursor: usize,
    history: Vec<RuleId>,
    matched: Vec<usize>,
    errors: Vec<ParseError>,
}

impl<'t, 'a> LL1Parser<'t, 'a> {
    /// The token sequence gets an end-marker token appended.
    pub fn new(table: &'t LL1ParsingTable<'a>, tokens: &[Token]) -> Result<Self, TableError> {
        if !table.conflicts().is_empty() {
            return Err(TableError::Conflicts(table.conflicts().to_vec()));
        }
        let mut input = tokens.to_vec();
        input.push(Token::symbol(END_MARK));
        Ok(Self {
            table,
            tokens: input,
            stack: vec![END_MARK, table.grammar().start_symbol()],
            cursor: 0,
            history: Vec::new(),
            matched: Vec::new(),
            errors: Vec::new(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.tokens.len() || self.stack.last().map_or(true, |&top| top == END_MARK)
    }

    pub fn stack(&self) -> &[&'a str] {
        &self.stack
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history(&self) -> &[RuleId] {
        &self.history
    }

    /// Input positions consumed by a terminal match, in order.
    pub fn matched(&self) -> &[usize] {
        &self.matched
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn lookahead(&self) -> &str {
        self.tokens
            .get(self.cursor)
            .map_or(END_MARK, |token| token.kind.as_str())
    }

    /// One move of the automaton. Does nothing once complete.
    pub fn step(&mut self) {
        if self.is_complete() {
            return;
        }
        let top = match self.stack.last() {
            Some(&top) => top,
            None => return,
        };
        let grammar = self.table.grammar();
        trace!("stack {:?}, lookahead {}", self.stack, self.lookahead());

        if !grammar.is_non_terminal(top) {
            let symbol = self.lookahead().to_string();
            if top == symbol {
                self.stack.pop();
                self.matched.push(self.cursor);
            } else {
                self.errors.push(ParseError::Mismatch {
                    position: self.cursor,
                    symbol,
                    expected: top.to_string(),
                });
            }
            self.cursor += 1;
            return;
        }

        while !self.is_complete() && self.table.action(top, self.lookahead()) == Action::Error {
            let symbol = self.lookahead().to_string();
            self.errors.push(ParseError::UnexpectedSymbol {
                position: self.cursor,
                symbol,
                non_terminal: top.to_string(),
            });
            self.cursor += 1;
        }
        if self.is_complete() {
            return;
        }

        match self.table.action(top, self.lookahead()) {
            Action::Synch => {
                let symbol = self.lookahead().to_string();
                self.errors.push(ParseError::Synchronize {
                    position: self.cursor,
                    symbol,
                    non_terminal: top.to_string(),
                });
                self.stack.pop();
            }
            Action::Predict(id) => {
                if let Some(rule) = grammar.rule(id) {
                    self.stack.pop();
                    self.stack.extend(
                        rule.entities()
                            .iter()
                            .rev()
                            .map(|e| e.as_str())
                            .filter(|&e| e != EPSILON),
                    );
                    self.history.push(id);
                }
            }
            Action::Error => {}
        }
    }

    pub fn run(mut self) -> ParseOutcome {
        while !self.is_complete() {
            self.step();
        }
        ParseOutcome {
            history: self.history,
            matched: self.matched,
            errors: self.errors,
        }
    }
}

impl LL1ParsingTable<'_> {
    pub fn parse(&self, tokens: &[Token]) -> Result<ParseOutcome, TableError> {
        Ok(LL1Parser::new(self, tokens)?.run())
    }
}
