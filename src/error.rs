use thiserror::Error;

use crate::grammar::ll1_parsing_table::Conflict;

/// Reasons a grammar description is rejected, either while reading the text
/// format or while validating the assembled [`crate::Grammar`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar: line {line}: invalid token {token}")]
    UnexpectedToken { line: usize, token: String },

    #[error("grammar: line {line}: {symbol} is reserved")]
    ReservedSymbol { line: usize, symbol: String },

    #[error("grammar: line {line}: ambiguous start symbol")]
    AmbiguousStartSymbol { line: usize },

    #[error("grammar: line {line}: rules syntax error ':' expected{}", .found.as_ref().map(|f| format!(": {}", f)).unwrap_or_default())]
    ColonExpected { line: usize, found: Option<String> },

    #[error("grammar: block is incomplete 'END' expected")]
    IncompleteBlock,

    #[error("grammar: missing start symbol")]
    MissingStartSymbol,

    #[error("grammar: start symbol is not a non-terminal: {0}")]
    UndeclaredStartSymbol(String),

    #[error("grammar: inconsistent or duplicate terminals: {0}")]
    DuplicateTerminal(String),

    #[error("grammar: inconsistent or duplicate non-terminals: {0}")]
    DuplicateNonTerminal(String),

    #[error("grammar: terminals and non_terminals not disjoint: {0}")]
    NotDisjoint(String),

    #[error("grammar: {0} is reserved")]
    ReservedDeclaration(String),

    #[error("grammar: non-terminal not found: {0}")]
    UndeclaredNonTerminal(String),

    #[error("grammar: more than one production for {0}")]
    DuplicateProduction(String),

    #[error("grammar: rule token is not defined: {symbol} (in a rule of {parent})")]
    UndeclaredSymbol { parent: String, symbol: String },

    #[error("grammar: empty rule for {0}, use EPSILON")]
    EmptyRule(String),

    #[error("grammar: EPSILON must be the only entity of a rule of {0}")]
    MixedEpsilon(String),
}

/// The grammar is not LL(1): at least one table cell was written twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("{}", .0.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("\n"))]
    Conflicts(Vec<Conflict>),
}

impl TableError {
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            TableError::Conflicts(c) => c,
        }
    }
}

/// A recoverable error recorded by the LL(1) driver. `position` is the index
/// of the offending token in the input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No table entry for the lookahead: the token is discarded.
    #[error("parser: error at symbol: {symbol} (token {position}, expanding {non_terminal})")]
    UnexpectedSymbol {
        position: usize,
        symbol: String,
        non_terminal: String,
    },

    /// The lookahead is in FOLLOW of the stack top: the non-terminal is abandoned.
    #[error("parser: error at symbol: {symbol} (token {position}, abandoning {non_terminal})")]
    Synchronize {
        position: usize,
        symbol: String,
        non_terminal: String,
    },

    /// Expected terminal differs from the input terminal: the token is discarded.
    #[error("parser: error at symbol: {symbol} (token {position}, expected {expected})")]
    Mismatch {
        position: usize,
        symbol: String,
        expected: String,
    },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedSymbol { position, .. }
            | ParseError::Synchronize { position, .. }
            | ParseError::Mismatch { position, .. } => *position,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            ParseError::UnexpectedSymbol { symbol, .. }
            | ParseError::Synchronize { symbol, .. }
            | ParseError::Mismatch { symbol, .. } => symbol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("tree: derivation step {step} has no node left to expand")]
    HistoryMismatch { step: usize },

    #[error("tree: derivation step {step} refers to an unknown rule")]
    UnknownRule { step: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("lexer: {line}:{column}: wrong fractional number format: {text}")]
    MalformedNumber {
        line: usize,
        column: usize,
        text: String,
    },

    #[error("lexer: {line}:{column}: wrong literal format")]
    UnterminatedString { line: usize, column: usize },

    #[error("lexer: {line}:{column}: unexpected token {found:?}")]
    UnexpectedCharacter {
        line: usize,
        column: usize,
        found: char,
    },
}

/// Any failure along the grammar → table → tokens → tree pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Lex(#[from] LexError),

    /// The parser recovered from errors; the tree would be incomplete.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
