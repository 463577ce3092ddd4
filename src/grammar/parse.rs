use super::grammar::{Production, Rule};
use super::EPSILON;
use crate::error::GrammarError;
use crate::Grammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Terminal,
    NonTerminal,
    Start,
    Rules,
}

impl Block {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "TERMINAL" => Some(Block::Terminal),
            "NON_TERMINAL" => Some(Block::NonTerminal),
            "START" => Some(Block::Start),
            "RULES" => Some(Block::Rules),
            _ => None,
        }
    }
}

impl Grammar {
    /// Reads the block format:
    ///
    /// ```text
    /// NON_TERMINAL
    /// S
    /// END
    /// TERMINAL
    /// ( )
    /// END
    /// START
    /// S
    /// END
    /// RULES
    /// S : ( S )
    /// S : EPSILON
    /// END
    /// ```
    ///
    /// Lines starting with `#` are comments. Rules of the same parent are
    /// gathered into one production, in order of first appearance.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut terminals: Vec<String> = Vec::new();
        let mut non_terminals: Vec<String> = Vec::new();
        let mut start_symbol: Option<String> = None;
        let mut raw_productions: Vec<(String, Vec<Rule>)> = Vec::new();

        let mut block = Block::None;
        for (i, line) in grammar.lines().enumerate() {
            let line_no = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(opened) = Block::from_keyword(tokens[0]) {
                if block != Block::None || tokens.len() > 1 {
                    return Err(GrammarError::UnexpectedToken {
                        line: line_no,
                        token: tokens[0].to_string(),
                    });
                }
                block = opened;
                continue;
            }
            if tokens[0] == "END" {
                if block == Block::None || tokens.len() > 1 {
                    return Err(GrammarError::UnexpectedToken {
                        line: line_no,
                        token: tokens[0].to_string(),
                    });
                }
                block = Block::None;
                continue;
            }

            match block {
                Block::None => {
                    return Err(GrammarError::UnexpectedToken {
                        line: line_no,
                        token: tokens[0].to_string(),
                    })
                }
                Block::Terminal | Block::NonTerminal => {
                    for token in tokens {
                        if token == EPSILON {
                            return Err(GrammarError::ReservedSymbol {
                                line: line_no,
                                symbol: token.to_string(),
                            });
                        }
                        if block == Block::Terminal {
                            terminals.push(token.to_string());
                        } else {
                            non_terminals.push(token.to_string());
                        }
                    }
                }
                Block::Start => {
                    for token in tokens {
                        if start_symbol.is_some() || token == EPSILON {
                            return Err(GrammarError::AmbiguousStartSymbol { line: line_no });
                        }
                        start_symbol = Some(token.to_string());
                    }
                }
                Block::Rules => {
                    let (parent, rule) = parse_rule_line(&tokens, line_no)?;
                    match raw_productions.iter_mut().find(|(p, _)| p == parent) {
                        Some((_, rules)) => rules.push(rule),
                        None => raw_productions.push((parent.to_string(), vec![rule])),
                    }
                }
            }
        }

        if block != Block::None {
            return Err(GrammarError::IncompleteBlock);
        }

        let productions = raw_productions
            .into_iter()
            .map(|(parent, rules)| Production::new(parent, rules))
            .collect();

        Grammar::new(
            terminals,
            non_terminals,
            start_symbol.unwrap_or_default(),
            productions,
        )
    }
}

/// `Parent : entity entity ...`
fn parse_rule_line<'a>(tokens: &[&'a str], line_no: usize) -> Result<(&'a str, Rule), GrammarError> {
    let parent = tokens[0];
    if parent == EPSILON {
        return Err(GrammarError::ReservedSymbol {
            line: line_no,
            symbol: parent.to_string(),
        });
    }
    match tokens.get(1) {
        Some(&":") => {}
        found => {
            return Err(GrammarError::ColonExpected {
                line: line_no,
                found: found.map(|s| s.to_string()),
            })
        }
    }
    if tokens.len() == 2 {
        return Err(GrammarError::EmptyRule(parent.to_string()));
    }
    Ok((parent, Rule::new(tokens[2..].iter().copied())))
}
