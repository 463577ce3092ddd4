use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{END_MARK, EPSILON};
use crate::error::GrammarError;

/// Classification of a symbol name inside one grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Terminal,
    NonTerminal,
    Epsilon,
    EndMark,
}

/// The right-hand side of one alternative of a production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    entities: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn epsilon() -> Self {
        Self::new([EPSILON])
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn first_entity(&self) -> Option<&str> {
        self.entities.first().map(|s| s.as_str())
    }

    pub fn is_epsilon(&self) -> bool {
        self.entities.len() == 1 && self.entities[0] == EPSILON
    }

    /// Whether `prefix` is a prefix of this rule.
    pub fn starts_with(&self, prefix: &Rule) -> bool {
        self.entities.starts_with(&prefix.entities)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    parent: String,
    rules: Vec<Rule>,
}

impl Production {
    pub fn new(parent: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            parent: parent.into(),
            rules,
        }
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Identifies one alternative: `rule` of `productions[production]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId {
    pub production: usize,
    pub rule: usize,
}

impl RuleId {
    pub fn new(production: usize, rule: usize) -> Self {
        Self { production, rule }
    }
}

/// A validated context-free grammar. Immutable once built; the analyses, the
/// parsing table and the driver only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    terminals: Vec<String>,
    non_terminals: Vec<String>,
    start_symbol: String,
    productions: Vec<Production>,
    symbol_table: HashMap<String, Symbol>,
    production_index: HashMap<String, usize>,
}

impl Grammar {
    pub fn new(
        terminals: Vec<String>,
        non_terminals: Vec<String>,
        start_symbol: String,
        productions: Vec<Production>,
    ) -> Result<Self, GrammarError> {
        if start_symbol.is_empty() {
            return Err(GrammarError::MissingStartSymbol);
        }

        let mut symbol_table: HashMap<String, Symbol> = HashMap::new();
        symbol_table.insert(EPSILON.to_string(), Symbol::Epsilon);
        symbol_table.insert(END_MARK.to_string(), Symbol::EndMark);

        let mut seen: HashSet<&str> = HashSet::new();
        for t in &terminals {
            if t == EPSILON || t == END_MARK {
                return Err(GrammarError::ReservedDeclaration(t.clone()));
            }
            if !seen.insert(t) {
                return Err(GrammarError::DuplicateTerminal(t.clone()));
            }
            symbol_table.insert(t.clone(), Symbol::Terminal);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for nt in &non_terminals {
            if nt == EPSILON || nt == END_MARK {
                return Err(GrammarError::ReservedDeclaration(nt.clone()));
            }
            if !seen.insert(nt) {
                return Err(GrammarError::DuplicateNonTerminal(nt.clone()));
            }
            if symbol_table.contains_key(nt) {
                return Err(GrammarError::NotDisjoint(nt.clone()));
            }
            symbol_table.insert(nt.clone(), Symbol::NonTerminal);
        }

        if symbol_table.get(&start_symbol) != Some(&Symbol::NonTerminal) {
            return Err(GrammarError::UndeclaredStartSymbol(start_symbol));
        }

        let mut production_index = HashMap::new();
        for (i, production) in productions.iter().enumerate() {
            let parent = production.parent();
            if symbol_table.get(parent) != Some(&Symbol::NonTerminal) {
                return Err(GrammarError::UndeclaredNonTerminal(parent.to_string()));
            }
            if production_index.insert(parent.to_string(), i).is_some() {
                return Err(GrammarError::DuplicateProduction(parent.to_string()));
            }

            for rule in production.rules() {
                if rule.entities().is_empty() {
                    return Err(GrammarError::EmptyRule(parent.to_string()));
                }
                for entity in rule.entities() {
                    match symbol_table.get(entity) {
                        Some(Symbol::Terminal) | Some(Symbol::NonTerminal) => {}
                        Some(Symbol::Epsilon) => {
                            if rule.entities().len() != 1 {
                                return Err(GrammarError::MixedEpsilon(parent.to_string()));
                            }
                        }
                        Some(Symbol::EndMark) | None => {
                            return Err(GrammarError::UndeclaredSymbol {
                                parent: parent.to_string(),
                                symbol: entity.clone(),
                            })
                        }
                    }
                }
            }
        }

        Ok(Self {
            terminals,
            non_terminals,
            start_symbol,
            productions,
            symbol_table,
            production_index,
        })
    }

    pub fn terminal_iter(&self) -> impl Iterator<Item = &String> {
        self.terminals.iter()
    }

    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &String> {
        self.non_terminals.iter()
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.symbol_table.get(name).copied()
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.symbol(name) == Some(Symbol::Terminal)
    }

    pub fn is_non_terminal(&self, name: &str) -> bool {
        self.symbol(name) == Some(Symbol::NonTerminal)
    }

    /// Rules of `non_terminal`, empty when it has no production.
    pub fn rules_of(&self, non_terminal: &str) -> &[Rule] {
        self.production_index
            .get(non_terminal)
            .map(|&i| self.productions[i].rules())
            .unwrap_or(&[])
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.productions
            .get(id.production)
            .and_then(|p| p.rules().get(id.rule))
    }

    pub fn rule_parent(&self, id: RuleId) -> Option<&str> {
        self.productions.get(id.production).map(|p| p.parent())
    }

    /// Iterates over every alternative together with its identifier.
    pub fn rule_iter(&self) -> impl Iterator<Item = (RuleId, &str, &Rule)> {
        self.productions
            .iter()
            .enumerate()
            .flat_map(|(pi, production)| {
                production
                    .rules()
                    .iter()
                    .enumerate()
                    .map(move |(ri, rule)| (RuleId::new(pi, ri), production.parent(), rule))
            })
    }

    /// Pairs of alternatives of the same parent where one is a prefix of the
    /// other. Such pairs always collide in an LL(1) table.
    pub fn common_prefix_rules(&self) -> Vec<(RuleId, RuleId)> {
        let mut pairs = Vec::new();
        for (pi, production) in self.productions.iter().enumerate() {
            let rules = production.rules();
            for i in 0..rules.len() {
                for j in 0..rules.len() {
                    if i != j && !rules[j].is_epsilon() && rules[i].starts_with(&rules[j]) {
                        pairs.push((RuleId::new(pi, i), RuleId::new(pi, j)));
                    }
                }
            }
        }
        pairs
    }
}
