use crowbook_text_processing::escape::tex as escape_tex;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::error::TableError;
use crate::Grammar;

use super::{
    grammar::{RuleId, Symbol},
    nullable_first_follow::NullableFirstFollow,
    pretty_print::ProductionOutput,
    END_MARK,
};

/// A stored table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entry {
    Error,
    Rule(RuleId),
}

/// What the driver should do for a (non-terminal, lookahead) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    /// The cell is empty but the lookahead follows the non-terminal.
    Synch,
    Predict(RuleId),
}

/// A cell written by two different rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing table: duplicate entry - prod: {non_terminal} - symbol: {terminal}")]
pub struct Conflict {
    pub non_terminal: String,
    pub terminal: String,
    pub previous: RuleId,
    pub replacement: RuleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LL1ParsingTable<'a> {
    grammar: &'a Grammar,
    nff: NullableFirstFollow,
    terminals: Vec<&'a str>,
    non_terminals: Vec<&'a str>,
    terminal_index: HashMap<&'a str, usize>,
    non_terminal_index: HashMap<&'a str, usize>,
    rows: Vec<Vec<Entry>>,
    conflicts: Vec<Conflict>,
}

impl<'a> LL1ParsingTable<'a> {
    /// Builds the table even when the grammar is not LL(1). Every second write
    /// to a cell is recorded in [`LL1ParsingTable::conflicts`] and the later
    /// rule replaces the earlier one.
    pub fn build(grammar: &'a Grammar, nff: NullableFirstFollow) -> Self {
        let terminals: Vec<&str> = grammar
            .terminal_iter()
            .map(|t| t.as_str())
            .chain(std::iter::once(END_MARK))
            .collect();
        let non_terminals: Vec<&str> = grammar.non_terminal_iter().map(|t| t.as_str()).collect();
        let terminal_index: HashMap<&str, usize> =
            terminals.iter().enumerate().map(|(i, &t)| (t, i)).collect();
        let non_terminal_index: HashMap<&str, usize> =
            non_terminals.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let mut rows = vec![vec![Entry::Error; terminals.len()]; non_terminals.len()];
        let mut conflicts: Vec<Conflict> = Vec::new();

        for (id, parent, rule) in grammar.rule_iter() {
            let first_entity = match rule.first_entity() {
                Some(e) => e,
                None => continue,
            };
            let lookaheads: Vec<&str> = match grammar.symbol(first_entity) {
                Some(Symbol::Terminal) => vec![first_entity],
                Some(Symbol::NonTerminal) => nff
                    .first(first_entity)
                    .map(|set| set.iter().map(|s| s.as_str()).collect())
                    .unwrap_or_default(),
                Some(Symbol::Epsilon) => nff
                    .follow(parent)
                    .map(|set| set.iter().map(|s| s.as_str()).collect())
                    .unwrap_or_default(),
                _ => Vec::new(),
            };

            let row = non_terminal_index[parent];
            for terminal in lookaheads {
                let col = match terminal_index.get(terminal) {
                    Some(&col) => col,
                    None => continue,
                };
                if let Entry::Rule(previous) = rows[row][col] {
                    let conflict = Conflict {
                        non_terminal: parent.to_string(),
                        terminal: terminal.to_string(),
                        previous,
                        replacement: id,
                    };
                    warn!("{}", conflict);
                    conflicts.push(conflict);
                }
                rows[row][col] = Entry::Rule(id);
            }
        }

        debug!(
            "LL(1) table: {} non-terminals x {} terminals, {} conflict(s)",
            non_terminals.len(),
            terminals.len(),
            conflicts.len()
        );

        Self {
            grammar,
            nff,
            terminals,
            non_terminals,
            terminal_index,
            non_terminal_index,
            rows,
            conflicts,
        }
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn nullable_first_follow(&self) -> &NullableFirstFollow {
        &self.nff
    }

    /// Declared terminals followed by [`END_MARK`].
    pub fn terminals(&self) -> &[&'a str] {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &[&'a str] {
        &self.non_terminals
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminal_index.contains_key(name)
    }

    /// `None` when either symbol has no row/column.
    pub fn entry(&self, non_terminal: &str, terminal: &str) -> Option<Entry> {
        let row = *self.non_terminal_index.get(non_terminal)?;
        let col = *self.terminal_index.get(terminal)?;
        Some(self.rows[row][col])
    }

    pub fn action(&self, non_terminal: &str, terminal: &str) -> Action {
        match self.entry(non_terminal, terminal) {
            Some(Entry::Rule(id)) => Action::Predict(id),
            _ if self
                .nff
                .follow(non_terminal)
                .is_some_and(|follow| follow.contains(terminal)) =>
            {
                Action::Synch
            }
            _ => Action::Error,
        }
    }

    fn cell_output(&self, non_terminal: &'a str, terminal: &str) -> ProductionOutput<'a> {
        let grammar: &'a Grammar = self.grammar;
        let rights = match self.entry(non_terminal, terminal) {
            Some(Entry::Rule(id)) => grammar
                .rule(id)
                .map(|rule| vec![rule.entities().iter().map(|s| s.as_str()).collect()])
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        ProductionOutput {
            left: non_terminal,
            rights,
        }
    }

    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.terminals.iter().map(|&t| t.to_string()));
        let mut output: Vec<Vec<String>> = vec![header];
        for &left in &self.non_terminals {
            let mut line: Vec<String> = vec![left.to_string()];
            line.extend(self.terminals.iter().map(|&t| {
                match self.action(left, t) {
                    Action::Synch => "synch".to_string(),
                    _ => self.cell_output(left, t).to_plaintext(left.len(), false),
                }
            }));
            output.push(line);
        }

        let width: Vec<usize> = (0..output[0].len())
            .map(|j| output.iter().map(|line| line[j].len()).max().unwrap_or(0))
            .collect();
        output
            .iter()
            .map(|line| {
                line.iter()
                    .enumerate()
                    .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.terminals.len()),
        )];
        header.extend(
            self.terminals
                .iter()
                .map(|&t| format!("\\text{{{}}}", escape_tex(t))),
        );
        let header = header.join(" & ");

        let terminal_set: HashSet<&str> = self.terminals.iter().cloned().collect();
        let mut output: Vec<String> = Vec::new();
        for &left in &self.non_terminals {
            let mut line: Vec<String> = vec![format!("{}", escape_tex(left))];
            line.extend(self.terminals.iter().map(|&t| match self.action(left, t) {
                Action::Synch => "\\text{synch}".to_string(),
                _ => self.cell_output(left, t).to_latex(false, &terminal_set),
            }));
            output.push(line.join(" & "));
        }

        let output = output.join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Row<'b> {
            non_terminal: &'b str,
            cells: Vec<Option<String>>,
        }
        #[derive(Serialize)]
        struct TableOutput<'b> {
            terminals: &'b [&'b str],
            rows: Vec<Row<'b>>,
            conflicts: Vec<String>,
        }

        let rows = self
            .non_terminals
            .iter()
            .map(|&left| Row {
                non_terminal: left,
                cells: self
                    .terminals
                    .iter()
                    .map(|&t| match self.action(left, t) {
                        Action::Predict(_) => Some(self.cell_output(left, t).to_plaintext(0, false)),
                        Action::Synch => Some("synch".to_string()),
                        Action::Error => None,
                    })
                    .collect(),
            })
            .collect();

        serde_json::to_string(&TableOutput {
            terminals: &self.terminals,
            rows,
            conflicts: self.conflicts.iter().map(|c| c.to_string()).collect(),
        })
    }
}

impl Grammar {
    /// Computes the sets and builds the table; a grammar that is not LL(1)
    /// yields every conflict found.
    pub fn generate_ll1_parsing_table(&self) -> Result<LL1ParsingTable<'_>, TableError> {
        let table = LL1ParsingTable::build(self, self.nullable_first_follow());
        if table.conflicts.is_empty() {
            Ok(table)
        } else {
            Err(TableError::Conflicts(table.conflicts))
        }
    }
}
