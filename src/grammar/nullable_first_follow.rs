use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use super::{grammar::Symbol, Grammar, END_MARK, EPSILON};

/// Number of full passes each fixed-point computation needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Iterations {
    pub nullable: usize,
    pub first: usize,
    pub follow: usize,
}

/// Nullable, FIRST and FOLLOW sets of one grammar.
///
/// The FIRST table only has entries for non-terminals and never contains
/// [`EPSILON`]; nullability is answered by [`NullableFirstFollow::is_nullable`].
/// FOLLOW of the start symbol always contains [`END_MARK`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullableFirstFollow {
    nullable: IndexMap<String, bool>,
    first: IndexMap<String, IndexSet<String>>,
    follow: IndexMap<String, IndexSet<String>>,
    iterations: Iterations,
}

impl Grammar {
    pub fn nullable_first_follow(&self) -> NullableFirstFollow {
        let (nullable, nullable_passes) = calculate_nullable(self);
        let (mut first, first_passes) = calculate_first(self, &nullable);
        for set in first.values_mut() {
            set.shift_remove(EPSILON);
        }

        let mut nff = NullableFirstFollow {
            nullable,
            first,
            follow: IndexMap::new(),
            iterations: Iterations {
                nullable: nullable_passes,
                first: first_passes,
                follow: 0,
            },
        };
        let (follow, follow_passes) = nff.calculate_follow(self);
        nff.follow = follow;
        nff.iterations.follow = follow_passes;

        debug!(
            "nullable/first/follow converged after {}/{}/{} passes",
            nff.iterations.nullable, nff.iterations.first, nff.iterations.follow
        );
        nff
    }
}

impl NullableFirstFollow {
    /// Unknown names are not nullable.
    pub fn is_nullable(&self, symbol: &str) -> bool {
        self.nullable.get(symbol).copied().unwrap_or(false)
    }

    pub fn first(&self, non_terminal: &str) -> Option<&IndexSet<String>> {
        self.first.get(non_terminal)
    }

    pub fn follow(&self, non_terminal: &str) -> Option<&IndexSet<String>> {
        self.follow.get(non_terminal)
    }

    pub fn nullable_table(&self) -> &IndexMap<String, bool> {
        &self.nullable
    }

    pub fn first_table(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.first
    }

    pub fn follow_table(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.follow
    }

    pub fn iterations(&self) -> Iterations {
        self.iterations
    }

    /// FIRST of a symbol string. Contains [`EPSILON`] iff every symbol of the
    /// string is nullable (in particular for the empty string).
    pub fn first_of_sequence(&self, sequence: &[String]) -> IndexSet<String> {
        let mut first = IndexSet::new();
        for symbol in sequence {
            if symbol == EPSILON {
                continue;
            }
            match self.first.get(symbol.as_str()) {
                Some(set) => first.extend(set.iter().cloned()),
                None => {
                    first.insert(symbol.clone());
                }
            }
            if !self.is_nullable(symbol) {
                return first;
            }
        }
        first.insert(EPSILON.to_string());
        first
    }

    fn calculate_follow(&self, g: &Grammar) -> (IndexMap<String, IndexSet<String>>, usize) {
        let mut follow: IndexMap<String, IndexSet<String>> = g
            .non_terminal_iter()
            .map(|nt| (nt.clone(), IndexSet::new()))
            .collect();

        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            if let Some(set) = follow.get_mut(g.start_symbol()) {
                changed |= set.insert(END_MARK.to_string());
            }

            for production in g.productions() {
                let parent = production.parent();
                for rule in production.rules() {
                    let entities = rule.entities();
                    for (i, x) in entities.iter().enumerate() {
                        if !g.is_non_terminal(x) {
                            continue;
                        }

                        let mut additions = self.first_of_sequence(&entities[i + 1..]);
                        if additions.shift_remove(EPSILON) {
                            if let Some(parent_follow) = follow.get(parent) {
                                additions.extend(parent_follow.iter().cloned());
                            }
                        }

                        if let Some(set) = follow.get_mut(x.as_str()) {
                            for symbol in additions {
                                changed |= set.insert(symbol);
                            }
                        }
                    }
                }
            }
        }

        (follow, passes)
    }
}

fn calculate_nullable(g: &Grammar) -> (IndexMap<String, bool>, usize) {
    let mut nullable: IndexMap<String, bool> = IndexMap::new();
    nullable.insert(EPSILON.to_string(), true);
    nullable.insert(END_MARK.to_string(), false);
    for t in g.terminal_iter() {
        nullable.insert(t.clone(), false);
    }
    for nt in g.non_terminal_iter() {
        nullable.insert(nt.clone(), false);
    }

    let mut passes = 0;
    let mut changed = true;
    while changed {
        passes += 1;
        // proofs made inside recursive calls count too: a symbol refuted
        // earlier in this pass may depend on them
        let proven_before = count_nullable(&nullable);
        let mut refuted: HashSet<&str> = HashSet::new();
        for nt in g.non_terminal_iter() {
            if nullable[nt.as_str()] {
                continue;
            }
            let mut visiting: HashSet<&str> = HashSet::new();
            derives_empty(g, &mut nullable, nt, &mut visiting, &mut refuted);
        }
        changed = count_nullable(&nullable) != proven_before;
    }

    (nullable, passes)
}

fn count_nullable(nullable: &IndexMap<String, bool>) -> usize {
    nullable.values().filter(|&&n| n).count()
}

/// A symbol already on `visiting` is not provably nullable through this path.
/// Proven symbols are recorded in `known` immediately; refuted ones only for
/// the current pass, the outer loop revisits them.
fn derives_empty<'g>(
    g: &'g Grammar,
    known: &mut IndexMap<String, bool>,
    symbol: &'g str,
    visiting: &mut HashSet<&'g str>,
    refuted: &mut HashSet<&'g str>,
) -> bool {
    match g.symbol(symbol) {
        Some(Symbol::Epsilon) => return true,
        Some(Symbol::NonTerminal) => {}
        _ => return false,
    }
    if known.get(symbol) == Some(&true) {
        return true;
    }
    if refuted.contains(symbol) || !visiting.insert(symbol) {
        return false;
    }

    let mut result = false;
    for rule in g.rules_of(symbol) {
        if rule
            .entities()
            .iter()
            .all(|e| derives_empty(g, known, e, visiting, refuted))
        {
            result = true;
            break;
        }
    }

    visiting.remove(symbol);
    if result {
        known.insert(symbol.to_string(), true);
    } else {
        refuted.insert(symbol);
    }
    result
}

fn calculate_first(
    g: &Grammar,
    nullable: &IndexMap<String, bool>,
) -> (IndexMap<String, IndexSet<String>>, usize) {
    let mut first: IndexMap<String, IndexSet<String>> = g
        .non_terminal_iter()
        .map(|nt| (nt.clone(), IndexSet::new()))
        .collect();

    let mut passes = 0;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;
        let mut finished: HashSet<&str> = HashSet::new();
        for nt in g.non_terminal_iter() {
            let mut visiting: HashSet<&str> = HashSet::new();
            changed |= extend_first(g, nullable, &mut first, nt, &mut visiting, &mut finished);
        }
    }

    (first, passes)
}

/// Recomputes FIRST of `nt` from its rules, recursing into non-terminals that
/// are neither on the current path nor finished in this pass. Returns whether
/// any set grew.
fn extend_first<'g>(
    g: &'g Grammar,
    nullable: &IndexMap<String, bool>,
    first: &mut IndexMap<String, IndexSet<String>>,
    nt: &'g str,
    visiting: &mut HashSet<&'g str>,
    finished: &mut HashSet<&'g str>,
) -> bool {
    if finished.contains(nt) || !visiting.insert(nt) {
        return false;
    }

    let mut changed = false;
    for rule in g.rules_of(nt) {
        let mut all_nullable = true;
        for entity in rule.entities() {
            let contribution: Vec<String> = match g.symbol(entity) {
                Some(Symbol::Terminal) => vec![entity.clone()],
                Some(Symbol::NonTerminal) => {
                    changed |= extend_first(g, nullable, first, entity, visiting, finished);
                    first
                        .get(entity.as_str())
                        .map(|set| set.iter().filter(|s| *s != EPSILON).cloned().collect())
                        .unwrap_or_default()
                }
                _ => Vec::new(),
            };

            if let Some(set) = first.get_mut(nt) {
                for symbol in contribution {
                    changed |= set.insert(symbol);
                }
            }

            if !nullable.get(entity.as_str()).copied().unwrap_or(false) {
                all_nullable = false;
                break;
            }
        }

        if all_nullable {
            if let Some(set) = first.get_mut(nt) {
                changed |= set.insert(EPSILON.to_string());
            }
        }
    }

    visiting.remove(nt);
    finished.insert(nt);
    changed
}
