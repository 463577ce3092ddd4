extern crate wasm_bindgen;

use wasm_bindgen::prelude::*;

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;

pub use error::{Error, GrammarError, LexError, ParseError, TableError, TreeError};
pub use grammar::ll1_parsing_table::LL1ParsingTable;
pub use grammar::Grammar;
pub use lexer::Token;
pub use parser::{LL1Parser, ParseOutcome, SyntaxTree};

/// Scans `source`, runs the parser and builds the simplified tree. A run that
/// needed error recovery is reported as [`Error::Parse`] with every error.
pub fn parse_source(table: &LL1ParsingTable, source: &str) -> Result<SyntaxTree, Error> {
    let grammar = table.grammar();
    let tokens = lexer::tokenize(source, grammar.terminals())?;
    let outcome = table.parse(&tokens)?;
    if !outcome.is_success() {
        return Err(Error::Parse(outcome.errors));
    }
    Ok(SyntaxTree::from_outcome(grammar, &outcome, &tokens)?)
}

fn json_error(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

#[wasm_bindgen]
pub fn nullable_first_follow_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => {
            let nff = g.nullable_first_follow();
            g.to_non_terminal_output_vec(&nff)
                .to_json()
                .unwrap_or_else(json_error)
        }
        Err(e) => json_error(e),
    }
}

/// Conflicts are part of the output rather than an error.
#[wasm_bindgen]
pub fn ll1_parsing_table_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => LL1ParsingTable::build(&g, g.nullable_first_follow())
            .to_json()
            .unwrap_or_else(json_error),
        Err(e) => json_error(e),
    }
}

#[wasm_bindgen]
pub fn parse_to_json(grammar: &str, input: &str) -> String {
    fn run(grammar: &str, input: &str) -> Result<String, Error> {
        let g = Grammar::parse(grammar)?;
        let table = g.generate_ll1_parsing_table()?;
        let tree = parse_source(&table, input)?;
        Ok(serde_json::json!({ "tree": tree.to_json_value()? }).to_string())
    }
    run(grammar, input).unwrap_or_else(json_error)
}


#[cfg(test)]
mod parse_tests {
    use super::test_grammars::*;
    use crate::grammar::grammar::{Rule, RuleId};
    use crate::{Grammar, GrammarError};

    fn parse_err(text: &str) -> GrammarError {
        Grammar::parse(text).unwrap_err()
    }

    #[test]
    fn simple_parse() {
        let g = Grammar::parse(PARENS).unwrap();

        assert_eq!(g.terminals(), ["(", ")"]);
        assert_eq!(g.non_terminals(), ["S"]);
        assert_eq!(g.start_symbol(), "S");
        assert_eq!(g.productions().len(), 1);

        let rules = g.rules_of("S");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].entities(), ["(", "S", ")"]);
        assert!(rules[1].is_epsilon());
        assert!(g.is_terminal("("));
        assert!(g.is_non_terminal("S"));
        assert!(!g.is_terminal("EPSILON"));
    }

    #[test]
    fn comments_and_blank_lines() {
        let g = Grammar::parse(
            "# a grammar\n\nNON_TERMINAL\nS\nEND\n# terminals\nTERMINAL\na\nEND\n\nSTART\nS\nEND\nRULES\nS : a\nEND\n",
        )
        .unwrap();
        assert_eq!(g.rules_of("S"), [Rule::new(["a"])]);
    }

    #[test]
    fn rules_of_one_parent_are_merged() {
        let g = Grammar::parse(
            "NON_TERMINAL\nS A\nEND\nTERMINAL\na b\nEND\nSTART\nS\nEND\nRULES\nS : A\nA : a\nS : b\nEND\n",
        )
        .unwrap();
        assert_eq!(g.productions().len(), 2);
        assert_eq!(g.productions()[0].parent(), "S");
        assert_eq!(g.rules_of("S"), [Rule::new(["A"]), Rule::new(["b"])]);
        assert_eq!(g.rule(RuleId::new(0, 1)), Some(&Rule::new(["b"])));
        assert_eq!(g.rule_parent(RuleId::new(1, 0)), Some("A"));
    }

    #[test]
    fn declared_non_terminal_without_rules() {
        let g = Grammar::parse(
            "NON_TERMINAL\nS A\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND\nRULES\nS : a\nEND\n",
        )
        .unwrap();
        assert!(g.rules_of("A").is_empty());
    }

    #[test]
    #[should_panic]
    fn rules_outside_block() {
        let _g = Grammar::parse("S : a").unwrap();
    }

    #[test]
    #[should_panic]
    fn empty_grammar() {
        let _g = Grammar::parse("  \n  ").unwrap();
    }

    #[test]
    fn unexpected_tokens() {
        assert_eq!(
            parse_err("S : a"),
            GrammarError::UnexpectedToken {
                line: 1,
                token: "S".to_string()
            }
        );
        assert!(matches!(
            parse_err("TERMINAL a\nEND"),
            GrammarError::UnexpectedToken { line: 1, .. }
        ));
        assert!(matches!(
            parse_err("END"),
            GrammarError::UnexpectedToken { line: 1, .. }
        ));
        assert!(matches!(
            parse_err("TERMINAL\nRULES\nEND"),
            GrammarError::UnexpectedToken { line: 2, .. }
        ));
    }

    #[test]
    fn incomplete_block() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na"),
            GrammarError::IncompleteBlock
        );
    }

    #[test]
    fn reserved_epsilon() {
        assert!(matches!(
            parse_err("TERMINAL\nEPSILON\nEND"),
            GrammarError::ReservedSymbol { line: 2, .. }
        ));
        assert!(matches!(
            parse_err("NON_TERMINAL\nS\nEND\nRULES\nEPSILON : S\nEND"),
            GrammarError::ReservedSymbol { line: 5, .. }
        ));
        assert!(matches!(
            parse_err("NON_TERMINAL\nS\nEND\nSTART\nEPSILON\nEND"),
            GrammarError::AmbiguousStartSymbol { line: 5 }
        ));
    }

    #[test]
    fn ambiguous_start_symbol() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS A\nEND\nSTART\nS A\nEND"),
            GrammarError::AmbiguousStartSymbol { line: 5 }
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS A\nEND\nSTART\nS\nEND\nSTART\nA\nEND"),
            GrammarError::AmbiguousStartSymbol { line: 8 }
        );
    }

    #[test]
    fn missing_start_symbol() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nRULES\nS : a\nEND"),
            GrammarError::MissingStartSymbol
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nSTART\na\nEND"),
            GrammarError::UndeclaredStartSymbol("a".to_string())
        );
    }

    #[test]
    fn rule_syntax() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nRULES\nS a\nEND"),
            GrammarError::ColonExpected {
                line: 8,
                found: Some("a".to_string())
            }
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nRULES\nS\nEND"),
            GrammarError::ColonExpected {
                line: 8,
                found: None
            }
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND\nRULES\nS :\nEND"),
            GrammarError::EmptyRule("S".to_string())
        );
    }

    #[test]
    fn symbol_sets() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na a\nEND\nSTART\nS\nEND"),
            GrammarError::DuplicateTerminal("a".to_string())
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS S\nEND\nSTART\nS\nEND"),
            GrammarError::DuplicateNonTerminal("S".to_string())
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS a\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND"),
            GrammarError::NotDisjoint("a".to_string())
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\n$\nEND\nSTART\nS\nEND"),
            GrammarError::ReservedDeclaration("$".to_string())
        );
    }

    #[test]
    fn undeclared_symbols() {
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND\nRULES\nS : a b\nEND"),
            GrammarError::UndeclaredSymbol {
                parent: "S".to_string(),
                symbol: "b".to_string()
            }
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND\nRULES\nX : a\nEND"),
            GrammarError::UndeclaredNonTerminal("X".to_string())
        );
        assert_eq!(
            parse_err("NON_TERMINAL\nS\nEND\nTERMINAL\na\nEND\nSTART\nS\nEND\nRULES\nS : a EPSILON\nEND"),
            GrammarError::MixedEpsilon("S".to_string())
        );
    }

    #[test]
    fn validated_construction() {
        use crate::grammar::grammar::Production;

        let g = Grammar::new(
            vec!["a".to_string()],
            vec!["S".to_string()],
            "S".to_string(),
            vec![Production::new("S", vec![Rule::new(["a", "S"]), Rule::epsilon()])],
        )
        .unwrap();
        assert_eq!(g.rule_iter().count(), 2);

        let duplicate = Grammar::new(
            vec!["a".to_string()],
            vec!["S".to_string()],
            "S".to_string(),
            vec![
                Production::new("S", vec![Rule::new(["a"])]),
                Production::new("S", vec![Rule::epsilon()]),
            ],
        );
        assert_eq!(
            duplicate.unwrap_err(),
            GrammarError::DuplicateProduction("S".to_string())
        );
    }

    #[test]
    fn rule_prefix() {
        let long = Rule::new(["a", "b", "c"]);
        assert!(long.starts_with(&Rule::new(["a", "b"])));
        assert!(long.starts_with(&long));
        assert!(!Rule::new(["a"]).starts_with(&long));
        assert!(!long.starts_with(&Rule::new(["b"])));

        let g = Grammar::parse(COMMON_PREFIX).unwrap();
        assert!(g.common_prefix_rules().is_empty());

        let g = Grammar::parse(
            "NON_TERMINAL\nA\nEND\nTERMINAL\nt x\nEND\nSTART\nA\nEND\nRULES\nA : t x\nA : t\nEND\n",
        )
        .unwrap();
        assert_eq!(
            g.common_prefix_rules(),
            vec![(RuleId::new(0, 0), RuleId::new(0, 1))]
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            GrammarError::ColonExpected {
                line: 3,
                found: Some("x".to_string())
            }
            .to_string(),
            "grammar: line 3: rules syntax error ':' expected: x"
        );
        assert_eq!(
            GrammarError::IncompleteBlock.to_string(),
            "grammar: block is incomplete 'END' expected"
        );
    }
}



#[cfg(test)]
mod driver_tests {
    use super::test_grammars::*;
    use crate::grammar::grammar::RuleId;
    use crate::grammar::ll1_parsing_table::Entry;
    use crate::{Grammar, LL1Parser, LL1ParsingTable, ParseError, TableError, Token};

    fn tokens(kinds: &str) -> Vec<Token> {
        kinds.split_whitespace().map(Token::symbol).collect()
    }

    #[test]
    fn balanced_parentheses() {
        let _ = env_logger::builder().is_test(true).try_init();
        let g = Grammar::parse(PARENS).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let outcome = table.parse(&tokens("( ( ) )")).unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            outcome.history,
            vec![RuleId::new(0, 0), RuleId::new(0, 0), RuleId::new(0, 1)]
        );
        assert_eq!(outcome.matched, [0, 1, 2, 3]);
    }

    #[test]
    fn empty_input() {
        let g = Grammar::parse(PARENS).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let outcome = table.parse(&[]).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.history, vec![RuleId::new(0, 1)]);
    }

    #[test]
    fn truncated_input_terminates() {
        let g = Grammar::parse(PARENS).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let mut parser = LL1Parser::new(&table, &tokens("( (")).unwrap();
        let mut steps = 0;
        while !parser.is_complete() {
            parser.step();
            steps += 1;
            assert!(steps < 100);
        }
        assert!(!parser.errors().is_empty());
        assert_eq!(
            parser.errors()[0],
            ParseError::Mismatch {
                position: 2,
                symbol: "$".to_string(),
                expected: ")".to_string()
            }
        );

        parser.step();
        assert!(parser.is_complete());
    }

    #[test]
    fn unexpected_tokens_are_skipped() {
        let g = Grammar::parse(PARENS).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let outcome = table
            .parse(&[
                Token::new("identifier", "x"),
                Token::symbol("("),
                Token::symbol(")"),
            ])
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![ParseError::UnexpectedSymbol {
                position: 0,
                symbol: "identifier".to_string(),
                non_terminal: "S".to_string()
            }]
        );
        assert_eq!(outcome.history, vec![RuleId::new(0, 0), RuleId::new(0, 1)]);
    }

    #[test]
    fn extra_closing_parenthesis() {
        let g = Grammar::parse(PARENS).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let outcome = table.parse(&tokens("( ) )")).unwrap();
        // input left over once the stack reaches `$` is not consumed
        assert!(outcome.is_success());
        assert_eq!(outcome.history, vec![RuleId::new(0, 0), RuleId::new(0, 1)]);
    }

    #[test]
    fn synchronize_pops_non_terminal() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let outcome = table.parse(&tokens("id * + id")).unwrap();
        assert_eq!(
            outcome.errors,
            vec![ParseError::Synchronize {
                position: 2,
                symbol: "+".to_string(),
                non_terminal: "F".to_string()
            }]
        );
        assert_eq!(outcome.errors[0].position(), 2);
        assert_eq!(outcome.errors[0].symbol(), "+");
        assert_eq!(
            outcome.errors[0].to_string(),
            "parser: error at symbol: + (token 2, abandoning F)"
        );
    }

    #[test]
    fn conflicting_table_is_rejected() {
        let g = Grammar::parse(
            "NON_TERMINAL\nA\nEND\nTERMINAL\nx y\nEND\nSTART\nA\nEND\nRULES\nA : y\nA : A x\nEND\n",
        )
        .unwrap();
        let table = LL1ParsingTable::build(&g, g.nullable_first_follow());
        assert_eq!(table.entry("A", "y"), Some(Entry::Rule(RuleId::new(0, 1))));

        let err = table.parse(&tokens("y")).unwrap_err();
        assert_eq!(err.conflicts(), table.conflicts());
        assert!(matches!(
            LL1Parser::new(&table, &tokens("y x")),
            Err(TableError::Conflicts(_))
        ));
    }

    #[test]
    fn shared_table() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let first = LL1Parser::new(&table, &tokens("id + id")).unwrap();
        let second = LL1Parser::new(&table, &tokens("( id * id )")).unwrap();
        assert!(first.run().is_success());
        assert!(second.run().is_success());
    }

    #[test]
    fn stack_starts_with_start_symbol() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let mut parser = LL1Parser::new(&table, &tokens("id")).unwrap();
        assert_eq!(parser.stack(), ["$", "E"]);
        parser.step();
        assert_eq!(parser.stack(), ["$", "E'", "T"]);
        assert_eq!(parser.history(), [RuleId::new(0, 0)]);
        assert_eq!(parser.cursor(), 0);
    }
}
