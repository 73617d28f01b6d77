//! Serializable record shapes.
//!
//! Grammars serialize as an ordered list of rule records
//! `{lhs, rhs: [{val, isTerminal, id}], id}`; match records dump as
//! `{key, matchedSequence, pattern, coordinate}`. Derivation trees serialize
//! through [`DerivationNode`] directly.

use crate::chart::MatchRecord;
use crate::derive::DerivationNode;
use crate::rule::{Grammar, GrammarCoordinate, Rule, START_SYMBOL};
use crate::symbol::{RuleId, Symbol, SymbolId};
use serde::{Deserialize, Serialize};

/// One RHS symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub val: String,
    pub is_terminal: bool,
    pub id: u64,
}

/// One grammar rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub lhs: String,
    pub rhs: Vec<SymbolRecord>,
    pub id: u64,
}

/// Span of a match inside a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateRecord {
    pub rule_id: u64,
    pub start: usize,
    pub end: usize,
}

/// Flat form of a [`MatchRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecordDump {
    pub key: String,
    pub matched_sequence: Vec<String>,
    pub pattern: String,
    pub coordinate: CoordinateRecord,
}

impl From<&Symbol> for SymbolRecord {
    fn from(symbol: &Symbol) -> Self {
        SymbolRecord {
            val: symbol.value().to_string(),
            is_terminal: symbol.is_terminal(),
            id: symbol.id().0,
        }
    }
}

impl From<&SymbolRecord> for Symbol {
    fn from(record: &SymbolRecord) -> Self {
        Symbol::new(record.val.as_str(), record.is_terminal, SymbolId(record.id))
    }
}

impl From<&Rule> for RuleRecord {
    fn from(rule: &Rule) -> Self {
        RuleRecord {
            lhs: rule.lhs.to_string(),
            rhs: rule.rhs.iter().map(SymbolRecord::from).collect(),
            id: rule.id().0,
        }
    }
}

impl From<&RuleRecord> for Rule {
    fn from(record: &RuleRecord) -> Self {
        Rule::new(
            record.lhs.as_str(),
            record.rhs.iter().map(Symbol::from).collect(),
            RuleId(record.id),
        )
    }
}

impl From<GrammarCoordinate> for CoordinateRecord {
    fn from(c: GrammarCoordinate) -> Self {
        CoordinateRecord {
            rule_id: c.rule_id.0,
            start: c.start,
            end: c.end,
        }
    }
}

impl From<&MatchRecord> for MatchRecordDump {
    fn from(record: &MatchRecord) -> Self {
        MatchRecordDump {
            key: record.key(),
            matched_sequence: record.values.clone(),
            pattern: record.pattern.to_string(),
            coordinate: record.coordinate.into(),
        }
    }
}

impl Grammar {
    /// Rule records in grammar order.
    pub fn to_records(&self) -> Vec<RuleRecord> {
        self.iter().map(RuleRecord::from).collect()
    }

    /// Rebuild a grammar from rule records with `start` as its start symbol.
    ///
    /// The id allocator is advanced past every loaded id and induced name.
    pub fn from_records(records: &[RuleRecord], start: &str) -> Grammar {
        let mut grammar = Grammar::with_start(start);
        for record in records {
            grammar.push_rule(Rule::from(record));
        }
        grammar
    }
}

/// Dump records in collection order.
pub fn match_dump(records: &[MatchRecord]) -> Vec<MatchRecordDump> {
    records.iter().map(MatchRecordDump::from).collect()
}

/// Serialize a grammar as pretty-printed rule records.
pub fn grammar_to_json(grammar: &Grammar) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&grammar.to_records())
}

/// Load a grammar from rule records with `start` as its start symbol.
pub fn grammar_from_json(json: &str, start: &str) -> serde_json::Result<Grammar> {
    let records: Vec<RuleRecord> = serde_json::from_str(json)?;
    Ok(Grammar::from_records(&records, start))
}

/// Serialize a match-record dump.
pub fn match_dump_to_json(records: &[MatchRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&match_dump(records))
}

/// Serialize a derivation tree.
pub fn tree_to_json(tree: &DerivationNode) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::induction::MetaGramBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn induced() -> Grammar {
        let mut mg = MetaGramBuilder::new("2, 2, X Y X")
            .corpus("a b a\na b a\n")
            .build()
            .unwrap();
        mg.run().unwrap();
        mg.into_grammar()
    }

    #[test]
    fn test_rule_record_shape() {
        let mut g = Grammar::new();
        let rhs = vec![
            Symbol::terminal("a", g.ids_mut()),
            Symbol::non_terminal("$A0", g.ids_mut()),
        ];
        g.add_rule(START_SYMBOL, rhs);

        let value = serde_json::to_value(g.to_records()).unwrap();
        assert_eq!(
            value,
            json!([{
                "lhs": "_S_",
                "rhs": [
                    {"val": "a", "isTerminal": true, "id": 0},
                    {"val": "$A0", "isTerminal": false, "id": 1}
                ],
                "id": 0
            }])
        );
    }

    #[test]
    fn test_reload_grammar() {
        let g = induced();
        let json = grammar_to_json(&g).unwrap();
        let mut back = grammar_from_json(&json, START_SYMBOL).unwrap();

        assert!(back.structurally_equals(&g));
        assert_eq!(back.to_records(), g.to_records());

        // Fresh ids and names continue past the loaded ones.
        let max_rule = g.iter().map(|r| r.id()).max().unwrap();
        assert!(back.ids_mut().fresh_rule() > max_rule);
        assert_eq!(back.ids_mut().fresh_name(), "$B0");
    }

    #[test]
    fn test_match_dump_shape() {
        let mg = MetaGramBuilder::new("1, 1, X X")
            .corpus("z z\n")
            .build()
            .unwrap();
        let records = mg.collect();
        let value = serde_json::to_value(match_dump(&records)).unwrap();
        assert_eq!(
            value,
            json!([{
                "key": "z z | X X",
                "matchedSequence": ["z", "z"],
                "pattern": "X X",
                "coordinate": {"ruleId": 0, "start": 0, "end": 1}
            }])
        );
        assert!(match_dump_to_json(&records).unwrap().contains("matchedSequence"));
    }

    #[test]
    fn test_bad_json() {
        assert!(grammar_from_json("{\"lhs\": 3}", START_SYMBOL).is_err());
    }

    #[test]
    fn test_reload_custom_start() {
        let mut mg = MetaGramBuilder::new("2, 2, X Y X")
            .start_symbol("ROOT")
            .corpus("a b a\na b a\n")
            .build()
            .unwrap();
        mg.run().unwrap();
        let g = mg.into_grammar();
        assert_eq!(g.start_symbol(), "ROOT");

        let back = grammar_from_json(&grammar_to_json(&g).unwrap(), "ROOT").unwrap();
        assert_eq!(back.start_symbol(), "ROOT");
        assert!(back.structurally_equals(&g));

        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(back.generate(&mut rng, 8).unwrap(), vec!["a", "b", "a"]);
    }
}
