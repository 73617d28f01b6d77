//! Rules and grammars.
//!
//! A [`Grammar`] is an ordered collection of [`Rule`]s. Several rules may share
//! a left-hand side; those are the alternatives of that non-terminal. Rules are
//! only ever added, removed or replaced whole, so a [`GrammarCoordinate`] into a
//! rule stays meaningful until that rule is replaced.

use crate::symbol::{IdAllocator, RuleId, Symbol};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Reserved name of the start symbol.
pub const START_SYMBOL: &str = "_S_";

/// Errors raised by grammar operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GrammarError {
    #[error("no alternative rules for non-terminal {0}")]
    RuleLookup(String),
    #[error("no matching rule to replace for {0}")]
    ReplaceRule(String),
    #[error("derivation exceeded depth limit of {limit}")]
    DerivationLimit { limit: usize },
}

/// A rule: `lhs -> rhs[0] rhs[1] ... rhs[n]`.
#[derive(Clone, Debug)]
pub struct Rule {
    pub lhs: Rc<str>,
    pub rhs: Vec<Symbol>,
    id: RuleId,
}

impl Rule {
    /// Create a rule with an explicit id.
    pub fn new(lhs: impl Into<Rc<str>>, rhs: Vec<Symbol>, id: RuleId) -> Self {
        Rule {
            lhs: lhs.into(),
            rhs,
            id,
        }
    }

    /// Get the rule id.
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Number of RHS symbols.
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    /// Check if the RHS is empty.
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// The RHS as plain token values.
    pub fn values(&self) -> Vec<&str> {
        self.rhs.iter().map(|s| s.value()).collect()
    }

    /// Key identifying the RHS by value sequence, ignoring the LHS.
    pub fn rhs_key(&self) -> String {
        rhs_key(self.rhs.iter().map(|s| s.value()))
    }

    /// Check if two rules have the same LHS and symbol-by-symbol equal RHS.
    pub fn same(&self, other: &Rule) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }

    /// Copy this rule with every symbol under a fresh id.
    pub fn fresh(&self, ids: &mut IdAllocator) -> Rule {
        Rule::new(
            self.lhs.clone(),
            self.rhs.iter().map(|s| s.fresh(ids)).collect(),
            ids.fresh_rule(),
        )
    }

    fn canonical_key(&self) -> (&str, Vec<&str>) {
        (&self.lhs, self.values())
    }
}

/// Join token values into a single order-sensitive key.
///
/// The unit separator cannot appear in a cleaned corpus token.
pub fn rhs_key<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values.into_iter().collect::<Vec<_>>().join("\u{1f}")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// An inclusive span `[start, end]` inside one rule's RHS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrammarCoordinate {
    pub rule_id: RuleId,
    pub start: usize,
    pub end: usize,
}

impl GrammarCoordinate {
    /// Create a coordinate for the inclusive span `[start, end]`.
    pub fn new(rule_id: RuleId, start: usize, end: usize) -> Self {
        GrammarCoordinate {
            rule_id,
            start,
            end,
        }
    }

    /// Same rule and intersecting index ranges.
    pub fn overlaps(&self, other: &GrammarCoordinate) -> bool {
        self.rule_id == other.rule_id && self.start <= other.end && other.start <= self.end
    }

    /// Number of symbols covered (never zero).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }
}

impl fmt::Display for GrammarCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..={}]", self.rule_id, self.start, self.end)
    }
}

/// A context-free grammar: an ordered, mutable collection of rules.
#[derive(Clone, Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    start: Rc<str>,
    ids: IdAllocator,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    /// Create an empty grammar using the reserved start symbol.
    pub fn new() -> Self {
        Self::with_start(START_SYMBOL)
    }

    /// Create an empty grammar with a custom start symbol name.
    pub fn with_start(start: impl Into<Rc<str>>) -> Self {
        Grammar {
            rules: Vec::new(),
            start: start.into(),
            ids: IdAllocator::new(),
        }
    }

    /// Get the start symbol name.
    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    /// Get all rules in order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the grammar has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Get mutable access to the id allocator.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Rules together with the allocator, for rewrites that read one and mint with the other.
    pub(crate) fn parts_mut(&mut self) -> (&[Rule], &mut IdAllocator) {
        (&self.rules, &mut self.ids)
    }

    /// All alternatives sharing the given LHS, in grammar order.
    pub fn alternatives<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.lhs.as_ref() == lhs)
    }

    /// Append a new rule. Never fails and does not deduplicate.
    pub fn add_rule(&mut self, lhs: impl Into<Rc<str>>, rhs: Vec<Symbol>) -> RuleId {
        let id = self.ids.fresh_rule();
        self.rules.push(Rule::new(lhs, rhs, id));
        id
    }

    /// Append a rule that already carries an id.
    pub(crate) fn push_rule(&mut self, rule: Rule) {
        self.ids.reserve(rule.rhs.iter().map(|s| s.id()).max(), Some(rule.id));
        self.ids.reserve_name(&rule.lhs);
        self.rules.push(rule);
    }

    /// Remove the first rule structurally equal to `rule`.
    pub fn remove_rule(&mut self, rule: &Rule) -> Option<Rule> {
        let pos = self.rules.iter().position(|r| r.same(rule))?;
        Some(self.rules.remove(pos))
    }

    fn remove_by_id(&mut self, id: RuleId) -> Option<Rule> {
        let pos = self.rules.iter().position(|r| r.id == id)?;
        Some(self.rules.remove(pos))
    }

    /// Replace a stored rule with `new_rule`.
    ///
    /// The target is the rule carrying the same id; failing that, the first
    /// rule sharing the LHS name.
    pub fn replace_rule(&mut self, new_rule: Rule) -> Result<Rule, GrammarError> {
        let pos = self
            .rules
            .iter()
            .position(|r| r.id == new_rule.id)
            .or_else(|| self.rules.iter().position(|r| r.lhs == new_rule.lhs))
            .ok_or_else(|| GrammarError::ReplaceRule(new_rule.lhs.to_string()))?;
        Ok(std::mem::replace(&mut self.rules[pos], new_rule))
    }

    /// Rewrite every RHS occurrence of `old` to `new`. Returns the number of rewrites.
    pub fn replace_symbol_everywhere(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        for rule in &mut self.rules {
            if rule.rhs.iter().all(|s| s.value() != old) {
                continue;
            }
            let rhs = rule
                .rhs
                .iter()
                .map(|s| {
                    if s.value() == old {
                        count += 1;
                        s.renamed(new)
                    } else {
                        s.clone()
                    }
                })
                .collect();
            *rule = Rule::new(rule.lhs.clone(), rhs, rule.id);
        }
        count
    }

    /// Collapse rules with identical RHS value sequences.
    ///
    /// Within each group the first rule in grammar order survives; references
    /// to the other members' names are rewritten to the survivor's name and the
    /// other members are removed. Start rules only group with start rules.
    /// Repeats until no group has more than one member. Returns the number of
    /// rules removed.
    pub fn deduplicate(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let mut groups: FxHashMap<(bool, String), Vec<usize>> = FxHashMap::default();
            let mut order = Vec::new();
            for (i, rule) in self.rules.iter().enumerate() {
                let key = (rule.lhs == self.start, rule.rhs_key());
                let group = groups.entry(key.clone()).or_default();
                if group.is_empty() {
                    order.push(key);
                }
                group.push(i);
            }

            let Some(members) = order
                .iter()
                .filter_map(|k| groups.get(k))
                .find(|g| g.len() > 1)
            else {
                return removed;
            };

            let keep = self.rules[members[0]].lhs.clone();
            let doomed: Vec<(RuleId, Rc<str>)> = members[1..]
                .iter()
                .map(|&i| (self.rules[i].id, self.rules[i].lhs.clone()))
                .collect();

            for (id, lhs) in doomed {
                if lhs != keep {
                    self.replace_symbol_everywhere(&lhs, &keep);
                }
                if self.remove_by_id(id).is_some() {
                    removed += 1;
                }
            }
        }
    }

    /// Same rule count and, under the canonical ordering (LHS, then RHS
    /// values), pairwise equal LHS and RHS.
    pub fn structurally_equals(&self, other: &Grammar) -> bool {
        if self.rules.len() != other.rules.len() {
            return false;
        }
        let mut mine: Vec<_> = self.rules.iter().map(Rule::canonical_key).collect();
        let mut theirs: Vec<_> = other.rules.iter().map(Rule::canonical_key).collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }

    /// Build a name -> alternatives index over the current rules.
    pub fn alternative_index(&self) -> AlternativeIndex<'_> {
        let mut index = AlternativeIndex(FxHashMap::default());
        for rule in &self.rules {
            index.0.entry(rule.lhs.as_ref()).or_default().push(rule);
        }
        index
    }
}

/// Index from a non-terminal name to its alternative rules.
#[derive(Debug, Default)]
pub struct AlternativeIndex<'a>(pub FxHashMap<&'a str, Vec<&'a Rule>>);

impl<'a> AlternativeIndex<'a> {
    /// Alternatives for `name`, or a lookup error if there are none.
    pub fn get(&self, name: &str) -> Result<&[&'a Rule], GrammarError> {
        self.0
            .get(name)
            .map(Vec::as_slice)
            .filter(|alts| !alts.is_empty())
            .ok_or_else(|| GrammarError::RuleLookup(name.to_string()))
    }
}

impl<'a> IntoIterator for &'a Grammar {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminals(grammar: &mut Grammar, values: &[&str]) -> Vec<Symbol> {
        values
            .iter()
            .map(|v| Symbol::terminal(*v, grammar.ids_mut()))
            .collect()
    }

    fn non_terminal(grammar: &mut Grammar, name: &str) -> Symbol {
        Symbol::non_terminal(name, grammar.ids_mut())
    }

    #[test]
    fn test_add_rule_keeps_duplicates() {
        let mut g = Grammar::new();
        let rhs = terminals(&mut g, &["a", "b"]);
        let rhs2 = terminals(&mut g, &["a", "b"]);
        let r1 = g.add_rule(START_SYMBOL, rhs);
        let r2 = g.add_rule(START_SYMBOL, rhs2);

        assert_ne!(r1, r2);
        assert_eq!(g.len(), 2);
        assert_eq!(g.alternatives(START_SYMBOL).count(), 2);
    }

    #[test]
    fn test_remove_rule_structural() {
        let mut g = Grammar::new();
        let rhs = terminals(&mut g, &["a", "b"]);
        g.add_rule("X", rhs);
        let other = terminals(&mut g, &["c"]);
        g.add_rule("Y", other);

        let lookalike_rhs = terminals(&mut g, &["a", "b"]);
        let lookalike = Rule::new("X", lookalike_rhs, RuleId(999));
        assert!(g.remove_rule(&lookalike).is_some());
        assert_eq!(g.len(), 1);
        assert!(g.remove_rule(&lookalike).is_none());
    }

    #[test]
    fn test_replace_rule() {
        let mut g = Grammar::new();
        let rhs = terminals(&mut g, &["a", "b"]);
        let id = g.add_rule("X", rhs);

        let new_rhs = terminals(&mut g, &["c"]);
        let old = g.replace_rule(Rule::new("X", new_rhs, id)).unwrap();
        assert_eq!(old.values(), vec!["a", "b"]);
        assert_eq!(g.get(id).unwrap().values(), vec!["c"]);
    }

    #[test]
    fn test_replace_rule_no_match() {
        let mut g = Grammar::new();
        let rhs = terminals(&mut g, &["a"]);
        g.add_rule("X", rhs);

        let new_rhs = terminals(&mut g, &["c"]);
        let err = g.replace_rule(Rule::new("Q", new_rhs, RuleId(77))).unwrap_err();
        assert_eq!(err, GrammarError::ReplaceRule("Q".to_string()));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_replace_symbol_everywhere() {
        let mut g = Grammar::new();
        let mut rhs = terminals(&mut g, &["a"]);
        rhs.push(non_terminal(&mut g, "$B0"));
        rhs.push(non_terminal(&mut g, "$B0"));
        g.add_rule(START_SYMBOL, rhs);

        assert_eq!(g.replace_symbol_everywhere("$B0", "$A0"), 2);
        let rule = &g.rules()[0];
        assert_eq!(rule.values(), vec!["a", "$A0", "$A0"]);
        assert!(!rule.rhs[1].is_terminal());
    }

    #[test]
    fn test_deduplicate_merges_and_rewrites() {
        let mut g = Grammar::new();
        let s1 = vec![non_terminal(&mut g, "$A0")];
        let s2 = vec![non_terminal(&mut g, "$B0")];
        g.add_rule(START_SYMBOL, s1);
        g.add_rule(START_SYMBOL, s2);
        let a = terminals(&mut g, &["a", "b", "a"]);
        let b = terminals(&mut g, &["a", "b", "a"]);
        g.add_rule("$A0", a);
        g.add_rule("$B0", b);

        let removed = g.deduplicate();

        // $B0 folds into $A0, then the two start rules become identical.
        assert_eq!(removed, 2);
        assert_eq!(g.len(), 2);
        assert_eq!(g.alternatives(START_SYMBOL).count(), 1);
        assert_eq!(g.alternatives("$A0").count(), 1);
        assert_eq!(g.alternatives("$B0").count(), 0);
        assert!(g.iter().all(|r| r.values() != vec!["$B0"]));
    }

    #[test]
    fn test_deduplicate_idempotent() {
        let mut g = Grammar::new();
        for _ in 0..3 {
            let rhs = terminals(&mut g, &["x", "y"]);
            let name = g.ids_mut().fresh_name();
            g.add_rule(name, rhs);
        }
        g.deduplicate();
        let snapshot = g.clone();
        assert_eq!(g.deduplicate(), 0);
        assert!(g.structurally_equals(&snapshot));
    }

    #[test]
    fn test_deduplicate_never_folds_into_start() {
        let mut g = Grammar::new();
        let s = terminals(&mut g, &["a", "b"]);
        let x = terminals(&mut g, &["a", "b"]);
        g.add_rule(START_SYMBOL, s);
        g.add_rule("$A0", x);

        assert_eq!(g.deduplicate(), 0);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_structurally_equals_ignores_order() {
        let mut g1 = Grammar::new();
        let a = terminals(&mut g1, &["a"]);
        let b = terminals(&mut g1, &["b"]);
        g1.add_rule("X", a);
        g1.add_rule("Y", b);

        let mut g2 = Grammar::new();
        let b = terminals(&mut g2, &["b"]);
        let a = terminals(&mut g2, &["a"]);
        g2.add_rule("Y", b);
        g2.add_rule("X", a);

        assert!(g1.structurally_equals(&g2));

        let c = terminals(&mut g2, &["c"]);
        g2.add_rule("Z", c);
        assert!(!g1.structurally_equals(&g2));
    }

    #[test]
    fn test_structurally_equals_compares_rhs() {
        let mut g1 = Grammar::new();
        let a = terminals(&mut g1, &["a", "b"]);
        g1.add_rule("X", a);

        let mut g2 = Grammar::new();
        let a = terminals(&mut g2, &["b", "a"]);
        g2.add_rule("X", a);

        assert!(!g1.structurally_equals(&g2));
    }

    #[test]
    fn test_coordinate_overlap() {
        let a = GrammarCoordinate::new(RuleId(1), 0, 2);
        let b = GrammarCoordinate::new(RuleId(1), 2, 4);
        let c = GrammarCoordinate::new(RuleId(1), 3, 4);
        let d = GrammarCoordinate::new(RuleId(2), 0, 2);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_alternative_index_lookup() {
        let mut g = Grammar::new();
        let rhs = vec![non_terminal(&mut g, "$A0")];
        g.add_rule(START_SYMBOL, rhs);

        let index = g.alternative_index();
        assert_eq!(index.get(START_SYMBOL).unwrap().len(), 1);
        assert_eq!(
            index.get("$A0").unwrap_err(),
            GrammarError::RuleLookup("$A0".to_string())
        );
    }

    #[test]
    fn test_display() {
        let mut g = Grammar::new();
        let mut rhs = terminals(&mut g, &["the"]);
        rhs.push(non_terminal(&mut g, "$A0"));
        g.add_rule(START_SYMBOL, rhs);
        assert_eq!(g.to_string(), "_S_ -> the <$A0>\n");
    }
}
