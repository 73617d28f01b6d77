//! Random derivation from a grammar.
//!
//! Alternatives are picked with a uniform random index. Every nesting level
//! counts against a depth limit so a cyclic grammar fails with
//! [`GrammarError::DerivationLimit`] instead of running forever.

use crate::rule::{AlternativeIndex, Grammar, GrammarError, Rule};
use crate::symbol::Symbol;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A node of a derivation tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationNode {
    pub name: String,
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DerivationNode>,
    #[serde(skip)]
    pub is_terminal: bool,
}

impl DerivationNode {
    /// Terminal leaves, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.children.is_empty() {
            if self.is_terminal {
                out.push(&self.name);
            }
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    /// Longest root-to-leaf path, counting the root.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}

fn choose<'a, R: Rng + ?Sized>(
    index: &AlternativeIndex<'a>,
    name: &str,
    rng: &mut R,
) -> Result<&'a [Symbol], GrammarError> {
    let alternatives = index.get(name)?;
    let rule: &'a Rule = alternatives[rng.gen_range(0..alternatives.len())];
    Ok(&rule.rhs)
}

impl Grammar {
    /// Expand the start symbol until only terminals remain.
    ///
    /// Non-terminals are expanded depth-first, left to right, in the same
    /// order as [`derive_tree`](Grammar::derive_tree), so one seed yields one
    /// sentence either way. Nesting deeper than `max_depth` is an error.
    pub fn random_derive<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_depth: usize,
    ) -> Result<Vec<Symbol>, GrammarError> {
        let index = self.alternative_index();
        let mut out = Vec::new();
        derive_into(&index, self.start_symbol(), rng, 1, max_depth, &mut out)?;
        Ok(out)
    }

    /// Derive a sentence as plain token strings.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_depth: usize,
    ) -> Result<Vec<String>, GrammarError> {
        Ok(self
            .random_derive(rng, max_depth)?
            .iter()
            .map(|s| s.value().to_string())
            .collect())
    }

    /// Derive a labeled tree rooted at the start symbol.
    pub fn derive_tree<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_depth: usize,
    ) -> Result<DerivationNode, GrammarError> {
        let index = self.alternative_index();
        expand(&index, self.start_symbol(), None, rng, 1, max_depth)
    }
}

fn derive_into<R: Rng + ?Sized>(
    index: &AlternativeIndex<'_>,
    name: &str,
    rng: &mut R,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<Symbol>,
) -> Result<(), GrammarError> {
    if depth > max_depth {
        return Err(GrammarError::DerivationLimit { limit: max_depth });
    }
    for symbol in choose(index, name, rng)? {
        if symbol.is_terminal() {
            out.push(symbol.clone());
        } else {
            derive_into(index, symbol.value(), rng, depth + 1, max_depth, out)?;
        }
    }
    Ok(())
}

fn expand<R: Rng + ?Sized>(
    index: &AlternativeIndex<'_>,
    name: &str,
    parent: Option<&str>,
    rng: &mut R,
    depth: usize,
    max_depth: usize,
) -> Result<DerivationNode, GrammarError> {
    if depth > max_depth {
        return Err(GrammarError::DerivationLimit { limit: max_depth });
    }
    let rhs = choose(index, name, rng)?;
    let mut children = Vec::with_capacity(rhs.len());
    for symbol in rhs {
        if symbol.is_terminal() {
            children.push(DerivationNode {
                name: symbol.value().to_string(),
                parent: Some(name.to_string()),
                children: Vec::new(),
                is_terminal: true,
            });
        } else {
            children.push(expand(
                index,
                symbol.value(),
                Some(name),
                rng,
                depth + 1,
                max_depth,
            )?);
        }
    }
    Ok(DerivationNode {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        children,
        is_terminal: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::START_SYMBOL;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_grammar() -> Grammar {
        let mut g = Grammar::new();
        let ids = g.ids_mut();
        let start = vec![
            Symbol::terminal("the", ids),
            Symbol::non_terminal("$A0", ids),
        ];
        let a = vec![Symbol::terminal("cat", ids)];
        let b = vec![
            Symbol::terminal("big", ids),
            Symbol::non_terminal("$B0", ids),
        ];
        let c = vec![Symbol::terminal("dog", ids)];
        g.add_rule(START_SYMBOL, start);
        g.add_rule("$A0", a);
        g.add_rule("$A0", b);
        g.add_rule("$B0", c);
        g
    }

    #[test]
    fn test_derive_only_terminals() {
        let g = sample_grammar();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let out = g.random_derive(&mut rng, 16).unwrap();
            assert!(out.iter().all(|s| s.is_terminal()));
            assert_eq!(out[0].value(), "the");
        }
    }

    #[test]
    fn test_generate_reaches_every_alternative() {
        let g = sample_grammar();
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            seen.insert(g.generate(&mut rng, 16).unwrap().join(" "));
        }
        assert!(seen.contains("the cat"));
        assert!(seen.contains("the big dog"));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_tree_leaves_match_parents() {
        let g = sample_grammar();
        let mut rng = StdRng::seed_from_u64(3);
        let tree = g.derive_tree(&mut rng, 16).unwrap();
        assert_eq!(tree.name, START_SYMBOL);
        assert_eq!(tree.parent, None);
        assert_eq!(tree.leaves()[0], "the");
        for child in &tree.children {
            assert_eq!(child.parent.as_deref(), Some(START_SYMBOL));
        }
    }

    #[test]
    fn test_same_seed_same_tree_and_sentence() {
        let g = sample_grammar();
        let a = g.derive_tree(&mut StdRng::seed_from_u64(11), 16).unwrap();
        let b = g.derive_tree(&mut StdRng::seed_from_u64(11), 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_seed_sentence_matches_tree_leaves() {
        let g = sample_grammar();
        for seed in 0..20 {
            let flat = g.generate(&mut StdRng::seed_from_u64(seed), 16).unwrap();
            let tree = g.derive_tree(&mut StdRng::seed_from_u64(seed), 16).unwrap();
            assert_eq!(tree.leaves(), flat.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_missing_alternative() {
        let mut g = Grammar::new();
        let rhs = vec![Symbol::non_terminal("$Q0", g.ids_mut())];
        g.add_rule(START_SYMBOL, rhs);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            g.random_derive(&mut rng, 8).unwrap_err(),
            GrammarError::RuleLookup("$Q0".to_string())
        );
        assert!(matches!(
            g.derive_tree(&mut rng, 8),
            Err(GrammarError::RuleLookup(_))
        ));
    }

    #[test]
    fn test_empty_grammar() {
        let g = Grammar::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            g.generate(&mut rng, 8).unwrap_err(),
            GrammarError::RuleLookup(START_SYMBOL.to_string())
        );
    }

    #[test]
    fn test_cyclic_grammar_hits_limit() {
        let mut g = Grammar::new();
        let rhs = vec![Symbol::non_terminal("$A0", g.ids_mut())];
        g.add_rule(START_SYMBOL, rhs);
        let rhs = vec![
            Symbol::terminal("x", g.ids_mut()),
            Symbol::non_terminal("$A0", g.ids_mut()),
        ];
        g.add_rule("$A0", rhs);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            g.random_derive(&mut rng, 32).unwrap_err(),
            GrammarError::DerivationLimit { limit: 32 }
        );
        assert_eq!(
            g.derive_tree(&mut rng, 32).unwrap_err(),
            GrammarError::DerivationLimit { limit: 32 }
        );
    }

    #[test]
    fn test_terminal_children_omitted_in_json() {
        let mut g = Grammar::new();
        let rhs = vec![Symbol::terminal("hi", g.ids_mut())];
        g.add_rule(START_SYMBOL, rhs);
        let tree = g.derive_tree(&mut StdRng::seed_from_u64(0), 4).unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "_S_",
                "parent": null,
                "children": [{ "name": "hi", "parent": "_S_" }]
            })
        );
        assert_eq!(tree.depth(), 2);
    }
}
