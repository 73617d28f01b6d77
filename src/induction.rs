//! Grammar induction engine.
//!
//! Each iteration runs COLLECT (match every pattern at every offset of every
//! rule), AGGREGATE, RANK, PROMOTE (abstract fire candidates into new rules),
//! GENERALIZE and CLEANUP (deduplicate). The loop stops when an iteration
//! leaves the grammar structurally unchanged or the iteration cap is reached.

use crate::chart::{Candidate, MatchChart, MatchRecord};
use crate::corpus::load_corpus;
use crate::derive::DerivationNode;
use crate::parser::PatternSyntaxError;
use crate::pattern::{get_matchers, Pattern};
use crate::rule::{Grammar, GrammarCoordinate, GrammarError, Rule, START_SYMBOL};
use crate::symbol::Symbol;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort induction or generation.
#[derive(Debug, Error)]
pub enum InductionError {
    #[error("pattern program: {0}")]
    Pattern(#[from] PatternSyntaxError),
    #[error("grammar: {0}")]
    Grammar(#[from] GrammarError),
    #[error("corpus contains no usable lines")]
    EmptyCorpus,
    #[error("pattern program contains no clauses")]
    NoPatterns,
}

/// Configuration for the induction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InductionConfig {
    /// Maximum number of iterations (0 = unlimited).
    pub max_iterations: usize,
    /// Expansion depth allowed during generation.
    pub max_derivation_depth: usize,
    /// Name of the start non-terminal.
    pub start_symbol: String,
}

impl Default for InductionConfig {
    fn default() -> Self {
        InductionConfig {
            max_iterations: 0,
            max_derivation_depth: 256,
            start_symbol: START_SYMBOL.to_string(),
        }
    }
}

/// Statistics about induction so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InductionStats {
    pub iterations: usize,
    pub records: usize,
    pub fired: usize,
    pub induced: usize,
    pub merged: usize,
}

/// How a run ended. Both are successful completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The last iteration changed nothing.
    Converged,
    /// The iteration cap was reached first.
    MaxIterations,
}

/// The induction engine.
pub struct MetaGram {
    grammar: Grammar,
    patterns: Vec<Pattern>,
    records: Vec<MatchRecord>,
    config: InductionConfig,
    stats: InductionStats,
}

impl MetaGram {
    /// Create an engine over an existing grammar.
    pub fn new(grammar: Grammar, patterns: Vec<Pattern>) -> Self {
        MetaGram {
            grammar,
            patterns,
            records: Vec::new(),
            config: InductionConfig::default(),
            stats: InductionStats::default(),
        }
    }

    /// Create an engine with custom configuration.
    pub fn with_config(
        grammar: Grammar,
        patterns: Vec<Pattern>,
        config: InductionConfig,
    ) -> Self {
        let mut engine = Self::new(grammar, patterns);
        engine.config = config;
        engine
    }

    /// Get the current grammar.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Consume the engine, returning its grammar.
    pub fn into_grammar(self) -> Grammar {
        self.grammar
    }

    /// Get the compiled patterns, in program order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &InductionConfig {
        &self.config
    }

    /// Get execution statistics.
    pub fn stats(&self) -> &InductionStats {
        &self.stats
    }

    /// Match records from the most recent COLLECT.
    pub fn match_records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// COLLECT: run every pattern at every offset of every rule.
    pub fn collect(&self) -> Vec<MatchRecord> {
        let mut records = Vec::new();
        for rule in &self.grammar {
            let values = rule.values();
            for (p, pattern) in self.patterns.iter().enumerate() {
                for i in 0..values.len() {
                    let result = pattern.match_sequence(&values[i..]);
                    if result.is_empty() {
                        continue;
                    }
                    let record = MatchRecord {
                        coordinate: GrammarCoordinate::new(rule.id(), i, i + result.len() - 1),
                        values: result.values,
                        pattern: pattern.source_rc(),
                        pattern_index: p,
                        wildcards: result.wildcards,
                    };
                    tracing::trace!(record = %record, "match");
                    records.push(record);
                }
            }
        }
        records
    }

    /// PROMOTE one candidate. Returns the number of induced rules.
    ///
    /// A span taken by an earlier candidate now holds a fresh non-terminal
    /// that no collected value sequence contains, so spans never overlap.
    fn promote(&mut self, candidate: &Candidate) -> Result<usize, GrammarError> {
        let target = &candidate.values;
        let len = target.len();
        let start = self.grammar.start_symbol().to_string();
        let (rules, ids) = self.grammar.parts_mut();

        let mut rewrites = Vec::new();
        let mut induced = Vec::new();
        for rule in rules {
            // A non-start rule that is exactly the candidate is already abstracted.
            if rule.len() < len || (rule.len() == len && rule.lhs.as_ref() != start) {
                continue;
            }
            let mut rhs = Vec::with_capacity(rule.len());
            let mut changed = false;
            let mut i = 0;
            while i < rule.len() {
                let end = i + len - 1;
                let hit = end < rule.len()
                    && rule.rhs[i..=end].iter().zip(target).all(|(s, v)| s.value() == v);
                if hit {
                    let name = ids.fresh_name();
                    let body = rule.rhs[i..=end].iter().map(|s| s.fresh(ids)).collect();
                    induced.push(Rule::new(name.as_str(), body, ids.fresh_rule()));
                    rhs.push(Symbol::non_terminal(name, ids));
                    changed = true;
                    i += len;
                } else {
                    rhs.push(rule.rhs[i].clone());
                    i += 1;
                }
            }
            if changed {
                rewrites.push(Rule::new(rule.lhs.clone(), rhs, rule.id()));
            }
        }

        for rule in rewrites {
            self.grammar.replace_rule(rule)?;
        }
        let count = induced.len();
        for rule in induced {
            self.grammar.push_rule(rule);
        }
        Ok(count)
    }

    /// Wildcard generalization. Candidates are reported but nothing is rewritten.
    fn generalize(&self, candidates: &[&Candidate]) {
        for candidate in candidates {
            tracing::debug!(
                values = %candidate.values.join(" "),
                pattern = %candidate.pattern,
                count = candidate.count,
                "wildcard candidate left unchanged"
            );
        }
    }

    /// Run one iteration. Returns whether the grammar changed.
    pub fn step(&mut self) -> Result<bool, InductionError> {
        let before = self.grammar.clone();
        self.records = self.collect();
        let chart = MatchChart::from_records(&self.records, &self.patterns);
        let ranking = chart.rank();

        let mut induced = 0;
        for candidate in &ranking.fire {
            let n = self.promote(candidate)?;
            tracing::debug!(
                values = %candidate.values.join(" "),
                pattern = %candidate.pattern,
                count = candidate.count,
                induced = n,
                "promoted candidate"
            );
            induced += n;
        }
        self.generalize(&ranking.wildcard);
        let merged = self.grammar.deduplicate();

        self.stats.iterations += 1;
        self.stats.records += self.records.len();
        self.stats.fired += ranking.fire.len();
        self.stats.induced += induced;
        self.stats.merged += merged;

        tracing::info!(
            iteration = self.stats.iterations,
            rules = self.grammar.len(),
            records = self.records.len(),
            fired = ranking.fire.len(),
            "induction iteration"
        );
        Ok(!self.grammar.structurally_equals(&before))
    }

    /// Iterate until convergence or the iteration cap.
    pub fn run(&mut self) -> Result<Outcome, InductionError> {
        loop {
            if !self.step()? {
                return Ok(Outcome::Converged);
            }
            let max = self.config.max_iterations;
            if max > 0 && self.stats.iterations >= max {
                return Ok(Outcome::MaxIterations);
            }
        }
    }

    /// Generate a sentence from the current grammar.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<String>, InductionError> {
        Ok(self.grammar.generate(rng, self.config.max_derivation_depth)?)
    }

    /// Generate a derivation tree from the current grammar.
    pub fn generate_tree<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<DerivationNode, InductionError> {
        Ok(self.grammar.derive_tree(rng, self.config.max_derivation_depth)?)
    }
}

/// Builder that compiles patterns and loads a corpus.
pub struct MetaGramBuilder {
    program: String,
    config: InductionConfig,
    corpus: Option<String>,
    grammar: Option<Grammar>,
}

impl MetaGramBuilder {
    /// Start a builder for the given pattern program.
    pub fn new(program: impl Into<String>) -> Self {
        MetaGramBuilder {
            program: program.into(),
            config: InductionConfig::default(),
            corpus: None,
            grammar: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: InductionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the iteration cap (0 = unlimited).
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.config.max_iterations = n;
        self
    }

    /// Set the derivation depth limit.
    pub fn max_derivation_depth(mut self, depth: usize) -> Self {
        self.config.max_derivation_depth = depth;
        self
    }

    /// Set the start symbol of a corpus-built grammar.
    pub fn start_symbol(mut self, name: impl Into<String>) -> Self {
        self.config.start_symbol = name.into();
        self
    }

    /// Corpus text, one example per line.
    pub fn corpus(mut self, text: impl Into<String>) -> Self {
        self.corpus = Some(text.into());
        self
    }

    /// Start from an existing grammar instead of a corpus.
    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Compile the program, then load the corpus.
    ///
    /// A supplied grammar keeps its own start symbol and the engine config is
    /// updated to match it.
    pub fn build(mut self) -> Result<MetaGram, InductionError> {
        let patterns = get_matchers(&self.program)?;
        if patterns.is_empty() {
            return Err(InductionError::NoPatterns);
        }
        let mut grammar = match self.grammar.take() {
            Some(g) => {
                self.config.start_symbol = g.start_symbol().to_string();
                g
            }
            None => Grammar::with_start(self.config.start_symbol.as_str()),
        };
        if let Some(text) = &self.corpus {
            load_corpus(text, &mut grammar);
        }
        if grammar.is_empty() {
            return Err(InductionError::EmptyCorpus);
        }
        tracing::debug!(
            patterns = patterns.len(),
            rules = grammar.len(),
            "induction engine ready"
        );
        Ok(MetaGram::with_config(grammar, patterns, self.config))
    }
}
