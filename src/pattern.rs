//! Compiled sequence patterns.
//!
//! A [`Pattern`] is a list of [`PatternToken`]s plus two thresholds. Matching
//! walks the tokens against the front of a value sequence, unifying variables
//! through a fresh [`Bindings`] per call. Patterns hold no mutable state, so
//! repeated calls with the same input always give the same result.

use crate::parser::{self, PatternSyntaxError, WILDCARD};
use crate::subst::Bindings;
use ordered_float::OrderedFloat;
use std::fmt;
use std::rc::Rc;

/// One position of a pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternToken {
    /// Must bind one consistent value across all occurrences.
    Variable(Rc<str>),
    /// Accepts any value without binding.
    Wildcard,
}

impl fmt::Display for PatternToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternToken::Variable(name) => write!(f, "{}", name),
            PatternToken::Wildcard => write!(f, "{}", WILDCARD),
        }
    }
}

/// Outcome of one match attempt. Empty on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// The matched values, in order.
    pub values: Vec<String>,
    /// Positions (into `values`) captured by a wildcard.
    pub wildcards: Vec<usize>,
}

impl MatchResult {
    /// Check if the match failed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of matched values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// The values captured by wildcards.
    pub fn wildcard_values(&self) -> Vec<&str> {
        self.wildcards
            .iter()
            .map(|&i| self.values[i].as_str())
            .collect()
    }
}

/// A compiled pattern clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pattern {
    tokens: Vec<PatternToken>,
    fire_threshold: OrderedFloat<f64>,
    wildcard_threshold: OrderedFloat<f64>,
    source: Rc<str>,
}

impl Pattern {
    /// Build a pattern from tokens and thresholds.
    pub fn new(
        tokens: Vec<PatternToken>,
        fire_threshold: OrderedFloat<f64>,
        wildcard_threshold: OrderedFloat<f64>,
    ) -> Self {
        let source = tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Pattern {
            tokens,
            fire_threshold,
            wildcard_threshold,
            source: source.into(),
        }
    }

    /// Get the pattern tokens.
    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// Number of tokens, which is also the match length.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the pattern has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Minimum aggregate count for promotion.
    pub fn fire_threshold(&self) -> f64 {
        self.fire_threshold.into_inner()
    }

    /// Minimum aggregate count for generalization.
    pub fn wildcard_threshold(&self) -> f64 {
        self.wildcard_threshold.into_inner()
    }

    /// Normalized token pattern text, e.g. `X * X`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn source_rc(&self) -> Rc<str> {
        self.source.clone()
    }

    /// Match this pattern against the front of `sequence`.
    pub fn match_sequence<T: AsRef<str>>(&self, sequence: &[T]) -> MatchResult {
        if sequence.len() < self.tokens.len() {
            return MatchResult::default();
        }
        let mut bindings = Bindings::new();
        let mut wildcards = Vec::new();
        for (i, (token, value)) in self.tokens.iter().zip(sequence).enumerate() {
            match token {
                PatternToken::Wildcard => wildcards.push(i),
                PatternToken::Variable(name) => {
                    if bindings.unify(name, value.as_ref()).is_err() {
                        return MatchResult::default();
                    }
                }
            }
        }
        MatchResult {
            values: sequence[..self.tokens.len()]
                .iter()
                .map(|v| v.as_ref().to_string())
                .collect(),
            wildcards,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.fire_threshold, self.wildcard_threshold, self.source
        )
    }
}

/// Compile a pattern program into matchers, preserving clause order.
pub fn get_matchers(program: &str) -> Result<Vec<Pattern>, PatternSyntaxError> {
    parser::parse_program(program)
}
