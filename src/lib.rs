//! MetaGram: grammar induction from example sequences.
//!
//! This crate provides:
//! - Symbols, rules and grammars with random derivation
//! - A small unification-based pattern language with wildcards
//! - Match aggregation and ranking
//! - The induction engine that abstracts recurring sub-sequences into rules
//! - Serializable record shapes for grammars, match records and trees
//!
//! # Example
//!
//! ```rust
//! use metagram::{MetaGramBuilder, Outcome};
//!
//! let mut mg = MetaGramBuilder::new("2, 2, X Y X")
//!     .corpus("a b a\na b a\n")
//!     .build()
//!     .unwrap();
//! assert_eq!(mg.run().unwrap(), Outcome::Converged);
//! assert_eq!(mg.grammar().len(), 2);
//! ```

pub mod chart;
pub mod corpus;
pub mod derive;
pub mod export;
pub mod induction;
pub mod parser;
pub mod pattern;
pub mod rule;
pub mod subst;
pub mod symbol;

// Re-exports for convenience
pub use chart::{Candidate, MatchChart, MatchRecord, Ranking};
pub use corpus::{clean_line, grammar_from_corpus, load_corpus, tokenize};
pub use derive::DerivationNode;
pub use export::{MatchRecordDump, RuleRecord, SymbolRecord};
pub use induction::{
    InductionConfig, InductionError, InductionStats, MetaGram, MetaGramBuilder, Outcome,
};
pub use parser::{parse_program, PatternSyntaxError};
pub use pattern::{get_matchers, MatchResult, Pattern, PatternToken};
pub use rule::{Grammar, GrammarCoordinate, GrammarError, Rule, START_SYMBOL};
pub use subst::{Bindings, UnifyError};
pub use symbol::{IdAllocator, RuleId, Symbol, SymbolId};
