//! Corpus loading.
//!
//! Each non-empty cleaned line becomes one start alternative whose RHS is the
//! line's tokens as terminals.

use crate::rule::Grammar;
use crate::symbol::Symbol;

/// Sentence punctuation that survives cleaning.
const KEPT_PUNCTUATION: &[char] = &['.', '!', '?'];

/// Strip every character that is not a word character, whitespace or
/// sentence punctuation.
pub fn clean_line(line: &str) -> String {
    line.chars()
        .filter(|&c| {
            c.is_alphanumeric() || c == '_' || c.is_whitespace() || KEPT_PUNCTUATION.contains(&c)
        })
        .collect()
}

/// Clean a line and split it into tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    clean_line(line)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Add one start rule per non-empty line. Returns the number of rules added.
pub fn load_corpus(text: &str, grammar: &mut Grammar) -> usize {
    let start = grammar.start_symbol().to_string();
    let mut added = 0;
    for (lineno, line) in text.lines().enumerate() {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            tracing::trace!(line = lineno + 1, "skipping empty corpus line");
            continue;
        }
        let rhs = tokens
            .into_iter()
            .map(|t| Symbol::terminal(t, grammar.ids_mut()))
            .collect();
        grammar.add_rule(start.as_str(), rhs);
        added += 1;
    }
    added
}

/// Build a fresh grammar from corpus text.
pub fn grammar_from_corpus(text: &str, start: &str) -> Grammar {
    let mut grammar = Grammar::with_start(start);
    load_corpus(text, &mut grammar);
    grammar
}
