//! Grammar symbols and identifier allocation.
//!
//! A [`Symbol`] is either a terminal (a literal corpus token) or a
//! non-terminal (a reference to a rule name). Symbols compare by value only:
//! terminal status and id never take part in equality, which is what lets the
//! matcher and the promotion scan compare a rule's RHS against plain token
//! values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Unique identifier for a symbol occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u64);

/// Unique identifier for a rule (one alternative of a non-terminal).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Prefix of every induced non-terminal name. Corpus cleaning strips this
/// character, so induced names never collide with corpus tokens.
pub const INDUCED_PREFIX: char = '$';

/// Hands out symbol ids, rule ids and induced rule names.
///
/// Owned by a [`Grammar`](crate::rule::Grammar); allocation is deterministic
/// for a given sequence of calls.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next_symbol: u64,
    next_rule: u64,
    next_name: usize,
}

impl IdAllocator {
    /// Create a new allocator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a fresh symbol id.
    pub fn fresh_symbol(&mut self) -> SymbolId {
        let id = SymbolId(self.next_symbol);
        self.next_symbol += 1;
        id
    }

    /// Get a fresh rule id.
    pub fn fresh_rule(&mut self) -> RuleId {
        let id = RuleId(self.next_rule);
        self.next_rule += 1;
        id
    }

    /// Mint the next induced non-terminal name: `$A0`, `$B0`, ... `$Z0`, `$A1`, ...
    pub fn fresh_name(&mut self) -> String {
        let n = self.next_name;
        self.next_name += 1;
        let letter = LETTERS[n % LETTERS.len()] as char;
        format!("{}{}{}", INDUCED_PREFIX, letter, n / LETTERS.len())
    }

    /// Make sure future ids are strictly greater than the given ones.
    pub fn reserve(&mut self, symbol: Option<SymbolId>, rule: Option<RuleId>) {
        if let Some(SymbolId(s)) = symbol {
            self.next_symbol = self.next_symbol.max(s + 1);
        }
        if let Some(RuleId(r)) = rule {
            self.next_rule = self.next_rule.max(r + 1);
        }
    }

    /// Make sure future induced names do not repeat `name`.
    pub fn reserve_name(&mut self, name: &str) {
        let Some(rest) = name.strip_prefix(INDUCED_PREFIX) else {
            return;
        };
        let mut chars = rest.chars();
        let Some(letter) = chars.next() else {
            return;
        };
        let Some(pos) = LETTERS.iter().position(|&l| l as char == letter) else {
            return;
        };
        if let Ok(round) = chars.as_str().parse::<usize>() {
            let n = round * LETTERS.len() + pos;
            self.next_name = self.next_name.max(n + 1);
        }
    }

    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A terminal or non-terminal grammar symbol.
#[derive(Clone, Debug)]
pub struct Symbol {
    value: Rc<str>,
    is_terminal: bool,
    id: SymbolId,
}

impl Symbol {
    /// Create a symbol with an explicit id.
    pub fn new(value: impl Into<Rc<str>>, is_terminal: bool, id: SymbolId) -> Self {
        Symbol {
            value: value.into(),
            is_terminal,
            id,
        }
    }

    /// Create a terminal symbol with a fresh id.
    pub fn terminal(value: impl Into<Rc<str>>, ids: &mut IdAllocator) -> Self {
        Symbol::new(value, true, ids.fresh_symbol())
    }

    /// Create a non-terminal symbol with a fresh id.
    pub fn non_terminal(value: impl Into<Rc<str>>, ids: &mut IdAllocator) -> Self {
        Symbol::new(value, false, ids.fresh_symbol())
    }

    /// Copy this symbol under a fresh id, keeping value and terminal status.
    pub fn fresh(&self, ids: &mut IdAllocator) -> Symbol {
        Symbol {
            value: self.value.clone(),
            is_terminal: self.is_terminal,
            id: ids.fresh_symbol(),
        }
    }

    /// Get the symbol value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Check if this is a terminal.
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// Get the symbol id.
    pub fn id(&self) -> SymbolId {
        self.id
    }

    /// Same value and terminal status, pointing at a different name.
    pub(crate) fn renamed(&self, value: &str) -> Symbol {
        Symbol {
            value: value.into(),
            is_terminal: self.is_terminal,
            id: self.id,
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminal {
            write!(f, "{}", self.value)
        } else {
            write!(f, "<{}>", self.value)
        }
    }
}
