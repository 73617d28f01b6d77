//! Variable bindings for sequence unification.
//!
//! A [`Bindings`] maps pattern variables to token values and keeps the reverse
//! map so that two distinct variables can never bind the same value.

use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;

/// Reasons a binding attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnifyError {
    #[error("variable is already bound to a different value")]
    Conflict,
    #[error("value is already bound to a different variable")]
    Collision,
}

/// Bindings from variable names to values, valid for one match attempt.
#[derive(Clone, Debug, Default)]
pub struct Bindings<'a> {
    by_var: FxHashMap<&'a str, &'a str>,
    by_value: FxHashMap<&'a str, &'a str>,
}

impl<'a> Bindings<'a> {
    /// Create empty bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value bound to a variable, if any.
    pub fn get(&self, var: &str) -> Option<&'a str> {
        self.by_var.get(var).copied()
    }

    /// Check if a variable is bound.
    pub fn is_bound(&self, var: &str) -> bool {
        self.by_var.contains_key(var)
    }

    /// Unify `var` with `value`.
    ///
    /// A bound variable must see its own value again; an unbound variable may
    /// not take a value that another variable already holds.
    pub fn unify(&mut self, var: &'a str, value: &'a str) -> Result<(), UnifyError> {
        if let Some(bound) = self.by_var.get(var) {
            return if *bound == value {
                Ok(())
            } else {
                Err(UnifyError::Conflict)
            };
        }
        if self.by_value.contains_key(value) {
            return Err(UnifyError::Collision);
        }
        self.by_var.insert(var, value);
        self.by_value.insert(value, var);
        Ok(())
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.by_var.len()
    }

    /// Check if no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.by_var.is_empty()
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.by_var.clear();
        self.by_value.clear();
    }

    /// Iterate over (variable, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.by_var.iter().map(|(k, v)| (*k, *v))
    }
}

impl fmt::Display for Bindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort();
        write!(f, "{{")?;
        for (i, (var, value)) in pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", var, value)?;
        }
        write!(f, "}}")
    }
}
