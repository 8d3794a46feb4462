//! Trait predicates: a small, side-effect-free expression language.
//!
//! A predicate is source text such as
//! `(cast) => cast.text?.toLowerCase().includes('gm')`. It is compiled once
//! into a [`Predicate`] and evaluated against the sanitized view of each
//! item. Nothing in the language can reach the host: there are no
//! assignments, loops, or calls outside a fixed builtin table, and both
//! source length and nesting depth are capped.
//!
//! Failure is contained at two levels:
//!
//! - A predicate that fails to compile is still a [`Predicate`]; it matches
//!   nothing and reports its error through [`Predicate::compile_error`].
//! - A runtime fault while evaluating one item makes that item not match.
//!   Other items and other predicates are unaffected.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;

use crate::clock::DEFAULT_TIMEZONE;
use crate::sanitize::SanitizedItem;

pub use ast::Program;
pub use eval::EvalError;
pub use value::Value;

/// Largest accepted predicate source, in bytes.
pub const MAX_SOURCE_BYTES: usize = 16 * 1024;

/// Deepest accepted expression nesting.
pub const MAX_DEPTH: usize = 64;

/// Why a predicate failed to compile.
#[derive(Debug, Clone, Error)]
pub enum PredicateError {
    #[error("predicate is empty")]
    Empty,

    #[error("predicate is {len} bytes, limit is {limit}")]
    TooLong { len: usize, limit: usize },

    #[error("syntax error at {pos}: {message}")]
    Lex { pos: usize, message: String },

    #[error("syntax error at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("invalid regex /{pattern}/: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported regex flag '{0}'")]
    RegexFlag(char),
}

/// A compiled predicate, or the record of a failed compilation.
#[derive(Debug)]
pub struct Predicate {
    program: Result<Program, PredicateError>,
    tz: Tz,
}

impl Predicate {
    /// Compile `source` without caching.
    #[must_use]
    pub fn compile(source: &str, tz: Tz) -> Self {
        Self {
            program: parser::parse(source),
            tz,
        }
    }

    #[must_use]
    pub const fn compile_error(&self) -> Option<&PredicateError> {
        match &self.program {
            Ok(_) => None,
            Err(e) => Some(e),
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.program.is_ok()
    }

    /// Evaluate against an item view and report faults.
    ///
    /// A predicate that failed to compile evaluates to `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the runtime fault raised by the program, if any.
    pub fn evaluate(&self, view: &Value) -> Result<bool, EvalError> {
        match &self.program {
            Ok(program) => eval::evaluate(program, view.clone(), self.tz).map(|v| v.truthy()),
            Err(_) => Ok(false),
        }
    }

    /// Truthiness of the program on `view`, with any fault mapped to `false`.
    #[must_use]
    pub fn matches(&self, view: &Value) -> bool {
        self.evaluate(view).unwrap_or_else(|e| {
            tracing::trace!("predicate fault treated as no match: {e}");
            false
        })
    }

    #[must_use]
    pub fn matches_item(&self, item: &SanitizedItem) -> bool {
        self.matches(&Value::from(item))
    }
}

/// Compiles predicates and memoizes them by exact source text.
///
/// Repeated compilation of the same source returns the same
/// `Arc<Predicate>`, whether compilation succeeded or not.
#[derive(Debug)]
pub struct PredicateCompiler {
    cache: HashMap<String, Arc<Predicate>>,
    tz: Tz,
}

impl Default for PredicateCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl PredicateCompiler {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self {
            cache: HashMap::new(),
            tz,
        }
    }

    /// Compile `source`, reusing a cached result for identical text.
    pub fn compile(&mut self, source: &str) -> Arc<Predicate> {
        if let Some(hit) = self.cache.get(source) {
            return Arc::clone(hit);
        }
        let predicate = Arc::new(Predicate::compile(source, self.tz));
        if let Some(err) = predicate.compile_error() {
            tracing::debug!("predicate failed to compile: {err}");
        }
        self.cache
            .insert(source.to_string(), Arc::clone(&predicate));
        predicate
    }

    /// Number of distinct sources compiled so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }
}
