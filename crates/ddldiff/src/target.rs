//! Target expressions: which schemas and tables replicate to a target.
//!
//! An expression is a comma-separated list of `schema.table` patterns where
//! `*` matches any run of characters:
//!
//! ```text
//! public.*, billing.invoices, audit_*
//! ```
//!
//! A pattern without a dot selects the schema and every table in it. The
//! empty expression selects nothing.

use crate::error::{Error, Result};
use regex::{escape, Regex};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone)]
struct Pattern {
    schema: Regex,
    table: Option<Regex>,
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self> {
        let (schema, table) = match pattern.split_once('.') {
            Some((schema, table)) => (schema.trim(), Some(table.trim())),
            None => (pattern, None),
        };
        Ok(Self {
            schema: glob_to_regex(schema)?,
            table: table.map(glob_to_regex).transpose()?,
        })
    }

    fn matches(&self, schema: &str, table: Option<&str>) -> bool {
        if !self.schema.is_match(schema) {
            return false;
        }
        match (&self.table, table) {
            (Some(pattern), Some(table)) => pattern.is_match(table),
            _ => true,
        }
    }
}

/// Anchored regex for a `*` glob.
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut buf = String::with_capacity(glob.len() + 2);
    buf.push('^');
    for (i, part) in glob.split('*').enumerate() {
        if i > 0 {
            buf.push_str(".*");
        }
        buf.push_str(&escape(part));
    }
    buf.push('$');
    Regex::new(&buf).map_err(Error::from)
}

/// Compiled predicate over `(schema, table)` names.
#[derive(Debug, Clone)]
pub struct TargetExpression {
    source: String,
    patterns: Vec<Pattern>,
}

impl TargetExpression {
    pub fn new(expression: &str) -> Result<Self> {
        let patterns = expression
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Pattern::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source: expression.to_string(),
            patterns,
        })
    }

    /// Whether `schema` (and `table`, when given) is selected.
    ///
    /// Without a table only the schema part of each pattern is tested, so
    /// schema-level objects reach every target that replicates any table of
    /// that schema.
    pub fn matches(&self, schema: &str, table: Option<&str>) -> bool {
        self.patterns.iter().any(|p| p.matches(schema, table))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for TargetExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for TargetExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
