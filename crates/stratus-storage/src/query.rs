//! Tag query expressions.
//!
//! The grammar is small and whitespace-sensitive:
//!
//! ```text
//! @container = '<container>' AND <tag> <op> '<value>'
//! ```
//!
//! where `<tag>` is either `"quoted"` or a bare name, `<op>` is one of
//! `=`, `<`, `<=`, `>`, `>=`, and the two clauses may come in either order.
//! Comparisons are on the stored string values, so `"50" >= "150"` holds:
//! epoch-second timestamps of equal width compare as expected, mixed
//! widths do not.

use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::types::Tags;

/// Comparison applied between a stored tag value and the query literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    /// Inclusive: a value equal to the literal matches.
    Le,
    Gt,
    /// Inclusive, like `Le`.
    Ge,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    /// Lexicographic comparison of `stored` against `literal`.
    pub fn apply(self, stored: &str, literal: &str) -> bool {
        match self {
            Comparison::Eq => stored == literal,
            Comparison::Lt => stored < literal,
            Comparison::Le => stored <= literal,
            Comparison::Gt => stored > literal,
            Comparison::Ge => stored >= literal,
        }
    }
}

// Padded with the single spaces the grammar requires around operators.
const OPERATORS: [(&str, Comparison); 5] = [
    (" <= ", Comparison::Le),
    (" >= ", Comparison::Ge),
    (" < ", Comparison::Lt),
    (" > ", Comparison::Gt),
    (" = ", Comparison::Eq),
];

const CONTAINER_KEY: &str = "@container";

/// A parsed query: one container and one tag comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    pub container: String,
    pub tag: String,
    pub comparison: Comparison,
    pub value: String,
}

impl TagQuery {
    pub fn parse(expression: &str) -> Result<Self, QueryError> {
        let mut container = None;
        let mut tag = None;

        for clause in expression.trim().split(" AND ") {
            let (key, comparison, raw) = split_clause(clause)?;
            let value = unquote(raw)?;
            if key == CONTAINER_KEY {
                if comparison != Comparison::Eq {
                    return Err(QueryError::ContainerOperator);
                }
                if container.replace(value).is_some() {
                    return Err(QueryError::DuplicateClause(CONTAINER_KEY));
                }
            } else if tag.replace((tag_name(key)?, comparison, value)).is_some() {
                return Err(QueryError::DuplicateClause("tag"));
            }
        }

        let container = container.ok_or(QueryError::MissingContainer)?;
        let (tag, comparison, value) = tag.ok_or(QueryError::MissingTag)?;
        Ok(Self {
            container,
            tag,
            comparison,
            value,
        })
    }

    /// True if `tags` holds the queried key and its value satisfies the comparison.
    pub fn matches(&self, tags: &Tags) -> bool {
        tags.get(&self.tag)
            .is_some_and(|stored| self.comparison.apply(stored, &self.value))
    }
}

impl FromStr for TagQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CONTAINER_KEY} = '{}' AND \"{}\" {} '{}'",
            self.container,
            self.tag,
            self.comparison.symbol(),
            self.value
        )
    }
}

/// Split a clause at its leftmost operator.
fn split_clause(clause: &str) -> Result<(&str, Comparison, &str), QueryError> {
    OPERATORS
        .iter()
        .filter_map(|(symbol, cmp)| clause.find(symbol).map(|pos| (pos, *symbol, *cmp)))
        .min_by_key(|(pos, _, _)| *pos)
        .map(|(pos, symbol, cmp)| (&clause[..pos], cmp, &clause[pos + symbol.len()..]))
        .ok_or_else(|| QueryError::MalformedClause(clause.to_string()))
}

fn unquote(raw: &str) -> Result<String, QueryError> {
    raw.strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map(str::to_string)
        .ok_or_else(|| QueryError::UnquotedValue(raw.to_string()))
}

fn tag_name(key: &str) -> Result<String, QueryError> {
    let name = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .unwrap_or(key);
    if name.is_empty() || name.contains(['"', '\'', ' ']) {
        return Err(QueryError::InvalidTagName(key.to_string()));
    }
    Ok(name.to_string())
}
