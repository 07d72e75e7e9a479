//! Route templates.
//!
//! A template such as `items/{id:int}/{action?}` is compiled into one or
//! two concrete [`RoutePattern`]s under the API prefix. A trailing
//! optional placeholder or catch-all (`{*route}`) produces the pattern
//! without the tail first, then the pattern with it, so both forms reach
//! the same function. Type constraints (`:int`, `:string`) are accepted
//! and ignored. A pattern renders as an axum path such as
//! `/api/items/{id}` or `/api/files/{*route}`.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ManifestError, ManifestResult};

/// Captured placeholder values, by name.
pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    /// Matches one or more remaining segments.
    CatchAll(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    required: Vec<Segment>,
    tail: Option<Segment>,
}

impl RouteTemplate {
    pub fn parse(route: &str) -> ManifestResult<Self> {
        let invalid = |reason| ManifestError::InvalidRoute {
            route: route.to_string(),
            reason,
        };

        let trimmed = route.trim_matches('/');
        let raw: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut required = Vec::with_capacity(raw.len());
        let mut tail = None;
        for (i, part) in raw.iter().enumerate() {
            let last = i + 1 == raw.len();
            let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
                if part.contains(['{', '}']) {
                    return Err(invalid("placeholders must span a whole segment"));
                }
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                required.push(Segment::Literal((*part).to_string()));
                continue;
            };

            if let Some(name) = inner.strip_prefix('*') {
                let name = name.split(':').next().unwrap_or_default();
                if name.is_empty() {
                    return Err(invalid("empty parameter name"));
                }
                if !last {
                    return Err(invalid("catch-all must be the last segment"));
                }
                tail = Some(Segment::CatchAll(name.to_string()));
                continue;
            }

            let optional = inner.ends_with('?');
            let inner = inner.trim_end_matches('?');
            let name = inner.split(':').next().unwrap_or_default().trim_end_matches('?');
            if name.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            if optional {
                if !last {
                    return Err(invalid("optional parameter must be the last segment"));
                }
                tail = Some(Segment::Param(name.to_string()));
            } else {
                required.push(Segment::Param(name.to_string()));
            }
        }

        Ok(Self {
            source: route.to_string(),
            required,
            tail,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Concrete patterns under `prefix`, shortest first.
    pub fn compile(&self, prefix: &str) -> Vec<RoutePattern> {
        let mut base: Vec<Segment> = prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| Segment::Literal(s.to_string()))
            .collect();
        base.extend(self.required.iter().cloned());

        let mut patterns = vec![RoutePattern {
            segments: base.clone(),
        }];
        if let Some(tail) = &self.tail {
            base.push(tail.clone());
            patterns.push(RoutePattern { segments: base });
        }
        patterns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Whether both patterns claim the same requests under different
    /// spellings, so they cannot be mounted side by side. Placeholder names
    /// do not distinguish routes, and a placeholder overlaps a catch-all at
    /// the same depth. Identical patterns do not collide; they share a path.
    pub fn collides_with(&self, other: &RoutePattern) -> bool {
        if self == other {
            return false;
        }
        for (ours, theirs) in self.segments.iter().zip(&other.segments) {
            match (ours, theirs) {
                (Segment::Literal(a), Segment::Literal(b)) if a == b => {}
                (Segment::Param(_), Segment::Param(_)) => {}
                (Segment::Param(_) | Segment::CatchAll(_), Segment::Param(_) | Segment::CatchAll(_)) => {
                    return true;
                }
                _ => return false,
            }
        }
        self.segments.len() == other.segments.len()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => write!(f, "/{lit}")?,
                Segment::Param(name) => write!(f, "/{{{name}}}")?,
                Segment::CatchAll(name) => write!(f, "/{{*{name}}}")?,
            }
        }
        Ok(())
    }
}
