//! Process environment snapshot and binding-expression expansion.
//!
//! Binding templates (queue names, output blob paths) may reference
//! environment variables in two ways:
//!
//! - `%NAME%` anywhere in the string,
//! - a bare `NAME` forming a whole `/`-separated segment.
//!
//! Unknown names are left untouched.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Expand `%NAME%` tokens, then bare-name segments.
    pub fn expand(&self, template: &str) -> String {
        let percent = self.expand_percent(template);
        percent
            .split('/')
            .map(|segment| self.get(segment).unwrap_or(segment))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn expand_percent(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) => {
                    let name = &after[..end];
                    match self.get(name) {
                        Some(value) if !name.is_empty() => {
                            out.push_str(value);
                            rest = &after[end + 1..];
                        }
                        _ => {
                            // Keep the opening '%' and retry from the closing one.
                            out.push('%');
                            out.push_str(name);
                            rest = &after[end..];
                        }
                    }
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
