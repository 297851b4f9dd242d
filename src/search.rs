//! Filename matching for the pane filter.
//!
//! A query is a comma separated list of terms joined with OR. In regex mode
//! every term is compiled case-insensitively; a term that does not compile
//! is matched as a case-insensitive substring instead. Outside regex mode a
//! term must equal the name exactly, case included.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
enum Term {
    Pattern(Regex),
    Substring(String),
    Exact(String),
}

impl Term {
    fn matches(&self, name: &str) -> bool {
        match self {
            Term::Pattern(re) => re.is_match(name),
            Term::Substring(needle) => name.to_lowercase().contains(needle),
            Term::Exact(expected) => name == expected,
        }
    }
}

/// A query compiled once and reused for every row of a pane.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    terms: Vec<Term>,
}

impl SearchQuery {
    pub fn parse(query: &str, regex_mode: bool) -> Self {
        let terms = query
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| compile_term(term, regex_mode))
            .collect();
        Self { terms }
    }

    /// True when the query has no usable term and therefore matches everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.is_empty() || self.terms.iter().any(|term| term.matches(name))
    }
}

fn compile_term(term: &str, regex_mode: bool) -> Term {
    if !regex_mode {
        return Term::Exact(term.to_string());
    }
    match RegexBuilder::new(term).case_insensitive(true).build() {
        Ok(re) => Term::Pattern(re),
        Err(err) => {
            tracing::debug!(term, %err, "invalid search pattern, using substring match");
            Term::Substring(term.to_lowercase())
        }
    }
}

pub fn matches(name: &str, query: &str, regex_mode: bool) -> bool {
    SearchQuery::parse(query, regex_mode).matches(name)
}
