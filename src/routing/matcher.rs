//! Route matching logic.
//!
//! # Responsibilities
//! - Match request paths against compiled patterns
//! - Match request methods against a route's method set
//! - Evaluate exclusion lists
//!
//! # Design Decisions
//! - Method matching is case-insensitive; an empty set matches any method
//! - Path matching is case-sensitive
//! - Patterns are compiled once, when the route table is built

use std::collections::BTreeSet;

use regex::Regex;

/// Predicate over a request path.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// A compiled path regular expression that remembers its source.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Matcher for PathPattern {
    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Matches when any of its patterns match. Empty never matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusions {
    patterns: Vec<PathPattern>,
}

impl Exclusions {
    /// Compile a list of pattern sources, reporting the first that fails.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self, (String, regex::Error)> {
        let patterns = sources
            .iter()
            .map(|s| PathPattern::new(s.as_ref()).map_err(|e| (s.as_ref().to_string(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Matcher for Exclusions {
    fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Set of allowed HTTP methods, stored uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    methods: BTreeSet<String>,
}

impl MethodSet {
    pub fn new<S: AsRef<str>>(methods: &[S]) -> Self {
        Self {
            methods: methods.iter().map(|m| m.as_ref().to_ascii_uppercase()).collect(),
        }
    }

    /// Returns true if the set is empty or contains `method`.
    pub fn allows(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.contains(&method.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_pattern() {
        let pattern = PathPattern::new("^/api/.*/?$").unwrap();
        assert!(pattern.matches("/api/users"));
        assert!(!pattern.matches("/API/users")); // Case sensitive
        assert!(!pattern.matches("/other"));
        assert_eq!(pattern.as_str(), "^/api/.*/?$");
    }

    #[test]
    fn test_exclusions() {
        assert!(!Exclusions::default().matches("/anything"));

        let exclusions = Exclusions::compile(&["^/api/public/.*$", "^/health$"]).unwrap();
        assert!(exclusions.matches("/api/public/x"));
        assert!(exclusions.matches("/health"));
        assert!(!exclusions.matches("/api/private"));

        let (source, _) = Exclusions::compile(&["("]).unwrap_err();
        assert_eq!(source, "(");
    }

    #[test]
    fn test_method_set() {
        let any = MethodSet::default();
        assert!(any.allows("GET"));
        assert!(any.allows("DELETE"));

        let post = MethodSet::new(&["post"]);
        assert!(post.allows("POST"));
        assert!(post.allows("post"));
        assert!(!post.allows("GET"));
    }
}
