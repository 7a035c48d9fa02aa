//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check declarations are routable (function, path or pattern)
//! - Validate value ranges (debounce > 0, compiler command present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProjectConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use regex::Regex;

use crate::config::schema::ProjectConfig;

const HTTP_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH"];

/// A single semantic problem, located by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProjectConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, decl) in config.edge_functions.iter().enumerate() {
        let field = |name: &str| format!("edge_functions[{i}].{name}");

        if decl.function.trim().is_empty() {
            errors.push(ValidationError::new(field("function"), "must name a function"));
        }

        match (&decl.path, &decl.pattern) {
            (None, None) => errors.push(ValidationError::new(field("path"), "either path or pattern is required")),
            (Some(path), _) if !path.starts_with('/') => {
                errors.push(ValidationError::new(field("path"), format!("{path:?} must start with '/'")))
            }
            _ => {}
        }

        for pattern in decl.pattern.iter().chain(decl.excluded_pattern.iter()) {
            if let Err(e) = Regex::new(pattern) {
                errors.push(ValidationError::new(field("pattern"), format!("{pattern:?} is not a valid regex: {e}")));
            }
        }

        for path in &decl.excluded_path {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(field("excluded_path"), format!("{path:?} must start with '/'")));
            }
        }

        for method in &decl.method {
            if !HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                errors.push(ValidationError::new(field("method"), format!("unknown HTTP method {method:?}")));
            }
        }
    }

    if config.dev.debounce_ms == 0 {
        errors.push(ValidationError::new("dev.debounce_ms", "must be greater than 0"));
    }
    if config.dev.compiler.is_empty() {
        errors.push(ValidationError::new("dev.compiler", "command must not be empty"));
    }
    if config.dev.compiler_timeout_secs == 0 {
        errors.push(ValidationError::new("dev.compiler_timeout_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::Declaration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProjectConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProjectConfig::default();
        let mut no_route = Declaration::for_path("", "/x");
        no_route.path = None;
        let mut bad_method = Declaration::for_path("a", "relative");
        bad_method.method = vec!["FETCH".into()];
        config.edge_functions = vec![no_route, bad_method];
        config.dev.debounce_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(
            fields,
            vec![
                "edge_functions[0].function",
                "edge_functions[0].path",
                "edge_functions[1].path",
                "edge_functions[1].method",
                "dev.debounce_ms",
            ]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let mut config = ProjectConfig::default();
        let mut decl = Declaration::for_path("a", "/x");
        decl.path = None;
        decl.pattern = Some("(".into());
        config.edge_functions = vec![decl];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "edge_functions[0].pattern");
    }
}
