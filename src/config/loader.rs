//! Configuration loading from disk.

use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProjectConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load the configuration, or defaults when the file does not exist.
pub fn load_config_or_default(path: &Path) -> Result<ProjectConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No configuration file, using defaults");
            Ok(ProjectConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn parse_config(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[edge_functions]]\nfunction = \"a\"\npath = \"/a\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.edge_functions.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.toml");

        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
        assert_eq!(load_config_or_default(&path).unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("edge_functions = 3"), Err(ConfigError::Parse(_))));

        let err = parse_config("[dev]\ndebounce_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(err.to_string(), "Validation failed: dev.debounce_ms: must be greater than 0");
    }
}
