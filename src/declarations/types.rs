//! Declaration and handler types shared by every declaration source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// A handler discovered on disk.
///
/// Identity is the `(name, path)` pair; `is_internal` only records which
/// directory set the handler came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerSource {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub is_internal: bool,
}

impl HandlerSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_internal: false,
        }
    }

    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }

    pub fn identity(&self) -> (&str, &Path) {
        (&self.name, &self.path)
    }
}

/// Cache position of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Runs before the response cache.
    #[default]
    #[serde(alias = "off")]
    Pre,
    /// Runs after the response cache.
    #[serde(alias = "manual")]
    Post,
}

/// A statement that a handler should run for some path and method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Name of the handler this declaration routes to.
    pub function: String,

    /// Display name used in developer-facing messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// URL path glob, e.g. `/api/*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Raw regular expression, used instead of `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(
        default,
        alias = "excludedPath",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub excluded_path: Vec<String>,

    #[serde(
        default,
        alias = "excludedPattern",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub excluded_pattern: Vec<String>,

    /// HTTP methods; empty means any method.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub method: Vec<String>,

    #[serde(default)]
    pub cache: CacheMode,
}

impl Declaration {
    /// Create a path declaration with no other constraints.
    pub fn for_path(function: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            name: None,
            path: Some(path.into()),
            pattern: None,
            excluded_path: Vec::new(),
            excluded_pattern: Vec::new(),
            method: Vec::new(),
            cache: CacheMode::Pre,
        }
    }
}

/// Configuration a handler exports from its own source file.
///
/// Unknown keys are kept in `extra` so that common typos can be reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,

    #[serde(
        default,
        alias = "excludedPath",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub excluded_path: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub method: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMode>,

    #[serde(default, alias = "onError", skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FunctionConfig {
    /// True when the config used the plural `paths` key instead of `path`.
    pub fn has_paths_typo(&self) -> bool {
        self.extra.contains_key("paths")
    }
}

/// Where a declaration came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationSource {
    /// Project configuration file.
    Static(Declaration),
    /// Deploy-time manifest written into the internal directory.
    DeployTime(Declaration),
    /// Configuration exported by the handler source itself.
    InSource {
        function: String,
        config: FunctionConfig,
        internal: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}
