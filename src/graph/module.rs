//! Module graph as reported by the compiler service.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleGraph {
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub specifier: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Module {
    /// Absolute path of this module, if it is a local file.
    pub fn local_path(&self) -> Option<PathBuf> {
        file_specifier_to_path(&self.specifier)
    }
}

/// One import of a module. `code` is absent for type-only or unresolved imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifier: Option<String>,
}

impl Dependency {
    pub fn local(path: &std::path::Path) -> Self {
        Self {
            code: Url::from_file_path(path).ok().map(|url| CodeDependency {
                specifier: Some(url.to_string()),
            }),
        }
    }

    /// Absolute path of the imported file; `None` for remote or opaque imports.
    pub fn local_path(&self) -> Option<PathBuf> {
        let specifier = self.code.as_ref()?.specifier.as_deref()?;
        file_specifier_to_path(specifier)
    }
}

pub fn file_specifier_to_path(specifier: &str) -> Option<PathBuf> {
    if !specifier.starts_with("file://") {
        return None;
    }
    Url::parse(specifier).ok()?.to_file_path().ok()
}
