//! Deploy-time manifest reader.
//!
//! The manifest lives at `<internal_dir>/manifest.json`. A missing or
//! unreadable file contributes no declarations; a manifest with an unknown
//! `version` aborts the collection pass.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::declarations::types::Declaration;
use crate::error::DiscoveryError;

pub const DEPLOY_MANIFEST_FILE: &str = "manifest.json";
pub const SUPPORTED_MANIFEST_VERSION: u64 = 1;

/// Declarations and import map taken from the deploy manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployConfig {
    pub declarations: Vec<Declaration>,
    /// Absolute path of the manifest's import map, if it names one.
    pub import_map: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DeployManifest {
    #[serde(default)]
    functions: Vec<Declaration>,
    #[serde(default)]
    import_map: Option<String>,
}

/// Read the deploy manifest from `internal_dir`.
pub async fn read_deploy_config(internal_dir: &Path) -> Result<Option<DeployConfig>, DiscoveryError> {
    let manifest_path = internal_dir.join(DEPLOY_MANIFEST_FILE);
    let contents = match tokio::fs::read_to_string(&manifest_path).await {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %manifest_path.display(), error = %e, "Deploy manifest unreadable, ignoring");
            }
            return Ok(None);
        }
    };

    parse_deploy_config(&contents, internal_dir)
}

fn parse_deploy_config(contents: &str, internal_dir: &Path) -> Result<Option<DeployConfig>, DiscoveryError> {
    let value: serde_json::Value = match serde_json::from_str(contents) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Deploy manifest is not valid JSON, ignoring");
            return Ok(None);
        }
    };

    let version = value.get("version");
    if version.and_then(serde_json::Value::as_u64) != Some(SUPPORTED_MANIFEST_VERSION) {
        let found = version.map_or_else(|| "missing".to_string(), ToString::to_string);
        return Err(DiscoveryError::UnsupportedManifestVersion(found));
    }

    let manifest: DeployManifest = match serde_json::from_value(value) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(error = %e, "Deploy manifest has malformed declarations, ignoring");
            return Ok(None);
        }
    };

    Ok(Some(DeployConfig {
        declarations: manifest.functions,
        import_map: manifest.import_map.map(|rel| internal_dir.join(rel)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_deploy_config(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEPLOY_MANIFEST_FILE), "{ not json").unwrap();
        assert_eq!(read_deploy_config(dir.path()).await.unwrap(), None);
    }

    #[test]
    fn test_unsupported_version_is_fatal() {
        let err = parse_deploy_config(r#"{"version": 2, "functions": []}"#, Path::new("/i")).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnsupportedManifestVersion(v) if v == "2"));

        let err = parse_deploy_config(r#"{"functions": []}"#, Path::new("/i")).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnsupportedManifestVersion(v) if v == "missing"));
    }

    #[test]
    fn test_version_one_is_parsed() {
        let config = parse_deploy_config(
            r#"{"version": 1, "functions": [{"function": "geo", "path": "/*"}], "import_map": "map.json"}"#,
            Path::new("/i"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(config.declarations, vec![Declaration::for_path("geo", "/*")]);
        assert_eq!(config.import_map, Some(PathBuf::from("/i/map.json")));
    }
}
