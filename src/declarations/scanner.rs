//! Directory scanning for handler source files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::declarations::types::HandlerSource;
use crate::error::DiscoveryError;

/// File extensions recognised as handler entry points.
pub const HANDLER_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts"];

/// Lists candidate handler source files.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Discover handlers inside `directories`. Pure discovery, no compilation.
    async fn find(&self, directories: &[PathBuf]) -> Result<Vec<HandlerSource>, DiscoveryError>;
}

/// Scans directories on the local filesystem.
///
/// A direct child file with a handler extension is a handler named after its
/// stem. A child directory is a handler named after the directory when it
/// contains `index.<ext>` or `<dir>.<ext>`.
#[derive(Debug, Clone, Default)]
pub struct FsScanner;

#[async_trait]
impl Scanner for FsScanner {
    async fn find(&self, directories: &[PathBuf]) -> Result<Vec<HandlerSource>, DiscoveryError> {
        let mut handlers = Vec::new();
        for dir in directories {
            let mut found = scan_directory(dir).await?;
            found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
            handlers.extend(found);
        }
        Ok(handlers)
    }
}

async fn scan_directory(dir: &Path) -> Result<Vec<HandlerSource>, DiscoveryError> {
    let scan_err = |source| DiscoveryError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(scan_err(e)),
    };

    let mut handlers = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(scan_err)?;

        if file_type.is_file() {
            if has_handler_extension(&path) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    handlers.push(HandlerSource::new(stem, path.clone()));
                }
            }
        } else if file_type.is_dir() {
            if let Some(source) = directory_entry_point(&path).await {
                handlers.push(source);
            }
        }
    }

    Ok(handlers)
}

async fn directory_entry_point(dir: &Path) -> Option<HandlerSource> {
    let name = dir.file_name()?.to_str()?;
    for stem in ["index", name] {
        for ext in HANDLER_EXTENSIONS {
            let candidate = dir.join(format!("{stem}.{ext}"));
            if tokio::fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return Some(HandlerSource::new(name, candidate));
            }
        }
    }
    None
}

fn has_handler_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HANDLER_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_finds_files_and_directory_handlers() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("edge-functions");
        fs::create_dir_all(dir.join("geo")).unwrap();
        fs::create_dir_all(dir.join("empty")).unwrap();
        fs::write(dir.join("auth.ts"), "").unwrap();
        fs::write(dir.join("README.md"), "").unwrap();
        fs::write(dir.join("geo").join("index.js"), "").unwrap();

        let found = FsScanner.find(&[dir.clone()]).await.unwrap();
        assert_eq!(
            found,
            vec![
                HandlerSource::new("auth", dir.join("auth.ts")),
                HandlerSource::new("geo", dir.join("geo").join("index.js")),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let found = FsScanner.find(&[root.path().join("nope")]).await.unwrap();
        assert!(found.is_empty());
    }
}
