//! Media fetcher over a local directory using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::MediaFetcher,
};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Serves media keys as paths relative to a root directory.
///
/// Keys are `/`-separated. Absolute keys and keys containing `..` are
/// rejected so a catalog cannot read outside the root.
#[derive(Debug, Clone)]
pub struct TokioFileFetcher {
    root: PathBuf,
}

impl TokioFileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path on disk for `key`.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches("./"));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(BridgeError::PermissionDenied(format!(
                        "media key escapes the media root: {}",
                        key
                    )));
                }
            }
        }
        if path == self.root {
            return Err(BridgeError::NotFound(key.to_string()));
        }
        Ok(path)
    }

    fn map_io_error(key: &str, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(key.to_string())
        } else {
            BridgeError::Io(e)
        }
    }
}

#[async_trait]
impl MediaFetcher for TokioFileFetcher {
    async fn fetch(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve(key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| Self::map_io_error(key, e))?;
        debug!(path = ?path, size = data.len(), "Read media file");
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_files_under_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/C.wav"), b"RIFF").unwrap();

        let fetcher = TokioFileFetcher::new(dir.path());
        let bytes = fetcher.fetch("sounds/C.wav").await.unwrap();
        assert_eq!(bytes.as_ref(), b"RIFF");

        let dotted = fetcher.fetch("./sounds/C.wav").await.unwrap();
        assert_eq!(dotted, bytes);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fetcher = TokioFileFetcher::new(dir.path());
        let err = fetcher.fetch("nope.mp3").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[test]
    fn traversal_is_rejected() {
        let fetcher = TokioFileFetcher::new("/srv/media");
        assert!(matches!(
            fetcher.resolve("../etc/passwd"),
            Err(BridgeError::PermissionDenied(_))
        ));
        assert!(matches!(
            fetcher.resolve("sounds/../../secret"),
            Err(BridgeError::PermissionDenied(_))
        ));
        assert!(matches!(
            fetcher.resolve("/etc/passwd"),
            Err(BridgeError::PermissionDenied(_))
        ));
        assert!(fetcher.resolve("").is_err());
    }
}
