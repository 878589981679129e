//! Local file and bundled asset resolution for `loadFile`.
//!
//! Absolute paths are loaded as-is. Relative paths name bundled assets and
//! are joined onto the configured asset root.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Field named in resolution errors.
const FIELD: &str = "path";

// ============================================================================
// AssetResolver
// ============================================================================

/// Turns `loadFile` paths into `file://` URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetResolver {
    root: Option<PathBuf>,
}

impl AssetResolver {
    /// Creates a resolver without an asset root.
    ///
    /// Only absolute paths resolve.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver for assets under `root`.
    #[inline]
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Returns the asset root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolves a path to a `file://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for field `path` if the path is
    /// relative without an asset root, leaves the asset root, or does not
    /// exist.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let requested = Path::new(path);

        let full = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            let Some(root) = &self.root else {
                return Err(Error::invalid_argument(
                    FIELD,
                    format!("relative path `{path}` but no asset root is configured"),
                ));
            };
            if requested
                .components()
                .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(Error::invalid_argument(
                    FIELD,
                    format!("`{path}` escapes the asset root"),
                ));
            }
            root.join(requested)
        };

        if !full.exists() {
            return Err(Error::invalid_argument(
                FIELD,
                format!("no such file: {}", full.display()),
            ));
        }

        let url = Url::from_file_path(&full).map_err(|()| {
            Error::invalid_argument(FIELD, format!("not a file path: {}", full.display()))
        })?;

        debug!(path, url = %url, "Resolved asset");
        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn asset_dir() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("www")).expect("mkdir");
        fs::write(dir.path().join("www/index.html"), "<h1>hi</h1>").expect("write");
        dir
    }

    #[test]
    fn test_relative_path_joins_root() {
        let dir = asset_dir();
        let resolver = AssetResolver::with_root(dir.path());

        let url = resolver.resolve("www/index.html").expect("resolve");
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/www/index.html"));
    }

    #[test]
    fn test_absolute_path_used_as_is() {
        let dir = asset_dir();
        let absolute = dir.path().join("www/index.html");
        let url = AssetResolver::new()
            .resolve(absolute.to_str().expect("utf-8 path"))
            .expect("resolve");
        assert_eq!(url.to_file_path().expect("file url"), absolute);
    }

    #[test]
    fn test_missing_file_is_invalid_path() {
        let dir = asset_dir();
        let err = AssetResolver::with_root(dir.path())
            .resolve("www/missing.html")
            .unwrap_err();
        assert_eq!(err.field(), Some("path"));
    }

    #[test]
    fn test_relative_without_root() {
        let err = AssetResolver::new().resolve("index.html").unwrap_err();
        assert_eq!(err.field(), Some("path"));
    }

    #[test]
    fn test_parent_dir_rejected() {
        let dir = asset_dir();
        let err = AssetResolver::with_root(dir.path().join("www"))
            .resolve("../www/index.html")
            .unwrap_err();
        assert_eq!(err.field(), Some("path"));
    }
}
