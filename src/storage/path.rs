//! Traversal-safe path resolution

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path escapes the upload directory: {0}")]
    Traversal(String),
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PathError {
    /// True when the target (or the root) simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Resolve { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Join a URL path onto `root` without ever leaving it.
///
/// The request path is cleaned lexically: empty and `.` segments are dropped
/// and `..` removes the previous segment. A `..` that would climb above
/// `root`, or a segment carrying a backslash or NUL, is refused instead of
/// being clamped.
pub fn safe_join(root: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Traversal(request_path.to_string()));
                }
            }
            s if s.contains(['\\', '\0']) => {
                return Err(PathError::Traversal(request_path.to_string()));
            }
            s => segments.push(s),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

/// Follow symlinks on `candidate` and confirm it is still under `root`.
///
/// Returns the canonical path on success.
pub async fn ensure_within(root: &Path, candidate: &Path) -> Result<PathBuf, PathError> {
    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|source| PathError::Resolve {
            path: root.to_path_buf(),
            source,
        })?;
    let canonical = tokio::fs::canonicalize(candidate)
        .await
        .map_err(|source| PathError::Resolve {
            path: candidate.to_path_buf(),
            source,
        })?;

    if canonical.starts_with(&canonical_root) {
        Ok(canonical)
    } else {
        Err(PathError::Traversal(candidate.display().to_string()))
    }
}
