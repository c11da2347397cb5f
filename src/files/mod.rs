//! Project file access
//!
//! Reads files for remote agents from under the projects directory. Every
//! request is confined to that directory after symlinks are resolved.

pub mod mime;

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub use mime::{content_type_for, is_text};

/// Why a file could not be served
#[derive(Error, Debug)]
pub enum FileError {
    /// Neither `path` nor `relativePath` was supplied
    #[error("Either path or relativePath query parameter is required")]
    MissingPath,

    /// Relative path is absolute or climbs out of the base
    #[error("Invalid path: must be relative and cannot traverse upward")]
    InvalidRelativePath,

    /// Nothing exists at the requested path
    #[error("File not found")]
    NotFound,

    /// Resolved path is outside the projects directory, or could not be resolved
    #[error("Access denied")]
    AccessDenied,

    /// Requested path is a directory
    #[error("Path is a directory, not a file")]
    IsDirectory(PathBuf),

    /// Reading the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which file the caller asked for
#[derive(Debug, Clone, Copy)]
pub enum FileRequest<'a> {
    /// Absolute path, still required to be under the base
    Absolute(&'a str),
    /// Path relative to the base
    Relative(&'a str),
}

impl<'a> FileRequest<'a> {
    /// `path` wins over `relativePath`; empty values count as missing
    pub fn from_query(path: Option<&'a str>, relative_path: Option<&'a str>) -> Result<Self, FileError> {
        match (path.filter(|p| !p.is_empty()), relative_path.filter(|p| !p.is_empty())) {
            (Some(path), _) => Ok(FileRequest::Absolute(path)),
            (None, Some(relative)) => Ok(FileRequest::Relative(relative)),
            (None, None) => Err(FileError::MissingPath),
        }
    }
}

/// A file read from the projects directory
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Resolved path
    pub path: PathBuf,
    /// Path relative to the resolved base
    pub relative_path: PathBuf,
    /// Content type from the extension
    pub content_type: &'static str,
    /// Raw content
    pub bytes: Vec<u8>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

impl ProjectFile {
    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_text(&self) -> bool {
        is_text(self.content_type)
    }

    /// JSON-ready description with the content inlined
    pub fn to_download(&self) -> FileDownload {
        let (content, encoding) = if self.is_text() {
            (String::from_utf8_lossy(&self.bytes).into_owned(), "utf-8")
        } else {
            (
                base64::engine::general_purpose::STANDARD.encode(&self.bytes),
                "base64",
            )
        };

        FileDownload {
            success: true,
            path: self.path.display().to_string(),
            relative_path: self.relative_path.display().to_string(),
            size: self.size(),
            content_type: self.content_type,
            content,
            encoding,
            modified_at: self.modified_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// JSON body of a non-raw download
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDownload {
    pub success: bool,
    pub path: String,
    pub relative_path: String,
    pub size: u64,
    pub content_type: &'static str,
    pub content: String,
    pub encoding: &'static str,
    pub modified_at: String,
}

/// The projects directory
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    base: PathBuf,
}

impl ProjectFiles {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        ProjectFiles { base: base.into() }
    }

    /// Resolve and read a requested file
    pub async fn read(&self, request: FileRequest<'_>) -> Result<ProjectFile, FileError> {
        let target = match request {
            FileRequest::Absolute(path) => normalize(Path::new(path)),
            FileRequest::Relative(path) => {
                let relative = normalize(Path::new(path));
                if relative.has_root()
                    || matches!(relative.components().next(), Some(Component::ParentDir | Component::Prefix(_)))
                {
                    return Err(FileError::InvalidRelativePath);
                }
                self.base.join(relative)
            }
        };

        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(FileError::NotFound);
        }

        let (resolved, resolved_base) = match tokio::try_join!(
            tokio::fs::canonicalize(&target),
            tokio::fs::canonicalize(&self.base)
        ) {
            Ok(pair) => pair,
            Err(e) => {
                error!(path = %target.display(), error = %e, "Failed to resolve file path");
                return Err(FileError::AccessDenied);
            }
        };

        // Component-wise, so /projects-evil is not under /projects
        if !resolved.starts_with(&resolved_base) {
            warn!(
                requested = %target.display(),
                resolved = %resolved.display(),
                "Path traversal attempt blocked"
            );
            return Err(FileError::AccessDenied);
        }

        let metadata = tokio::fs::metadata(&resolved).await?;
        if metadata.is_dir() {
            return Err(FileError::IsDirectory(resolved));
        }

        let bytes = tokio::fs::read(&resolved).await?;
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let relative_path = resolved
            .strip_prefix(&resolved_base)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        info!(path = %resolved.display(), size = bytes.len(), "Read project file");

        Ok(ProjectFile {
            content_type: content_type_for(&resolved),
            path: resolved,
            relative_path,
            bytes,
            modified_at,
        })
    }
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent where
/// one exists, and keep leading `..` on relative paths.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}
