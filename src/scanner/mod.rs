//! Scanner module for directory traversal, content hashing and image fingerprints.
//!
//! This module provides functionality for:
//! - Walking one or more roots while pruning ignored directory names
//! - Content hashing through the [`ContentHasher`] capability
//! - Perceptual image fingerprints through the [`perceptual::FeatureExtractor`] capability
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Streaming content digests (BLAKE3, SHA-2, tag-stripped audio)
//! - [`perceptual`]: Feature vectors for near-duplicate images
//!
//! # Example
//!
//! ```no_run
//! use dupfind::events::LogSink;
//! use dupfind::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from(".")], WalkerConfig::default());
//! for file in walker.walk(&LogSink) {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! ```

pub mod hasher;
pub mod perceptual;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{ContentHasher, Digest, HashAlgorithm, HashOutcome};
pub use perceptual::{FeatureVector, PerceptualAlgorithm, PerceptualHasher};
pub use walker::Walker;

/// Directory names pruned by default.
pub const DEFAULT_IGNORE_DIRNAMES: &[&str] = &[".git"];

/// A file discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file as reached from its root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Whether the path is a symbolic link to a regular file
    pub is_symlink: bool,
}

impl FileEntry {
    /// Create a new FileEntry for a regular (non-symlink) file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            is_symlink: false,
        }
    }

    /// Lowercased extension of the file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }

    /// Base file name as a (lossy) string.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Yield symlinks that resolve to regular files.
    ///
    /// Warning: a file reachable through a link and through its real path
    /// then shows up twice and can form a "duplicate" group on its own.
    pub include_symlinks: bool,

    /// Directory names that are never descended into (e.g. `.git`).
    pub ignore_dirnames: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            include_symlinks: false,
            ignore_dirnames: DEFAULT_IGNORE_DIRNAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl WalkerConfig {
    /// Create a new configuration.
    ///
    /// # Arguments
    ///
    /// * `include_symlinks` - Whether to yield symlinked files
    /// * `ignore_dirnames` - Directory names to prune
    #[must_use]
    pub fn new(include_symlinks: bool, ignore_dirnames: Vec<String>) -> Self {
        Self {
            include_symlinks,
            ignore_dirnames,
        }
    }

    /// Set whether symlinked files are yielded.
    #[must_use]
    pub fn with_include_symlinks(mut self, include: bool) -> Self {
        self.include_symlinks = include;
        self
    }

    /// Replace the set of pruned directory names.
    #[must_use]
    pub fn with_ignore_dirnames(mut self, names: Vec<String>) -> Self {
        self.ignore_dirnames = names;
        self
    }

    /// Whether a directory with this name is pruned.
    #[must_use]
    pub fn is_ignored_dirname(&self, name: &str) -> bool {
        self.ignore_dirnames.iter().any(|n| n == name)
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A symlink points at a target that cannot be resolved.
    #[error("Broken link: {0}")]
    BrokenLink(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::BrokenLink(p) => Some(p),
            Self::Io { path, .. } => Some(path),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between listing and hashing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
