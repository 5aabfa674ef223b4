//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing one or more
//! roots and collecting file records for duplicate detection. Traversal is
//! single-threaded and lazy: records are produced as the walk advances.
//!
//! # Features
//!
//! - Multiple roots walked one after another
//! - Ignored directory names pruned before descending (children never visited)
//! - Symlinks skipped, or resolved to their target file when enabled
//! - Per-entry errors reported to the [`EventSink`] and skipped; one bad
//!   entry never aborts the walk
//! - Graceful shutdown via atomic flag
//!
//! Children are visited in file-name order, but callers needing a stable
//! result order must still sort explicitly.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};
use crate::events::{EventSink, ScanEvent};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Roots to walk, in order
    roots: Vec<PathBuf>,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker over the given roots.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dupfind::scanner::{Walker, WalkerConfig};
    /// use std::path::PathBuf;
    ///
    /// let walker = Walker::new(vec![PathBuf::from(".")], WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            roots,
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding records.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk all roots, yielding file records.
    ///
    /// Errors and pruned directories are reported to `events`; the iterator
    /// only yields files that could be stat'ed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dupfind::events::LogSink;
    /// use dupfind::scanner::{Walker, WalkerConfig};
    /// use std::path::PathBuf;
    ///
    /// let walker = Walker::new(vec![PathBuf::from(".")], WalkerConfig::default());
    /// let files: Vec<_> = walker.walk(&LogSink).collect();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk<'a>(&'a self, events: &'a dyn EventSink) -> impl Iterator<Item = FileEntry> + 'a {
        self.roots
            .iter()
            .flat_map(move |root| {
                WalkDir::new(root)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(move |entry| !self.prune(entry, events))
                    .filter_map(move |result| match result {
                        Ok(entry) => self.process_entry(&entry, events),
                        Err(e) => {
                            events.emit(ScanEvent::TraversalFailed(self.convert_walk_error(
                                root, e,
                            )));
                            None
                        }
                    })
            })
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
    }

    /// Whether `entry` is an ignored directory. Reports the pruning.
    fn prune(&self, entry: &DirEntry, events: &dyn EventSink) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if self.config.is_ignored_dirname(&name) {
            events.emit(ScanEvent::DirectoryPruned {
                path: entry.path().to_path_buf(),
            });
            true
        } else {
            false
        }
    }

    /// Turn a directory entry into a file record, if it is one.
    fn process_entry(&self, entry: &DirEntry, events: &dyn EventSink) -> Option<FileEntry> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }

        let path = entry.path();
        let is_symlink = file_type.is_symlink();

        let metadata = if is_symlink {
            if !self.config.include_symlinks {
                log::trace!("Skipping symlink: {}", path.display());
                return None;
            }
            match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    events.emit(ScanEvent::TraversalFailed(ScanError::BrokenLink(
                        path.to_path_buf(),
                    )));
                    return None;
                }
                Err(e) => {
                    events.emit(ScanEvent::TraversalFailed(ScanError::from_io(path, e)));
                    return None;
                }
            }
        } else {
            match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    events.emit(ScanEvent::TraversalFailed(
                        self.convert_walk_error(path, e),
                    ));
                    return None;
                }
            }
        };

        // Sockets, fifos, devices and links to directories
        if !metadata.is_file() {
            log::trace!("Skipping non-regular file: {}", path.display());
            return None;
        }

        Some(FileEntry {
            path: path.to_path_buf(),
            size: metadata.len(),
            is_symlink,
        })
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn convert_walk_error(&self, fallback: &Path, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| fallback.to_path_buf(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => ScanError::from_io(&path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            },
        }
    }
}
