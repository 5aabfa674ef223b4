//! Exact duplicate finder.
//!
//! # Overview
//!
//! This module runs the exact-match pipeline:
//! 1. **Collect**: walk every root (see [`crate::scanner::walker`])
//! 2. **Size grouping**: bucket by size and drop singletons (see [`crate::duplicates::groups`])
//! 3. **Hash**: stream each surviving file through the configured [`ContentHasher`]
//! 4. **Regroup**: within each bucket, files with equal digests form a group
//!
//! The "no-size" variant skips stage 2 and hashes every collected file.
//!
//! It also hosts the pieces every pipeline shares: [`ScanOptions`] (walker
//! settings, shutdown flag, progress callback) and [`FinderError`].
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{find_exact, ExactConfig};
//! use dupfind::events::LogSink;
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from(".")];
//! let (groups, stats) = find_exact(&roots, &ExactConfig::default(), &LogSink).unwrap();
//!
//! println!("{} groups, {} files hashed", groups.len(), stats.files_hashed);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::groups::{group_by_size, sort_groups, DuplicateGroup, GroupKey, GroupingStats};
use crate::events::{EventSink, ScanEvent};
use crate::progress::{ProgressCallback, PHASE_COLLECT};
use crate::scanner::{ContentHasher, Digest, FileEntry, HashAlgorithm, HashOutcome, Walker, WalkerConfig};

/// Settings shared by every pipeline.
#[derive(Clone, Default)]
pub struct ScanOptions {
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOptions")
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ScanOptions {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Return [`FinderError::Interrupted`] if shutdown has been requested.
    pub(crate) fn check_shutdown(&self) -> Result<(), FinderError> {
        if self.is_shutdown_requested() {
            Err(FinderError::Interrupted)
        } else {
            Ok(())
        }
    }

    pub(crate) fn phase_start(&self, phase: &str, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(phase, total);
        }
    }

    pub(crate) fn item_done(&self, current: usize, file: &FileEntry) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(current, &file.path.to_string_lossy());
            callback.on_item_completed(file.size);
        }
    }

    pub(crate) fn phase_end(&self, phase: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(phase);
        }
    }

    /// Walk all roots and collect every file record.
    ///
    /// # Errors
    ///
    /// Returns an error if a root is missing or not a directory, or if
    /// shutdown is requested while walking.
    pub fn collect(
        &self,
        roots: &[PathBuf],
        events: &dyn EventSink,
    ) -> Result<Vec<FileEntry>, FinderError> {
        validate_roots(roots)?;
        self.check_shutdown()?;

        let mut walker = Walker::new(roots.to_vec(), self.walker_config.clone());
        if let Some(ref flag) = self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        self.phase_start(PHASE_COLLECT, 0);
        let mut files = Vec::new();
        for file in walker.walk(events) {
            self.item_done(files.len() + 1, &file);
            files.push(file);
        }
        self.phase_end(PHASE_COLLECT);

        self.check_shutdown()?;
        log::info!(
            "Collected {} files from {} root(s)",
            files.len(),
            roots.len()
        );
        Ok(files)
    }
}

/// Check that there is at least one root and that each is a directory.
///
/// # Errors
///
/// Returns [`FinderError::NoRoots`], [`FinderError::PathNotFound`] or
/// [`FinderError::NotADirectory`].
pub fn validate_roots(roots: &[PathBuf]) -> Result<(), FinderError> {
    if roots.is_empty() {
        return Err(FinderError::NoRoots);
    }
    for root in roots {
        if !root.exists() {
            return Err(FinderError::PathNotFound(root.clone()));
        }
        if !root.is_dir() {
            return Err(FinderError::NotADirectory(root.clone()));
        }
    }
    Ok(())
}

/// Configuration for the exact-match pipeline.
#[derive(Debug, Clone)]
pub struct ExactConfig {
    /// Shared traversal, shutdown and progress settings.
    pub scan: ScanOptions,
    /// Content hash algorithm.
    pub algorithm: HashAlgorithm,
    /// Bucket by size before hashing. Disabling hashes every file.
    pub use_size: bool,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            algorithm: HashAlgorithm::default(),
            use_size: true,
        }
    }
}

impl ExactConfig {
    /// Set the shared scan options.
    #[must_use]
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Set the content hash algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable or disable size bucketing.
    #[must_use]
    pub fn with_size_bucketing(mut self, enabled: bool) -> Self {
        self.use_size = enabled;
        self
    }

    /// Whether files are bucketed by size before hashing.
    ///
    /// Hashers that ignore part of the file can match files of different
    /// sizes, so bucketing is off for them whatever `use_size` says.
    #[must_use]
    pub fn buckets_by_size(&self) -> bool {
        self.use_size && self.algorithm.covers_full_content()
    }
}

/// Statistics from an exact-match run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactStats {
    /// Files yielded by the walker (or passed in)
    pub files_seen: usize,
    /// Size grouping statistics, absent in no-size mode
    pub grouping: Option<GroupingStats>,
    /// Files whose content was hashed successfully
    pub files_hashed: usize,
    /// Files the hasher refused because of their structure
    pub files_skipped: usize,
    /// Files that could not be read
    pub hash_failures: usize,
    /// Number of duplicate groups emitted
    pub duplicate_groups: usize,
    /// Number of files across all groups
    pub duplicate_files: usize,
    /// Bytes held by all copies except one per group
    pub wasted_space: u64,
}

impl ExactStats {
    /// Number of files excluded because of a read error.
    #[must_use]
    pub fn excluded_with_errors(&self) -> usize {
        self.hash_failures
    }
}

/// Errors that can occur while running a pipeline.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// No roots were given.
    #[error("No directories to scan")]
    NoRoots,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The filename pattern is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as given
        pattern: String,
        /// The regex compile error
        #[source]
        source: regex::Error,
    },
}

/// Run the exact-match pipeline over `roots`.
///
/// # Errors
///
/// Returns `FinderError` if a root is invalid or the run is interrupted.
/// Per-file failures never abort the run; they are reported to `events`.
pub fn find_exact(
    roots: &[PathBuf],
    config: &ExactConfig,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, ExactStats), FinderError> {
    log::info!(
        "Starting exact scan ({}, size bucketing {})",
        config.algorithm,
        if config.buckets_by_size() { "on" } else { "off" }
    );
    let files = config.scan.collect(roots, events)?;
    find_exact_in_files(files, config, events)
}

/// Run the exact-match pipeline over already collected files.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if shutdown is requested while hashing.
pub fn find_exact_in_files(
    files: Vec<FileEntry>,
    config: &ExactConfig,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, ExactStats), FinderError> {
    let mut stats = ExactStats {
        files_seen: files.len(),
        ..ExactStats::default()
    };

    let buckets: Vec<(Option<u64>, Vec<FileEntry>)> = if config.buckets_by_size() {
        let (by_size, grouping) = group_by_size(files);
        stats.grouping = Some(grouping);
        by_size
            .into_iter()
            .map(|(size, files)| (Some(size), files))
            .collect()
    } else if files.len() > 1 {
        vec![(None, files)]
    } else {
        Vec::new()
    };

    let hasher = config.algorithm.build();
    let total: usize = buckets.iter().map(|(_, files)| files.len()).sum();
    config.scan.phase_start("hash", total);

    let mut groups = Vec::new();
    let mut processed = 0;
    for (size, bucket) in buckets {
        let by_digest = hash_bucket(bucket, hasher.as_ref(), config, events, &mut stats, &mut processed)?;
        groups.extend(
            by_digest
                .into_iter()
                .filter(|(_, files)| files.len() > 1)
                .map(|(digest, files)| DuplicateGroup::new(GroupKey::Content { size, digest }, files)),
        );
    }
    config.scan.phase_end("hash");

    sort_groups(&mut groups);
    stats.duplicate_groups = groups.len();
    stats.duplicate_files = groups.iter().map(DuplicateGroup::len).sum();
    stats.wasted_space = groups.iter().map(DuplicateGroup::wasted_space).sum();

    log::info!(
        "Exact match complete: {} hashed, {} skipped, {} failed → {} groups ({} files)",
        stats.files_hashed,
        stats.files_skipped,
        stats.hash_failures,
        stats.duplicate_groups,
        stats.duplicate_files
    );

    Ok((groups, stats))
}

/// Hash one bucket and regroup its members by digest.
fn hash_bucket(
    bucket: Vec<FileEntry>,
    hasher: &dyn ContentHasher,
    config: &ExactConfig,
    events: &dyn EventSink,
    stats: &mut ExactStats,
    processed: &mut usize,
) -> Result<BTreeMap<Digest, Vec<FileEntry>>, FinderError> {
    let mut by_digest: BTreeMap<Digest, Vec<FileEntry>> = BTreeMap::new();

    for file in bucket {
        config.scan.check_shutdown()?;
        *processed += 1;
        config.scan.item_done(*processed, &file);

        match hasher.hash_file(&file.path) {
            HashOutcome::Hashed(digest) => {
                stats.files_hashed += 1;
                by_digest.entry(digest).or_default().push(file);
            }
            HashOutcome::Skipped(reason) => {
                stats.files_skipped += 1;
                events.emit(ScanEvent::HashSkipped {
                    path: file.path,
                    reason,
                });
            }
            HashOutcome::Failed(error) => {
                stats.hash_failures += 1;
                events.emit(ScanEvent::HashFailed(error));
            }
        }
    }

    Ok(by_digest)
}
