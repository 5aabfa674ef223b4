//! Duplicate groups and size-based file organization.
//!
//! # Overview
//!
//! Every pipeline ends in a list of [`DuplicateGroup`]s: a [`GroupKey`]
//! describing why the members belong together, and two or more files.
//!
//! ## Size Grouping
//!
//! Size grouping is the first stage of exact matching. Files with different
//! sizes cannot have the same content, so bucketing by size and dropping
//! single-member buckets removes most files before any content is read.
//!
//! # Example
//!
//! ```
//! use dupfind::scanner::FileEntry;
//! use dupfind::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileEntry::new(PathBuf::from("/file1.txt"), 1024),
//!     FileEntry::new(PathBuf::from("/file2.txt"), 1024),
//!     FileEntry::new(PathBuf::from("/file3.txt"), 2048),
//! ];
//!
//! // Only buckets with 2+ files survive
//! let (buckets, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(buckets.len(), 1);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::scanner::{Digest, FileEntry};

/// Why the members of a group belong together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Identical content. `size` is absent when size bucketing was bypassed.
    Content {
        /// Shared file size, when bucketed by size
        size: Option<u64>,
        /// Shared content digest
        digest: Digest,
    },
    /// Identical key derived from the file name.
    Name(String),
    /// Images whose feature vectors are pairwise `distance` apart.
    Similar {
        /// Distance level of the cluster
        distance: u32,
        /// Index of the cluster within its distance level
        cluster: usize,
    },
}

impl GroupKey {
    /// Text form of the key as written to reports.
    ///
    /// Content keys render the digest in hex, name keys render verbatim and
    /// similarity keys render as `distance:cluster`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Content { digest, .. } => digest.to_hex(),
            Self::Name(name) => name.clone(),
            Self::Similar { distance, cluster } => format!("{}:{}", distance, cluster),
        }
    }

    /// Whether this group is a distance-graded image cluster.
    #[must_use]
    pub fn is_similar(&self) -> bool {
        matches!(self, Self::Similar { .. })
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// A set of two or more files that matched under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// What the members have in common
    pub key: GroupKey,
    /// Member files, sorted by path
    pub files: Vec<FileEntry>,
}

impl DuplicateGroup {
    /// Create a new group, sorting its members by path.
    ///
    /// # Arguments
    ///
    /// * `key` - The shared key
    /// * `files` - Member files
    #[must_use]
    pub fn new(key: GroupKey, mut files: Vec<FileEntry>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { key, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Space held by all copies except the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        match self.files.first() {
            Some(first) if self.files.len() > 1 => self.total_size().saturating_sub(first.size),
            _ => 0,
        }
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Sort groups by key, then by first member path.
///
/// Members are expected to be sorted already (see [`DuplicateGroup::new`]).
pub fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.files.first().map(|f| &f.path).cmp(&b.files.first().map(|f| &f.path)))
    });
}

/// Statistics from the size grouping stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of empty files encountered
    pub empty_files: usize,
    /// Number of size buckets with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size and drop buckets with a single member.
///
/// Empty files are bucketed like any other size: they all share the same
/// (empty) content.
///
/// # Arguments
///
/// * `files` - Iterator of file entries to group
///
/// # Returns
///
/// A tuple of:
/// - `BTreeMap<u64, Vec<FileEntry>>` - Buckets with 2+ files, ordered by size
/// - `GroupingStats` - Statistics about the grouping operation
///
/// # Example
///
/// ```
/// use dupfind::scanner::FileEntry;
/// use dupfind::duplicates::group_by_size;
/// use std::path::PathBuf;
///
/// let files = vec![
///     FileEntry::new(PathBuf::from("/a.txt"), 100),
///     FileEntry::new(PathBuf::from("/b.txt"), 100),
///     FileEntry::new(PathBuf::from("/c.txt"), 200),
/// ];
///
/// let (buckets, stats) = group_by_size(files);
///
/// assert_eq!(buckets.len(), 1);
/// assert_eq!(buckets[&100].len(), 2);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileEntry>,
) -> (BTreeMap<u64, Vec<FileEntry>>, GroupingStats) {
    let mut all_buckets: BTreeMap<u64, Vec<FileEntry>> = BTreeMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }
        all_buckets.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_buckets.len();

    let buckets: BTreeMap<u64, Vec<FileEntry>> = all_buckets
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!(
                    "Size bucket {} bytes: {} potential duplicates",
                    size,
                    files.len()
                );
                true
            }
        })
        .collect();

    log::info!(
        "Size grouping complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (buckets, stats)
}
