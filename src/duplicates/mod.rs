//! Duplicate detection module.
//!
//! This module provides the three matching pipelines:
//! - Exact content matching with size bucketing ([`finder`])
//! - Near-duplicate images through a BK-tree ([`similar`], [`bktree`])
//! - Grouping by a key derived from the file name ([`filename`])
//!
//! All of them return [`DuplicateGroup`]s sorted by key and member path.

pub mod bktree;
pub mod filename;
pub mod finder;
pub mod groups;
pub mod similar;

pub use bktree::{BkTree, HammingMetric, Metric};
pub use filename::{find_by_filename, FilenameMatcher, FilenameStats};
pub use finder::{find_exact, ExactConfig, ExactStats, FinderError, ScanOptions};
pub use groups::{group_by_size, DuplicateGroup, GroupKey, GroupingStats};
pub use similar::{find_similar_images, ImageIndex, ImageIndexBuilder, SimilarConfig, SimilarStats};
