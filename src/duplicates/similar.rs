//! Near-duplicate image detection.
//!
//! Every file with an allowed image extension is decoded and reduced to a
//! [`FeatureVector`]. Distinct vectors go into one [`BkTree`]; a side table
//! remembers which files own each vector, since unrelated files can share an
//! identical fingerprint.
//!
//! Grouping is graded by distance: for each level `d` from 0 up to the
//! configured maximum, the vectors are partitioned into clusters that are
//! pairwise exactly `d` apart (see [`BkTree::find_by_distance`]). Level 0
//! reports every vector owned by two or more files. A file can therefore show
//! up at several levels, which is intentional.
//!
//! Building and querying are separate phases: [`ImageIndexBuilder`] accepts
//! inserts, and [`ImageIndexBuilder::finish`] turns it into a read-only
//! [`ImageIndex`].

use std::collections::HashMap;
use std::path::PathBuf;

use super::bktree::{BkTree, HammingMetric};
use super::finder::{FinderError, ScanOptions};
use super::groups::{DuplicateGroup, GroupKey};
use crate::events::{EventSink, ScanEvent};
use crate::scanner::perceptual::DEFAULT_IMAGE_EXTENSIONS;
use crate::scanner::{FeatureVector, FileEntry, PerceptualAlgorithm, PerceptualHasher};

/// Number of distance levels visited at most (levels `0..100`).
pub const DISTANCE_LEVELS: u32 = 100;

/// Highest distance level that can be requested.
pub const MAX_DISTANCE: u32 = DISTANCE_LEVELS - 1;

/// Configuration for near-duplicate image matching.
#[derive(Debug, Clone)]
pub struct SimilarConfig {
    /// Shared traversal, shutdown and progress settings.
    pub scan: ScanOptions,
    /// Feature extraction algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Lowercase extensions (without dot) treated as images.
    pub extensions: Vec<String>,
    /// Highest distance level to report, capped at [`MAX_DISTANCE`].
    pub max_distance: u32,
}

impl Default for SimilarConfig {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            algorithm: PerceptualAlgorithm::default(),
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
            max_distance: MAX_DISTANCE,
        }
    }
}

impl SimilarConfig {
    /// Set the shared scan options.
    #[must_use]
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Set the feature extraction algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: PerceptualAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Replace the extension allow-list. Extensions are matched case-insensitively.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Set the highest distance level, capped at [`MAX_DISTANCE`].
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: u32) -> Self {
        self.max_distance = max_distance.min(MAX_DISTANCE);
        self
    }

    /// Whether a file has an allowed image extension.
    #[must_use]
    pub fn accepts(&self, file: &FileEntry) -> bool {
        file.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// Statistics from a near-duplicate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilarStats {
    /// Files yielded by the walker (or passed in)
    pub files_seen: usize,
    /// Files with an allowed image extension
    pub candidate_images: usize,
    /// Images decoded and fingerprinted
    pub images_indexed: usize,
    /// Images that could not be opened or decoded
    pub decode_failures: usize,
    /// Distinct feature vectors in the tree
    pub distinct_vectors: usize,
    /// Number of groups emitted across all levels
    pub duplicate_groups: usize,
}

/// Insert phase of the image index.
#[derive(Debug)]
pub struct ImageIndexBuilder {
    tree: BkTree<FeatureVector, HammingMetric>,
    slots: HashMap<FeatureVector, usize>,
    owners: Vec<Vec<FileEntry>>,
}

impl Default for ImageIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageIndexBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: BkTree::new(HammingMetric),
            slots: HashMap::new(),
            owners: Vec::new(),
        }
    }

    /// Record that `file` has fingerprint `vector`.
    ///
    /// The vector enters the tree the first time it is seen; later files with
    /// the same vector are only added to its owner list.
    pub fn insert(&mut self, vector: FeatureVector, file: FileEntry) {
        if let Some(&slot) = self.slots.get(&vector) {
            self.owners[slot].push(file);
            return;
        }
        let slot = self.tree.insert(vector.clone());
        debug_assert_eq!(slot, self.owners.len());
        self.slots.insert(vector, slot);
        self.owners.push(vec![file]);
    }

    /// Finish inserting and return the queryable index.
    #[must_use]
    pub fn finish(self) -> ImageIndex {
        ImageIndex {
            tree: self.tree,
            owners: self.owners,
        }
    }
}

/// Read-only image index answering per-distance cluster queries.
#[derive(Debug)]
pub struct ImageIndex {
    tree: BkTree<FeatureVector, HammingMetric>,
    owners: Vec<Vec<FileEntry>>,
}

impl ImageIndex {
    /// Number of distinct feature vectors.
    #[must_use]
    pub fn distinct_vectors(&self) -> usize {
        self.tree.len()
    }

    /// Number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.owners.iter().map(Vec::len).sum()
    }

    /// Files owning each vector within `radius` of `probe`.
    #[must_use]
    pub fn find(&self, probe: &FeatureVector, radius: u32) -> Vec<(u32, &[FileEntry])> {
        self.tree
            .find(probe, radius)
            .into_iter()
            .map(|(d, slot)| (d, self.owners[slot].as_slice()))
            .collect()
    }

    /// Groups at exactly `distance`, sorted by first member path.
    #[must_use]
    pub fn groups_at(&self, distance: u32) -> Vec<DuplicateGroup> {
        let clusters: Vec<Vec<usize>> = if distance == 0 {
            (0..self.owners.len())
                .filter(|&slot| self.owners[slot].len() > 1)
                .map(|slot| vec![slot])
                .collect()
        } else {
            self.tree.find_by_distance(distance)
        };

        let mut members: Vec<Vec<FileEntry>> = clusters
            .into_iter()
            .map(|slots| {
                let mut files: Vec<FileEntry> = slots
                    .into_iter()
                    .flat_map(|slot| self.owners[slot].iter().cloned())
                    .collect();
                files.sort_by(|a, b| a.path.cmp(&b.path));
                files
            })
            .collect();
        members.sort_by(|a, b| a.first().map(|f| &f.path).cmp(&b.first().map(|f| &f.path)));

        members
            .into_iter()
            .enumerate()
            .map(|(cluster, files)| {
                DuplicateGroup::new(GroupKey::Similar { distance, cluster }, files)
            })
            .collect()
    }

    /// Groups for every level from 0 to `max_distance` (capped at [`MAX_DISTANCE`]).
    ///
    /// Levels beyond the longest vector cannot produce clusters and are not
    /// visited.
    #[must_use]
    pub fn groups(&self, max_distance: u32) -> Vec<DuplicateGroup> {
        let longest = self
            .tree
            .items()
            .map(|v| u32::try_from(v.len()).unwrap_or(u32::MAX))
            .max()
            .unwrap_or(0);
        let last = max_distance.min(MAX_DISTANCE).min(longest);

        let mut groups = Vec::new();
        for distance in 0..=last {
            let level = self.groups_at(distance);
            if !level.is_empty() {
                log::debug!("Distance {}: {} group(s)", distance, level.len());
            }
            groups.extend(level);
        }
        groups
    }
}

/// Run the near-duplicate image pipeline over `roots`.
///
/// # Errors
///
/// Returns `FinderError` if a root is invalid or the run is interrupted.
/// Decode failures never abort the run; they are reported to `events`.
pub fn find_similar_images(
    roots: &[PathBuf],
    config: &SimilarConfig,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, SimilarStats), FinderError> {
    log::info!(
        "Starting image scan ({}, levels 0..={})",
        config.algorithm,
        config.max_distance
    );
    let files = config.scan.collect(roots, events)?;
    find_similar_in_files(files, config, events)
}

/// Run the near-duplicate image pipeline over already collected files.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if shutdown is requested while decoding.
pub fn find_similar_in_files(
    files: Vec<FileEntry>,
    config: &SimilarConfig,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, SimilarStats), FinderError> {
    let mut stats = SimilarStats {
        files_seen: files.len(),
        ..SimilarStats::default()
    };

    let images: Vec<FileEntry> = files.into_iter().filter(|f| config.accepts(f)).collect();
    stats.candidate_images = images.len();

    let hasher = PerceptualHasher::new(config.algorithm);
    let mut builder = ImageIndexBuilder::new();

    config.scan.phase_start("image", images.len());
    for (i, file) in images.into_iter().enumerate() {
        config.scan.check_shutdown()?;
        config.scan.item_done(i + 1, &file);

        match hasher.compute(&file.path) {
            Ok(vector) => {
                stats.images_indexed += 1;
                builder.insert(vector, file);
            }
            Err(error) => {
                stats.decode_failures += 1;
                events.emit(ScanEvent::DecodeFailed(error));
            }
        }
    }
    config.scan.phase_end("image");

    let index = builder.finish();
    stats.distinct_vectors = index.distinct_vectors();

    let groups = index.groups(config.max_distance);
    stats.duplicate_groups = groups.len();

    log::info!(
        "Image match complete: {} indexed ({} distinct), {} undecodable → {} groups",
        stats.images_indexed,
        stats.distinct_vectors,
        stats.decode_failures,
        stats.duplicate_groups
    );

    Ok((groups, stats))
}
