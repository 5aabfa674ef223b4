//! Perceptual image fingerprints for similarity detection.
//!
//! This module provides the [`PerceptualHasher`], which decodes an image and
//! turns it into a [`FeatureVector`]: a fixed-length sequence of small
//! integers whose Hamming distance to another vector measures how different
//! two images look. Unlike a content digest, visually similar images produce
//! vectors at a small mutual distance.
//!
//! Fingerprinting is a capability behind the [`FeatureExtractor`] trait:
//! - [`BlockMeanExtractor`] (default): one cell per block of a 16x16 grid,
//!   set when the block's mean brightness is above the median block mean
//! - [`ImageHasherExtractor`]: aHash/dHash/pHash from `image_hasher`, with
//!   each hash bit expanded to one vector element

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default raster extensions considered images (lowercase, no dot).
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] =
    &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// Default grid size of the block-mean hash.
pub const DEFAULT_BLOCK_GRID: u32 = 16;

/// Fixed-length image fingerprint, one small integer per cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    /// Wrap raw cell values.
    #[must_use]
    pub fn new(cells: Vec<u8>) -> Self {
        Self(cells)
    }

    /// Cell values.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hamming distance to another vector.
    #[must_use]
    pub fn distance(&self, other: &Self) -> u32 {
        hamming_distance(&self.0, &other.0)
    }
}

impl std::fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for cell in &self.0 {
            write!(f, "{:x}", cell)?;
        }
        Ok(())
    }
}

/// Number of positions at which two sequences differ.
///
/// Positions present in only one of the sequences count as differing, so the
/// distance stays a metric for vectors of unequal length.
#[must_use]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    let common = a.iter().zip(b).filter(|(x, y)| x != y).count();
    u32::try_from(common + a.len().abs_diff(b.len())).unwrap_or(u32::MAX)
}

/// Supported fingerprint algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// Block-mean hash on a 16x16 grid (256 cells).
    #[default]
    Blockmean,
    /// aHash (Average Hash) - Mean-based, fast but less resilient.
    Ahash,
    /// dHash (Difference Hash) - Gradient-based, very fast and effective.
    Dhash,
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    Phash,
}

impl PerceptualAlgorithm {
    /// Build the extractor for this algorithm.
    #[must_use]
    pub fn build(self) -> Box<dyn FeatureExtractor> {
        match self {
            Self::Blockmean => Box::new(BlockMeanExtractor::default()),
            Self::Ahash | Self::Dhash | Self::Phash => Box::new(ImageHasherExtractor::new(self)),
        }
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blockmean => write!(f, "blockmean"),
            Self::Ahash => write!(f, "aHash"),
            Self::Dhash => write!(f, "dHash"),
            Self::Phash => write!(f, "pHash"),
        }
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("Cannot open {path}: {source}")]
    LoadError {
        /// Image that failed to decode
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },
}

impl PerceptualError {
    /// Path of the image that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::LoadError { path, .. } => path,
        }
    }
}

/// Capability: turn decoded pixels into a feature vector.
pub trait FeatureExtractor: Send + Sync {
    /// Compute the feature vector of an image.
    fn extract(&self, image: &DynamicImage) -> FeatureVector;
}

/// Block-mean hash.
///
/// The grayscale image is divided into `grid x grid` blocks; a cell is 1 when
/// its block's mean brightness is above the median of all block means.
#[derive(Debug, Clone, Copy)]
pub struct BlockMeanExtractor {
    grid: u32,
}

impl BlockMeanExtractor {
    /// Create an extractor with a `grid x grid` layout.
    #[must_use]
    pub fn new(grid: u32) -> Self {
        Self { grid: grid.max(1) }
    }
}

impl Default for BlockMeanExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_GRID)
    }
}

impl FeatureExtractor for BlockMeanExtractor {
    fn extract(&self, image: &DynamicImage) -> FeatureVector {
        let grid = self.grid;
        let mut gray = image.to_luma8();
        // Every block needs at least one pixel
        if gray.width() < grid || gray.height() < grid {
            gray = image::imageops::resize(
                &gray,
                gray.width().max(grid),
                gray.height().max(grid),
                image::imageops::FilterType::Nearest,
            );
        }
        let (width, height) = gray.dimensions();

        let mut means = Vec::with_capacity((grid * grid) as usize);
        for by in 0..grid {
            let y0 = by * height / grid;
            let y1 = (by + 1) * height / grid;
            for bx in 0..grid {
                let x0 = bx * width / grid;
                let x1 = (bx + 1) * width / grid;
                let mut sum = 0u64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += u64::from(gray.get_pixel(x, y)[0]);
                    }
                }
                let count = u64::from((x1 - x0) * (y1 - y0));
                means.push(sum as f64 / count as f64);
            }
        }

        let mut sorted = means.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        FeatureVector::new(means.iter().map(|m| u8::from(*m > median)).collect())
    }
}

/// aHash/dHash/pHash computed by `image_hasher`, one cell per hash bit.
pub struct ImageHasherExtractor {
    hasher: image_hasher::Hasher,
}

impl ImageHasherExtractor {
    /// Create an extractor for one of the `image_hasher` algorithms.
    ///
    /// [`PerceptualAlgorithm::Blockmean`] falls back to the mean hash here;
    /// use [`BlockMeanExtractor`] for it.
    #[must_use]
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        let mut config = HasherConfig::new();

        match algorithm {
            PerceptualAlgorithm::Phash => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            PerceptualAlgorithm::Dhash => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            PerceptualAlgorithm::Ahash | PerceptualAlgorithm::Blockmean => {
                config = config.hash_alg(HashAlg::Mean);
            }
        }

        Self {
            hasher: config.to_hasher(),
        }
    }
}

impl FeatureExtractor for ImageHasherExtractor {
    fn extract(&self, image: &DynamicImage) -> FeatureVector {
        let hash = self.hasher.hash_image(image);
        let cells = hash
            .as_bytes()
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |bit| (*byte >> bit) & 1))
            .collect();
        FeatureVector::new(cells)
    }
}

/// Decodes images and computes their feature vectors.
pub struct PerceptualHasher {
    extractor: Box<dyn FeatureExtractor>,
    algorithm: PerceptualAlgorithm,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm.
    #[must_use]
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        Self {
            extractor: algorithm.build(),
            algorithm,
        }
    }

    /// Decode the image at `path` and compute its feature vector.
    ///
    /// # Errors
    ///
    /// The format is detected from the file content, falling back to the
    /// extension when the content is not recognized.
    ///
    /// Returns [`PerceptualError::LoadError`] if the file cannot be opened or
    /// its payload is not a decodable image.
    pub fn compute<P: AsRef<Path>>(&self, path: P) -> Result<FeatureVector, PerceptualError> {
        let path = path.as_ref();
        let img = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(image::ImageError::IoError)
            .and_then(ImageReader::decode)
            .map_err(|source| PerceptualError::LoadError {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(self.extractor.extract(&img))
    }

    /// Get the algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::default())
    }
}
