//! Command-line interface definitions for dupfind.
//!
//! Arguments are parsed with the clap derive API into [`Cli`], merged with the
//! layered [`Config`] and checked by [`RunPlan::from_cli`] before any file is
//! touched.
//!
//! # Example
//!
//! ```bash
//! # Exact duplicates, CSV on stdout
//! dupfind ~/Music ~/Backup/Music
//!
//! # Same, as an XML results file for dupeGuru
//! dupfind ~/Music --format xml --output dups.xml
//!
//! # Audio files that differ only in their ID3 tags
//! dupfind ~/Music --hash id3-stripped
//!
//! # Near-duplicate photos up to distance 8
//! dupfind ~/Pictures --mode image --max-distance 8
//!
//! # Versioned copies of the same document
//! dupfind ~/Documents --mode filename --pattern '^(.*)_v\d+\.txt$'
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::config::Config;
use crate::duplicates::filename::DEFAULT_REPLACEMENT;
use crate::duplicates::finder::validate_roots;
use crate::duplicates::similar::MAX_DISTANCE;
use crate::duplicates::{FilenameMatcher, FinderError, ScanOptions};
use crate::output::{CsvLayout, OutputFormat};
use crate::scanner::{HashAlgorithm, PerceptualAlgorithm, WalkerConfig};

/// Find duplicate files by content, image similarity or file name.
#[derive(Debug, Parser)]
#[command(name = "dupfind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan
    #[arg(value_name = "DIR", required = true)]
    pub roots: Vec<PathBuf>,

    /// What counts as a duplicate
    #[arg(short, long, value_enum, default_value_t = MatchMode::Exact)]
    pub mode: MatchMode,

    /// Content hash for exact mode [default: blake3]
    #[arg(long = "hash", value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Hash every file instead of bucketing by size first (exact mode)
    #[arg(long)]
    pub no_size: bool,

    /// Image extension to consider, repeatable (image mode)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Fingerprint algorithm for image mode [default: blockmean]
    #[arg(long = "perceptual", value_enum, value_name = "ALGORITHM")]
    pub perceptual_algorithm: Option<PerceptualAlgorithm>,

    /// Highest distance level to report (image mode, at most 99)
    #[arg(long, value_name = "N")]
    pub max_distance: Option<u32>,

    /// Include symlinks to regular files.
    ///
    /// A file reachable through a link and its real path can then form a
    /// duplicate group on its own.
    #[arg(long)]
    pub include_symlinks: bool,

    /// Regex applied to each file name (filename mode)
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Replacement producing the grouping key (filename mode)
    #[arg(long, value_name = "TEMPLATE", default_value = DEFAULT_REPLACEMENT)]
    pub replacement: String,

    /// Directory name to skip, in addition to the configured ones (repeatable)
    #[arg(long = "ignore-dir", value_name = "NAME")]
    pub ignore_dirs: Vec<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchMode {
    /// Identical content
    Exact,
    /// Visually similar images
    Image,
    /// Same key derived from the file name
    Filename,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Image => write!(f, "image"),
            MatchMode::Filename => write!(f, "filename"),
        }
    }
}

/// Invalid argument combinations, detected before scanning.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The report format cannot express this mode's groups.
    #[error("{format} output is not supported in {mode} mode")]
    UnsupportedFormat {
        /// Requested mode
        mode: MatchMode,
        /// Requested format
        format: OutputFormat,
    },

    /// Filename mode needs a pattern.
    #[error("--pattern is required in filename mode")]
    MissingPattern,

    /// Distance above the last level.
    #[error("--max-distance {0} exceeds {max}", max = MAX_DISTANCE)]
    DistanceTooLarge(u32),

    /// Bad root or bad pattern.
    #[error(transparent)]
    Finder(#[from] FinderError),
}

/// Pipeline selected for a run, with its mode-specific settings.
#[derive(Debug, Clone)]
pub enum Pipeline {
    /// Exact content matching
    Exact {
        /// Content hash
        algorithm: HashAlgorithm,
        /// Bucket by size first
        use_size: bool,
    },
    /// Near-duplicate images
    Image {
        /// Fingerprint algorithm
        algorithm: PerceptualAlgorithm,
        /// Allowed extensions
        extensions: Vec<String>,
        /// Highest distance level
        max_distance: u32,
    },
    /// File name keys
    Filename(FilenameMatcher),
}

/// A validated run: everything needed to scan and report.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Selected pipeline
    pub pipeline: Pipeline,
    /// Traversal settings (shutdown and progress are attached later)
    pub scan: ScanOptions,
    /// Report format
    pub format: OutputFormat,
    /// Report destination, stdout when absent
    pub output: Option<PathBuf>,
}

impl RunPlan {
    /// Merge CLI flags over `config` and validate the result.
    ///
    /// Only the roots are looked at on disk; no directory is read.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` for unsupported mode/format pairs, a missing or
    /// invalid pattern, an out-of-range distance, or a bad root.
    pub fn from_cli(cli: &Cli, config: &Config) -> Result<Self, PlanError> {
        if cli.mode == MatchMode::Image && cli.format == OutputFormat::Xml {
            return Err(PlanError::UnsupportedFormat {
                mode: cli.mode,
                format: cli.format,
            });
        }

        let pipeline = match cli.mode {
            MatchMode::Exact => {
                let algorithm = cli.hash_algorithm.unwrap_or(config.hash_algorithm);
                if !cli.no_size && !algorithm.covers_full_content() {
                    log::info!("{} digests ignore file size; size bucketing disabled", algorithm);
                }
                Pipeline::Exact {
                    algorithm,
                    use_size: !cli.no_size && algorithm.covers_full_content(),
                }
            }
            MatchMode::Image => {
                let max_distance = cli.max_distance.unwrap_or(config.max_distance);
                if max_distance > MAX_DISTANCE {
                    return Err(PlanError::DistanceTooLarge(max_distance));
                }
                let extensions = if cli.extensions.is_empty() {
                    config.image_extensions.clone()
                } else {
                    cli.extensions.clone()
                };
                Pipeline::Image {
                    algorithm: cli.perceptual_algorithm.unwrap_or(config.perceptual_algorithm),
                    extensions,
                    max_distance,
                }
            }
            MatchMode::Filename => {
                let pattern = cli.pattern.as_deref().ok_or(PlanError::MissingPattern)?;
                Pipeline::Filename(FilenameMatcher::new(pattern, &cli.replacement)?)
            }
        };
        warn_unused_flags(cli);

        validate_roots(&cli.roots)?;

        let mut ignore_dirnames = config.ignore_dirnames.clone();
        ignore_dirnames.extend(cli.ignore_dirs.iter().cloned());
        let walker_config = WalkerConfig::new(
            cli.include_symlinks || config.include_symlinks,
            ignore_dirnames,
        );

        Ok(Self {
            roots: cli.roots.clone(),
            pipeline,
            scan: ScanOptions::default().with_walker_config(walker_config),
            format: cli.format,
            output: cli.output.clone(),
        })
    }

    /// Column layout for CSV reports of this run.
    #[must_use]
    pub fn csv_layout(&self) -> CsvLayout {
        match self.pipeline {
            Pipeline::Exact { use_size: true, .. } => CsvLayout::SizeHashPath,
            _ => CsvLayout::KeyPathSize,
        }
    }
}

fn warn_unused_flags(cli: &Cli) {
    let ignored = match cli.mode {
        MatchMode::Exact => vec![
            ("--ext", !cli.extensions.is_empty()),
            ("--perceptual", cli.perceptual_algorithm.is_some()),
            ("--max-distance", cli.max_distance.is_some()),
            ("--pattern", cli.pattern.is_some()),
        ],
        MatchMode::Image => vec![
            ("--hash", cli.hash_algorithm.is_some()),
            ("--no-size", cli.no_size),
            ("--pattern", cli.pattern.is_some()),
        ],
        MatchMode::Filename => vec![
            ("--hash", cli.hash_algorithm.is_some()),
            ("--no-size", cli.no_size),
            ("--ext", !cli.extensions.is_empty()),
            ("--max-distance", cli.max_distance.is_some()),
        ],
    };
    for (flag, _) in ignored.into_iter().filter(|&(_, set)| set) {
        log::warn!("{} has no effect in {} mode", flag, cli.mode);
    }
}
