//! dupfind - Duplicate File Finder
//!
//! Finds groups of duplicate files under one or more directory trees and
//! writes them as CSV or as a dupeGuru-compatible XML results document.
//!
//! Three matching modes are available:
//! - exact content, with files bucketed by size before hashing
//! - visually similar images, clustered per distance level through a BK-tree
//! - a key derived from each file name by a regex substitution

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod events;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Pipeline, RunPlan};
use crate::config::Config;
use crate::duplicates::{
    find_by_filename, find_exact, find_similar_images, DuplicateGroup, ExactConfig, SimilarConfig,
};
use crate::error::ExitCode;
use crate::events::{CountingSink, EventSink, LogSink};
use crate::output::{CsvOutput, OutputFormat, XmlOutput};
use crate::progress::Progress;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration or arguments, an unreadable
/// root, an interrupt, or a failed report write. Per-file problems are
/// logged and reflected in the returned exit code instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut plan = RunPlan::from_cli(&cli, &config)?;

    let shutdown = signal::install_handler()?;
    plan.scan = plan.scan.with_shutdown_flag(shutdown.get_flag());
    if !cli.no_progress && !cli.quiet {
        plan.scan = plan
            .scan
            .with_progress_callback(Arc::new(Progress::new(false)));
    }

    let sink = CountingSink::new(LogSink);
    let groups = run_pipeline(&plan, &sink)?;

    match plan.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_report(&plan, &groups, BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_report(&plan, &groups, stdout.lock()).context("Failed to write report")?;
        }
    }

    let duplicate_files: usize = groups.iter().map(DuplicateGroup::len).sum();
    log::info!(
        "{} groups, {} files ({} events, {} excluded by errors)",
        groups.len(),
        duplicate_files,
        sink.event_count(),
        sink.error_count()
    );

    Ok(ExitCode::for_outcome(groups.len(), sink.error_count()))
}

/// Run the pipeline a plan selects.
///
/// # Errors
///
/// Returns an error if a root is invalid or the run is interrupted.
pub fn run_pipeline(plan: &RunPlan, events: &dyn EventSink) -> anyhow::Result<Vec<DuplicateGroup>> {
    let groups = match plan.pipeline {
        Pipeline::Exact {
            algorithm,
            use_size,
        } => {
            let config = ExactConfig::default()
                .with_scan_options(plan.scan.clone())
                .with_algorithm(algorithm)
                .with_size_bucketing(use_size);
            let (groups, stats) =
                find_exact(&plan.roots, &config, events).context("Exact scan failed")?;
            log::info!(
                "Hashed {} of {} files, wasted space {} bytes",
                stats.files_hashed,
                stats.files_seen,
                stats.wasted_space
            );
            groups
        }
        Pipeline::Image {
            algorithm,
            ref extensions,
            max_distance,
        } => {
            let config = SimilarConfig::default()
                .with_scan_options(plan.scan.clone())
                .with_algorithm(algorithm)
                .with_extensions(extensions.clone())
                .with_max_distance(max_distance);
            let (groups, stats) =
                find_similar_images(&plan.roots, &config, events).context("Image scan failed")?;
            log::info!(
                "Indexed {} of {} images ({} distinct fingerprints)",
                stats.images_indexed,
                stats.candidate_images,
                stats.distinct_vectors
            );
            groups
        }
        Pipeline::Filename(ref matcher) => {
            let (groups, stats) = find_by_filename(&plan.roots, matcher, &plan.scan, events)
                .context("Filename scan failed")?;
            log::info!(
                "{} of {} names matched",
                stats.files_matched,
                stats.files_seen
            );
            groups
        }
    };
    Ok(groups)
}

/// Write `groups` in the plan's format and flush.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(
    plan: &RunPlan,
    groups: &[DuplicateGroup],
    mut writer: W,
) -> anyhow::Result<()> {
    match plan.format {
        OutputFormat::Csv => CsvOutput::new(groups)
            .with_layout(plan.csv_layout())
            .write_to(&mut writer)?,
        OutputFormat::Xml => XmlOutput::new(groups).write_to(&mut writer)?,
    }
    writer.flush()?;
    Ok(())
}
