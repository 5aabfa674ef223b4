//! Output formatters for duplicate groups.
//!
//! This module provides the report formats:
//! - CSV for spreadsheets and scripts ([`csv::CsvOutput`])
//! - XML results documents in the interchange layout used by dupeGuru ([`xml::XmlOutput`])
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{find_exact, ExactConfig};
//! use dupfind::events::LogSink;
//! use dupfind::output::{write_groups, OutputFormat};
//! use std::path::PathBuf;
//!
//! let (groups, _) = find_exact(&[PathBuf::from(".")], &ExactConfig::default(), &LogSink).unwrap();
//! write_groups(OutputFormat::Csv, &groups, std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod xml;

use std::io;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

// Re-export main types
pub use self::csv::{CsvLayout, CsvOutput};
pub use self::xml::XmlOutput;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited table, one row per file
    #[default]
    Csv,
    /// Interchange XML results document
    Xml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// The groups cannot be expressed in the requested format.
    #[error("{format} output is not supported for {what}")]
    UnsupportedFormat {
        /// Requested format
        format: OutputFormat,
        /// What could not be written
        what: &'static str,
    },
}

/// Write `groups` to `writer` in `format`.
///
/// CSV uses [`CsvLayout::for_groups`] to pick its columns.
///
/// # Errors
///
/// Returns `OutputError` if writing fails or the format cannot express the groups.
pub fn write_groups<W: io::Write>(
    format: OutputFormat,
    groups: &[DuplicateGroup],
    writer: W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => CsvOutput::new(groups).write_to(writer),
        OutputFormat::Xml => XmlOutput::new(groups).write_to(writer),
    }
}
