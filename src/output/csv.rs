//! CSV output formatter for duplicate groups.
//!
//! One row is generated for each file of each group. The header is always
//! written, even when there are no groups.
//!
//! # Layouts
//!
//! - [`CsvLayout::SizeHashPath`]: `size,hash,path`, used for exact matches
//!   bucketed by size (hash in hexadecimal)
//! - [`CsvLayout::KeyPathSize`]: `key,path,size`, used for everything else;
//!   the key is the digest in hex, the filename key, or `distance:cluster`
//!   for image groups
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{find_exact, ExactConfig};
//! use dupfind::events::LogSink;
//! use dupfind::output::csv::CsvOutput;
//! use std::path::PathBuf;
//!
//! let (groups, _) = find_exact(&[PathBuf::from(".")], &ExactConfig::default(), &LogSink).unwrap();
//!
//! let output = CsvOutput::new(&groups);
//! output.write_to(std::io::stdout()).unwrap();
//! ```

use std::io;

use serde::Serialize;

use super::OutputError;
use crate::duplicates::{DuplicateGroup, GroupKey};

/// Column layout of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    /// `size,hash,path`
    SizeHashPath,
    /// `key,path,size`
    KeyPathSize,
}

impl CsvLayout {
    /// `SizeHashPath` when every group is a size-bucketed content match,
    /// `KeyPathSize` otherwise (including when there are no groups).
    #[must_use]
    pub fn for_groups(groups: &[DuplicateGroup]) -> Self {
        let bucketed = !groups.is_empty()
            && groups
                .iter()
                .all(|g| matches!(g.key, GroupKey::Content { size: Some(_), .. }));
        if bucketed {
            Self::SizeHashPath
        } else {
            Self::KeyPathSize
        }
    }

    fn header(self) -> [&'static str; 3] {
        match self {
            Self::SizeHashPath => ["size", "hash", "path"],
            Self::KeyPathSize => ["key", "path", "size"],
        }
    }
}

#[derive(Debug, Serialize)]
struct SizeHashRow {
    size: u64,
    hash: String,
    path: String,
}

#[derive(Debug, Serialize)]
struct KeyPathRow {
    key: String,
    path: String,
    size: u64,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
    layout: CsvLayout,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter, choosing the layout from the groups.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self {
            groups,
            layout: CsvLayout::for_groups(groups),
        }
    }

    /// Force a column layout.
    #[must_use]
    pub fn with_layout(mut self, layout: CsvLayout) -> Self {
        self.layout = layout;
        self
    }

    /// The layout that will be written.
    #[must_use]
    pub fn layout(&self) -> CsvLayout {
        self.layout
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), OutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(self.layout.header())?;

        for group in self.groups {
            let key = group.key.label();
            for file in &group.files {
                let path = file.path.to_string_lossy().into_owned();
                match self.layout {
                    CsvLayout::SizeHashPath => csv_writer.serialize(SizeHashRow {
                        size: file.size,
                        hash: key.clone(),
                        path,
                    })?,
                    CsvLayout::KeyPathSize => csv_writer.serialize(KeyPathRow {
                        key: key.clone(),
                        path,
                        size: file.size,
                    })?,
                }
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, OutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
