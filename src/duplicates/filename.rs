//! Grouping by a key derived from the file name.
//!
//! A [`FilenameMatcher`] applies a regex substitution to each base name. Files
//! whose name does not match the pattern are reported as
//! [`ScanEvent::NameUnmatched`] and left out; the rest are grouped by the
//! substituted key.
//!
//! # Example
//!
//! ```
//! use dupfind::duplicates::FilenameMatcher;
//!
//! let matcher = FilenameMatcher::new(r"^(.*)_v\d+\.txt$", "$1").unwrap();
//! assert_eq!(matcher.key("report_v2.txt").as_deref(), Some("report"));
//! assert_eq!(matcher.key("notes.txt"), None);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;

use super::finder::{FinderError, ScanOptions};
use super::groups::{DuplicateGroup, GroupKey};
use crate::events::{EventSink, ScanEvent};
use crate::scanner::FileEntry;

/// Default replacement: the first capture group.
pub const DEFAULT_REPLACEMENT: &str = "$1";

/// Derives grouping keys from file names.
#[derive(Debug, Clone)]
pub struct FilenameMatcher {
    regex: Regex,
    replacement: String,
}

impl FilenameMatcher {
    /// Compile `pattern` and pair it with `replacement`.
    ///
    /// The replacement uses the `regex` crate syntax: `$1` or `${name}`.
    /// Write `${1}` when the group number is followed by a word character.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, FinderError> {
        let regex = Regex::new(pattern).map_err(|source| FinderError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            replacement: replacement.to_string(),
        })
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Key for `name`, or `None` when the pattern makes no substitution.
    #[must_use]
    pub fn key(&self, name: &str) -> Option<String> {
        if !self.regex.is_match(name) {
            return None;
        }
        Some(
            self.regex
                .replace_all(name, self.replacement.as_str())
                .into_owned(),
        )
    }
}

/// Statistics from a filename run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameStats {
    /// Files yielded by the walker (or passed in)
    pub files_seen: usize,
    /// Files whose name matched the pattern
    pub files_matched: usize,
    /// Distinct keys among matched files
    pub distinct_keys: usize,
    /// Number of groups emitted
    pub duplicate_groups: usize,
}

/// Run the filename pipeline over `roots`.
///
/// # Errors
///
/// Returns `FinderError` if a root is invalid or the run is interrupted.
pub fn find_by_filename(
    roots: &[PathBuf],
    matcher: &FilenameMatcher,
    scan: &ScanOptions,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, FilenameStats), FinderError> {
    log::info!("Starting filename scan (pattern {})", matcher.pattern());
    let files = scan.collect(roots, events)?;
    find_by_filename_in_files(files, matcher, scan, events)
}

/// Run the filename pipeline over already collected files.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if shutdown is requested.
pub fn find_by_filename_in_files(
    files: Vec<FileEntry>,
    matcher: &FilenameMatcher,
    scan: &ScanOptions,
    events: &dyn EventSink,
) -> Result<(Vec<DuplicateGroup>, FilenameStats), FinderError> {
    let mut stats = FilenameStats {
        files_seen: files.len(),
        ..FilenameStats::default()
    };

    let mut by_key: BTreeMap<String, Vec<FileEntry>> = BTreeMap::new();
    scan.phase_start("filename", files.len());
    for (i, file) in files.into_iter().enumerate() {
        scan.check_shutdown()?;
        scan.item_done(i + 1, &file);

        match matcher.key(&file.file_name()) {
            Some(key) => {
                stats.files_matched += 1;
                by_key.entry(key).or_default().push(file);
            }
            None => events.emit(ScanEvent::NameUnmatched { path: file.path }),
        }
    }
    scan.phase_end("filename");

    stats.distinct_keys = by_key.len();
    let groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(key, files)| DuplicateGroup::new(GroupKey::Name(key), files))
        .collect();
    stats.duplicate_groups = groups.len();

    log::info!(
        "Filename match complete: {} of {} names matched → {} groups",
        stats.files_matched,
        stats.files_seen,
        stats.duplicate_groups
    );

    Ok((groups, stats))
}
