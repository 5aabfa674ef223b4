//! Diagnostic events emitted by the scanning pipelines.
//!
//! Pipelines never swallow a file silently: every file excluded from a run
//! (unreadable entry, vanished file, structurally invalid content, corrupt
//! image) is reported as a [`ScanEvent`] to the [`EventSink`] the caller passes
//! in. The CLI uses [`LogSink`], which forwards events to the `log` facade;
//! tests use [`CollectingSink`] to assert on exactly what was excluded.
//!
//! # Example
//!
//! ```
//! use dupfind::events::{CollectingSink, EventSink, ScanEvent};
//! use std::path::PathBuf;
//!
//! let sink = CollectingSink::new();
//! sink.emit(ScanEvent::DirectoryPruned { path: PathBuf::from("/repo/.git") });
//! assert_eq!(sink.len(), 1);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::scanner::perceptual::PerceptualError;
use crate::scanner::{HashError, ScanError};

/// A single diagnostic produced while scanning.
#[derive(Debug)]
pub enum ScanEvent {
    /// A directory matched the ignore set and was not descended into.
    DirectoryPruned {
        /// Directory that was pruned
        path: PathBuf,
    },
    /// A directory entry could not be listed or stat'ed.
    TraversalFailed(ScanError),
    /// A file could not be read for content hashing.
    HashFailed(HashError),
    /// The content hasher refused a file because of its structure.
    HashSkipped {
        /// File that was skipped
        path: PathBuf,
        /// Why the hasher refused it
        reason: String,
    },
    /// An image could not be opened or decoded.
    DecodeFailed(PerceptualError),
    /// A filename produced no substitution for the configured pattern.
    NameUnmatched {
        /// File whose name did not match
        path: PathBuf,
    },
}

impl ScanEvent {
    /// Path the event refers to, when it has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::DirectoryPruned { path }
            | Self::HashSkipped { path, .. }
            | Self::NameUnmatched { path } => Some(path),
            Self::TraversalFailed(e) => e.path(),
            Self::HashFailed(e) => Some(e.path()),
            Self::DecodeFailed(e) => Some(e.path()),
        }
    }

    /// Whether this event removed a file from a run because of an error.
    ///
    /// Pruned directories and unmatched filenames are expected outcomes and
    /// do not count towards a partial-success exit code.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::TraversalFailed(_) | Self::HashFailed(_) | Self::DecodeFailed(_)
        )
    }
}

impl std::fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryPruned { path } => write!(f, "Skipped: {}", path.display()),
            Self::TraversalFailed(e) => write!(f, "{}", e),
            Self::HashFailed(e) => write!(f, "{}", e),
            Self::HashSkipped { path, reason } => {
                write!(f, "Skipped {}: {}", path.display(), reason)
            }
            Self::DecodeFailed(e) => write!(f, "{}", e),
            Self::NameUnmatched { path } => write!(f, "No match: {}", path.display()),
        }
    }
}

/// Receiver for scan diagnostics.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: ScanEvent);
}

/// Forwards events to the `log` facade.
///
/// Errors are logged at warn level, structural skips and pruned directories
/// at info, unmatched filenames at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: ScanEvent) {
        match &event {
            ScanEvent::TraversalFailed(_)
            | ScanEvent::HashFailed(_)
            | ScanEvent::DecodeFailed(_) => log::warn!("{}", event),
            ScanEvent::DirectoryPruned { .. } | ScanEvent::HashSkipped { .. } => {
                log::info!("{}", event)
            }
            ScanEvent::NameUnmatched { .. } => log::debug!("{}", event),
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no event has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of recorded events that excluded a file because of an error.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.lock().iter().filter(|e| e.is_error()).count()
    }

    /// Paths of all recorded events, in emission order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter_map(|e| e.path().map(Path::to_path_buf))
            .collect()
    }

    /// Take ownership of the recorded events, leaving the sink empty.
    #[must_use]
    pub fn take(&self) -> Vec<ScanEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScanEvent>> {
        // A panic while holding the lock leaves the Vec intact; keep using it.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: ScanEvent) {
        self.lock().push(event);
    }
}

/// Counts events, then passes them on to another sink.
#[derive(Debug, Default)]
pub struct CountingSink<S> {
    inner: S,
    events: AtomicUsize,
    errors: AtomicUsize,
}

impl<S: EventSink> CountingSink<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            events: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    /// Number of events seen.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::Relaxed)
    }

    /// Number of events that excluded a file because of an error.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl<S: EventSink> EventSink for CountingSink<S> {
    fn emit(&self, event: ScanEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        if event.is_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.emit(event);
    }
}
