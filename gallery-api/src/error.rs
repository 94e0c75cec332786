//! Errors and diagnostics
//!
//! `GalleryError` is returned by operations that can fail outright (configuration,
//! a single http request, a persistence write). The top-level gallery operations
//! (load, cast vote, toggle favorite) never fail: they degrade a feature and
//! record a [`Diagnostic`] instead.
//!
use std::{collections::VecDeque, fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use snafu::prelude::*;

use crate::config::DIAGNOSTICS_CAPACITY;

/// Errors returned by gallery crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GalleryError {
    // Http connection or timeout error
    #[snafu(display("HTTP error {method} url:{url}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Remote service responded with an error status.
    #[snafu(display("Api Server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: u16,
        method: String,
        url: String,
        message: String,
    },

    /// Encountered server error on "retryable" request, but all retry attempts failed.
    #[snafu(display("server api request: failed {n} times"))]
    TooManyRetries { n: u32 },

    /// Deserialization error: a catalog file or service response did not match the expected shape.
    #[snafu(display("Deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. unlikely to occur.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Local file could not be read
    #[snafu(display("file {path:?}: {source}"))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Tally service is not configured or was unreachable at startup.
    #[snafu(display("Voting is unavailable"))]
    VotingUnavailable,

    /// Error from the favorites persistence backend
    #[snafu(display("Favorites: {source}"))]
    Favorites { source: FavoritesError },

    /// Invalid parameter
    #[snafu(display("Validation error: {message}"))]
    Validation { message: String },

    /// Expected item was not found.
    #[snafu(display("{obj_type} {key} not found"))]
    NotFound { obj_type: String, key: String },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

impl GalleryError {
    /// True for transport-level failures (service unreachable, timeouts)
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::TooManyRetries { .. })
    }
}

/// Errors arising from a `FavoriteStore`
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FavoritesError {
    /// Problem accessing the favorites file
    #[snafu(display("favorites file {path:?} {source}"))]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Stored value was not a json list of ids
    #[snafu(display("favorites encoding: {source}"))]
    Encoding { source: serde_json::Error },
}

impl From<FavoritesError> for GalleryError {
    fn from(source: FavoritesError) -> Self {
        Self::Favorites { source }
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Kind of non-fatal degradation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticKind {
    /// Catalog or suggestion source unreachable or malformed; catalog is empty
    LoadFailure,
    /// Tally service unconfigured or unreachable at startup; voting disabled
    RemoteVotingUnavailable,
    /// Remote write for a cast vote failed; local state kept
    VoteSyncFailure,
    /// Tally or personal-vote refresh failed; previous values kept
    TallyRefreshFailure,
    /// Favorites could not be read or written; in-memory set kept
    FavoritesPersistFailure,
}

/// One recorded degradation
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.at.format("%H:%M:%S"), self.kind, self.message)
    }
}

/// Bounded in-memory log of degradations, most recent last.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<VecDeque<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a degradation, dropping the oldest entry when full.
    pub fn record(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let entry = Diagnostic {
            kind,
            message: message.into(),
            at: Utc::now(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == DIAGNOSTICS_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns a copy of all recorded entries.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns true if any entry of the given kind was recorded.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.lock().iter().any(|entry| entry.kind == kind)
    }

    /// Most recent entry of the given kind
    pub fn last(&self, kind: DiagnosticKind) -> Option<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .rev()
            .find(|entry| entry.kind == kind)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
