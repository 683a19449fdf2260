//! Typed errors for path resolution.
//!
//! Resolution either yields one validated path or fails with one of these
//! kinds; no partial results, no internal retries. Reader modules layered on
//! top use `anyhow` and attach context instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// No explicit results root and neither environment variable is set.
    #[error(
        "no results directory configured: pass an explicit path or set \
         EPX_RESULTS or EPX_HOME"
    )]
    NoResultsConfigured,

    /// A supplied or constructed path does not exist as the expected kind.
    #[error("'{}' does not exist or is not a directory", path.display())]
    PathNotFound { path: PathBuf },

    /// A job key has no entry in the results tree's `KEY` index.
    #[error("job key '{key}' not found in {}", results.display())]
    UnknownJobKey { key: String, results: PathBuf },

    /// A required parameter could not be derived from the request.
    #[error("missing parameter: '{name}' is required and no explicit path was given")]
    MissingParameter { name: &'static str },

    /// No tier of the job request yielded a usable selector.
    #[error("no job selector supplied: pass a job path, job id, or job key")]
    NoJobSelector,

    /// The `KEY` index exists but could not be read.
    #[error("failed to read job key index {}", path.display())]
    KeyIndexRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `KEY` index line is not a `<key> <id>` pair.
    #[error("malformed job key index {}: line {line} is not a 'key id' pair", path.display())]
    MalformedKeyIndex { path: PathBuf, line: usize },
}
