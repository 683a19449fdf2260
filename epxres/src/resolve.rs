//! Path resolution for results trees, jobs, and runs.
//!
//! Every simulator output lives under a fixed layout:
//!
//! ```text
//! <results_root>/
//!   KEY                  job-key -> job-id index, one pair per line
//!   ID                   next job id to allocate
//!   JOB/<job_id>/
//!     META/              job metadata (KEY, STATUS)
//!     OUT/RUN<run_id>/   per-run output
//! ```
//!
//! Callers describe what they want with a [`ResolveRequest`] and get back one
//! validated absolute path. Each resolver walks its precedence tiers in
//! order, consulting a lower tier only when every field of the higher tier is
//! absent; fields from different tiers are never combined to complete a
//! single path. Resolution is read-only and idempotent.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::env::{EnvSource, default_results_root, expand_tilde};
use crate::error::ResolveError;
use crate::keys;

/// Subdirectory of the results root holding one directory per job.
pub const JOB_DIR: &str = "JOB";

/// Subdirectory of a job directory holding per-run output.
pub const OUT_DIR: &str = "OUT";

/// Directory name prefix for a run: `RUN<run_id>`.
pub const RUN_PREFIX: &str = "RUN";

/// Job-key index filename directly under the results root.
pub const KEY_INDEX: &str = "KEY";

/// Next-job-id filename directly under the results root.
pub const ID_FILE: &str = "ID";

/// One resolution request: an immutable bag of optional selectors.
///
/// Fields are grouped by precedence tier. An explicit path always beats a
/// constructed one; a job id beats a job key; the `EPX_RESULTS`/`EPX_HOME`
/// environment default is consulted only when `results_root` is absent.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Explicit results root, overriding the environment default.
    pub results_root: Option<PathBuf>,
    /// Explicit job directory; when set, job resolution returns it as-is.
    pub job_path: Option<PathBuf>,
    /// Explicit run directory; when set, run resolution returns it as-is.
    pub run_path: Option<PathBuf>,
    /// Explicit snapshot file; when set, snapshot resolution returns it
    /// as-is, ignoring any date.
    pub snapshot_path: Option<PathBuf>,
    /// Job id, mapping to `JOB/<id>` under the results root.
    pub job_id: Option<u32>,
    /// Job key, mapped to an id via the results root's `KEY` index.
    pub job_key: Option<String>,
    /// Run id, mapping to `OUT/RUN<id>` under the job directory.
    pub run_id: Option<u32>,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_root = Some(path.into());
        self
    }

    pub fn job_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.job_path = Some(path.into());
        self
    }

    pub fn run_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_path = Some(path.into());
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn job_id(mut self, id: u32) -> Self {
        self.job_id = Some(id);
        self
    }

    pub fn job_key(mut self, key: impl Into<String>) -> Self {
        self.job_key = Some(key.into());
        self
    }

    pub fn run_id(mut self, id: u32) -> Self {
        self.run_id = Some(id);
        self
    }
}

/// Resolve the results root directory.
///
/// Precedence: explicit `results_root` (verbatim after `~`-expansion), then
/// the environment default. The resolved path must be an existing directory.
pub fn results_root(req: &ResolveRequest, env: &dyn EnvSource) -> Result<PathBuf, ResolveError> {
    let candidate = match &req.results_root {
        Some(path) => match path.to_str() {
            Some(raw) => expand_tilde(raw),
            None => path.clone(),
        },
        None => default_results_root(env)?,
    };
    let root = validate_dir(&candidate)?;
    debug!(root = %root.display(), "resolved results root");
    Ok(root)
}

/// Resolve a job directory.
///
/// Precedence: explicit `job_path`, then `<root>/JOB/<job_id>`, then the
/// `job_key` translated to an id via the root's `KEY` index. A higher tier
/// wins silently when several selectors are supplied. Fails with
/// [`ResolveError::NoJobSelector`] when no tier yields a selector.
pub fn job_path(req: &ResolveRequest, env: &dyn EnvSource) -> Result<PathBuf, ResolveError> {
    if let Some(path) = &req.job_path {
        let job = validate_dir(path)?;
        debug!(job = %job.display(), "resolved job from explicit path");
        return Ok(job);
    }

    let root = results_root(req, env)?;
    let job_id = match (req.job_id, &req.job_key) {
        (Some(id), _) => id,
        (None, Some(key)) => keys::job_id_for_key(&root, key)?,
        (None, None) => return Err(ResolveError::NoJobSelector),
    };

    let job = validate_dir(&root.join(JOB_DIR).join(job_id.to_string()))?;
    debug!(job = %job.display(), job_id, "resolved job");
    Ok(job)
}

/// Resolve a run directory.
///
/// Precedence: explicit `run_path`, then `<job>/OUT/RUN<run_id>` where the
/// job tier comes from [`job_path`] (so an explicit job path combined with a
/// `run_id` builds the run under that path). Fails with
/// [`ResolveError::MissingParameter`] when no `run_id` is derivable and no
/// explicit run path was given.
pub fn run_path(req: &ResolveRequest, env: &dyn EnvSource) -> Result<PathBuf, ResolveError> {
    if let Some(path) = &req.run_path {
        let run = validate_dir(path)?;
        debug!(run = %run.display(), "resolved run from explicit path");
        return Ok(run);
    }

    let run_id = req
        .run_id
        .ok_or(ResolveError::MissingParameter { name: "run_id" })?;
    let job = job_path(req, env)?;
    let run = validate_dir(&job.join(OUT_DIR).join(format!("{RUN_PREFIX}{run_id}")))?;
    debug!(run = %run.display(), run_id, "resolved run");
    Ok(run)
}

/// Absolutize `path` and require it to be an existing directory.
fn validate_dir(path: &Path) -> Result<PathBuf, ResolveError> {
    let absolute = std::path::absolute(path).map_err(|_| ResolveError::PathNotFound {
        path: path.to_path_buf(),
    })?;
    if !absolute.is_dir() {
        return Err(ResolveError::PathNotFound { path: absolute });
    }
    Ok(absolute)
}
