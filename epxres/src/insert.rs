//! Merging jobs between results trees.
//!
//! The one writing module in the crate: copies job directories into a
//! destination results tree and rewrites its `KEY`/`ID` index. Everything
//! else treats results trees as read-only.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::env::EnvSource;
use crate::keys::{load_job_keys, write_job_keys};
use crate::resolve::{self, JOB_DIR, ResolveRequest};

/// Options for inserting a single job.
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Key to register the job under; defaults to the job's own `META/KEY`.
    pub key: Option<String>,
    /// Replace an existing job registered under the same key.
    pub force: bool,
}

/// Merge every job of a `source` results tree into the destination tree.
///
/// The destination is resolved from `req` and the environment like any other
/// results root. A source without a `KEY` file (or with an empty one) is an
/// error: there is nothing to merge.
pub fn merge_results(
    source: &Path,
    req: &ResolveRequest,
    env: &dyn EnvSource,
    force: bool,
) -> Result<()> {
    let source = resolve::results_root(&ResolveRequest::new().results_root(source), env)
        .context("resolve source results")?;
    let source_keys = load_job_keys(&source)?;
    if source_keys.is_empty() {
        bail!(
            "{} is empty or does not contain a KEY file, nothing to merge",
            source.display()
        );
    }

    let destination = resolve::results_root(req, env)?;
    info!(
        source = %source.display(),
        destination = %destination.display(),
        jobs = source_keys.len(),
        "merging results"
    );

    for (job_key, job_id) in &source_keys {
        let job_dir = source.join(JOB_DIR).join(job_id.to_string());
        let options = InsertOptions {
            key: Some(job_key.clone()),
            force,
        };
        insert_job(&job_dir, &options, req, env)
            .with_context(|| format!("insert job '{job_key}'"))?;
    }
    info!("merge complete");
    Ok(())
}

/// Insert one job directory into the destination results tree.
///
/// A job already registered under the same key keeps its id and is replaced
/// when `force` is set; a new key gets the next free id (highest existing
/// plus one, or 1 in an empty tree). Returns the id the job was registered
/// under.
pub fn insert_job(
    job_dir: &Path,
    options: &InsertOptions,
    req: &ResolveRequest,
    env: &dyn EnvSource,
) -> Result<u32> {
    let job_key = match &options.key {
        Some(key) => key.clone(),
        None => read_job_key(job_dir)?,
    };
    validate_job_key(&job_key)?;

    let destination_root = resolve::results_root(req, env)?;
    let mut local_keys = load_job_keys(&destination_root)?;

    if !options.force && local_keys.contains_key(&job_key) {
        bail!(
            "job key '{job_key}' is already present in {}; pass force to replace it \
             or pick a different key",
            destination_root.display()
        );
    }

    let job_id = match local_keys.get(&job_key) {
        Some(id) => *id,
        None => local_keys.values().max().map_or(1, |max| max + 1),
    };

    let destination = destination_root.join(JOB_DIR).join(job_id.to_string());
    if destination.exists() {
        debug!(job = %destination.display(), "removing existing job directory");
        fs::remove_dir_all(&destination)
            .with_context(|| format!("remove {}", destination.display()))?;
    }

    local_keys.insert(job_key.clone(), job_id);
    write_job_keys(&destination_root, &local_keys)?;

    info!(
        key = %job_key,
        job_id,
        destination = %destination.display(),
        "inserting job"
    );
    copy_dir_recursive(job_dir, &destination)?;
    Ok(job_id)
}

fn read_job_key(job_dir: &Path) -> Result<String> {
    let path = job_dir.join("META/KEY");
    if !path.is_file() {
        bail!("{} does not contain META/KEY", job_dir.display());
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    Ok(contents.trim().to_string())
}

/// A usable job key is non-empty, single-line, and at most 1000 bytes.
fn validate_job_key(job_key: &str) -> Result<()> {
    if job_key.is_empty() {
        bail!("job key must be non-empty");
    }
    if job_key.contains('\n') {
        bail!("job key must be a single line");
    }
    if job_key.len() > 1000 {
        bail!("job key exceeds 1000 bytes");
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !src.exists() {
        return Err(anyhow!("missing {}", src.display()));
    }
    fs::create_dir_all(dst).with_context(|| format!("create {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("read {}", src.display()))? {
        let entry = entry.context("read entry")?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).with_context(|| format!("copy {}", path.display()))?;
        }
    }
    Ok(())
}
