//! Snapshot archives produced at checkpoints during a run.
//!
//! Snapshots live under `<job>/OUT` as `snapshot.<YYYY-MM-DD>.tgz`; the
//! completed ones are listed in `OUT/completed-snapshots.txt`. Older
//! simulator versions wrote a single undated `snapshot.tgz`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::env::EnvSource;
use crate::resolve::{self, OUT_DIR, ResolveRequest};

/// Listing of completed snapshots, newest last.
const COMPLETED_LIST: &str = "completed-snapshots.txt";

/// Undated snapshot filename written by pre-7.9 simulators.
const LEGACY_SNAPSHOT: &str = "snapshot.tgz";

/// Resolve the path to a snapshot file within a job.
///
/// An explicit `snapshot_path` in the request is returned as-is, regardless
/// of `date` or any job selector. Otherwise, with a `date`, the dated
/// filename is built directly; without one the last entry of
/// `completed-snapshots.txt` is used, falling back to the legacy
/// `snapshot.tgz`. The job tier follows [`resolve::job_path`], so an
/// explicit job path in the request wins over ids and keys.
pub fn snapshot_path(
    date: Option<NaiveDate>,
    req: &ResolveRequest,
    env: &dyn EnvSource,
) -> Result<PathBuf> {
    if let Some(path) = &req.snapshot_path {
        if !path.is_file() {
            bail!("snapshot '{}' does not exist", path.display());
        }
        return Ok(path.clone());
    }

    let job = resolve::job_path(req, env)?;
    let out_dir = job.join(OUT_DIR);

    let filename = match date {
        Some(date) => format!("snapshot.{}.tgz", date.format("%Y-%m-%d")),
        None => match fs::read_to_string(out_dir.join(COMPLETED_LIST)) {
            Ok(listing) => listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .map(str::to_string)
                .unwrap_or_else(|| LEGACY_SNAPSHOT.to_string()),
            Err(_) => LEGACY_SNAPSHOT.to_string(),
        },
    };

    let path = out_dir.join(&filename);
    if !path.is_file() {
        bail!(
            "snapshot '{filename}' does not exist in {}",
            out_dir.display()
        );
    }
    Ok(path)
}

/// One snapshot file on disk.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    /// Resolve and open a snapshot within a job.
    pub fn open(
        date: Option<NaiveDate>,
        req: &ResolveRequest,
        env: &dyn EnvSource,
    ) -> Result<Self> {
        let path = snapshot_path(date, req, env)?;
        Ok(Self { path })
    }

    /// Open a snapshot at an explicit path, bypassing job resolution.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            bail!("snapshot '{}' does not exist", path.display());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        self.path
            .file_name()
            .map(|name| name.to_str().unwrap_or_default())
            .unwrap_or_default()
    }

    /// The simulation date stamped into the filename.
    ///
    /// Legacy `snapshot.tgz` files carry no date and yield `None`.
    pub fn date(&self) -> Option<NaiveDate> {
        let mut pieces = self.filename().split('.');
        let date = match (pieces.next(), pieces.next(), pieces.next(), pieces.next()) {
            (Some("snapshot"), Some(date), Some("tgz"), None) => date,
            _ => {
                warn!(snapshot = %self.filename(), "snapshot has no simulation date");
                return None;
            }
        };
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// Delete the snapshot file from disk.
    pub fn delete(self) -> Result<()> {
        info!(snapshot = %self.path.display(), "deleting snapshot");
        fs::remove_file(&self.path)
            .with_context(|| format!("delete snapshot {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MapEnv, ResultsFixture};

    fn dated(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("date")
    }

    #[test]
    fn dated_snapshot_builds_filename() {
        let fixture = ResultsFixture::create();
        let out = fixture.root().join("JOB/1/OUT");
        fs::write(out.join("snapshot.2025-01-03.tgz"), b"archive").expect("snapshot");

        let req = ResolveRequest::new().job_id(1);
        let path = snapshot_path(Some(dated(2025, 1, 3)), &req, &fixture.env()).expect("path");
        assert_eq!(path, out.join("snapshot.2025-01-03.tgz"));
    }

    #[test]
    fn explicit_snapshot_path_wins_over_date_and_job() {
        let fixture = ResultsFixture::create();
        let explicit = fixture.root().join("JOB/1/OUT/snapshot.2025-01-01.tgz");
        fs::write(&explicit, b"archive").expect("snapshot");

        // Neither the bogus job id nor the date is consulted, and no
        // environment is needed.
        let req = ResolveRequest::new().snapshot_path(&explicit).job_id(99);
        let path =
            snapshot_path(Some(dated(2030, 12, 31)), &req, &MapEnv::default()).expect("path");
        assert_eq!(path, explicit);

        let snapshot = Snapshot::open(None, &req, &MapEnv::default()).expect("open");
        assert_eq!(snapshot.date(), Some(dated(2025, 1, 1)));
    }

    #[test]
    fn missing_explicit_snapshot_is_an_error() {
        let req = ResolveRequest::new().snapshot_path("/no/such/snapshot.tgz");
        let err = snapshot_path(None, &req, &MapEnv::default()).expect_err("missing");
        assert!(err.to_string().contains("/no/such/snapshot.tgz"));
    }

    #[test]
    fn undated_uses_completed_listing() {
        let fixture = ResultsFixture::create();
        let out = fixture.root().join("JOB/1/OUT");
        fs::write(out.join("snapshot.2025-01-02.tgz"), b"older").expect("snapshot");
        fs::write(out.join("snapshot.2025-01-03.tgz"), b"newer").expect("snapshot");
        fs::write(
            out.join("completed-snapshots.txt"),
            "snapshot.2025-01-02.tgz\nsnapshot.2025-01-03.tgz\n",
        )
        .expect("listing");

        let snapshot =
            Snapshot::open(None, &ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        assert_eq!(snapshot.filename(), "snapshot.2025-01-03.tgz");
        assert_eq!(snapshot.date(), Some(dated(2025, 1, 3)));
    }

    #[test]
    fn missing_listing_falls_back_to_legacy_name() {
        let fixture = ResultsFixture::create();
        let out = fixture.root().join("JOB/1/OUT");
        fs::write(out.join("snapshot.tgz"), b"legacy").expect("snapshot");

        let snapshot =
            Snapshot::open(None, &ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        assert_eq!(snapshot.filename(), "snapshot.tgz");
        assert_eq!(snapshot.date(), None);
    }

    #[test]
    fn absent_snapshot_is_an_error() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_id(1);
        let err =
            snapshot_path(Some(dated(2030, 12, 31)), &req, &fixture.env()).expect_err("absent");
        assert!(err.to_string().contains("snapshot.2030-12-31.tgz"));
    }

    #[test]
    fn delete_removes_the_file() {
        let fixture = ResultsFixture::create();
        let out = fixture.root().join("JOB/1/OUT");
        let path = out.join("snapshot.2025-01-03.tgz");
        fs::write(&path, b"archive").expect("snapshot");

        let snapshot = Snapshot::at(&path).expect("open");
        snapshot.delete().expect("delete");
        assert!(!path.exists());
    }
}
