//! Read access to one job's results.
//!
//! A job directory (`<results_root>/JOB/<id>`) holds metadata under `META/`
//! and simulation output under `OUT/`: per-run directories (`OUT/RUN<i>`)
//! and aggregated per-interval plot tables (`OUT/PLOT/DAILY`,
//! `OUT/PLOT/WEEKLY`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use crate::env::EnvSource;
use crate::resolve::{self, OUT_DIR, RUN_PREFIX, ResolveRequest};
use crate::run::Run;
use crate::table::{Table, run_name_pattern};

/// Namespace under which the simulator records global variables in `VARS`.
const GLOBAL_NAMESPACE: &str = "EPX";

/// How state counts are aggregated in a state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountType {
    /// Agents in the state at midnight on the simulation day.
    Count,
    /// Agents entering the state on the simulation day.
    New,
    /// Cumulative entries into the state by the simulation day.
    Cumulative,
}

impl CountType {
    /// Filename prefix the simulator uses for this count type.
    fn prefix(self) -> &'static str {
        match self {
            CountType::Count => "",
            CountType::New => "new",
            CountType::Cumulative => "tot",
        }
    }
}

/// Output interval of an aggregated plot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Weekly,
}

impl Interval {
    /// Job-relative directory holding tables for this interval.
    fn dir(self) -> &'static str {
        match self {
            Interval::Daily => "OUT/PLOT/DAILY",
            Interval::Weekly => "OUT/PLOT/WEEKLY",
        }
    }
}

/// Completion status of a job, from `META/STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Finished,
    Other(String),
}

impl JobStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "FINISHED" => JobStatus::Finished,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Finished => write!(f, "FINISHED"),
            JobStatus::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Read access to the results of one job.
#[derive(Debug, Clone)]
pub struct Job {
    path: PathBuf,
    key: String,
    id: Option<u32>,
    conditions: BTreeSet<String>,
    global_variables: BTreeSet<String>,
}

impl Job {
    /// Resolve and open a job from a request.
    ///
    /// The job's own key is read from `META/KEY`. The id is taken from the
    /// request or looked up via the results root's `KEY` index; a job opened
    /// through an explicit path has no id (the id only exists as a directory
    /// name within a results tree).
    pub fn open(req: &ResolveRequest, env: &dyn EnvSource) -> Result<Self> {
        let path = resolve::job_path(req, env)?;
        let key = read_first_line(&path.join("META/KEY")).context("read job key")?;

        let id = match (&req.job_path, req.job_id) {
            (Some(_), _) => None,
            (None, Some(id)) => Some(id),
            (None, None) => {
                let root = resolve::results_root(req, env)?;
                Some(crate::keys::job_id_for_key(&root, &key)?)
            }
        };

        let (conditions, global_variables) = parse_vars(&path)?;
        debug!(job = %path.display(), key = %key, id = ?id, "opened job");
        Ok(Self {
            path,
            key,
            id,
            conditions,
            global_variables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Condition names with available output.
    pub fn conditions(&self) -> &BTreeSet<String> {
        &self.conditions
    }

    /// Global variable names with available output.
    pub fn global_variables(&self) -> &BTreeSet<String> {
        &self.global_variables
    }

    /// Current status from `META/STATUS`, read fresh on every call.
    pub fn status(&self) -> Result<JobStatus> {
        let raw = read_first_line(&self.path.join("META/STATUS")).context("read job status")?;
        Ok(JobStatus::parse(&raw))
    }

    /// Run ids present under `OUT/`, ascending.
    pub fn run_ids(&self) -> Result<Vec<u32>> {
        list_run_ids(&self.path)
    }

    /// Open every run of a finished job, keyed by run id.
    ///
    /// Returns an empty map while the job is still running, since run
    /// directories of an unfinished job may be partially written.
    pub fn runs(&self) -> Result<BTreeMap<u32, Run>> {
        if self.status()? != JobStatus::Finished {
            return Ok(BTreeMap::new());
        }
        let mut runs = BTreeMap::new();
        for run_id in self.run_ids()? {
            let run_dir = self
                .path
                .join(OUT_DIR)
                .join(format!("{RUN_PREFIX}{run_id}"));
            runs.insert(run_id, Run::at(run_dir, run_id)?);
        }
        Ok(runs)
    }

    /// Table of `state` counts in `condition` for each run in the job.
    ///
    /// Only conditions the simulator wrote output for are available; see
    /// [`Job::conditions`].
    pub fn state_table(
        &self,
        condition: &str,
        state: &str,
        count_type: CountType,
        interval: Interval,
    ) -> Result<Table> {
        if !self.conditions.contains(condition) {
            bail!(
                "condition '{condition}' has no output in this job; available: {:?}",
                self.conditions
            );
        }
        let filename = format!("{condition}.{}{state}.csv", count_type.prefix());
        let path = self.path.join(interval.dir()).join(&filename);
        if !path.is_file() {
            bail!(
                "'{}' not found: '{state}' may not be a state of condition '{condition}'",
                path.display()
            );
        }
        Ok(Table::read(&path)?.run_columns())
    }

    /// Table of global `variable` values for each run in the job.
    ///
    /// Only variables the simulator wrote output for are available; see
    /// [`Job::global_variables`].
    pub fn variable_table(&self, variable: &str, interval: Interval) -> Result<Table> {
        if !self.global_variables.contains(variable) {
            bail!(
                "variable '{variable}' has no output in this job; available: {:?}",
                self.global_variables
            );
        }
        let filename = format!("{GLOBAL_NAMESPACE}.{variable}.csv");
        let path = self.path.join(interval.dir()).join(&filename);
        Ok(Table::read(&path)?.run_columns())
    }
}

/// Numeric `RUN<i>` directory names under `<job>/OUT`, ascending.
pub fn list_run_ids(job_path: &Path) -> Result<Vec<u32>> {
    let out_dir = job_path.join(OUT_DIR);
    let mut run_ids = Vec::new();
    for entry in
        fs::read_dir(&out_dir).with_context(|| format!("read {}", out_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(captures) = run_name_pattern().captures(&name) {
            let id = captures[1].parse::<u32>().context("parse run id")?;
            run_ids.push(id);
        }
    }
    run_ids.sort_unstable();
    Ok(run_ids)
}

/// Parse `OUT/PLOT/VARS` into condition names and global variable names.
///
/// Each line is `<condition>.<state>`; the `EPX` namespace marks global
/// variables. Lines without a dot are ignored.
fn parse_vars(job_path: &Path) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
    let path = job_path.join("OUT/PLOT/VARS");
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read vars {}", path.display()))?;

    let mut conditions = BTreeSet::new();
    let mut global_variables = BTreeSet::new();
    for line in contents.lines() {
        let Some((condition, state)) = line.trim().split_once('.') else {
            continue;
        };
        if condition == GLOBAL_NAMESPACE {
            global_variables.insert(state.to_string());
        } else {
            conditions.insert(condition.to_string());
        }
    }
    Ok((conditions, global_variables))
}

fn read_first_line(path: &Path) -> Result<String> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(contents.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ResultsFixture;

    #[test]
    fn opens_by_key_with_id_and_vars() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_key("simpleflu");
        let job = Job::open(&req, &fixture.env()).expect("open");

        assert_eq!(job.key(), "simpleflu");
        assert_eq!(job.id(), Some(1));
        assert!(job.conditions().contains("INF"));
        assert!(job.global_variables().contains("Infected"));
    }

    #[test]
    fn explicit_path_leaves_id_unset() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_path(fixture.root().join("JOB/1"));
        let job = Job::open(&req, &fixture.env()).expect("open");
        assert_eq!(job.id(), None);
        assert_eq!(job.key(), "simpleflu");
    }

    #[test]
    fn status_and_run_ids() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        assert_eq!(job.status().expect("status"), JobStatus::Finished);
        assert_eq!(job.run_ids().expect("run ids"), vec![1, 2, 3]);
    }

    #[test]
    fn runs_empty_unless_finished() {
        let fixture = ResultsFixture::create();
        let job_dir = fixture.add_job("pending", 2, &[1]);
        std::fs::write(job_dir.join("META/STATUS"), "RUNNING\n").expect("status");

        let job = Job::open(&ResolveRequest::new().job_id(2), &fixture.env()).expect("open");
        assert_eq!(job.status().expect("status"), JobStatus::Other("RUNNING".to_string()));
        assert!(job.runs().expect("runs").is_empty());
    }

    #[test]
    fn runs_of_finished_job_are_keyed_by_id() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        let runs = job.runs().expect("runs");
        assert_eq!(runs.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(runs[&1].id(), 1);
    }

    #[test]
    fn state_table_filters_to_run_columns() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        let table = job
            .state_table("INF", "E", CountType::Cumulative, Interval::Daily)
            .expect("state table");
        assert_eq!(table.columns(), ["RUN1", "RUN2", "RUN3"]);
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn unknown_condition_is_rejected_before_io() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        let err = job
            .state_table("NOPE", "E", CountType::Count, Interval::Daily)
            .expect_err("unknown condition");
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn weekly_interval_reads_weekly_tables() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");

        let table = job
            .variable_table("Infected", Interval::Weekly)
            .expect("weekly variable table");
        assert_eq!(table.columns(), ["RUN1", "RUN2", "RUN3"]);
        assert_eq!(table.num_rows(), 1);

        let counts = job
            .state_table("INF", "E", CountType::New, Interval::Weekly)
            .expect("weekly state table");
        assert_eq!(counts.num_rows(), 1);
    }

    #[test]
    fn variable_table_loads_known_variable() {
        let fixture = ResultsFixture::create();
        let job = Job::open(&ResolveRequest::new().job_id(1), &fixture.env()).expect("open");
        let table = job
            .variable_table("Infected", Interval::Daily)
            .expect("variable table");
        assert_eq!(table.columns(), ["RUN1", "RUN2", "RUN3"]);

        let err = job
            .variable_table("Unknown", Interval::Daily)
            .expect_err("unknown variable");
        assert!(err.to_string().contains("Unknown"));
    }
}
