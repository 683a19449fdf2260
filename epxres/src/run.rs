//! Read access to one run's results.
//!
//! A run directory (`<job>/OUT/RUN<id>`) holds `parameters.txt`,
//! `progress.txt`, the `LOG` file, per-day output under `DAILY/`, and ad-hoc
//! CSV output under `CSV/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::env::EnvSource;
use crate::resolve::{self, ResolveRequest};
use crate::table::{Table, run_name_pattern};

/// Name of the run log file inside a run directory.
pub const RUN_LOG_FILE: &str = "LOG";

/// A typed simulation parameter value from `parameters.txt`.
///
/// Values consistent with an integer parse as integers, then floats, then
/// fall back to unaltered text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl ParamValue {
    pub fn parse(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return ParamValue::Int(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            return ParamValue::Real(value);
        }
        ParamValue::Text(raw.to_string())
    }
}

/// Read access to the results of one run.
#[derive(Debug, Clone)]
pub struct Run {
    path: PathBuf,
    id: u32,
    sim_days: Vec<u32>,
    sim_dates: Vec<NaiveDate>,
}

impl Run {
    /// Resolve and open a run from a request.
    ///
    /// The run id comes from the request, or from the `RUN<id>` directory
    /// name when the run was selected by explicit path.
    pub fn open(req: &ResolveRequest, env: &dyn EnvSource) -> Result<Self> {
        let path = resolve::run_path(req, env)?;
        let id = match req.run_id {
            Some(id) => id,
            None => run_id_from_dir_name(&path)?,
        };
        Self::at(path, id)
    }

    /// Open a run at a known directory (no resolution).
    pub(crate) fn at(path: PathBuf, id: u32) -> Result<Self> {
        let (sim_days, sim_dates) = load_sim_dates(&path)?;
        debug!(run = %path.display(), id, "opened run");
        Ok(Self {
            path,
            id,
            sim_days,
            sim_dates,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Simulation day numbers, starting at 0.
    pub fn sim_days(&self) -> &[u32] {
        &self.sim_days
    }

    /// Calendar date of each simulation day.
    pub fn sim_dates(&self) -> &[NaiveDate] {
        &self.sim_dates
    }

    /// Parameters the run was started with, from `parameters.txt`.
    pub fn parameters(&self) -> Result<BTreeMap<String, ParamValue>> {
        let path = self.path.join("parameters.txt");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("read parameters {}", path.display()))?;

        let mut params = BTreeMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(" = ")
                .with_context(|| format!("malformed parameter line '{line}'"))?;
            params.insert(key.to_string(), ParamValue::parse(value));
        }
        Ok(params)
    }

    /// Percentage of simulation days completed, from `progress.txt`.
    pub fn progress(&self) -> Result<f64> {
        let path = self.path.join("progress.txt");
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;

        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern =
            PATTERN.get_or_init(|| Regex::new(r"\((\d+)%\)").expect("valid progress pattern"));

        let last = contents
            .lines()
            .skip(1)
            .filter_map(|line| pattern.captures(line))
            .last()
            .ok_or_else(|| anyhow!("no progress entries in {}", path.display()))?;
        last[1].parse::<f64>().context("parse progress percentage")
    }

    /// Lines of the run log.
    pub fn log(&self) -> Result<Vec<String>> {
        let path = self.path.join(RUN_LOG_FILE);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read log {}", path.display()))?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Load a CSV output file from the run's `CSV/` directory.
    pub fn csv_output(&self, filename: &str) -> Result<Table> {
        Table::read(&self.path.join("CSV").join(filename))
    }
}

/// Parse the run id out of a `RUN<id>` directory name.
fn run_id_from_dir_name(path: &Path) -> Result<u32> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(captures) = run_name_pattern().captures(&name) else {
        bail!("'{}' is not a RUN<id> directory", path.display());
    };
    captures[1].parse::<u32>().context("parse run id")
}

/// Load simulation days and dates from `DAILY/Date.txt` (`<day> <date>`).
fn load_sim_dates(run_path: &Path) -> Result<(Vec<u32>, Vec<NaiveDate>)> {
    let path = run_path.join("DAILY/Date.txt");
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read dates {}", path.display()))?;

    let mut sim_days = Vec::new();
    let mut sim_dates = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (day, date) = line
            .split_once(' ')
            .with_context(|| format!("malformed date line '{line}'"))?;
        sim_days.push(day.parse::<u32>().context("parse simulation day")?);
        sim_dates.push(
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("parse date '{date}'"))?,
        );
    }
    Ok((sim_days, sim_dates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ResultsFixture;

    #[test]
    fn opens_by_job_key_and_run_id() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_key("simpleflu").run_id(1);
        let run = Run::open(&req, &fixture.env()).expect("open");

        assert_eq!(run.id(), 1);
        assert_eq!(run.sim_days(), [0, 1, 2]);
        assert_eq!(
            run.sim_dates()[0],
            NaiveDate::from_ymd_opt(2025, 1, 1).expect("date")
        );
    }

    #[test]
    fn explicit_path_recovers_id_from_dir_name() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().run_path(fixture.root().join("JOB/1/OUT/RUN2"));
        let run = Run::open(&req, &fixture.env()).expect("open");
        assert_eq!(run.id(), 2);
    }

    #[test]
    fn parameters_are_typed() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_id(1).run_id(1);
        let run = Run::open(&req, &fixture.env()).expect("open");
        let params = run.parameters().expect("parameters");

        assert_eq!(params.get("days"), Some(&ParamValue::Int(3)));
        assert_eq!(
            params.get("transmissibility"),
            Some(&ParamValue::Real(1.5))
        );
        assert_eq!(
            params.get("locations"),
            Some(&ParamValue::Text("Allegheny_County_PA".to_string()))
        );
    }

    #[test]
    fn progress_reads_last_entry() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_id(1).run_id(1);
        let run = Run::open(&req, &fixture.env()).expect("open");
        assert_eq!(run.progress().expect("progress"), 100.0);
    }

    #[test]
    fn log_returns_lines() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_id(1).run_id(1);
        let run = Run::open(&req, &fixture.env()).expect("open");
        let log = run.log().expect("log");
        assert!(!log.is_empty());
        assert!(log[0].contains("run 1"));
    }

    #[test]
    fn csv_output_loads_table() {
        let fixture = ResultsFixture::create();
        let req = ResolveRequest::new().job_id(1).run_id(1);
        let run = Run::open(&req, &fixture.env()).expect("open");
        let table = run.csv_output("infections.csv").expect("csv");
        assert_eq!(table.columns(), ["id", "date", "age", "sex"]);
    }

    #[test]
    fn param_value_parse_precedence() {
        assert_eq!(ParamValue::parse("3"), ParamValue::Int(3));
        assert_eq!(ParamValue::parse("3.5"), ParamValue::Real(3.5));
        assert_eq!(
            ParamValue::parse("three"),
            ParamValue::Text("three".to_string())
        );
    }
}
