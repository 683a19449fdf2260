//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use epxres::env::ProcessEnv;
use epxres::insert::InsertOptions;
use epxres::job::{Interval, Job, JobStatus};
use epxres::resolve::{self, ResolveRequest};
use epxres::snapshot::Snapshot;
use epxres::{insert as insert_mod, keys};
use serde::Serialize;
use tracing::debug;

/// Job summary emitted by `status --json`.
#[derive(Debug, Serialize)]
struct JobSummary {
    key: String,
    id: Option<u32>,
    status: JobStatus,
    run_ids: Vec<u32>,
    conditions: Vec<String>,
    global_variables: Vec<String>,
}

/// List job keys and ids in a results tree.
pub fn list_jobs(req: &ResolveRequest) -> Result<()> {
    let root = resolve::results_root(req, &ProcessEnv)?;
    let jobs = keys::load_job_keys(&root)?;
    debug!(root = %root.display(), jobs = jobs.len(), "listing jobs");
    let mut entries: Vec<(&String, u32)> = jobs.iter().map(|(key, id)| (key, *id)).collect();
    entries.sort_by_key(|(_, id)| *id);
    for (key, id) in entries {
        println!("{key} {id}");
    }
    Ok(())
}

/// Show a job's status, runs, and available output.
pub fn job_status(req: &ResolveRequest, json: bool) -> Result<()> {
    let job = Job::open(req, &ProcessEnv)?;
    let summary = JobSummary {
        key: job.key().to_string(),
        id: job.id(),
        status: job.status()?,
        run_ids: job.run_ids()?,
        conditions: job.conditions().iter().cloned().collect(),
        global_variables: job.global_variables().iter().cloned().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary).context("serialize summary")?);
        return Ok(());
    }

    println!("job: key={} id={:?} status={}", summary.key, summary.id, summary.status);
    println!(
        "job: runs={:?} conditions={:?} variables={:?}",
        summary.run_ids, summary.conditions, summary.global_variables
    );
    Ok(())
}

/// List run ids of a job.
pub fn list_runs(req: &ResolveRequest) -> Result<()> {
    let job = Job::open(req, &ProcessEnv)?;
    for run_id in job.run_ids()? {
        println!("{run_id}");
    }
    Ok(())
}

/// Print a global variable table as CSV.
pub fn print_variable(req: &ResolveRequest, name: &str, interval: &str) -> Result<()> {
    let interval = parse_interval(interval)?;
    let job = Job::open(req, &ProcessEnv)?;
    let table = job.variable_table(name, interval)?;
    print!("{}", table.to_csv());
    Ok(())
}

/// Merge a source results tree into the destination.
pub fn merge(source: &Path, req: &ResolveRequest, force: bool) -> Result<()> {
    insert_mod::merge_results(source, req, &ProcessEnv, force)?;
    let destination = resolve::results_root(req, &ProcessEnv)?;
    println!("merge: source={} destination={}", source.display(), destination.display());
    Ok(())
}

/// Insert one job directory into a results tree.
pub fn insert(job_dir: &Path, key: Option<String>, req: &ResolveRequest, force: bool) -> Result<()> {
    let options = InsertOptions { key, force };
    let job_id = insert_mod::insert_job(job_dir, &options, req, &ProcessEnv)?;
    println!("insert: job={} id={}", job_dir.display(), job_id);
    Ok(())
}

/// Show or delete a job snapshot.
pub fn snapshot(req: &ResolveRequest, date: Option<&str>, delete: bool) -> Result<()> {
    let date = date
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid snapshot date '{raw}', expected YYYY-MM-DD"))
        })
        .transpose()?;

    let snapshot = Snapshot::open(date, req, &ProcessEnv)?;
    if delete {
        let path = snapshot.path().to_path_buf();
        snapshot.delete()?;
        println!("snapshot: deleted {}", path.display());
    } else {
        println!("{}", snapshot.path().display());
    }
    Ok(())
}

fn parse_interval(raw: &str) -> Result<Interval> {
    match raw {
        "daily" => Ok(Interval::Daily),
        "weekly" => Ok(Interval::Weekly),
        other => bail!("unknown interval '{other}', expected 'daily' or 'weekly'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parsing() {
        assert_eq!(parse_interval("daily").expect("daily"), Interval::Daily);
        assert_eq!(parse_interval("weekly").expect("weekly"), Interval::Weekly);
        assert!(parse_interval("hourly").is_err());
    }
}
