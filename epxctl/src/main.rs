//! Command-line access to simulator results trees.

mod cli;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use epxres::resolve::ResolveRequest;

#[derive(Parser)]
#[command(name = "epxctl", version, about = "Inspect and merge simulator results trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Flags identifying a results root, job, and run.
///
/// Maps one-to-one onto a [`ResolveRequest`]; precedence among the flags is
/// the resolver's (explicit path over id over key, environment default last).
#[derive(Args, Debug, Default)]
struct Selector {
    /// Results root, overriding EPX_RESULTS / EPX_HOME.
    #[arg(long, value_name = "DIR")]
    results: Option<PathBuf>,
    /// Explicit job directory.
    #[arg(long, value_name = "DIR")]
    job_path: Option<PathBuf>,
    /// Explicit run directory.
    #[arg(long, value_name = "DIR")]
    run_path: Option<PathBuf>,
    /// Explicit snapshot file, bypassing job resolution.
    #[arg(long, value_name = "FILE")]
    snapshot_path: Option<PathBuf>,
    /// Job id under <results>/JOB.
    #[arg(long, value_name = "ID")]
    job_id: Option<u32>,
    /// Job key, looked up in the results KEY index.
    #[arg(long, value_name = "KEY")]
    job_key: Option<String>,
    /// Run id under <job>/OUT.
    #[arg(long, value_name = "ID")]
    run_id: Option<u32>,
}

impl Selector {
    fn to_request(&self) -> ResolveRequest {
        ResolveRequest {
            results_root: self.results.clone(),
            job_path: self.job_path.clone(),
            run_path: self.run_path.clone(),
            snapshot_path: self.snapshot_path.clone(),
            job_id: self.job_id,
            job_key: self.job_key.clone(),
            run_id: self.run_id,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List job keys and ids in a results tree.
    Jobs {
        #[command(flatten)]
        selector: Selector,
    },
    /// Show a job's status, runs, and available output.
    Status {
        #[command(flatten)]
        selector: Selector,
        /// Emit the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List run ids of a job.
    Runs {
        #[command(flatten)]
        selector: Selector,
    },
    /// Print a global variable table (one column per run) as CSV.
    Variable {
        /// Global variable name.
        name: String,
        /// Output interval: daily or weekly.
        #[arg(long, default_value = "daily")]
        interval: String,
        #[command(flatten)]
        selector: Selector,
    },
    /// Merge every job of a source results tree into the destination.
    Merge {
        /// Source results tree.
        source: PathBuf,
        /// Replace jobs whose keys already exist in the destination.
        #[arg(short, long)]
        force: bool,
        #[command(flatten)]
        selector: Selector,
    },
    /// Insert a single job directory into a results tree.
    Insert {
        /// Job directory to copy.
        job_dir: PathBuf,
        /// Key to register the job under (default: the job's META/KEY).
        #[arg(long)]
        key: Option<String>,
        /// Replace an existing job registered under the same key.
        #[arg(short, long)]
        force: bool,
        #[command(flatten)]
        selector: Selector,
    },
    /// Show or delete a snapshot archive of a job.
    Snapshot {
        #[command(flatten)]
        selector: Selector,
        /// Snapshot date (YYYY-MM-DD); default: the latest completed one.
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
        /// Delete the snapshot instead of printing its path.
        #[arg(long)]
        delete: bool,
    },
}

fn main() {
    epxres::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Jobs { selector } => cli::list_jobs(&selector.to_request()),
        Command::Status { selector, json } => cli::job_status(&selector.to_request(), json),
        Command::Runs { selector } => cli::list_runs(&selector.to_request()),
        Command::Variable {
            name,
            interval,
            selector,
        } => cli::print_variable(&selector.to_request(), &name, &interval),
        Command::Merge {
            source,
            force,
            selector,
        } => cli::merge(&source, &selector.to_request(), force),
        Command::Insert {
            job_dir,
            key,
            force,
            selector,
        } => cli::insert(&job_dir, key, &selector.to_request(), force),
        Command::Snapshot {
            selector,
            date,
            delete,
        } => cli::snapshot(&selector.to_request(), date.as_deref(), delete),
    }
}
