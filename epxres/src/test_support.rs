//! Test-only helpers: a deterministic environment and fixture results trees.
//!
//! The fixture mirrors what the simulator writes for a small three-run
//! influenza job, enough to exercise every reader in the crate.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::env::{EnvSource, RESULTS_ENV};

/// In-memory [`EnvSource`] for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new<'a>(vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

/// A generated results tree holding one finished `simpleflu` job (id 1)
/// with runs 1 through 3.
#[derive(Debug)]
pub struct ResultsFixture {
    dir: TempDir,
}

impl ResultsFixture {
    pub fn create() -> Self {
        let dir = TempDir::new().expect("create fixture tempdir");
        let fixture = Self { dir };
        fixture.write_index("simpleflu", 1);
        fixture.write_job(&fixture.root().join("JOB/1"), "simpleflu", &[1, 2, 3]);
        fixture
    }

    /// Absolute path of the results root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Environment pointing `EPX_RESULTS` at this fixture.
    pub fn env(&self) -> MapEnv {
        MapEnv::new([(RESULTS_ENV, self.root().to_str().expect("utf-8 root"))])
    }

    /// Add another finished job to the tree and register its key.
    /// Returns the new job directory.
    pub fn add_job(&self, key: &str, id: u32, run_ids: &[u32]) -> PathBuf {
        let job_dir = self.root().join("JOB").join(id.to_string());
        self.write_job(&job_dir, key, run_ids);
        self.write_index(key, id);
        job_dir
    }

    fn write_index(&self, key: &str, id: u32) {
        let path = self.root().join("KEY");
        let mut index = fs::read_to_string(&path).unwrap_or_default();
        index.push_str(&format!("{key} {id}\n"));
        fs::write(&path, index).expect("write KEY");
        fs::write(self.root().join("ID"), format!("{}\n", id + 1)).expect("write ID");
    }

    fn write_job(&self, job_dir: &Path, key: &str, run_ids: &[u32]) {
        let meta = job_dir.join("META");
        fs::create_dir_all(&meta).expect("create META");
        fs::write(meta.join("KEY"), format!("{key}\n")).expect("write META/KEY");
        fs::write(meta.join("STATUS"), "FINISHED\n").expect("write META/STATUS");

        let plot = job_dir.join("OUT/PLOT");
        let daily = plot.join("DAILY");
        let weekly = plot.join("WEEKLY");
        fs::create_dir_all(&daily).expect("create PLOT/DAILY");
        fs::create_dir_all(&weekly).expect("create PLOT/WEEKLY");
        fs::write(
            plot.join("VARS"),
            "INF.E\nINF.I\nINF.R\nEPX.Infected\nEPX.Susceptible\nEPX.Recovered\n",
        )
        .expect("write VARS");

        let run_columns: Vec<String> =
            run_ids.iter().map(|id| format!("RUN{id}")).collect();
        let header = run_columns.join(",");
        let row = |value: u32| {
            run_ids
                .iter()
                .map(|id| (value * id).to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        // Three daily rows aggregate into a single week.
        let daily_table = format!("{header}\n{}\n{}\n{}\n", row(10), row(20), row(30));
        let weekly_table = format!("{header}\n{}\n", row(60));
        for filename in ["INF.totE.csv", "INF.E.csv", "INF.newE.csv", "EPX.Infected.csv"] {
            fs::write(daily.join(filename), &daily_table).expect("write daily plot table");
            fs::write(weekly.join(filename), &weekly_table).expect("write weekly plot table");
        }

        for run_id in run_ids {
            self.write_run(&job_dir.join("OUT").join(format!("RUN{run_id}")), *run_id);
        }
    }

    fn write_run(&self, run_dir: &Path, run_id: u32) {
        fs::create_dir_all(run_dir.join("DAILY")).expect("create run DAILY");
        fs::create_dir_all(run_dir.join("CSV")).expect("create run CSV");

        fs::write(
            run_dir.join("parameters.txt"),
            "days = 3\ntransmissibility = 1.5\nlocations = Allegheny_County_PA\n",
        )
        .expect("write parameters");
        fs::write(
            run_dir.join("progress.txt"),
            format!("starting run {run_id}\nday 0 (33%)\nday 1 (66%)\nday 2 (100%)\n"),
        )
        .expect("write progress");
        fs::write(
            run_dir.join("DAILY/Date.txt"),
            "0 2025-01-01\n1 2025-01-02\n2 2025-01-03\n",
        )
        .expect("write dates");
        fs::write(
            run_dir.join("LOG"),
            format!("epx: run {run_id} started\nepx: run {run_id} finished\n"),
        )
        .expect("write log");
        fs::write(
            run_dir.join("CSV/infections.csv"),
            "id,date,age,sex\n0,2025-01-01,34,F\n1,2025-01-02,9,M\n",
        )
        .expect("write infections csv");
    }
}
