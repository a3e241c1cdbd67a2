use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Description of a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless supplied on the command line.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The number of measured executions per scenario
    pub executions: usize,
    /// Whether scenarios were run round-robin rather than one after another
    pub alternate: bool,
    /// Whether the run was configured to stop at the first error
    pub fail_fast: bool,
    /// The scenario names, in the order they were declared
    pub scenarios: Vec<String>,
    /// Environment overrides declared by the scenarios, keyed by scenario name
    ///
    /// This won't capture the inherited process environment, just the variables that the spec
    /// sets explicitly.
    pub env: HashMap<String, HashMap<String, String>>,
    /// The version of Lapse that was used for this run
    pub lapse_version: String,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        started_at: i64,
        executions: usize,
        alternate: bool,
        fail_fast: bool,
        scenarios: Vec<String>,
        lapse_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            executions,
            alternate,
            fail_fast,
            scenarios,
            env: HashMap::with_capacity(0),
            lapse_version,
        }
    }

    /// Add an environment variable declared by a scenario
    pub fn add_env(&mut self, scenario: String, key: String, value: String) {
        self.env.entry(scenario).or_default().insert(key, value);
    }

    /// Compute a fingerprint for this run
    ///
    /// The fingerprint identifies the configuration the benchmark ran with, so that reports of
    /// runs with the same configuration can be recognised. It uses the
    ///     - Scenario names, in order
    ///     - Executions
    ///     - Alternate flag
    ///     - Declared environment variables
    ///     - Lapse version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, (self.scenarios.len() as u64).to_le_bytes());
        self.scenarios.iter().for_each(|name| {
            update_field(&mut hasher, name);
        });
        Digest::update(&mut hasher, (self.executions as u64).to_le_bytes());
        Digest::update(&mut hasher, [self.alternate as u8]);
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(scenario, vars)| {
                update_field(&mut hasher, scenario);
                vars.iter()
                    .sorted_by_key(|(k, _)| k.to_owned())
                    .for_each(|(k, v)| {
                        update_field(&mut hasher, k);
                        update_field(&mut hasher, v);
                    });
            });
        update_field(&mut hasher, &self.lapse_version);

        format!("{:x}", hasher.finalize())
    }
}

/// Length-prefixed so that adjacent fields can't run into each other.
fn update_field(hasher: &mut sha3::Sha3_256, value: &str) {
    Digest::update(hasher, (value.len() as u64).to_le_bytes());
    Digest::update(hasher, value.as_bytes());
}

/// Descriptive statistics over one timing series, in nanoseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TimingStats {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: u64,
    pub median_ns: u64,
    pub std_dev_ns: u64,
    pub p90_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
}

/// Results for a single scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioReport {
    pub id: String,
    /// Number of measured executions that produced a trace
    pub count: usize,
    /// Fraction of executions that reported an error
    pub error_rate: f64,
    /// Wall-clock time as perceived by the runner
    pub perceived: TimingStats,
    /// User CPU time of the measured command
    pub user: TimingStats,
    /// System CPU time of the measured command
    pub system: TimingStats,
}

/// One trace as written by the raw stream report, one JSON object per line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    pub id: String,
    pub perceived_ns: u64,
    pub user_ns: u64,
    pub system_ns: u64,
    /// The error message, if the execution failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The complete report of a run, as written by the JSON summary format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    pub run: RunSummary,
    /// Fingerprint of [BenchmarkReport::run], see [RunSummary::fingerprint]
    pub fingerprint: String,
    /// When the underlying summary was captured, as a Unix timestamp in milliseconds
    pub captured_at: i64,
    pub scenarios: Vec<ScenarioReport>,
}

impl BenchmarkReport {
    pub fn new(run: RunSummary, captured_at: i64, scenarios: Vec<ScenarioReport>) -> Self {
        let fingerprint = run.fingerprint();
        Self {
            run,
            fingerprint,
            captured_at,
            scenarios,
        }
    }

    pub fn scenario(&self, id: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.id == id)
    }
}

/// Serialize the report to a writer as pretty printed JSON
pub fn store_report<W: Write + ?Sized>(
    report: &BenchmarkReport,
    writer: &mut W,
) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Load a report from a reader
pub fn load_report<R: Read>(reader: R) -> anyhow::Result<BenchmarkReport> {
    let reader = std::io::BufReader::new(reader);
    let report: BenchmarkReport = serde_json::from_reader(reader)?;
    Ok(report)
}
