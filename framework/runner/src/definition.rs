use anyhow::{bail, Context};
use lapse_instruments::{EventStream, Identifiable, Trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::types::LapseResult;

/// Every trace of a run is buffered on the trace stream, so a run can't have more executions than
/// the stream can hold.
const MAX_TOTAL_EXECUTIONS: usize = EventStream::<Trace>::MAX_BUFFER_SIZE;

/// A command line to run, optionally in a specific working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandSpec {
    /// Takes precedence over the scenario's working directory. A leading `~` is expanded.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// The program followed by its arguments. Must not be empty.
    pub cmd: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            working_dir: None,
            cmd: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }
}

/// A named unit of benchmarked work: one measured command plus optional hooks.
///
/// The name identifies the scenario in traces and reports, so it must be unique within a
/// [BenchmarkSpec].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioSpec {
    pub name: String,
    /// Default working directory for the command and every hook.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Variables set on top of the inherited process environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Run once, before the first measured execution.
    #[serde(default)]
    pub before_all: Option<CommandSpec>,
    /// Run once, after the last measured execution.
    #[serde(default)]
    pub after_all: Option<CommandSpec>,
    /// Run before every measured execution, outside of the measurement.
    #[serde(default)]
    pub before_each: Option<CommandSpec>,
    /// Run after every measured execution, outside of the measurement.
    #[serde(default)]
    pub after_each: Option<CommandSpec>,
    pub command: CommandSpec,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            working_dir: None,
            env: BTreeMap::new(),
            before_all: None,
            after_all: None,
            before_each: None,
            after_each: None,
            command,
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_before_all(mut self, hook: CommandSpec) -> Self {
        self.before_all = Some(hook);
        self
    }

    pub fn with_after_all(mut self, hook: CommandSpec) -> Self {
        self.after_all = Some(hook);
        self
    }

    pub fn with_before_each(mut self, hook: CommandSpec) -> Self {
        self.before_each = Some(hook);
        self
    }

    pub fn with_after_each(mut self, hook: CommandSpec) -> Self {
        self.after_each = Some(hook);
        self
    }

    fn commands(&self) -> impl Iterator<Item = (&'static str, &CommandSpec)> {
        [
            ("beforeAll", self.before_all.as_ref()),
            ("afterAll", self.after_all.as_ref()),
            ("beforeEach", self.before_each.as_ref()),
            ("afterEach", self.after_each.as_ref()),
            ("command", Some(&self.command)),
        ]
        .into_iter()
        .filter_map(|(label, command)| command.map(|command| (label, command)))
    }
}

impl Identifiable for ScenarioSpec {
    fn id(&self) -> &str {
        &self.name
    }
}

/// Everything a benchmark run needs to know. Read-only for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BenchmarkSpec {
    pub scenarios: Vec<ScenarioSpec>,
    /// Measured executions per scenario.
    pub executions: usize,
    /// Run scenarios round-robin instead of one after another.
    #[serde(default)]
    pub alternate: bool,
    /// Stop the whole run at the first reported error.
    #[serde(default)]
    pub fail_fast: bool,
}

impl BenchmarkSpec {
    pub fn new(scenarios: Vec<ScenarioSpec>, executions: usize) -> Self {
        Self {
            scenarios,
            executions,
            alternate: false,
            fail_fast: false,
        }
    }

    pub fn with_alternate(mut self, alternate: bool) -> Self {
        self.alternate = alternate;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Build a spec with one scenario per shell command line, each run through `sh -c` and named
    /// after the command itself.
    pub fn from_commands(commands: &[String], executions: usize) -> Self {
        let scenarios = commands
            .iter()
            .map(|command| {
                ScenarioSpec::new(command.clone(), CommandSpec::new(["sh", "-c", command.as_str()]))
            })
            .collect();

        Self::new(scenarios, executions)
    }

    /// Load and validate a spec file. The format is chosen by extension: `.yaml`/`.yml`, `.json`
    /// or `.toml`.
    pub fn load(path: &Path) -> LapseResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read spec file {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let spec: BenchmarkSpec = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML spec {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON spec {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML spec {}", path.display()))?,
            _ => bail!(
                "Unsupported spec file '{}', expected a .yaml, .yml, .json or .toml file",
                path.display()
            ),
        };

        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> LapseResult<()> {
        if self.scenarios.is_empty() {
            bail!("At least one scenario is required");
        }
        if self.executions == 0 {
            bail!("Executions must be at least 1");
        }
        match self.executions.checked_mul(self.scenarios.len()) {
            Some(total) if total <= MAX_TOTAL_EXECUTIONS => {}
            _ => bail!(
                "{} executions of {} scenario(s) is more than the {} executions a run can record",
                self.executions,
                self.scenarios.len(),
                MAX_TOTAL_EXECUTIONS
            ),
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                bail!("Scenario names must not be empty");
            }
            if !names.insert(scenario.name.as_str()) {
                bail!("Scenario [{}] is defined more than once", scenario.name);
            }
            for (label, command) in scenario.commands() {
                if command.cmd.is_empty() {
                    bail!(
                        "Scenario [{}] has an empty '{}' command",
                        scenario.name,
                        label
                    );
                }
            }
        }

        Ok(())
    }

    /// Total number of measured executions in a complete run.
    pub fn total_executions(&self) -> usize {
        self.executions.saturating_mul(self.scenarios.len())
    }
}
