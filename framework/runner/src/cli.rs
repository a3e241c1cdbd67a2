use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use lapse_instruments::report::SummaryFormat;

use crate::definition::BenchmarkSpec;
use crate::types::LapseResult;

const DEFAULT_EXECUTIONS: usize = 10;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct LapseCli {
    /// Shell command lines to benchmark, one scenario per command.
    ///
    /// Each command is run through `sh -c` and named after itself. Cannot be combined with
    /// `--config`.
    pub commands: Vec<String>,

    /// A benchmark spec file in YAML, JSON or TOML format
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// The number of measured executions per scenario.
    ///
    /// Overrides the value from the spec file. Defaults to 10 for ad-hoc commands.
    #[clap(short = 'n', long)]
    pub executions: Option<usize>,

    /// Run scenarios round-robin instead of one after another
    #[clap(short, long, default_value = "false")]
    pub alternate: bool,

    /// Stop the whole run at the first failing hook or command
    #[clap(long, default_value = "false")]
    pub fail_fast: bool,

    /// The format of the summary report
    #[clap(short, long, value_enum, default_value_t = ReportFormat::Txt)]
    pub format: ReportFormat,

    /// Write the summary report to this file instead of stdout
    #[clap(short, long)]
    pub out: Option<PathBuf>,

    /// Also write every trace as a JSON line to this file, as it is recorded
    #[clap(long)]
    pub raw_out: Option<PathBuf>,

    /// Let the benchmarked commands write to this process's stdout and stderr
    #[clap(long, default_value = "false")]
    pub pipe_stdout: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Use this run id instead of a generated one
    #[clap(long)]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Txt,
    Md,
    Json,
    Csv,
}

impl From<ReportFormat> for SummaryFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Txt => SummaryFormat::Text,
            ReportFormat::Md => SummaryFormat::Markdown,
            ReportFormat::Json => SummaryFormat::Json,
            ReportFormat::Csv => SummaryFormat::Csv,
        }
    }
}

impl LapseCli {
    /// Build the validated benchmark spec from either the config file or the ad-hoc commands,
    /// with command line overrides applied.
    pub fn benchmark_spec(&self) -> LapseResult<BenchmarkSpec> {
        let mut spec = match (&self.config, self.commands.is_empty()) {
            (Some(_), false) => bail!("Specify either a config file or commands to run, not both"),
            (None, true) => bail!("Nothing to run, specify a config file or at least one command"),
            (Some(path), true) => BenchmarkSpec::load(path)?,
            (None, false) => BenchmarkSpec::from_commands(&self.commands, DEFAULT_EXECUTIONS),
        };

        if let Some(executions) = self.executions {
            spec.executions = executions;
        }
        spec.alternate |= self.alternate;
        spec.fail_fast |= self.fail_fast;

        spec.validate()?;
        Ok(spec)
    }
}
