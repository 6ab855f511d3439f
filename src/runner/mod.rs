//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. Reports are written to the supplied writer so
//! callers and tests decide where they go.

mod error;

pub use error::RunnerError;

use crate::cli::{Cli, Commands, RunArgs};
use crate::client::{CandlepinApi, HttpCandlepin};
use crate::context::ScenarioContext;
use crate::scenario::{ScenarioReport, ScenarioRunner, StepStatus, load_feature};
use crate::steps::{self, StepRegistry};
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};
use walkdir::WalkDir;

const FEATURE_EXTENSION: &str = "feature";

/// Tally of scenario outcomes across a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Scenarios whose steps all passed.
    pub passed: usize,
    /// Scenarios that stopped at a failing step.
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, report: &ScenarioReport) {
        if report.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Number of scenarios run.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Execute the parsed [`Cli`] command, writing reports to `out`.
///
/// # Errors
///
/// Returns an error if a feature cannot be loaded, the client cannot be
/// configured, writing to `out` fails, or any scenario fails.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let registry = steps::default_registry(cli.match_policy()).context("registering steps")?;
    match cli.command.clone().unwrap_or(Commands::Steps) {
        Commands::Steps => list_steps(&registry, out),
        Commands::Run(args) => {
            let client = HttpCandlepin::new(&cli.client_config())
                .context("configuring the Candlepin client")?;
            info!(url = %client.base_url(), owner = %cli.owner, "running scenarios");
            let api: Rc<dyn CandlepinApi> = Rc::new(client);
            let runner = ScenarioRunner::new(&registry, api, cli.owner.as_str());
            let summary = run_features(&runner, &args, out)?;
            if summary.failed > 0 {
                return Err(RunnerError::ScenariosFailed {
                    failed: summary.failed,
                    total: summary.total(),
                }
                .into());
            }
            Ok(())
        }
    }
}

fn list_steps<W: Write>(registry: &StepRegistry<ScenarioContext>, out: &mut W) -> Result<()> {
    for pattern in registry.patterns() {
        writeln!(out, "{pattern}").context("writing step list")?;
    }
    Ok(())
}

/// Run every scenario found under `args.paths` with `runner`.
///
/// # Errors
///
/// Returns an error when no feature files are found, a feature cannot be
/// loaded, or writing to `out` fails. Failed scenarios are counted in the
/// returned summary rather than reported as errors.
pub fn run_features<W: Write>(
    runner: &ScenarioRunner<'_>,
    args: &RunArgs,
    out: &mut W,
) -> Result<RunSummary> {
    let files = collect_feature_files(&args.paths)?;
    if files.is_empty() {
        return Err(RunnerError::NoFeatures {
            paths: args.paths.clone(),
        }
        .into());
    }
    let mut summary = RunSummary::default();
    for path in &files {
        let feature =
            load_feature(path).with_context(|| format!("loading feature at {path}"))?;
        debug!(path = %path, scenarios = feature.scenarios.len(), "loaded feature");
        writeln!(out, "Feature: {}", feature_title(&feature.name, path))?;
        for scenario in &feature.scenarios {
            let report = runner.run(scenario);
            write_report(out, &report)?;
            summary.record(&report);
        }
    }
    writeln!(
        out,
        "{} scenarios ({} passed, {} failed)",
        summary.total(),
        summary.passed,
        summary.failed
    )?;
    Ok(summary)
}

fn feature_title<'a>(name: &'a str, path: &'a Utf8Path) -> &'a str {
    if name.is_empty() { path.as_str() } else { name }
}

fn write_report<W: Write>(out: &mut W, report: &ScenarioReport) -> Result<()> {
    let verdict = if report.passed() { "PASS" } else { "FAIL" };
    writeln!(out, "  {verdict} {}", report.name)?;
    for outcome in &report.outcomes {
        match &outcome.status {
            StepStatus::Passed => {}
            StepStatus::Failed(err) => writeln!(
                out,
                "    line {}: {}\n      {err}",
                outcome.step.line_number, outcome.step.text
            )?,
            StepStatus::Skipped => writeln!(
                out,
                "    skipped line {}: {}",
                outcome.step.line_number, outcome.step.text
            )?,
        }
    }
    Ok(())
}

/// Expand `paths` into feature files.
///
/// Files are taken as given; directories are walked recursively for
/// `*.feature` files in file-name order.
///
/// # Errors
///
/// Returns an error when a path is not valid UTF-8 or a directory cannot be
/// walked.
pub fn collect_feature_files(paths: &[impl AsRef<Path>]) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for item in paths {
        let root: &Path = item.as_ref();
        if !root.is_dir() {
            files.push(utf8(root)?);
            continue;
        }
        for walked in WalkDir::new(root).sort_by_file_name() {
            let entry = walked.with_context(|| format!("walking {}", root.display()))?;
            let is_feature = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == FEATURE_EXTENSION);
            if is_feature {
                files.push(utf8(entry.path())?);
            }
        }
    }
    Ok(files)
}

fn utf8(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|raw| anyhow!("path {} is not valid UTF-8", raw.display()))
}
