//! Feature parsing and linear scenario execution.
//!
//! A feature is read into [`Scenario`]s whose steps run in source order. The
//! first failing step aborts the scenario; every later step is reported as
//! skipped without being dispatched.

mod error;

pub use error::ScenarioError;

use crate::client::CandlepinApi;
use crate::context::ScenarioContext;
use crate::steps::{StepError, StepRegistry};
use camino::Utf8Path;
use gherkin::{GherkinEnv, ParseFileError};
use std::fmt;
use std::rc::Rc;
use tracing::{info, info_span, warn};

const OUTLINE_KEYWORDS: [&str; 2] = ["Scenario Outline", "Scenario Template"];

/// One step line of a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLine {
    /// One-based line number in the feature source.
    pub line_number: usize,
    /// Step keyword and text, for example `Given an owner admin "bob"`.
    pub text: String,
}

impl StepLine {
    /// Build a step line.
    #[must_use]
    pub fn new(line_number: usize, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
        }
    }
}

impl From<&gherkin::Step> for StepLine {
    fn from(step: &gherkin::Step) -> Self {
        Self::new(
            step.position.line,
            format!("{} {}", step.keyword.trim(), step.value),
        )
    }
}

/// Ordered steps executed against one fresh context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Text after the `Scenario:` heading.
    pub name: String,
    /// Background steps followed by the scenario's own steps.
    pub steps: Vec<StepLine>,
}

/// Parsed feature file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feature {
    /// Text after the `Feature:` heading.
    pub name: String,
    /// Scenarios in source order, rule scenarios last.
    pub scenarios: Vec<Scenario>,
}

/// Read and parse the feature stored at `path`.
///
/// # Errors
///
/// Returns [`ScenarioError::Read`] when the file cannot be read,
/// [`ScenarioError::Parse`] naming the file when it is not valid Gherkin, or
/// [`ScenarioError::Unsupported`] as for [`parse_feature`].
pub fn load_feature(path: &Utf8Path) -> Result<Feature, ScenarioError> {
    let parsed = gherkin::Feature::parse_path(path, GherkinEnv::default()).map_err(|err| {
        match err {
            ParseFileError::Reading { source, .. } => ScenarioError::Read {
                path: path.to_owned(),
                source,
            },
            ParseFileError::Parsing { source, .. } => ScenarioError::Parse {
                origin: path.to_string(),
                source,
            },
        }
    })?;
    flatten(&parsed)
}

/// Parse Gherkin `source` into a [`Feature`].
///
/// Data tables and doc strings stay attached to their step; only the step
/// keyword and text are dispatched.
///
/// # Errors
///
/// Returns [`ScenarioError::Parse`] for malformed Gherkin and
/// [`ScenarioError::Unsupported`] for scenario outlines.
///
/// # Examples
///
/// ```
/// use candlepin_steps::scenario::parse_feature;
///
/// let feature = parse_feature(
///     "Feature: Users\n  Scenario: Login\n    Given an owner admin \"bob\"\n",
/// )?;
/// assert_eq!(feature.scenarios.len(), 1);
/// assert_eq!(feature.scenarios[0].steps[0].line_number, 3);
/// # Ok::<(), candlepin_steps::scenario::ScenarioError>(())
/// ```
pub fn parse_feature(source: &str) -> Result<Feature, ScenarioError> {
    let parsed = gherkin::Feature::parse(source, GherkinEnv::default()).map_err(|err| {
        ScenarioError::Parse {
            origin: String::from("<input>"),
            source: err,
        }
    })?;
    flatten(&parsed)
}

fn flatten(parsed: &gherkin::Feature) -> Result<Feature, ScenarioError> {
    let background = background_steps(parsed.background.as_ref());
    let mut scenarios = parsed
        .scenarios
        .iter()
        .map(|scenario| resolve(scenario, &background))
        .collect::<Result<Vec<_>, _>>()?;
    for rule in &parsed.rules {
        let mut rule_background = background.clone();
        rule_background.extend(background_steps(rule.background.as_ref()));
        for scenario in &rule.scenarios {
            scenarios.push(resolve(scenario, &rule_background)?);
        }
    }
    Ok(Feature {
        name: parsed.name.clone(),
        scenarios,
    })
}

fn background_steps(background: Option<&gherkin::Background>) -> Vec<StepLine> {
    background
        .map(|block| block.steps.iter().map(StepLine::from).collect())
        .unwrap_or_default()
}

fn resolve(scenario: &gherkin::Scenario, background: &[StepLine]) -> Result<Scenario, ScenarioError> {
    if OUTLINE_KEYWORDS.contains(&scenario.keyword.as_str()) {
        return Err(ScenarioError::Unsupported {
            line_number: scenario.position.line,
            keyword: scenario.keyword.clone(),
        });
    }
    if let Some(examples) = scenario.examples.first() {
        return Err(ScenarioError::Unsupported {
            line_number: examples.position.line,
            keyword: examples.keyword.clone(),
        });
    }
    let mut steps = background.to_vec();
    steps.extend(scenario.steps.iter().map(StepLine::from));
    Ok(Scenario {
        name: scenario.name.clone(),
        steps,
    })
}

/// Result of one step.
#[derive(Debug)]
pub enum StepStatus {
    /// The handler completed.
    Passed,
    /// Dispatch or the handler failed; the scenario stopped here.
    Failed(StepError),
    /// Not run because an earlier step failed.
    Skipped,
}

/// A step paired with what happened to it.
#[derive(Debug)]
pub struct StepOutcome {
    /// Step that was considered.
    pub step: StepLine,
    /// What happened.
    pub status: StepStatus,
}

/// Outcome of every step in a scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// One entry per step, in order.
    pub outcomes: Vec<StepOutcome>,
    /// Sessions held by the scenario's context when it finished.
    pub sessions: usize,
}

impl ScenarioReport {
    /// Returns `true` when no step failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure().is_none()
    }

    /// First failing step and its error.
    #[must_use]
    pub fn failure(&self) -> Option<(&StepLine, &StepError)> {
        self.outcomes.iter().find_map(|outcome| match &outcome.status {
            StepStatus::Failed(err) => Some((&outcome.step, err)),
            _ => None,
        })
    }

    /// Steps left unrun after the failure.
    pub fn skipped(&self) -> impl Iterator<Item = &StepLine> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, StepStatus::Skipped))
            .map(|outcome| &outcome.step)
    }
}

/// Dispatch `steps` in order against `world`, stopping at the first failure.
pub fn execute<W>(registry: &StepRegistry<W>, steps: &[StepLine], world: &mut W) -> Vec<StepOutcome> {
    let mut aborted = false;
    steps
        .iter()
        .map(|step| {
            let status = if aborted {
                StepStatus::Skipped
            } else {
                match registry.dispatch(&step.text, world) {
                    Ok(()) => StepStatus::Passed,
                    Err(err) => {
                        warn!(line = step.line_number, step = %step.text, error = %err, "step failed");
                        aborted = true;
                        StepStatus::Failed(err)
                    }
                }
            };
            StepOutcome {
                step: step.clone(),
                status,
            }
        })
        .collect()
}

/// Runs scenarios against the Candlepin steps, one fresh context each.
pub struct ScenarioRunner<'r> {
    registry: &'r StepRegistry<ScenarioContext>,
    api: Rc<dyn CandlepinApi>,
    owner_id: String,
}

impl fmt::Debug for ScenarioRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("registry", self.registry)
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

impl<'r> ScenarioRunner<'r> {
    /// Create a runner dispatching through `registry` with `api` as the
    /// collaborator and `owner_id` as every scenario's owner.
    #[must_use]
    pub fn new(
        registry: &'r StepRegistry<ScenarioContext>,
        api: Rc<dyn CandlepinApi>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            api,
            owner_id: owner_id.into(),
        }
    }

    /// Execute `scenario` against a new [`ScenarioContext`].
    #[must_use]
    pub fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let _span = info_span!("scenario", name = %scenario.name).entered();
        let mut context = ScenarioContext::new(Rc::clone(&self.api), self.owner_id.clone());
        let outcomes = execute(self.registry, &scenario.steps, &mut context);
        let report = ScenarioReport {
            name: scenario.name.clone(),
            outcomes,
            sessions: context.session_count(),
        };
        info!(passed = report.passed(), "scenario finished");
        report
    }
}
