//! World shared by the behavioural scenarios.
//!
//! Non-Clone state lives in `RefCell<Option<T>>`; Clone-able values use
//! `Slot<T>`.

// The `#[fixture]` macro generates types that cannot have doc comments attached
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use candlepin_steps::context::ScenarioContext;
use candlepin_steps::steps::{StepError, StepRegistry};
use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use std::rc::Rc;
use test_support::RecordingApi;

/// State for one behavioural scenario.
#[derive(Default)]
pub struct TestWorld {
    /// In-memory Candlepin server the steps talk to.
    pub server: RefCell<Option<Rc<RecordingApi>>>,
    /// Registry under test.
    pub registry: RefCell<Option<StepRegistry<ScenarioContext>>>,
    /// Context threaded through every dispatched line.
    pub context: RefCell<Option<ScenarioContext>>,
    /// Outcome of the most recent dispatch.
    pub last_result: RefCell<Option<Result<(), StepError>>>,
    /// Text of the most recently dispatched line.
    pub last_line: Slot<String>,
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Strip one pair of matching surrounding quotes from a step parameter.
///
/// rstest-bdd captures quoted text including the quotes.
#[must_use]
pub fn strip_quotes(s: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| s.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)))
        .unwrap_or(s)
}
