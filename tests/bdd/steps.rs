//! Step definitions for the owner admin scenarios.
//!
//! Each `When` step feeds one scenario line through the default registry,
//! keeping the context alive between lines as the runner does.

use crate::bdd::fixtures::{TestWorld, strip_quotes};
use anyhow::{Context, Result, bail, ensure};
use candlepin_steps::client::CandlepinApi;
use candlepin_steps::context::ScenarioContext;
use candlepin_steps::steps::{MatchError, MatchPolicy, StepError, default_registry, user};
use rstest_bdd_macros::{given, then, when};
use std::rc::Rc;
use test_support::{ApiCall, RecordingApi};

const OWNER: &str = "admin";

fn install_server(world: &TestWorld, server: RecordingApi) -> Result<()> {
    let server = Rc::new(server);
    let api: Rc<dyn CandlepinApi> = server.clone();
    *world.registry.borrow_mut() = Some(default_registry(MatchPolicy::Strict)?);
    *world.context.borrow_mut() = Some(ScenarioContext::new(api, OWNER));
    *world.server.borrow_mut() = Some(server);
    Ok(())
}

fn server(world: &TestWorld) -> Result<Rc<RecordingApi>> {
    world
        .server
        .borrow()
        .clone()
        .context("no Candlepin server has been set up")
}

fn failure_status(world: &TestWorld) -> Result<Option<u16>> {
    let result = world.last_result.borrow();
    match result.as_ref().context("no line has been dispatched")? {
        Ok(()) => bail!("expected the last step to fail"),
        Err(StepError::Collaborator(err)) => Ok(err.status()),
        Err(_) => Ok(None),
    }
}

#[given("a Candlepin server with no users")]
fn empty_server(world: &TestWorld) -> Result<()> {
    install_server(world, RecordingApi::new())
}

#[given("a Candlepin server that already has the user {username}")]
fn server_with_user(world: &TestWorld, username: String) -> Result<()> {
    install_server(
        world,
        RecordingApi::with_existing_user(strip_quotes(&username), user::TEST_PASSWORD),
    )
}

#[when("the line {line} is dispatched")]
fn dispatch_line(world: &TestWorld, line: String) -> Result<()> {
    let text = strip_quotes(&line);
    let registry_ref = world.registry.borrow();
    let registry = registry_ref
        .as_ref()
        .context("registry has not been built")?;
    let mut context_ref = world.context.borrow_mut();
    let context = context_ref
        .as_mut()
        .context("context has not been built")?;
    let result = registry.dispatch(text, context);
    *world.last_result.borrow_mut() = Some(result);
    world.last_line.set(text.to_owned());
    Ok(())
}

#[then("the last step succeeded")]
fn last_step_succeeded(world: &TestWorld) -> Result<()> {
    let result = world.last_result.borrow();
    match result.as_ref().context("no line has been dispatched")? {
        Ok(()) => Ok(()),
        Err(err) => bail!(
            "line {:?} failed: {err}",
            world.last_line.get().unwrap_or_default()
        ),
    }
}

#[then("the last step failed with status {status}")]
fn last_step_failed_with(world: &TestWorld, status: u16) -> Result<()> {
    let actual = failure_status(world)?;
    ensure!(
        actual == Some(status),
        "expected status {status}, got {actual:?}"
    );
    Ok(())
}

#[then("the last step failed because no step matches")]
fn last_step_unmatched(world: &TestWorld) -> Result<()> {
    let result = world.last_result.borrow();
    let outcome = result.as_ref().context("no line has been dispatched")?;
    ensure!(
        matches!(outcome, Err(StepError::Match(MatchError::NoMatch { .. }))),
        "expected a no-match failure, got {outcome:?}"
    );
    Ok(())
}

#[then("the server created {username} in owner {owner} with the test password")]
fn server_created(world: &TestWorld, username: String, owner: String) -> Result<()> {
    let expected = ApiCall::CreateUser {
        owner_id: strip_quotes(&owner).to_owned(),
        username: strip_quotes(&username).to_owned(),
        password: user::TEST_PASSWORD.to_owned(),
    };
    let calls = server(world)?.calls();
    ensure!(
        calls.contains(&expected),
        "expected {expected:?} among {calls:?}"
    );
    Ok(())
}

#[then("a session is held for {username}")]
fn session_held(world: &TestWorld, username: String) -> Result<()> {
    let name = strip_quotes(&username);
    let context_ref = world.context.borrow();
    let context = context_ref
        .as_ref()
        .context("context has not been built")?;
    let session = context
        .session_for(name)
        .with_context(|| format!("no session for {name}"))?;
    ensure!(session.username() == name, "session user mismatch");
    Ok(())
}

#[then("no session is held")]
fn no_session(world: &TestWorld) -> Result<()> {
    let context_ref = world.context.borrow();
    let context = context_ref
        .as_ref()
        .context("context has not been built")?;
    ensure!(
        context.session_count() == 0,
        "expected no sessions, found {}",
        context.session_count()
    );
    Ok(())
}

#[then("the server received no calls")]
fn no_calls(world: &TestWorld) -> Result<()> {
    let calls = server(world)?.calls();
    ensure!(calls.is_empty(), "unexpected calls: {calls:?}");
    Ok(())
}
