//! Tests for the user provisioning and login steps.
//!
//! The Candlepin collaborator is mocked so each test pins down exactly which
//! remote calls a step makes and how it updates the scenario context.

#![expect(clippy::expect_used, reason = "static URL always parses")]

use anyhow::{Context, Result, ensure};
use candlepin_steps::client::{CandlepinApi, ClientError, Credentials, Session};
use candlepin_steps::context::ScenarioContext;
use candlepin_steps::steps::{MatchPolicy, StepError, default_registry, user};
use mockall::{Sequence, mock};
use rstest::rstest;
use std::rc::Rc;
use url::Url;

mock! {
    pub Api {}
    impl CandlepinApi for Api {
        fn create_user(&self, owner_id: &str, username: &str, password: &str)
            -> Result<(), ClientError>;
        fn connect(&self, username: &str, password: &str) -> Result<Session, ClientError>;
    }
}

fn context_with(api: MockApi) -> ScenarioContext {
    let api: Rc<dyn CandlepinApi> = Rc::new(api);
    ScenarioContext::new(api, "admin")
}

fn session(username: &str) -> Session {
    let base = Url::parse("http://localhost:8080/candlepin").expect("static URL parses");
    Session::new(Credentials::new(username, user::TEST_PASSWORD), base)
}

fn conflict() -> ClientError {
    ClientError::Status {
        method: "POST",
        path: String::from("/candlepin/owners/admin/users"),
        status: 409,
        reason: String::from("Conflict"),
        body: String::new(),
    }
}

#[rstest]
fn owner_admin_creates_user_with_test_password() -> Result<()> {
    let mut api = MockApi::new();
    api.expect_create_user()
        .withf(|owner, username, password| {
            owner == "admin" && username == "alice" && password == "password"
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    api.expect_connect().never();
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);

    registry.dispatch(r#"Given an owner admin "alice""#, &mut ctx)?;

    ensure!(ctx.username.as_deref() == Some("alice"), "username not stored");
    ensure!(
        ctx.password.as_deref() == Some(user::TEST_PASSWORD),
        "password not stored"
    );
    ensure!(ctx.session_count() == 0, "creation must not log in");
    Ok(())
}

#[rstest]
fn owner_admin_uses_the_context_owner() -> Result<()> {
    let mut api = MockApi::new();
    api.expect_create_user()
        .withf(|owner, _, _| owner == "acme")
        .times(1)
        .returning(|_, _, _| Ok(()));
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);
    ctx.owner_id = String::from("acme");

    registry.dispatch(r#"Given an owner admin "bob""#, &mut ctx)?;
    Ok(())
}

#[rstest]
fn owner_admin_propagates_collaborator_failure() -> Result<()> {
    let mut api = MockApi::new();
    api.expect_create_user()
        .times(1)
        .returning(|_, _, _| Err(conflict()));
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);

    let err = registry
        .dispatch(r#"Given an owner admin "alice""#, &mut ctx)
        .err()
        .context("duplicate user should fail the step")?;

    ensure!(
        matches!(&err, StepError::Collaborator(inner) if inner.status() == Some(409)),
        "unexpected error {err:?}"
    );
    ensure!(
        ctx.username.as_deref() == Some("alice"),
        "username is recorded before the remote call"
    );
    Ok(())
}

#[rstest]
fn login_stores_a_session() -> Result<()> {
    let mut api = MockApi::new();
    api.expect_connect()
        .withf(|username, password| username == "alice" && password == "password")
        .times(1)
        .returning(|username, _| Ok(session(username)));
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);

    registry.dispatch(r#"When I am logged in as "alice""#, &mut ctx)?;

    let stored = ctx.session_for("alice").context("session missing")?;
    ensure!(stored.username() == "alice", "wrong session user");
    ensure!(
        stored.credentials().password() == user::TEST_PASSWORD,
        "session should use the test password"
    );
    Ok(())
}

#[rstest]
fn login_failure_leaves_no_session() -> Result<()> {
    let mut api = MockApi::new();
    api.expect_connect().times(1).returning(|username, _| {
        Err(ClientError::Status {
            method: "GET",
            path: format!("/candlepin/users/{username}"),
            status: 401,
            reason: String::from("Unauthorized"),
            body: String::new(),
        })
    });
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);

    let result = registry.dispatch(r#"When I am logged in as "mallory""#, &mut ctx);

    ensure!(result.is_err(), "login should fail");
    ensure!(ctx.session_count() == 0, "no session should be stored");
    Ok(())
}

#[rstest]
fn create_then_login_calls_in_order() -> Result<()> {
    let mut api = MockApi::new();
    let mut seq = Sequence::new();
    api.expect_create_user()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    api.expect_connect()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|username, _| Ok(session(username)));
    let registry = default_registry(MatchPolicy::Strict)?;
    let mut ctx = context_with(api);

    registry.dispatch(r#"Given an owner admin "alice""#, &mut ctx)?;
    registry.dispatch(r#"And I am logged in as "alice""#, &mut ctx)?;

    ensure!(ctx.session_for("alice").is_some(), "session missing");
    Ok(())
}

#[rstest]
fn default_registry_lists_user_steps() -> Result<()> {
    let registry = default_registry(MatchPolicy::Strict)?;
    let patterns: Vec<&str> = registry.patterns().collect();
    ensure!(
        patterns == [user::OWNER_ADMIN, user::LOGGED_IN_AS],
        "unexpected patterns {patterns:?}"
    );
    Ok(())
}
