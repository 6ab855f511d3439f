//! Steps that provision Candlepin users and log in as them.

use super::{StepArgs, StepError, StepRegistry};
use crate::context::ScenarioContext;
use tracing::info;

/// Password given to every user the steps create.
pub const TEST_PASSWORD: &str = "password";

/// Pattern for [`create_owner_admin`].
pub const OWNER_ADMIN: &str = r#"an owner admin "([^"]*)""#;

/// Pattern for [`log_in_as`].
pub const LOGGED_IN_AS: &str = r#"I am logged in as "([^"]*)""#;

/// Register the user steps on `registry`.
///
/// # Errors
///
/// Returns [`StepError::InvalidPattern`] if a pattern fails to compile.
pub fn register(registry: &mut StepRegistry<ScenarioContext>) -> Result<(), StepError> {
    registry
        .register(OWNER_ADMIN, create_owner_admin)?
        .register(LOGGED_IN_AS, log_in_as)?;
    Ok(())
}

/// `an owner admin "<username>"`
///
/// Records the user and the fixed test password on the context, then creates
/// the user inside the context's owner.
///
/// # Errors
///
/// Propagates the collaborator's failure, e.g. a duplicate username.
pub fn create_owner_admin(args: &StepArgs<'_>, ctx: &mut ScenarioContext) -> Result<(), StepError> {
    let username = args.arg(0)?;
    ctx.username = Some(username.to_owned());
    ctx.password = Some(TEST_PASSWORD.to_owned());
    info!(owner = %ctx.owner_id, username, "creating owner admin");
    ctx.api().create_user(&ctx.owner_id, username, TEST_PASSWORD)?;
    Ok(())
}

/// `I am logged in as "<username>"`
///
/// # Errors
///
/// Propagates the collaborator's authentication failure.
pub fn log_in_as(args: &StepArgs<'_>, ctx: &mut ScenarioContext) -> Result<(), StepError> {
    let username = args.arg(0)?;
    info!(username, "logging in");
    let session = ctx.api().connect(username, TEST_PASSWORD)?;
    ctx.store_session(session);
    Ok(())
}
