//! Command line interface definition using clap.
//!
//! [`Cli`] doubles as the configuration schema: `OrthoConfig` layers
//! defaults, discovered configuration files, `CANDLEPIN_STEPS_*` environment
//! variables, and explicitly supplied flags, in that order of precedence.

use crate::client::{ClientConfig, Credentials, DEFAULT_BASE_URL};
use crate::steps::MatchPolicy;
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoError, OrthoMergeExt, OrthoResult,
    sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "candlepin-steps";
const CONFIG_ENV_VAR: &str = "CANDLEPIN_STEPS_CONFIG_PATH";
const ENV_PREFIX: &str = "CANDLEPIN_STEPS_";

/// Fields that may be overridden from the command line.
const CLI_FIELDS: [&str; 7] = [
    "url",
    "owner",
    "admin_username",
    "admin_password",
    "timeout_secs",
    "first_match",
    "verbose",
];

/// Run Candlepin behavioural scenarios against a live server.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(name = "candlepin-steps", author, version, about, long_about = None)]
#[ortho_config(prefix = "CANDLEPIN_STEPS")]
pub struct Cli {
    /// Base URL of the Candlepin API.
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    #[ortho_config(default = default_url())]
    pub url: String,

    /// Owner that scenario users are created in.
    #[arg(long, value_name = "OWNER", default_value = "admin")]
    #[ortho_config(default = default_admin())]
    pub owner: String,

    /// Administrative login used to create users.
    #[arg(long, value_name = "USER", default_value = "admin")]
    #[ortho_config(default = default_admin())]
    pub admin_username: String,

    /// Password for the administrative login.
    #[arg(long, value_name = "PASSWORD", default_value = "admin")]
    #[ortho_config(default = default_admin())]
    pub admin_password: String,

    /// Overall timeout for a single request, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Run the first matching step instead of rejecting ambiguous lines.
    #[arg(long)]
    #[ortho_config(default = false)]
    pub first_match: bool,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Subcommand to execute; defaults to `steps` when omitted.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_admin() -> String {
    String::from("admin")
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Steps);
        }
        self
    }

    /// Client settings derived from the merged configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.url.clone(),
            admin: Credentials::new(self.admin_username.as_str(), self.admin_password.as_str()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Ambiguity policy selected by `--first-match`.
    #[must_use]
    pub const fn match_policy(&self) -> MatchPolicy {
        if self.first_match {
            MatchPolicy::FirstMatch
        } else {
            MatchPolicy::Strict
        }
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            url: default_url(),
            owner: default_admin(),
            admin_username: default_admin(),
            admin_password: default_admin(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            first_match: false,
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Arguments accepted by the `run` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RunArgs {
    /// Feature files, or directories searched for `*.feature` files.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Run every scenario in the given feature files.
    Run(RunArgs),

    /// List the registered step patterns.
    Steps,
}

/// Parse CLI arguments from `iter`.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|clap_err| clap_err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

fn config_discovery() -> ConfigDiscovery {
    ConfigDiscovery::builder(APP_NAME)
        .env_var(CONFIG_ENV_VAR)
        .build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let mut map = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in CLI_FIELDS {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    if let Some(defaults) = keep_ok(sanitize_value(&Cli::default()), &mut errors) {
        composer.push_defaults(defaults);
    }
    push_config_files(&mut composer, &mut errors);
    if let Some(environment) = keep_ok(environment_layer(), &mut errors) {
        composer.push_environment(environment);
    }
    if let Some(flags) = keep_ok(cli_overrides_from_matches(cli, matches), &mut errors)
        .filter(|value| !is_empty_value(value))
    {
        composer.push_cli(flags);
    }

    let merged = LayerComposition::new(composer.layers(), errors)
        .into_merge_result(Cli::merge_from_layers)?;
    // Subcommands are never read from files or the environment.
    Ok(Cli {
        command: cli.command.clone(),
        ..merged
    }
    .with_default_command())
}

fn keep_ok<T>(result: OrthoResult<T>, errors: &mut Vec<Arc<OrthoError>>) -> Option<T> {
    result.map_err(|err| errors.push(err)).ok()
}

/// Discovered configuration files; optional discovery errors only matter
/// when no file loaded.
fn push_config_files(composer: &mut MergeComposer, errors: &mut Vec<Arc<OrthoError>>) {
    let mut discovered = config_discovery().compose_layers();
    errors.append(&mut discovered.required_errors);
    if discovered.value.is_empty() {
        errors.append(&mut discovered.optional_errors);
    }
    for layer in discovered.value {
        composer.push_layer(layer);
    }
}

fn environment_layer() -> OrthoResult<serde_json::Value> {
    let provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    Figment::from(provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
}
