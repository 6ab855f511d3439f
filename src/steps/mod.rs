//! Step registry and dispatcher.
//!
//! A [`StepRegistry`] holds an ordered list of step definitions, each pairing
//! a compiled regular expression with a handler. [`StepRegistry::dispatch`]
//! strips the Gherkin keyword from a scenario line, resolves the single
//! definition whose pattern matches the remaining text, and invokes its
//! handler with the captured substrings and the mutable scenario state.
//!
//! # Examples
//!
//! ```
//! use candlepin_steps::steps::{StepArgs, StepError, StepRegistry};
//!
//! fn remember(args: &StepArgs<'_>, seen: &mut Vec<String>) -> Result<(), StepError> {
//!     seen.push(args.arg(0)?.to_owned());
//!     Ok(())
//! }
//!
//! let mut registry = StepRegistry::new();
//! registry.register(r#"a user "([^"]*)""#, remember)?;
//! let mut seen = Vec::new();
//! registry.dispatch(r#"Given a user "alice""#, &mut seen)?;
//! assert_eq!(seen, ["alice"]);
//! # Ok::<(), StepError>(())
//! ```

mod error;
pub mod user;

pub use error::{MatchError, StepError};

use crate::context::ScenarioContext;
use regex::{Captures, Regex};
use std::fmt;
use tracing::debug;

/// Handler invoked for a matched step.
pub type StepFn<W> = fn(&StepArgs<'_>, &mut W) -> Result<(), StepError>;

/// Gherkin keywords stripped from the front of a step line.
const KEYWORDS: [&str; 5] = ["Given", "When", "Then", "And", "But"];

/// How the dispatcher treats a line matched by several definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Reject the line with [`MatchError::Ambiguous`].
    #[default]
    Strict,
    /// Run the earliest registered definition.
    FirstMatch,
}

struct StepDefinition<W> {
    pattern: String,
    matcher: Regex,
    handler: StepFn<W>,
}

/// Ordered collection of step definitions over scenario state `W`.
pub struct StepRegistry<W> {
    definitions: Vec<StepDefinition<W>>,
    policy: MatchPolicy,
}

impl<W> Default for StepRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> fmt::Debug for StepRegistry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<W> StepRegistry<W> {
    /// Create an empty registry using [`MatchPolicy::Strict`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            definitions: Vec::new(),
            policy: MatchPolicy::Strict,
        }
    }

    /// Replace the ambiguity policy.
    #[must_use]
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active ambiguity policy.
    #[must_use]
    pub const fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Bind `pattern` to `handler`.
    ///
    /// The pattern must match the whole step text, so it is anchored at both
    /// ends before compilation.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn register(&mut self, pattern: &str, handler: StepFn<W>) -> Result<&mut Self, StepError> {
        let matcher =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| StepError::InvalidPattern {
                pattern: pattern.to_owned(),
                source: Box::new(source),
            })?;
        self.definitions.push(StepDefinition {
            pattern: pattern.to_owned(),
            matcher,
            handler,
        });
        Ok(self)
    }

    /// Registered patterns in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|def| def.pattern.as_str())
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Run the definition matching `line` against `world`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Match`] when the line matches no definition, or
    /// several under [`MatchPolicy::Strict`]. Handler failures are returned
    /// unchanged.
    pub fn dispatch(&self, line: &str, world: &mut W) -> Result<(), StepError> {
        let text = strip_keyword(line);
        let (definition, captures) = self.resolve(text)?;
        debug!(step = text, pattern = %definition.pattern, "dispatching step");
        (definition.handler)(&StepArgs { text, captures }, world)
    }

    fn resolve<'t>(&self, text: &'t str) -> Result<(&StepDefinition<W>, Captures<'t>), MatchError> {
        let mut candidates = self
            .definitions
            .iter()
            .filter_map(|def| def.matcher.captures(text).map(|caps| (def, caps)));
        let Some(first) = candidates.next() else {
            return Err(MatchError::NoMatch {
                line: text.to_owned(),
            });
        };
        if self.policy == MatchPolicy::FirstMatch {
            return Ok(first);
        }
        let rivals: Vec<String> = candidates.map(|(def, _)| def.pattern.clone()).collect();
        if rivals.is_empty() {
            return Ok(first);
        }
        let mut patterns = Vec::with_capacity(rivals.len() + 1);
        patterns.push(first.0.pattern.clone());
        patterns.extend(rivals);
        Err(MatchError::Ambiguous {
            line: text.to_owned(),
            patterns,
        })
    }
}

/// Captures extracted from a matched step line.
#[derive(Debug)]
pub struct StepArgs<'t> {
    text: &'t str,
    captures: Captures<'t>,
}

impl<'t> StepArgs<'t> {
    /// Step text the pattern matched, without its keyword.
    #[must_use]
    pub const fn text(&self) -> &'t str {
        self.text
    }

    /// Value of the positional capture `index`, counting from zero.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingCapture`] when the group does not exist or
    /// did not participate in the match.
    pub fn arg(&self, index: usize) -> Result<&'t str, StepError> {
        index
            .checked_add(1)
            .and_then(|group| self.captures.get(group))
            .map(|m| m.as_str())
            .ok_or_else(|| self.missing(index.to_string()))
    }

    /// Value of the named capture `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingCapture`] when the group does not exist or
    /// did not participate in the match.
    pub fn named(&self, name: &str) -> Result<&'t str, StepError> {
        self.captures
            .name(name)
            .map(|m| m.as_str())
            .ok_or_else(|| self.missing(name.to_owned()))
    }

    /// Number of capture groups in the pattern.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len().saturating_sub(1)
    }

    /// Returns `true` when the pattern has no capture groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self, capture: String) -> StepError {
        StepError::MissingCapture {
            line: self.text.to_owned(),
            capture,
        }
    }
}

/// Trim `line` and drop one leading Gherkin keyword.
///
/// # Examples
///
/// ```
/// use candlepin_steps::steps::strip_keyword;
///
/// assert_eq!(strip_keyword("  Given an owner admin \"bob\""), "an owner admin \"bob\"");
/// assert_eq!(strip_keyword("* I am logged in as \"bob\""), "I am logged in as \"bob\"");
/// assert_eq!(strip_keyword("Andrew logs in"), "Andrew logs in");
/// ```
#[must_use]
pub fn strip_keyword(line: &str) -> &str {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('*') {
        return rest.trim_start();
    }
    KEYWORDS
        .iter()
        .find_map(|keyword| {
            trimmed
                .strip_prefix(keyword)
                .filter(|rest| rest.starts_with(char::is_whitespace))
        })
        .map_or(trimmed, str::trim_start)
}

/// Registry holding every Candlepin step shipped with the crate.
///
/// # Errors
///
/// Returns [`StepError::InvalidPattern`] if a built-in pattern fails to
/// compile.
pub fn default_registry(policy: MatchPolicy) -> Result<StepRegistry<ScenarioContext>, StepError> {
    let mut registry = StepRegistry::new().with_policy(policy);
    user::register(&mut registry)?;
    Ok(registry)
}
