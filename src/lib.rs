//! Candlepin behavioural test steps.
//!
//! This library binds scenario phrases such as `an owner admin "alice"` to
//! calls against a Candlepin server, and provides the registry, scenario
//! runner, HTTP client, and command line interface around them.

pub mod cli;
pub mod client;
pub mod context;
pub mod runner;
pub mod scenario;
pub mod steps;
