//! Core library for maestro, a release orchestrator for ecosystems of
//! interdependent packages spread across many repositories.
//!
//! The flow is: the [`analysis`] layer collects per-project facts through a
//! language adapter and inverts the dependency relation into a
//! [`analysis::DependentsGraph`]; the [`release`] planner turns a set of
//! source projects and target versions into a phased release plan; the
//! executor drives every project of the plan through its lifecycle stages,
//! persisting the release document after each transition so an interrupted
//! run can be resumed.

pub mod analysis;
pub mod checksum;
pub mod config;
pub mod context;
pub mod edit;
pub mod error;
pub mod jobs;
pub mod language;
pub mod log;
pub mod process;
pub mod prompt;
pub mod release;
pub mod vcs;
pub mod version;

pub use context::Context;
pub use error::{Error, Result};
