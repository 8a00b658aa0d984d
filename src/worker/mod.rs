//! Execution of individual rebuild jobs.
//!
//! [`JobExecutor`] spawns `<inspect-bin> buildtsi ...` for one
//! database/shard pair, answers its confirmation prompt with `y`, and
//! captures stdout and stderr. A non-zero exit or a failure to start the
//! process comes back as an error; the orchestrator treats either as fatal.
//!
//! The [`JobRunner`] trait lets the orchestrator drive other runners, such
//! as instrumented ones in tests.

pub mod executor;

pub use executor::{ExecutionResult, JobExecutor, JobRunner};
