//! Work planning for a rebuild run.
//!
//! - [`discovery`]: finds databases and shards on disk
//! - [`job`]: the [`Database`] and [`JobDescriptor`] values discovery produces
//! - [`limiter`]: bounds how many jobs run at once

pub mod discovery;
pub mod job;
pub mod limiter;

pub use discovery::discover;
pub use job::{plan_jobs, Database, JobDescriptor, ShardId};
pub use limiter::{ConcurrencyLimiter, JobSlot};
