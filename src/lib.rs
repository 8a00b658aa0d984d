pub mod config;
pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

pub use config::RunConfig;
pub use error::{RebuildError, Result};
pub use orchestrator::{Orchestrator, RunSummary};
