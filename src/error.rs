use std::path::PathBuf;

use thiserror::Error;

use crate::scheduler::JobDescriptor;

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read directory '{}': {source}", path.display())]
    DiscoveryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch buildtsi for {job}: {source}")]
    JobLaunch {
        job: JobDescriptor,
        #[source]
        source: std::io::Error,
    },

    #[error("buildtsi failed for {job} (exit code: {exit_code:?})\n{output}")]
    JobExecution {
        job: JobDescriptor,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Job task panicked: {0}")]
    JobPanicked(String),

    #[error("Interrupted by shutdown signal")]
    Interrupted,

    #[error("Failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RebuildError {
    /// The job this error belongs to, if it came from a single job.
    pub fn job(&self) -> Option<&JobDescriptor> {
        match self {
            RebuildError::JobLaunch { job, .. } | RebuildError::JobExecution { job, .. } => {
                Some(job)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RebuildError>;
