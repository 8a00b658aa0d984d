use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::{RebuildError, Result};
use crate::scheduler::{discover, plan_jobs, ConcurrencyLimiter, JobDescriptor, JobSlot};
use crate::worker::{ExecutionResult, JobExecutor, JobRunner};

/// Outcome of a run in which every job succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs_completed: usize,
    pub elapsed: Duration,
}

/// Ties discovery, the concurrency limiter and the job runner together.
pub struct Orchestrator<R = JobExecutor> {
    config: RunConfig,
    runner: Arc<R>,
}

impl Orchestrator<JobExecutor> {
    pub fn new(config: RunConfig) -> Self {
        let runner = JobExecutor::new(&config);
        Self::with_runner(config, runner)
    }
}

impl<R: JobRunner> Orchestrator<R> {
    pub fn with_runner(config: RunConfig, runner: R) -> Self {
        Self {
            config,
            runner: Arc::new(runner),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Discover the work on disk, then run every job.
    ///
    /// Returns at the first fatal error without waiting for other jobs that
    /// are still running. Those keep running in the background; their child
    /// processes are not killed.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<RunSummary> {
        self.config.validate()?;

        let databases = discover(&self.config)?;
        let jobs = plan_jobs(&databases);
        tracing::info!(
            databases = databases.len(),
            jobs = jobs.len(),
            concurrency = self.config.concurrency,
            "Starting rebuild"
        );

        self.run_jobs(jobs, shutdown).await
    }

    /// Run the given jobs in order, at most `concurrency` at a time.
    pub async fn run_jobs(
        &self,
        jobs: Vec<JobDescriptor>,
        shutdown: CancellationToken,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let limiter = ConcurrencyLimiter::new(self.config.concurrency)?;
        let mut tasks: JoinSet<(JobSlot, Result<ExecutionResult>)> = JoinSet::new();
        let mut completed = 0usize;

        let outcome = async {
            for job in jobs {
                // Wait for a slot, reaping finished jobs meanwhile so a failure
                // stops dispatch right away.
                let slot = loop {
                    tokio::select! {
                        biased;
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                            self.handle_completion(joined)?;
                            completed += 1;
                        }
                        _ = shutdown.cancelled() => {
                            tracing::warn!(%job, "Shutdown requested, not dispatching remaining jobs");
                            return Err(RebuildError::Interrupted);
                        }
                        slot = limiter.acquire() => break slot?,
                    }
                };

                let runner = self.runner.clone();
                tasks.spawn(async move {
                    // The slot travels back with the result and is only given
                    // up once the dispatcher has seen a success. A panicking
                    // runner is caught by the inner task so the slot is never
                    // released early by unwinding.
                    let result = tokio::spawn(async move { runner.run(&job).await })
                        .await
                        .unwrap_or_else(|e| Err(RebuildError::JobPanicked(e.to_string())));
                    (slot, result)
                });
            }

            while !tasks.is_empty() {
                tokio::select! {
                    biased;
                    Some(joined) = tasks.join_next() => {
                        self.handle_completion(joined)?;
                        completed += 1;
                    }
                    _ = shutdown.cancelled() => {
                        tracing::warn!(in_flight = tasks.len(), "Shutdown requested while jobs are running");
                        return Err(RebuildError::Interrupted);
                    }
                }
            }
            Ok::<(), RebuildError>(())
        }
        .await;

        if let Err(e) = outcome {
            if !tasks.is_empty() {
                tracing::warn!(
                    in_flight = tasks.len(),
                    "Leaving in-flight jobs running after fatal error"
                );
            }
            tasks.detach_all();
            return Err(e);
        }

        let summary = RunSummary {
            jobs_completed: completed,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            jobs = summary.jobs_completed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Rebuild finished"
        );
        Ok(summary)
    }

    fn handle_completion(
        &self,
        joined: std::result::Result<(JobSlot, Result<ExecutionResult>), JoinError>,
    ) -> Result<()> {
        let (slot, result) = joined.map_err(|e| RebuildError::JobPanicked(e.to_string()))?;
        // On error the slot is dropped only after dispatch has stopped.
        let result = result?;
        drop(slot);

        tracing::debug!(
            job = %result.job,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Job finished"
        );
        if self.config.verbose {
            println!("{}", result.output);
        }
        Ok(())
    }
}
