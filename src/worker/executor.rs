use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::process::Command;

use crate::config::RunConfig;
use crate::error::{RebuildError, Result};
use crate::scheduler::JobDescriptor;

/// Answer fed to the tool's "are you sure" prompt.
const CONFIRMATION: &[u8] = b"y";

/// Output of a job whose command exited successfully.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub job: JobDescriptor,
    pub exit_code: Option<i32>,
    /// Captured stdout followed by captured stderr
    pub output: String,
    pub elapsed: Duration,
}

/// Runs a single job to completion.
///
/// Any error returned is fatal for the whole run.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job: &JobDescriptor) -> Result<ExecutionResult>;
}

/// Runs `influx_inspect buildtsi` for one database/shard pair.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    inspect_bin: PathBuf,
    data_dir: PathBuf,
    wal_dir: PathBuf,
    max_log_file_size: u64,
}

impl JobExecutor {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            inspect_bin: config.inspect_bin.clone(),
            data_dir: config.data_dir.clone(),
            wal_dir: config.wal_dir.clone(),
            max_log_file_size: config.max_log_file_size,
        }
    }

    /// Arguments passed to the external tool. Flag names are part of the
    /// tool's interface and must not change.
    pub fn args(&self, job: &JobDescriptor) -> Vec<OsString> {
        vec![
            "buildtsi".into(),
            "-datadir".into(),
            self.data_dir.clone().into(),
            "-waldir".into(),
            self.wal_dir.clone().into(),
            "-max-log-file-size".into(),
            self.max_log_file_size.to_string().into(),
            "-database".into(),
            job.database().into(),
            "-shard".into(),
            job.shard().to_string().into(),
        ]
    }

    /// Run the tool with stdout and stderr sharing one pipe, so the captured
    /// output keeps the order in which the tool wrote it.
    async fn run_command(&self, job: &JobDescriptor) -> std::io::Result<(ExitStatus, Vec<u8>)> {
        let (writer, mut reader) = pipe::pipe()?;
        let stdout = writer.into_blocking_fd()?;
        let stderr = stdout.try_clone()?;

        // The command holds our copies of the write end; it must be dropped
        // before reading or the pipe never reaches EOF.
        let mut child = {
            let mut command = Command::new(&self.inspect_bin);
            command
                .args(self.args(job))
                .stdin(Stdio::piped())
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr))
                .kill_on_drop(false);
            command.spawn()?
        };

        if let Some(mut stdin) = child.stdin.take() {
            // The tool may exit without ever reading stdin.
            if let Err(e) = stdin.write_all(CONFIRMATION).await {
                tracing::debug!(%job, error = %e, "Could not write confirmation to stdin");
            }
        }

        let mut output = Vec::new();
        let (status, read) = tokio::join!(child.wait(), reader.read_to_end(&mut output));
        read?;
        Ok((status?, output))
    }

    fn process_output(
        job: &JobDescriptor,
        status: ExitStatus,
        output: &[u8],
        elapsed: Duration,
    ) -> Result<ExecutionResult> {
        let combined = String::from_utf8_lossy(output).into_owned();
        let exit_code = status.code();

        if !status.success() {
            tracing::error!(
                database = %job.database().to_string_lossy(),
                shard = job.shard(),
                exit_code = ?exit_code,
                "buildtsi failed"
            );
            return Err(RebuildError::JobExecution {
                job: job.clone(),
                exit_code,
                output: combined,
            });
        }

        tracing::info!(
            database = %job.database().to_string_lossy(),
            shard = job.shard(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Shard index rebuilt"
        );

        Ok(ExecutionResult {
            job: job.clone(),
            exit_code,
            output: combined,
            elapsed,
        })
    }
}

#[async_trait]
impl JobRunner for JobExecutor {
    async fn run(&self, job: &JobDescriptor) -> Result<ExecutionResult> {
        tracing::info!(
            database = %job.database().to_string_lossy(),
            shard = job.shard(),
            "Processing shard"
        );

        let started = Instant::now();
        let (status, output) = self
            .run_command(job)
            .await
            .map_err(|source| RebuildError::JobLaunch {
                job: job.clone(),
                source,
            })?;

        Self::process_output(job, status, &output, started.elapsed())
    }
}
