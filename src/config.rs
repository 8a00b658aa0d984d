use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{RebuildError, Result};

pub const DEFAULT_DATA_DIR: &str = "/var/lib/influxdb/data";
pub const DEFAULT_WAL_DIR: &str = "/var/lib/influxdb/wal";
pub const DEFAULT_MAX_LOG_FILE_SIZE: u64 = 131_072;
pub const DEFAULT_INSPECT_BIN: &str = "influx_inspect";

/// Database that holds InfluxDB's own monitoring data. Never picked up by
/// auto-discovery, only when named explicitly.
pub const INTERNAL_DATABASE: &str = "_internal";

/// Retention policy directory that shard directories live under.
pub const RETENTION_POLICY_DIR: &str = "autogen";

/// Number of jobs to run at once when none is configured.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Settings for a single rebuild run.
///
/// Built once at startup and shared read-only by discovery, the
/// orchestrator and every executor task.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the InfluxDB data directory (one subdirectory per database)
    pub data_dir: PathBuf,
    /// WAL directory, passed through to the external tool
    pub wal_dir: PathBuf,
    /// Passed through as `-max-log-file-size`, in bytes
    pub max_log_file_size: u64,
    /// Maximum number of external commands running at once
    pub concurrency: usize,
    /// Print captured tool output for successful jobs
    pub verbose: bool,
    /// Rebuild only this database instead of discovering databases
    pub database: Option<OsString>,
    /// Rebuild only these shards, for every selected database
    pub shards: Option<Vec<String>>,
    /// External tool providing the `buildtsi` subcommand
    pub inspect_bin: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            wal_dir: PathBuf::from(DEFAULT_WAL_DIR),
            max_log_file_size: DEFAULT_MAX_LOG_FILE_SIZE,
            concurrency: default_concurrency(),
            verbose: false,
            database: None,
            shards: None,
            inspect_bin: PathBuf::from(DEFAULT_INSPECT_BIN),
        }
    }
}

impl RunConfig {
    pub fn new(data_dir: impl Into<PathBuf>, wal_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            wal_dir: wal_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_database(mut self, database: impl Into<OsString>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_shards<I, S>(mut self, shards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shards = Some(shards.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_inspect_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.inspect_bin = bin.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parse a comma separated `--shards` value. An empty value means no filter.
    pub fn parse_shard_list(raw: &str) -> Option<Vec<String>> {
        if raw.is_empty() {
            return None;
        }
        Some(raw.split(',').map(|s| s.to_string()).collect())
    }

    /// Reject settings that would stall or confuse the run before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RebuildError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_log_file_size == 0 {
            return Err(RebuildError::InvalidConfig(
                "max-log-file-size must be greater than 0".to_string(),
            ));
        }
        if self.database.as_ref().is_some_and(|name| name.is_empty()) {
            return Err(RebuildError::InvalidConfig(
                "database name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
