use std::ffi::{OsStr, OsString};
use std::fmt;

/// Shard identifier as it appears in the on-disk layout.
pub type ShardId = u64;

/// A database selected for rebuilding, with the shards to rebuild in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    /// Directory name under the data directory, kept as raw bytes
    pub name: OsString,
    pub shards: Vec<ShardId>,
}

impl Database {
    pub fn new(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            shards: Vec::new(),
        }
    }

    pub fn with_shards(name: impl Into<OsString>, shards: Vec<ShardId>) -> Self {
        Self {
            name: name.into(),
            shards,
        }
    }

    /// One job per shard entry, in shard order. Duplicate shard ids produce
    /// duplicate jobs.
    pub fn jobs(&self) -> impl Iterator<Item = JobDescriptor> + '_ {
        self.shards
            .iter()
            .map(move |&shard| JobDescriptor::new(self.name.clone(), shard))
    }
}

/// One unit of work: a single `buildtsi` invocation for a database/shard pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobDescriptor {
    database: OsString,
    shard: ShardId,
}

impl JobDescriptor {
    pub fn new(database: impl Into<OsString>, shard: ShardId) -> Self {
        Self {
            database: database.into(),
            shard,
        }
    }

    pub fn database(&self) -> &OsStr {
        &self.database
    }

    pub fn shard(&self) -> ShardId {
        self.shard
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "database ({}) shard ({})",
            self.database.to_string_lossy(),
            self.shard
        )
    }
}

/// Flatten databases into jobs in launch order: databases in the given
/// order, shards in each database's order.
pub fn plan_jobs(databases: &[Database]) -> Vec<JobDescriptor> {
    databases.iter().flat_map(Database::jobs).collect()
}
