//! Enumerates the databases and shards to rebuild from the data directory.
//!
//! Expected layout:
//!
//! ```text
//! <data_dir>/<database>/autogen/<shard>/
//! ```
//!
//! Databases come from `--database` or from the subdirectories of the data
//! directory (minus `_internal`). Shards come from `--shards` or from the
//! subdirectories of each database's `autogen` directory. Any unreadable
//! directory aborts discovery; a shard directory whose name is not a number
//! does not.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{RunConfig, INTERNAL_DATABASE, RETENTION_POLICY_DIR};
use crate::error::{RebuildError, Result};
use crate::scheduler::job::{Database, ShardId};

/// Build the list of databases, each with its shard list, for this run.
pub fn discover(config: &RunConfig) -> Result<Vec<Database>> {
    let mut databases = match &config.database {
        Some(name) => {
            // The data directory must still be readable when a database is named.
            read_subdirs(&config.data_dir)?;
            vec![Database::new(name.clone())]
        }
        None => discover_databases(&config.data_dir)?,
    };

    let shard_filter = config
        .shards
        .as_ref()
        .map(|raw| raw.iter().map(parse_shard_id).collect::<Vec<_>>());

    for database in &mut databases {
        let on_disk = read_subdirs(&shard_dir(&config.data_dir, &database.name))?;

        database.shards = match &shard_filter {
            Some(shards) => shards.clone(),
            None => on_disk.iter().map(parse_shard_id).collect(),
        };

        tracing::debug!(
            database = %database.name.to_string_lossy(),
            shards = ?database.shards,
            "Discovered shards"
        );
    }

    Ok(databases)
}

/// Every database directory under `data_dir` except the internal one, in
/// directory listing order.
pub fn discover_databases(data_dir: &Path) -> Result<Vec<Database>> {
    Ok(read_subdirs(data_dir)?
        .into_iter()
        .filter(|name| name != INTERNAL_DATABASE)
        .map(Database::new)
        .collect())
}

/// Directory holding the shard directories of `database`.
pub fn shard_dir(data_dir: &Path, database: &OsStr) -> PathBuf {
    data_dir.join(database).join(RETENTION_POLICY_DIR)
}

/// Parse a shard directory name or `--shards` entry.
///
/// Anything that is not a base-10 integer becomes shard 0. This matches how
/// the tool has always behaved, so a stray directory like `autogen/tmp`
/// turns into a rebuild of shard 0 instead of failing the run.
pub fn parse_shard_id(name: impl AsRef<OsStr>) -> ShardId {
    let name = name.as_ref();
    match name.to_str().map(str::parse::<ShardId>) {
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            tracing::warn!(name = %name.to_string_lossy(), error = %e, "Shard name is not a number, using shard 0");
            0
        }
        None => {
            tracing::warn!(name = %name.to_string_lossy(), "Shard name is not valid UTF-8, using shard 0");
            0
        }
    }
}

/// Names of the directories directly under `path`. Symlinks are not followed.
fn read_subdirs(path: &Path) -> Result<Vec<OsString>> {
    let io_err = |source| RebuildError::DiscoveryIo {
        path: path.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            names.push(entry.file_name());
        }
    }
    Ok(names)
}
