//! delegate-pool-migrate: legacy runner pool file conversion
//!
//! Reads a multi-document legacy pool file, converts every entry to the
//! current schema and writes them as a single `PoolFile` document. The
//! whole input is decoded before anything is written, so a bad document
//! anywhere leaves no output behind.

pub mod convert;
pub mod current;
pub mod legacy;
pub mod stream;

pub use convert::convert;
pub use current::{CurrentPoolEntry, PoolFile};
pub use legacy::LegacyPoolEntry;
pub use stream::LegacyPoolStream;

use delegate_common::defaults::MIGRATED_POOL_FILE;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("unable to read file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode pool document {index}")]
    Decode {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode pool file")]
    Encode(#[source] serde_yaml::Error),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where and whether to write the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOptions {
    pub output: PathBuf,
    /// Render without writing
    pub dry_run: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(MIGRATED_POOL_FILE),
            dry_run: false,
        }
    }
}

/// Result of a successful migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Whether the output file was written
    pub written: bool,
    /// Number of converted entries
    pub entries: usize,
    /// Destination path, also reported on a dry run
    pub output: PathBuf,
    /// The rendered pool file
    pub document: String,
}

/// Convert every document of `input` into one [`PoolFile`].
pub fn convert_all(input: &str) -> Result<PoolFile, MigrateError> {
    let instances = LegacyPoolStream::new(input)
        .map(|entry| entry.map(|entry| convert(&entry)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PoolFile::new(instances))
}

/// Migrate the legacy pool file at `input`.
pub fn migrate(input: &Path, options: &MigrateOptions) -> Result<MigrationSummary, MigrateError> {
    let raw = std::fs::read_to_string(input).map_err(|source| MigrateError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let pool = convert_all(&raw)?;
    let entries = pool.instances.len();
    debug!(entries, "Converted legacy pool entries");

    let document = serde_yaml::to_string(&pool).map_err(MigrateError::Encode)?;

    if options.dry_run {
        info!(entries, "Dry run, not writing pool file");
    } else {
        std::fs::write(&options.output, &document).map_err(|source| MigrateError::Write {
            path: options.output.clone(),
            source,
        })?;
        info!(entries, output = %options.output.display(), "Wrote migrated pool file");
    }

    Ok(MigrationSummary {
        written: !options.dry_run,
        entries,
        output: options.output.clone(),
        document,
    })
}
