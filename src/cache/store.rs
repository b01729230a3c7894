//! On-disk store for the last successfully fetched range set
//!
//! The file holds only the serialized `RangeSet`; its modification time is
//! the freshness clock. Writes go to a temp file in the same directory which
//! is then renamed over the target, so a reader sees either the old or the
//! new content and never a partial file.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::data::RangeSet;
use crate::error::RangeError;

/// A cached range set and the time it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub ranges: RangeSet,
    /// Modification time of the cache file
    pub modified: DateTime<Utc>,
}

impl CacheRecord {
    /// Time elapsed since the record was written. A modification time in
    /// the future counts as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        age_between(self.modified, now)
    }

    /// Whether the record is at most `max_age` old at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) <= max_age
    }
}

fn age_between(modified: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(modified)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Reads and atomically replaces the cache file at a fixed path
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached record
    ///
    /// # Returns
    /// * `Ok(None)` if no cache file exists
    /// * `Ok(Some(record))` if the file holds a valid range set
    /// * `Err(RangeError::CorruptCache)` if the file exists but does not parse
    /// * `Err(RangeError::CacheRead)` for any other I/O failure
    pub fn load(&self) -> Result<Option<CacheRecord>, RangeError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file");
                return Ok(None);
            }
            Err(e) => return Err(self.read_error(e)),
        };

        let modified = file
            .metadata()
            .and_then(|meta| meta.modified())
            .map_err(|e| self.read_error(e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| self.read_error(e))?;

        // Empty files and invalid UTF-8 both surface as parse errors here
        let ranges: RangeSet =
            serde_json::from_slice(&bytes).map_err(|source| RangeError::CorruptCache {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            path = %self.path.display(),
            ipv4 = ranges.ipv4.len(),
            ipv6 = ranges.ipv6.len(),
            "Loaded range cache"
        );
        Ok(Some(CacheRecord {
            ranges,
            modified: modified.into(),
        }))
    }

    /// True if the cache file exists and is at most `max_age` old
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => age_between(modified.into(), Utc::now()) <= max_age,
            Err(_) => false,
        }
    }

    /// Replaces the cache file with `ranges`
    ///
    /// Creates the parent directory if needed. The temp file is restricted
    /// to owner read/write before any content is written. I/O failures are
    /// returned as `RangeError::Persist` and not retried.
    pub fn store(&self, ranges: &RangeSet) -> Result<(), RangeError> {
        self.write_atomic(ranges)
            .map_err(|source| RangeError::Persist {
                path: self.path.clone(),
                source,
            })?;
        info!(
            path = %self.path.display(),
            ipv4 = ranges.ipv4.len(),
            ipv6 = ranges.ipv6.len(),
            "Wrote range cache"
        );
        Ok(())
    }

    /// Serializes `value` into a temp file next to the target and renames it
    /// into place. Any failure before the rename leaves the target untouched.
    fn write_atomic<T: Serialize + ?Sized>(&self, value: &T) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        serde_json::to_writer_pretty(&mut tmp, value).map_err(io::Error::from)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_error(&self, source: io::Error) -> RangeError {
        RangeError::CacheRead {
            path: self.path.clone(),
            source,
        }
    }
}
