/*!
 * Dedup gate: suppresses repeats of the same error within a cooldown window.
 *
 * An error is identified by its fingerprint, the hex SHA-256 of
 * `message:line:file`. The stack trace does not take part, so the same
 * failure reached through different call paths collapses into one entry.
 *
 * Each fingerprint maps to the epoch second until which repeats are
 * suppressed. Entries are never swept; stale ones simply stop matching.
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::protocol::exception::CapturedException;

/// Fingerprint → next-allowed timestamp storage.
pub trait DedupStore: Send + Sync {
    /// Stored timestamp for `key`, `None` when there is no entry.
    fn load(&self, key: &str) -> io::Result<Option<u64>>;

    fn store(&self, key: &str, next_allowed: u64) -> io::Result<()>;
}

pub fn fingerprint(exception: &CapturedException) -> String {
    let key = format!("{}:{}:{}", exception.message, exception.line, exception.file);
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

// ---------------------------------------------------------------------------
// FileDedupStore
// ---------------------------------------------------------------------------

/**
 * One plain-text file per fingerprint, holding the timestamp in decimal.
 *
 * The directory is created on first write. Writes go to a temporary file in
 * the same directory and are renamed over the entry, so readers in other
 * processes never see a half-written value.
 */
#[derive(Debug, Clone)]
pub struct FileDedupStore {
    dir: PathBuf,
}

impl FileDedupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl DedupStore for FileDedupStore {
    fn load(&self, key: &str) -> io::Result<Option<u64>> {
        let raw = match fs::read_to_string(self.entry_path(key)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        raw.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn store(&self, key: &str, next_allowed: u64) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let temp_path = self
            .dir
            .join(format!(".{key}.{}.tmp", std::process::id()));
        fs::write(&temp_path, next_allowed.to_string())?;

        if let Err(err) = fs::rename(&temp_path, self.entry_path(key)) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DedupGate
// ---------------------------------------------------------------------------

pub struct DedupGate {
    store: Box<dyn DedupStore>,
    repeat_timeout: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl DedupGate {
    /// `repeat_timeout` of `None` disables the gate: nothing is suppressed
    /// and the store is never touched.
    pub fn new(store: Box<dyn DedupStore>, repeat_timeout: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            repeat_timeout,
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.repeat_timeout.is_some()
    }

    /**
     * Returns `true` if the exception was already reported within the
     * cooldown window.
     *
     * When the exception is let through, the window is restarted right away
     * (`now + repeatTimeout`). A suppressed exception leaves the entry as is.
     *
     * Store failures never cause a suppression: an unreadable entry counts
     * as expired, and a failed write still lets the exception through.
     */
    pub fn should_suppress(&self, exception: &CapturedException) -> bool {
        let Some(timeout) = self.repeat_timeout else {
            return false;
        };

        let key = fingerprint(exception);
        let now = self.clock.now();

        let next_allowed = match self.store.load(&key) {
            Ok(stored) => stored.unwrap_or(0),
            Err(err) => {
                warn!(fingerprint = %key, error = %err, "Unreadable dedup entry, treating as expired");
                0
            }
        };

        if next_allowed >= now {
            debug!(fingerprint = %key, next_allowed, "Repeated error suppressed");
            return true;
        }

        self.write(&key, now.saturating_add(timeout));
        false
    }

    /// Restarts the cooldown window for this exception.
    pub fn record_sent(&self, exception: &CapturedException) {
        if let Some(timeout) = self.repeat_timeout {
            let now = self.clock.now();
            self.write(&fingerprint(exception), now.saturating_add(timeout));
        }
    }

    fn write(&self, key: &str, next_allowed: u64) {
        if let Err(err) = self.store.store(key, next_allowed) {
            warn!(fingerprint = %key, error = %err, "Failed to persist dedup entry");
        }
    }
}
