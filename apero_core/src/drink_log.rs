//! Drink log persistence.
//!
//! Drinks are appended to a JSONL (JSON Lines) file. Every mutation (append,
//! removal, clearing, archiving) holds an exclusive lock on a sibling
//! `.lock` file for its whole read-modify-write span, so concurrent
//! invocations neither interleave partial lines nor lose each other's drinks.
//! Rewrites replace the log atomically.

use crate::{DrinkEvent, Error, Result};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Destination for newly logged drinks
pub trait DrinkSink {
    fn append(&mut self, drink: &DrinkEvent) -> Result<()>;
}

/// Exclusive writer lock for a drink log, released on drop
///
/// The lock lives on a stable sibling file rather than on the log itself,
/// because rewrites rename a new file over the log.
#[derive(Debug)]
pub struct LogLock {
    file: File,
}

impl LogLock {
    /// Block until the writer lock for `log_path` is held
    pub fn acquire(log_path: &Path) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path(log_path))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `drinks.jsonl` -> `drinks.lock`
pub fn lock_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("lock")
}

/// JSONL-based drink log with file locking
pub struct JsonlDrinkLog {
    path: PathBuf,
}

impl JsonlDrinkLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DrinkSink for JsonlDrinkLog {
    fn append(&mut self, drink: &DrinkEvent) -> Result<()> {
        let _lock = LogLock::acquire(&self.path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(drink)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::debug!("Appended drink {} ({}) to log", drink.id, drink.name);
        Ok(())
    }
}

/// Read every drink from the log
///
/// Malformed lines are skipped with a warning.
pub fn read_drinks(path: &Path) -> Result<Vec<DrinkEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut drinks = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DrinkEvent>(&line) {
            Ok(drink) => drinks.push(drink),
            Err(e) => {
                tracing::warn!("Failed to parse drink at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} drinks from {:?}", drinks.len(), path);
    Ok(drinks)
}

/// Whether a drink still matters for an estimate made at `now`
pub fn is_recent(drink: &DrinkEvent, now: DateTime<Utc>, retention: Duration) -> bool {
    match now.checked_sub_signed(retention) {
        Some(cutoff) => drink.end_time >= cutoff,
        None => true,
    }
}

/// Read the drinks that ended within `retention` of `now`
pub fn read_recent_drinks(
    path: &Path,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<Vec<DrinkEvent>> {
    let drinks: Vec<DrinkEvent> = read_drinks(path)?
        .into_iter()
        .filter(|d| is_recent(d, now, retention))
        .collect();
    Ok(drinks)
}

/// Atomically replace the log; the caller must hold the [`LogLock`]
pub(crate) fn rewrite_locked(path: &Path, drinks: &[DrinkEvent]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::State(format!("drink log path {:?} has no parent", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for drink in drinks {
            serde_json::to_writer(&mut writer, drink)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Rewrote drink log {:?} with {} drinks", path, drinks.len());
    Ok(())
}

/// Delete one drink by id, returning whether it was present
pub fn remove_drink(path: &Path, id: Uuid) -> Result<bool> {
    let _lock = LogLock::acquire(path)?;

    let drinks = read_drinks(path)?;
    let before = drinks.len();
    let remaining: Vec<DrinkEvent> = drinks.into_iter().filter(|d| d.id != id).collect();

    if remaining.len() == before {
        tracing::debug!("Drink {} not found in log", id);
        return Ok(false);
    }

    rewrite_locked(path, &remaining)?;
    tracing::info!("Removed drink {}", id);
    Ok(true)
}

/// Empty the log, returning how many drinks were dropped
pub fn clear_drinks(path: &Path) -> Result<usize> {
    let _lock = LogLock::acquire(path)?;

    let count = read_drinks(path)?.len();
    if count > 0 {
        rewrite_locked(path, &[])?;
    }
    tracing::info!("Cleared {} drinks", count);
    Ok(count)
}
