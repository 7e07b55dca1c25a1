//! CSV archiving of expired drinks and forecast export.
//!
//! Drinks that no longer influence the estimate are moved out of the JSONL
//! log into an append-only CSV history. The CSV is synced before the log is
//! rewritten, so a crash can duplicate a row but never lose one. The drink
//! log's writer lock is held from the read to the rewrite.

use crate::engine::classify;
use crate::{drink_log, DrinkEvent, Error, PredictionPoint, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// A row of the drink history CSV
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DrinkRow {
    id: String,
    name: String,
    volume_ml: f64,
    alcohol_percent: f64,
    start_time: String,
    end_time: String,
}

impl From<&DrinkEvent> for DrinkRow {
    fn from(drink: &DrinkEvent) -> Self {
        DrinkRow {
            id: drink.id.to_string(),
            name: drink.name.clone(),
            volume_ml: drink.volume_ml,
            alcohol_percent: drink.alcohol_percent,
            start_time: drink.start_time.to_rfc3339(),
            end_time: drink.end_time.to_rfc3339(),
        }
    }
}

impl TryFrom<DrinkRow> for DrinkEvent {
    type Error = Error;

    fn try_from(row: DrinkRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?;
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| Error::Other(format!("Invalid date: {}", e)))
        };

        Ok(DrinkEvent {
            id,
            name: row.name,
            volume_ml: row.volume_ml,
            alcohol_percent: row.alcohol_percent,
            start_time: parse(&row.start_time)?,
            end_time: parse(&row.end_time)?,
        })
    }
}

/// A row of the forecast CSV
#[derive(Debug, serde::Serialize)]
struct ForecastRow {
    time: String,
    bac: f64,
    status: &'static str,
}

/// Move drinks older than `retention` from the log to the CSV history
///
/// Returns the number of drinks archived.
pub fn archive_expired_drinks(
    log_path: &Path,
    csv_path: &Path,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<usize> {
    let _lock = drink_log::LogLock::acquire(log_path)?;

    let (recent, expired): (Vec<DrinkEvent>, Vec<DrinkEvent>) = drink_log::read_drinks(log_path)?
        .into_iter()
        .partition(|d| drink_log::is_recent(d, now, retention));

    if expired.is_empty() {
        tracing::info!("No expired drinks to archive");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for drink in &expired {
        writer.serialize(DrinkRow::from(drink))?;
    }
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| Error::Other(format!("Failed to finish CSV writer: {}", e)))?;
    file.sync_all()?;

    drink_log::rewrite_locked(log_path, &recent)?;

    tracing::info!(
        "Archived {} drinks to {:?}, {} remain in the log",
        expired.len(),
        csv_path,
        recent.len()
    );
    Ok(expired.len())
}

/// Read every drink from the CSV history
pub fn read_drink_history(csv_path: &Path) -> Result<Vec<DrinkEvent>> {
    if !csv_path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut drinks = Vec::new();
    for row in reader.deserialize::<DrinkRow>() {
        match row.map_err(Error::from).and_then(DrinkEvent::try_from) {
            Ok(drink) => drinks.push(drink),
            Err(e) => tracing::warn!("Skipping unreadable history row: {}", e),
        }
    }
    Ok(drinks)
}

/// Write forecast points as `time,bac,status` rows, replacing the file
pub fn write_forecast_csv(points: &[PredictionPoint], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(ForecastRow {
            time: point.time.to_rfc3339(),
            bac: point.bac,
            status: classify(point.bac).label(),
        })?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} forecast points to {:?}", points.len(), path);
    Ok(points.len())
}
