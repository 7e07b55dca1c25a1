//! Built-in drink presets.
//!
//! Quick-add entries for the usual pours, so logging a drink only needs a
//! preset id and a time.

use crate::{DrinkEvent, Error, Result};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cached default catalog, built once
static DEFAULT_CATALOG: Lazy<DrinkCatalog> = Lazy::new(build_default_catalog);

/// A standard pour
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkPreset {
    pub id: String,
    pub name: String,
    pub volume_ml: f64,
    pub alcohol_percent: f64,
}

impl DrinkPreset {
    /// Log this preset as drunk from `start` over `duration`
    pub fn pour(&self, start: DateTime<Utc>, duration: Duration) -> Result<DrinkEvent> {
        DrinkEvent::lasting(
            self.name.clone(),
            self.volume_ml,
            self.alcohol_percent,
            start,
            duration,
        )
    }
}

/// Presets keyed by id
#[derive(Clone, Debug, Default)]
pub struct DrinkCatalog {
    pub presets: BTreeMap<String, DrinkPreset>,
}

impl DrinkCatalog {
    /// Look up a preset, case-insensitively
    pub fn get(&self, id: &str) -> Result<&DrinkPreset> {
        self.presets
            .get(&id.trim().to_lowercase())
            .ok_or_else(|| Error::Catalog(format!("Unknown drink preset: {}", id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrinkPreset> {
        self.presets.values()
    }

    /// Validate the catalog, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, preset) in &self.presets {
            if id.is_empty() || preset.id.is_empty() {
                errors.push("Preset has empty ID".to_string());
            }
            if id != &preset.id {
                errors.push(format!(
                    "Preset key '{}' doesn't match preset.id '{}'",
                    id, preset.id
                ));
            }
            if preset.name.is_empty() {
                errors.push(format!("Preset '{}' has empty name", id));
            }
            if preset.volume_ml <= 0.0 {
                errors.push(format!(
                    "Preset '{}' has non-positive volume {}",
                    id, preset.volume_ml
                ));
            }
            if !(0.0..=100.0).contains(&preset.alcohol_percent) {
                errors.push(format!(
                    "Preset '{}' has alcohol percentage {} outside [0, 100]",
                    id, preset.alcohol_percent
                ));
            }
        }

        errors
    }
}

/// Reference to the cached default catalog
pub fn get_default_catalog() -> &'static DrinkCatalog {
    &DEFAULT_CATALOG
}

/// Build a fresh copy of the default catalog
pub fn build_default_catalog() -> DrinkCatalog {
    let presets = [
        ("beer", "Beer", 330.0, 5.0),
        ("wine", "Wine", 150.0, 12.0),
        ("pastis", "Pastis", 40.0, 45.0),
        ("whisky", "Whisky", 40.0, 40.0),
    ]
    .into_iter()
    .map(|(id, name, volume_ml, alcohol_percent)| {
        (
            id.to_string(),
            DrinkPreset {
                id: id.into(),
                name: name.into(),
                volume_ml,
                alcohol_percent,
            },
        )
    })
    .collect();

    DrinkCatalog { presets }
}
