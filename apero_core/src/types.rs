//! Core domain types for the Apéro BAC estimator.
//!
//! This module defines the fundamental types used throughout the system:
//! - The drinker's profile (sex, weight, height, age)
//! - Logged drink events with their consumption window
//! - Derived outputs: estimates, status bands, forecast points and phases

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Height used when the profile does not carry one.
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;

/// Age used when the profile does not carry one.
pub const DEFAULT_AGE_YEARS: f64 = 30.0;

// ============================================================================
// Profile Types
// ============================================================================

/// Biological sex, selects the Watson body-water formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl std::str::FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            other => Err(Error::InvalidProfile(format!("Unknown sex: {}", other))),
        }
    }
}

/// The person whose BAC is being estimated
///
/// Every field may be missing: the profile is filled in progressively from
/// the settings screen. Estimation needs at least `sex` and `weight_kg`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub age_years: Option<f64>,
}

impl Profile {
    /// Build a fully populated profile
    pub fn new(sex: Sex, weight_kg: f64, height_cm: f64, age_years: f64) -> Self {
        Self {
            sex: Some(sex),
            weight_kg: Some(weight_kg),
            height_cm: Some(height_cm),
            age_years: Some(age_years),
        }
    }

    /// Whether the profile carries enough data to estimate anything
    pub fn is_complete(&self) -> bool {
        self.sex.is_some() && self.weight_kg.map_or(false, |w| w > 0.0)
    }

    /// Height in cm, falling back to [`DEFAULT_HEIGHT_CM`]
    pub fn height_or_default(&self) -> f64 {
        self.height_cm
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_HEIGHT_CM)
    }

    /// Age in years, falling back to [`DEFAULT_AGE_YEARS`]
    pub fn age_or_default(&self) -> f64 {
        self.age_years
            .filter(|a| *a > 0.0)
            .unwrap_or(DEFAULT_AGE_YEARS)
    }

    /// Check user-entered values before they are persisted
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("weight", self.weight_kg),
            ("height", self.height_cm),
            ("age", self.age_years),
        ];
        for (field, value) in checks {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::InvalidProfile(format!(
                        "{} must be a positive number, got {}",
                        field, v
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Drink Types
// ============================================================================

/// One consumption episode
///
/// Fields are public so stored logs can be read back verbatim; new drinks
/// should go through [`DrinkEvent::new`], which enforces a positive volume,
/// an ABV within [0, 100] and `end_time > start_time`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEvent {
    pub id: Uuid,
    pub name: String,
    pub volume_ml: f64,
    pub alcohol_percent: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl DrinkEvent {
    /// Create a validated drink event with a fresh id
    pub fn new(
        name: impl Into<String>,
        volume_ml: f64,
        alcohol_percent: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(Error::InvalidDrink("name must not be empty".into()));
        }
        if !volume_ml.is_finite() || volume_ml <= 0.0 {
            return Err(Error::InvalidDrink(format!(
                "volume must be positive, got {} mL",
                volume_ml
            )));
        }
        if !(0.0..=100.0).contains(&alcohol_percent) {
            return Err(Error::InvalidDrink(format!(
                "alcohol percentage must be within [0, 100], got {}",
                alcohol_percent
            )));
        }
        if end_time <= start_time {
            return Err(Error::InvalidDrink(format!(
                "drink must end after it starts ({} <= {})",
                end_time.to_rfc3339(),
                start_time.to_rfc3339()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            volume_ml,
            alcohol_percent,
            start_time,
            end_time,
        })
    }

    /// Like [`DrinkEvent::new`], with the window given as a start and length
    pub fn lasting(
        name: impl Into<String>,
        volume_ml: f64,
        alcohol_percent: f64,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Self> {
        let end_time = start_time.checked_add_signed(duration).ok_or_else(|| {
            Error::InvalidDrink(format!(
                "drink starting {} cannot last {} minutes",
                start_time.to_rfc3339(),
                duration.num_minutes()
            ))
        })?;
        Self::new(name, volume_ml, alcohol_percent, start_time, end_time)
    }

    /// Length of the consumption window
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

// ============================================================================
// Estimate Types
// ============================================================================

/// Qualitative band for a BAC value, ordered by severity
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BacStatus {
    Sober,
    MinimalEffect,
    SlightlyIntoxicated,
    LegalLimitExceeded,
    HeavilyIntoxicated,
    Danger,
}

impl BacStatus {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            BacStatus::Sober => "Sober",
            BacStatus::MinimalEffect => "Minimal effect",
            BacStatus::SlightlyIntoxicated => "Slightly intoxicated",
            BacStatus::LegalLimitExceeded => "Legal limit exceeded",
            BacStatus::HeavilyIntoxicated => "Heavily intoxicated",
            BacStatus::Danger => "Danger",
        }
    }

    /// Severity rank, 0 (sober) to 5 (danger)
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// Display colour (hex)
    pub fn color(&self) -> &'static str {
        match self {
            BacStatus::Sober => "#4CAF50",
            BacStatus::MinimalEffect => "#8BC34A",
            BacStatus::SlightlyIntoxicated => "#FFC107",
            BacStatus::LegalLimitExceeded => "#FF9800",
            BacStatus::HeavilyIntoxicated => "#F44336",
            BacStatus::Danger => "#D32F2F",
        }
    }
}

impl std::fmt::Display for BacStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of the BAC model at one evaluation instant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BacEstimate {
    /// g/L at the evaluation instant, rounded to 3 decimals
    pub current_bac: f64,
    /// Highest g/L over the peak search window, rounded to 3 decimals
    pub peak_bac: f64,
    pub peak_time: DateTime<Utc>,
    /// `None` when the peak is negligible or the profile is incomplete
    pub sober_time: Option<DateTime<Utc>>,
    pub status: BacStatus,
}

impl BacEstimate {
    /// The estimate reported when nothing can (or needs to) be computed
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            current_bac: 0.0,
            peak_bac: 0.0,
            peak_time: now,
            sober_time: None,
            status: BacStatus::Sober,
        }
    }
}

/// One sample of the BAC forecast
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionPoint {
    pub time: DateTime<Utc>,
    pub bac: f64,
}

/// A maximal run of forecast points sharing one status
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhaseSegment {
    pub status: BacStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A future instant at which the status changes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhaseChange {
    pub status: BacStatus,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_completeness() {
        assert!(!Profile::default().is_complete());

        let mut profile = Profile {
            sex: Some(Sex::Female),
            ..Default::default()
        };
        assert!(!profile.is_complete());

        profile.weight_kg = Some(0.0);
        assert!(!profile.is_complete());

        profile.weight_kg = Some(62.0);
        assert!(profile.is_complete());
    }

    #[test]
    fn test_profile_fallbacks() {
        let profile = Profile {
            sex: Some(Sex::Male),
            weight_kg: Some(80.0),
            height_cm: None,
            age_years: Some(0.0),
        };
        assert_eq!(profile.height_or_default(), DEFAULT_HEIGHT_CM);
        assert_eq!(profile.age_or_default(), DEFAULT_AGE_YEARS);
    }

    #[test]
    fn test_profile_validate_rejects_negative_weight() {
        let profile = Profile {
            weight_kg: Some(-3.0),
            ..Default::default()
        };
        assert!(matches!(profile.validate(), Err(Error::InvalidProfile(_))));
        assert!(Profile::new(Sex::Male, 80.0, 180.0, 30.0).validate().is_ok());
    }

    #[test]
    fn test_sex_parsing() {
        assert_eq!("Male".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!("f".parse::<Sex>().unwrap(), Sex::Female);
        assert!("other".parse::<Sex>().is_err());
    }

    #[test]
    fn test_drink_rejects_empty_window() {
        let t = Utc::now();
        let result = DrinkEvent::new("Beer", 330.0, 5.0, t, t);
        assert!(matches!(result, Err(Error::InvalidDrink(_))));

        let result = DrinkEvent::new("Beer", 330.0, 5.0, t, t - Duration::minutes(5));
        assert!(matches!(result, Err(Error::InvalidDrink(_))));
    }

    #[test]
    fn test_drink_rejects_bad_volume_and_abv() {
        let t = Utc::now();
        let end = t + Duration::minutes(10);
        assert!(DrinkEvent::new("Beer", 0.0, 5.0, t, end).is_err());
        assert!(DrinkEvent::new("Beer", 330.0, 120.0, t, end).is_err());
        assert!(DrinkEvent::new("", 330.0, 5.0, t, end).is_err());

        let drink = DrinkEvent::new("Beer", 330.0, 5.0, t, end).unwrap();
        assert_eq!(drink.duration(), Duration::minutes(10));
    }

    #[test]
    fn test_drink_lasting_past_calendar_end_is_rejected() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::minutes(5);
        let err = DrinkEvent::lasting("Beer", 330.0, 5.0, start, Duration::minutes(15)).unwrap_err();
        assert!(matches!(err, Error::InvalidDrink(_)));

        let ok = DrinkEvent::lasting("Beer", 330.0, 5.0, start, Duration::minutes(4)).unwrap();
        assert_eq!(ok.duration(), Duration::minutes(4));
    }

    #[test]
    fn test_status_ordering_and_metadata() {
        assert!(BacStatus::Sober < BacStatus::MinimalEffect);
        assert!(BacStatus::HeavilyIntoxicated < BacStatus::Danger);
        assert_eq!(BacStatus::Sober.severity(), 0);
        assert_eq!(BacStatus::Danger.severity(), 5);
        assert_eq!(BacStatus::LegalLimitExceeded.to_string(), "Legal limit exceeded");
    }

    #[test]
    fn test_profile_json_tolerates_missing_fields() {
        let profile: Profile = serde_json::from_str(r#"{"sex":"female"}"#).unwrap();
        assert_eq!(profile.sex, Some(Sex::Female));
        assert_eq!(profile.weight_kg, None);
    }
}
