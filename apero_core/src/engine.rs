//! BAC estimation engine.
//!
//! This module implements the absorption/elimination model:
//! - Total body water from the Watson formula (distribution volume)
//! - First-order absorption reaching ~95% at the per-drink peak time
//! - Zero-order elimination running concurrently from the drink's start
//! - Linear superposition of every drink's contribution
//!
//! Every function is pure: the evaluation instant is an argument and nothing
//! is retained between calls. Malformed numbers degrade to zero contributions
//! instead of failing.

use crate::{BacEstimate, BacStatus, DrinkEvent, PredictionPoint, Profile, Sex};
use chrono::{DateTime, Duration, Utc};

/// Ethanol density in g/mL
pub const ALCOHOL_DENSITY: f64 = 0.789;

/// Elimination rate in g/L/h (typical range 0.10 - 0.20)
pub const ELIMINATION_RATE: f64 = 0.15;

/// Physiological absorption lag in hours (~45 minutes)
pub const ABSORPTION_TIME_HOURS: f64 = 0.75;

/// Below this many g/L the subject counts as sober
pub const SOBER_THRESHOLD: f64 = 0.01;

/// Lower bound for the time-to-peak, avoids dividing by zero
const MIN_PEAK_HOURS: f64 = 0.01;

/// Share of the dose still unabsorbed at the peak time
const UNABSORBED_AT_PEAK: f64 = 0.05;

/// Shortest scan tail after the last drink ends; the peak never falls
/// below the current value anywhere inside this window
pub const MIN_PEAK_SEARCH_TAIL_HOURS: i64 = 2;

/// Tunable parameters of the model
#[derive(Clone, Debug, PartialEq)]
pub struct ModelParams {
    /// g/L/h
    pub elimination_rate: f64,
    pub absorption_time_hours: f64,
    /// Resolution of the brute-force peak scan
    pub peak_search_step: Duration,
    /// How long after the last drink ends the peak scan continues,
    /// never less than [`MIN_PEAK_SEARCH_TAIL_HOURS`]
    pub peak_search_tail: Duration,
    /// Spacing of forecast points
    pub forecast_step: Duration,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            elimination_rate: ELIMINATION_RATE,
            absorption_time_hours: ABSORPTION_TIME_HOURS,
            peak_search_step: Duration::minutes(1),
            peak_search_tail: Duration::hours(MIN_PEAK_SEARCH_TAIL_HOURS),
            forecast_step: Duration::minutes(5),
        }
    }
}

/// Total body water in litres (Watson formula)
///
/// Returns 0 when the profile lacks sex or a positive weight. Height and age
/// fall back to their defaults when unset.
pub fn estimate_total_body_water(profile: &Profile) -> f64 {
    if !profile.is_complete() {
        return 0.0;
    }
    let (Some(sex), Some(weight)) = (profile.sex, profile.weight_kg) else {
        return 0.0;
    };
    let height = profile.height_or_default();
    let age = profile.age_or_default();

    match sex {
        Sex::Male => 2.447 - 0.09516 * age + 0.1074 * height + 0.3362 * weight,
        Sex::Female => -2.097 + 0.1069 * height + 0.2466 * weight,
    }
}

/// Grams of pure ethanol in a drink
pub fn alcohol_grams(drink: &DrinkEvent) -> f64 {
    if drink.volume_ml <= 0.0 || drink.alcohol_percent <= 0.0 {
        return 0.0;
    }
    drink.volume_ml * (drink.alcohol_percent / 100.0) * ALCOHOL_DENSITY
}

/// Fraction of a dose absorbed after `hours_since_start`
///
/// The rate constant is chosen so that 95% is absorbed at `peak_time_hours`.
pub fn absorption_fraction(hours_since_start: f64, peak_time_hours: f64) -> f64 {
    if hours_since_start.is_nan() || hours_since_start <= 0.0 {
        return 0.0;
    }
    let k = -UNABSORBED_AT_PEAK.ln() / peak_time_hours.max(MIN_PEAK_HOURS);
    let fraction = 1.0 - (-k * hours_since_start).exp();
    fraction.clamp(0.0, 1.0)
}

/// Single drink contribution (g/L) with the default parameters
pub fn drink_bac(drink: &DrinkEvent, profile: &Profile, at: DateTime<Utc>) -> f64 {
    BacModel::default().drink_bac(drink, profile, at)
}

/// Estimate with the default parameters
pub fn estimate(drinks: &[DrinkEvent], profile: &Profile, now: DateTime<Utc>) -> BacEstimate {
    BacModel::default().estimate(drinks, profile, now)
}

/// Forecast with the default parameters
pub fn predict(
    drinks: &[DrinkEvent],
    profile: &Profile,
    now: DateTime<Utc>,
    horizon_hours: f64,
) -> Vec<PredictionPoint> {
    BacModel::default().predict(drinks, profile, now, horizon_hours)
}

/// Map a BAC value (g/L) to its status band
///
/// Bands are closed on the lower bound and open on the upper one.
pub fn classify(bac: f64) -> BacStatus {
    if bac < SOBER_THRESHOLD {
        BacStatus::Sober
    } else if bac < 0.2 {
        BacStatus::MinimalEffect
    } else if bac < 0.5 {
        BacStatus::SlightlyIntoxicated
    } else if bac < 0.8 {
        BacStatus::LegalLimitExceeded
    } else if bac < 1.5 {
        BacStatus::HeavilyIntoxicated
    } else {
        BacStatus::Danger
    }
}

/// The BAC model bound to a set of parameters
#[derive(Clone, Debug, Default)]
pub struct BacModel {
    params: ModelParams,
}

impl BacModel {
    pub fn new(params: ModelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Instantaneous contribution of one drink, in g/L
    pub fn drink_bac(&self, drink: &DrinkEvent, profile: &Profile, at: DateTime<Utc>) -> f64 {
        if !profile.is_complete() {
            return 0.0;
        }
        let tbw = estimate_total_body_water(profile);
        if tbw.is_nan() || tbw <= 0.0 {
            return 0.0;
        }

        let grams = alcohol_grams(drink);
        let duration_hours = hours(drink.end_time - drink.start_time);
        let elapsed_hours = hours(at - drink.start_time);

        let peak_time_hours =
            duration_hours.max(0.0) / 2.0 + self.params.absorption_time_hours / 2.0;
        let grams_absorbed = grams * absorption_fraction(elapsed_hours, peak_time_hours);

        // Elimination runs from the start of the window, alongside absorption
        let grams_eliminated = (elapsed_hours * self.params.elimination_rate * tbw).max(0.0);
        let net_grams = (grams_absorbed - grams_eliminated).max(0.0);

        net_grams / tbw
    }

    /// Sum of every drink's contribution at `at`
    pub fn total_bac(&self, drinks: &[DrinkEvent], profile: &Profile, at: DateTime<Utc>) -> f64 {
        drinks
            .iter()
            .map(|d| self.drink_bac(d, profile, at))
            .sum()
    }

    /// Current, peak and sober-time estimate at `now`
    pub fn estimate(
        &self,
        drinks: &[DrinkEvent],
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> BacEstimate {
        if !profile.is_complete() || drinks.is_empty() {
            return BacEstimate::zero(now);
        }

        let current_bac = self.total_bac(drinks, profile, now);
        let (peak_bac, peak_time) = self.find_peak(drinks, profile, now);
        let sober_time = self.sober_time(peak_bac, peak_time, profile);

        tracing::debug!(
            "Estimate over {} drinks: current {:.3} g/L, peak {:.3} g/L at {}",
            drinks.len(),
            current_bac,
            peak_bac,
            peak_time
        );

        BacEstimate {
            current_bac: round3(current_bac),
            peak_bac: round3(peak_bac),
            peak_time,
            sober_time,
            status: classify(current_bac),
        }
    }

    /// Scan from the earliest start to the latest end plus the tail
    ///
    /// Returns `(0, now)` when no instant yields a positive BAC.
    fn find_peak(
        &self,
        drinks: &[DrinkEvent],
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> (f64, DateTime<Utc>) {
        let (Some(earliest), Some(latest)) = (
            drinks.iter().map(|d| d.start_time).min(),
            drinks.iter().map(|d| d.end_time).max(),
        ) else {
            return (0.0, now);
        };

        let step = positive_or(self.params.peak_search_step, Duration::minutes(1));
        let tail = self
            .params
            .peak_search_tail
            .max(Duration::hours(MIN_PEAK_SEARCH_TAIL_HOURS));
        let search_end = latest.checked_add_signed(tail).unwrap_or(latest);

        let mut peak_bac = 0.0;
        let mut peak_time = now;
        let mut next = Some(earliest);
        while let Some(t) = next.filter(|t| *t <= search_end) {
            let bac = self.total_bac(drinks, profile, t);
            if bac > peak_bac {
                peak_bac = bac;
                peak_time = t;
            }
            next = t.checked_add_signed(step);
        }

        tracing::trace!("Peak scan found {:.4} g/L at {}", peak_bac, peak_time);
        (peak_bac, peak_time)
    }

    /// Instant the peak has been fully eliminated, assuming linear decay
    ///
    /// `None` when there is nothing to eliminate, or when the instant lies
    /// beyond the representable calendar.
    pub fn sober_time(
        &self,
        peak_bac: f64,
        peak_time: DateTime<Utc>,
        profile: &Profile,
    ) -> Option<DateTime<Utc>> {
        if peak_bac <= SOBER_THRESHOLD || !profile.is_complete() {
            return None;
        }
        if self.params.elimination_rate <= 0.0 {
            return None;
        }
        let hours_to_sober = peak_bac / self.params.elimination_rate;
        from_hours(hours_to_sober).and_then(|d| peak_time.checked_add_signed(d))
    }

    /// BAC samples from `now` to `now + horizon_hours`, both inclusive
    ///
    /// Empty for a negative, non-finite or unrepresentable horizon.
    pub fn predict(
        &self,
        drinks: &[DrinkEvent],
        profile: &Profile,
        now: DateTime<Utc>,
        horizon_hours: f64,
    ) -> Vec<PredictionPoint> {
        if !profile.is_complete() {
            return Vec::new();
        }

        let step = positive_or(self.params.forecast_step, Duration::minutes(5));
        let Some(end) = from_hours(horizon_hours).and_then(|h| now.checked_add_signed(h)) else {
            tracing::debug!("Forecast horizon of {} h is out of range", horizon_hours);
            return Vec::new();
        };

        let mut points = Vec::new();
        let mut next = Some(now);
        while let Some(time) = next.filter(|t| *t <= end) {
            points.push(PredictionPoint {
                time,
                bac: round3(self.total_bac(drinks, profile, time)),
            });
            next = time.checked_add_signed(step);
        }
        points
    }
}

fn hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

/// `None` for non-finite or out-of-range values
fn from_hours(h: f64) -> Option<Duration> {
    let ms = (h * 3_600_000.0).round();
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(ms as i64)
}

fn positive_or(step: Duration, fallback: Duration) -> Duration {
    if step > Duration::zero() {
        step
    } else {
        fallback
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
