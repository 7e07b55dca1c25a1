//! Phase segmentation over a BAC forecast.
//!
//! A phase is a maximal run of consecutive forecast points that share the
//! same status. Phase starts in the future are what the caller schedules
//! alerts for.

use crate::engine::classify;
use crate::{PhaseChange, PhaseSegment, PredictionPoint};
use chrono::{DateTime, Utc};

/// Group forecast points into runs of equal status
///
/// Each segment ends at the time of its last point, so adjacent segments
/// are separated by one forecast step.
pub fn phase_segments(points: &[PredictionPoint]) -> Vec<PhaseSegment> {
    let mut segments: Vec<PhaseSegment> = Vec::new();

    for point in points {
        let status = classify(point.bac);
        match segments.last_mut() {
            Some(current) if current.status == status => {
                current.end_time = point.time;
            }
            _ => segments.push(PhaseSegment {
                status,
                start_time: point.time,
                end_time: point.time,
            }),
        }
    }

    segments
}

/// Status changes that happen strictly after `now`
pub fn upcoming_phase_changes(points: &[PredictionPoint], now: DateTime<Utc>) -> Vec<PhaseChange> {
    let changes: Vec<PhaseChange> = phase_segments(points)
        .into_iter()
        .filter(|seg| seg.start_time > now)
        .map(|seg| PhaseChange {
            status: seg.status,
            at: seg.start_time,
        })
        .collect();

    tracing::debug!("{} upcoming phase changes after {}", changes.len(), now);
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BacStatus;
    use chrono::{Duration, TimeZone};

    fn series(values: &[f64]) -> Vec<PredictionPoint> {
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 18, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, bac)| PredictionPoint {
                time: start + Duration::minutes(5 * i as i64),
                bac: *bac,
            })
            .collect()
    }

    #[test]
    fn test_empty_forecast_has_no_segments() {
        assert!(phase_segments(&[]).is_empty());
    }

    #[test]
    fn test_constant_status_is_one_segment() {
        let points = series(&[0.0, 0.0, 0.005]);
        let segments = phase_segments(&points);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].status, BacStatus::Sober);
        assert_eq!(segments[0].start_time, points[0].time);
        assert_eq!(segments[0].end_time, points[2].time);
    }

    #[test]
    fn test_rise_and_fall() {
        let points = series(&[0.0, 0.1, 0.3, 0.35, 0.15, 0.0]);
        let segments = phase_segments(&points);
        let statuses: Vec<_> = segments.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                BacStatus::Sober,
                BacStatus::MinimalEffect,
                BacStatus::SlightlyIntoxicated,
                BacStatus::MinimalEffect,
                BacStatus::Sober,
            ]
        );
        assert_eq!(segments[2].start_time, points[2].time);
        assert_eq!(segments[2].end_time, points[3].time);
    }

    #[test]
    fn test_upcoming_changes_skip_current_phase() {
        let points = series(&[0.3, 0.3, 0.15, 0.0]);
        let now = points[0].time;
        let changes = upcoming_phase_changes(&points, now);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].status, BacStatus::MinimalEffect);
        assert_eq!(changes[0].at, points[2].time);
        assert_eq!(changes[1].status, BacStatus::Sober);
    }
}
