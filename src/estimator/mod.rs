//! Energy estimation from a recorded power series.
//!
//! The power column is integrated over time with the trapezoidal rule:
//!
//! ```text
//! E = sum_i (t[i+1] - t[i]) * (p[i+1] + p[i]) / 2
//! ```
//!
//! Rows whose timestamp or power cannot be parsed are dropped. The surviving
//! samples are sorted by time and their timestamps are converted to seconds
//! since the earliest sample before integrating, which keeps the arithmetic
//! away from large epoch values.

use crate::series::{self, Recording, StoreError};

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const JOULES_PER_KWH: f64 = 3_600_000.0;

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("file not found or unreadable: {}", .path.display())]
    Unavailable { path: PathBuf, source: StoreError },
    #[error("no rows to analyze")]
    EmptyInput,
    #[error("columns '{timestamp}' or '{power}' not found")]
    Schema { timestamp: String, power: String },
    #[error("insufficient data points for the calculation (found {found}, need at least 2)")]
    InsufficientData { found: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EnergyResult {
    pub duration_seconds: f64,
    pub energy_joules: f64,
    pub energy_kwh: f64,
    pub sample_count: usize,
}

/// Read the recording at `path` and estimate the energy it represents.
pub fn estimate_file(
    path: &Path,
    timestamp_field: &str,
    power_field: &str,
) -> Result<EnergyResult, EstimateError> {
    let recording = series::read_all(path).map_err(|source| EstimateError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("read {} rows from {}", recording.len(), path.display());

    estimate(&recording, timestamp_field, power_field)
}

pub fn estimate(
    recording: &Recording,
    timestamp_field: &str,
    power_field: &str,
) -> Result<EnergyResult, EstimateError> {
    // a file without even a header has nothing to validate against
    if recording.columns().is_empty() && recording.is_empty() {
        return Err(EstimateError::EmptyInput);
    }

    let (timestamp, power) = match (
        recording.column(timestamp_field),
        recording.column(power_field),
    ) {
        (Some(t), Some(p)) => (t, p),
        _ => {
            return Err(EstimateError::Schema {
                timestamp: timestamp_field.to_string(),
                power: power_field.to_string(),
            })
        }
    };

    if recording.is_empty() {
        return Err(EstimateError::EmptyInput);
    }

    let samples = clean(recording, timestamp, power);

    if samples.len() < 2 {
        return Err(EstimateError::InsufficientData {
            found: samples.len(),
        });
    }

    let series = normalize(&samples);

    let energy_joules = integrate(&series);

    Ok(EnergyResult {
        duration_seconds: series.last().map(|(t, _)| *t).unwrap_or(0.0),
        energy_joules,
        energy_kwh: energy_joules / JOULES_PER_KWH,
        sample_count: series.len(),
    })
}

/// Parse each row independently, keeping the ones with a valid timestamp
/// and a finite, non-negative power. The result is sorted by time; rows
/// sharing a timestamp keep their file order.
fn clean(recording: &Recording, timestamp: usize, power: usize) -> Vec<(NaiveDateTime, f64)> {
    let mut samples: Vec<(NaiveDateTime, f64)> = recording
        .rows()
        .filter_map(|row| {
            let watts = series::parse_value(row.get(power)?).filter(|w| *w >= 0.0)?;
            let time = series::parse_timestamp(row.get(timestamp)?)?;
            Some((time, watts))
        })
        .collect();

    samples.sort_by_key(|(time, _)| *time);

    samples
}

/// Convert absolute timestamps into seconds since the first sample.
fn normalize(samples: &[(NaiveDateTime, f64)]) -> Vec<(f64, f64)> {
    let Some((start, _)) = samples.first() else {
        return Vec::new();
    };

    samples
        .iter()
        .map(|(time, watts)| (seconds(*time - *start), *watts))
        .collect()
}

fn seconds(delta: chrono::TimeDelta) -> f64 {
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Trapezoidal integral of `(seconds, watts)` pairs, in joules. The input
/// must already be ordered by time.
pub fn integrate(series: &[(f64, f64)]) -> f64 {
    series
        .windows(2)
        .map(|w| {
            let (t0, p0) = w[0];
            let (t1, p1) = w[1];
            (t1 - t0) * (p0 + p1) / 2.0
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{GPU_POWER, TIMESTAMP};

    fn recording(rows: &[(&str, &str)]) -> Recording {
        Recording::new(
            vec![TIMESTAMP.to_string(), GPU_POWER.to_string()],
            rows.iter()
                .map(|(t, p)| vec![t.to_string(), p.to_string()])
                .collect(),
        )
    }

    fn run(rows: &[(&str, &str)]) -> Result<EnergyResult, EstimateError> {
        estimate(&recording(rows), TIMESTAMP, GPU_POWER)
    }

    #[test]
    fn two_samples() {
        let result = run(&[
            ("2024-01-01 00:00:00.000", "100.00"),
            ("2024-01-01 00:00:10.000", "200.00"),
        ])
        .unwrap();

        assert_eq!(result.duration_seconds, 10.0);
        assert_eq!(result.energy_joules, 1500.0);
        assert_eq!(result.energy_kwh, 1500.0 / 3.6e6);
        assert!((result.energy_kwh - 0.00041667).abs() < 1e-8);
        assert_eq!(result.sample_count, 2);
    }

    #[test]
    fn bad_power_row_is_dropped() {
        let result = run(&[
            ("2024-01-01 00:00:00.000", "100.00"),
            ("2024-01-01 00:00:05.000", "N/A"),
            ("2024-01-01 00:00:10.000", "200.00"),
        ])
        .unwrap();

        assert_eq!(result.energy_joules, 1500.0);
        assert_eq!(result.duration_seconds, 10.0);
        assert_eq!(result.sample_count, 2);
    }

    #[test]
    fn bad_rows_of_every_kind_are_dropped() {
        let rows = [
            ("2024-01-01 00:00:00.000", Some("100.00")),
            ("not a time", Some("500.00")),
            ("2024-01-01 00:00:03.000", Some("")),
            ("2024-01-01 00:00:04.000", Some("-5.0")),
            ("2024-01-01 00:00:06.000", Some("NaN")),
            // ragged row without a power field
            ("2024-01-01 00:00:08.000", None),
            ("2024-01-01 00:00:10.000", Some("200.00")),
        ];

        let recording = Recording::new(
            vec![TIMESTAMP.to_string(), GPU_POWER.to_string()],
            rows.iter()
                .map(|(t, p)| {
                    let mut row = vec![t.to_string()];
                    row.extend(p.map(|p| p.to_string()));
                    row
                })
                .collect(),
        );

        let result = estimate(&recording, TIMESTAMP, GPU_POWER).unwrap();

        assert_eq!(result.energy_joules, 1500.0);
        assert_eq!(result.sample_count, 2);
    }

    #[test]
    fn order_independent() {
        let sorted = run(&[
            ("2024-01-01 00:00:00.000", "50.0"),
            ("2024-01-01 00:00:01.500", "75.0"),
            ("2024-01-01 00:00:04.000", "120.0"),
            ("2024-01-01 00:00:09.250", "90.0"),
        ])
        .unwrap();

        let shuffled = run(&[
            ("2024-01-01 00:00:04.000", "120.0"),
            ("2024-01-01 00:00:00.000", "50.0"),
            ("2024-01-01 00:00:09.250", "90.0"),
            ("2024-01-01 00:00:01.500", "75.0"),
        ])
        .unwrap();

        assert_eq!(sorted, shuffled);

        // same timestamps, different pairing with power
        let repaired = run(&[
            ("2024-01-01 00:00:00.000", "120.0"),
            ("2024-01-01 00:00:01.500", "75.0"),
            ("2024-01-01 00:00:04.000", "50.0"),
            ("2024-01-01 00:00:09.250", "90.0"),
        ])
        .unwrap();

        assert_ne!(sorted.energy_joules, repaired.energy_joules);
    }

    #[test]
    fn constant_power() {
        let result = run(&[
            ("2024-03-10 08:00:00.000", "42.0"),
            ("2024-03-10 08:00:01.000", "42.0"),
            ("2024-03-10 08:00:03.000", "42.0"),
            ("2024-03-10 08:01:00.000", "42.0"),
        ])
        .unwrap();

        assert_eq!(result.duration_seconds, 60.0);
        assert_eq!(result.energy_joules, 42.0 * 60.0);
    }

    #[test]
    fn linear_ramp() {
        // power rises linearly from 10W to 110W over 100s, sampled unevenly
        let result = run(&[
            ("2024-01-01 00:00:00.000", "10.0"),
            ("2024-01-01 00:00:20.000", "30.0"),
            ("2024-01-01 00:00:25.000", "35.0"),
            ("2024-01-01 00:01:40.000", "110.0"),
        ])
        .unwrap();

        assert_eq!(result.duration_seconds, 100.0);
        let expected = 100.0 * (10.0 + 110.0) / 2.0;
        assert!((result.energy_joules - expected).abs() < 1e-9);
    }

    #[test]
    fn kwh_matches_joules() {
        let result = run(&[
            ("2024-01-01 00:00:00.000", "300.0"),
            ("2024-01-01 01:00:00.000", "300.0"),
        ])
        .unwrap();

        assert_eq!(result.energy_joules, 300.0 * 3600.0);
        assert_eq!(result.energy_kwh, result.energy_joules / JOULES_PER_KWH);
        assert!((result.energy_kwh - 0.3).abs() < 1e-12);
    }

    #[test]
    fn duplicate_timestamps() {
        let result = run(&[
            ("2024-01-01 00:00:00.000", "100.0"),
            ("2024-01-01 00:00:00.000", "100.0"),
            ("2024-01-01 00:00:10.000", "100.0"),
        ])
        .unwrap();

        assert_eq!(result.energy_joules, 1000.0);
        assert_eq!(result.sample_count, 3);
    }

    #[test]
    fn millisecond_spacing_near_epoch_scale() {
        let result = run(&[
            ("2038-01-19 03:14:07.000", "1.0"),
            ("2038-01-19 03:14:07.001", "1.0"),
            ("2038-01-19 03:14:07.002", "1.0"),
        ])
        .unwrap();

        assert!((result.duration_seconds - 0.002).abs() < 1e-12);
        assert!((result.energy_joules - 0.002).abs() < 1e-12);
    }

    #[test]
    fn insufficient_data() {
        assert!(matches!(
            run(&[("2024-01-01 00:00:00.000", "100.0")]),
            Err(EstimateError::InsufficientData { found: 1 })
        ));

        assert!(matches!(
            run(&[
                ("2024-01-01 00:00:00.000", "N/A"),
                ("garbage", "100.0"),
            ]),
            Err(EstimateError::InsufficientData { found: 0 })
        ));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(run(&[]), Err(EstimateError::EmptyInput)));
        assert!(matches!(
            estimate(&Recording::default(), TIMESTAMP, GPU_POWER),
            Err(EstimateError::EmptyInput)
        ));
    }

    #[test]
    fn missing_column() {
        let result = estimate(
            &recording(&[("2024-01-01 00:00:00.000", "100.0")]),
            TIMESTAMP,
            "Power (W)",
        );

        match result {
            Err(EstimateError::Schema { timestamp, power }) => {
                assert_eq!(timestamp, TIMESTAMP);
                assert_eq!(power, "Power (W)");
            }
            other => panic!("expected schema error, got {other:?}"),
        }

        // schema is validated even when there is nothing to integrate
        assert!(matches!(
            estimate(&recording(&[]), "Time", GPU_POWER),
            Err(EstimateError::Schema { .. })
        ));
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_metrics.csv");
        std::fs::write(
            &path,
            "Timestamp , CPU Usage (%) , GPU Power (W)\n\
             2024-01-01 00:00:10.000 , 5.00 , 200.00\n\
             2024-01-01 00:00:00.000 , 5.00 , 100.00\n\
             2024-01-01 00:00:05.000 , 5.00 , N/A\n",
        )
        .unwrap();

        let result = estimate_file(&path, TIMESTAMP, GPU_POWER).unwrap();
        assert_eq!(result.energy_joules, 1500.0);
        assert_eq!(result.sample_count, 2);

        assert!(matches!(
            estimate_file(&dir.path().join("missing.csv"), TIMESTAMP, GPU_POWER),
            Err(EstimateError::Unavailable { .. })
        ));

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(
            estimate_file(&empty, TIMESTAMP, GPU_POWER),
            Err(EstimateError::EmptyInput)
        ));
    }

    #[test]
    fn stray_quote_drops_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_metrics.csv");
        std::fs::write(
            &path,
            "Timestamp,GPU Power (W)\n\
             2024-01-01 00:00:00.000,100.00\n\
             2024-01-01 00:00:05.000,\"oops\n\
             2024-01-01 00:00:10.000,200.00\n\
             2024-01-01 00:00:20.000,200.00\n",
        )
        .unwrap();

        let result = estimate_file(&path, TIMESTAMP, GPU_POWER).unwrap();

        assert_eq!(result.sample_count, 3);
        assert_eq!(result.duration_seconds, 20.0);
        // 10s at a 100W..200W ramp, then 10s at 200W
        assert_eq!(result.energy_joules, 1500.0 + 2000.0);
    }

    #[test]
    fn integrate_edges() {
        assert_eq!(integrate(&[]), 0.0);
        assert_eq!(integrate(&[(0.0, 100.0)]), 0.0);
        assert_eq!(integrate(&[(0.0, 0.0), (2.0, 10.0)]), 10.0);
    }
}
