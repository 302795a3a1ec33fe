//! The persisted time-series format shared by the recorder, the estimator and
//! the plotter.
//!
//! A recording is a comma separated file with the header:
//!
//! ```text
//! Timestamp,CPU Usage (%),RAM Usage (%),GPU Usage (%),VRAM Usage (%),GPU Power (W)
//! ```
//!
//! Timestamps are local wall-clock time with millisecond precision. Numeric
//! fields carry two decimals, and a metric that could not be measured is
//! written as an empty field rather than zero.

use chrono::{DateTime, NaiveDateTime, Utc};

mod store;

pub use store::{read_all, CsvStore, RowSink, StoreError};

pub const TIMESTAMP: &str = "Timestamp";
pub const CPU_USAGE: &str = "CPU Usage (%)";
pub const RAM_USAGE: &str = "RAM Usage (%)";
pub const GPU_USAGE: &str = "GPU Usage (%)";
pub const VRAM_USAGE: &str = "VRAM Usage (%)";
pub const GPU_POWER: &str = "GPU Power (W)";

pub const HEADER: [&str; 6] = [
    TIMESTAMP, CPU_USAGE, RAM_USAGE, GPU_USAGE, VRAM_USAGE, GPU_POWER,
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One instant's readings. `None` means the metric could not be measured.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSnapshot {
    pub timestamp: NaiveDateTime,
    pub cpu_percent: Option<f64>,
    pub ram_percent: Option<f64>,
    pub gpu_percent: Option<f64>,
    pub gpu_memory_percent: Option<f64>,
    pub gpu_power_watts: Option<f64>,
}

impl MetricSnapshot {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            cpu_percent: None,
            ram_percent: None,
            gpu_percent: None,
            gpu_memory_percent: None,
            gpu_power_watts: None,
        }
    }

    pub fn to_row(&self) -> TimeSeriesRow {
        TimeSeriesRow {
            fields: [
                self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format_value(self.cpu_percent),
                format_value(self.ram_percent),
                format_value(self.gpu_percent),
                format_value(self.gpu_memory_percent),
                format_value(self.gpu_power_watts),
            ],
        }
    }
}

/// A snapshot as it is written to disk, in `HEADER` order.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesRow {
    fields: [String; 6],
}

impl TimeSeriesRow {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Parse an absolute timestamp as written by the recorder. Also accepts a `T`
/// separator, a missing fractional part, and RFC 3339 (converted to UTC).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc).naive_utc())
}

/// Parse a numeric field. Empty, non-numeric and non-finite values are
/// treated as absent.
pub fn parse_value(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A recording read back from disk: the header and the raw text of each row.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Recording {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Index of the named column, if present in the header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The field at `column` in every row; `None` for ragged rows.
    pub fn values(&self, column: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(column).map(|v| v.as_str()))
    }
}
