use crate::estimator::EnergyResult;

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};

/// File name used when no report destination is given.
pub const DEFAULT_NAME: &str = "energy_report.md";

#[derive(Debug, thiserror::Error)]
#[error("could not write report to {}: {source}", .path.display())]
pub struct ReportError {
    path: PathBuf,
    source: std::io::Error,
}

/// The Markdown energy report for one analysed recording.
pub struct Report<'a, Tz: TimeZone> {
    result: &'a EnergyResult,
    source: &'a Path,
    generated: DateTime<Tz>,
}

impl<'a, Tz: TimeZone> Report<'a, Tz>
where
    Tz::Offset: std::fmt::Display,
{
    /// A report generated now, timestamped in `timezone`.
    pub fn new(result: &'a EnergyResult, source: &'a Path, timezone: &Tz) -> Self {
        Self::at(result, source, Utc::now().with_timezone(timezone))
    }

    pub fn at(result: &'a EnergyResult, source: &'a Path, generated: DateTime<Tz>) -> Self {
        Self {
            result,
            source,
            generated,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "# GPU Energy Consumption Report\n\
            \n\
            This report details the energy consumption computed from the monitoring data.\n\
            \n\
            - **Analyzed file:** `{source}`\n\
            - **Generated:** {generated}\n\
            \n\
            ---\n\
            \n\
            ## Results\n\
            \n\
            - **Total duration:**\n  \
              - `{duration:.2} seconds`\n\
            \n\
            - **Energy in joules:**\n  \
              - `{joules:.2} J`\n\
            \n\
            - **Energy in kilowatt-hours:**\n  \
              - `{kwh:.8} kWh`\n\
            \n\
            - **Samples:**\n  \
              - `{samples}`\n",
            source = self.source.display(),
            generated = self.generated.format("%Y-%m-%d %H:%M:%S %Z"),
            duration = self.result.duration_seconds,
            joules = self.result.energy_joules,
            kwh = self.result.energy_kwh,
            samples = self.result.sample_count,
        )
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.render()).map_err(|source| ReportError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `energy_report.md` next to the analysed recording.
pub fn default_path(source: &Path) -> PathBuf {
    source.with_file_name(DEFAULT_NAME)
}
