//! Collects aggregate CPU usage from `/proc/stat`.
//!
//! Usage is the share of non-idle time between two consecutive reads of the
//! `cpu` line, so the first value reflects the time since the source was
//! created.

const NAME: &str = "cpu_usage";

use crate::config::Config;
use crate::samplers::{Source, SourceResult, SourceUnavailable};
use crate::series::MetricSnapshot;

use std::fs::File;
use std::io::{Read, Seek};
use tracing::debug;

pub fn init(_config: &Config) -> SourceResult {
    let mut source = ProcStat::new("/proc/stat")
        .map_err(|e| SourceUnavailable::new(NAME, e))?;

    // baseline for the first sample
    source.prev = source.read().ok().flatten();

    Ok(Some(Box::new(source)))
}

/// Cumulative ticks from the `cpu` line of `/proc/stat`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct CpuTimes {
    total: u64,
    idle: u64,
}

struct ProcStat {
    file: File,
    prev: Option<CpuTimes>,
}

impl ProcStat {
    fn new(path: &str) -> Result<Self, std::io::Error> {
        Ok(Self {
            file: File::open(path)?,
            prev: None,
        })
    }

    fn read(&mut self) -> Result<Option<CpuTimes>, std::io::Error> {
        self.file.rewind()?;

        let mut data = String::new();
        self.file.read_to_string(&mut data)?;

        Ok(parse(&data))
    }
}

impl Source for ProcStat {
    fn name(&self) -> &'static str {
        NAME
    }

    fn sample(&mut self, snapshot: &mut MetricSnapshot) {
        let current = match self.read() {
            Ok(Some(times)) => times,
            Ok(None) => {
                debug!("no aggregate cpu line in /proc/stat");
                return;
            }
            Err(e) => {
                debug!("failed to read /proc/stat: {e}");
                return;
            }
        };

        if let Some(prev) = self.prev.replace(current) {
            snapshot.cpu_percent = usage(prev, current);
        }
    }
}

/// Parse the aggregate `cpu` line. Fields are user, nice, system, idle,
/// iowait, irq, softirq, steal; guest time is already part of user and nice.
fn parse(data: &str) -> Option<CpuTimes> {
    for line in data.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if let Some(&"cpu") = parts.first() {
            let fields: Vec<u64> = parts[1..]
                .iter()
                .take(8)
                .map(|v| v.parse::<u64>())
                .collect::<Result<_, _>>()
                .ok()?;

            if fields.len() < 4 {
                return None;
            }

            let total = fields.iter().sum();
            let idle = fields[3] + fields.get(4).copied().unwrap_or(0);

            return Some(CpuTimes { total, idle });
        }
    }

    None
}

fn usage(prev: CpuTimes, current: CpuTimes) -> Option<f64> {
    let total = current.total.checked_sub(prev.total)?;
    let idle = current.idle.checked_sub(prev.idle)?;

    if total == 0 {
        return None;
    }

    let busy = total.saturating_sub(idle);

    Some((100.0 * busy as f64 / total as f64).clamp(0.0, 100.0))
}
