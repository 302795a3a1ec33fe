const NAME: &str = "memory_meminfo";

use crate::config::Config;
use crate::samplers::{Source, SourceResult, SourceUnavailable};
use crate::series::MetricSnapshot;

use std::fs::File;
use std::io::{Read, Seek};
use tracing::debug;

pub fn init(_config: &Config) -> SourceResult {
    let file = File::open("/proc/meminfo")
        .map_err(|e| SourceUnavailable::new(NAME, e))?;

    Ok(Some(Box::new(ProcMeminfo { file })))
}

struct ProcMeminfo {
    file: File,
}

impl ProcMeminfo {
    fn read(&mut self) -> Result<Option<f64>, std::io::Error> {
        self.file.rewind()?;

        let mut data = String::new();
        self.file.read_to_string(&mut data)?;

        Ok(used_percent(&data))
    }
}

impl Source for ProcMeminfo {
    fn name(&self) -> &'static str {
        NAME
    }

    fn sample(&mut self, snapshot: &mut MetricSnapshot) {
        match self.read() {
            Ok(percent) => snapshot.ram_percent = percent,
            Err(e) => debug!("failed to read /proc/meminfo: {e}"),
        }
    }
}

/// Share of memory not available for new allocations:
/// `(MemTotal - MemAvailable) / MemTotal`.
fn used_percent(data: &str) -> Option<f64> {
    let mut total = None;
    let mut available = None;

    for line in data.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let slot = match parts.first() {
            Some(&"MemTotal:") => &mut total,
            Some(&"MemAvailable:") => &mut available,
            _ => continue,
        };

        *slot = parts.get(1).and_then(|v| v.parse::<u64>().ok());
    }

    let total = total.filter(|t| *t > 0)?;
    let available = available?;

    let used = total.saturating_sub(available) as f64;

    Some(100.0 * used / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo() {
        let data = "MemTotal:       16000000 kB
MemFree:         2000000 kB
MemAvailable:    4000000 kB
Buffers:          500000 kB
Cached:          3000000 kB
";

        assert_eq!(used_percent(data), Some(75.0));
    }

    #[test]
    fn missing_keys() {
        assert_eq!(used_percent("MemTotal: 100 kB\n"), None);
        assert_eq!(used_percent("MemAvailable: 100 kB\n"), None);
        assert_eq!(used_percent("MemTotal: 0 kB\nMemAvailable: 0 kB\n"), None);
    }
}
