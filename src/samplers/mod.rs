use crate::config::Config;
use crate::series::MetricSnapshot;

use tracing::{debug, warn};

mod cpu;
mod gpu;
mod memory;

/// A metric source, asked once per tick to fill in its fields of the
/// snapshot. Fields it cannot read this tick are left untouched (absent).
pub trait Source {
    fn name(&self) -> &'static str;

    fn sample(&mut self, snapshot: &mut MetricSnapshot);
}

#[derive(Debug, thiserror::Error)]
#[error("{name} source unavailable: {reason}")]
pub struct SourceUnavailable {
    name: &'static str,
    reason: String,
}

impl SourceUnavailable {
    pub fn new(name: &'static str, reason: impl ToString) -> Self {
        Self {
            name,
            reason: reason.to_string(),
        }
    }
}

/// `Ok(None)` means the source is disabled by configuration.
pub type SourceResult = Result<Option<Box<dyn Source>>, SourceUnavailable>;

static SOURCES: &[fn(&Config) -> SourceResult] = &[cpu::init, memory::init, gpu::init];

/// Initialize every source that is enabled and available on this host. A
/// source that fails to initialize is left out for the whole run and its
/// fields are recorded as absent.
pub fn init(config: &Config) -> Vec<Box<dyn Source>> {
    let mut sources = Vec::new();

    for init in SOURCES {
        match init(config) {
            Ok(Some(source)) => {
                debug!("'{}' source is enabled", source.name());
                sources.push(source);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("{e}. Its metrics will be recorded as absent");
            }
        }
    }

    sources
}

/// Take one snapshot at `timestamp` from all sources.
pub fn sample(
    sources: &mut [Box<dyn Source>],
    timestamp: chrono::NaiveDateTime,
) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::new(timestamp);

    for source in sources.iter_mut() {
        source.sample(&mut snapshot);
    }

    snapshot
}
