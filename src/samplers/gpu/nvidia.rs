const NAME: &str = "gpu_nvidia";

use super::memory_percent;
use crate::config::Config;
use crate::samplers::{Source, SourceResult, SourceUnavailable};
use crate::series::MetricSnapshot;

use nvml_wrapper::Nvml;
use tracing::{debug, info};

pub fn init(config: &Config) -> SourceResult {
    let nvml = Nvml::init().map_err(|e| SourceUnavailable::new(NAME, e))?;

    let devices = nvml
        .device_count()
        .map_err(|e| SourceUnavailable::new(NAME, e))?;

    if devices == 0 {
        let reason = "NVML initialized, but no NVIDIA GPU was found";
        return Err(SourceUnavailable::new(NAME, reason));
    }

    info!("{devices} NVIDIA GPU(s) found");

    let id = config.gpu().device();

    if id >= devices {
        let reason = format!("GPU {id} requested but only {devices} present");
        return Err(SourceUnavailable::new(NAME, reason));
    }

    if let Ok(name) = nvml.device_by_index(id).and_then(|d| d.name()) {
        info!("sampling GPU {id}: {name}");
    }

    Ok(Some(Box::new(Nvidia { nvml, id })))
}

struct Nvidia {
    nvml: Nvml,
    id: u32,
}

impl Source for Nvidia {
    fn name(&self) -> &'static str {
        NAME
    }

    fn sample(&mut self, snapshot: &mut MetricSnapshot) {
        let device = match self.nvml.device_by_index(self.id) {
            Ok(device) => device,
            Err(e) => {
                debug!("failed to get GPU {}: {e}", self.id);
                return;
            }
        };

        /*
         * utilization and memory
         */

        let (utilization, memory) = match (device.utilization_rates(), device.memory_info()) {
            (Ok(utilization), Ok(memory)) => (utilization, memory),
            (Err(e), _) | (_, Err(e)) => {
                debug!("failed to collect GPU {} metrics: {e}", self.id);
                return;
            }
        };

        snapshot.gpu_percent = Some(utilization.gpu as f64);
        snapshot.gpu_memory_percent = Some(memory_percent(memory.used, memory.total));

        /*
         * power (reported in milliwatts)
         */

        snapshot.gpu_power_watts = device.power_usage().ok().map(|mw| mw as f64 / 1000.0);
    }
}
