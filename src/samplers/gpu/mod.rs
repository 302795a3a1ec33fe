use crate::config::Config;
use crate::samplers::SourceResult;
#[cfg(not(target_os = "linux"))]
use crate::samplers::SourceUnavailable;

#[cfg(target_os = "linux")]
mod nvidia;

pub fn init(config: &Config) -> SourceResult {
    if !config.gpu().enabled() {
        return Ok(None);
    }

    #[cfg(target_os = "linux")]
    {
        nvidia::init(config)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let reason = "NVML is only supported on Linux";
        Err(SourceUnavailable::new("gpu_nvidia", reason))
    }
}

/// Used share of device memory, reported as 0 for a device claiming no
/// memory at all.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn memory_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    100.0 * used as f64 / total as f64
}
