use super::*;

fn enabled() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gpu {
    #[serde(default = "enabled")]
    enabled: bool,
    #[serde(default)]
    device: u32,
}

impl Default for Gpu {
    fn default() -> Self {
        Self {
            enabled: enabled(),
            device: 0,
        }
    }
}

impl Gpu {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// NVML index of the single device that gets sampled.
    pub fn device(&self) -> u32 {
        self.device
    }
}
