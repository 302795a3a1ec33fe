use super::*;

fn enabled() -> bool {
    true
}

fn width() -> u32 {
    1500
}

fn height() -> u32 {
    700
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plot {
    #[serde(default = "enabled")]
    enabled: bool,
    #[serde(default = "width")]
    width: u32,
    #[serde(default = "height")]
    height: u32,
}

impl Default for Plot {
    fn default() -> Self {
        Self {
            enabled: enabled(),
            width: width(),
            height: height(),
        }
    }
}

impl Plot {
    /// Whether `record` renders charts after it stops.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
