use super::*;

fn output() -> PathBuf {
    "monitoring_results".into()
}

fn interval() -> String {
    "1s".into()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(default = "output")]
    output: PathBuf,
    #[serde(default = "interval")]
    interval: String,
    #[serde(default)]
    duration: Option<String>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            output: output(),
            interval: interval(),
            duration: None,
        }
    }
}

impl General {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.interval()?;
        self.duration()?;
        Ok(())
    }

    /// Directory the recording and its plots are written to.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn set_output(&mut self, output: PathBuf) {
        self.output = output;
    }

    /// Time between two samples.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration("interval", &self.interval)
    }

    pub fn set_interval(&mut self, interval: String) {
        self.interval = interval;
    }

    /// Optional limit on how long to record for.
    pub fn duration(&self) -> Result<Option<Duration>, ConfigError> {
        self.duration
            .as_deref()
            .map(|d| parse_duration("duration", d))
            .transpose()
    }

    pub fn set_duration(&mut self, duration: String) {
        self.duration = Some(duration);
    }
}
