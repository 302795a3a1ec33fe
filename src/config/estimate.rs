use super::*;

use chrono_tz::Tz;

fn timestamp_column() -> String {
    crate::series::TIMESTAMP.into()
}

fn power_column() -> String {
    crate::series::GPU_POWER.into()
}

fn timezone() -> String {
    "America/Sao_Paulo".into()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Estimate {
    #[serde(default = "timestamp_column")]
    timestamp_column: String,
    #[serde(default = "power_column")]
    power_column: String,
    #[serde(default = "timezone")]
    timezone: String,
}

impl Default for Estimate {
    fn default() -> Self {
        Self {
            timestamp_column: timestamp_column(),
            power_column: power_column(),
            timezone: timezone(),
        }
    }
}

impl Estimate {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.timezone().map(|_| ())
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    pub fn set_timestamp_column(&mut self, column: String) {
        self.timestamp_column = column;
    }

    pub fn power_column(&self) -> &str {
        &self.power_column
    }

    pub fn set_power_column(&mut self, column: String) {
        self.power_column = column;
    }

    /// Timezone the report's generation time is rendered in.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    pub fn set_timezone(&mut self, timezone: String) {
        self.timezone = timezone;
    }
}
