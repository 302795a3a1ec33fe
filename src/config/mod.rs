use clap::ArgMatches;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod estimate;
mod general;
mod gpu;
mod log;
mod plot;

pub use estimate::Estimate;
pub use general::General;
pub use gpu::Gpu;
pub use log::Log;
pub use plot::Plot;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to open config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{name} is not a valid duration: {source}")]
    Duration {
        name: &'static str,
        source: humantime::DurationError,
    },
    #[error("{name} is too short. Minimum is: 1ms")]
    TooShort { name: &'static str },
    #[error("unknown timezone: {0}")]
    Timezone(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    log: Log,
    #[serde(default)]
    gpu: Gpu,
    #[serde(default)]
    estimate: Estimate,
    #[serde(default)]
    plot: Plot,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.check()?;

        Ok(config)
    }

    /// Load the file named by `--config` when present, the defaults
    /// otherwise.
    pub fn from_args(args: &ArgMatches) -> Result<Self, ConfigError> {
        match args.get_one::<PathBuf>("CONFIG") {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.general.check()?;
        self.estimate.check()?;
        Ok(())
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut General {
        &mut self.general
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn estimate(&self) -> &Estimate {
        &self.estimate
    }

    pub fn estimate_mut(&mut self) -> &mut Estimate {
        &mut self.estimate
    }

    pub fn plot(&self) -> &Plot {
        &self.plot
    }
}

fn parse_duration(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let duration: Duration = value
        .parse::<humantime::Duration>()
        .map_err(|source| ConfigError::Duration { name, source })?
        .into();

    if duration < Duration::from_millis(1) {
        return Err(ConfigError::TooShort { name });
    }

    Ok(duration)
}
