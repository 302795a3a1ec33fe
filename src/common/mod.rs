use clap::Arg;
use tracing::level_filters::LevelFilter;

mod interval;

pub use interval::Interval;

/// The `-v` flag shared by every subcommand.
pub fn verbose_arg() -> Arg {
    Arg::new("VERBOSE")
        .long("verbose")
        .short('v')
        .help("Increase the verbosity")
        .action(clap::ArgAction::Count)
}

/// The `-c` flag shared by every subcommand.
pub fn config_arg() -> Arg {
    Arg::new("CONFIG")
        .long("config")
        .short('c')
        .help("Path to a TOML configuration file")
        .action(clap::ArgAction::Set)
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

/// Raise the configured level by one step per `-v`.
pub fn log_level(configured: LevelFilter, verbose: u8) -> LevelFilter {
    let levels = [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];

    let base = levels.iter().position(|l| *l == configured).unwrap_or(3);

    levels[(base + verbose as usize).min(levels.len() - 1)]
}

/// Install the debug log on stderr. Safe to call more than once; only the
/// first call takes effect.
pub fn configure_logging(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_level() {
        assert_eq!(log_level(LevelFilter::INFO, 0), LevelFilter::INFO);
        assert_eq!(log_level(LevelFilter::INFO, 1), LevelFilter::DEBUG);
        assert_eq!(log_level(LevelFilter::INFO, 2), LevelFilter::TRACE);
        assert_eq!(log_level(LevelFilter::WARN, 9), LevelFilter::TRACE);
    }
}
