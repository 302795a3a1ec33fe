use crate::*;

use crate::config::ConfigError;
use crate::estimator::{EnergyResult, EstimateError};
use crate::report::{Report, ReportError};

pub struct Config {
    csv: PathBuf,
    report: Option<PathBuf>,
    json: bool,
    verbose: u8,
    config: crate::config::Config,
}

impl TryFrom<ArgMatches> for Config {
    type Error = ConfigError;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let mut config = crate::config::Config::from_args(&args)?;

        if let Some(column) = args.get_one::<String>("TIMESTAMP_COLUMN") {
            config.estimate_mut().set_timestamp_column(column.clone());
        }

        if let Some(column) = args.get_one::<String>("POWER_COLUMN") {
            config.estimate_mut().set_power_column(column.clone());
        }

        if let Some(timezone) = args.get_one::<String>("TIMEZONE") {
            config.estimate_mut().set_timezone(timezone.clone());
        }

        config.check()?;

        Ok(Config {
            csv: args
                .get_one::<PathBuf>("CSV")
                .cloned()
                .unwrap_or_else(|| config.general().output().join(recorder::FILENAME)),
            report: args.get_one::<PathBuf>("REPORT").cloned(),
            json: args.get_flag("JSON"),
            verbose: args.get_count("VERBOSE"),
            config,
        })
    }
}

pub fn command() -> Command {
    Command::new("estimate")
        .about("Estimate the energy consumed by the GPU during a recording")
        .arg(
            clap::Arg::new("CSV")
                .help("Recording to analyze [default: <output>/system_metrics.csv]")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(common::verbose_arg())
        .arg(common::config_arg())
        .arg(
            clap::Arg::new("TIMESTAMP_COLUMN")
                .long("timestamp-column")
                .short('t')
                .help("Name of the timestamp column [default: Timestamp]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("POWER_COLUMN")
                .long("power-column")
                .short('p')
                .help("Name of the power column, in watts [default: GPU Power (W)]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("REPORT")
                .long("report")
                .short('r')
                .help("Markdown report destination [default: energy_report.md beside the CSV]")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("TIMEZONE")
                .long("timezone")
                .short('z')
                .help("IANA timezone for the report timestamp [default: America/Sao_Paulo]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("JSON")
                .long("json")
                .help("Print the result as JSON. No report is written unless --report is given")
                .action(clap::ArgAction::SetTrue),
        )
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A successful analysis and where its report went.
#[derive(Debug)]
pub struct Analysis {
    pub result: EnergyResult,
    pub report: PathBuf,
}

/// Estimate the energy of the recording at `csv` and write the Markdown
/// report to `report`, or to `energy_report.md` next to the recording.
pub fn analyze(
    csv: &Path,
    report: Option<&Path>,
    config: &crate::config::Config,
) -> Result<Analysis, AnalyzeError> {
    let settings = config.estimate();

    info!("analyzing {}", csv.display());

    let result = estimator::estimate_file(
        csv,
        settings.timestamp_column(),
        settings.power_column(),
    )?;

    debug!(
        "{} samples over {:.2}s: {:.2} J",
        result.sample_count, result.duration_seconds, result.energy_joules
    );

    let timezone = settings.timezone()?;

    let path = match report {
        Some(path) => path.to_path_buf(),
        None => report::default_path(csv),
    };

    Report::new(&result, csv, &timezone).write(&path)?;

    info!("report saved to {}", path.display());

    Ok(Analysis {
        result,
        report: path,
    })
}

pub fn run(config: Config) {
    common::configure_logging(common::log_level(
        config.config.log().level(),
        config.verbose,
    ));

    if config.json && config.report.is_none() {
        let settings = config.config.estimate();

        match estimator::estimate_file(
            &config.csv,
            settings.timestamp_column(),
            settings.power_column(),
        ) {
            Ok(result) => print_json(&result),
            Err(e) => crate::exit_with(e),
        }

        return;
    }

    match analyze(&config.csv, config.report.as_deref(), &config.config) {
        Ok(analysis) if config.json => print_json(&analysis.result),
        Ok(analysis) => print!("{}", summary(&config.csv, &analysis)),
        Err(e) => crate::exit_with(e),
    }
}

fn print_json(result: &EnergyResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => crate::exit_with(e),
    }
}

fn summary(csv: &Path, analysis: &Analysis) -> String {
    let result = &analysis.result;

    format!(
        "file:     {}\n\
        duration: {:.2} s\n\
        energy:   {:.2} J ({:.8} kWh)\n\
        samples:  {}\n\
        report:   {}\n",
        csv.display(),
        result.duration_seconds,
        result.energy_joules,
        result.energy_kwh,
        result.sample_count,
        analysis.report.display(),
    )
}
