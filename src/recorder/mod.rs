use crate::*;

use crate::common::Interval;
use crate::samplers::Source;
use crate::series::{CsvStore, RowSink, StoreError};

/// Name of the recording inside the output directory.
pub const FILENAME: &str = "system_metrics.csv";

pub struct Config {
    config: crate::config::Config,
    verbose: u8,
}

impl TryFrom<ArgMatches> for Config {
    type Error = crate::config::ConfigError;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let mut config = crate::config::Config::from_args(&args)?;

        if let Some(output) = args.get_one::<PathBuf>("OUTPUT") {
            config.general_mut().set_output(output.clone());
        }

        if let Some(interval) = args.get_one::<humantime::Duration>("INTERVAL") {
            config.general_mut().set_interval(interval.to_string());
        }

        if let Some(duration) = args.get_one::<humantime::Duration>("DURATION") {
            config.general_mut().set_duration(duration.to_string());
        }

        config.check()?;

        Ok(Config {
            config,
            verbose: args.get_count("VERBOSE"),
        })
    }
}

pub fn command() -> Command {
    Command::new("record")
        .about("Sample CPU, memory and GPU utilization to a CSV file until interrupted")
        .arg(common::verbose_arg())
        .arg(common::config_arg())
        .arg(
            clap::Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Directory for the recording, report and plots")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("INTERVAL")
                .long("interval")
                .short('i')
                .help("Sets the sampling interval [default: 1s]")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(humantime::Duration)),
        )
        .arg(
            clap::Arg::new("DURATION")
                .long("duration")
                .short('d')
                .help("Stop after recording for this long")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(humantime::Duration)),
        )
}

/// Runs the recorder: samples every enabled source once per interval and
/// appends a row to `<output>/system_metrics.csv` until ctrl-c (or the
/// optional duration). Once stopped, the recording is plotted and its energy
/// report is written next to it.
pub fn run(config: Config) {
    let Config { config, verbose } = config;

    common::configure_logging(common::log_level(config.log().level(), verbose));

    let (interval, duration) = match (config.general().interval(), config.general().duration()) {
        (Ok(interval), Ok(duration)) => (interval, duration),
        (Err(e), _) | (_, Err(e)) => crate::exit_with(e),
    };

    if let Err(e) = ctrlc::set_handler(move || {
        if STATE.load(Ordering::SeqCst) == RUNNING {
            eprintln!("finalizing recording... please wait...");
            STATE.store(TERMINATING, Ordering::SeqCst);
        } else {
            eprintln!("terminating immediately");
            std::process::exit(2);
        }
    }) {
        crate::exit_with(format!("failed to set ctrl-c handler: {e}"));
    }

    let output = config.general().output();

    if let Err(e) = std::fs::create_dir_all(output) {
        crate::exit_with(format!(
            "could not create output directory {}: {e}",
            output.display()
        ));
    }

    let mut sources = samplers::init(&config);

    let mut store = match CsvStore::create(&output.join(FILENAME)) {
        Ok(store) => store,
        Err(e) => crate::exit_with(e),
    };

    info!(
        "recording to {} every {}. Press ctrl-c to stop",
        store.path().display(),
        humantime::format_duration(interval)
    );

    match sample(&mut sources, &mut store, interval, duration, &STATE) {
        Ok(rows) => info!("recorded {rows} samples to {}", store.path().display()),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }

    let path = store.path().to_path_buf();

    // release the file and any device handles before post-processing
    drop(store);
    drop(sources);

    if config.plot().enabled() {
        plot::render_file(&path, &output.join(plot::DIRECTORY), config.plot());
    }

    match estimate::analyze(&path, None, &config) {
        Ok(analysis) => info!(
            "estimated GPU energy: {:.2} J ({:.8} kWh) over {:.2}s",
            analysis.result.energy_joules,
            analysis.result.energy_kwh,
            analysis.result.duration_seconds
        ),
        Err(e) => warn!("no energy report for {}: {e}", path.display()),
    }
}

/// The sampling loop. Takes one snapshot per tick and appends it to `sink`
/// until `state` leaves `RUNNING`, which is only checked at tick
/// boundaries, or until `duration` has elapsed. Returns the number of rows
/// written. Any failure to write is fatal.
pub fn sample<S: RowSink>(
    sources: &mut [Box<dyn Source>],
    sink: &mut S,
    interval: Duration,
    duration: Option<Duration>,
    state: &AtomicUsize,
) -> Result<usize, StoreError> {
    let start = Instant::now();
    let mut interval = Interval::new(start, interval);
    let mut rows = 0;

    loop {
        interval.wait();

        if state.load(Ordering::Relaxed) != RUNNING {
            debug!("stop requested");
            break;
        }

        if duration.is_some_and(|d| start.elapsed() >= d) {
            debug!("recording duration reached");
            break;
        }

        let timestamp = chrono::Local::now().naive_local();
        let snapshot = samplers::sample(sources, timestamp);

        sink.append(&snapshot.to_row())?;
        sink.flush()?;

        rows += 1;
    }

    sink.flush()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::estimate_file;
    use crate::series::{MetricSnapshot, TimeSeriesRow, GPU_POWER, TIMESTAMP};
    use std::sync::Arc;

    /// Reports a fixed power draw and requests termination after `limit`
    /// samples, the way a ctrl-c would.
    struct StopAfter {
        seen: usize,
        limit: usize,
        state: Arc<AtomicUsize>,
    }

    impl Source for StopAfter {
        fn name(&self) -> &'static str {
            "stop_after"
        }

        fn sample(&mut self, snapshot: &mut MetricSnapshot) {
            snapshot.gpu_power_watts = Some(100.0);
            self.seen += 1;
            if self.seen == self.limit {
                self.state.store(TERMINATING, Ordering::SeqCst);
            }
        }
    }

    struct Broken;

    impl RowSink for Broken {
        fn append(&mut self, _row: &TimeSeriesRow) -> Result<(), StoreError> {
            Err(StoreError::Flush {
                path: "broken.csv".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn stops_at_tick_boundary() {
        let state = Arc::new(AtomicUsize::new(RUNNING));
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(StopAfter {
            seen: 0,
            limit: 3,
            state: state.clone(),
        })];
        let mut sink: Vec<TimeSeriesRow> = Vec::new();

        let rows = sample(
            &mut sources,
            &mut sink,
            Duration::from_millis(1),
            None,
            &state,
        )
        .unwrap();

        // the row being sampled when termination is requested is still kept
        assert_eq!(rows, 3);
        assert_eq!(sink.len(), 3);
        for row in &sink {
            assert_eq!(row.fields()[5], "100.00");
            assert_eq!(row.fields()[1], "");
        }
    }

    #[test]
    fn stops_after_duration() {
        let state = AtomicUsize::new(RUNNING);
        let mut sources: Vec<Box<dyn Source>> = Vec::new();
        let mut sink: Vec<TimeSeriesRow> = Vec::new();

        let rows = sample(
            &mut sources,
            &mut sink,
            Duration::from_millis(5),
            Some(Duration::from_millis(30)),
            &state,
        )
        .unwrap();

        assert!(rows >= 1);
        assert_eq!(rows, sink.len());
    }

    #[test]
    fn already_cancelled() {
        let state = AtomicUsize::new(TERMINATING);
        let mut sources: Vec<Box<dyn Source>> = Vec::new();
        let mut sink: Vec<TimeSeriesRow> = Vec::new();

        let rows = sample(
            &mut sources,
            &mut sink,
            Duration::from_millis(1),
            None,
            &state,
        )
        .unwrap();

        assert_eq!(rows, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn write_failure_is_fatal() {
        let state = AtomicUsize::new(RUNNING);
        let mut sources: Vec<Box<dyn Source>> = Vec::new();

        let result = sample(
            &mut sources,
            &mut Broken,
            Duration::from_millis(1),
            None,
            &state,
        );

        assert!(result.is_err());
    }

    #[test]
    fn records_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        let state = Arc::new(AtomicUsize::new(RUNNING));
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(StopAfter {
            seen: 0,
            limit: 4,
            state: state.clone(),
        })];

        let mut store = CsvStore::create(&path).unwrap();
        let rows = sample(
            &mut sources,
            &mut store,
            Duration::from_millis(2),
            None,
            &state,
        )
        .unwrap();
        drop(store);

        assert_eq!(rows, 4);

        let result = estimate_file(&path, TIMESTAMP, GPU_POWER).unwrap();
        assert_eq!(result.sample_count, 4);
        // 100W over the recorded span
        let expected = 100.0 * result.duration_seconds;
        assert!((result.energy_joules - expected).abs() < 1e-9);
    }
}
