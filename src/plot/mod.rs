//! Charts for a recording.
//!
//! Each chart is an SVG line plot of one or more columns against the time
//! elapsed since the first sample. Charts whose columns hold no values at all
//! are skipped; a chart that fails to render is logged and the rest are still
//! drawn.

use crate::*;

use crate::series::Recording;

use anyhow::Context;
use chrono::NaiveDateTime;
use plotters::prelude::*;

/// Subdirectory of the output directory the charts are written to.
pub const DIRECTORY: &str = "plots";

pub struct Config {
    csv: PathBuf,
    output: PathBuf,
    verbose: u8,
    config: crate::config::Config,
}

impl TryFrom<ArgMatches> for Config {
    type Error = crate::config::ConfigError;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let config = crate::config::Config::from_args(&args)?;

        config.check()?;

        let csv = args
            .get_one::<PathBuf>("CSV")
            .cloned()
            .unwrap_or_else(|| config.general().output().join(recorder::FILENAME));

        let output = match args.get_one::<PathBuf>("OUTPUT") {
            Some(output) => output.clone(),
            None => csv
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DIRECTORY),
        };

        Ok(Config {
            csv,
            output,
            verbose: args.get_count("VERBOSE"),
            config,
        })
    }
}

pub fn command() -> Command {
    Command::new("plot")
        .about("Render charts for a recording")
        .arg(
            clap::Arg::new("CSV")
                .help("Recording to plot [default: <output>/system_metrics.csv]")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(common::verbose_arg())
        .arg(common::config_arg())
        .arg(
            clap::Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Directory for the charts [default: plots/ next to the CSV]")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
}

pub fn run(config: Config) {
    common::configure_logging(common::log_level(
        config.config.log().level(),
        config.verbose,
    ));

    let recording = match series::read_all(&config.csv) {
        Ok(recording) => recording,
        Err(e) => crate::exit_with(e),
    };

    if recording.is_empty() {
        crate::exit_with(format!("{} has no data to plot", config.csv.display()));
    }

    match render(&recording, &config.output, config.config.plot()) {
        Ok(charts) => {
            for chart in charts {
                println!("{}", chart.display());
            }
        }
        Err(e) => crate::exit_with(format!("{e:#}")),
    }
}

#[derive(Clone, Copy)]
enum Unit {
    Percentage,
    Watts,
}

struct Series {
    column: &'static str,
    label: &'static str,
    color: RGBColor,
}

struct Chart {
    title: &'static str,
    file: &'static str,
    unit: Unit,
    series: &'static [Series],
}

static CHARTS: &[Chart] = &[
    Chart {
        title: "CPU and RAM Usage",
        file: "cpu_ram_usage.svg",
        unit: Unit::Percentage,
        series: &[
            Series {
                column: series::CPU_USAGE,
                label: "CPU",
                color: BLUE,
            },
            Series {
                column: series::RAM_USAGE,
                label: "RAM",
                color: GREEN,
            },
        ],
    },
    Chart {
        title: "GPU Power",
        file: "gpu_power.svg",
        unit: Unit::Watts,
        series: &[Series {
            column: series::GPU_POWER,
            label: "GPU Power",
            color: RED,
        }],
    },
    Chart {
        title: "VRAM Usage",
        file: "vram_usage.svg",
        unit: Unit::Percentage,
        series: &[Series {
            column: series::VRAM_USAGE,
            label: "VRAM",
            color: MAGENTA,
        }],
    },
    Chart {
        title: "GPU Usage",
        file: "gpu_usage.svg",
        unit: Unit::Percentage,
        series: &[Series {
            column: series::GPU_USAGE,
            label: "GPU",
            color: CYAN,
        }],
    },
];

/// Points of one series, as (seconds since `origin`, value), in time order.
type Points = Vec<(f64, f64)>;

/// Plot the recording at `csv` into `directory`. Never fails: a missing or
/// empty recording, or a chart that cannot be drawn, is logged.
pub fn render_file(
    csv: &Path,
    directory: &Path,
    settings: &crate::config::Plot,
) -> Vec<PathBuf> {
    let recording = match series::read_all(csv) {
        Ok(recording) => recording,
        Err(e) => {
            warn!("no charts: {e}");
            return Vec::new();
        }
    };

    if recording.is_empty() {
        info!("{} is empty, there is nothing to plot", csv.display());
        return Vec::new();
    }

    match render(&recording, directory, settings) {
        Ok(charts) => charts,
        Err(e) => {
            warn!("no charts: {e:#}");
            Vec::new()
        }
    }
}

/// Draw every chart with data into `directory` and return the files written.
pub fn render(
    recording: &Recording,
    directory: &Path,
    settings: &crate::config::Plot,
) -> anyhow::Result<Vec<PathBuf>> {
    let timestamp = recording
        .column(series::TIMESTAMP)
        .with_context(|| format!("recording has no '{}' column", series::TIMESTAMP))?;

    let times: Vec<Option<NaiveDateTime>> = recording
        .values(timestamp)
        .map(|v| v.and_then(series::parse_timestamp))
        .collect();

    let origin = times
        .iter()
        .flatten()
        .min()
        .copied()
        .context("recording has no valid timestamps")?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("could not create {}", directory.display()))?;

    let mut written = Vec::new();

    for chart in CHARTS {
        let lines: Vec<(&Series, Points)> = chart
            .series
            .iter()
            .filter_map(|s| {
                let column = recording.column(s.column)?;
                let points = points(recording, column, &times, origin);
                (!points.is_empty()).then_some((s, points))
            })
            .collect();

        if lines.is_empty() {
            info!("no data for {}, skipping {}", chart.title, chart.file);
            continue;
        }

        let path = directory.join(chart.file);

        match draw(chart, &lines, &path, settings) {
            Ok(()) => {
                info!("chart saved to {}", path.display());
                written.push(path);
            }
            Err(e) => warn!("failed to draw {}: {e:#}", path.display()),
        }
    }

    Ok(written)
}

fn points(
    recording: &Recording,
    column: usize,
    times: &[Option<NaiveDateTime>],
    origin: NaiveDateTime,
) -> Points {
    let mut points: Points = recording
        .values(column)
        .zip(times)
        .filter_map(|(value, time)| {
            let value = value.and_then(series::parse_value)?;
            let elapsed = (*time)? - origin;
            Some((elapsed.num_milliseconds() as f64 / 1000.0, value))
        })
        .collect();

    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    points
}

fn draw(
    chart: &Chart,
    lines: &[(&Series, Points)],
    path: &Path,
    settings: &crate::config::Plot,
) -> anyhow::Result<()> {
    let end = lines
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(x, _)| *x))
        .fold(0.0, f64::max);

    // a single sample still gets a visible x axis
    let x_range = 0.0..if end > 0.0 { end } else { 1.0 };

    let (y_range, y_label) = match chart.unit {
        Unit::Percentage => (0.0..100.0, "Usage (%)"),
        Unit::Watts => {
            let peak = lines
                .iter()
                .flat_map(|(_, points)| points.iter().map(|(_, y)| *y))
                .fold(0.0, f64::max);
            (0.0..if peak > 0.0 { peak * 1.1 } else { 1.0 }, "Power (W)")
        }
    };

    let size = (settings.width(), settings.height());
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut context = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    context
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(y_label)
        .draw()?;

    for (series, points) in lines {
        let color = series.color;

        context
            .draw_series(LineSeries::new(
                points.iter().copied(),
                color.stroke_width(2),
            ))?
            .label(series.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    context
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;

    Ok(())
}
