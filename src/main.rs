use backtrace::Backtrace;
use clap::{value_parser, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

mod common;
mod config;
mod estimate;
mod estimator;
mod plot;
mod recorder;
mod report;
mod samplers;
mod series;

/// Process-wide run state flipped by the ctrl-c handler and observed by the
/// sampling loop at tick boundaries.
static STATE: AtomicUsize = AtomicUsize::new(RUNNING);

const RUNNING: usize = 0;
const TERMINATING: usize = 1;

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    // parse command line options
    let matches = Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "powertrace records CPU, memory and GPU utilization to a CSV file and \
            estimates the energy consumed by the GPU from the recorded power draw.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(recorder::command())
        .subcommand(estimate::command())
        .subcommand(plot::command())
        .get_matches();

    match matches.subcommand() {
        Some(("record", args)) => match recorder::Config::try_from(args.clone()) {
            Ok(config) => recorder::run(config),
            Err(error) => exit_with(error),
        },
        Some(("estimate", args)) => match estimate::Config::try_from(args.clone()) {
            Ok(config) => estimate::run(config),
            Err(error) => exit_with(error),
        },
        Some(("plot", args)) => match plot::Config::try_from(args.clone()) {
            Ok(config) => plot::run(config),
            Err(error) => exit_with(error),
        },
        _ => unreachable!("subcommand is required"),
    }
}

fn exit_with(error: impl std::fmt::Display) -> ! {
    eprintln!("error: {error}");
    std::process::exit(1);
}
