//! Function for running the command line program.

use super::{backends::run_backends_subcommand, build, compute::run_compute_subcommand};
use crate::field::backend::InterruptionFlag;
use lazy_static::lazy_static;
use std::{ffi::OsString, time::Instant};
use tracing_subscriber::{fmt, EnvFilter};

lazy_static! {
    /// Set when the user presses Ctrl-C.
    static ref INTERRUPTION: InterruptionFlag = install_interruption_handler();
}

fn install_interruption_handler() -> InterruptionFlag {
    let interruption = InterruptionFlag::new();
    let handle = interruption.clone();
    if let Err(err) = ctrlc::set_handler(move || handle.interrupt()) {
        tracing::warn!("Could not install interruption handler: {}", err);
    }
    interruption
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Fails if a subscriber is already installed, which is fine.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs the `magfield` command line program.
pub fn run() {
    run_with_args(std::env::args_os());
}

/// Runs the `magfield` command line program with the given arguments,
/// where the first argument is the program name.
pub fn run_with_args<I, T>(args: I)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let command = build::build();

    let arguments = command.get_matches_from(args);

    init_logging(arguments.value_of("log-level").unwrap_or("warn"));

    let start_instant = Instant::now();

    if let Some(compute_arguments) = arguments.subcommand_matches("compute") {
        INTERRUPTION.reset();
        run_compute_subcommand(compute_arguments, &INTERRUPTION);
    }
    if let Some(backends_arguments) = arguments.subcommand_matches("backends") {
        run_backends_subcommand(backends_arguments);
    }

    if arguments.is_present("timing") {
        println!("Elapsed time: {} s", start_instant.elapsed().as_secs_f64());
    }
}
