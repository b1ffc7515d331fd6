//! Command line interface for listing the available compute backends.

use crate::field::{backend::gpu::GpuBackend, BackendType};
use clap::{ArgMatches, Command};

/// Builds a representation of the `backends` command line subcommand.
pub fn create_backends_subcommand() -> Command<'static> {
    Command::new("backends")
        .about("List the compute backends and whether they can be used")
        .long_about(
            "List the compute backends and whether they can be used.\n\
             The GPU backend requires the `gpu` feature and a compatible adapter.",
        )
}

/// Runs the actions for the `backends` subcommand.
pub fn run_backends_subcommand(_arguments: &ArgMatches) {
    for backend_type in BackendType::all() {
        let status = match (backend_type, backend_type.is_available()) {
            (_, false) => "unavailable".to_string(),
            (BackendType::Gpu, true) => format!(
                "available ({})",
                GpuBackend::adapter_name().unwrap_or_default()
            ),
            (BackendType::CpuParallel, true) => {
                format!("available ({} threads)", rayon::current_num_threads())
            }
        };
        println!("{:<6}{}", backend_type.name(), status);
    }
}
