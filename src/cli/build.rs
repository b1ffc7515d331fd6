//! Function for building the command line hierarchy.

use super::{backends::create_backends_subcommand, compute::create_compute_subcommand};
use clap::{self, Arg, Command};

/// Build the `magfield` command line hierarchy.
pub fn build() -> Command<'static> {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .disable_help_subcommand(true)
        .arg(
            Arg::new("timing")
                .short('t')
                .long("timing")
                .help("Display elapsed time when done"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .require_equals(true)
                .value_name("LEVEL")
                .help("Level of diagnostic log messages (overridden by RUST_LOG)")
                .takes_value(true)
                .possible_values(["error", "warn", "info", "debug", "trace"])
                .default_value("warn"),
        )
        .subcommand(create_compute_subcommand())
        .subcommand(create_backends_subcommand())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn command_line_hierarchy_is_consistent() {
        build().debug_assert();
    }
}
