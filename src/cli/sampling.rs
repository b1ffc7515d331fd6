//! Command line arguments for choosing where the field is sampled.

use super::utils;
use crate::{
    exit_on_error,
    field::ffl,
    io::Verbosity,
    sampling::{manual::ManualSamplingVolume, regular::RegularSamplingVolume, SamplingVolume},
    wire::Wire,
};
use clap::{Arg, ArgMatches};
use std::path::Path;

/// Returns the arguments specifying the sampling volume.
pub fn sampling_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("points-file")
            .long("points-file")
            .require_equals(true)
            .value_name("PATH")
            .help(
                "CSV file with a line of x,y,z[,permeability] for each sample point\n\
                 [default: regular grid around the wire]",
            )
            .takes_value(true),
        Arg::new("resolution")
            .short('r')
            .long("resolution")
            .require_equals(true)
            .value_name("NUMBER")
            .help("Number of grid points per unit length")
            .takes_value(true)
            .conflicts_with("points-file")
            .default_value("2"),
        Arg::new("padding")
            .long("padding")
            .require_equals(true)
            .value_name("LENGTH")
            .help("Distance between the wire and the boundaries of the grid")
            .takes_value(true)
            .conflicts_with("points-file")
            .default_value("1"),
        Arg::new("permeability")
            .long("permeability")
            .require_equals(true)
            .value_name("VALUE")
            .help("Uniform relative permeability at the grid points")
            .takes_value(true)
            .conflicts_with("points-file")
            .default_value("1"),
    ]
}

/// Creates the sampling volume specified by the given arguments.
pub fn construct_sampling_volume_from_arguments<W: Wire>(
    arguments: &ArgMatches,
    wire: &W,
    verbosity: &Verbosity,
) -> Box<dyn SamplingVolume> {
    if let Some(points_file_path) = arguments.value_of("points-file") {
        if verbosity.print_messages() {
            println!("Reading sample points from {}", points_file_path);
        }
        Box::new(exit_on_error!(
            ManualSamplingVolume::from_csv_file(Path::new(points_file_path)),
            "Error: Could not read sample points: {}"
        ))
    } else {
        let resolution: ffl =
            utils::get_positive_float_value_from_required_parseable_argument(arguments, "resolution");
        let padding: ffl =
            utils::get_finite_float_value_from_required_parseable_argument(arguments, "padding");
        let permeability: ffl = utils::get_positive_float_value_from_required_parseable_argument(
            arguments,
            "permeability",
        );
        let volume = exit_on_error!(
            RegularSamplingVolume::around_wire(wire, padding, resolution)
                .and_then(|volume| volume.with_permeability(|_| permeability)),
            "Error: Could not create sampling grid: {}"
        );
        if verbosity.print_messages() {
            println!(
                "Sampling on {} grid spanning {} to {}",
                volume.shape(),
                volume.lower_bounds(),
                volume.upper_bounds()
            );
        }
        Box::new(volume)
    }
}
