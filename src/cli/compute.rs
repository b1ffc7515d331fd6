//! Command line interface for computing the magnetic field of a wire.

use super::{sampling, utils, wire};
use crate::{
    exit_on_error, exit_on_none, exit_with_error,
    field::{
        arrows, backend::InterruptionFlag, ffl, BackendType, Field, FieldConfiguration, FieldType,
    },
    io::output,
    sampling::SamplingVolume,
    wire::Wire,
};
use clap::{Arg, ArgMatches, Command};
use std::path::Path;

/// Number of steps in the progress bar.
const PROGRESS_STEPS: u64 = 1000;

/// Builds a representation of the `compute` command line subcommand.
pub fn create_compute_subcommand() -> Command<'static> {
    Command::new("compute")
        .about("Compute the magnetic field of a wire")
        .long_about(
            "Compute the magnetic field of a wire.\n\
             The wire is split into short straight elements, and the Biot-Savart\n\
             contributions of all elements are summed at every sample point.\n\
             Lengths are given in the units implied by the length scale (cm by default).",
        )
        .arg(
            Arg::new("output-file")
                .value_name("OUTPUT_FILE")
                .help("Path of the output file (format given by the extension, csv or json)")
                .required(true)
                .takes_value(true),
        )
        .args(wire::wire_args())
        .args(sampling::sampling_args())
        .arg(
            Arg::new("backend")
                .short('b')
                .long("backend")
                .require_equals(true)
                .value_name("BACKEND")
                .help("Backend to compute the field with")
                .takes_value(true)
                .possible_values(BackendType::all().map(|backend_type| backend_type.name()))
                .default_value(FieldConfiguration::DEFAULT_BACKEND_TYPE.name()),
        )
        .arg(
            Arg::new("field")
                .short('f')
                .long("field")
                .require_equals(true)
                .value_name("FIELD")
                .help("Whether to compute the vector potential A or the flux density B")
                .takes_value(true)
                .possible_values(["A", "B"])
                .default_value(FieldConfiguration::DEFAULT_FIELD_TYPE.symbol()),
        )
        .arg(
            Arg::new("distance-limit")
                .long("distance-limit")
                .require_equals(true)
                .value_name("METERS")
                .help("Smallest distance between a wire element and a sample point")
                .takes_value(true)
                .default_value("1e-4"),
        )
        .arg(
            Arg::new("length-scale")
                .long("length-scale")
                .require_equals(true)
                .value_name("METERS")
                .help("Length of one coordinate unit in meters")
                .takes_value(true)
                .default_value("1e-2"),
        )
        .arg(
            Arg::new("cores")
                .short('n')
                .long("cores")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Number of worker threads for the CPU backend (0 uses all cores)")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::new("gauss")
                .short('g')
                .long("gauss")
                .help("Write values in Gauss rather than Tesla"),
        )
        .arg(
            Arg::new("arrows-file")
                .long("arrows-file")
                .require_equals(true)
                .value_name("PATH")
                .help("Also write arrow geometry for the field vectors to this CSV file")
                .takes_value(true),
        )
        .arg(
            Arg::new("arrow-scale")
                .long("arrow-scale")
                .require_equals(true)
                .value_name("LENGTH")
                .help("Scale of the arrows")
                .takes_value(true)
                .requires("arrows-file")
                .default_value("1"),
        )
        .arg(
            Arg::new("magnitude-limit")
                .long("magnitude-limit")
                .require_equals(true)
                .value_name("VALUE")
                .help(
                    "Field magnitude (in SI units) giving full-length arrows\n\
                     [default: largest magnitude in the field]",
                )
                .takes_value(true)
                .requires("arrows-file"),
        )
        .args(utils::overwrite_args())
        .args(utils::verbosity_args())
}

/// Runs the actions for the `compute` subcommand using the given arguments.
pub fn run_compute_subcommand(arguments: &ArgMatches, interruption: &InterruptionFlag) {
    let verbosity = utils::parse_verbosity(arguments);
    let overwrite_mode = utils::parse_overwrite_mode(arguments);
    let show_gauss = arguments.is_present("gauss");

    let output_file_path = Path::new(exit_on_none!(
        arguments.value_of("output-file"),
        "Error: No output file given"
    ));
    exit_on_error!(
        output::OutputFormat::from_path(output_file_path),
        "Error: {}"
    );

    let wire = wire::construct_wire_from_arguments(arguments);
    let sampling_volume =
        sampling::construct_sampling_volume_from_arguments(arguments, &wire, &verbosity);

    let configuration = FieldConfiguration {
        backend_type: utils::get_value_from_required_parseable_argument(arguments, "backend"),
        field_type: utils::get_value_from_required_parseable_argument(arguments, "field"),
        distance_limit: utils::get_positive_float_value_from_required_parseable_argument(
            arguments,
            "distance-limit",
        ),
        length_scale: utils::get_positive_float_value_from_required_parseable_argument(
            arguments,
            "length-scale",
        ),
    };
    let num_cores: usize = utils::get_value_from_required_parseable_argument(arguments, "cores");

    if verbosity.print_messages() {
        println!(
            "Computing {} for {} wire elements at {} sample points using the {} backend",
            describe_field_type(configuration.field_type),
            wire.number_of_elements(),
            sampling_volume.points_count(),
            configuration.backend_type
        );
    }

    let mut field = Field::new(configuration);
    let progress_bar = verbosity.create_progress_bar(PROGRESS_STEPS as usize);
    let result = field.recalculate(
        &wire,
        sampling_volume.as_ref(),
        &|fraction| progress_bar.set_position((fraction * PROGRESS_STEPS as ffl).round() as u64),
        interruption,
        num_cores,
    );
    progress_bar.finish_and_clear();

    match result {
        Ok(()) => {}
        Err(err) if err.is_interruption() => {
            exit_with_error!("Aborted: {}", err)
        }
        Err(err) => {
            exit_with_error!("Error: Could not compute field: {}", err)
        }
    }

    let field_result = exit_on_error!(field.result(), "Error: {}");

    if verbosity.print_messages() {
        let (unit, factor) = field.units(show_gauss);
        let (min_magnitude, max_magnitude) = exit_on_error!(field.magnitude_range(), "Error: {}");
        println!(
            "Evaluated {} element-point pairs ({} skipped)",
            field_result.total_calculations(),
            field_result.total_skipped_calculations()
        );
        println!(
            "|{}| ranges from {:e} to {:e} {}",
            field_result.field_type(),
            min_magnitude * factor,
            max_magnitude * factor,
            unit
        );
    }

    exit_on_error!(
        output::save_field(
            output_file_path,
            sampling_volume.points(),
            field_result,
            show_gauss,
            overwrite_mode,
            &verbosity,
        ),
        "Error: Could not write field: {}"
    );

    if let Some(arrows_file_path) = arguments.value_of("arrows-file") {
        let arrow_scale: ffl =
            utils::get_positive_float_value_from_required_parseable_argument(arguments, "arrow-scale");
        let magnitude_limit: ffl =
            match utils::get_value_from_parseable_argument(arguments, "magnitude-limit") {
                Some(magnitude_limit) => magnitude_limit,
                // An all-zero field still needs a positive limit.
                None => exit_on_error!(field.magnitude_range(), "Error: {}")
                    .1
                    .max(ffl::MIN_POSITIVE),
            };
        let arrows = exit_on_error!(
            arrows::compute_arrows(
                sampling_volume.points(),
                field_result.vectors(),
                arrow_scale,
                magnitude_limit,
            ),
            "Error: Could not compute arrows: {}"
        );
        exit_on_error!(
            output::save_arrows(arrows_file_path, &arrows, overwrite_mode, &verbosity),
            "Error: Could not write arrows: {}"
        );
    }
}

fn describe_field_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::VectorPotentialA => "magnetic vector potential",
        FieldType::FluxDensityB => "magnetic flux density",
    }
}
