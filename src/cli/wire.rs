//! Command line arguments for choosing the wire.

use super::utils;
use crate::{
    exit_on_error,
    field::ffl,
    wire::{presets, PolylineWire},
};
use clap::{Arg, ArgMatches};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WireShape {
    Line,
    Square,
    Circle,
    Solenoid,
}

const WIRE_SHAPE_NAMES: [&str; 4] = ["line", "square", "circle", "solenoid"];
const WIRE_SHAPES: [WireShape; 4] = [
    WireShape::Line,
    WireShape::Square,
    WireShape::Circle,
    WireShape::Solenoid,
];

/// Returns the arguments specifying the wire.
pub fn wire_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("wire")
            .short('w')
            .long("wire")
            .require_equals(true)
            .value_name("SHAPE")
            .help("Shape of the wire")
            .takes_value(true)
            .possible_values(WIRE_SHAPE_NAMES)
            .default_value("circle"),
        Arg::new("wire-size")
            .long("wire-size")
            .require_equals(true)
            .value_name("LENGTH")
            .help(
                "Length of a straight wire, side length of a square loop\n\
                 or radius of a circular loop or solenoid",
            )
            .takes_value(true)
            .default_value("5"),
        Arg::new("solenoid-length")
            .long("solenoid-length")
            .require_equals(true)
            .value_name("LENGTH")
            .help("Extent of the solenoid along its axis")
            .takes_value(true)
            .default_value("20"),
        Arg::new("turns")
            .long("turns")
            .require_equals(true)
            .value_name("NUMBER")
            .help("Number of windings of the solenoid")
            .takes_value(true)
            .default_value("10"),
        Arg::new("corners")
            .long("corners")
            .require_equals(true)
            .value_name("NUMBER")
            .help("Number of polygon corners per circular loop or solenoid winding")
            .takes_value(true)
            .default_value("64"),
        Arg::new("slicer-limit")
            .long("slicer-limit")
            .require_equals(true)
            .value_name("LENGTH")
            .help("Maximum length of a single wire element")
            .takes_value(true)
            .default_value("0.5"),
        Arg::new("current")
            .short('I')
            .long("current")
            .require_equals(true)
            .allow_hyphen_values(true)
            .value_name("AMPERES")
            .help("Direct current through the wire")
            .takes_value(true)
            .default_value("1"),
    ]
}

/// Creates the wire specified by the given arguments.
pub fn construct_wire_from_arguments(arguments: &ArgMatches) -> PolylineWire {
    let shape = utils::get_value_from_required_constrained_argument(
        arguments,
        "wire",
        &WIRE_SHAPE_NAMES,
        &WIRE_SHAPES,
    );
    let size: ffl =
        utils::get_positive_float_value_from_required_parseable_argument(arguments, "wire-size");
    let slicer_limit: ffl =
        utils::get_positive_float_value_from_required_parseable_argument(arguments, "slicer-limit");
    let dc: ffl = utils::get_finite_float_value_from_required_parseable_argument(arguments, "current");
    let n_corners: usize = utils::get_value_from_required_parseable_argument(arguments, "corners");

    let wire = match shape {
        WireShape::Line => presets::straight_line(size, slicer_limit, dc),
        WireShape::Square => presets::square_loop(size, slicer_limit, dc),
        WireShape::Circle => presets::circular_loop(size, n_corners, slicer_limit, dc),
        WireShape::Solenoid => {
            let length: ffl = utils::get_positive_float_value_from_required_parseable_argument(
                arguments,
                "solenoid-length",
            );
            let n_turns: usize = utils::get_value_from_required_parseable_argument(arguments, "turns");
            presets::solenoid(size, length, n_turns, n_corners, slicer_limit, dc)
        }
    };
    exit_on_error!(wire, "Error: Could not create wire: {}")
}
