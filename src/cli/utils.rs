//! Utilities for creating the command line interface.

use crate::{
    exit_on_error, exit_on_false, exit_on_none, exit_with_error,
    io::{OverwriteMode, Verbosity},
    num::{self, BFloat},
};
use clap::{Arg, ArgMatches};
use indicatif::ProgressStyle;
use lazy_static::lazy_static;
use std::str::FromStr;

lazy_static! {
    pub static ref DEFAULT_PROGRESS_STYLE: ProgressStyle =
        ProgressStyle::with_template("Progress: {bar:40}  {percent}% | ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
}

/// Returns the arguments controlling how much is printed.
pub fn verbosity_args() -> [Arg<'static>; 2] {
    [
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Print status messages"),
        Arg::new("progress")
            .short('p')
            .long("progress")
            .help("Show progress bar (implies `verbose`)"),
    ]
}

/// Returns the arguments controlling what happens to existing output files.
pub fn overwrite_args() -> [Arg<'static>; 2] {
    [
        Arg::new("overwrite")
            .long("overwrite")
            .help("Automatically overwrite any existing files"),
        Arg::new("no-overwrite")
            .long("no-overwrite")
            .help("Do not overwrite any existing files")
            .conflicts_with("overwrite"),
    ]
}

pub fn parse_verbosity(arguments: &ArgMatches) -> Verbosity {
    if arguments.is_present("progress") {
        Verbosity::Progress(DEFAULT_PROGRESS_STYLE.clone())
    } else if arguments.is_present("verbose") {
        Verbosity::Messages
    } else {
        Verbosity::Quiet
    }
}

pub fn parse_overwrite_mode(arguments: &ArgMatches) -> OverwriteMode {
    if arguments.is_present("overwrite") {
        OverwriteMode::Always
    } else if arguments.is_present("no-overwrite") {
        OverwriteMode::Never
    } else {
        OverwriteMode::Ask
    }
}

pub fn parse_value_string<T>(argument_name: &str, value_string: &str) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    exit_on_error!(
        value_string.parse(),
        "Error: Could not parse value for {0}: {1}",
        argument_name
    )
}

pub fn get_value_from_required_parseable_argument<T>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    parse_value_string(
        argument_name,
        exit_on_none!(
            arguments.value_of(argument_name),
            "Error: No value for {}",
            argument_name
        ),
    )
}

pub fn get_value_from_parseable_argument<T>(arguments: &ArgMatches, argument_name: &str) -> Option<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    arguments
        .value_of(argument_name)
        .map(|value_string| parse_value_string(argument_name, value_string))
}

pub fn get_finite_float_value_from_required_parseable_argument<F>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> F
where
    F: BFloat + FromStr,
    <F as FromStr>::Err: std::fmt::Display,
{
    let value: F = get_value_from_required_parseable_argument(arguments, argument_name);
    exit_on_false!(value.is_finite(), "Error: {} must be finite", argument_name);
    value
}

pub fn get_positive_float_value_from_required_parseable_argument<F>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> F
where
    F: BFloat + FromStr,
    <F as FromStr>::Err: std::fmt::Display,
{
    let value: F = get_value_from_required_parseable_argument(arguments, argument_name);
    exit_on_none!(
        num::positive_finite(value),
        "Error: {} must be finite and positive, got {}",
        argument_name,
        value
    )
}

pub fn get_value_from_required_constrained_argument<T>(
    arguments: &ArgMatches,
    argument_name: &str,
    possible_value_strings: &[&str],
    possible_values: &[T],
) -> T
where
    T: Copy,
{
    let value_string = exit_on_none!(
        arguments.value_of(argument_name),
        "Error: No value for {}",
        argument_name
    );
    possible_value_strings
        .iter()
        .zip(possible_values)
        .find_map(|(&possible_value_string, &possible_value)| {
            (possible_value_string == value_string).then(|| possible_value)
        })
        .unwrap_or_else(|| {
            exit_with_error!(
                "Error: Invalid value for {}: {}",
                argument_name,
                value_string
            )
        })
}
