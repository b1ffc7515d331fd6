#![allow(dead_code)]

use lazy_static::lazy_static;
use magfield::{exit_on_error, io::utils as io_utils};
use std::{
    ffi::OsString,
    io::{self, BufRead},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

#[macro_export]
macro_rules! def_test {
    (
        IN[$($in_ident:ident = $in_str:expr),*]
        OUT[$($out_ident:ident = $out_str:expr),*]
        fn $name:ident $test_body:expr
    ) => {
        #[test]
        fn $name() {
            let test = common::Test::new();

            $( let $in_ident = test.input_path($in_str); )*
            $( let $out_ident = test.output_path($out_str); )*

            let test_body = |$( $in_ident, )* $( $out_ident, )*| $test_body;

            test_body(
                $( path_str!($in_ident), )* $( path_str!($out_ident), )*
            );
        }
    };
}

#[macro_export]
macro_rules! path_str {
    ($path:expr) => {
        $path.to_string_lossy().as_ref()
    };
}

/// Runs the command line program with the given arguments, excluding the
/// program name.
pub fn run<I, T>(args: I)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    magfield::cli::run::run_with_args(
        std::iter::once(OsString::from("magfield")).chain(args.into_iter().map(Into::into)),
    );
}

pub fn assert_file_exists<P: AsRef<Path>>(file_path: P) {
    let file_path = file_path.as_ref();
    assert!(
        file_path.exists(),
        "File {} does not exist",
        file_path.to_string_lossy()
    );
}

/// Reads the non-comment lines of the given CSV file, split into values.
pub fn read_csv_rows<P: AsRef<Path>>(file_path: P) -> Vec<Vec<f64>> {
    let file_path = file_path.as_ref();
    exit_on_error!(
        read_csv_rows_or_err(file_path),
        "Error: Could not read {0}: {1}",
        file_path.to_string_lossy()
    )
}

fn read_csv_rows_or_err(file_path: &Path) -> io::Result<Vec<Vec<f64>>> {
    let file = io_utils::open_file_and_map_err(file_path)?;
    let mut rows = Vec::new();
    for line in io::BufReader::new(file).lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
            })
            .collect::<io::Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Working area of a single test. Output files live in a temporary
/// directory that is removed when the test ends.
#[derive(Debug)]
pub struct Test {
    output_dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let output_dir = exit_on_error!(
            tempfile::tempdir(),
            "Error: Could not create output directory: {}"
        );
        Self { output_dir }
    }

    pub fn input_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        BASE_INPUT_DIR.join(file_name.as_ref())
    }

    pub fn output_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.output_dir.path().join(file_name.as_ref())
    }
}

lazy_static! {
    static ref BASE_INPUT_DIR: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", "input"]
        .iter()
        .collect();
}
