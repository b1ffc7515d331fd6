//! Sample points given explicitly or read from an input file.

use super::{verify_permeabilities, SamplingError, SamplingVolume};
use crate::{field::ffl, geometry::Point3, io::utils};
use std::{
    io::{self, BufRead},
    path::Path,
};

/// Sampling volume consisting of an arbitrary list of points.
#[derive(Clone, Debug)]
pub struct ManualSamplingVolume {
    points: Vec<Point3<ffl>>,
    permeabilities: Vec<ffl>,
}

impl ManualSamplingVolume {
    /// Creates a new sampling volume from the given points and aligned
    /// relative permeabilities.
    pub fn new(points: Vec<Point3<ffl>>, permeabilities: Vec<ffl>) -> Result<Self, SamplingError> {
        if points.len() != permeabilities.len() {
            return Err(SamplingError::LengthMismatch {
                points: points.len(),
                permeabilities: permeabilities.len(),
            });
        }
        verify_permeabilities(&permeabilities)?;
        Ok(Self {
            points,
            permeabilities,
        })
    }

    /// Creates a new sampling volume from the given points, with unit
    /// relative permeability everywhere.
    pub fn in_vacuum(points: Vec<Point3<ffl>>) -> Self {
        let permeabilities = vec![1.0; points.len()];
        Self {
            points,
            permeabilities,
        }
    }

    /// Creates a new sampling volume with points read from an input file.
    ///
    /// The input file is assumed to be in CSV format, with each line consisting
    /// of the three comma-separated coordinates of a single sample point, optionally
    /// followed by the relative permeability at that point. Empty lines and lines
    /// starting with `#` are ignored.
    ///
    /// # Parameters
    ///
    /// - `input_file_path`: Path to the input file.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains a new `ManualSamplingVolume`.
    /// - `Err`: Contains an error encountered while trying to open or parse the input file.
    pub fn from_csv_file(input_file_path: &Path) -> Result<Self, SamplingError> {
        let file = utils::open_file_and_map_err(input_file_path)?;
        Self::from_csv_reader(io::BufReader::new(file))
    }

    /// Creates a new sampling volume with points read from CSV formatted text.
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self, SamplingError> {
        let mut points = Vec::new();
        let mut permeabilities = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }
            let values = trimmed_line
                .split(',')
                .map(|value_str| {
                    value_str.trim().parse::<ffl>().map_err(|err| {
                        SamplingError::Parse(format!(
                            "Invalid number {} in line {}: {}",
                            value_str, line, err
                        ))
                    })
                })
                .collect::<Result<Vec<ffl>, _>>()?;

            match values.len() {
                3 | 4 => {
                    points.push(Point3::new(values[0], values[1], values[2]));
                    permeabilities.push(values.get(3).copied().unwrap_or(1.0));
                }
                n => {
                    return Err(SamplingError::Parse(format!(
                        "Expected 3 or 4 values but got {} in line {}",
                        n, line
                    )))
                }
            }
        }
        Self::new(points, permeabilities)
    }
}

impl SamplingVolume for ManualSamplingVolume {
    fn points(&self) -> &[Point3<ffl>] {
        &self.points
    }

    fn permeabilities(&self) -> &[ffl] {
        &self.permeabilities
    }
}
