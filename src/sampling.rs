//! Sets of points where the magnetic field is sampled.

pub mod manual;
pub mod regular;

use crate::{field::ffl, geometry::Point3};
use std::io;
use thiserror::Error;

/// Defines the properties of a volume of sample points.
///
/// The permeabilities are aligned with the points: entry `i` holds the
/// relative permeability at point `i`.
pub trait SamplingVolume: Sync {
    /// Returns the ordered sample points.
    fn points(&self) -> &[Point3<ffl>];

    /// Returns the relative permeability at each sample point.
    fn permeabilities(&self) -> &[ffl];

    /// Returns the number of sample points.
    fn points_count(&self) -> usize {
        self.points().len()
    }
}

/// Errors encountered when constructing a sampling volume.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Got {points} points but {permeabilities} permeabilities")]
    LengthMismatch {
        points: usize,
        permeabilities: usize,
    },
    #[error("Relative permeability must be finite and positive, got {value} at point {index}")]
    InvalidPermeability { index: usize, value: ffl },
    #[error("Resolution must be finite and positive, got {0}")]
    InvalidResolution(ffl),
    #[error("Resolution {0} gives more sample points than can be stored")]
    TooManyPoints(ffl),
    #[error("Lower bounds {lower} exceed upper bounds {upper}")]
    InvalidBounds {
        lower: Point3<ffl>,
        upper: Point3<ffl>,
    },
    #[error("Failed parsing sample points: {0}")]
    Parse(String),
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Checks that every permeability is finite and strictly positive.
pub fn verify_permeabilities(permeabilities: &[ffl]) -> Result<(), SamplingError> {
    match permeabilities
        .iter()
        .enumerate()
        .find(|(_, &value)| !(value.is_finite() && value > 0.0))
    {
        Some((index, &value)) => Err(SamplingError::InvalidPermeability { index, value }),
        None => Ok(()),
    }
}
