//! Regularly spaced sample points filling an axis-aligned box.

use super::{verify_permeabilities, SamplingError, SamplingVolume};
use crate::{
    field::ffl,
    geometry::{
        Dim3::{self, X, Y, Z},
        In3D, Point3, Vec3,
    },
    wire::Wire,
};
use rayon::prelude::*;

/// Sampling volume with points on a regular grid spanning a box.
#[derive(Clone, Debug)]
pub struct RegularSamplingVolume {
    lower_bounds: Point3<ffl>,
    upper_bounds: Point3<ffl>,
    resolution: ffl,
    shape: In3D<usize>,
    points: Vec<Point3<ffl>>,
    permeabilities: Vec<ffl>,
}

impl RegularSamplingVolume {
    /// Creates a new regular sampling volume with unit relative permeability.
    ///
    /// # Parameters
    ///
    /// - `lower_bounds`: Lower corner of the box.
    /// - `upper_bounds`: Upper corner of the box.
    /// - `resolution`: Number of sample points per unit length.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains a new `RegularSamplingVolume`.
    /// - `Err`: Contains a `SamplingError` if the bounds or resolution are invalid.
    pub fn new(
        lower_bounds: Point3<ffl>,
        upper_bounds: Point3<ffl>,
        resolution: ffl,
    ) -> Result<Self, SamplingError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(SamplingError::InvalidResolution(resolution));
        }
        let extents = upper_bounds - lower_bounds;
        if !extents.is_finite() || Dim3::slice().iter().any(|&dim| extents[dim] < 0.0) {
            return Err(SamplingError::InvalidBounds {
                lower: lower_bounds,
                upper: upper_bounds,
            });
        }

        let lengths = Vec3::with_each_component(|dim| (extents[dim] * resolution).round() + 1.0);
        if Dim3::slice()
            .iter()
            .any(|&dim| lengths[dim] >= usize::MAX as ffl)
        {
            return Err(SamplingError::TooManyPoints(resolution));
        }
        let shape = In3D::with_each_component(|dim| lengths[dim] as usize);
        let n_points = shape[X]
            .checked_mul(shape[Y])
            .and_then(|n| n.checked_mul(shape[Z]))
            .ok_or(SamplingError::TooManyPoints(resolution))?;
        let spacing = Vec3::with_each_component(|dim| {
            if shape[dim] > 1 {
                extents[dim] / ((shape[dim] - 1) as ffl)
            } else {
                0.0
            }
        });

        let points = (0..n_points)
            .into_par_iter()
            .map(|idx| {
                let indices = compute_3d_indices_from_flat_idx(&shape, idx);
                Point3::with_each_component(|dim| {
                    lower_bounds[dim] + spacing[dim] * (indices[dim] as ffl)
                })
            })
            .collect();

        Ok(Self {
            lower_bounds,
            upper_bounds,
            resolution,
            shape,
            points,
            permeabilities: vec![1.0; n_points],
        })
    }

    /// Creates a new regular sampling volume enclosing the given wire
    /// with the given padding on all sides.
    pub fn around_wire<W: Wire + ?Sized>(
        wire: &W,
        padding: ffl,
        resolution: ffl,
    ) -> Result<Self, SamplingError> {
        let (lower, upper) = wire.elements().iter().fold(
            (
                Point3::with_each_component(|_| ffl::INFINITY),
                Point3::with_each_component(|_| ffl::NEG_INFINITY),
            ),
            |(lower, upper), element| {
                let half = element.direction * 0.5;
                let start = element.midpoint - half;
                let end = element.midpoint + half;
                (
                    Point3::with_each_component(|dim| lower[dim].min(start[dim]).min(end[dim])),
                    Point3::with_each_component(|dim| upper[dim].max(start[dim]).max(end[dim])),
                )
            },
        );
        let padding = Vec3::equal_components(padding.max(0.0));
        Self::new(lower - padding, upper + padding, resolution)
    }

    /// Assigns the relative permeability at every sample point by evaluating
    /// the given function.
    pub fn with_permeability<P>(mut self, permeability: P) -> Result<Self, SamplingError>
    where
        P: Fn(&Point3<ffl>) -> ffl + Sync,
    {
        let permeabilities: Vec<ffl> = self.points.par_iter().map(&permeability).collect();
        verify_permeabilities(&permeabilities)?;
        self.permeabilities = permeabilities;
        Ok(self)
    }

    /// Returns the lower corner of the box.
    pub fn lower_bounds(&self) -> &Point3<ffl> {
        &self.lower_bounds
    }

    /// Returns the upper corner of the box.
    pub fn upper_bounds(&self) -> &Point3<ffl> {
        &self.upper_bounds
    }

    /// Returns the number of sample points per unit length.
    pub fn resolution(&self) -> ffl {
        self.resolution
    }

    /// Returns the number of sample points along each dimension.
    pub fn shape(&self) -> &In3D<usize> {
        &self.shape
    }
}

impl SamplingVolume for RegularSamplingVolume {
    fn points(&self) -> &[Point3<ffl>] {
        &self.points
    }

    fn permeabilities(&self) -> &[ffl] {
        &self.permeabilities
    }
}

/// Computes the x-major 3D indices corresponding to the given flat index.
fn compute_3d_indices_from_flat_idx(shape: &In3D<usize>, idx: usize) -> In3D<usize> {
    let k = idx % shape[Z];
    let j = (idx / shape[Z]) % shape[Y];
    let i = idx / (shape[Y] * shape[Z]);
    In3D::new(i, j, k)
}
