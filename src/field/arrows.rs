//! Line geometry for drawing field vectors as arrows.

use super::ffl;
use crate::geometry::{Point3, Vec3};
use rayon::prelude::*;
use thiserror::Error;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Arrow primitives for a set of field vectors.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct ArrowGeometry {
    /// Start and end point of every arrow, stored consecutively.
    pub line_pairs: Vec<Point3<ffl>>,
    /// Point where the head of every arrow is drawn.
    pub head_points: Vec<Point3<ffl>>,
}

impl ArrowGeometry {
    /// Returns the number of arrows.
    pub fn number_of_arrows(&self) -> usize {
        self.head_points.len()
    }
}

/// Errors encountered when computing arrow geometry.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ArrowError {
    #[error("Got {points} points but {vectors} vectors")]
    LengthMismatch { points: usize, vectors: usize },
    #[error("Magnitude limit must be finite and positive, got {0}")]
    InvalidMagnitudeLimit(ffl),
}

/// Computes one arrow per sample point.
///
/// Each arrow is centered on its point and has length `arrow_scale / 2`
/// when the vector magnitude is at least `magnitude_limit`. Shorter vectors
/// give proportionally shorter arrows. The head sits at the end point.
///
/// # Parameters
///
/// - `points`: Sample points where the arrows are placed.
/// - `vectors`: Field vector at each sample point.
/// - `arrow_scale`: Scale of the arrows in the units of the points.
/// - `magnitude_limit`: Smallest magnitude used when normalizing the vectors.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains the computed `ArrowGeometry`.
/// - `Err`: Contains an `ArrowError` if the inputs are inconsistent.
pub fn compute_arrows(
    points: &[Point3<ffl>],
    vectors: &[Vec3<ffl>],
    arrow_scale: ffl,
    magnitude_limit: ffl,
) -> Result<ArrowGeometry, ArrowError> {
    if points.len() != vectors.len() {
        return Err(ArrowError::LengthMismatch {
            points: points.len(),
            vectors: vectors.len(),
        });
    }
    if !(magnitude_limit.is_finite() && magnitude_limit > 0.0) {
        return Err(ArrowError::InvalidMagnitudeLimit(magnitude_limit));
    }

    let mut line_pairs = vec![Point3::origin(); 2 * points.len()];
    let mut head_points = vec![Point3::origin(); points.len()];

    line_pairs
        .par_chunks_mut(2)
        .zip(head_points.par_iter_mut())
        .zip(points.par_iter().zip(vectors.par_iter()))
        .for_each(|((line_pair, head_point), (point, vector))| {
            let offset = *vector * (0.25 * arrow_scale / vector.length().max(magnitude_limit));
            let start = *point + offset;
            let end = *point - offset;
            line_pair[0] = start;
            line_pair[1] = end;
            *head_point = end;
        });

    Ok(ArrowGeometry {
        line_pairs,
        head_points,
    })
}
