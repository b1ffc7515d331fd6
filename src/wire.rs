//! Current-carrying wires discretized into straight elements.

pub mod presets;

use crate::{
    field::ffl,
    geometry::{Point3, Vec3},
};
use thiserror::Error;

/// Largest number of elements a single wire may be sliced into.
pub const MAX_WIRE_ELEMENTS: usize = 1 << 24;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// A straight piece of wire carrying the full wire current.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct WireElement {
    /// Position halfway along the element.
    pub midpoint: Point3<ffl>,
    /// Vector from the start to the end of the element.
    pub direction: Vec3<ffl>,
}

impl WireElement {
    /// Creates the element going from `start` to `end`.
    pub fn between(start: &Point3<ffl>, end: &Point3<ffl>) -> Self {
        Self {
            midpoint: start.midpoint_with(end),
            direction: *end - *start,
        }
    }

    /// Returns the length of the element.
    pub fn length(&self) -> ffl {
        self.direction.length()
    }
}

/// Defines the properties of a wire that can act as the source of a magnetic field.
pub trait Wire: Sync {
    /// Returns the ordered elements making up the discretized wire.
    fn elements(&self) -> &[WireElement];

    /// Returns the direct current through the wire [A].
    fn dc(&self) -> ffl;

    /// Returns the number of elements making up the discretized wire.
    fn number_of_elements(&self) -> usize {
        self.elements().len()
    }
}

/// Errors encountered when constructing a wire.
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("A wire needs at least two points, got {0}")]
    TooFewPoints(usize),
    #[error("Slicer limit must be finite and positive, got {0}")]
    InvalidSlicerLimit(ffl),
    #[error("Wire current must be finite, got {0}")]
    InvalidCurrent(ffl),
    #[error("Wire points must be finite")]
    NonFinitePoint,
    #[error("All wire segments have zero length")]
    Degenerate,
    #[error("Slicing would produce {n_elements} elements, more than the limit of {limit}")]
    TooManyElements { n_elements: ffl, limit: usize },
}

/// Wire following a polyline through a list of points.
///
/// Each polyline segment is sliced into equally long elements no longer
/// than the slicer limit.
#[derive(Clone, Debug)]
pub struct PolylineWire {
    points: Vec<Point3<ffl>>,
    closed: bool,
    slicer_limit: ffl,
    dc: ffl,
    elements: Vec<WireElement>,
}

impl PolylineWire {
    /// Creates a new polyline wire.
    ///
    /// # Parameters
    ///
    /// - `points`: Ordered points the wire passes through.
    /// - `closed`: Whether the last point connects back to the first.
    /// - `slicer_limit`: Maximum length of a single wire element.
    /// - `dc`: Direct current through the wire [A]. May be negative.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains a new `PolylineWire`.
    /// - `Err`: Contains a `WireError` describing why the wire is invalid.
    pub fn new(
        points: Vec<Point3<ffl>>,
        closed: bool,
        slicer_limit: ffl,
        dc: ffl,
    ) -> Result<Self, WireError> {
        if points.len() < 2 {
            return Err(WireError::TooFewPoints(points.len()));
        }
        if !(slicer_limit.is_finite() && slicer_limit > 0.0) {
            return Err(WireError::InvalidSlicerLimit(slicer_limit));
        }
        if !dc.is_finite() {
            return Err(WireError::InvalidCurrent(dc));
        }
        if !points.iter().all(|point| point.to_vec3().is_finite()) {
            return Err(WireError::NonFinitePoint);
        }
        let n_elements: ffl = Self::segments(&points, closed)
            .map(|(start, end)| Self::element_count(&(end - start), slicer_limit))
            .sum();
        if n_elements > MAX_WIRE_ELEMENTS as ffl {
            return Err(WireError::TooManyElements {
                n_elements,
                limit: MAX_WIRE_ELEMENTS,
            });
        }
        let elements = Self::slice(&points, closed, slicer_limit);
        if elements.is_empty() {
            return Err(WireError::Degenerate);
        }
        Ok(Self {
            points,
            closed,
            slicer_limit,
            dc,
            elements,
        })
    }

    /// Returns the points the wire passes through.
    pub fn points(&self) -> &[Point3<ffl>] {
        &self.points
    }

    /// Whether the last point connects back to the first.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the maximum element length.
    pub fn slicer_limit(&self) -> ffl {
        self.slicer_limit
    }

    /// Computes the total length of the wire.
    pub fn length(&self) -> ffl {
        self.elements.iter().map(WireElement::length).sum()
    }

    /// Returns a copy of the wire carrying a different current.
    pub fn with_dc(mut self, dc: ffl) -> Result<Self, WireError> {
        if !dc.is_finite() {
            return Err(WireError::InvalidCurrent(dc));
        }
        self.dc = dc;
        Ok(self)
    }

    fn segments(
        points: &[Point3<ffl>],
        closed: bool,
    ) -> impl Iterator<Item = (Point3<ffl>, Point3<ffl>)> + '_ {
        let closing_segment = if closed {
            Some((points[points.len() - 1], points[0]))
        } else {
            None
        };
        points
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing_segment)
    }

    fn element_count(segment: &Vec3<ffl>, slicer_limit: ffl) -> ffl {
        let length = segment.length();
        if length > 0.0 {
            (length / slicer_limit).ceil().max(1.0)
        } else {
            0.0
        }
    }

    fn slice(points: &[Point3<ffl>], closed: bool, slicer_limit: ffl) -> Vec<WireElement> {
        Self::segments(points, closed)
            .flat_map(|(start, end)| {
                let segment = end - start;
                let n_elements = Self::element_count(&segment, slicer_limit) as usize;
                let step = if n_elements > 0 {
                    segment / (n_elements as ffl)
                } else {
                    Vec3::zero()
                };
                (0..n_elements).map(move |idx| {
                    let element_start = start + step * (idx as ffl);
                    WireElement::between(&element_start, &(element_start + step))
                })
            })
            .collect()
    }
}

impl Wire for PolylineWire {
    fn elements(&self) -> &[WireElement] {
        &self.elements
    }

    fn dc(&self) -> ffl {
        self.dc
    }
}
