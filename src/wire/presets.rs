//! Commonly used wire shapes.

use super::{PolylineWire, WireError};
use crate::{field::ffl, geometry::Point3};
use std::f64::consts::PI;

/// Straight wire of the given length along the z-axis, centered on the origin.
pub fn straight_line(length: ffl, slicer_limit: ffl, dc: ffl) -> Result<PolylineWire, WireError> {
    let half_length = 0.5 * length;
    PolylineWire::new(
        vec![
            Point3::new(0.0, 0.0, -half_length),
            Point3::new(0.0, 0.0, half_length),
        ],
        false,
        slicer_limit,
        dc,
    )
}

/// Square loop with the given side length in the xy-plane, centered on the origin.
pub fn square_loop(side_length: ffl, slicer_limit: ffl, dc: ffl) -> Result<PolylineWire, WireError> {
    let h = 0.5 * side_length;
    PolylineWire::new(
        vec![
            Point3::new(-h, -h, 0.0),
            Point3::new(h, -h, 0.0),
            Point3::new(h, h, 0.0),
            Point3::new(-h, h, 0.0),
        ],
        true,
        slicer_limit,
        dc,
    )
}

/// Circular loop with the given radius in the xy-plane, centered on the origin
/// and approximated by a regular polygon with `n_corners` corners.
pub fn circular_loop(
    radius: ffl,
    n_corners: usize,
    slicer_limit: ffl,
    dc: ffl,
) -> Result<PolylineWire, WireError> {
    let points = (0..n_corners)
        .map(|idx| {
            let angle = 2.0 * PI * (idx as ffl) / (n_corners as ffl);
            Point3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect();
    PolylineWire::new(points, true, slicer_limit, dc)
}

/// Helical solenoid along the z-axis, centered on the origin.
///
/// # Parameters
///
/// - `radius`: Radius of the windings.
/// - `length`: Extent of the solenoid along the z-axis.
/// - `n_turns`: Number of windings.
/// - `points_per_turn`: Number of polyline points used for each winding.
/// - `slicer_limit`: Maximum length of a single wire element.
/// - `dc`: Direct current through the wire [A].
pub fn solenoid(
    radius: ffl,
    length: ffl,
    n_turns: usize,
    points_per_turn: usize,
    slicer_limit: ffl,
    dc: ffl,
) -> Result<PolylineWire, WireError> {
    let n_points = n_turns * points_per_turn + 1;
    let points = (0..n_points)
        .map(|idx| {
            let turns = (idx as ffl) / (points_per_turn.max(1) as ffl);
            let angle = 2.0 * PI * turns;
            let z = if n_turns > 0 {
                length * (turns / (n_turns as ffl) - 0.5)
            } else {
                0.0
            };
            Point3::new(radius * angle.cos(), radius * angle.sin(), z)
        })
        .collect();
    PolylineWire::new(points, false, slicer_limit, dc)
}
