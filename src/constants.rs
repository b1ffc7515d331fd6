//! Physical constants and unit conversion factors.

/// Floating-point precision to use for constants.
#[allow(non_camel_case_types)]
pub type fcn = f64;

// Physical constants

/// Vacuum permeability [H/m].
pub const MU_0: fcn = 4.0 * std::f64::consts::PI * 1e-7;
/// Prefactor of the Biot-Savart integral, μ₀/4π [H/m].
pub const MU_0_OVER_4PI: fcn = 1e-7;

// Unit conversion factors

/// Conversion factor from Tesla to Gauss.
pub const TESLA_TO_GAUSS: fcn = 1e4;
/// Conversion factor from centimeters to meters.
pub const CM_TO_M: fcn = 1e-2;
