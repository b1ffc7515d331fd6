//! The `magfield` crate computes magnetic fields of current-carrying wires
//! with the Biot-Savart law, on multithreaded CPUs or on the GPU.

pub mod constants;
pub mod error;
pub mod field;
pub mod geometry;
pub mod io;
pub mod num;
pub mod sampling;
pub mod wire;

#[cfg(feature = "cli")]
pub mod cli;
