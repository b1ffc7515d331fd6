//! Command line interface.

pub mod backends;
pub mod build;
pub mod compute;
pub mod run;
pub mod sampling;
pub mod utils;
pub mod wire;
