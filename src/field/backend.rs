//! Numerical backends evaluating the discretized Biot-Savart superposition.

pub mod cpu;
pub mod gpu;

use super::{ffl, FieldType};
use crate::{
    constants::MU_0_OVER_4PI,
    geometry::{Point3, Vec3},
    wire::WireElement,
};
use atomic_counter::{AtomicCounter, RelaxedCounter};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError, TryLockError,
};
use thiserror::Error;

/// Callback receiving the completed fraction of a computation, in [0, 1].
pub type ProgressCallback<'a> = dyn Fn(ffl) + Sync + 'a;

/// Shared flag used to request that a running computation stops early.
///
/// Clones refer to the same flag, so one clone can be handed to whoever
/// should be able to interrupt while another is passed to the computation.
#[derive(Clone, Debug, Default)]
pub struct InterruptionFlag(Arc<AtomicBool>);

impl InterruptionFlag {
    /// Creates a new flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests interruption.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether interruption has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears any pending interruption request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a backend needs to compute a field.
#[derive(Clone, Copy, Debug)]
pub struct BackendInput<'a> {
    pub field_type: FieldType,
    /// Smallest distance used in the kernel [m].
    pub distance_limit: ffl,
    /// Factor converting wire and sample coordinates to meters.
    pub length_scale: ffl,
    /// Wire current [A].
    pub dc: ffl,
    pub elements: &'a [WireElement],
    pub points: &'a [Point3<ffl>],
    pub permeabilities: &'a [ffl],
}

impl<'a> BackendInput<'a> {
    /// Number of (element, point) pairs a complete run evaluates.
    pub fn expected_calculations(&self) -> u64 {
        (self.elements.len() as u64) * (self.points.len() as u64)
    }

    /// Checks the input against the requirements shared by all backends.
    pub fn verify(&self) -> Result<(), BackendError> {
        if self.elements.is_empty() {
            return Err(BackendError::InvalidInput("No wire elements".to_string()));
        }
        if self.points.is_empty() {
            return Err(BackendError::InvalidInput("No sample points".to_string()));
        }
        if self.permeabilities.len() != self.points.len() {
            return Err(BackendError::InvalidInput(format!(
                "Got {} sample points but {} permeabilities",
                self.points.len(),
                self.permeabilities.len()
            )));
        }
        if !(self.distance_limit.is_finite() && self.distance_limit > 0.0) {
            return Err(BackendError::InvalidInput(format!(
                "Distance limit must be finite and positive, got {}",
                self.distance_limit
            )));
        }
        if !(self.length_scale.is_finite() && self.length_scale > 0.0) {
            return Err(BackendError::InvalidInput(format!(
                "Length scale must be finite and positive, got {}",
                self.length_scale
            )));
        }
        if !self.dc.is_finite() {
            return Err(BackendError::InvalidInput(format!(
                "Current must be finite, got {}",
                self.dc
            )));
        }
        Ok(())
    }

    /// Factor applied to the raw kernel sum at sample point `idx`.
    pub fn prefactor(&self, idx: usize) -> ffl {
        MU_0_OVER_4PI * self.dc * self.permeabilities[idx]
    }

    /// Number of elements whose pairs are short-circuited.
    pub fn degenerate_element_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|element| element.direction.is_zero())
            .count()
    }
}

/// Result of a complete backend run.
#[derive(Clone, Debug)]
pub struct BackendOutput {
    /// Number of (element, point) pairs visited.
    pub total_calculations: u64,
    /// Number of visited pairs whose evaluation was short-circuited.
    pub total_skipped_calculations: u64,
    /// One field vector per sample point, in sample point order.
    pub vectors: Vec<Vec3<ffl>>,
}

/// Reasons a backend run did not produce a result.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Computation was interrupted")]
    Interrupted,
    #[error("Backend is unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid backend input: {0}")]
    InvalidInput(String),
    #[error("Could not set up worker threads: {0}")]
    ThreadPool(String),
    #[error("Device failure: {0}")]
    Device(String),
}

/// Defines the properties of a backend computing field vectors from wire elements.
pub trait ComputeBackend {
    /// Human readable name of the backend.
    fn name(&self) -> &'static str;

    /// Computes one field vector for every sample point.
    ///
    /// # Parameters
    ///
    /// - `input`: Field type, kernel parameters, wire elements and sample points.
    /// - `progress`: Called with the completed fraction while the computation runs.
    /// - `interruption`: Checked periodically; once set the computation is abandoned.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the vectors together with the calculation counts.
    /// - `Err`: Contains `BackendError::Interrupted` if interruption was requested,
    ///   or another `BackendError` if the computation failed.
    fn compute(
        &self,
        input: &BackendInput,
        progress: &ProgressCallback<'_>,
        interruption: &InterruptionFlag,
    ) -> Result<BackendOutput, BackendError>;
}

/// Wire element converted to meters.
#[derive(Clone, Copy, Debug)]
pub struct ScaledElement {
    pub midpoint: Vec3<ffl>,
    pub direction: Vec3<ffl>,
}

impl ScaledElement {
    /// Scales every element of the given wire with the given length scale.
    pub fn scale_all(elements: &[WireElement], length_scale: ffl) -> Vec<Self> {
        elements
            .iter()
            .map(|element| Self {
                midpoint: element.midpoint.to_vec3() * length_scale,
                direction: element.direction * length_scale,
            })
            .collect()
    }
}

/// Computes the unscaled kernel contribution of a single element at a point,
/// both given in meters.
///
/// The distance is floored at `distance_limit`, so coincident points give
/// a finite result.
#[inline]
pub fn pair_contribution(
    field_type: FieldType,
    distance_limit: ffl,
    element: &ScaledElement,
    point: &Vec3<ffl>,
) -> Vec3<ffl> {
    let displacement = *point - element.midpoint;
    let distance = displacement.length().max(distance_limit);
    match field_type {
        FieldType::VectorPotentialA => element.direction / distance,
        FieldType::FluxDensityB => {
            element.direction.cross(&displacement) / (distance * distance * distance)
        }
    }
}

/// Sums the kernel contributions of all elements at a point given in meters.
/// Elements with zero length are skipped.
#[inline]
pub fn sum_contributions(
    field_type: FieldType,
    distance_limit: ffl,
    elements: &[ScaledElement],
    point: &Vec3<ffl>,
) -> Vec3<ffl> {
    elements
        .iter()
        .filter(|element| !element.direction.is_zero())
        .fold(Vec3::zero(), |sum, element| {
            sum + pair_contribution(field_type, distance_limit, element, point)
        })
}

/// Turns per-item completions from several workers into monotonic
/// progress fractions.
///
/// Reports are serialized. A worker finding another report in progress
/// skips its own, so a slow callback delays at most one worker.
pub struct ProgressTracker<'a> {
    callback: &'a ProgressCallback<'a>,
    total: usize,
    completed: RelaxedCounter,
    last_reported: Mutex<ffl>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(callback: &'a ProgressCallback<'a>, total: usize) -> Self {
        Self {
            callback,
            total,
            completed: RelaxedCounter::new(0),
            last_reported: Mutex::new(0.0),
        }
    }

    /// Registers that `n_items` more items are done and reports the new
    /// fraction if it exceeds the last one reported.
    pub fn advance(&self, n_items: usize) {
        self.completed.add(n_items);
        let mut last_reported = match self.last_reported.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(err)) => err.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        let fraction = if self.total == 0 {
            1.0
        } else {
            ((self.completed.get() as ffl) / (self.total as ffl)).min(1.0)
        };
        if fraction > *last_reported {
            *last_reported = fraction;
            (self.callback)(fraction);
        }
    }

    /// Reports completion unless already reported.
    pub fn finish(&self) {
        let mut last_reported = self
            .last_reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last_reported < 1.0 {
            *last_reported = 1.0;
            (self.callback)(1.0);
        }
    }
}
