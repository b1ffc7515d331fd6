//! Magnetic fields recalculated from current-carrying wires.

pub mod arrows;
pub mod backend;

use crate::{
    constants::TESLA_TO_GAUSS,
    geometry::Vec3,
    sampling::SamplingVolume,
    wire::Wire,
};
use backend::{
    cpu::CpuBackend, gpu::GpuBackend, BackendError, BackendInput, BackendOutput, ComputeBackend,
    InterruptionFlag, ProgressCallback,
};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Floating-point precision to use for field computations.
#[allow(non_camel_case_types)]
pub type ffl = f64;

/// Available backends for evaluating the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum BackendType {
    CpuParallel,
    Gpu,
}

impl BackendType {
    /// Returns all backend types.
    pub fn all() -> [Self; 2] {
        [Self::CpuParallel, Self::Gpu]
    }

    /// Returns the name used for the backend on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CpuParallel => "cpu",
            Self::Gpu => "gpu",
        }
    }

    /// Whether the backend can be used in this process.
    pub fn is_available(&self) -> bool {
        match self {
            Self::CpuParallel => true,
            Self::Gpu => GpuBackend::is_available(),
        }
    }

    fn create_backend(&self, num_cores: usize) -> Box<dyn ComputeBackend> {
        match self {
            Self::CpuParallel => Box::new(CpuBackend::new(num_cores)),
            Self::Gpu => Box::new(GpuBackend::new()),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|backend_type| backend_type.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown backend type {}", s))
    }
}

/// Kinds of magnetic field that can be computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum FieldType {
    /// Magnetic vector potential A.
    VectorPotentialA,
    /// Magnetic flux density B.
    FluxDensityB,
}

impl FieldType {
    /// Returns the symbol of the field.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::VectorPotentialA => "A",
            Self::FluxDensityB => "B",
        }
    }

    /// Returns the unit label and the factor converting computed values
    /// (in SI units) into that unit.
    pub fn units(&self, show_gauss: bool) -> (&'static str, ffl) {
        match (self, show_gauss) {
            (Self::FluxDensityB, false) => ("T", 1.0),
            (Self::FluxDensityB, true) => ("Gs", TESLA_TO_GAUSS),
            (Self::VectorPotentialA, false) => ("T·m", 1.0),
            (Self::VectorPotentialA, true) => ("Gs·m", TESLA_TO_GAUSS),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Self::VectorPotentialA),
            "B" | "b" => Ok(Self::FluxDensityB),
            _ => Err(format!("Unknown field type {}", s)),
        }
    }
}

/// Parameters controlling how the field is computed.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct FieldConfiguration {
    pub backend_type: BackendType,
    pub field_type: FieldType,
    /// Smallest distance between a wire element and a sample point used
    /// in the kernel [m].
    pub distance_limit: ffl,
    /// Factor converting wire and sample coordinates to meters.
    pub length_scale: ffl,
}

impl FieldConfiguration {
    pub const DEFAULT_BACKEND_TYPE: BackendType = BackendType::CpuParallel;
    pub const DEFAULT_FIELD_TYPE: FieldType = FieldType::FluxDensityB;
    pub const DEFAULT_DISTANCE_LIMIT: ffl = 1e-4;
    pub const DEFAULT_LENGTH_SCALE: ffl = crate::constants::CM_TO_M;

    /// Checks that the numerical parameters are finite and positive.
    pub fn validate(&self) -> Result<(), RecalculationError> {
        if !(self.distance_limit.is_finite() && self.distance_limit > 0.0) {
            return Err(RecalculationError::InvalidConfiguration(format!(
                "Distance limit must be finite and positive, got {}",
                self.distance_limit
            )));
        }
        if !(self.length_scale.is_finite() && self.length_scale > 0.0) {
            return Err(RecalculationError::InvalidConfiguration(format!(
                "Length scale must be finite and positive, got {}",
                self.length_scale
            )));
        }
        Ok(())
    }
}

impl Default for FieldConfiguration {
    fn default() -> Self {
        Self {
            backend_type: Self::DEFAULT_BACKEND_TYPE,
            field_type: Self::DEFAULT_FIELD_TYPE,
            distance_limit: Self::DEFAULT_DISTANCE_LIMIT,
            length_scale: Self::DEFAULT_LENGTH_SCALE,
        }
    }
}

/// Lifecycle state of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum FieldState {
    /// Never computed.
    Empty,
    /// A recalculation is running.
    Computing,
    /// Holds the result of the last recalculation.
    Valid,
    /// The last recalculation failed or was interrupted.
    Invalid,
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Computing => "computing",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        })
    }
}

/// Field vectors together with the bookkeeping of the run producing them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct FieldResult {
    field_type: FieldType,
    vectors: Vec<Vec3<ffl>>,
    total_calculations: u64,
    total_skipped_calculations: u64,
}

impl FieldResult {
    fn from_backend_output(field_type: FieldType, output: BackendOutput) -> Self {
        Self {
            field_type,
            vectors: output.vectors,
            total_calculations: output.total_calculations,
            total_skipped_calculations: output.total_skipped_calculations,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns one vector per sample point, in SI units.
    pub fn vectors(&self) -> &[Vec3<ffl>] {
        &self.vectors
    }

    pub fn total_calculations(&self) -> u64 {
        self.total_calculations
    }

    pub fn total_skipped_calculations(&self) -> u64 {
        self.total_skipped_calculations
    }
}

/// Error returned when reading a field that holds no valid result.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field has no valid result (state is {0})")]
    NotValid(FieldState),
}

/// Reasons a recalculation did not produce a valid field.
#[derive(Debug, Error)]
pub enum RecalculationError {
    #[error("Recalculation was interrupted")]
    Interrupted,
    #[error("Invalid field configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Nothing to compute: {n_elements} wire elements and {n_points} sample points")]
    EmptyInput { n_elements: usize, n_points: usize },
    #[error("Backend {backend_type} is unavailable: {reason}")]
    BackendUnavailable {
        backend_type: BackendType,
        reason: String,
    },
    #[error("Backend reported {actual} calculations but {expected} were expected")]
    CalculationCountMismatch { expected: u64, actual: u64 },
    #[error("Backend returned {actual} vectors for {expected} sample points")]
    VectorCountMismatch { expected: usize, actual: usize },
    #[error("Backend failed: {0}")]
    Backend(BackendError),
}

impl RecalculationError {
    /// Whether the recalculation ended because interruption was requested
    /// rather than because something went wrong.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Magnetic field of a wire evaluated at the points of a sampling volume.
#[derive(Clone, Debug)]
pub struct Field {
    configuration: FieldConfiguration,
    state: FieldState,
    result: Option<FieldResult>,
}

impl Field {
    /// Creates a new empty field with the given configuration.
    pub fn new(configuration: FieldConfiguration) -> Self {
        Self {
            configuration,
            state: FieldState::Empty,
            result: None,
        }
    }

    /// Replaces the configuration used by subsequent recalculations.
    ///
    /// Values are validated when the next recalculation starts.
    pub fn set(
        &mut self,
        backend_type: BackendType,
        field_type: FieldType,
        distance_limit: ffl,
        length_scale: ffl,
    ) {
        self.configuration = FieldConfiguration {
            backend_type,
            field_type,
            distance_limit,
            length_scale,
        };
    }

    pub fn configuration(&self) -> &FieldConfiguration {
        &self.configuration
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Recomputes the field of the given wire at every point of the given
    /// sampling volume, using the configured backend.
    ///
    /// # Parameters
    ///
    /// - `wire`: Wire producing the field.
    /// - `sampling_volume`: Points where the field is evaluated.
    /// - `progress`: Called with the completed fraction while the computation runs.
    /// - `interruption`: Flag that can be set from another thread to abandon the computation.
    /// - `num_cores`: Number of worker threads for the CPU backend (0 picks automatically).
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: The field is now valid and holds the new result.
    /// - `Err`: Contains a `RecalculationError`. The field is then invalid
    ///   and any previous result has been discarded.
    pub fn recalculate<W, S>(
        &mut self,
        wire: &W,
        sampling_volume: &S,
        progress: &ProgressCallback<'_>,
        interruption: &InterruptionFlag,
        num_cores: usize,
    ) -> Result<(), RecalculationError>
    where
        W: Wire + ?Sized,
        S: SamplingVolume + ?Sized,
    {
        let backend = self.configuration.backend_type.create_backend(num_cores);
        self.recalculate_with_backend(
            backend.as_ref(),
            wire,
            sampling_volume,
            progress,
            interruption,
        )
    }

    /// Like [`recalculate`](Self::recalculate), but computes with the given
    /// backend instead of the configured backend type.
    pub fn recalculate_with_backend<W, S>(
        &mut self,
        backend: &dyn ComputeBackend,
        wire: &W,
        sampling_volume: &S,
        progress: &ProgressCallback<'_>,
        interruption: &InterruptionFlag,
    ) -> Result<(), RecalculationError>
    where
        W: Wire + ?Sized,
        S: SamplingVolume + ?Sized,
    {
        self.state = FieldState::Computing;

        if let Err(err) = self.configuration.validate() {
            return Err(self.invalidate(err));
        }

        let input = BackendInput {
            field_type: self.configuration.field_type,
            distance_limit: self.configuration.distance_limit,
            length_scale: self.configuration.length_scale,
            dc: wire.dc(),
            elements: wire.elements(),
            points: sampling_volume.points(),
            permeabilities: sampling_volume.permeabilities(),
        };
        if input.elements.is_empty() || input.points.is_empty() {
            return Err(self.invalidate(RecalculationError::EmptyInput {
                n_elements: input.elements.len(),
                n_points: input.points.len(),
            }));
        }

        tracing::debug!(
            backend = backend.name(),
            field_type = %input.field_type,
            n_elements = input.elements.len(),
            n_points = input.points.len(),
            "Recalculating field"
        );

        let output = match backend.compute(&input, progress, interruption) {
            Ok(output) => output,
            Err(BackendError::Interrupted) => {
                tracing::info!(backend = backend.name(), "Field recalculation interrupted");
                return Err(self.invalidate(RecalculationError::Interrupted));
            }
            Err(BackendError::Unavailable(reason)) => {
                tracing::error!(backend = backend.name(), %reason, "Backend unavailable");
                return Err(self.invalidate(RecalculationError::BackendUnavailable {
                    backend_type: self.configuration.backend_type,
                    reason,
                }));
            }
            Err(err) => {
                tracing::error!(backend = backend.name(), error = %err, "Backend failed");
                return Err(self.invalidate(RecalculationError::Backend(err)));
            }
        };

        let expected = input.expected_calculations();
        if output.total_calculations != expected {
            tracing::error!(
                backend = backend.name(),
                expected,
                actual = output.total_calculations,
                "Calculation count mismatch, discarding result"
            );
            return Err(self.invalidate(RecalculationError::CalculationCountMismatch {
                expected,
                actual: output.total_calculations,
            }));
        }
        if output.vectors.len() != input.points.len() {
            tracing::error!(
                backend = backend.name(),
                expected = input.points.len(),
                actual = output.vectors.len(),
                "Vector count mismatch, discarding result"
            );
            return Err(self.invalidate(RecalculationError::VectorCountMismatch {
                expected: input.points.len(),
                actual: output.vectors.len(),
            }));
        }

        tracing::debug!(
            total_calculations = output.total_calculations,
            total_skipped_calculations = output.total_skipped_calculations,
            "Field recalculation complete"
        );

        self.result = Some(FieldResult::from_backend_output(input.field_type, output));
        self.state = FieldState::Valid;
        Ok(())
    }

    fn invalidate(&mut self, err: RecalculationError) -> RecalculationError {
        self.result = None;
        self.state = FieldState::Invalid;
        err
    }

    /// Returns the complete result of the last recalculation.
    pub fn result(&self) -> Result<&FieldResult, FieldError> {
        match (self.state, &self.result) {
            (FieldState::Valid, Some(result)) => Ok(result),
            (state, _) => Err(FieldError::NotValid(state)),
        }
    }

    /// Returns one field vector per sample point, in SI units.
    pub fn vectors(&self) -> Result<&[Vec3<ffl>], FieldError> {
        self.result().map(FieldResult::vectors)
    }

    /// Returns the number of (element, point) pairs evaluated.
    pub fn total_calculations(&self) -> Result<u64, FieldError> {
        self.result().map(FieldResult::total_calculations)
    }

    /// Returns the number of evaluated pairs that were short-circuited.
    pub fn total_skipped_calculations(&self) -> Result<u64, FieldError> {
        self.result().map(FieldResult::total_skipped_calculations)
    }

    /// Returns the type of the computed field.
    pub fn field_type(&self) -> Result<FieldType, FieldError> {
        self.result().map(FieldResult::field_type)
    }

    /// Returns the unit label and conversion factor for the configured
    /// field type.
    pub fn units(&self, show_gauss: bool) -> (&'static str, ffl) {
        self.configuration.field_type.units(show_gauss)
    }

    /// Returns the smallest and largest vector magnitude, in SI units.
    pub fn magnitude_range(&self) -> Result<(ffl, ffl), FieldError> {
        Ok(self.vectors()?.iter().map(Vec3::length).fold(
            (ffl::INFINITY, ffl::NEG_INFINITY),
            |(min, max), magnitude| (min.min(magnitude), max.max(magnitude)),
        ))
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new(FieldConfiguration::default())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        constants::MU_0_OVER_4PI,
        geometry::{
            Dim3::{X, Y, Z},
            Point3, Vec3,
        },
        sampling::{manual::ManualSamplingVolume, regular::RegularSamplingVolume},
        wire::{presets, PolylineWire, WireElement},
    };
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            mpsc, Mutex,
        },
        thread,
    };

    fn unit_field(field_type: FieldType) -> Field {
        Field::new(FieldConfiguration {
            backend_type: BackendType::CpuParallel,
            field_type,
            distance_limit: 1e-9,
            length_scale: 1.0,
        })
    }

    fn recalculate_quietly<W: Wire, S: SamplingVolume>(
        field: &mut Field,
        wire: &W,
        sampling_volume: &S,
    ) -> Result<(), RecalculationError> {
        field.recalculate(wire, sampling_volume, &|_| {}, &InterruptionFlag::new(), 0)
    }

    struct SingleElementWire {
        elements: Vec<WireElement>,
        dc: ffl,
    }

    impl Wire for SingleElementWire {
        fn elements(&self) -> &[WireElement] {
            &self.elements
        }

        fn dc(&self) -> ffl {
            self.dc
        }
    }

    /// Backend that evaluates correctly but misreports the work it did.
    struct MiscountingBackend;

    impl ComputeBackend for MiscountingBackend {
        fn name(&self) -> &'static str {
            "miscounting"
        }

        fn compute(
            &self,
            input: &BackendInput,
            progress: &ProgressCallback<'_>,
            interruption: &InterruptionFlag,
        ) -> Result<BackendOutput, BackendError> {
            let mut output = CpuBackend::new(1).compute(input, progress, interruption)?;
            output.total_calculations -= 1;
            Ok(output)
        }
    }

    #[test]
    fn accessors_fail_before_first_recalculation() {
        let field = Field::default();
        assert_eq!(field.state(), FieldState::Empty);
        assert_eq!(field.vectors().err(), Some(FieldError::NotValid(FieldState::Empty)));
        assert!(field.total_calculations().is_err());
        assert!(field.total_skipped_calculations().is_err());
        assert!(field.field_type().is_err());
        assert!(field.magnitude_range().is_err());
    }

    #[test]
    fn every_pair_is_counted() {
        let wire = presets::square_loop(2.0, 0.25, 1.0).unwrap();
        let volume = RegularSamplingVolume::around_wire(&wire, 0.5, 2.0).unwrap();
        let mut field = Field::default();
        recalculate_quietly(&mut field, &wire, &volume).unwrap();

        assert_eq!(field.state(), FieldState::Valid);
        assert_eq!(
            field.total_calculations().unwrap(),
            (wire.number_of_elements() * volume.points_count()) as u64
        );
        assert_eq!(field.total_skipped_calculations().unwrap(), 0);
        assert_eq!(field.field_type().unwrap(), FieldType::FluxDensityB);
    }

    #[test]
    fn vectors_are_aligned_with_points() {
        let wire = presets::circular_loop(1.0, 16, 0.2, 1.0).unwrap();
        let points: Vec<_> = (0..40)
            .map(|i| Point3::new(0.1 * (i as ffl) - 2.0, 0.3, -0.2))
            .collect();
        let mut field = unit_field(FieldType::FluxDensityB);
        recalculate_quietly(
            &mut field,
            &wire,
            &ManualSamplingVolume::in_vacuum(points.clone()),
        )
        .unwrap();
        let vectors = field.vectors().unwrap().to_vec();
        assert_eq!(vectors.len(), points.len());

        for (point, vector) in points.iter().zip(vectors.iter()).step_by(7) {
            let mut single = unit_field(FieldType::FluxDensityB);
            recalculate_quietly(
                &mut single,
                &wire,
                &ManualSamplingVolume::in_vacuum(vec![*point]),
            )
            .unwrap();
            assert_eq!(single.vectors().unwrap()[0], *vector);
        }
    }

    #[test]
    fn field_is_linear_in_current_and_permeability() {
        let points = vec![Point3::new(0.5, 0.2, 0.1), Point3::new(-0.3, 0.0, 1.5)];
        for field_type in [FieldType::FluxDensityB, FieldType::VectorPotentialA] {
            let mut reference = unit_field(field_type);
            let wire = presets::straight_line(2.0, 0.1, 1.0).unwrap();
            recalculate_quietly(
                &mut reference,
                &wire,
                &ManualSamplingVolume::in_vacuum(points.clone()),
            )
            .unwrap();

            let mut scaled = unit_field(field_type);
            let doubled_wire = wire.clone().with_dc(2.0).unwrap();
            let volume = ManualSamplingVolume::new(points.clone(), vec![1.0, 3.0]).unwrap();
            recalculate_quietly(&mut scaled, &doubled_wire, &volume).unwrap();

            let reference = reference.vectors().unwrap();
            let scaled = scaled.vectors().unwrap();
            assert_relative_eq!(scaled[0], reference[0] * 2.0, max_relative = 1e-12);
            assert_relative_eq!(scaled[1], reference[1] * 6.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn point_on_element_midpoint_is_finite() {
        let wire = presets::straight_line(1.0, 1.0, 1.0).unwrap();
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::origin()]);
        for field_type in [FieldType::FluxDensityB, FieldType::VectorPotentialA] {
            let mut field = Field::default();
            field.set(
                BackendType::CpuParallel,
                field_type,
                FieldConfiguration::DEFAULT_DISTANCE_LIMIT,
                FieldConfiguration::DEFAULT_LENGTH_SCALE,
            );
            recalculate_quietly(&mut field, &wire, &volume).unwrap();
            assert!(field.vectors().unwrap()[0].is_finite());
        }
    }

    #[test]
    fn single_element_field_is_azimuthal() {
        let wire = SingleElementWire {
            elements: vec![WireElement {
                midpoint: Point3::origin(),
                direction: Vec3::new(0.0, 0.0, 1.0),
            }],
            dc: 1.0,
        };
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut field = unit_field(FieldType::FluxDensityB);
        recalculate_quietly(&mut field, &wire, &volume).unwrap();
        let b = field.vectors().unwrap()[0];
        assert_abs_diff_eq!(b[X], 0.0);
        assert_abs_diff_eq!(b[Z], 0.0);
        assert!(b[Y] > 0.0);
    }

    #[test]
    fn finite_segment_matches_analytic_field() {
        // Unit segment along z centered on the origin, evaluated one unit away.
        let wire = PolylineWire::new(
            vec![Point3::new(0.0, 0.0, -0.5), Point3::new(0.0, 0.0, 0.5)],
            false,
            0.01,
            1.0,
        )
        .unwrap();
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut field = unit_field(FieldType::FluxDensityB);
        recalculate_quietly(&mut field, &wire, &volume).unwrap();

        let distance: ffl = 1.0;
        let half_length: ffl = 0.5;
        let analytic = MU_0_OVER_4PI / distance * 2.0 * half_length
            / (half_length * half_length + distance * distance).sqrt();

        let b = field.vectors().unwrap()[0];
        assert_relative_eq!(b.length(), analytic, max_relative = 1e-2);
        assert_relative_eq!(b, Vec3::new(0.0, analytic, 0.0), max_relative = 1e-2);
    }

    #[test]
    fn units_follow_field_type() {
        assert_eq!(FieldType::FluxDensityB.units(false), ("T", 1.0));
        assert_eq!(FieldType::FluxDensityB.units(true), ("Gs", 1e4));
        assert_eq!(FieldType::VectorPotentialA.units(false), ("T·m", 1.0));
        assert_eq!(FieldType::VectorPotentialA.units(true), ("Gs·m", 1e4));
        assert_eq!(Field::default().units(true), ("Gs", 1e4));
    }

    #[test]
    fn calculation_count_mismatch_discards_result() {
        let wire = presets::straight_line(1.0, 0.25, 1.0).unwrap();
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::new(1.0, 0.0, 0.0); 3]);
        let mut field = Field::default();
        recalculate_quietly(&mut field, &wire, &volume).unwrap();

        let result = field.recalculate_with_backend(
            &MiscountingBackend,
            &wire,
            &volume,
            &|_| {},
            &InterruptionFlag::new(),
        );
        assert!(matches!(
            result,
            Err(RecalculationError::CalculationCountMismatch {
                expected: 12,
                actual: 11
            })
        ));
        assert_eq!(field.state(), FieldState::Invalid);
        assert!(field.vectors().is_err());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let wire = presets::straight_line(1.0, 0.25, 1.0).unwrap();
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut field = Field::default();
        field.set(BackendType::CpuParallel, FieldType::FluxDensityB, 0.0, 1.0);
        assert!(matches!(
            recalculate_quietly(&mut field, &wire, &volume),
            Err(RecalculationError::InvalidConfiguration(_))
        ));
        assert_eq!(field.state(), FieldState::Invalid);
    }

    #[test]
    fn empty_input_is_rejected() {
        let wire = presets::straight_line(1.0, 0.25, 1.0).unwrap();
        let mut field = Field::default();
        assert!(matches!(
            recalculate_quietly(&mut field, &wire, &ManualSamplingVolume::in_vacuum(Vec::new())),
            Err(RecalculationError::EmptyInput {
                n_elements: 4,
                n_points: 0
            })
        ));
    }

    #[test]
    fn failure_does_not_poison_later_recalculations() {
        let wire = presets::straight_line(1.0, 0.25, 1.0).unwrap();
        let volume = ManualSamplingVolume::in_vacuum(vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut field = Field::default();
        let interruption = InterruptionFlag::new();
        interruption.interrupt();
        let result = field.recalculate(&wire, &volume, &|_| {}, &interruption, 1);
        assert!(result.unwrap_err().is_interruption());
        assert_eq!(field.state(), FieldState::Invalid);

        interruption.reset();
        field
            .recalculate(&wire, &volume, &|_| {}, &interruption, 1)
            .unwrap();
        assert_eq!(field.state(), FieldState::Valid);
    }

    #[test]
    fn interruption_from_progress_callback_invalidates_field() {
        let wire = presets::solenoid(1.0, 4.0, 20, 50, 0.01, 1.0).unwrap();
        let volume = RegularSamplingVolume::new(
            Point3::new(-2.0, -2.0, -3.0),
            Point3::new(2.0, 2.0, 3.0),
            4.0,
        )
        .unwrap();
        let mut field = Field::default();
        recalculate_quietly(&mut field, &presets::straight_line(1.0, 1.0, 1.0).unwrap(), &volume)
            .unwrap();

        let interruption = InterruptionFlag::new();
        let reported = Mutex::new(Vec::new());
        let result = field.recalculate(
            &wire,
            &volume,
            &|fraction| {
                reported.lock().unwrap().push(fraction);
                interruption.interrupt();
            },
            &interruption,
            1,
        );

        assert!(matches!(result, Err(RecalculationError::Interrupted)));
        assert_eq!(field.state(), FieldState::Invalid);
        assert!(field.vectors().is_err());
        let reported = reported.into_inner().unwrap();
        assert_eq!(reported.len(), 1);
        assert!(reported[0] < 1.0);
    }

    #[test]
    fn interruption_from_other_thread_stops_recalculation() {
        let wire = presets::solenoid(1.0, 4.0, 20, 100, 0.005, 1.0).unwrap();
        let volume = RegularSamplingVolume::new(
            Point3::new(-2.0, -2.0, -3.0),
            Point3::new(2.0, 2.0, 3.0),
            4.0,
        )
        .unwrap();
        let mut field = Field::default();
        let interruption = InterruptionFlag::new();
        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        let started = AtomicBool::new(false);

        let result = thread::scope(|scope| {
            let handle = interruption.clone();
            scope.spawn(move || {
                if receiver.recv().is_ok() {
                    handle.interrupt();
                }
            });
            field.recalculate(
                &wire,
                &volume,
                &|_| {
                    if !started.swap(true, Ordering::SeqCst) {
                        let _ = sender.lock().unwrap().send(());
                        while !interruption.is_interrupted() {
                            thread::yield_now();
                        }
                    }
                },
                &interruption,
                2,
            )
        });

        assert!(result.unwrap_err().is_interruption());
        assert_eq!(field.state(), FieldState::Invalid);
    }
}
