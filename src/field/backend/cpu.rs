//! Multithreaded CPU backend.

use super::{
    sum_contributions, BackendError, BackendInput, BackendOutput, ComputeBackend,
    InterruptionFlag, ProgressCallback, ProgressTracker, ScaledElement,
};
use crate::{field::ffl, geometry::Vec3};
use atomic_counter::{AtomicCounter, RelaxedCounter};
use rayon::prelude::*;

/// Backend distributing the sample points over a pool of worker threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend {
    num_cores: usize,
}

impl CpuBackend {
    /// Number of sample points processed between interruption checks.
    pub const POINTS_PER_CHUNK: usize = 256;

    /// Creates a new CPU backend using the given number of worker threads.
    /// Zero lets the thread pool pick the number of available cores.
    pub fn new(num_cores: usize) -> Self {
        Self { num_cores }
    }

    /// Returns the requested number of worker threads.
    pub fn num_cores(&self) -> usize {
        self.num_cores
    }

    fn build_thread_pool(&self) -> Result<rayon::ThreadPool, BackendError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_cores)
            .thread_name(|idx| format!("magfield-worker-{}", idx))
            .build()
            .map_err(|err| BackendError::ThreadPool(err.to_string()))
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "CPU (parallel)"
    }

    fn compute(
        &self,
        input: &BackendInput,
        progress: &ProgressCallback<'_>,
        interruption: &InterruptionFlag,
    ) -> Result<BackendOutput, BackendError> {
        input.verify()?;

        let field_type = input.field_type;
        let distance_limit = input.distance_limit;
        let length_scale = input.length_scale;
        let elements = ScaledElement::scale_all(input.elements, length_scale);
        let n_elements = elements.len();
        let n_degenerate_elements = input.degenerate_element_count();

        let calculation_count = RelaxedCounter::new(0);
        let skipped_calculation_count = RelaxedCounter::new(0);
        let progress_tracker = ProgressTracker::new(progress, input.points.len());

        let mut vectors = vec![Vec3::zero(); input.points.len()];

        let thread_pool = self.build_thread_pool()?;
        thread_pool.install(|| {
            vectors
                .par_chunks_mut(Self::POINTS_PER_CHUNK)
                .enumerate()
                .try_for_each(|(chunk_idx, vector_chunk)| {
                    if interruption.is_interrupted() {
                        return Err(BackendError::Interrupted);
                    }
                    let offset = chunk_idx * Self::POINTS_PER_CHUNK;
                    for (idx, vector) in (offset..).zip(vector_chunk.iter_mut()) {
                        let point = input.points[idx].to_vec3() * length_scale;
                        let sum = sum_contributions(field_type, distance_limit, &elements, &point);
                        *vector = sum * input.prefactor(idx);
                    }
                    calculation_count.add(n_elements * vector_chunk.len());
                    skipped_calculation_count.add(n_degenerate_elements * vector_chunk.len());
                    progress_tracker.advance(vector_chunk.len());
                    Ok(())
                })
        })?;

        progress_tracker.finish();

        Ok(BackendOutput {
            total_calculations: calculation_count.into_inner() as u64,
            total_skipped_calculations: skipped_calculation_count.into_inner() as u64,
            vectors,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        constants::MU_0_OVER_4PI,
        field::FieldType,
        geometry::Point3,
        wire::WireElement,
    };
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn single_element() -> Vec<WireElement> {
        vec![WireElement::between(
            &Point3::new(0.0, 0.0, -0.5),
            &Point3::new(0.0, 0.0, 0.5),
        )]
    }

    fn input<'a>(
        elements: &'a [WireElement],
        points: &'a [Point3<ffl>],
        permeabilities: &'a [ffl],
    ) -> BackendInput<'a> {
        BackendInput {
            field_type: FieldType::FluxDensityB,
            distance_limit: 1e-9,
            length_scale: 1.0,
            dc: 1.0,
            elements,
            points,
            permeabilities,
        }
    }

    #[test]
    fn single_element_gives_kernel_value() {
        let elements = single_element();
        let points = vec![Point3::new(1.0, 0.0, 0.0)];
        let permeabilities = vec![2.0];
        let output = CpuBackend::new(1)
            .compute(
                &input(&elements, &points, &permeabilities),
                &|_| {},
                &InterruptionFlag::new(),
            )
            .unwrap();
        assert_eq!(output.total_calculations, 1);
        assert_eq!(output.total_skipped_calculations, 0);
        assert_relative_eq!(
            output.vectors[0],
            Vec3::new(0.0, 2.0 * MU_0_OVER_4PI, 0.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn chunked_results_match_serial_evaluation() {
        let elements: Vec<_> = (0..7)
            .map(|i| {
                let angle = (i as ffl) * 0.9;
                WireElement {
                    midpoint: Point3::new(angle.cos(), angle.sin(), 0.1 * (i as ffl)),
                    direction: Vec3::new(-angle.sin(), angle.cos(), 0.05),
                }
            })
            .collect();
        let points: Vec<_> = (0..1000)
            .map(|i| {
                let t = i as ffl;
                Point3::new(0.01 * t - 5.0, (0.37 * t).sin(), (0.11 * t).cos())
            })
            .collect();
        let permeabilities = vec![1.0; points.len()];
        let input = input(&elements, &points, &permeabilities);

        let parallel = CpuBackend::new(4)
            .compute(&input, &|_| {}, &InterruptionFlag::new())
            .unwrap();
        let serial = CpuBackend::new(1)
            .compute(&input, &|_| {}, &InterruptionFlag::new())
            .unwrap();

        assert_eq!(parallel.total_calculations, 7000);
        assert_eq!(parallel.vectors, serial.vectors);
    }

    #[test]
    fn degenerate_elements_are_counted_and_skipped() {
        let mut elements = single_element();
        elements.push(WireElement {
            midpoint: Point3::origin(),
            direction: Vec3::zero(),
        });
        let points = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let permeabilities = vec![1.0; 2];
        let output = CpuBackend::default()
            .compute(
                &input(&elements, &points, &permeabilities),
                &|_| {},
                &InterruptionFlag::new(),
            )
            .unwrap();
        assert_eq!(output.total_calculations, 4);
        assert_eq!(output.total_skipped_calculations, 2);
        assert!(output.vectors.iter().all(Vec3::is_finite));
    }

    #[test]
    fn progress_ends_at_one() {
        let elements = single_element();
        let points = vec![Point3::new(1.0, 0.0, 0.0); 3 * CpuBackend::POINTS_PER_CHUNK + 1];
        let permeabilities = vec![1.0; points.len()];
        let reported = Mutex::new(Vec::new());
        CpuBackend::new(2)
            .compute(
                &input(&elements, &points, &permeabilities),
                &|fraction| reported.lock().unwrap().push(fraction),
                &InterruptionFlag::new(),
            )
            .unwrap();
        let reported = reported.into_inner().unwrap();
        assert!(reported.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(reported.last().copied(), Some(1.0));
    }

    #[test]
    fn preset_interruption_stops_computation() {
        let elements = single_element();
        let points = vec![Point3::new(1.0, 0.0, 0.0); 10];
        let permeabilities = vec![1.0; points.len()];
        let interruption = InterruptionFlag::new();
        interruption.interrupt();
        let result = CpuBackend::new(1).compute(
            &input(&elements, &points, &permeabilities),
            &|_| {},
            &interruption,
        );
        assert!(matches!(result, Err(BackendError::Interrupted)));
    }

    #[test]
    fn misaligned_permeabilities_are_rejected() {
        let elements = single_element();
        let points = vec![Point3::origin(); 2];
        let permeabilities = vec![1.0];
        assert!(matches!(
            CpuBackend::new(1).compute(
                &input(&elements, &points, &permeabilities),
                &|_| {},
                &InterruptionFlag::new()
            ),
            Err(BackendError::InvalidInput(_))
        ));
    }
}
