//! GPU backend running the Biot-Savart superposition in a compute shader.
//!
//! Every GPU thread accumulates the contributions of all wire elements at a
//! single sample point in single precision. The points are processed in
//! launches of bounded size, and progress and interruption are handled on
//! the host between launches. The physical prefactors are applied on the
//! host in double precision.

use super::{
    BackendError, BackendInput, BackendOutput, ComputeBackend, InterruptionFlag, ProgressCallback,
};

/// Backend evaluating the field on the first available GPU adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuBackend;

impl GpuBackend {
    pub fn new() -> Self {
        Self
    }

    /// Whether a usable GPU device was found.
    ///
    /// The device is queried the first time this is called and the outcome
    /// is reused for the rest of the process.
    pub fn is_available() -> bool {
        Self::adapter_name().is_some()
    }

    /// Returns the name of the GPU adapter in use, if any.
    pub fn adapter_name() -> Option<String> {
        #[cfg(feature = "gpu")]
        {
            device::context()
                .ok()
                .map(|context| context.adapter_name().to_string())
        }
        #[cfg(not(feature = "gpu"))]
        {
            None
        }
    }
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "GPU"
    }

    fn compute(
        &self,
        input: &BackendInput,
        progress: &ProgressCallback<'_>,
        interruption: &InterruptionFlag,
    ) -> Result<BackendOutput, BackendError> {
        input.verify()?;
        #[cfg(feature = "gpu")]
        {
            device::context()?.compute(input, progress, interruption)
        }
        #[cfg(not(feature = "gpu"))]
        {
            let _ = (progress, interruption);
            Err(BackendError::Unavailable(
                "compiled without the `gpu` feature".to_string(),
            ))
        }
    }
}

#[cfg(feature = "gpu")]
mod device {

    use super::super::{ProgressTracker, ScaledElement};
    use super::*;
    use crate::{
        field::{ffl, FieldType},
        geometry::{
            Dim3::{X, Y, Z},
            Vec3,
        },
    };
    use lazy_static::lazy_static;
    use std::{mem, sync::mpsc};
    use wgpu::util::DeviceExt;

    const WORKGROUP_SIZE: usize = 64;
    const MAX_PAIRS_PER_LAUNCH: usize = 1 << 26;
    const VECTOR_BYTES: u64 = mem::size_of::<[f32; 4]>() as u64;

    const FIELD_TYPE_A: u32 = 0;
    const FIELD_TYPE_B: u32 = 1;

    const SHADER: &str = r#"
struct Params {
    field_type: u32,
    element_count: u32,
    point_count: u32,
    distance_limit: f32,
}

struct Element {
    midpoint: vec4<f32>,
    direction: vec4<f32>,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> elements: array<Element>;
@group(0) @binding(2) var<storage, read> points: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> vectors: array<vec4<f32>>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let idx = id.x;
    if (idx >= params.point_count) {
        return;
    }
    let point = points[idx].xyz;
    var sum = vec3<f32>(0.0, 0.0, 0.0);
    for (var j = 0u; j < params.element_count; j = j + 1u) {
        let dl = elements[j].direction.xyz;
        let r = point - elements[j].midpoint.xyz;
        let d = max(length(r), params.distance_limit);
        if (params.field_type == 1u) {
            sum = sum + cross(dl, r) / (d * d * d);
        } else {
            sum = sum + dl / d;
        }
    }
    vectors[idx] = vec4<f32>(sum, 0.0);
}
"#;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
    struct GpuParams {
        field_type: u32,
        element_count: u32,
        point_count: u32,
        distance_limit: f32,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
    struct GpuElement {
        midpoint: [f32; 4],
        direction: [f32; 4],
    }

    fn to_gpu_vec4(vector: &Vec3<ffl>) -> [f32; 4] {
        [vector[X] as f32, vector[Y] as f32, vector[Z] as f32, 0.0]
    }

    /// Number of sample points evaluated in one launch, given the number of
    /// wire elements and the largest allowed storage binding.
    pub(super) fn points_per_launch(
        n_elements: usize,
        max_binding_bytes: u64,
        max_workgroups: usize,
    ) -> usize {
        let by_pairs = MAX_PAIRS_PER_LAUNCH / n_elements.max(1);
        let by_memory = (max_binding_bytes / VECTOR_BYTES) as usize;
        let by_dispatch = max_workgroups * WORKGROUP_SIZE;
        let n_points = by_pairs.min(by_memory).min(by_dispatch);
        (n_points / WORKGROUP_SIZE).max(1) * WORKGROUP_SIZE
    }

    lazy_static! {
        static ref GPU_CONTEXT: Result<GpuContext, String> = GpuContext::new();
    }

    /// Returns the process wide GPU context, probing for a device on first use.
    pub(super) fn context() -> Result<&'static GpuContext, BackendError> {
        GPU_CONTEXT
            .as_ref()
            .map_err(|reason| BackendError::Unavailable(reason.clone()))
    }

    /// Device, queue and compiled pipeline shared by all GPU computations.
    pub(super) struct GpuContext {
        device: wgpu::Device,
        queue: wgpu::Queue,
        pipeline: wgpu::ComputePipeline,
        bind_group_layout: wgpu::BindGroupLayout,
        adapter_info: wgpu::AdapterInfo,
    }

    impl GpuContext {
        fn new() -> Result<Self, String> {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..Default::default()
            });

            let adapter = pollster::block_on(instance.request_adapter(
                &wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                },
            ))
            .map_err(|err| format!("no GPU adapter found: {}", err))?;

            let adapter_info = adapter.get_info();
            tracing::info!(
                adapter = %adapter_info.name,
                backend = ?adapter_info.backend,
                device_type = ?adapter_info.device_type,
                "GPU adapter selected"
            );

            let (device, queue) =
                pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                    label: Some("magfield device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    ..Default::default()
                }))
                .map_err(|err| format!("could not open GPU device: {}", err))?;

            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("biot-savart shader"),
                source: wgpu::ShaderSource::Wgsl(SHADER.into()),
            });

            let storage_entry = |binding, read_only| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            };
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("biot-savart bind group layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        storage_entry(1, true),
                        storage_entry(2, true),
                        storage_entry(3, false),
                    ],
                });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("biot-savart pipeline"),
                layout: Some(
                    &device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("biot-savart pipeline layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        ..Default::default()
                    }),
                ),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            Ok(Self {
                device,
                queue,
                pipeline,
                bind_group_layout,
                adapter_info,
            })
        }

        pub(super) fn adapter_name(&self) -> &str {
            &self.adapter_info.name
        }

        fn max_binding_bytes(&self) -> u64 {
            let limits = self.device.limits();
            (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
        }

        fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        }

        pub(super) fn compute(
            &self,
            input: &BackendInput,
            progress: &ProgressCallback<'_>,
            interruption: &InterruptionFlag,
        ) -> Result<BackendOutput, BackendError> {
            let elements: Vec<GpuElement> =
                ScaledElement::scale_all(input.elements, input.length_scale)
                    .iter()
                    .map(|element| GpuElement {
                        midpoint: to_gpu_vec4(&element.midpoint),
                        direction: to_gpu_vec4(&element.direction),
                    })
                    .collect();
            let n_elements = elements.len();
            let n_points = input.points.len();

            let max_binding_bytes = self.max_binding_bytes();
            if (mem::size_of_val(elements.as_slice()) as u64) > max_binding_bytes {
                return Err(BackendError::InvalidInput(format!(
                    "{} wire elements exceed the storage limit of the GPU device",
                    n_elements
                )));
            }
            let max_workgroups = self.device.limits().max_compute_workgroups_per_dimension as usize;
            let points_per_launch =
                points_per_launch(n_elements, max_binding_bytes, max_workgroups).min(n_points);
            let launch_bytes = (points_per_launch as u64) * VECTOR_BYTES;

            tracing::debug!(
                n_elements,
                n_points,
                points_per_launch,
                "Running Biot-Savart shader"
            );

            let element_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("wire elements"),
                    contents: bytemuck::cast_slice(&elements),
                    usage: wgpu::BufferUsages::STORAGE,
                });
            let params_buffer = self.create_buffer(
                "parameters",
                mem::size_of::<GpuParams>() as u64,
                wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            );
            let point_buffer = self.create_buffer(
                "sample points",
                launch_bytes,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            );
            let vector_buffer = self.create_buffer(
                "field vectors",
                launch_bytes,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            let staging_buffer = self.create_buffer(
                "field vector readback",
                launch_bytes,
                wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            );

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("biot-savart bind group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: element_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: point_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: vector_buffer.as_entire_binding(),
                    },
                ],
            });

            let field_type = match input.field_type {
                FieldType::VectorPotentialA => FIELD_TYPE_A,
                FieldType::FluxDensityB => FIELD_TYPE_B,
            };
            // Must stay positive after conversion to single precision.
            let distance_limit = (input.distance_limit as f32).max(f32::MIN_POSITIVE);

            let progress_tracker = ProgressTracker::new(progress, n_points);
            let mut raw_vectors: Vec<[f32; 4]> = Vec::with_capacity(n_points);
            let mut total_calculations = 0_u64;

            for tile in input.points.chunks(points_per_launch) {
                if interruption.is_interrupted() {
                    return Err(BackendError::Interrupted);
                }

                let params = GpuParams {
                    field_type,
                    element_count: n_elements as u32,
                    point_count: tile.len() as u32,
                    distance_limit,
                };
                let tile_points: Vec<[f32; 4]> = tile
                    .iter()
                    .map(|point| to_gpu_vec4(&(point.to_vec3() * input.length_scale)))
                    .collect();
                self.queue
                    .write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));
                self.queue
                    .write_buffer(&point_buffer, 0, bytemuck::cast_slice(&tile_points));

                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("biot-savart encoder"),
                        });
                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("biot-savart pass"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &bind_group, &[]);
                    let n_workgroups = (tile.len() + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
                    pass.dispatch_workgroups(n_workgroups as u32, 1, 1);
                }
                let tile_bytes = (tile.len() as u64) * VECTOR_BYTES;
                encoder.copy_buffer_to_buffer(&vector_buffer, 0, &staging_buffer, 0, tile_bytes);
                self.queue.submit(Some(encoder.finish()));

                raw_vectors.extend(self.read_back(&staging_buffer, tile_bytes)?);
                total_calculations += (n_elements as u64) * (tile.len() as u64);
                progress_tracker.advance(tile.len());
            }

            progress_tracker.finish();

            let vectors = raw_vectors
                .iter()
                .enumerate()
                .map(|(idx, raw)| {
                    Vec3::new(raw[0] as ffl, raw[1] as ffl, raw[2] as ffl) * input.prefactor(idx)
                })
                .collect();

            Ok(BackendOutput {
                total_calculations,
                total_skipped_calculations: (input.degenerate_element_count() as u64)
                    * (n_points as u64),
                vectors,
            })
        }

        /// Waits for the submitted work and copies the given number of bytes
        /// from the start of the staging buffer.
        fn read_back(
            &self,
            staging_buffer: &wgpu::Buffer,
            n_bytes: u64,
        ) -> Result<Vec<[f32; 4]>, BackendError> {
            let slice = staging_buffer.slice(..n_bytes);
            let (sender, receiver) = mpsc::channel();
            slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
            self.device
                .poll(wgpu::PollType::wait_indefinitely())
                .map_err(|err| BackendError::Device(err.to_string()))?;
            receiver
                .recv()
                .map_err(|err| BackendError::Device(err.to_string()))?
                .map_err(|err| BackendError::Device(err.to_string()))?;

            let data = {
                let mapped = slice.get_mapped_range();
                bytemuck::cast_slice::<u8, [f32; 4]>(&mapped).to_vec()
            };
            staging_buffer.unmap();
            Ok(data)
        }
    }

    #[cfg(test)]
    mod tests {

        use super::*;

        #[test]
        fn launches_are_whole_workgroups_within_limits() {
            let n_points = points_per_launch(1000, 1 << 27, 65535);
            assert_eq!(n_points % WORKGROUP_SIZE, 0);
            assert!(n_points * 1000 <= MAX_PAIRS_PER_LAUNCH);

            let n_points = points_per_launch(1, 1 << 10, 65535);
            assert_eq!(n_points, 64);

            assert_eq!(points_per_launch(usize::MAX, 1 << 27, 65535), WORKGROUP_SIZE);
        }
    }
}

#[cfg(test)]
mod tests {

    use super::super::cpu::CpuBackend;
    use super::*;
    use crate::{
        field::{ffl, FieldType},
        geometry::Point3,
        wire::presets,
        wire::Wire,
    };

    #[test]
    fn gpu_matches_cpu_when_available() {
        if !GpuBackend::is_available() {
            return;
        }
        let wire = presets::circular_loop(1.0, 24, 0.1, 2.0).unwrap();
        let points: Vec<_> = (0..500)
            .map(|i| {
                let t = i as ffl;
                Point3::new(0.013 * t - 3.0, (0.3 * t).sin(), (0.7 * t).cos())
            })
            .collect();
        let permeabilities = vec![1.0; points.len()];
        for field_type in [FieldType::FluxDensityB, FieldType::VectorPotentialA] {
            let input = BackendInput {
                field_type,
                distance_limit: 1e-4,
                length_scale: 1e-2,
                dc: wire.dc(),
                elements: wire.elements(),
                points: &points,
                permeabilities: &permeabilities,
            };
            let cpu = CpuBackend::new(0)
                .compute(&input, &|_| {}, &InterruptionFlag::new())
                .unwrap();
            let gpu = GpuBackend::new()
                .compute(&input, &|_| {}, &InterruptionFlag::new())
                .unwrap();
            assert_eq!(gpu.total_calculations, cpu.total_calculations);
            let scale = cpu
                .vectors
                .iter()
                .map(|vector| vector.length())
                .fold(0.0, ffl::max);
            // The shader accumulates in f32, so weak vectors near cancellation
            // points carry errors on the order of the strongest one.
            for (gpu_vector, cpu_vector) in gpu.vectors.iter().zip(cpu.vectors.iter()) {
                assert!((*gpu_vector - *cpu_vector).length() <= 1e-4 * scale);
            }
        }
    }

    #[test]
    fn unavailable_gpu_is_reported() {
        if GpuBackend::is_available() {
            return;
        }
        let wire = presets::straight_line(1.0, 0.5, 1.0).unwrap();
        let points = vec![Point3::new(1.0, 0.0, 0.0)];
        let input = BackendInput {
            field_type: FieldType::FluxDensityB,
            distance_limit: 1e-4,
            length_scale: 1.0,
            dc: 1.0,
            elements: wire.elements(),
            points: &points,
            permeabilities: &[1.0],
        };
        assert!(matches!(
            GpuBackend::new().compute(&input, &|_| {}, &InterruptionFlag::new()),
            Err(BackendError::Unavailable(_))
        ));
    }
}
