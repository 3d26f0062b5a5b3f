//! Deterministic simulated device
//!
//! Models a GEMM device with a virtual clock: every accepted call advances
//! the clock by a launch overhead plus `flops / throughput`, where throughput
//! depends on the compute type, the algorithm family and the algorithm index.
//! Ineligible tensor-core and quantized calls are rejected the way the real
//! library rejects them, so sweeps exercise every outcome without hardware.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use super::{DeviceBuffer, DeviceProperties, DeviceTimer, GemmArgs, GemmBackend, GemmStatus};
use crate::catalog::{AlgorithmFamily, AlgorithmId, DataType};
use crate::eligibility::{quantized_restrictions, tensor_core_restrictions};
use crate::error::{ProfError, Result};
use crate::problem::Operation;

const BASE_ADDRESS: u64 = 0x7f00_0000_0000;
const ALLOCATION_GRANULARITY: u64 = 256;

/// Shape of the simulated device
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub name: String,
    pub compute_major: i32,
    pub compute_minor: i32,
    /// Single-precision peak of the general-purpose path
    pub peak_gflops: f64,
    pub launch_overhead_ms: f64,
    pub memory_bytes: usize,
    /// Added to every allocation address; a value that is not a multiple of
    /// 16 breaks the tensor-core address predicates
    pub address_offset: u64,
    /// Status returned for every call of the given algorithm
    pub injected_fault: Option<(AlgorithmId, GemmStatus)>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            name: "Simulated GEMM Device".to_string(),
            compute_major: 6,
            compute_minor: 1,
            peak_gflops: 10_000.0,
            launch_overhead_ms: 0.004,
            memory_bytes: 16 * 1024 * 1024 * 1024,
            address_offset: 0,
            injected_fault: None,
        }
    }
}

impl SimulatedDevice {
    pub fn with_compute_capability(mut self, major: i32, minor: i32) -> Self {
        self.compute_major = major;
        self.compute_minor = minor;
        self
    }

    pub fn with_memory(mut self, bytes: usize) -> Self {
        self.memory_bytes = bytes;
        self
    }

    pub fn with_address_offset(mut self, offset: u64) -> Self {
        self.address_offset = offset;
        self
    }

    pub fn with_fault(mut self, algo: AlgorithmId, status: GemmStatus) -> Self {
        self.injected_fault = Some((algo, status));
        self
    }
}

pub struct SimulatedBackend {
    device: SimulatedDevice,
    properties: DeviceProperties,
    clock_ms: Rc<Cell<f64>>,
    live_bytes: Rc<Cell<usize>>,
    next_address: Cell<u64>,
    gemm_calls: Cell<usize>,
}

impl SimulatedBackend {
    pub fn new(device: SimulatedDevice) -> Self {
        let properties = DeviceProperties {
            name: device.name.clone(),
            compute_major: device.compute_major,
            compute_minor: device.compute_minor,
        };
        let next_address = Cell::new(BASE_ADDRESS + device.address_offset);
        Self {
            device,
            properties,
            clock_ms: Rc::new(Cell::new(0.0)),
            live_bytes: Rc::new(Cell::new(0)),
            next_address,
            gemm_calls: Cell::new(0),
        }
    }

    /// Open the simulated device at `ordinal`; only ordinal 0 exists
    pub fn open(ordinal: u32, device: SimulatedDevice) -> Result<Self> {
        if ordinal != 0 {
            return Err(ProfError::BackendUnavailable(format!(
                "the simulated backend has no device {ordinal}"
            )));
        }
        Ok(Self::new(device))
    }

    /// Number of GEMM calls issued so far, accepted or not
    pub fn gemm_calls(&self) -> usize {
        self.gemm_calls.get()
    }

    /// Bytes currently allocated and not yet released
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    /// Modeled duration of one accepted call
    pub fn modeled_time_ms(&self, args: &GemmArgs, algo: AlgorithmId) -> f64 {
        let gflops = self.device.peak_gflops * type_efficiency(args, algo) * algo_efficiency(algo);
        self.device.launch_overhead_ms + args.problem.flops() / (gflops * 1e9) * 1e3
    }

    fn admit(&self, args: &GemmArgs, algo: AlgorithmId) -> GemmStatus {
        if let Some((faulty, status)) = self.device.injected_fault {
            if faulty == algo {
                return status;
            }
        }

        if !arguments_in_range(args) {
            return GemmStatus::InvalidValue;
        }

        if args.types.uses_quantized_path() && !quantized_restrictions(&args.problem).all_meet() {
            return GemmStatus::NotSupported;
        }

        if algo.family() == AlgorithmFamily::Tensor {
            if !self.properties.has_tensor_cores() {
                return GemmStatus::NotSupported;
            }
            let report = tensor_core_restrictions(&args.problem, &args.types, args.addresses);
            if !report.all_meet() {
                return GemmStatus::NotSupported;
            }
        }

        // The highest-numbered general kernels have no complex variants
        if args.types.compute.is_complex() && algo.index().is_some_and(|i| i >= 18) {
            return GemmStatus::NotSupported;
        }

        GemmStatus::Success
    }
}

/// Scalars must match the compute type and strides must cover their operand
fn arguments_in_range(args: &GemmArgs) -> bool {
    let problem = &args.problem;
    let a_rows = match problem.trans_a() {
        Operation::NoTranspose => problem.m(),
        Operation::Transpose => problem.k(),
    };
    let b_rows = match problem.trans_b() {
        Operation::NoTranspose => problem.k(),
        Operation::Transpose => problem.n(),
    };
    let scalar_width = args.types.compute.size_bytes();

    args.alpha.as_bytes().len() == scalar_width
        && args.beta.as_bytes().len() == scalar_width
        && problem.lda() >= a_rows
        && problem.ldb() >= b_rows
        && problem.ldc() >= problem.m()
}

fn type_efficiency(args: &GemmArgs, algo: AlgorithmId) -> f64 {
    let tensor = algo.family() == AlgorithmFamily::Tensor;
    match args.types.compute {
        DataType::R16F if tensor => 8.0,
        DataType::R16F => 2.0,
        DataType::R32F if tensor && args.types.a == DataType::R16F => 8.0,
        DataType::R32F if tensor => 2.0,
        DataType::R32F => 1.0,
        DataType::R32I => 4.0,
        DataType::R64F => 0.5,
        DataType::C32F => 0.25,
        _ => 0.1,
    }
}

fn algo_efficiency(algo: AlgorithmId) -> f64 {
    match algo.index() {
        None => 1.0,
        // Spread explicit kernels deterministically around the default
        Some(i) => 1.0 / (0.85 + 0.03 * f64::from((u32::from(i) * 7) % 11)),
    }
}

impl GemmBackend for SimulatedBackend {
    fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn allocate(&self, bytes: usize) -> Result<Box<dyn DeviceBuffer>> {
        if self.live_bytes.get() + bytes > self.device.memory_bytes {
            return Err(ProfError::Runtime {
                call: "cudaMalloc",
                status: "cudaErrorMemoryAllocation".to_string(),
                file: file!(),
                line: line!(),
            });
        }

        let address = self.next_address.get();
        let span = (bytes as u64).div_ceil(ALLOCATION_GRANULARITY) * ALLOCATION_GRANULARITY;
        self.next_address.set(address + span.max(ALLOCATION_GRANULARITY));
        self.live_bytes.set(self.live_bytes.get() + bytes);
        debug!("Simulated allocation of {} bytes at {:#x}", bytes, address);

        Ok(Box::new(SimulatedBuffer {
            address,
            size: bytes,
            live_bytes: Rc::clone(&self.live_bytes),
            released: false,
        }))
    }

    fn create_timer(&self) -> Result<Box<dyn DeviceTimer>> {
        Ok(Box::new(SimulatedTimer {
            clock_ms: Rc::clone(&self.clock_ms),
            start: Cell::new(None),
            stop: Cell::new(None),
        }))
    }

    fn gemm(&self, args: &GemmArgs, algo: AlgorithmId) -> GemmStatus {
        self.gemm_calls.set(self.gemm_calls.get() + 1);
        let status = self.admit(args, algo);
        if status == GemmStatus::Success {
            let elapsed = self.modeled_time_ms(args, algo);
            self.clock_ms.set(self.clock_ms.get() + elapsed);
        }
        status
    }
}

struct SimulatedBuffer {
    address: u64,
    size: usize,
    live_bytes: Rc<Cell<usize>>,
    released: bool,
}

impl DeviceBuffer for SimulatedBuffer {
    fn address(&self) -> u64 {
        self.address
    }

    fn size(&self) -> usize {
        self.size
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.live_bytes.set(self.live_bytes.get() - self.size);
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for SimulatedBuffer {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

struct SimulatedTimer {
    clock_ms: Rc<Cell<f64>>,
    start: Cell<Option<f64>>,
    stop: Cell<Option<f64>>,
}

impl DeviceTimer for SimulatedTimer {
    fn start(&self) -> Result<()> {
        self.start.set(Some(self.clock_ms.get()));
        self.stop.set(None);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stop.set(Some(self.clock_ms.get()));
        Ok(())
    }

    fn elapsed_ms(&self) -> Result<f32> {
        match (self.start.get(), self.stop.get()) {
            (Some(start), Some(stop)) => Ok((stop - start) as f32),
            _ => Err(ProfError::Runtime {
                call: "cudaEventElapsedTime",
                status: "cudaErrorInvalidResourceHandle".to_string(),
                file: file!(),
                line: line!(),
            }),
        }
    }
}
