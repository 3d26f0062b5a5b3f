//! Compute backend seam
//!
//! The profiler drives GEMM through [`GemmBackend`]; device allocation,
//! event timing and the kernel itself live behind it. Two implementations are
//! provided:
//! - [`cuda::CudaBackend`] (feature `cuda`): cuBLAS `GemmEx` on an NVIDIA device
//! - [`simulated::SimulatedBackend`]: deterministic performance model for
//!   hardware-less runs and tests

#[cfg(feature = "cuda")]
pub mod cuda;
pub mod simulated;

use std::fmt;

use crate::catalog::{AlgorithmId, Scalar, TypeCombination};
use crate::eligibility::OperandAddresses;
use crate::error::Result;
use crate::problem::ProblemSpec;

pub use simulated::{SimulatedBackend, SimulatedDevice};

/// Status returned by a GEMM invocation (`cublasStatus_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GemmStatus {
    Success,
    NotInitialized,
    AllocFailed,
    InvalidValue,
    ArchMismatch,
    MappingError,
    ExecutionFailed,
    InternalError,
    NotSupported,
    LicenseError,
    Unknown(i32),
}

/// Three-bucket taxonomy applied to every status inside the repeat loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// The algorithm cannot run this configuration; an expected outcome
    BenignReject,
    Fatal,
}

impl GemmStatus {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => GemmStatus::Success,
            1 => GemmStatus::NotInitialized,
            3 => GemmStatus::AllocFailed,
            7 => GemmStatus::InvalidValue,
            8 => GemmStatus::ArchMismatch,
            11 => GemmStatus::MappingError,
            13 => GemmStatus::ExecutionFailed,
            14 => GemmStatus::InternalError,
            15 => GemmStatus::NotSupported,
            16 => GemmStatus::LicenseError,
            other => GemmStatus::Unknown(other),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            GemmStatus::Success => 0,
            GemmStatus::NotInitialized => 1,
            GemmStatus::AllocFailed => 3,
            GemmStatus::InvalidValue => 7,
            GemmStatus::ArchMismatch => 8,
            GemmStatus::MappingError => 11,
            GemmStatus::ExecutionFailed => 13,
            GemmStatus::InternalError => 14,
            GemmStatus::NotSupported => 15,
            GemmStatus::LicenseError => 16,
            GemmStatus::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GemmStatus::Success => "CUBLAS_STATUS_SUCCESS",
            GemmStatus::NotInitialized => "CUBLAS_STATUS_NOT_INITIALIZED",
            GemmStatus::AllocFailed => "CUBLAS_STATUS_ALLOC_FAILED",
            GemmStatus::InvalidValue => "CUBLAS_STATUS_INVALID_VALUE",
            GemmStatus::ArchMismatch => "CUBLAS_STATUS_ARCH_MISMATCH",
            GemmStatus::MappingError => "CUBLAS_STATUS_MAPPING_ERROR",
            GemmStatus::ExecutionFailed => "CUBLAS_STATUS_EXECUTION_FAILED",
            GemmStatus::InternalError => "CUBLAS_STATUS_INTERNAL_ERROR",
            GemmStatus::NotSupported => "CUBLAS_STATUS_NOT_SUPPORTED",
            GemmStatus::LicenseError => "CUBLAS_STATUS_LICENSE_ERROR",
            GemmStatus::Unknown(_) => "CUBLAS_STATUS_UNKNOWN",
        }
    }

    pub fn class(self) -> StatusClass {
        match self {
            GemmStatus::Success => StatusClass::Success,
            GemmStatus::NotSupported | GemmStatus::InvalidValue => StatusClass::BenignReject,
            _ => StatusClass::Fatal,
        }
    }
}

impl fmt::Display for GemmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemmStatus::Unknown(raw) => write!(f, "{} ({raw})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Properties of the selected device that the sweep depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    pub compute_major: i32,
    pub compute_minor: i32,
}

impl DeviceProperties {
    /// Tensor-core kernels exist from compute capability 7.0 on
    pub fn has_tensor_cores(&self) -> bool {
        self.compute_major > 6
    }
}

/// Device-resident allocation owned by the driver
pub trait DeviceBuffer {
    /// Device address, used for alignment checks and passed to the kernel
    fn address(&self) -> u64;

    fn size(&self) -> usize;

    /// Free the allocation; dropping an unreleased buffer frees it too
    fn release(&mut self) -> Result<()>;
}

/// Device-side event pair timing one window of queued work
pub trait DeviceTimer {
    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// Block until the stop event completes and return the window in ms
    fn elapsed_ms(&self) -> Result<f32>;
}

/// Arguments of one GEMM configuration, identical for every repeat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GemmArgs {
    pub problem: ProblemSpec,
    pub types: TypeCombination,
    pub addresses: OperandAddresses,
    pub alpha: Scalar,
    pub beta: Scalar,
}

pub trait GemmBackend {
    fn properties(&self) -> &DeviceProperties;

    fn allocate(&self, bytes: usize) -> Result<Box<dyn DeviceBuffer>>;

    fn create_timer(&self) -> Result<Box<dyn DeviceTimer>>;

    /// Enqueue one GEMM. The status is classified by the caller.
    fn gemm(&self, args: &GemmArgs, algo: AlgorithmId) -> GemmStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(GemmStatus::Success.class(), StatusClass::Success);
        assert_eq!(GemmStatus::NotSupported.class(), StatusClass::BenignReject);
        assert_eq!(GemmStatus::InvalidValue.class(), StatusClass::BenignReject);
        assert_eq!(GemmStatus::ExecutionFailed.class(), StatusClass::Fatal);
        assert_eq!(GemmStatus::ArchMismatch.class(), StatusClass::Fatal);
        assert_eq!(GemmStatus::Unknown(42).class(), StatusClass::Fatal);
    }

    #[test]
    fn test_status_raw_round_trip_for_known_codes() {
        for raw in [0, 1, 3, 7, 8, 11, 13, 14, 15, 16] {
            assert_eq!(GemmStatus::from_raw(raw).raw(), raw);
            assert!(!matches!(GemmStatus::from_raw(raw), GemmStatus::Unknown(_)));
        }
        assert_eq!(GemmStatus::from_raw(2), GemmStatus::Unknown(2));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            GemmStatus::NotSupported.to_string(),
            "CUBLAS_STATUS_NOT_SUPPORTED"
        );
        assert_eq!(GemmStatus::Unknown(42).to_string(), "CUBLAS_STATUS_UNKNOWN (42)");
    }

    #[test]
    fn test_tensor_core_gate() {
        let mut props = DeviceProperties {
            name: "test".to_string(),
            compute_major: 6,
            compute_minor: 1,
        };
        assert!(!props.has_tensor_cores());
        props.compute_major = 7;
        assert!(props.has_tensor_cores());
    }
}
