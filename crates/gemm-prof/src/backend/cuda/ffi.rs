//! Raw bindings to the CUDA runtime, the CUDA driver (device name only) and
//! cuBLAS `GemmEx`.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use std::ffi::CStr;

use libc::{c_char, c_float, c_int, c_uint, c_void};

use crate::catalog::DataType;

// ============================================================================
// CUDA runtime
// ============================================================================

pub type cudaError_t = c_int;
pub type cudaStream_t = *mut c_void;
pub type cudaEvent_t = *mut c_void;
pub type cudaDeviceAttr = c_int;

pub const cudaSuccess: cudaError_t = 0;

pub const cudaDevAttrComputeCapabilityMajor: cudaDeviceAttr = 75;
pub const cudaDevAttrComputeCapabilityMinor: cudaDeviceAttr = 76;

#[link(name = "cudart")]
extern "C" {
    pub fn cudaSetDevice(device: c_int) -> cudaError_t;
    pub fn cudaDeviceGetAttribute(
        value: *mut c_int,
        attr: cudaDeviceAttr,
        device: c_int,
    ) -> cudaError_t;
    pub fn cudaGetErrorName(error: cudaError_t) -> *const c_char;

    pub fn cudaMalloc(devPtr: *mut *mut c_void, size: usize) -> cudaError_t;
    pub fn cudaFree(devPtr: *mut c_void) -> cudaError_t;

    pub fn cudaEventCreate(event: *mut cudaEvent_t) -> cudaError_t;
    pub fn cudaEventDestroy(event: cudaEvent_t) -> cudaError_t;
    pub fn cudaEventRecord(event: cudaEvent_t, stream: cudaStream_t) -> cudaError_t;
    pub fn cudaEventSynchronize(event: cudaEvent_t) -> cudaError_t;
    pub fn cudaEventElapsedTime(
        ms: *mut c_float,
        start: cudaEvent_t,
        end: cudaEvent_t,
    ) -> cudaError_t;
}

/// Symbolic name of a runtime status, e.g. `cudaErrorMemoryAllocation`
pub fn error_name(status: cudaError_t) -> String {
    // SAFETY: cudaGetErrorName returns a pointer to a static NUL-terminated
    // string, or null for codes the runtime does not know.
    unsafe {
        let name = cudaGetErrorName(status);
        if name.is_null() {
            format!("cudaError({status})")
        } else {
            CStr::from_ptr(name).to_string_lossy().into_owned()
        }
    }
}

// ============================================================================
// CUDA driver
// ============================================================================

pub type CUresult = c_int;
pub type CUdevice = c_int;

pub const CUDA_SUCCESS: CUresult = 0;

#[link(name = "cuda")]
extern "C" {
    pub fn cuInit(flags: c_uint) -> CUresult;
    pub fn cuDeviceGet(device: *mut CUdevice, ordinal: c_int) -> CUresult;
    pub fn cuDeviceGetName(name: *mut c_char, len: c_int, dev: CUdevice) -> CUresult;
}

// ============================================================================
// cuBLAS
// ============================================================================

pub type cublasHandle_t = *mut c_void;
pub type cublasStatus_t = c_int;
pub type cublasOperation_t = c_int;
pub type cublasComputeType_t = c_int;
pub type cudaDataType_t = c_int;
pub type cublasGemmAlgo_t = c_int;

pub const CUBLAS_COMPUTE_16F: cublasComputeType_t = 64;
pub const CUBLAS_COMPUTE_32F: cublasComputeType_t = 68;
pub const CUBLAS_COMPUTE_64F: cublasComputeType_t = 70;
pub const CUBLAS_COMPUTE_32I: cublasComputeType_t = 72;

#[link(name = "cublas")]
extern "C" {
    pub fn cublasCreate_v2(handle: *mut cublasHandle_t) -> cublasStatus_t;
    pub fn cublasDestroy_v2(handle: cublasHandle_t) -> cublasStatus_t;

    pub fn cublasGemmEx(
        handle: cublasHandle_t,
        transa: cublasOperation_t,
        transb: cublasOperation_t,
        m: c_int,
        n: c_int,
        k: c_int,
        alpha: *const c_void,
        A: *const c_void,
        Atype: cudaDataType_t,
        lda: c_int,
        B: *const c_void,
        Btype: cudaDataType_t,
        ldb: c_int,
        beta: *const c_void,
        C: *mut c_void,
        Ctype: cudaDataType_t,
        ldc: c_int,
        computeType: cublasComputeType_t,
        algo: cublasGemmAlgo_t,
    ) -> cublasStatus_t;
}

/// `cublasComputeType_t` accumulating in the precision of `compute`.
/// Complex types accumulate in the precision of their components.
pub fn compute_type(compute: DataType) -> cublasComputeType_t {
    match compute {
        DataType::R16F => CUBLAS_COMPUTE_16F,
        DataType::R32I | DataType::R8I | DataType::C8I => CUBLAS_COMPUTE_32I,
        DataType::R32F | DataType::C32F => CUBLAS_COMPUTE_32F,
        DataType::R64F | DataType::C64F => CUBLAS_COMPUTE_64F,
    }
}
