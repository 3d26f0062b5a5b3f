//! cuBLAS backend
//!
//! Binds one device for the lifetime of the backend, creates a cuBLAS handle
//! on it and issues `cublasGemmEx` on the default stream.

pub mod buffer;
pub mod ffi;
pub mod handle;
pub mod timer;

use libc::{c_char, c_int, c_void};
use tracing::info;

pub use buffer::CudaBuffer;
pub use handle::CublasHandle;
pub use timer::CudaTimer;

use super::{DeviceBuffer, DeviceProperties, DeviceTimer, GemmArgs, GemmBackend, GemmStatus};
use crate::catalog::AlgorithmId;
use crate::error::{ProfError, Result};
use crate::runtime_check;

const DEVICE_NAME_CAPACITY: usize = 256;

pub struct CudaBackend {
    properties: DeviceProperties,
    handle: CublasHandle,
}

impl CudaBackend {
    pub fn new(device: u32) -> Result<Self> {
        let ordinal = c_int::try_from(device).map_err(|_| {
            ProfError::invalid_config("device", device, "device ordinal out of range")
        })?;

        let mut major: c_int = 0;
        let mut minor: c_int = 0;
        // SAFETY: plain runtime queries writing into local integers.
        unsafe {
            runtime_check!(ffi::cudaSetDevice(ordinal), "cudaSetDevice");
            runtime_check!(
                ffi::cudaDeviceGetAttribute(
                    &mut major,
                    ffi::cudaDevAttrComputeCapabilityMajor,
                    ordinal
                ),
                "cudaDeviceGetAttribute"
            );
            runtime_check!(
                ffi::cudaDeviceGetAttribute(
                    &mut minor,
                    ffi::cudaDevAttrComputeCapabilityMinor,
                    ordinal
                ),
                "cudaDeviceGetAttribute"
            );
        }

        let properties = DeviceProperties {
            name: device_name(ordinal)?,
            compute_major: major,
            compute_minor: minor,
        };
        info!(
            "Using device {}: {} (compute capability {}.{})",
            device, properties.name, major, minor
        );

        Ok(Self {
            properties,
            handle: CublasHandle::new()?,
        })
    }
}

fn driver_error(call: &'static str, status: ffi::CUresult) -> ProfError {
    ProfError::Runtime {
        call,
        status: format!("CUresult({status})"),
        file: file!(),
        line: line!(),
    }
}

fn device_name(ordinal: c_int) -> Result<String> {
    let mut device: ffi::CUdevice = 0;
    let mut name = [0 as c_char; DEVICE_NAME_CAPACITY];

    // SAFETY: the driver writes at most `len` bytes, NUL included, into `name`.
    unsafe {
        let status = ffi::cuInit(0);
        if status != ffi::CUDA_SUCCESS {
            return Err(driver_error("cuInit", status));
        }
        let status = ffi::cuDeviceGet(&mut device, ordinal);
        if status != ffi::CUDA_SUCCESS {
            return Err(driver_error("cuDeviceGet", status));
        }
        let status = ffi::cuDeviceGetName(name.as_mut_ptr(), name.len() as c_int, device);
        if status != ffi::CUDA_SUCCESS {
            return Err(driver_error("cuDeviceGetName", status));
        }
    }

    let bytes: Vec<u8> = name
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl GemmBackend for CudaBackend {
    fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn allocate(&self, bytes: usize) -> Result<Box<dyn DeviceBuffer>> {
        Ok(Box::new(CudaBuffer::new(bytes)?))
    }

    fn create_timer(&self) -> Result<Box<dyn DeviceTimer>> {
        Ok(Box::new(CudaTimer::new()?))
    }

    fn gemm(&self, args: &GemmArgs, algo: AlgorithmId) -> GemmStatus {
        let problem = &args.problem;
        let types = &args.types;
        // Dimensions are bounded by i32::MAX when the problem is built
        let status = unsafe {
            // SAFETY: operand addresses come from live CudaBuffers sized for
            // this problem; alpha and beta outlive the call.
            ffi::cublasGemmEx(
                self.handle.as_ptr(),
                problem.trans_a().raw(),
                problem.trans_b().raw(),
                problem.m() as c_int,
                problem.n() as c_int,
                problem.k() as c_int,
                args.alpha.as_ptr() as *const c_void,
                args.addresses.a as *const c_void,
                types.a.raw(),
                problem.lda() as c_int,
                args.addresses.b as *const c_void,
                types.b.raw(),
                problem.ldb() as c_int,
                args.beta.as_ptr() as *const c_void,
                args.addresses.c as *mut c_void,
                types.c.raw(),
                problem.ldc() as c_int,
                ffi::compute_type(types.compute),
                algo.raw(),
            )
        };
        GemmStatus::from_raw(status)
    }
}
