use libc::c_void;

use super::ffi::{cudaFree, cudaMalloc};
use crate::backend::DeviceBuffer;
use crate::error::Result;
use crate::runtime_check;

/// RAII wrapper for a `cudaMalloc` allocation
pub struct CudaBuffer {
    ptr: *mut c_void,
    size: usize,
}

impl CudaBuffer {
    pub fn new(size: usize) -> Result<Self> {
        let mut ptr: *mut c_void = std::ptr::null_mut();
        // SAFETY: cudaMalloc writes a device pointer into `ptr`.
        unsafe {
            runtime_check!(cudaMalloc(&mut ptr, size), "cudaMalloc");
        }
        Ok(Self { ptr, size })
    }
}

impl DeviceBuffer for CudaBuffer {
    fn address(&self) -> u64 {
        self.ptr as u64
    }

    fn size(&self) -> usize {
        self.size
    }

    fn release(&mut self) -> Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        let ptr = std::mem::replace(&mut self.ptr, std::ptr::null_mut());
        // SAFETY: `ptr` came from cudaMalloc and is freed exactly once.
        unsafe {
            runtime_check!(cudaFree(ptr), "cudaFree");
        }
        Ok(())
    }
}

impl Drop for CudaBuffer {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!("{}", err);
        }
    }
}
