use std::marker::PhantomData;

use super::ffi::{cublasCreate_v2, cublasDestroy_v2, cublasHandle_t};
use crate::cublas_check;
use crate::error::Result;

/// Owned cuBLAS context bound to the current device
pub struct CublasHandle {
    handle: cublasHandle_t,
    _not_sync: PhantomData<*const ()>,
}

impl CublasHandle {
    pub fn new() -> Result<Self> {
        let mut handle: cublasHandle_t = std::ptr::null_mut();
        // SAFETY: cublasCreate writes a handle that is destroyed in Drop.
        unsafe {
            cublas_check!(cublasCreate_v2(&mut handle), "cublasCreate_v2");
        }
        Ok(Self {
            handle,
            _not_sync: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> cublasHandle_t {
        self.handle
    }
}

impl Drop for CublasHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: the handle was created in `new` and is destroyed once.
            unsafe {
                cublasDestroy_v2(self.handle);
            }
        }
    }
}
