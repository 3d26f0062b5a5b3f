//! Device event timing on the default stream

use super::ffi::{
    cudaEventCreate, cudaEventDestroy, cudaEventElapsedTime, cudaEventRecord,
    cudaEventSynchronize, cudaEvent_t,
};
use crate::backend::DeviceTimer;
use crate::error::Result;
use crate::runtime_check;

pub struct CudaTimer {
    start: cudaEvent_t,
    stop: cudaEvent_t,
}

impl CudaTimer {
    pub fn new() -> Result<Self> {
        let mut start: cudaEvent_t = std::ptr::null_mut();
        let mut stop: cudaEvent_t = std::ptr::null_mut();

        // SAFETY: event handles are written by the runtime and destroyed in Drop.
        unsafe {
            runtime_check!(cudaEventCreate(&mut start), "cudaEventCreate");
            let status = cudaEventCreate(&mut stop);
            if status != super::ffi::cudaSuccess {
                cudaEventDestroy(start);
                runtime_check!(status, "cudaEventCreate");
            }
        }

        Ok(Self { start, stop })
    }
}

impl DeviceTimer for CudaTimer {
    fn start(&self) -> Result<()> {
        // SAFETY: `start` is a live event; the null stream is the default stream.
        unsafe {
            runtime_check!(
                cudaEventRecord(self.start, std::ptr::null_mut()),
                "cudaEventRecord"
            );
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        // SAFETY: as in `start`.
        unsafe {
            runtime_check!(
                cudaEventRecord(self.stop, std::ptr::null_mut()),
                "cudaEventRecord"
            );
        }
        Ok(())
    }

    fn elapsed_ms(&self) -> Result<f32> {
        let mut elapsed: f32 = 0.0;
        // SAFETY: both events are live and recorded on the same stream.
        unsafe {
            runtime_check!(cudaEventSynchronize(self.stop), "cudaEventSynchronize");
            runtime_check!(
                cudaEventElapsedTime(&mut elapsed, self.start, self.stop),
                "cudaEventElapsedTime"
            );
        }
        Ok(elapsed)
    }
}

impl Drop for CudaTimer {
    fn drop(&mut self) {
        // SAFETY: both events were created in `new` and are destroyed once.
        unsafe {
            cudaEventDestroy(self.start);
            cudaEventDestroy(self.stop);
        }
    }
}
