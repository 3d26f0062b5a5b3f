//! Error handling for gemm-prof
//!
//! Library code returns [`ProfError`]; the binary wraps it in `anyhow` for
//! context. Errors here are the fatal-infrastructure bucket: anything that
//! reaches `main` terminates the run with a non-zero exit code.
//!
//! Backend statuses returned from inside the profiling repeat loop never
//! become a `ProfError`; the profiler classifies them on the spot (see
//! [`GemmStatus::class`](crate::backend::GemmStatus::class)).

use thiserror::Error;

/// Errors that abort a profiling run
#[derive(Error, Debug)]
pub enum ProfError {
    /// A device runtime call (allocation, events, device queries) failed
    #[error("{file}:{line}: error: function {call} failed with error {status}.")]
    Runtime {
        call: &'static str,
        status: String,
        file: &'static str,
        line: u32,
    },

    /// A BLAS library call outside the repeat loop failed (handle creation etc.)
    #[error("{file}:{line}: error: function {call} failed with error {status}.")]
    Cublas {
        call: &'static str,
        status: String,
        file: &'static str,
        line: u32,
    },

    /// Malformed run selection (type id, algorithm id, dimension, repeat count)
    #[error("Invalid configuration value for {key}: {value} ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// Configuration sources could not be read or merged
    #[error("Failed to load configuration: {details}")]
    Configuration { details: String },

    /// The requested backend is not available in this build or on this host
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Writing the report failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfError {
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ProfError::InvalidConfig {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProfError>;

/// Check a CUDA runtime status, returning [`ProfError::Runtime`] from the
/// enclosing function with the call site when it is not `cudaSuccess`.
#[cfg(feature = "cuda")]
#[macro_export]
macro_rules! runtime_check {
    ($call:expr, $name:literal) => {{
        let status = $call;
        if status != $crate::backend::cuda::ffi::cudaSuccess {
            return Err($crate::error::ProfError::Runtime {
                call: $name,
                status: $crate::backend::cuda::ffi::error_name(status),
                file: file!(),
                line: line!(),
            });
        }
    }};
}

/// Same as `runtime_check!` for BLAS library statuses.
#[macro_export]
macro_rules! cublas_check {
    ($call:expr, $name:literal) => {{
        let status = $crate::backend::GemmStatus::from_raw($call);
        if status != $crate::backend::GemmStatus::Success {
            return Err($crate::error::ProfError::Cublas {
                call: $name,
                status: status.name().to_string(),
                file: file!(),
                line: line!(),
            });
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_names_call_site() {
        let err = ProfError::Runtime {
            call: "cudaMalloc",
            status: "cudaErrorMemoryAllocation".to_string(),
            file: "src/backend/cuda/buffer.rs",
            line: 42,
        };

        assert_eq!(
            err.to_string(),
            "src/backend/cuda/buffer.rs:42: error: function cudaMalloc failed with error cudaErrorMemoryAllocation."
        );
    }

    #[test]
    fn test_invalid_config_message() {
        let err = ProfError::invalid_config("type", 9, "type combination ids range over 0..=8");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for type: 9 (type combination ids range over 0..=8)"
        );
    }

    fn failing() -> Result<()> {
        cublas_check!(13, "cublasCreate_v2");
        Ok(())
    }

    #[test]
    fn test_cublas_check_returns_error_with_status_name() {
        let err = failing().unwrap_err();
        match err {
            ProfError::Cublas { call, status, file, .. } => {
                assert_eq!(call, "cublasCreate_v2");
                assert_eq!(status, "CUBLAS_STATUS_EXECUTION_FAILED");
                assert!(file.ends_with("error.rs"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
