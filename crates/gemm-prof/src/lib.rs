//! GEMM profiler
//!
//! Sweeps GEMM type combinations, algorithms and transpose modes on one
//! device and reports, per combination and algorithm family, the first
//! algorithm's result and the fastest one.

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod driver;
pub mod eligibility;
pub mod error;
pub mod problem;
pub mod profiler;
pub mod report;

// Re-export commonly used items for convenience
pub use backend::{GemmBackend, GemmStatus, SimulatedBackend, SimulatedDevice};
pub use catalog::{AlgorithmFamily, AlgorithmId, AlgorithmSelection, DataType, TypeCombination};
pub use config::{load_config, ProfilerConfig};
pub use driver::{Driver, RunPlan};
pub use error::{ProfError, Result};
pub use problem::{Operation, ProblemSpec};
pub use profiler::{MeasurementSample, Profiler, Sweep};
