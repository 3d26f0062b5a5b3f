//! Per-algorithm measurement record

use std::cmp::Ordering;

use crate::backend::GemmStatus;
use crate::catalog::AlgorithmId;

/// How an algorithm's timing window ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Every repeat succeeded
    Measured,
    /// The backend declined the configuration (unsupported or invalid value)
    Rejected(GemmStatus),
    /// A fatal backend status aborted the repeat loop
    Faulted(GemmStatus),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSample {
    pub algorithm: AlgorithmId,
    pub outcome: SampleOutcome,
    /// Average time per call in milliseconds, NaN unless measured
    pub time_ms: f64,
    /// Throughput in GFLOP/s, NaN unless measured
    pub gflops: f64,
}

impl MeasurementSample {
    pub fn measured(algorithm: AlgorithmId, flops: f64, average_ms: f64) -> Self {
        Self {
            algorithm,
            outcome: SampleOutcome::Measured,
            time_ms: average_ms,
            gflops: gflops(flops, average_ms),
        }
    }

    pub fn unmeasured(algorithm: AlgorithmId, outcome: SampleOutcome) -> Self {
        Self {
            algorithm,
            outcome,
            time_ms: f64::NAN,
            gflops: f64::NAN,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.outcome == SampleOutcome::Measured
    }
}

/// GFLOP/s from a flop count and a per-call time in milliseconds
pub fn gflops(flops: f64, average_ms: f64) -> f64 {
    flops / (average_ms * 1e-3) / 1e9
}

/// Ascending order on times with NaN greater than every number and equal to
/// itself, so sorting is total and faulted samples always land last.
pub fn compare_time(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
