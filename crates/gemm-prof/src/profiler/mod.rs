//! Profiling engine
//!
//! Times every algorithm of a family against one fixed GEMM configuration.
//! Each algorithm gets its own device-timed window of `repeats` back-to-back
//! calls. Benign rejections and fatal statuses become NaN samples instead of
//! errors, so one bad kernel never ends the sweep of its siblings.

pub mod sample;
pub mod sweep;

use tracing::{debug, error, trace};

pub use sample::{compare_time, gflops, MeasurementSample, SampleOutcome};
pub use sweep::Sweep;

use crate::backend::{GemmArgs, GemmBackend, StatusClass};
use crate::catalog::AlgorithmId;
use crate::error::{ProfError, Result};

pub struct Profiler<'a, B: GemmBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: GemmBackend + ?Sized> Profiler<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Measure each algorithm in order and return the samples in that order.
    ///
    /// Errors are reserved for timer failures; backend statuses are folded
    /// into the samples.
    pub fn profile(
        &self,
        args: &GemmArgs,
        algorithms: &[AlgorithmId],
        repeats: u32,
    ) -> Result<Sweep> {
        if repeats == 0 {
            return Err(ProfError::invalid_config(
                "repeats",
                repeats,
                "at least one call per algorithm is required",
            ));
        }

        let timer = self.backend.create_timer()?;
        let flops = args.problem.flops();
        let mut samples = Vec::with_capacity(algorithms.len());

        for &algo in algorithms {
            timer.start()?;
            let mut outcome = SampleOutcome::Measured;

            for call in 0..repeats {
                let status = self.backend.gemm(args, algo);
                match status.class() {
                    StatusClass::Success => {}
                    StatusClass::BenignReject => {
                        if outcome == SampleOutcome::Measured {
                            debug!("{} rejected {}: {}", algo, args.types.compute, status);
                            outcome = SampleOutcome::Rejected(status);
                        }
                    }
                    StatusClass::Fatal => {
                        error!(
                            "GemmEx with {} failed with status {} on call {}",
                            algo, status, call
                        );
                        outcome = SampleOutcome::Faulted(status);
                        break;
                    }
                }
            }

            timer.stop()?;

            let sample = match outcome {
                SampleOutcome::Measured => {
                    let elapsed = f64::from(timer.elapsed_ms()?);
                    MeasurementSample::measured(algo, flops, elapsed / f64::from(repeats))
                }
                SampleOutcome::Rejected(_) => {
                    // Drain the window so the next algorithm starts on an idle device
                    timer.elapsed_ms()?;
                    MeasurementSample::unmeasured(algo, outcome)
                }
                SampleOutcome::Faulted(_) => MeasurementSample::unmeasured(algo, outcome),
            };
            trace!(
                "{}: {:?} time={} ms gflops={}",
                algo,
                sample.outcome,
                sample.time_ms,
                sample.gflops
            );
            samples.push(sample);
        }

        Ok(Sweep::new(samples))
    }
}
