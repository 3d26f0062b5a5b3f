use super::sample::{compare_time, MeasurementSample};

/// Samples of one profiling run, kept in the order the algorithms ran
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sweep {
    samples: Vec<MeasurementSample>,
}

impl Sweep {
    pub fn new(samples: Vec<MeasurementSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[MeasurementSample] {
        &self.samples
    }

    /// Sample of the first algorithm that ran; reported for single-algorithm runs
    pub fn first(&self) -> Option<&MeasurementSample> {
        self.samples.first()
    }

    /// Ascending by time, NaN last; ties keep their run order
    pub fn ranked(&self) -> Vec<MeasurementSample> {
        let mut ranked = self.samples.clone();
        ranked.sort_by(|a, b| compare_time(a.time_ms, b.time_ms));
        ranked
    }

    /// Head of [`Sweep::ranked`]
    pub fn fastest(&self) -> Option<&MeasurementSample> {
        self.samples
            .iter()
            .min_by(|a, b| compare_time(a.time_ms, b.time_ms))
    }
}
