//! Alignment and divisibility restrictions of the quantized (DP4A) and
//! tensor-core GEMM paths.
//!
//! The reports are diagnostics for the reader of the output table. They never
//! filter the algorithm list: the backend itself rejects an ineligible
//! algorithm and the profiler records that as an unsupported result.

use std::fmt;

use crate::catalog::{DataType, TypeCombination};
use crate::problem::ProblemSpec;

/// Rendered in place of a report whose restriction family does not apply
pub const NOT_APPLICABLE: &str = "NA, ";

const ADDRESS_ALIGNMENT: u64 = 16;

/// Device addresses of the three GEMM operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandAddresses {
    pub a: u64,
    pub b: u64,
    pub c: u64,
}

/// Outcome of every predicate of one restriction family, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReport {
    mask: Vec<bool>,
}

impl EligibilityReport {
    pub fn new(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn all_meet(&self) -> bool {
        self.mask.iter().all(|bit| *bit)
    }

    /// `all meet, ` when every predicate holds, else each bit followed by `.`
    pub fn render(&self) -> String {
        if self.all_meet() {
            return "all meet, ".to_string();
        }
        let mut rendered: String = self
            .mask
            .iter()
            .map(|bit| if *bit { "1." } else { "0." })
            .collect();
        rendered.push_str(", ");
        rendered
    }
}

impl fmt::Display for EligibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// DP4A stride restrictions: `lda % 4 == 0`, `ldb % 4 == 0`.
pub fn quantized_restrictions(problem: &ProblemSpec) -> EligibilityReport {
    EligibilityReport::new(vec![problem.lda() % 4 == 0, problem.ldb() % 4 == 0])
}

/// Quantized report for the output table, or [`NOT_APPLICABLE`] when the
/// combination does not accumulate in 32-bit integers.
pub fn quantized_field(problem: &ProblemSpec, types: &TypeCombination) -> String {
    if types.uses_quantized_path() {
        quantized_restrictions(problem).render()
    } else {
        NOT_APPLICABLE.to_string()
    }
}

/// Tensor-core restrictions, in order: m, k, A/B/C address alignment,
/// lda/ldb/ldc in whole 16-byte vectors of the operand's element type.
pub fn tensor_core_restrictions(
    problem: &ProblemSpec,
    types: &TypeCombination,
    addresses: OperandAddresses,
) -> EligibilityReport {
    EligibilityReport::new(vec![
        problem.m() % 4 == 0,
        problem.k() % 8 == 0,
        addresses.a % ADDRESS_ALIGNMENT == 0,
        addresses.b % ADDRESS_ALIGNMENT == 0,
        addresses.c % ADDRESS_ALIGNMENT == 0,
        stride_aligned(problem.lda(), types.a),
        stride_aligned(problem.ldb(), types.b),
        stride_aligned(problem.ldc(), types.c),
    ])
}

fn stride_aligned(stride: u32, dtype: DataType) -> bool {
    let elements_per_vector = ADDRESS_ALIGNMENT as usize / dtype.size_bytes();
    stride as usize % elements_per_vector == 0
}
