//! GEMM problem shape and leading dimensions

use std::fmt;

use crate::error::{ProfError, Result};

/// Operand transpose mode (`cublasOperation_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    #[default]
    NoTranspose,
    Transpose,
}

impl Operation {
    pub fn from_flag(transpose: bool) -> Self {
        if transpose {
            Operation::Transpose
        } else {
            Operation::NoTranspose
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Operation::NoTranspose => 0,
            Operation::Transpose => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::NoTranspose => "CUBLAS_OP_N",
            Operation::Transpose => "CUBLAS_OP_T",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed per-run problem: `C[m×n] = op(A)[m×k] · op(B)[k×n]`, column-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemSpec {
    m: u32,
    n: u32,
    k: u32,
    trans_a: Operation,
    trans_b: Operation,
    lda: u32,
    ldb: u32,
    ldc: u32,
}

impl ProblemSpec {
    /// Derive leading dimensions from the shape and transpose modes.
    pub fn new(m: u32, n: u32, k: u32, trans_a: Operation, trans_b: Operation) -> Result<Self> {
        for (key, value) in [("m", m), ("n", n), ("k", k)] {
            if value == 0 {
                return Err(ProfError::invalid_config(
                    key,
                    value,
                    "dimensions must be positive",
                ));
            }
            if value > i32::MAX as u32 {
                return Err(ProfError::invalid_config(
                    key,
                    value,
                    "dimensions must fit the backend's 32-bit integer arguments",
                ));
            }
        }

        let lda = match trans_a {
            Operation::NoTranspose => m,
            Operation::Transpose => k,
        };
        let ldb = match trans_b {
            Operation::NoTranspose => k,
            Operation::Transpose => n,
        };

        Ok(Self {
            m,
            n,
            k,
            trans_a,
            trans_b,
            lda,
            ldb,
            ldc: m,
        })
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn trans_a(&self) -> Operation {
        self.trans_a
    }

    pub fn trans_b(&self) -> Operation {
        self.trans_b
    }

    pub fn lda(&self) -> u32 {
        self.lda
    }

    pub fn ldb(&self) -> u32 {
        self.ldb
    }

    pub fn ldc(&self) -> u32 {
        self.ldc
    }

    /// Floating-point operations of one GEMM: one multiply and one add per
    /// output element per k step.
    pub fn flops(&self) -> f64 {
        2.0 * f64::from(self.m) * f64::from(self.n) * f64::from(self.k)
    }

    pub fn a_elements(&self) -> usize {
        self.m as usize * self.k as usize
    }

    pub fn b_elements(&self) -> usize {
        self.k as usize * self.n as usize
    }

    pub fn c_elements(&self) -> usize {
        self.m as usize * self.n as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_without_transpose() {
        let problem =
            ProblemSpec::new(64, 16, 32, Operation::NoTranspose, Operation::NoTranspose).unwrap();
        assert_eq!(problem.lda(), 64);
        assert_eq!(problem.ldb(), 32);
        assert_eq!(problem.ldc(), 64);
    }

    #[test]
    fn test_strides_with_transpose() {
        let problem =
            ProblemSpec::new(64, 16, 32, Operation::Transpose, Operation::NoTranspose).unwrap();
        assert_eq!(problem.lda(), 32);

        let problem =
            ProblemSpec::new(64, 16, 32, Operation::NoTranspose, Operation::Transpose).unwrap();
        assert_eq!(problem.ldb(), 16);
        assert_eq!(problem.ldc(), 64);
    }

    #[test]
    fn test_strides_cover_their_dimension() {
        for (ta, tb) in [
            (Operation::NoTranspose, Operation::NoTranspose),
            (Operation::Transpose, Operation::NoTranspose),
            (Operation::NoTranspose, Operation::Transpose),
            (Operation::Transpose, Operation::Transpose),
        ] {
            let p = ProblemSpec::new(48, 24, 40, ta, tb).unwrap();
            let a_rows = if ta == Operation::NoTranspose { p.m() } else { p.k() };
            let b_rows = if tb == Operation::NoTranspose { p.k() } else { p.n() };
            assert!(p.lda() >= a_rows);
            assert!(p.ldb() >= b_rows);
            assert!(p.ldc() >= p.m());
        }
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(ProblemSpec::new(0, 4, 4, Operation::NoTranspose, Operation::NoTranspose).is_err());
        assert!(ProblemSpec::new(4, 4, 0, Operation::NoTranspose, Operation::NoTranspose).is_err());
    }

    #[test]
    fn test_flops() {
        let p = ProblemSpec::new(32, 32, 32, Operation::NoTranspose, Operation::NoTranspose).unwrap();
        assert_eq!(p.flops(), 65536.0);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::from_flag(false).to_string(), "CUBLAS_OP_N");
        assert_eq!(Operation::from_flag(true).to_string(), "CUBLAS_OP_T");
    }
}
