//! GEMM algorithm identifiers
//!
//! Two disjoint families: general-purpose kernels and tensor-core
//! (fused multiply-accumulate) kernels. Each has a default sentinel that lets
//! the library pick the kernel itself.

use std::fmt;

use crate::error::{ProfError, Result};

/// Number of explicit general-purpose algorithms (`ALGO0`..`ALGO23`)
pub const GENERAL_ALGO_COUNT: usize = 24;

/// Number of explicit tensor-core algorithms (`ALGO0_TENSOR_OP`..`ALGO15_TENSOR_OP`)
pub const TENSOR_ALGO_COUNT: usize = 16;

const GENERAL_DEFAULT_RAW: i32 = -1;
const TENSOR_DEFAULT_RAW: i32 = 99;
const TENSOR_ALGO0_RAW: i32 = 100;

const GENERAL_NAMES: [&str; GENERAL_ALGO_COUNT] = [
    "CUBLAS_GEMM_ALGO0",
    "CUBLAS_GEMM_ALGO1",
    "CUBLAS_GEMM_ALGO2",
    "CUBLAS_GEMM_ALGO3",
    "CUBLAS_GEMM_ALGO4",
    "CUBLAS_GEMM_ALGO5",
    "CUBLAS_GEMM_ALGO6",
    "CUBLAS_GEMM_ALGO7",
    "CUBLAS_GEMM_ALGO8",
    "CUBLAS_GEMM_ALGO9",
    "CUBLAS_GEMM_ALGO10",
    "CUBLAS_GEMM_ALGO11",
    "CUBLAS_GEMM_ALGO12",
    "CUBLAS_GEMM_ALGO13",
    "CUBLAS_GEMM_ALGO14",
    "CUBLAS_GEMM_ALGO15",
    "CUBLAS_GEMM_ALGO16",
    "CUBLAS_GEMM_ALGO17",
    "CUBLAS_GEMM_ALGO18",
    "CUBLAS_GEMM_ALGO19",
    "CUBLAS_GEMM_ALGO20",
    "CUBLAS_GEMM_ALGO21",
    "CUBLAS_GEMM_ALGO22",
    "CUBLAS_GEMM_ALGO23",
];

const TENSOR_NAMES: [&str; TENSOR_ALGO_COUNT] = [
    "CUBLAS_GEMM_ALGO0_TENSOR_OP",
    "CUBLAS_GEMM_ALGO1_TENSOR_OP",
    "CUBLAS_GEMM_ALGO2_TENSOR_OP",
    "CUBLAS_GEMM_ALGO3_TENSOR_OP",
    "CUBLAS_GEMM_ALGO4_TENSOR_OP",
    "CUBLAS_GEMM_ALGO5_TENSOR_OP",
    "CUBLAS_GEMM_ALGO6_TENSOR_OP",
    "CUBLAS_GEMM_ALGO7_TENSOR_OP",
    "CUBLAS_GEMM_ALGO8_TENSOR_OP",
    "CUBLAS_GEMM_ALGO9_TENSOR_OP",
    "CUBLAS_GEMM_ALGO10_TENSOR_OP",
    "CUBLAS_GEMM_ALGO11_TENSOR_OP",
    "CUBLAS_GEMM_ALGO12_TENSOR_OP",
    "CUBLAS_GEMM_ALGO13_TENSOR_OP",
    "CUBLAS_GEMM_ALGO14_TENSOR_OP",
    "CUBLAS_GEMM_ALGO15_TENSOR_OP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    General,
    Tensor,
}

impl AlgorithmFamily {
    /// Number of explicit (non-default) algorithms in the family
    pub fn algorithm_count(self) -> usize {
        match self {
            AlgorithmFamily::General => GENERAL_ALGO_COUNT,
            AlgorithmFamily::Tensor => TENSOR_ALGO_COUNT,
        }
    }

    pub fn default_algorithm(self) -> AlgorithmId {
        AlgorithmId {
            family: self,
            index: None,
        }
    }

    /// The default sentinel followed by every explicit algorithm
    pub fn catalog(self) -> Vec<AlgorithmId> {
        std::iter::once(self.default_algorithm())
            .chain((0..self.algorithm_count()).map(|index| AlgorithmId {
                family: self,
                index: Some(index as u8),
            }))
            .collect()
    }

    pub fn algorithm(self, index: u8) -> Result<AlgorithmId> {
        if usize::from(index) >= self.algorithm_count() {
            return Err(ProfError::invalid_config(
                self.option_name(),
                index,
                format!("algorithm ids range over 0..={}", self.algorithm_count() - 1),
            ));
        }
        Ok(AlgorithmId {
            family: self,
            index: Some(index),
        })
    }

    fn option_name(self) -> &'static str {
        match self {
            AlgorithmFamily::General => "algo",
            AlgorithmFamily::Tensor => "tensor_algo",
        }
    }
}

/// Opaque algorithm identity; `index == None` is the family default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmId {
    family: AlgorithmFamily,
    index: Option<u8>,
}

impl AlgorithmId {
    pub fn family(&self) -> AlgorithmFamily {
        self.family
    }

    pub fn index(&self) -> Option<u8> {
        self.index
    }

    pub fn is_default(&self) -> bool {
        self.index.is_none()
    }

    /// The backend's `cublasGemmAlgo_t` value
    pub fn raw(&self) -> i32 {
        match (self.family, self.index) {
            (AlgorithmFamily::General, None) => GENERAL_DEFAULT_RAW,
            (AlgorithmFamily::General, Some(i)) => i32::from(i),
            (AlgorithmFamily::Tensor, None) => TENSOR_DEFAULT_RAW,
            (AlgorithmFamily::Tensor, Some(i)) => TENSOR_ALGO0_RAW + i32::from(i),
        }
    }

    pub fn name(&self) -> &'static str {
        match (self.family, self.index) {
            (AlgorithmFamily::General, None) => "CUBLAS_GEMM_DEFAULT",
            (AlgorithmFamily::General, Some(i)) => GENERAL_NAMES[usize::from(i)],
            (AlgorithmFamily::Tensor, None) => "CUBLAS_GEMM_DEFAULT_TENSOR_OP",
            (AlgorithmFamily::Tensor, Some(i)) => TENSOR_NAMES[usize::from(i)],
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the algorithm list of one family is chosen for a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmSelection {
    /// Only the family default
    Default,
    /// Default plus every explicit algorithm
    All,
    /// Explicit ids, in the order given
    Explicit(Vec<u8>),
}

impl AlgorithmSelection {
    pub fn resolve(&self, family: AlgorithmFamily) -> Result<Vec<AlgorithmId>> {
        match self {
            AlgorithmSelection::Default => Ok(vec![family.default_algorithm()]),
            AlgorithmSelection::All => Ok(family.catalog()),
            AlgorithmSelection::Explicit(ids) => {
                ids.iter().map(|id| family.algorithm(*id)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes_include_default() {
        let general = AlgorithmFamily::General.catalog();
        let tensor = AlgorithmFamily::Tensor.catalog();

        assert_eq!(general.len(), 25);
        assert_eq!(tensor.len(), 17);
        assert!(general[0].is_default());
        assert!(tensor[0].is_default());
    }

    #[test]
    fn test_raw_values_follow_library_enumeration() {
        assert_eq!(AlgorithmFamily::General.default_algorithm().raw(), -1);
        assert_eq!(AlgorithmFamily::General.algorithm(23).unwrap().raw(), 23);
        assert_eq!(AlgorithmFamily::Tensor.default_algorithm().raw(), 99);
        assert_eq!(AlgorithmFamily::Tensor.algorithm(0).unwrap().raw(), 100);
        assert_eq!(AlgorithmFamily::Tensor.algorithm(15).unwrap().raw(), 115);
    }

    #[test]
    fn test_families_are_disjoint() {
        let general: Vec<i32> = AlgorithmFamily::General
            .catalog()
            .iter()
            .map(|a| a.raw())
            .collect();
        for tensor in AlgorithmFamily::Tensor.catalog() {
            assert!(!general.contains(&tensor.raw()));
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(
            AlgorithmFamily::General.default_algorithm().name(),
            "CUBLAS_GEMM_DEFAULT"
        );
        assert_eq!(
            AlgorithmFamily::General.algorithm(7).unwrap().to_string(),
            "CUBLAS_GEMM_ALGO7"
        );
        assert_eq!(
            AlgorithmFamily::Tensor.algorithm(12).unwrap().name(),
            "CUBLAS_GEMM_ALGO12_TENSOR_OP"
        );
    }

    #[test]
    fn test_explicit_selection_maps_into_family() {
        let tensor = AlgorithmSelection::Explicit(vec![3, 1])
            .resolve(AlgorithmFamily::Tensor)
            .unwrap();
        assert_eq!(
            tensor.iter().map(|a| a.raw()).collect::<Vec<_>>(),
            vec![103, 101]
        );
    }

    #[test]
    fn test_out_of_range_selection_is_rejected() {
        assert!(AlgorithmSelection::Explicit(vec![24])
            .resolve(AlgorithmFamily::General)
            .is_err());
        assert!(AlgorithmSelection::Explicit(vec![16])
            .resolve(AlgorithmFamily::Tensor)
            .is_err());
        assert!(AlgorithmSelection::Explicit(vec![15])
            .resolve(AlgorithmFamily::Tensor)
            .is_ok());
    }
}
