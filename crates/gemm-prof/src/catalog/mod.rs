//! Static catalogs of the sweep axes: numeric type combinations and GEMM
//! algorithm identifiers.

pub mod algo;
pub mod types;

pub use algo::{
    AlgorithmFamily, AlgorithmId, AlgorithmSelection, GENERAL_ALGO_COUNT, TENSOR_ALGO_COUNT,
};
pub use types::{catalog_table, DataType, Scalar, TypeCombination, TYPE_COMBINATIONS};
