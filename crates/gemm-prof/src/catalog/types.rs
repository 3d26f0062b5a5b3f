//! Numeric data types and the type-combination catalog

use std::fmt;

use crate::error::{ProfError, Result};

/// Element representation of a GEMM operand or of the accumulation domain.
///
/// Discriminants are the backend's `cudaDataType_t` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DataType {
    R8I = 3,
    R16F = 2,
    R32I = 10,
    R32F = 0,
    R64F = 1,
    C8I = 7,
    C32F = 4,
    C64F = 5,
}

impl DataType {
    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::R8I => "CUDA_R_8I",
            DataType::R16F => "CUDA_R_16F",
            DataType::R32I => "CUDA_R_32I",
            DataType::R32F => "CUDA_R_32F",
            DataType::R64F => "CUDA_R_64F",
            DataType::C8I => "CUDA_C_8I",
            DataType::C32F => "CUDA_C_32F",
            DataType::C64F => "CUDA_C_64F",
        }
    }

    /// Bytes per element
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::R8I => 1,
            DataType::R16F => 2,
            DataType::R32I => 4,
            DataType::R32F => 4,
            DataType::R64F => 8,
            DataType::C8I => 2,
            DataType::C32F => 8,
            DataType::C64F => 16,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DataType::C8I | DataType::C32F | DataType::C64F)
    }

    /// Multiplicative identity encoded in this representation
    pub fn one(self) -> Scalar {
        match self {
            DataType::R8I => Scalar::from_bytes(&[1]),
            // IEEE 754 binary16 1.0
            DataType::R16F => Scalar::from_bytes(&0x3c00u16.to_le_bytes()),
            DataType::R32I => Scalar::from_bytes(&1i32.to_le_bytes()),
            DataType::R32F => Scalar::from_bytes(&1.0f32.to_le_bytes()),
            DataType::R64F => Scalar::from_bytes(&1.0f64.to_le_bytes()),
            DataType::C8I => Scalar::from_bytes(&[1, 0]),
            DataType::C32F => {
                let mut bytes = [0u8; 8];
                bytes[..4].copy_from_slice(&1.0f32.to_le_bytes());
                Scalar::from_bytes(&bytes)
            }
            DataType::C64F => {
                let mut bytes = [0u8; 16];
                bytes[..8].copy_from_slice(&1.0f64.to_le_bytes());
                Scalar::from_bytes(&bytes)
            }
        }
    }

    /// Additive identity encoded in this representation
    pub fn zero(self) -> Scalar {
        Scalar::from_bytes(&[0u8; Scalar::CAPACITY][..self.size_bytes()])
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-resident scalar (alpha/beta) in the compute type's byte layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalar {
    bytes: [u8; Scalar::CAPACITY],
    len: usize,
}

impl Scalar {
    /// Widest supported element, a double-precision complex
    pub const CAPACITY: usize = 16;

    fn from_bytes(src: &[u8]) -> Self {
        let mut bytes = [0u8; Self::CAPACITY];
        bytes[..src.len()].copy_from_slice(src);
        Self {
            bytes,
            len: src.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }
}

/// Numeric types of one GEMM configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeCombination {
    pub compute: DataType,
    pub a: DataType,
    pub b: DataType,
    pub c: DataType,
}

const fn combo(compute: DataType, a: DataType, b: DataType, c: DataType) -> TypeCombination {
    TypeCombination { compute, a, b, c }
}

/// Selectable type combinations, indexed by id
pub const TYPE_COMBINATIONS: [TypeCombination; 9] = [
    combo(DataType::R16F, DataType::R16F, DataType::R16F, DataType::R16F),
    combo(DataType::R32I, DataType::R8I, DataType::R8I, DataType::R32I),
    combo(DataType::R32F, DataType::R16F, DataType::R16F, DataType::R16F),
    combo(DataType::R32F, DataType::R8I, DataType::R8I, DataType::R32F),
    combo(DataType::R32F, DataType::R16F, DataType::R16F, DataType::R32F),
    combo(DataType::R32F, DataType::R32F, DataType::R32F, DataType::R32F),
    combo(DataType::R64F, DataType::R64F, DataType::R64F, DataType::R64F),
    combo(DataType::C32F, DataType::C8I, DataType::C8I, DataType::C32F),
    combo(DataType::C32F, DataType::C32F, DataType::C32F, DataType::C32F),
];

impl TypeCombination {
    pub fn by_id(id: usize) -> Result<Self> {
        TYPE_COMBINATIONS.get(id).copied().ok_or_else(|| {
            ProfError::invalid_config(
                "type",
                id,
                format!(
                    "type combination ids range over 0..={}",
                    TYPE_COMBINATIONS.len() - 1
                ),
            )
        })
    }

    /// Integer-accumulating combinations follow the DP4A stride restrictions
    pub fn uses_quantized_path(&self) -> bool {
        self.compute == DataType::R32I
    }

    pub fn alpha(&self) -> Scalar {
        self.compute.one()
    }

    pub fn beta(&self) -> Scalar {
        self.compute.zero()
    }
}

/// Human-readable catalog listing for `--list-types`
pub fn catalog_table() -> String {
    let mut table = String::from("ID, ComputeType, Atype,      Btype,      Ctype\n");
    for (id, types) in TYPE_COMBINATIONS.iter().enumerate() {
        table.push_str(&format!(
            "{:<3} {{{:<11} {:<11} {:<11} {}}}\n",
            format!("{id},"),
            format!("{},", types.compute),
            format!("{},", types.a),
            format!("{},", types.b),
            types.c,
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_nine_entries() {
        assert_eq!(TYPE_COMBINATIONS.len(), 9);
        assert_eq!(
            TypeCombination::by_id(5).unwrap(),
            combo(DataType::R32F, DataType::R32F, DataType::R32F, DataType::R32F)
        );
        assert!(TypeCombination::by_id(9).is_err());
    }

    #[test]
    fn test_only_int32_compute_uses_quantized_path() {
        let quantized: Vec<usize> = TYPE_COMBINATIONS
            .iter()
            .enumerate()
            .filter(|(_, t)| t.uses_quantized_path())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(quantized, vec![1]);
    }

    #[test]
    fn test_scalar_identities_match_compute_width() {
        for types in TYPE_COMBINATIONS {
            assert_eq!(types.alpha().as_bytes().len(), types.compute.size_bytes());
            assert_eq!(types.beta().as_bytes().len(), types.compute.size_bytes());
            assert!(types.beta().as_bytes().iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_alpha_is_numeric_one() {
        assert_eq!(DataType::R32F.one().as_bytes(), &1.0f32.to_le_bytes());
        assert_eq!(DataType::R64F.one().as_bytes(), &1.0f64.to_le_bytes());
        assert_eq!(DataType::R32I.one().as_bytes(), &[1, 0, 0, 0]);
        assert_eq!(DataType::R16F.one().as_bytes(), &[0x00, 0x3c]);

        let complex = DataType::C32F.one();
        assert_eq!(&complex.as_bytes()[..4], &1.0f32.to_le_bytes());
        assert_eq!(&complex.as_bytes()[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_byte_widths() {
        assert_eq!(DataType::R8I.size_bytes(), 1);
        assert_eq!(DataType::R16F.size_bytes(), 2);
        assert_eq!(DataType::C8I.size_bytes(), 2);
        assert_eq!(DataType::C32F.size_bytes(), 8);
        assert_eq!(DataType::C64F.size_bytes(), 16);
    }

    #[test]
    fn test_catalog_table_lists_every_entry() {
        let table = catalog_table();
        assert_eq!(table.lines().count(), 10);
        assert!(table.contains("CUDA_R_32I"));
        assert!(table.lines().nth(2).unwrap().starts_with("1,"));
    }
}
