//! # Configuration
//!
//! Figment-based loading with layered support:
//! 1. Compiled defaults
//! 2. Optional TOML file (`--config`)
//! 3. Environment variable overrides (`GEMM_PROF_*`)
//!
//! Command-line flags are applied on top by [`crate::cli`]. The merged
//! [`ProfilerConfig`] is turned into a [`RunPlan`] by
//! [`ProfilerConfig::validate`].
//!
//! # Environment Variable Mapping
//! - Top-level fields: `GEMM_PROF_M=64`, `GEMM_PROF_TYPES=[0,5]`
//! - Nested fields use double underscore: `GEMM_PROF_SIMULATION__COMPUTE_MAJOR=7`

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{AlgorithmFamily, AlgorithmSelection, TypeCombination};
use crate::driver::RunPlan;
use crate::error::{ProfError, Result};
use crate::problem::{Operation, ProblemSpec};

pub const ENV_PREFIX: &str = "GEMM_PROF_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub m: u32,
    pub n: u32,
    pub k: u32,
    /// Device ordinal
    pub device: u32,
    /// GEMM calls per algorithm inside one timing window
    pub repeats: u32,
    pub transpose_a: bool,
    pub transpose_b: bool,
    /// Type-combination ids, profiled in this order
    pub types: Vec<usize>,
    /// Explicit general-purpose algorithm ids (0..=23)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algos: Option<Vec<u8>>,
    /// Explicit tensor-core algorithm ids (0..=15)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensor_algos: Option<Vec<u8>>,
    /// Sweep every algorithm of both families; overrides explicit ids
    pub all_algos: bool,
    pub log_level: String,
    pub simulation: SimulationConfig,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            m: 32,
            n: 32,
            k: 32,
            device: 0,
            repeats: 1,
            transpose_a: false,
            transpose_b: false,
            types: vec![5],
            algos: None,
            tensor_algos: None,
            all_algos: false,
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Settings of the hardware-less backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Use the simulated device even when the CUDA backend is compiled in
    pub enabled: bool,
    pub compute_major: i32,
    pub compute_minor: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            compute_major: 6,
            compute_minor: 1,
        }
    }
}

/// Load configuration: defaults, then `path` if given, then the environment.
///
/// A given path must exist and be TOML.
pub fn load_config(path: Option<&Path>) -> Result<ProfilerConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(ProfilerConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ProfError::Configuration {
                details: format!("configuration file not found: {}", path.display()),
            });
        }
        figment = add_file_provider(figment, path)?;
        info!("Loading configuration from file: {}", path.display());
    }

    debug!("Loading environment variables with prefix: {}", ENV_PREFIX);
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: ProfilerConfig = figment
        .extract()
        .map_err(|err| ProfError::Configuration {
            details: format!("Failed to parse configuration: {err}"),
        })?;

    debug!(
        "Configuration loaded from {} sources",
        figment.metadata().count()
    );
    Ok(config)
}

fn add_file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("toml");

    match extension.to_lowercase().as_str() {
        "toml" => Ok(figment.merge(Toml::file(path))),
        _ => Err(ProfError::Configuration {
            details: format!(
                "Unsupported configuration file format: {extension} (supported: toml)"
            ),
        }),
    }
}

impl ProfilerConfig {
    /// Render as TOML, the format accepted by [`load_config`]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| ProfError::Configuration {
            details: format!("Failed to serialize configuration: {err}"),
        })
    }

    /// Check every selection and derive the plan of the run
    pub fn validate(&self) -> Result<RunPlan> {
        let problem = ProblemSpec::new(
            self.m,
            self.n,
            self.k,
            Operation::from_flag(self.transpose_a),
            Operation::from_flag(self.transpose_b),
        )?;

        if self.repeats == 0 {
            return Err(ProfError::invalid_config(
                "repeats",
                self.repeats,
                "at least one call per algorithm is required",
            ));
        }

        if self.types.is_empty() {
            return Err(ProfError::invalid_config(
                "types",
                "[]",
                "select at least one type combination",
            ));
        }
        let combos = self
            .types
            .iter()
            .map(|id| TypeCombination::by_id(*id))
            .collect::<Result<Vec<_>>>()?;

        let general = self.selection(AlgorithmFamily::General, self.algos.as_deref(), "algos")?;
        let tensor = self.selection(
            AlgorithmFamily::Tensor,
            self.tensor_algos.as_deref(),
            "tensor_algos",
        )?;

        Ok(RunPlan {
            problem,
            combos,
            general,
            tensor,
            repeats: self.repeats,
        })
    }

    fn selection(
        &self,
        family: AlgorithmFamily,
        ids: Option<&[u8]>,
        key: &str,
    ) -> Result<AlgorithmSelection> {
        if self.all_algos {
            return Ok(AlgorithmSelection::All);
        }
        match ids {
            None => Ok(AlgorithmSelection::Default),
            Some([]) => Err(ProfError::invalid_config(
                key,
                "[]",
                "an explicit selection needs at least one id",
            )),
            Some(ids) => {
                for id in ids {
                    family.algorithm(*id)?;
                }
                Ok(AlgorithmSelection::Explicit(ids.to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let plan = ProfilerConfig::default().validate().unwrap();
        assert_eq!(plan.problem.m(), 32);
        assert_eq!(plan.problem.trans_a(), Operation::NoTranspose);
        assert_eq!(plan.combos.len(), 1);
        assert_eq!(plan.combos[0], crate::catalog::TYPE_COMBINATIONS[5]);
        assert_eq!(plan.general, AlgorithmSelection::Default);
        assert_eq!(plan.tensor, AlgorithmSelection::Default);
        assert_eq!(plan.repeats, 1);
    }

    #[test]
    fn test_all_algos_overrides_explicit_ids() {
        let config = ProfilerConfig {
            algos: Some(vec![3]),
            all_algos: true,
            ..Default::default()
        };
        let plan = config.validate().unwrap();
        assert_eq!(plan.general, AlgorithmSelection::All);
        assert_eq!(plan.tensor, AlgorithmSelection::All);
    }

    #[test]
    fn test_out_of_range_ids_rejected() {
        let bad_type = ProfilerConfig {
            types: vec![5, 9],
            ..Default::default()
        };
        assert!(bad_type.validate().is_err());

        let bad_general = ProfilerConfig {
            algos: Some(vec![24]),
            ..Default::default()
        };
        assert!(bad_general.validate().is_err());

        let bad_tensor = ProfilerConfig {
            tensor_algos: Some(vec![16]),
            ..Default::default()
        };
        assert!(bad_tensor.validate().is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let zero_repeats = ProfilerConfig {
            repeats: 0,
            ..Default::default()
        };
        assert!(zero_repeats.validate().is_err());

        let zero_k = ProfilerConfig {
            k: 0,
            ..Default::default()
        };
        assert!(zero_k.validate().is_err());

        let no_types = ProfilerConfig {
            types: vec![],
            ..Default::default()
        };
        assert!(no_types.validate().is_err());

        let empty_algos = ProfilerConfig {
            algos: Some(vec![]),
            ..Default::default()
        };
        assert!(empty_algos.validate().is_err());
    }

    #[test]
    fn test_toml_rendering_omits_unset_selections() {
        let rendered = ProfilerConfig::default().to_toml().unwrap();
        assert!(rendered.contains("m = 32"));
        assert!(rendered.contains("types = [5]"));
        assert!(!rendered.contains("tensor_algos"));
        assert!(rendered.contains("[simulation]"));
    }
}
