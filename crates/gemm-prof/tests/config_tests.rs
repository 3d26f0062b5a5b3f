//! Layered configuration loading

use std::env;
use std::io::Write;

use serial_test::serial;
use tempfile::{Builder, NamedTempFile};

use gemm_prof::cli::parse_args_from;
use gemm_prof::{load_config, AlgorithmSelection, ProfilerConfig};

const ENV_KEYS: &[&str] = &[
    "GEMM_PROF_M",
    "GEMM_PROF_N",
    "GEMM_PROF_K",
    "GEMM_PROF_REPEATS",
    "GEMM_PROF_TYPES",
    "GEMM_PROF_ALGOS",
    "GEMM_PROF_SIMULATION__COMPUTE_MAJOR",
];

/// Clears the variables this file touches, restoring them on drop
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn new() -> Self {
        let saved = ENV_KEYS
            .iter()
            .map(|key| (*key, env::var(key).ok()))
            .collect();
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_defaults_without_file() {
    let _env = EnvGuard::new();
    let config = load_config(None).unwrap();
    assert_eq!(config, ProfilerConfig::default());
}

#[test]
#[serial]
fn test_file_values_override_defaults() {
    let _env = EnvGuard::new();
    let file = toml_file(
        r#"
        m = 128
        n = 64
        repeats = 10
        transpose_b = true
        types = [0, 2, 4]
        tensor_algos = [1, 15]

        [simulation]
        enabled = true
        compute_major = 7
        "#,
    );

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.m, 128);
    assert_eq!(config.n, 64);
    assert_eq!(config.k, 32);
    assert_eq!(config.repeats, 10);
    assert!(config.transpose_b);
    assert_eq!(config.types, vec![0, 2, 4]);
    assert_eq!(config.tensor_algos, Some(vec![1, 15]));
    assert!(config.simulation.enabled);
    assert_eq!(config.simulation.compute_major, 7);
    assert_eq!(config.simulation.compute_minor, 1);

    let plan = config.validate().unwrap();
    assert_eq!(plan.combos.len(), 3);
    assert_eq!(plan.problem.ldb(), 64);
    assert_eq!(plan.tensor, AlgorithmSelection::Explicit(vec![1, 15]));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let _env = EnvGuard::new();
    let file = toml_file("m = 128\nrepeats = 10\n");
    env::set_var("GEMM_PROF_M", "256");
    env::set_var("GEMM_PROF_TYPES", "[1, 3]");
    env::set_var("GEMM_PROF_SIMULATION__COMPUTE_MAJOR", "8");

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.m, 256);
    assert_eq!(config.repeats, 10);
    assert_eq!(config.types, vec![1, 3]);
    assert_eq!(config.simulation.compute_major, 8);
}

#[test]
#[serial]
fn test_command_line_overrides_environment() {
    let _env = EnvGuard::new();
    env::set_var("GEMM_PROF_K", "48");
    env::set_var("GEMM_PROF_ALGOS", "[1]");

    let mut config = load_config(None).unwrap();
    let cli = parse_args_from(["gemm-prof", "-k", "96", "--all-algo"]).unwrap();
    cli.apply(&mut config);

    assert_eq!(config.k, 96);
    assert_eq!(config.algos, Some(vec![1]));
    let plan = config.validate().unwrap();
    assert_eq!(plan.general, AlgorithmSelection::All);
}

#[test]
#[serial]
fn test_missing_file_is_an_error() {
    let _env = EnvGuard::new();
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
#[serial]
fn test_unsupported_extension_is_an_error() {
    let _env = EnvGuard::new();
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"m: 64\n").unwrap();
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_malformed_values_are_reported() {
    let _env = EnvGuard::new();
    let file = toml_file("m = \"big\"\n");
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse configuration"));
}

#[test]
#[serial]
fn test_generated_config_loads_back() {
    let _env = EnvGuard::new();
    let config = ProfilerConfig {
        m: 512,
        types: vec![6, 8],
        algos: Some(vec![0, 23]),
        all_algos: false,
        ..Default::default()
    };
    let file = toml_file(&config.to_toml().unwrap());
    assert_eq!(load_config(Some(file.path())).unwrap(), config);
}
