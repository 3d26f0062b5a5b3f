use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ProfilerConfig;

/// Parsed command line: control flags plus overrides for [`ProfilerConfig`]
#[derive(Debug, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub gen_config: Option<PathBuf>,
    pub list_types: bool,
    matches: Option<ArgMatches>,
}

pub fn build_command() -> Command {
    Command::new("gemm-prof")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Profile cuBLAS GemmEx across type combinations and algorithms")
        .arg(dimension("m", 'm', "m dimension"))
        .arg(dimension("n", 'n', "n dimension"))
        .arg(dimension("k", 'k', "k dimension"))
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .help("Device ID")
                .value_name("ID")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("loop")
                .short('l')
                .long("loop")
                .help("GEMM calls per algorithm inside one timing window")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("ta")
                .long("ta")
                .help("Set A to CUBLAS_OP_T, else CUBLAS_OP_N")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tb")
                .long("tb")
                .help("Set B to CUBLAS_OP_T, else CUBLAS_OP_N")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("type")
                .long("type")
                .help("Type combination IDs (see --list-types)")
                .value_name("IDS")
                .num_args(1..)
                .value_delimiter(',')
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("algo")
                .long("algo")
                .help("General-purpose algorithm IDs (0~23)")
                .value_name("IDS")
                .num_args(1..)
                .value_delimiter(',')
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("tensor-algo")
                .long("tensor-algo")
                .alias("tensor_algo")
                .help("Tensor-core algorithm IDs (0~15)")
                .value_name("IDS")
                .num_args(1..)
                .value_delimiter(',')
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("all-algo")
                .long("all-algo")
                .alias("all_algo")
                .help("Run all algorithms of both families")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-types")
                .long("list-types")
                .help("Print the available type combinations and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML configuration file")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("gen-config")
                .long("gen-config")
                .help("Write the merged configuration as TOML and exit")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .help("Use the simulated device instead of CUDA")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sim-capability")
                .long("sim-capability")
                .help("Compute capability of the simulated device, e.g. 7.0")
                .value_name("MAJOR.MINOR")
                .value_parser(parse_capability),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Logging level")
                .value_name("LEVEL")
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        )
}

fn dimension(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .help(help)
        .value_name("SIZE")
        .value_parser(clap::value_parser!(u32))
}

fn parse_capability(value: &str) -> std::result::Result<(i32, i32), String> {
    let (major, minor) = value.split_once('.').unwrap_or((value, "0"));
    let major = major
        .parse::<i32>()
        .map_err(|_| format!("invalid compute capability: {value}"))?;
    let minor = minor
        .parse::<i32>()
        .map_err(|_| format!("invalid compute capability: {value}"))?;
    Ok((major, minor))
}

/// Parse the process arguments; clap prints usage and exits on malformed input
pub fn parse_args() -> CliArgs {
    CliArgs::from_matches(build_command().get_matches())
}

pub fn parse_args_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command()
        .try_get_matches_from(args)
        .context("Failed to parse command line")?;
    Ok(CliArgs::from_matches(matches))
}

impl CliArgs {
    fn from_matches(matches: ArgMatches) -> Self {
        Self {
            config_path: matches.get_one::<PathBuf>("config").cloned(),
            gen_config: matches.get_one::<PathBuf>("gen-config").cloned(),
            list_types: matches.get_flag("list-types"),
            matches: Some(matches),
        }
    }

    /// Overlay every flag given on the command line onto `config`
    pub fn apply(&self, config: &mut ProfilerConfig) {
        let Some(matches) = &self.matches else {
            return;
        };

        if let Some(m) = matches.get_one::<u32>("m") {
            config.m = *m;
        }
        if let Some(n) = matches.get_one::<u32>("n") {
            config.n = *n;
        }
        if let Some(k) = matches.get_one::<u32>("k") {
            config.k = *k;
        }
        if let Some(device) = matches.get_one::<u32>("device") {
            config.device = *device;
        }
        if let Some(repeats) = matches.get_one::<u32>("loop") {
            config.repeats = *repeats;
        }
        if matches.get_flag("ta") {
            config.transpose_a = true;
        }
        if matches.get_flag("tb") {
            config.transpose_b = true;
        }
        if let Some(types) = matches.get_many::<usize>("type") {
            config.types = types.copied().collect();
        }
        if let Some(algos) = matches.get_many::<u8>("algo") {
            config.algos = Some(algos.copied().collect());
        }
        if let Some(algos) = matches.get_many::<u8>("tensor-algo") {
            config.tensor_algos = Some(algos.copied().collect());
        }
        if matches.get_flag("all-algo") {
            config.all_algos = true;
        }
        if matches.get_flag("simulate") {
            config.simulation.enabled = true;
        }
        if let Some((major, minor)) = matches.get_one::<(i32, i32)>("sim-capability") {
            config.simulation.compute_major = *major;
            config.simulation.compute_minor = *minor;
        }

        if matches.get_flag("debug") {
            config.log_level = "debug".to_string();
        } else if let Some(log_level) = matches.get_one::<String>("log-level") {
            config.log_level = log_level.clone();
        }
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries the report.
pub fn setup_logging(level: &str) -> Result<()> {
    let level_filter = match level {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", level)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_level(true)
                .with_target(false)
                .with_ansi(false),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            level_filter,
        ))
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(())
}
