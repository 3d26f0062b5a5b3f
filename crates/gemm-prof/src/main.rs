use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use gemm_prof::{
    catalog::catalog_table,
    cli::{parse_args, setup_logging},
    config::load_config,
    Driver, ProfilerConfig, RunPlan, SimulatedBackend, SimulatedDevice,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = parse_args();

    if cli.list_types {
        print!("available combination of types:\n{}", catalog_table());
        return Ok(());
    }

    let mut config = load_config(cli.config_path.as_deref())?;
    cli.apply(&mut config);

    if let Some(path) = &cli.gen_config {
        std::fs::write(path, config.to_toml()?)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        return Ok(());
    }

    setup_logging(&config.log_level)?;
    info!("Starting gemm-prof v{}", env!("CARGO_PKG_VERSION"));

    let plan = config.validate()?;
    let started = Instant::now();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if config.simulation.enabled {
        run_simulated(&config, &plan, &mut out)?;
    } else {
        run_on_device(&config, &plan, &mut out)?;
    }
    out.flush().context("Failed to flush the report")?;

    info!("Profiling completed in {:?}", started.elapsed());
    Ok(())
}

fn run_simulated(config: &ProfilerConfig, plan: &RunPlan, out: &mut dyn Write) -> Result<()> {
    let device = SimulatedDevice::default().with_compute_capability(
        config.simulation.compute_major,
        config.simulation.compute_minor,
    );
    let backend = SimulatedBackend::open(config.device, device)?;
    Driver::new(&backend).run(plan, out)?;
    Ok(())
}

#[cfg(feature = "cuda")]
fn run_on_device(config: &ProfilerConfig, plan: &RunPlan, out: &mut dyn Write) -> Result<()> {
    let backend = gemm_prof::backend::cuda::CudaBackend::new(config.device)?;
    Driver::new(&backend).run(plan, out)?;
    Ok(())
}

#[cfg(not(feature = "cuda"))]
fn run_on_device(config: &ProfilerConfig, plan: &RunPlan, out: &mut dyn Write) -> Result<()> {
    tracing::warn!("Built without the `cuda` feature, profiling the simulated device instead");
    run_simulated(config, plan, out)
}
