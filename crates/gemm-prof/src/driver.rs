//! Sweep driver
//!
//! Walks the selected type combinations in order. For each one it allocates
//! the operand buffers, profiles the general-purpose family and, on devices
//! with tensor cores, the tensor-core family, then writes two result lines per
//! family and frees the buffers.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::backend::{DeviceBuffer, GemmArgs, GemmBackend};
use crate::catalog::{AlgorithmFamily, AlgorithmId, AlgorithmSelection, Scalar, TypeCombination};
use crate::eligibility::{quantized_field, tensor_core_restrictions, OperandAddresses, NOT_APPLICABLE};
use crate::error::{ProfError, Result};
use crate::problem::ProblemSpec;
use crate::profiler::Profiler;
use crate::report;

/// Everything a run needs, validated
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub problem: ProblemSpec,
    pub combos: Vec<TypeCombination>,
    pub general: AlgorithmSelection,
    pub tensor: AlgorithmSelection,
    pub repeats: u32,
}

/// Operand buffers and scalars of one type combination
pub struct GemmBuffers {
    a: Box<dyn DeviceBuffer>,
    b: Box<dyn DeviceBuffer>,
    c: Box<dyn DeviceBuffer>,
    alpha: Scalar,
    beta: Scalar,
}

impl GemmBuffers {
    /// Allocate `m·k·|A|`, `k·n·|B|` and `m·n·|C|` bytes and encode alpha = 1,
    /// beta = 0 in the compute type.
    pub fn allocate<B: GemmBackend + ?Sized>(
        backend: &B,
        problem: &ProblemSpec,
        types: &TypeCombination,
    ) -> Result<Self> {
        let a = backend.allocate(buffer_bytes("A", problem.a_elements(), types.a.size_bytes())?)?;
        let b = backend.allocate(buffer_bytes("B", problem.b_elements(), types.b.size_bytes())?)?;
        let c = backend.allocate(buffer_bytes("C", problem.c_elements(), types.c.size_bytes())?)?;
        debug!(
            "Allocated A={:#x} ({} B), B={:#x} ({} B), C={:#x} ({} B)",
            a.address(),
            a.size(),
            b.address(),
            b.size(),
            c.address(),
            c.size()
        );

        Ok(Self {
            a,
            b,
            c,
            alpha: types.alpha(),
            beta: types.beta(),
        })
    }

    pub fn addresses(&self) -> OperandAddresses {
        OperandAddresses {
            a: self.a.address(),
            b: self.b.address(),
            c: self.c.address(),
        }
    }

    pub fn args(&self, problem: ProblemSpec, types: TypeCombination) -> GemmArgs {
        GemmArgs {
            problem,
            types,
            addresses: self.addresses(),
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    /// Free all three buffers, reporting the first failure
    pub fn release(mut self) -> Result<()> {
        self.a.release()?;
        self.b.release()?;
        self.c.release()
    }
}

fn buffer_bytes(operand: &str, elements: usize, element_size: usize) -> Result<usize> {
    elements.checked_mul(element_size).ok_or_else(|| {
        ProfError::invalid_config(
            operand,
            elements,
            "operand size overflows the address space",
        )
    })
}

pub struct Driver<'a, B: GemmBackend + ?Sized> {
    backend: &'a B,
    profiler: Profiler<'a, B>,
}

impl<'a, B: GemmBackend + ?Sized> Driver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            profiler: Profiler::new(backend),
        }
    }

    /// Write the header and every result line of the plan to `out`
    pub fn run<W: Write + ?Sized>(&self, plan: &RunPlan, out: &mut W) -> Result<()> {
        let general = plan.general.resolve(AlgorithmFamily::General)?;
        let tensor = plan.tensor.resolve(AlgorithmFamily::Tensor)?;

        let properties = self.backend.properties();
        let tensor_cores = properties.has_tensor_cores();
        info!(
            "Profiling {} type combination(s) on {} (compute capability {}.{})",
            plan.combos.len(),
            properties.name,
            properties.compute_major,
            properties.compute_minor
        );
        if !tensor_cores {
            warn!("No tensor cores on this device, tensor-core sweeps are skipped");
        }

        writeln!(out, "{}", report::HEADER)?;

        for types in &plan.combos {
            self.run_combination(plan, types, &general, tensor_cores.then_some(&tensor[..]), out)?;
            out.flush()?;
        }

        Ok(())
    }

    fn run_combination<W: Write + ?Sized>(
        &self,
        plan: &RunPlan,
        types: &TypeCombination,
        general: &[AlgorithmId],
        tensor: Option<&[AlgorithmId]>,
        out: &mut W,
    ) -> Result<()> {
        let problem = plan.problem;
        debug!(
            "Type combination {{{}, {}, {}, {}}}",
            types.compute, types.a, types.b, types.c
        );

        let mut prefix = report::config_prefix(&self.backend.properties().name, &problem, types);
        prefix.push_str(&quantized_field(&problem, types));

        let buffers = GemmBuffers::allocate(self.backend, &problem, types)?;
        let args = buffers.args(problem, *types);

        let sweep = self.profiler.profile(&args, general, plan.repeats)?;
        report::write_sweep(out, &format!("{prefix}{NOT_APPLICABLE}"), &sweep)?;

        if let Some(tensor) = tensor {
            let restrictions = tensor_core_restrictions(&problem, types, buffers.addresses());
            let sweep = self.profiler.profile(&args, tensor, plan.repeats)?;
            report::write_sweep(out, &format!("{prefix}{restrictions}"), &sweep)?;
        }

        buffers.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SimulatedBackend, SimulatedDevice};
    use crate::catalog::TYPE_COMBINATIONS;
    use crate::problem::Operation;

    fn plan(combos: &[usize]) -> RunPlan {
        RunPlan {
            problem: ProblemSpec::new(32, 32, 32, Operation::NoTranspose, Operation::NoTranspose)
                .unwrap(),
            combos: combos.iter().map(|id| TYPE_COMBINATIONS[*id]).collect(),
            general: AlgorithmSelection::Default,
            tensor: AlgorithmSelection::Default,
            repeats: 1,
        }
    }

    #[test]
    fn test_buffer_sizes_follow_operand_types() {
        let backend = SimulatedBackend::new(SimulatedDevice::default());
        let problem =
            ProblemSpec::new(64, 16, 32, Operation::NoTranspose, Operation::NoTranspose).unwrap();
        let buffers = GemmBuffers::allocate(&backend, &problem, &TYPE_COMBINATIONS[3]).unwrap();

        assert_eq!(buffers.a.size(), 64 * 32);
        assert_eq!(buffers.b.size(), 32 * 16);
        assert_eq!(buffers.c.size(), 64 * 16 * 4);
        assert_eq!(backend.live_bytes(), 64 * 32 + 32 * 16 + 64 * 16 * 4);

        buffers.release().unwrap();
        assert_eq!(backend.live_bytes(), 0);
    }

    #[test]
    fn test_scalars_use_compute_type() {
        let backend = SimulatedBackend::new(SimulatedDevice::default());
        let problem =
            ProblemSpec::new(8, 8, 8, Operation::NoTranspose, Operation::NoTranspose).unwrap();
        let buffers = GemmBuffers::allocate(&backend, &problem, &TYPE_COMBINATIONS[6]).unwrap();
        let args = buffers.args(problem, TYPE_COMBINATIONS[6]);
        assert_eq!(args.alpha.as_bytes(), &1.0f64.to_le_bytes());
        assert_eq!(args.beta.as_bytes(), &0.0f64.to_le_bytes());
    }

    #[test]
    fn test_buffers_freed_after_each_combination() {
        let backend = SimulatedBackend::new(SimulatedDevice::default());
        let mut out = Vec::new();
        Driver::new(&backend).run(&plan(&[5, 6, 0]), &mut out).unwrap();
        assert_eq!(backend.live_bytes(), 0);
    }

    #[test]
    fn test_header_first_then_two_lines_per_combination() {
        let backend = SimulatedBackend::new(SimulatedDevice::default());
        let mut out = Vec::new();
        Driver::new(&backend).run(&plan(&[5, 1]), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], report::HEADER);
        assert!(lines[1].contains("CUDA_R_32F, CUDA_R_32F, NA, NA, CUBLAS_GEMM_DEFAULT, "));
        assert!(lines[3].contains("CUDA_R_8I, CUDA_R_8I, CUDA_R_32I, CUDA_R_32I, all meet, NA, "));
    }

    #[test]
    fn test_invalid_explicit_id_fails_before_output() {
        let backend = SimulatedBackend::new(SimulatedDevice::default());
        let mut plan = plan(&[5]);
        plan.general = AlgorithmSelection::Explicit(vec![24]);

        let mut out = Vec::new();
        assert!(Driver::new(&backend).run(&plan, &mut out).is_err());
        assert!(out.is_empty());
    }
}
