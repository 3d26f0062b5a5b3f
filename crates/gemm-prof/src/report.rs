//! Comma-separated result table written to stdout

use std::io::Write;

use crate::catalog::TypeCombination;
use crate::error::Result;
use crate::problem::ProblemSpec;
use crate::profiler::{MeasurementSample, Sweep};

pub const HEADER: &str = "device, op(A), op(B), m, n, k, Atype, Btype, Ctype, ComputeType, \
Dp4aRestrictions(lda.ldb), TensorCoreRestrictions(m.k.A.B.C.lda.ldb.ldc), algo, time(ms), GFLOPS";

const SIGNIFICANT_DIGITS: i32 = 6;

/// Format a float like a default C++ output stream: general notation with six
/// significant digits, trailing zeros removed, `nan` for NaN.
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to six significant digits first; the exponent of the rounded value
    // decides between fixed and scientific notation.
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (-4..SIGNIFICANT_DIGITS).contains(&exponent) {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    }
}

fn strip_trailing_zeros(number: &str) -> String {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        number.to_string()
    }
}

/// `device, op(A), op(B), m, n, k, Atype, Btype, Ctype, ComputeType, `
pub fn config_prefix(device: &str, problem: &ProblemSpec, types: &TypeCombination) -> String {
    format!(
        "{}, {}, {}, {}, {}, {}, {}, {}, {}, {}, ",
        device,
        problem.trans_a(),
        problem.trans_b(),
        problem.m(),
        problem.n(),
        problem.k(),
        types.a,
        types.b,
        types.c,
        types.compute
    )
}

pub fn result_line(prefix: &str, sample: &MeasurementSample) -> String {
    format!(
        "{}{}, {}, {}",
        prefix,
        sample.algorithm,
        format_general(sample.time_ms),
        format_general(sample.gflops)
    )
}

/// Write the two lines of a sweep: the first algorithm that ran, then the
/// fastest. An empty sweep writes nothing.
pub fn write_sweep<W: Write + ?Sized>(out: &mut W, prefix: &str, sweep: &Sweep) -> Result<()> {
    if let (Some(first), Some(fastest)) = (sweep.first(), sweep.fastest()) {
        writeln!(out, "{}", result_line(prefix, first))?;
        writeln!(out, "{}", result_line(prefix, fastest))?;
    }
    Ok(())
}
