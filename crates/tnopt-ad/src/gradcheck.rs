//! Gradient checking utilities
//!
//! Verifies gradients produced by the computation graph against finite differences
//! of a scalar-valued function:
//!
//! - **Central difference**: `f'(x) ≈ [f(x+h) - f(x-h)] / (2h)` (more accurate)
//! - **Forward difference**: `f'(x) ≈ [f(x+h) - f(x)] / h` (faster)
//!
//! # Example
//!
//! ```rust,ignore
//! use tnopt_ad::gradcheck::{check_gradient, GradCheckConfig};
//!
//! let f = |x: &ArrayD<f64>| -> Result<f64> { Ok(x.iter().map(|v| v * v).sum::<f64>()) };
//! let analytical = x.mapv(|v| 2.0 * v);
//! let result = check_gradient(f, &x, &analytical, &GradCheckConfig::default())?;
//! assert!(result.passed);
//! ```

use anyhow::{anyhow, bail, Result};
use scirs2_core::ndarray_ext::ArrayD;
use scirs2_core::numeric::Float;

/// Gradient checking configuration
#[derive(Debug, Clone)]
pub struct GradCheckConfig {
    /// Step size for finite differences (default: 1e-5)
    pub epsilon: f64,

    /// Relative tolerance for gradient comparison (default: 1e-3)
    pub rtol: f64,

    /// Absolute tolerance for gradient comparison (default: 1e-5)
    pub atol: f64,

    /// Use central difference (more accurate but 2x slower)
    pub use_central_diff: bool,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            rtol: 1e-3,
            atol: 1e-5,
            use_central_diff: true,
        }
    }
}

/// Result of gradient checking
#[derive(Debug)]
pub struct GradCheckResult {
    /// Maximum absolute difference between analytical and numerical gradients
    pub max_abs_diff: f64,

    /// Maximum relative difference
    pub max_rel_diff: f64,

    /// Whether the gradient check passed
    pub passed: bool,

    /// Number of elements checked
    pub num_elements: usize,

    /// Number of elements that failed the check
    pub num_failures: usize,
}

/// Compare an analytical gradient of `f` at `x` against finite differences
pub fn check_gradient<T, F>(
    f: F,
    x: &ArrayD<T>,
    analytical: &ArrayD<T>,
    config: &GradCheckConfig,
) -> Result<GradCheckResult>
where
    T: Float,
    F: Fn(&ArrayD<T>) -> Result<T>,
{
    if analytical.shape() != x.shape() {
        bail!(
            "Gradient shape {:?} doesn't match input shape {:?}",
            analytical.shape(),
            x.shape()
        );
    }

    let numerical = numerical_gradient(f, x, config)?;
    compare_gradients(analytical, &numerical, config)
}

/// Finite-difference gradient of a scalar function
pub fn numerical_gradient<T, F>(f: F, x: &ArrayD<T>, config: &GradCheckConfig) -> Result<ArrayD<T>>
where
    T: Float,
    F: Fn(&ArrayD<T>) -> Result<T>,
{
    let h = T::from(config.epsilon).ok_or_else(|| anyhow!("Failed to convert epsilon"))?;
    let base = if config.use_central_diff {
        None
    } else {
        Some(f(x)?)
    };

    let mut probe = x.to_owned();
    let mut grad = Vec::with_capacity(x.len());
    for idx in 0..x.len() {
        let original = flat_get(&probe, idx)?;

        flat_set(&mut probe, idx, original + h)?;
        let f_plus = f(&probe)?;

        let g = match base {
            Some(f_x) => (f_plus - f_x) / h,
            None => {
                flat_set(&mut probe, idx, original - h)?;
                let f_minus = f(&probe)?;
                (f_plus - f_minus) / (h + h)
            }
        };
        flat_set(&mut probe, idx, original)?;
        grad.push(g);
    }

    Ok(ArrayD::from_shape_vec(x.raw_dim(), grad)?)
}

fn flat_get<T: Copy>(a: &ArrayD<T>, idx: usize) -> Result<T> {
    a.iter()
        .nth(idx)
        .copied()
        .ok_or_else(|| anyhow!("Index {} out of range", idx))
}

fn flat_set<T>(a: &mut ArrayD<T>, idx: usize, value: T) -> Result<()> {
    let slot = a
        .iter_mut()
        .nth(idx)
        .ok_or_else(|| anyhow!("Index {} out of range", idx))?;
    *slot = value;
    Ok(())
}

fn compare_gradients<T: Float>(
    analytical: &ArrayD<T>,
    numerical: &ArrayD<T>,
    config: &GradCheckConfig,
) -> Result<GradCheckResult> {
    let mut max_abs_diff = 0.0_f64;
    let mut max_rel_diff = 0.0_f64;
    let mut num_failures = 0;

    for (a, n) in analytical.iter().zip(numerical.iter()) {
        let a = a.to_f64().ok_or_else(|| anyhow!("Conversion error"))?;
        let n = n.to_f64().ok_or_else(|| anyhow!("Conversion error"))?;

        let abs_diff = (a - n).abs();
        let rel_diff = if n.abs() > f64::EPSILON {
            abs_diff / n.abs()
        } else {
            abs_diff
        };

        max_abs_diff = max_abs_diff.max(abs_diff);
        max_rel_diff = max_rel_diff.max(rel_diff);

        if abs_diff > config.atol + config.rtol * n.abs() {
            num_failures += 1;
        }
    }

    Ok(GradCheckResult {
        max_abs_diff,
        max_rel_diff,
        passed: num_failures == 0,
        num_elements: analytical.len(),
        num_failures,
    })
}
