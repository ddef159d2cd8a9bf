//! Stopping rule
//!
//! With `L` the loss trace and `δ = L[n] - L[n-1]`, a run has converged at iteration
//! `n >= 2` when
//!
//! ```text
//! (L[n] <= tol  or  -δ / L[n] <= tol)  and  L[n-1] - L[n] < L[n-2] - L[n-1]
//! ```
//!
//! The first clause is an absolute or relative improvement test. The second requires
//! the improvement to be shrinking, so one lucky step cannot end the run.

/// Whether the trace satisfies the stopping rule; always false without a tolerance
pub fn has_converged(trace: &[f64], tol: Option<f64>) -> bool {
    let Some(tol) = tol else {
        return false;
    };
    let [.., before, prev, last] = trace else {
        return false;
    };

    let delta = last - prev;
    (*last <= tol || -delta / last <= tol) && (prev - last) < (before - prev)
}
