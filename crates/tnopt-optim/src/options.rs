//! Run options for the optimization driver

use crate::error::{OptimizeError, Result};

/// Options of one optimization run
///
/// # Example
///
/// ```rust,ignore
/// let options = OptimizeOptions::default().tol(1e-6).max_iter(2_000).quiet();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    /// Stopping tolerance; `None` runs until `max_iter` (default: 1e-4)
    pub tol: Option<f64>,

    /// Iteration budget (default: 10_000)
    pub max_iter: usize,

    /// Print progress every this many iterations (default: 500); 0 is only accepted
    /// when `verbose` is off and disables the per-step progress events
    pub print_freq: usize,

    /// Print progress and a final status line to stdout (default: true)
    pub verbose: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            tol: Some(1e-4),
            max_iter: 10_000,
            print_freq: 500,
            verbose: true,
        }
    }
}

impl OptimizeOptions {
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    /// Disable the tolerance test
    pub fn no_tol(mut self) -> Self {
        self.tol = None;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn print_freq(mut self, print_freq: usize) -> Self {
        self.print_freq = print_freq;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Shorthand for `verbose(false)`
    pub fn quiet(self) -> Self {
        self.verbose(false)
    }

    /// Reject option combinations the driver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.print_freq == 0 {
            return Err(OptimizeError::InvalidOptions(
                "print_freq must be at least 1 when verbose".to_string(),
            ));
        }
        if self.tol.is_some_and(f64::is_nan) {
            return Err(OptimizeError::InvalidOptions(
                "tol must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}
