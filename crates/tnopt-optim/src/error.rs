//! Errors reported by the optimization driver

use thiserror::Error;

/// Failure of an [`crate::optimize`] run
///
/// Configuration problems are reported before the loss function is called. Errors raised
/// by the loss function, the backward pass or the optimizer step are passed through with
/// their source attached.
#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error(
        "there are no parameters to optimize; did you forget to mark a core or factor as learnable?"
    )]
    NoParameters,

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("loss function failed: {0}")]
    LossFunction(#[source] anyhow::Error),

    #[error("automatic differentiation failed: {0}")]
    Autodiff(#[source] anyhow::Error),

    #[error("optimizer step failed: {0}")]
    Optimizer(#[source] anyhow::Error),

    #[error("loss term {index} must hold a single element, got shape {shape:?}")]
    NonScalarLoss { index: usize, shape: Vec<usize> },

    #[error("the loss function returned no terms")]
    EmptyLoss,

    #[error("writing progress output failed: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
