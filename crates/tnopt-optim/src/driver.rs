//! The optimization loop
//!
//! Each iteration clears the tape, binds every network onto it, evaluates the loss
//! function, records the summed loss, and either stops or takes one optimizer step:
//!
//! 1. zero the gradients of the parameter set
//! 2. bind the networks and call the loss function
//! 3. sum the returned terms on the tape
//! 4. append the sum to the trace and test the stopping rule
//! 5. stop at the iteration budget, otherwise backpropagate and step
//!
//! The loss function is therefore called `max_iter + 1` times when the budget runs out,
//! and the optimizer steps `max_iter` times.

use crate::error::{OptimizeError, Result};
use crate::loss::Loss;
use crate::options::OptimizeOptions;
use crate::progress::{final_line, progress_line};
use crate::stopping::has_converged;
use anyhow::anyhow;
use scirs2_core::ndarray_ext::ScalarOperand;
use scirs2_core::numeric::{Float, FromPrimitive};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tnopt_ad::{Adam, ComputationGraph, Optimizer, OptimizerConfig, Parameter, Variable};
use tnopt_net::{BoundNetwork, TensorNetwork};
use tracing::{debug, info};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// The stopping rule held for this tolerance
    Converged { tol: f64 },
    /// The iteration budget was used up
    MaxIterReached,
}

/// Outcome of an optimization run
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    /// Iteration index at exit (number of optimizer steps taken)
    pub iterations: usize,
    pub converged: bool,
    pub termination: Termination,
    /// Loss terms of the last evaluation
    pub terms: Vec<f64>,
    /// Summed loss of the last evaluation
    pub loss: f64,
    /// Summed loss of every evaluation, in order
    pub trace: Vec<f64>,
    pub elapsed: Duration,
}

/// Fit the learnable cores and factors of `networks` with Adam (learning rate 1e-3)
///
/// `loss_fn` receives the graph and the networks bound onto it, in the order of
/// `networks`, and returns one scalar variable or several whose sum is minimized.
///
/// # Example
///
/// ```rust,ignore
/// let report = optimize(
///     std::slice::from_mut(&mut tt),
///     |graph, nets| {
///         let diff = graph.sub(&nets[0].full(graph)?, &target)?;
///         graph.sum(&graph.pow(&diff, 2.0)?)
///     },
///     &OptimizeOptions::default(),
/// )?;
/// ```
pub fn optimize<T, F, L>(
    networks: &mut [TensorNetwork<T>],
    loss_fn: F,
    options: &OptimizeOptions,
) -> Result<OptimizeReport>
where
    T: Float + ScalarOperand + FromPrimitive + 'static,
    F: FnMut(&ComputationGraph<T>, &[BoundNetwork]) -> anyhow::Result<L>,
    L: Into<Loss>,
{
    let mut optimizer = Adam::new(OptimizerConfig::adam());
    optimize_with(networks, loss_fn, options, &mut optimizer)
}

/// [`optimize`] with a caller-supplied optimizer
#[tracing::instrument(
    skip_all,
    fields(networks = networks.len(), max_iter = options.max_iter, tol = ?options.tol)
)]
pub fn optimize_with<T, F, L, O>(
    networks: &mut [TensorNetwork<T>],
    loss_fn: F,
    options: &OptimizeOptions,
    optimizer: &mut O,
) -> Result<OptimizeReport>
where
    T: Float + ScalarOperand + FromPrimitive + 'static,
    F: FnMut(&ComputationGraph<T>, &[BoundNetwork]) -> anyhow::Result<L>,
    L: Into<Loss>,
    O: Optimizer<T> + ?Sized,
{
    run(networks, loss_fn, options, optimizer, &mut io::stdout())
}

/// The loop behind [`optimize_with`], writing verbose output to `out`
fn run<T, F, L, O, W>(
    networks: &mut [TensorNetwork<T>],
    mut loss_fn: F,
    options: &OptimizeOptions,
    optimizer: &mut O,
    out: &mut W,
) -> Result<OptimizeReport>
where
    T: Float + ScalarOperand + FromPrimitive + 'static,
    F: FnMut(&ComputationGraph<T>, &[BoundNetwork]) -> anyhow::Result<L>,
    L: Into<Loss>,
    O: Optimizer<T> + ?Sized,
    W: Write + ?Sized,
{
    options.validate()?;

    let num_params = parameter_set(networks).len();
    if num_params == 0 {
        return Err(OptimizeError::NoParameters);
    }
    let dof: usize = networks.iter().map(tnopt_net::dof).sum();
    debug!(num_params, dof, "starting optimization");

    let graph = ComputationGraph::<T>::new();
    let mut trace: Vec<f64> = Vec::new();
    let start = Instant::now();
    let mut iter = 0;

    let (terms, termination) = loop {
        optimizer.zero_grad(&mut parameter_set(networks));
        graph.clear();

        let bound = networks
            .iter()
            .map(|n| n.bind(&graph))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(OptimizeError::Autodiff)?;

        let loss: Loss = loss_fn(&graph, &bound)
            .map_err(OptimizeError::LossFunction)?
            .into();
        let (combined, terms) = combine_terms(&graph, loss.into_terms())?;
        let total = to_f64(graph.scalar(&combined).map_err(OptimizeError::Autodiff)?)?;
        trace.push(total);

        if has_converged(&trace, options.tol) {
            let tol = options.tol.unwrap_or_default();
            break (terms, Termination::Converged { tol });
        }
        if iter == options.max_iter {
            break (terms, Termination::MaxIterReached);
        }

        if options.print_freq > 0 && iter % options.print_freq == 0 {
            let elapsed = start.elapsed();
            debug!(iter, loss = total, elapsed_s = elapsed.as_secs_f64(), "progress");
            if options.verbose {
                writeln!(out, "{}", progress_line(iter, &terms, total, elapsed))?;
            }
        }

        graph
            .backward(&combined)
            .map_err(OptimizeError::Autodiff)?;
        for (network, b) in networks.iter_mut().zip(&bound) {
            network
                .absorb_gradients(&graph, b)
                .map_err(OptimizeError::Autodiff)?;
        }
        optimizer
            .step(&mut parameter_set(networks))
            .map_err(OptimizeError::Optimizer)?;

        iter += 1;
    };

    let elapsed = start.elapsed();
    let loss = trace.last().copied().unwrap_or(f64::NAN);
    let converged = matches!(termination, Termination::Converged { .. });

    if options.verbose {
        let tol = match termination {
            Termination::Converged { tol } => Some(tol),
            Termination::MaxIterReached => None,
        };
        writeln!(out, "{}", final_line(iter, &terms, loss, elapsed, tol))?;
    }
    info!(
        iterations = iter,
        converged,
        loss,
        elapsed_s = elapsed.as_secs_f64(),
        "optimization finished"
    );

    Ok(OptimizeReport {
        iterations: iter,
        converged,
        termination,
        terms,
        loss,
        trace,
        elapsed,
    })
}

/// Learnable parameters of every network: networks in order, cores before factors
fn parameter_set<T>(networks: &mut [TensorNetwork<T>]) -> Vec<&mut Parameter<T>>
where
    T: Float + ScalarOperand + FromPrimitive,
{
    networks
        .iter_mut()
        .flat_map(|n| n.learnable_parameters_mut())
        .collect()
}

/// Sum the loss terms on the tape, returning the sum and each term's value
fn combine_terms<T>(
    graph: &ComputationGraph<T>,
    terms: Vec<Variable>,
) -> Result<(Variable, Vec<f64>)>
where
    T: Float + ScalarOperand + FromPrimitive,
{
    if terms.is_empty() {
        return Err(OptimizeError::EmptyLoss);
    }

    let mut values = Vec::with_capacity(terms.len());
    let mut combined: Option<Variable> = None;
    for (index, term) in terms.iter().enumerate() {
        let value = graph.value(term).map_err(OptimizeError::LossFunction)?;
        if value.len() != 1 {
            return Err(OptimizeError::NonScalarLoss {
                index,
                shape: value.shape().to_vec(),
            });
        }
        values.push(to_f64(graph.scalar(term).map_err(OptimizeError::Autodiff)?)?);

        let scalar = graph.reshape(term, &[]).map_err(OptimizeError::Autodiff)?;
        combined = Some(match combined {
            Some(acc) => graph.add(&acc, &scalar).map_err(OptimizeError::Autodiff)?,
            None => scalar,
        });
    }

    let combined = combined.ok_or(OptimizeError::EmptyLoss)?;
    Ok((combined, values))
}

fn to_f64<T: Float>(value: T) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| OptimizeError::Autodiff(anyhow!("loss value is not representable as f64")))
}
