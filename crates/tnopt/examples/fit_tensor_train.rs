//! Fit a tensor train and a Tucker-projected tensor ring to the same target
//!
//! Run with: `cargo run -p tnopt --example fit_tensor_train`
//! Set `RUST_LOG=tnopt_optim=debug` to see the per-step tracing events.

use anyhow::Result;
use scirs2_core::ndarray_ext::{ArrayD, IxDyn};
use tnopt::prelude::*;
use tnopt::tracing_support::{init_tracing, TracingConfig};

/// Smooth 3-way target: sin(i + 2j) * cos(k / 2)
fn target(shape: &[usize]) -> ArrayD<f64> {
    ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        let (i, j, k) = (idx[0] as f64, idx[1] as f64, idx[2] as f64);
        (0.3 * i + 0.6 * j).sin() * (0.5 * k).cos()
    })
}

fn init(core: usize, idx: &[usize]) -> f64 {
    (((core * 13 + idx[0] * 5 + idx[1] * 3 + idx[2]) as f64) * 0.71).sin() * 0.3
}

fn main() -> Result<()> {
    init_tracing(TracingConfig::default())?;

    let shape = [10, 10, 10];
    let t = target(&shape);

    println!("=== Tensor train ===");
    let mut tt = TensorNetwork::from_fn(&shape, &[1, 3, 3, 1], init)?;
    println!("{}", tt);
    println!("dof = {}", dof(&tt));

    let report = optimize(
        std::slice::from_mut(&mut tt),
        |graph, nets| {
            let full = nets[0].full(graph)?;
            let target = graph.constant(t.clone())?;
            let diff = graph.sub(&full, &target)?;
            graph.sum(&graph.pow(&diff, 2.0)?)
        },
        &OptimizeOptions::default().max_iter(3_000).print_freq(500),
    )?;
    println!(
        "converged: {}, {} iterations, final loss {:.6}",
        report.converged, report.iterations, report.loss
    );

    println!("\n=== Tucker-projected tensor ring, with a rank penalty ===");
    let cores: Vec<ArrayD<f64>> = (0..3)
        .map(|n| {
            ArrayD::from_shape_fn(IxDyn(&[2, 4, 2]), |idx| {
                init(n, &[idx[0], idx[1], idx[2]])
            })
        })
        .collect();
    let factors = (0..3)
        .map(|n| {
            Some(ArrayD::from_shape_fn(IxDyn(&[10, 4]), |idx| {
                init(n + 3, &[idx[0], idx[1], 0])
            }))
        })
        .collect();
    let mut tr = TensorNetwork::with_factors(cores, factors)?;
    println!("{}", tr);

    let mut adam = Adam::new(OptimizerConfig::adam().learning_rate(1e-2));
    let report = optimize_with(
        std::slice::from_mut(&mut tr),
        |graph, nets| {
            let full = nets[0].full(graph)?;
            let target = graph.constant(t.clone())?;
            let diff = graph.sub(&full, &target)?;
            let fit = graph.sum(&graph.pow(&diff, 2.0)?)?;

            let mut penalty = graph.scalar_constant(0.0)?;
            for core in nets[0].cores() {
                let sq = graph.sum(&graph.pow(core, 2.0)?)?;
                penalty = graph.add(&penalty, &sq)?;
            }
            let penalty = graph.scale(&penalty, 1e-4)?;
            Ok((fit, penalty))
        },
        &OptimizeOptions::default().tol(1e-6).max_iter(2_000).print_freq(250),
        &mut adam,
    )?;
    println!(
        "converged: {}, {} iterations, final terms {:?}",
        report.converged, report.iterations, report.terms
    );

    Ok(())
}
