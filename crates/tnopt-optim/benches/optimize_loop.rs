//! Benchmarks of the optimization loop
//!
//! Measures a fixed number of fitting iterations for tensor trains of growing order, and
//! the cost of one differentiable reconstruction on its own.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scirs2_core::ndarray_ext::{ArrayD, IxDyn};
use std::hint::black_box;
use tnopt_ad::ComputationGraph;
use tnopt_net::TensorNetwork;
use tnopt_optim::{optimize, OptimizeOptions};

fn network(order: usize, size: usize, rank: usize) -> TensorNetwork<f64> {
    let shape = vec![size; order];
    let mut ranks = vec![rank; order + 1];
    ranks[0] = 1;
    ranks[order] = 1;
    TensorNetwork::from_fn(&shape, &ranks, |n, idx| {
        ((n * 31 + idx[0] * 7 + idx[1] * 3 + idx[2]) as f64 * 0.37).sin() * 0.5
    })
    .unwrap()
}

fn target(order: usize, size: usize) -> ArrayD<f64> {
    let shape = vec![size; order];
    let n: usize = shape.iter().product();
    ArrayD::from_shape_vec(IxDyn(&shape), (0..n).map(|i| (i as f64 * 0.11).cos()).collect())
        .unwrap()
}

/// Benchmark 20 Adam iterations of a least-squares fit
fn bench_fit_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_20_iterations");

    for order in [2, 3, 4].iter() {
        let size = 6;
        let t = target(*order, size);
        group.throughput(Throughput::Elements(t.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(order), order, |bencher, &order| {
            bencher.iter(|| {
                let mut tt = network(order, size, 3);
                let report = optimize(
                    std::slice::from_mut(&mut tt),
                    |graph, nets| {
                        let full = nets[0].full(graph)?;
                        let target = graph.constant(t.clone())?;
                        let diff = graph.sub(&full, &target)?;
                        graph.sum(&graph.pow(&diff, 2.0)?)
                    },
                    &OptimizeOptions::default().no_tol().max_iter(20).quiet(),
                )
                .unwrap();
                black_box(report);
            });
        });
    }
    group.finish();
}

/// Benchmark one reconstruction plus backward pass
fn bench_reconstruction_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruction_backward");

    for rank in [2, 4, 8].iter() {
        let tt = network(4, 8, *rank);
        group.bench_with_input(BenchmarkId::from_parameter(rank), rank, |bencher, _| {
            bencher.iter(|| {
                let graph = ComputationGraph::<f64>::new();
                let bound = tt.bind(&graph).unwrap();
                let full = bound.full(&graph).unwrap();
                let loss = graph.sum(&full).unwrap();
                graph.backward(black_box(&loss)).unwrap();
                black_box(graph.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit_iterations, bench_reconstruction_backward);
criterion_main!(benches);
