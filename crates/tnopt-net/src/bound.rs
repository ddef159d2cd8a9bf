//! A tensor network registered on a computation graph
//!
//! Binding turns every core and factor into a graph [`Variable`]; reconstructing the
//! full tensor from those variables records each contraction on the tape so a loss
//! built on top of it backpropagates into the cores and factors.

use anyhow::{anyhow, Result};
use scirs2_core::ndarray_ext::{ArrayD, IxDyn, ScalarOperand};
use scirs2_core::numeric::{Float, FromPrimitive};
use tnopt_ad::{ComputationGraph, Variable};

/// Graph handles for the cores and factors of one [`crate::TensorNetwork`]
#[derive(Debug, Clone)]
pub struct BoundNetwork {
    cores: Vec<Variable>,
    factors: Vec<Option<Variable>>,
    shape: Vec<usize>,
    core_sizes: Vec<usize>,
    ranks: Vec<usize>,
}

impl BoundNetwork {
    pub(crate) fn new(
        cores: Vec<Variable>,
        factors: Vec<Option<Variable>>,
        shape: Vec<usize>,
        core_sizes: Vec<usize>,
        ranks: Vec<usize>,
    ) -> Self {
        Self {
            cores,
            factors,
            shape,
            core_sizes,
            ranks,
        }
    }

    pub fn cores(&self) -> &[Variable] {
        &self.cores
    }

    pub fn factors(&self) -> &[Option<Variable>] {
        &self.factors
    }

    pub fn core(&self, n: usize) -> Option<&Variable> {
        self.cores.get(n)
    }

    pub fn factor(&self, n: usize) -> Option<&Variable> {
        self.factors.get(n).and_then(Option::as_ref)
    }

    pub fn ndim(&self) -> usize {
        self.cores.len()
    }

    /// Size of each mode of the reconstructed tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Core `n` with its factor applied along the middle mode: shape (rₙ, iₙ, rₙ₊₁)
    pub fn effective_core<T>(&self, graph: &ComputationGraph<T>, n: usize) -> Result<Variable>
    where
        T: Float + ScalarOperand + FromPrimitive,
    {
        let core = self
            .core(n)
            .ok_or_else(|| anyhow!("core {} out of range for a {}-d network", n, self.ndim()))?;
        let Some(factor) = self.factor(n) else {
            return Ok(*core);
        };

        let (r_left, r_right) = (self.ranks[n], self.ranks[n + 1]);
        let size = self.core_sizes[n];
        let rows = self.shape[n];

        // (r_l, s, r_r) -> (s, r_l * r_r), project, then back to (r_l, i, r_r)
        let moved = graph.transpose(core, &[1, 0, 2])?;
        let flat = graph.reshape(&moved, &[size, r_left * r_right])?;
        let projected = graph.matmul(factor, &flat)?;
        let unflat = graph.reshape(&projected, &[rows, r_left, r_right])?;
        graph.transpose(&unflat, &[1, 0, 2])
    }

    /// Dense reconstruction of the full tensor, recorded on `graph`
    pub fn full<T>(&self, graph: &ComputationGraph<T>) -> Result<Variable>
    where
        T: Float + ScalarOperand + FromPrimitive,
    {
        if self.cores.is_empty() {
            anyhow::bail!("cannot reconstruct an empty network");
        }

        let boundary = self.ranks[0];
        let mut acc = self.effective_core(graph, 0)?;
        let mut span = self.shape[0];

        for n in 1..self.ndim() {
            let (r_left, r_right) = (self.ranks[n], self.ranks[n + 1]);
            let size = self.shape[n];
            let core = self.effective_core(graph, n)?;

            // acc: (r₀, span, r_l) × core: (r_l, size, r_r) -> (r₀, span * size, r_r)
            let lhs = graph.reshape(&acc, &[boundary * span, r_left])?;
            let rhs = graph.reshape(&core, &[r_left, size * r_right])?;
            let prod = graph.matmul(&lhs, &rhs)?;
            span *= size;
            acc = graph.reshape(&prod, &[boundary, span, r_right])?;
        }

        // Trace over the boundary rank: (r₀, span, r₀) -> (span, r₀²) @ vec(I)
        let moved = graph.transpose(&acc, &[1, 0, 2])?;
        let flat = graph.reshape(&moved, &[span, boundary * boundary])?;
        let identity = graph.constant(ArrayD::from_shape_fn(
            IxDyn(&[boundary * boundary, 1]),
            |idx| {
                if idx[0] % (boundary + 1) == 0 {
                    T::one()
                } else {
                    T::zero()
                }
            },
        ))?;
        let traced = graph.matmul(&flat, &identity)?;
        graph.reshape(&traced, &self.shape)
    }
}

#[cfg(test)]
mod tests {
    use crate::TensorNetwork;
    use anyhow::Result;
    use scirs2_core::ndarray_ext::{array, ArrayD, IxDyn};
    use tnopt_ad::{ComputationGraph, Parameter};

    #[test]
    fn test_rank_one_train_is_outer_product() -> Result<()> {
        let tt = TensorNetwork::new(vec![
            array![[[1.0], [2.0]]].into_dyn(),
            array![[[3.0], [4.0], [5.0]]].into_dyn(),
        ])?;
        let full = tt.full()?;
        assert_eq!(full.shape(), &[2, 3]);
        assert_eq!(
            full,
            array![[3.0, 4.0, 5.0], [6.0, 8.0, 10.0]].into_dyn()
        );
        Ok(())
    }

    #[test]
    fn test_ring_takes_trace() -> Result<()> {
        // Single core of shape (2, 1, 2): the trace of a 2x2 matrix
        let core = ArrayD::from_shape_vec(IxDyn(&[2, 1, 2]), vec![1.0_f64, 2.0, 3.0, 4.0])?;
        let tr = TensorNetwork::new(vec![core])?;
        let full = tr.full()?;
        assert_eq!(full.shape(), &[1]);
        assert!((full[[0]] - 5.0_f64).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_ring_matches_explicit_trace() -> Result<()> {
        let tr = TensorNetwork::from_fn(&[2, 3], &[2, 2, 2], |n, idx| {
            (n * 7 + idx[0] * 3 + idx[1] * 2 + idx[2]) as f64 * 0.1
        })?;
        let full = tr.full()?;

        let g0 = tr.cores()[0].value();
        let g1 = tr.cores()[1].value();
        for i in 0..2 {
            for j in 0..3 {
                let mut expected = 0.0;
                for a in 0..2 {
                    for b in 0..2 {
                        expected += g0[[a, i, b]] * g1[[b, j, a]];
                    }
                }
                assert!((full[[i, j]] - expected).abs() < 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_factor_projects_middle_mode() -> Result<()> {
        let core = array![[[1.0], [2.0]]].into_dyn();
        let u = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]].into_dyn();
        let tt = TensorNetwork::with_factors(vec![core], vec![Some(u)])?;

        let full = tt.full()?;
        assert_eq!(full, array![1.0, 2.0, 3.0].into_dyn());
        Ok(())
    }

    #[test]
    fn test_gradients_reach_cores_and_factors() -> Result<()> {
        let mut tt = TensorNetwork::with_factors(
            vec![
                array![[[1.0, 0.5], [2.0, -1.0]]].into_dyn(),
                array![[[1.0], [0.0]], [[0.0], [1.0]]].into_dyn(),
            ],
            vec![None, Some(array![[1.0, 2.0], [3.0, 4.0], [0.5, 0.5]].into_dyn())],
        )?;

        let graph = ComputationGraph::<f64>::new();
        let bound = tt.bind(&graph)?;
        let full = bound.full(&graph)?;
        assert_eq!(graph.value(&full)?.shape(), &[2, 3]);

        let loss = graph.sum(&full)?;
        graph.backward(&loss)?;
        tt.absorb_gradients(&graph, &bound)?;

        assert!(tt.learnable_parameters().all(|p| p.grad().is_some()));
        Ok(())
    }

    #[test]
    fn test_frozen_core_gets_no_gradient() -> Result<()> {
        let mut tt = TensorNetwork::from_parameters(
            vec![
                Parameter::frozen(array![[[1.0], [2.0]]].into_dyn()),
                Parameter::new(array![[[3.0], [4.0]]].into_dyn()),
            ],
            vec![None, None],
        )?;
        assert_eq!(tt.learnable_parameters().count(), 1);

        let graph = ComputationGraph::<f64>::new();
        let bound = tt.bind(&graph)?;
        let full = bound.full(&graph)?;
        let loss = graph.sum(&full)?;
        graph.backward(&loss)?;
        tt.absorb_gradients(&graph, &bound)?;

        assert!(tt.cores()[0].grad().is_none());
        // d/dG1 sum(outer(g0, g1)) = sum(g0) = 3
        assert_eq!(
            tt.cores()[1].grad(),
            Some(&array![[[3.0], [3.0]]].into_dyn())
        );
        Ok(())
    }
}
