//! Tensor-train / tensor-ring container with optional factor matrices
//!
//! A network of dimension N holds N cores and N factor slots:
//!
//! X(i₁, ..., iₙ) = trace( G₁\[i₁\] × G₂\[i₂\] × ... × Gₙ\[iₙ\] )
//!
//! Where:
//! - Gₖ is a core with shape (rₖ₋₁, sₖ, rₖ)
//! - r₀ = rₙ (r₀ = rₙ = 1 for a tensor train, larger for a tensor ring)
//! - when factor Uₖ with shape (iₖ, sₖ) is present, the core is first projected along its
//!   middle mode: Gₖ\[iₖ\] = Σₛ Uₖ\[iₖ, s\] Gₖ\[s\], so the network's size in mode k is iₖ
//!
//! Every core and factor is a [`Parameter`] and carries its own learnability flag.

use crate::bound::BoundNetwork;
use crate::error::NetworkError;
use anyhow::Result;
use scirs2_core::ndarray_ext::{Array3, ArrayD, ScalarOperand};
use scirs2_core::numeric::{Float, FromPrimitive};
use std::fmt;
use tnopt_ad::{ComputationGraph, Parameter};

/// Tensor network made of 3-way cores and optional per-mode factor matrices
#[derive(Debug, Clone, PartialEq)]
pub struct TensorNetwork<T> {
    cores: Vec<Parameter<T>>,
    factors: Vec<Option<Parameter<T>>>,
}

impl<T> TensorNetwork<T>
where
    T: Float + ScalarOperand + FromPrimitive,
{
    /// Network from learnable cores, without factor matrices
    pub fn new(cores: Vec<ArrayD<T>>) -> Result<Self, NetworkError> {
        let factors = vec![None; cores.len()];
        Self::with_factors(cores, factors)
    }

    /// Network from learnable cores and factor matrices
    pub fn with_factors(
        cores: Vec<ArrayD<T>>,
        factors: Vec<Option<ArrayD<T>>>,
    ) -> Result<Self, NetworkError> {
        Self::from_parameters(
            cores.into_iter().map(Parameter::new).collect(),
            factors
                .into_iter()
                .map(|f| f.map(Parameter::new))
                .collect(),
        )
    }

    /// Network from parameters whose learnability flags are already set
    pub fn from_parameters(
        cores: Vec<Parameter<T>>,
        factors: Vec<Option<Parameter<T>>>,
    ) -> Result<Self, NetworkError> {
        validate(&cores, &factors)?;
        Ok(Self { cores, factors })
    }

    /// Network with cores of the given ranks, filled by `f(core_index, [a, s, b])`
    ///
    /// `ranks` lists r₀..rₙ, so it has one more entry than `shape`.
    pub fn from_fn<F>(shape: &[usize], ranks: &[usize], mut f: F) -> Result<Self, NetworkError>
    where
        F: FnMut(usize, &[usize]) -> T,
    {
        if ranks.len() != shape.len() + 1 {
            return Err(NetworkError::RankCount {
                shape: shape.len(),
                ranks: ranks.len(),
            });
        }
        let cores = shape
            .iter()
            .enumerate()
            .map(|(n, &size)| {
                Array3::from_shape_fn((ranks[n], size, ranks[n + 1]), |(a, s, b)| {
                    f(n, &[a, s, b])
                })
                .into_dyn()
            })
            .collect();
        Self::new(cores)
    }

    /// Number of dimensions (cores)
    pub fn ndim(&self) -> usize {
        self.cores.len()
    }

    /// Size of each mode, after factor projection
    pub fn shape(&self) -> Vec<usize> {
        self.cores
            .iter()
            .zip(&self.factors)
            .map(|(core, factor)| match factor {
                Some(u) => u.shape()[0],
                None => core.shape()[1],
            })
            .collect()
    }

    /// Middle-mode size of each core (the factors' column count where present)
    pub fn core_sizes(&self) -> Vec<usize> {
        self.cores.iter().map(|c| c.shape()[1]).collect()
    }

    /// Ranks r₀..rₙ
    pub fn ranks(&self) -> Vec<usize> {
        let mut ranks: Vec<usize> = self.cores.iter().map(|c| c.shape()[0]).collect();
        if let Some(last) = self.cores.last() {
            ranks.push(last.shape()[2]);
        }
        ranks
    }

    /// Whether the boundary ranks are larger than one
    pub fn is_ring(&self) -> bool {
        self.cores.first().is_some_and(|c| c.shape()[0] > 1)
    }

    pub fn cores(&self) -> &[Parameter<T>] {
        &self.cores
    }

    pub fn factors(&self) -> &[Option<Parameter<T>>] {
        &self.factors
    }

    pub fn core(&self, n: usize) -> Option<&Parameter<T>> {
        self.cores.get(n)
    }

    pub fn core_mut(&mut self, n: usize) -> Option<&mut Parameter<T>> {
        self.cores.get_mut(n)
    }

    pub fn factor(&self, n: usize) -> Option<&Parameter<T>> {
        self.factors.get(n).and_then(Option::as_ref)
    }

    pub fn factor_mut(&mut self, n: usize) -> Option<&mut Parameter<T>> {
        self.factors.get_mut(n).and_then(Option::as_mut)
    }

    /// Total number of stored elements, learnable or not
    pub fn numel(&self) -> usize {
        self.cores
            .iter()
            .chain(self.factors.iter().flatten())
            .map(Parameter::numel)
            .sum()
    }

    /// Mark every core and factor as learnable or frozen
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        for param in self.cores.iter_mut().chain(self.factors.iter_mut().flatten()) {
            param.set_requires_grad(requires_grad);
        }
    }

    /// Cores, then present factors, that have their learnability flag set
    pub fn learnable_parameters(&self) -> impl Iterator<Item = &Parameter<T>> {
        self.cores
            .iter()
            .chain(self.factors.iter().flatten())
            .filter(|p| p.requires_grad())
    }

    /// Mutable view of [`TensorNetwork::learnable_parameters`], in the same order
    pub fn learnable_parameters_mut(&mut self) -> impl Iterator<Item = &mut Parameter<T>> {
        self.cores
            .iter_mut()
            .chain(self.factors.iter_mut().flatten())
            .filter(|p| p.requires_grad())
    }

    /// Register every core and factor on the tape
    ///
    /// Learnable parameters become gradient-tracking variables, frozen ones constants.
    pub fn bind(&self, graph: &ComputationGraph<T>) -> Result<BoundNetwork> {
        let cores = self
            .cores
            .iter()
            .map(|c| graph.variable(c.value().clone(), c.requires_grad()))
            .collect::<Result<Vec<_>>>()?;
        let factors = self
            .factors
            .iter()
            .map(|f| {
                f.as_ref()
                    .map(|u| graph.variable(u.value().clone(), u.requires_grad()))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BoundNetwork::new(
            cores,
            factors,
            self.shape(),
            self.core_sizes(),
            self.ranks(),
        ))
    }

    /// Add the gradients the tape holds for `bound` to the learnable parameters
    pub fn absorb_gradients(
        &mut self,
        graph: &ComputationGraph<T>,
        bound: &BoundNetwork,
    ) -> Result<()> {
        let slots = self
            .cores
            .iter_mut()
            .zip(bound.cores().iter().map(Some))
            .chain(
                self.factors
                    .iter_mut()
                    .zip(bound.factors())
                    .filter_map(|(p, v)| p.as_mut().map(|p| (p, v.as_ref()))),
            );

        for (param, var) in slots {
            let Some(var) = var else {
                anyhow::bail!("bound network is missing a factor present on the network");
            };
            if param.requires_grad() && graph.has_gradient(var) {
                param.accumulate_grad(graph.gradient(var)?);
            }
        }
        Ok(())
    }

    /// Dense reconstruction of the full tensor
    pub fn full(&self) -> Result<ArrayD<T>> {
        let graph = ComputationGraph::new();
        let bound = self.bind(&graph)?;
        let full = bound.full(&graph)?;
        graph.value(&full)
    }
}

fn validate<T: Float>(
    cores: &[Parameter<T>],
    factors: &[Option<Parameter<T>>],
) -> Result<(), NetworkError> {
    if cores.is_empty() {
        return Err(NetworkError::Empty);
    }
    if factors.len() != cores.len() {
        return Err(NetworkError::FactorCountMismatch {
            cores: cores.len(),
            factors: factors.len(),
        });
    }

    for (index, core) in cores.iter().enumerate() {
        let shape = core.shape();
        if shape.len() != 3 {
            return Err(NetworkError::CoreNotThreeWay {
                index,
                ndim: shape.len(),
            });
        }
        if shape.contains(&0) {
            return Err(NetworkError::ZeroSizedCore {
                index,
                shape: shape.to_vec(),
            });
        }
        if index > 0 {
            let left = cores[index - 1].shape()[2];
            if left != shape[0] {
                return Err(NetworkError::RankMismatch {
                    index,
                    left,
                    right: shape[0],
                });
            }
        }
    }

    let first = cores[0].shape()[0];
    let last = cores[cores.len() - 1].shape()[2];
    if first != last {
        return Err(NetworkError::BoundaryRankMismatch { first, last });
    }

    for (index, (core, factor)) in cores.iter().zip(factors).enumerate() {
        let Some(u) = factor else {
            continue;
        };
        if u.shape().len() != 2 {
            return Err(NetworkError::FactorNotMatrix {
                index,
                ndim: u.shape().len(),
            });
        }
        if u.shape()[1] != core.shape()[1] {
            return Err(NetworkError::FactorSizeMismatch {
                index,
                expected: core.shape()[1],
                actual: u.shape()[1],
            });
        }
    }

    Ok(())
}

impl<T> fmt::Display for TensorNetwork<T>
where
    T: Float + ScalarOperand + FromPrimitive,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_ring() { "TR" } else { "TT" };
        let tucker = if self.factors.iter().any(Option::is_some) {
            "-Tucker"
        } else {
            ""
        };
        writeln!(f, "{}D {}{} tensor:", self.ndim(), kind, tucker)?;
        writeln!(f, "  shape: {:?}", self.shape())?;
        writeln!(f, "  ranks: {:?}", self.ranks())?;
        write!(
            f,
            "  elements: {} ({} learnable)",
            self.numel(),
            crate::dof(self)
        )
    }
}
