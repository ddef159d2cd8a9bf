//! # tnopt-net
//!
//! Tensor-train and tensor-ring containers whose cores (and optional per-mode factor
//! matrices) are learnable [`tnopt_ad::Parameter`]s.
//!
//! A [`TensorNetwork`] owns its parameters. To build a differentiable loss, bind it to a
//! [`tnopt_ad::ComputationGraph`]; the resulting [`BoundNetwork`] reconstructs the full
//! tensor on the tape, and [`TensorNetwork::absorb_gradients`] copies the gradients of a
//! backward pass back onto the parameters.
//!
//! ```rust,ignore
//! use tnopt_ad::ComputationGraph;
//! use tnopt_net::TensorNetwork;
//!
//! let mut tt = TensorNetwork::from_fn(&[4, 5, 6], &[1, 3, 3, 1], |_, _| 0.1)?;
//! let graph = ComputationGraph::new();
//! let bound = tt.bind(&graph)?;
//! let loss = graph.sum(&bound.full(&graph)?)?;
//! graph.backward(&loss)?;
//! tt.absorb_gradients(&graph, &bound)?;
//! ```

pub mod bound;
pub mod error;
pub mod network;

pub use bound::BoundNetwork;
pub use error::NetworkError;
pub use network::TensorNetwork;

use scirs2_core::ndarray_ext::ScalarOperand;
use scirs2_core::numeric::{Float, FromPrimitive};

/// Degrees of freedom: elements of the cores and factors that are learnable
pub fn dof<T>(network: &TensorNetwork<T>) -> usize
where
    T: Float + ScalarOperand + FromPrimitive,
{
    network.learnable_parameters().map(|p| p.numel()).sum()
}
