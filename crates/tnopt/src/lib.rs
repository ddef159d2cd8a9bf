//! # tnopt
//!
//! Gradient-based fitting of tensor-train, tensor-ring and Tucker-projected tensor-train
//! networks.
//!
//! This is the **meta crate** that re-exports the tnopt components.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tnopt::prelude::*;
//!
//! // A 3-way tensor train with ranks (1, 4, 4, 1)
//! let mut tt = TensorNetwork::from_fn(&[8, 8, 8], &[1, 4, 4, 1], |_, _| 0.1)?;
//! println!("learnable elements: {}", dof(&tt));
//!
//! let report = optimize(
//!     std::slice::from_mut(&mut tt),
//!     |graph, nets| {
//!         let full = nets[0].full(graph)?;
//!         let target = graph.constant(target.clone())?;
//!         let diff = graph.sub(&full, &target)?;
//!         graph.sum(&graph.pow(&diff, 2.0)?)
//!     },
//!     &OptimizeOptions::default(),
//! )?;
//! ```
//!
//! ## Components
//!
//! - [`ad`]: tape-based reverse-mode AD, learnable parameters, Adam and SGD
//! - [`net`]: tensor-network container, `dof`, differentiable reconstruction
//! - [`optim`]: the `optimize` driver, its options, report and stopping rule
//! - [`tracing_support`]: subscriber setup for the driver's `tracing` events
//!
//! ## Features
//!
//! - `tracing` (default): install a `tracing-subscriber` via
//!   [`tracing_support::init_tracing`]

pub use tnopt_ad as ad;
pub use tnopt_net as net;
pub use tnopt_optim as optim;

pub mod tracing_support;

pub mod prelude {
    //! Prelude module for convenient imports

    // Automatic differentiation
    pub use crate::ad::{Adam, ComputationGraph, Optimizer, OptimizerConfig, Parameter, Sgd, Variable};

    // Tensor networks
    pub use crate::net::{dof, BoundNetwork, NetworkError, TensorNetwork};

    // Optimization
    pub use crate::optim::{
        optimize, optimize_with, Loss, OptimizeError, OptimizeOptions, OptimizeReport,
        Termination,
    };
}
