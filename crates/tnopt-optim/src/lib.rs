//! # tnopt-optim
//!
//! Iterative gradient-based fitting of tensor networks.
//!
//! [`optimize`] repeatedly evaluates a user loss on one or more
//! [`tnopt_net::TensorNetwork`]s, backpropagates through the reconstruction and updates
//! every learnable core and factor, until the loss improvement is small and slowing
//! down, or the iteration budget runs out.
//!
//! ```rust,ignore
//! use tnopt_optim::{optimize, OptimizeOptions};
//!
//! let report = optimize(&mut networks, |graph, nets| {
//!     let full = nets[0].full(graph)?;
//!     let target = graph.constant(target.clone())?;
//!     let diff = graph.sub(&full, &target)?;
//!     graph.sum(&graph.pow(&diff, 2.0)?)
//! }, &OptimizeOptions::default().quiet())?;
//! assert!(report.converged);
//! ```

pub mod driver;
pub mod error;
pub mod loss;
pub mod options;
pub mod progress;
pub mod stopping;

pub use driver::{optimize, optimize_with, OptimizeReport, Termination};
pub use error::{OptimizeError, Result};
pub use loss::Loss;
pub use options::OptimizeOptions;
pub use stopping::has_converged;
pub use tnopt_net::dof;
