//! # tnopt-ad
//!
//! Automatic differentiation support for tnopt.
//!
//! This crate provides:
//! - A tape-based computation graph recording tensor operations for reverse-mode AD
//! - Learnable [`Parameter`]s carrying a value, a learnability flag and an accumulated gradient
//! - First-order optimizers (SGD, Adam) updating parameter sets in place
//! - Finite-difference gradient checking for testing backward rules

pub mod gradcheck;
pub mod graph;
pub mod optimizers;
pub mod parameter;

// Re-exports
pub use graph::{ComputationGraph, GraphStats, NodeId, Operation, Variable};
pub use optimizers::{Adam, Optimizer, OptimizerConfig, Sgd};
pub use parameter::Parameter;
