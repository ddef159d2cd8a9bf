//! Structural errors raised when assembling a tensor network

use thiserror::Error;

/// A set of cores and factors that does not form a valid tensor network
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("a tensor network needs at least one core")]
    Empty,

    #[error("core {index} must be 3-way (r_left, size, r_right), got {ndim} dimensions")]
    CoreNotThreeWay { index: usize, ndim: usize },

    #[error("core {index} has a zero-sized dimension: {shape:?}")]
    ZeroSizedCore { index: usize, shape: Vec<usize> },

    #[error("rank mismatch between cores {} and {index}: right rank {left} vs left rank {right}", .index - 1)]
    RankMismatch {
        index: usize,
        left: usize,
        right: usize,
    },

    #[error("boundary ranks differ: first core starts with {first}, last core ends with {last}")]
    BoundaryRankMismatch { first: usize, last: usize },

    #[error("expected one factor slot per core ({cores}), got {factors}")]
    FactorCountMismatch { cores: usize, factors: usize },

    #[error("factor {index} must be a matrix, got {ndim} dimensions")]
    FactorNotMatrix { index: usize, ndim: usize },

    #[error("factor {index} must have {expected} columns to match its core, got {actual}")]
    FactorSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("shape has {shape} dimensions but {ranks} ranks were given (expected {})", .shape + 1)]
    RankCount { shape: usize, ranks: usize },
}
