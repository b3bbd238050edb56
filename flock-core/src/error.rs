// flock-core/src/error.rs
//! Error types for loading data and running the clustering stages.
//!
//! Every error is a precondition failure raised before any computation starts.
//! Degenerate distance comparisons never error: they resolve to a sentinel
//! maximal distance (see [`crate::distance::DEGENERATE_DISTANCE`]).

use thiserror::Error;

/// Errors raised by the vector store, the densifier and the clustering entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// Mask, row, or weight dimensions disagree, or a value is unusable.
    #[error("Shape error: {message}")]
    Shape {
        /// What did not line up
        message: String,
    },

    /// Zero rows, zero columns, or zero records after densification.
    #[error("Empty input: {message}")]
    EmptyInput {
        /// Which part of the input was empty
        message: String,
    },

    /// Cluster count outside `[1, N]`.
    #[error("Invalid cluster count: k={k} must be in [1, {n_rows}]")]
    InvalidK {
        /// Requested number of clusters
        k: usize,
        /// Number of rows available
        n_rows: usize,
    },

    /// Non-positive self-organizing map grid dimension.
    #[error("Invalid grid: {nx}x{ny}, both dimensions must be > 0")]
    InvalidGrid {
        /// Grid size along x
        nx: usize,
        /// Grid size along y
        ny: usize,
    },
}

impl ClusterError {
    /// Create a Shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Create an EmptyInput error.
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    /// Create an InvalidK error.
    pub fn invalid_k(k: usize, n_rows: usize) -> Self {
        Self::InvalidK { k, n_rows }
    }

    /// Create an InvalidGrid error.
    pub fn invalid_grid(nx: usize, ny: usize) -> Self {
        Self::InvalidGrid { nx, ny }
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;
