//! Core data model for the flock clustering engine.
//!
//! - [`matrix::VectorStore`]: rows, observed-mask, row and column weights
//! - [`densify`]: label sets / labeled weights to a dense store over a vocabulary
//! - [`distance`]: eight masked, weighted distance metrics
//! - [`error::ClusterError`]: precondition failures shared by every stage

pub mod densify;
pub mod distance;
pub mod error;
pub mod matrix;

pub use densify::{Densifier, SparseRecords, Vocabulary, densify};
pub use distance::{DEGENERATE_DISTANCE, Metric, distance};
pub use error::{ClusterError, ClusterResult};
pub use matrix::{VectorStore, rows_to_dense_matrix};

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}
