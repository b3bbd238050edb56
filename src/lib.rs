//! # flock
//!
//! Clustering of dense, categorical and weighted-sparse records over one shared
//! vector model ([`VectorStore`]).
//!
//! Three entry points:
//! - [`cluster_partition`]: k-means / k-medians with random restarts
//! - [`cluster_grid`]: self-organizing map on an nx × ny grid
//! - [`cluster_tree`]: agglomerative dendrogram cut into k groups
//!
//! Input is resolved once into a [`VectorStore`] by [`prepare_store`]; label
//! data goes through the [`Densifier`] first.
//!
//! ```
//! use flock::{ClusterOptions, cluster_partition};
//!
//! # fn main() -> Result<(), flock::ClusterError> {
//! let rows = vec![vec![0.0, 0.1], vec![0.2, 0.0], vec![5.0, 5.1], vec![5.2, 4.9]];
//! let result = cluster_partition(2, rows, &ClusterOptions::new().with_seed(7))?;
//! assert_eq!(result.assignment[0], result.assignment[1]);
//! assert_ne!(result.assignment[0], result.assignment[2]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod kcluster;
pub mod som;
pub mod treecluster;

#[cfg(test)]
mod tests;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use builder::{ClusterOptions, EmptyClusterPolicy, Linkage, Method, Seeding, StopCheck};
pub use flock_core::{
    ClusterError, ClusterResult, DEGENERATE_DISTANCE, Densifier, Metric, SparseRecords,
    VectorStore, Vocabulary, densify, distance,
};
pub use kcluster::{KClusterStage, PartitionResult, Trial};
pub use som::{GridResult, SomStage};
pub use treecluster::{Dendrogram, Merge, TreeStage};

/// Records to cluster, in one of the three supported shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClusterInput {
    Dense(Vec<Vec<f64>>),
    LabelSets(Vec<Vec<String>>),
    LabeledWeights(Vec<Vec<(String, f64)>>),
}

impl From<Vec<Vec<f64>>> for ClusterInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        ClusterInput::Dense(rows)
    }
}

impl From<Vec<Vec<String>>> for ClusterInput {
    fn from(records: Vec<Vec<String>>) -> Self {
        ClusterInput::LabelSets(records)
    }
}

impl From<Vec<Vec<&str>>> for ClusterInput {
    fn from(records: Vec<Vec<&str>>) -> Self {
        ClusterInput::LabelSets(
            records
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

impl From<Vec<Vec<(String, f64)>>> for ClusterInput {
    fn from(records: Vec<Vec<(String, f64)>>) -> Self {
        ClusterInput::LabeledWeights(records)
    }
}

impl From<SparseRecords> for ClusterInput {
    fn from(records: SparseRecords) -> Self {
        match records {
            SparseRecords::LabelSets(r) => ClusterInput::LabelSets(r),
            SparseRecords::LabeledWeights(r) => ClusterInput::LabeledWeights(r),
        }
    }
}

/// Result of [`cluster_tree`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeResult {
    /// Component id in `0..k` for every row.
    pub assignment: Vec<usize>,
    pub tree: Dendrogram,
}

/// Resolve `input` and the data-shaping options into a validated store.
///
/// Dense input keeps its mask and column weights. Label input (or dense input
/// with `sparse` set, where every distinct value becomes a label) is densified;
/// its mask is discarded and `label_weights` is resampled onto the vocabulary.
/// `row_weights` apply before `transpose`, so after transposition they weigh
/// the columns.
pub fn prepare_store(input: ClusterInput, options: &ClusterOptions) -> ClusterResult<VectorStore> {
    let records = match input {
        ClusterInput::Dense(rows) if !options.sparse => {
            let mut store = VectorStore::load(rows, options.mask.clone(), options.row_weights.clone())?;
            if let Some(weights) = &options.weights {
                store = store.with_column_weights(weights.clone())?;
            }
            return finish_store(store, options);
        }
        ClusterInput::Dense(rows) => {
            debug!("Densifying {} numeric rows as label sets", rows.len());
            SparseRecords::LabelSets(
                rows.iter()
                    .map(|r| r.iter().map(|v| v.to_string()).collect())
                    .collect(),
            )
        }
        ClusterInput::LabelSets(r) => SparseRecords::LabelSets(r),
        ClusterInput::LabeledWeights(r) => SparseRecords::LabeledWeights(r),
    };

    if options.mask.is_some() {
        warn!("Mask ignored for sparse input");
    }
    if options.weights.is_some() {
        warn!("Column weights ignored for sparse input, use label_weights instead");
    }

    let (mut store, _) = densify(&records, options.label_weights.as_deref())?;
    if let Some(weights) = &options.row_weights {
        store = store.with_row_weights(weights.clone())?;
    }
    finish_store(store, options)
}

fn finish_store(store: VectorStore, options: &ClusterOptions) -> ClusterResult<VectorStore> {
    if options.transpose {
        debug!("Clustering columns: transposing {}x{}", store.nrows, store.ncols);
        Ok(store.transpose())
    } else {
        Ok(store)
    }
}

/// k-means (or k-medians with `Method::Median`) over `input`.
pub fn cluster_partition(
    k: usize,
    input: impl Into<ClusterInput>,
    options: &ClusterOptions,
) -> ClusterResult<PartitionResult> {
    let store = prepare_store(input.into(), options)?;
    KClusterStage::new(k, options).execute(&store)
}

/// Self-organizing map with an `nx` × `ny` grid.
pub fn cluster_grid(
    nx: usize,
    ny: usize,
    input: impl Into<ClusterInput>,
    options: &ClusterOptions,
) -> ClusterResult<GridResult> {
    if nx == 0 || ny == 0 {
        return Err(ClusterError::invalid_grid(nx, ny));
    }
    let store = prepare_store(input.into(), options)?;
    SomStage::new(nx, ny, options).execute(&store)
}

/// Hierarchical clustering with `options.linkage`, cut into `k` groups.
pub fn cluster_tree(
    k: usize,
    input: impl Into<ClusterInput>,
    options: &ClusterOptions,
) -> ClusterResult<TreeResult> {
    let store = prepare_store(input.into(), options)?;
    if k < 1 || k > store.nrows {
        return Err(ClusterError::invalid_k(k, store.nrows));
    }
    let tree = TreeStage::new(options.linkage, options.metric).execute(&store);
    let assignment = tree.cut(k)?;
    info!("Tree cut into {} groups", k);
    Ok(TreeResult { assignment, tree })
}
