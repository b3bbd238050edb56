//! Self-organizing map: an nx × ny grid of reference vectors trained by
//! competitive learning.
//!
//! Each step draws a row uniformly with replacement, finds the best-matching
//! node, and pulls every node within the current neighborhood radius toward the
//! row by `lr(t) · (1 − d/r(t))`, with both the learning rate and the radius
//! decaying linearly to zero over the run. Only observed entries of the row move
//! a node. A completed run ends with one batch pass at radius zero, which sets
//! each winning node to the masked mean of its rows. Training is sequential.

use log::{debug, info, trace};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use flock_core::{ClusterError, ClusterResult, Metric, VectorStore, rows_to_dense_matrix};

use crate::builder::{ClusterOptions, DEFAULT_SOM_PASSES};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridResult {
    /// Best-matching node `(x, y)` for every row.
    pub assignment: Vec<(usize, usize)>,
    /// Reference vectors indexed `[x][y]`.
    pub centroids: Vec<Vec<Vec<f64>>>,
    /// Training steps actually performed.
    pub iterations: usize,
    /// False when a stop check cut training short.
    pub completed: bool,
}

impl GridResult {
    pub fn nx(&self) -> usize {
        self.centroids.len()
    }

    pub fn ny(&self) -> usize {
        self.centroids.first().map_or(0, |col| col.len())
    }

    /// Nodes as matrix rows, node `(x, y)` at row `x * ny + y`.
    pub fn centroids_matrix(&self) -> ClusterResult<DenseMatrix<f64>> {
        let flat: Vec<Vec<f64>> = self.centroids.iter().flatten().cloned().collect();
        rows_to_dense_matrix(&flat)
    }
}

/// Grid trainer executor
pub struct SomStage<'a> {
    nx: usize,
    ny: usize,
    options: &'a ClusterOptions,
}

impl<'a> SomStage<'a> {
    pub fn new(nx: usize, ny: usize, options: &'a ClusterOptions) -> Self {
        Self { nx, ny, options }
    }

    pub fn execute(&self, store: &VectorStore) -> ClusterResult<GridResult> {
        let (nx, ny) = (self.nx, self.ny);
        if nx == 0 || ny == 0 {
            return Err(ClusterError::invalid_grid(nx, ny));
        }

        let n = store.nrows;
        let metric = self.options.metric;
        let total = self
            .options
            .iterations
            .unwrap_or(DEFAULT_SOM_PASSES * n)
            .max(1);
        let r0 = self
            .options
            .radius
            .unwrap_or_else(|| ((nx * nx + ny * ny) as f64).sqrt());
        let tau = self.options.tau;
        let seed = self.options.base_seed();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        info!(
            "SOM: grid={}x{}, N={}, F={}, steps={}, tau={}, r0={:.3}, metric={}",
            nx, ny, n, store.ncols, total, tau, r0, metric
        );

        let fill = store.column_observed_means();
        let mut nodes: Vec<Vec<f64>> = (0..nx * ny)
            .map(|_| store.filled_row(rng.random_range(0..n), &fill))
            .collect();

        let mut completed = true;
        let mut steps = 0;
        for t in 0..total {
            if self.options.should_stop() {
                debug!("SOM: stop requested after {} steps", t);
                completed = false;
                break;
            }

            let frac = 1.0 - t as f64 / total as f64;
            let lr = tau * frac;
            let radius = r0 * frac;

            let i = rng.random_range(0..n);
            let bmu = best_matching_node(store, i, &nodes, metric);
            let (bx, by) = (bmu / ny, bmu % ny);

            let row = store.row(i);
            for (node_idx, node) in nodes.iter_mut().enumerate() {
                let d = grid_distance((bx, by), (node_idx / ny, node_idx % ny));
                if d >= radius {
                    continue;
                }
                let step = lr * (1.0 - d / radius);
                for (j, value) in node.iter_mut().enumerate() {
                    if store.is_observed(i, j) {
                        *value += step * (row[j] - *value);
                    }
                }
            }
            steps = t + 1;

            if steps % n.max(1) == 0 {
                trace!("SOM step {}: lr={:.6}, radius={:.4}", steps, lr, radius);
            }
        }

        if completed {
            refine_nodes(store, &mut nodes, metric);
        }

        let assignment: Vec<(usize, usize)> = (0..n)
            .map(|i| {
                let b = best_matching_node(store, i, &nodes, metric);
                (b / ny, b % ny)
            })
            .collect();

        let mut centroids = vec![Vec::with_capacity(ny); nx];
        for (idx, node) in nodes.into_iter().enumerate() {
            centroids[idx / ny].push(node);
        }

        info!(
            "SOM complete: {} steps, completed={}",
            steps, completed
        );

        Ok(GridResult {
            assignment,
            centroids,
            iterations: steps,
            completed,
        })
    }
}

/// Batch pass at the final (zero) radius: every node that wins at least one row
/// becomes the unweighted masked mean of the rows it wins. Columns none of those
/// rows observe keep their trained value. A 1×1 grid lands on the global mean.
pub fn refine_nodes(store: &VectorStore, nodes: &mut [Vec<f64>], metric: Metric) {
    let d = store.ncols;
    let mut sums = vec![vec![0.0; d]; nodes.len()];
    let mut counts = vec![vec![0usize; d]; nodes.len()];
    for i in 0..store.nrows {
        let b = best_matching_node(store, i, nodes, metric);
        for (j, &v) in store.row(i).iter().enumerate() {
            if store.is_observed(i, j) {
                sums[b][j] += v;
                counts[b][j] += 1;
            }
        }
    }
    for (idx, node) in nodes.iter_mut().enumerate() {
        for j in 0..d {
            if counts[idx][j] > 0 {
                node[j] = sums[idx][j] / counts[idx][j] as f64;
            }
        }
    }
    trace!("SOM batch refinement over {} nodes", nodes.len());
}

/// Index of the node nearest to row `i` (ties → lowest index).
pub fn best_matching_node(store: &VectorStore, i: usize, nodes: &[Vec<f64>], metric: Metric) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, node) in nodes.iter().enumerate() {
        let d = store.distance_to(i, node, None, metric);
        if d < best_dist {
            best_dist = d;
            best = idx;
        }
    }
    best
}

fn grid_distance(a: (usize, usize), b: (usize, usize)) -> f64 {
    let dx = a.0 as f64 - b.0 as f64;
    let dy = a.1 as f64 - b.1 as f64;
    (dx * dx + dy * dy).sqrt()
}
