//! Agglomerative tree clustering and dendrogram cuts.
//!
//! Starts from N singleton clusters and a full pairwise distance matrix, then
//! merges the closest live pair N−1 times. Each cluster lives in the matrix slot
//! of its representative (smallest) leaf, so scanning slots in index order gives
//! the "lowest representative pair" tie-break for free.
//!
//! Node ids: leaves are `0..N`, the merge created at step `m` is `N + m`.

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use flock_core::{ClusterError, ClusterResult, DEGENERATE_DISTANCE, Metric, VectorStore};

use crate::builder::Linkage;

/// One agglomeration step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Node id of the child holding the smaller representative leaf
    pub left: usize,
    pub right: usize,
    /// Linkage distance at merge time, in reported form
    pub distance: f64,
}

/// Binary merge tree over `n_leaves` leaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    pub n_leaves: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn len(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    /// Smallest leaf under every node, indexed by node id.
    pub fn representatives(&self) -> Vec<usize> {
        let mut rep: Vec<usize> = (0..self.n_leaves).collect();
        for m in &self.merges {
            rep.push(rep[m.left].min(rep[m.right]));
        }
        rep
    }

    /// Flat clustering into exactly `k` groups.
    ///
    /// Drops the k−1 merges with the largest distance (on ties the later merge
    /// goes first), joins the rest, and numbers the resulting components in
    /// order of first appearance over leaves `0..N`.
    pub fn cut(&self, k: usize) -> ClusterResult<Vec<usize>> {
        let n = self.n_leaves;
        if k < 1 || k > n {
            return Err(ClusterError::invalid_k(k, n));
        }

        let mut order: Vec<usize> = (0..self.merges.len()).collect();
        order.sort_by(|&a, &b| {
            self.merges[b]
                .distance
                .total_cmp(&self.merges[a].distance)
                .then(b.cmp(&a))
        });
        let mut removed = vec![false; self.merges.len()];
        for &m in order.iter().take(k - 1) {
            removed[m] = true;
        }

        let rep = self.representatives();
        let mut parent: Vec<usize> = (0..n).collect();
        for (m, merge) in self.merges.iter().enumerate() {
            if removed[m] {
                continue;
            }
            let (a, b) = (find(&mut parent, rep[merge.left]), find(&mut parent, rep[merge.right]));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        let mut labels = Vec::with_capacity(n);
        for leaf in 0..n {
            let root = find(&mut parent, leaf);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next;
                next += 1;
            }
            labels.push(label_of_root[root]);
        }
        trace!("Cut into {} components", next);
        Ok(labels)
    }

    pub fn summary(&self) -> String {
        let top = self.merges.last().map_or(0.0, |m| m.distance);
        format!(
            "Dendrogram: {} leaves, {} merges, top distance {:.6}",
            self.n_leaves,
            self.merges.len(),
            top
        )
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Tree builder executor
pub struct TreeStage {
    linkage: Linkage,
    metric: Metric,
}

impl TreeStage {
    pub fn new(linkage: Linkage, metric: Metric) -> Self {
        Self { linkage, metric }
    }

    pub fn with_defaults() -> Self {
        Self::new(Linkage::default(), Metric::default())
    }

    pub fn execute(&self, store: &VectorStore) -> Dendrogram {
        let n = store.nrows;
        info!(
            "Tree clustering: N={}, F={}, linkage={}, metric={}",
            n, store.ncols, self.linkage, self.metric
        );

        let mut dist = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = store.row_distance(i, j, self.metric);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }
        debug!("Pairwise distance matrix ready ({} pairs)", n * n.saturating_sub(1) / 2);

        let mut centroids = match self.linkage {
            Linkage::Centroid => Some(CentroidTracker::new(store)),
            _ => None,
        };

        let mut alive = vec![true; n];
        let mut size = vec![1usize; n];
        let mut node = (0..n).collect::<Vec<usize>>();
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize)> = None;
            let mut best_dist = f64::INFINITY;
            for a in (0..n).filter(|&a| alive[a]) {
                for b in ((a + 1)..n).filter(|&b| alive[b]) {
                    if best.is_none() || dist[a][b] < best_dist {
                        best = Some((a, b));
                        best_dist = dist[a][b];
                    }
                }
            }
            let Some((a, b)) = best else { break };

            merges.push(Merge {
                left: node[a],
                right: node[b],
                distance: self.metric.report(best_dist),
            });
            trace!(
                "Merge {}: slots {} + {} at {:.6}",
                step, a, b, best_dist
            );

            if let Some(tracker) = centroids.as_mut() {
                tracker.absorb(a, b);
            }
            for c in (0..n).filter(|&c| alive[c] && c != a && c != b) {
                let d = match self.linkage {
                    Linkage::Single => dist[a][c].min(dist[b][c]),
                    Linkage::Complete => dist[a][c].max(dist[b][c]),
                    Linkage::Average => {
                        let (na, nb) = (size[a] as f64, size[b] as f64);
                        let share = na / (na + nb);
                        // sentinel distances must not overflow to infinity
                        (share * dist[a][c] + (1.0 - share) * dist[b][c]).min(DEGENERATE_DISTANCE)
                    }
                    Linkage::Centroid => match centroids.as_ref() {
                        Some(tracker) => tracker.distance(a, c, store, self.metric),
                        None => dist[a][c],
                    },
                };
                dist[a][c] = d;
                dist[c][a] = d;
            }

            alive[b] = false;
            size[a] += size[b];
            node[a] = n + step;
        }

        let tree = Dendrogram {
            n_leaves: n,
            merges,
        };
        info!("{}", tree.summary());
        tree
    }
}

/// Masked per-column sums for centroid linkage, stored by slot.
struct CentroidTracker {
    sums: Vec<Vec<f64>>,
    counts: Vec<Vec<usize>>,
}

impl CentroidTracker {
    fn new(store: &VectorStore) -> Self {
        let mut sums = Vec::with_capacity(store.nrows);
        let mut counts = Vec::with_capacity(store.nrows);
        for i in 0..store.nrows {
            let observed: Vec<usize> = (0..store.ncols)
                .map(|j| usize::from(store.is_observed(i, j)))
                .collect();
            sums.push(
                store
                    .row(i)
                    .iter()
                    .zip(&observed)
                    .map(|(v, &o)| if o == 1 { *v } else { 0.0 })
                    .collect(),
            );
            counts.push(observed);
        }
        Self { sums, counts }
    }

    fn absorb(&mut self, into: usize, from: usize) {
        for j in 0..self.sums[into].len() {
            self.sums[into][j] += self.sums[from][j];
            self.counts[into][j] += self.counts[from][j];
        }
    }

    fn mean(&self, slot: usize) -> (Vec<f64>, Vec<bool>) {
        self.sums[slot]
            .iter()
            .zip(&self.counts[slot])
            .map(|(s, &c)| if c > 0 { (s / c as f64, true) } else { (0.0, false) })
            .unzip()
    }

    fn distance(&self, a: usize, b: usize, store: &VectorStore, metric: Metric) -> f64 {
        let (mean_a, mask_a) = self.mean(a);
        let (mean_b, mask_b) = self.mean(b);
        metric.distance(
            &mean_a,
            &mean_b,
            Some(&mask_a),
            Some(&mask_b),
            store.column_weights(),
        )
    }
}
