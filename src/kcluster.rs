//! Partitional clustering: k-means and k-medians with random restarts.
//!
//! Each trial runs `Seed → Assign → Update` until no row changes cluster or the
//! iteration cap is reached. Trials are independent pure functions of
//! (trial seed, dataset, options) and run on the rayon pool; the best trial is
//! picked by a plain comparison over the collected results.
//!
//! **DETERMINISTIC**: with `rng_seed` set, trial `t` uses seed `rng_seed + t`, so a
//! run is reproducible whether trials execute in parallel or sequentially.

use std::collections::HashMap;

use log::{debug, info, trace, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use flock_core::{
    ClusterError, ClusterResult, DEGENERATE_DISTANCE, Metric, VectorStore, rows_to_dense_matrix,
};

use crate::builder::{ClusterOptions, DEFAULT_ITERATIONS, EmptyClusterPolicy, Method, Seeding};

/// Outcome of a single seeded trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub seed: u64,
    pub assignment: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Column `j` of centroid `c` is observed when some member of `c` observed it.
    pub centroid_masks: Vec<Vec<bool>>,
    /// Total within-cluster distance against the final centroids.
    pub error: f64,
    /// Total within-cluster distance after every Assign step.
    pub error_history: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Best trial of a partition run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    pub assignment: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub centroid_masks: Vec<Vec<bool>>,
    pub error: f64,
    /// Number of trials that reproduced the best partition (up to relabeling).
    pub repeated: usize,
    pub trials: usize,
    pub converged: bool,
    pub iterations: usize,
    pub error_history: Vec<f64>,
}

impl PartitionResult {
    /// Centroids as matrix rows, centroid `c` at row `c`.
    pub fn centroids_matrix(&self) -> ClusterResult<DenseMatrix<f64>> {
        rows_to_dense_matrix(&self.centroids)
    }
}

/// Partition solver executor
pub struct KClusterStage<'a> {
    k: usize,
    options: &'a ClusterOptions,
}

impl<'a> KClusterStage<'a> {
    pub fn new(k: usize, options: &'a ClusterOptions) -> Self {
        Self { k, options }
    }

    /// Run every trial and keep the one with the lowest total error.
    pub fn execute(&self, store: &VectorStore) -> ClusterResult<PartitionResult> {
        let (k, n) = (self.k, store.nrows);
        if k == 0 || k > n {
            return Err(ClusterError::invalid_k(k, n));
        }

        let n_trials = self.options.trials.max(1);
        let base_seed = self.options.base_seed();
        info!(
            "K-cluster: k={}, N={}, F={}, method={}, seeding={}, metric={}, trials={}",
            k,
            n,
            store.ncols,
            self.options.method,
            self.options.seeding,
            self.options.metric,
            n_trials
        );

        let run = |t: usize| run_trial(store, k, self.options, base_seed.wrapping_add(t as u64));
        let trials: Vec<Trial> = if self.options.parallel {
            (0..n_trials).into_par_iter().map(run).collect()
        } else {
            (0..n_trials).map(run).collect()
        };

        // Sequential min with tiebreak on trial index
        let mut best = 0;
        for (t, trial) in trials.iter().enumerate().skip(1) {
            if trial.error < trials[best].error {
                best = t;
            }
        }
        let repeated = trials
            .iter()
            .filter(|t| same_partition(&t.assignment, &trials[best].assignment))
            .count();

        let best = trials.into_iter().nth(best).ok_or_else(|| {
            ClusterError::empty_input("k-cluster produced no trials")
        })?;

        info!(
            "K-cluster complete: error={:.6}, repeated={}/{}, converged={}",
            best.error, repeated, n_trials, best.converged
        );

        Ok(PartitionResult {
            assignment: best.assignment,
            centroids: best.centroids,
            centroid_masks: best.centroid_masks,
            error: best.error,
            repeated,
            trials: n_trials,
            converged: best.converged,
            iterations: best.iterations,
            error_history: best.error_history,
        })
    }
}

/// One seeded trial of k-means / k-medians.
///
/// `k` must already be validated against the row count.
pub fn run_trial(store: &VectorStore, k: usize, options: &ClusterOptions, seed: u64) -> Trial {
    let metric = options.metric;
    let max_iter = options.iterations.unwrap_or(DEFAULT_ITERATIONS).max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let seeds = seed_centroids(store, k, options.seeding, metric, &mut rng);
    trace!("Trial seed={}: initial centroid rows {:?}", seed, seeds);

    let mut centroids: Vec<Vec<f64>> = seeds.iter().map(|&i| store.row(i).to_vec()).collect();
    let mut masks: Vec<Vec<bool>> = seeds
        .iter()
        .map(|&i| (0..store.ncols).map(|j| store.is_observed(i, j)).collect())
        .collect();

    let (mut assignment, error) = assign(store, &centroids, &masks, metric);
    let mut error_history = vec![error];
    let mut iterations = 1;
    let mut converged = false;

    while iterations < max_iter {
        if options.should_stop() {
            debug!("Trial seed={}: stop requested after {} iterations", seed, iterations);
            break;
        }

        update_centroids(
            store,
            &mut assignment,
            &mut centroids,
            &mut masks,
            options.method,
            options.empty_cluster,
            metric,
        );
        let (next, error) = assign(store, &centroids, &masks, metric);
        error_history.push(error);
        iterations += 1;

        if next == assignment {
            converged = true;
            break;
        }
        assignment = next;
    }

    // Final centroids are the aggregates of the returned assignment.
    update_centroids(
        store,
        &mut assignment,
        &mut centroids,
        &mut masks,
        options.method,
        EmptyClusterPolicy::Retain,
        metric,
    );
    let error = total_error(store, &assignment, &centroids, &masks, metric);

    if !converged {
        warn!(
            "Trial seed={}: not converged after {} iterations (error={:.6})",
            seed, iterations, error
        );
    } else {
        debug!(
            "Trial seed={}: converged in {} iterations (error={:.6})",
            seed, iterations, error
        );
    }

    Trial {
        seed,
        assignment,
        centroids,
        centroid_masks: masks,
        error,
        error_history,
        iterations,
        converged,
    }
}

/// Pick `k` distinct rows as initial centroids.
pub fn seed_centroids(
    store: &VectorStore,
    k: usize,
    seeding: Seeding,
    metric: Metric,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let n = store.nrows;
    match seeding {
        Seeding::Random => rand::seq::index::sample(rng, n, k).into_vec(),
        Seeding::KMeansPlusPlus => kmeans_plusplus(store, k, metric, rng),
        Seeding::SpreadOut => spread_out(store, k, metric),
    }
}

fn kmeans_plusplus(store: &VectorStore, k: usize, metric: Metric, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = store.nrows;
    let mut chosen = vec![rng.random_range(0..n)];
    let mut is_chosen = vec![false; n];
    is_chosen[chosen[0]] = true;
    let mut nearest: Vec<f64> = (0..n)
        .map(|i| store.row_distance(i, chosen[0], metric))
        .collect();

    while chosen.len() < k {
        let weights: Vec<f64> = (0..n)
            .map(|i| {
                if is_chosen[i] {
                    return 0.0;
                }
                let d = metric.report(nearest[i]);
                let w = d * d;
                if w.is_finite() { w } else { f64::MAX / n as f64 }
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 && total.is_finite() {
            let cutoff = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for (i, &w) in weights.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                acc += w;
                pick = Some(i);
                if acc >= cutoff {
                    break;
                }
            }
            pick
        } else {
            None
        };

        // All remaining rows coincide with a pick: fall back to uniform.
        let next = match next {
            Some(i) => i,
            None => {
                let free: Vec<usize> = (0..n).filter(|&i| !is_chosen[i]).collect();
                free[rng.random_range(0..free.len())]
            }
        };

        chosen.push(next);
        is_chosen[next] = true;
        for i in 0..n {
            nearest[i] = nearest[i].min(store.row_distance(i, next, metric));
        }
    }
    chosen
}

fn spread_out(store: &VectorStore, k: usize, metric: Metric) -> Vec<usize> {
    let n = store.nrows;
    let mut chosen = vec![0];
    let mut is_chosen = vec![false; n];
    is_chosen[0] = true;
    let mut nearest: Vec<f64> = (0..n).map(|i| store.row_distance(i, 0, metric)).collect();

    while chosen.len() < k {
        let mut next = None;
        for i in (0..n).filter(|&i| !is_chosen[i]) {
            match next {
                Some(best) if nearest[i] <= nearest[best] => {}
                _ => next = Some(i),
            }
        }
        // k <= n guarantees an unchosen row exists
        let Some(next) = next else { break };
        chosen.push(next);
        is_chosen[next] = true;
        for i in 0..n {
            nearest[i] = nearest[i].min(store.row_distance(i, next, metric));
        }
    }
    chosen
}

/// Assign every row to its nearest centroid (ties → lowest id).
///
/// Returns the assignment and the row-weighted total distance.
pub fn assign(
    store: &VectorStore,
    centroids: &[Vec<f64>],
    masks: &[Vec<bool>],
    metric: Metric,
) -> (Vec<usize>, f64) {
    let mut error = 0.0;
    let assignment = (0..store.nrows)
        .map(|i| {
            let (best, d) = nearest_centroid(store, i, centroids, masks, metric);
            error = accumulate(error, store.row_weight(i) * d);
            best
        })
        .collect();
    (assignment, error)
}

/// Linear-scan nearest centroid helper: returns (index, distance).
pub fn nearest_centroid(
    store: &VectorStore,
    i: usize,
    centroids: &[Vec<f64>],
    masks: &[Vec<bool>],
    metric: Metric,
) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (c, (centroid, mask)) in centroids.iter().zip(masks).enumerate() {
        let d = store.distance_to(i, centroid, Some(mask), metric);
        if d < best_dist {
            best_dist = d;
            best_idx = c;
        }
    }
    (best_idx, best_dist)
}

pub fn total_error(
    store: &VectorStore,
    assignment: &[usize],
    centroids: &[Vec<f64>],
    masks: &[Vec<bool>],
    metric: Metric,
) -> f64 {
    assignment
        .iter()
        .enumerate()
        .map(|(i, &c)| store.row_weight(i) * store.distance_to(i, &centroids[c], Some(&masks[c]), metric))
        .fold(0.0, accumulate)
}

/// Error sum that saturates at the degenerate sentinel instead of reaching infinity.
fn accumulate(total: f64, term: f64) -> f64 {
    (total + term).min(DEGENERATE_DISTANCE)
}

fn update_centroids(
    store: &VectorStore,
    assignment: &mut [usize],
    centroids: &mut [Vec<f64>],
    masks: &mut [Vec<bool>],
    method: Method,
    policy: EmptyClusterPolicy,
    metric: Metric,
) {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &c in assignment.iter() {
        counts[c] += 1;
    }

    if policy == EmptyClusterPolicy::ReseedFarthest {
        for c in 0..k {
            if counts[c] > 0 {
                continue;
            }
            let donor = (0..store.nrows)
                .filter(|&i| counts[assignment[i]] > 1)
                .map(|i| {
                    let a = assignment[i];
                    (i, store.distance_to(i, &centroids[a], Some(&masks[a]), metric))
                })
                .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                    Some((_, bd)) if d <= bd => best,
                    _ => Some((i, d)),
                });
            if let Some((i, d)) = donor {
                debug!("Cluster {} empty: reseeded from row {} (distance {:.6})", c, i, d);
                counts[assignment[i]] -= 1;
                assignment[i] = c;
                counts[c] = 1;
            }
        }
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &c) in assignment.iter().enumerate() {
        members[c].push(i);
    }

    for c in 0..k {
        if members[c].is_empty() {
            trace!("Cluster {} empty: keeping previous centroid", c);
            continue;
        }
        for j in 0..store.ncols {
            let observed: Vec<(f64, f64)> = members[c]
                .iter()
                .filter(|&&i| store.is_observed(i, j))
                .map(|&i| (store.row(i)[j], store.row_weight(i)))
                .collect();
            if observed.is_empty() {
                masks[c][j] = false;
                continue;
            }
            centroids[c][j] = match method {
                Method::Average => weighted_mean(&observed),
                Method::Median => weighted_median(observed),
            };
            masks[c][j] = true;
        }
    }
}

/// Weighted mean of (value, weight) pairs; unweighted when all weights are 0.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> f64 {
    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        pairs.iter().map(|(v, w)| v * w).sum::<f64>() / total
    } else {
        pairs.iter().map(|(v, _)| v).sum::<f64>() / pairs.len() as f64
    }
}

/// Weighted median of (value, weight) pairs.
///
/// When the cumulative weight lands exactly on half of the total the two
/// straddling values are averaged, so unit weights give the classic median.
pub fn weighted_median(mut pairs: Vec<(f64, f64)>) -> f64 {
    if pairs.iter().all(|(_, w)| *w <= 0.0) {
        for p in pairs.iter_mut() {
            p.1 = 1.0;
        }
    }
    pairs.retain(|(_, w)| *w > 0.0);
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    let half = total / 2.0;
    let tol = total * 1e-12;
    let mut acc = 0.0;
    for (idx, &(v, w)) in pairs.iter().enumerate() {
        acc += w;
        if (acc - half).abs() <= tol {
            return match pairs.get(idx + 1) {
                Some(&(next, _)) => 0.5 * (v + next),
                None => v,
            };
        }
        if acc > half {
            return v;
        }
    }
    pairs.last().map(|p| p.0).unwrap_or(0.0)
}

/// True when `a` and `b` describe the same partition up to relabeling.
pub fn same_partition(a: &[usize], b: &[usize]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut forward: HashMap<usize, usize> = HashMap::new();
    let mut backward: HashMap<usize, usize> = HashMap::new();
    for (&x, &y) in a.iter().zip(b) {
        if *forward.entry(x).or_insert(y) != y || *backward.entry(y).or_insert(x) != x {
            return false;
        }
    }
    true
}
